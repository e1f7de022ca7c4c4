use crate::value::Value;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::{cmp::Ordering, str::FromStr};

///
/// Numeric
///
/// Exact numeric view of a value used by numeric comparison and coercion.
/// Integers stay exact, decimals stay decimal, floats fall back to f64.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Numeric {
    Int(i128),
    Float(f64),
    Decimal(Decimal),
}

impl Numeric {
    /// Numeric view of a value; text and UTF-8 blobs are parsed.
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(Self::Int(i128::from(*v))),
            Value::Int(v) => Some(Self::Int(i128::from(*v))),
            Value::Uint(v) => Some(Self::Int(i128::from(*v))),
            Value::Float(v) if v.is_finite() => Some(Self::Float(*v)),
            Value::Decimal(v) => Some(Self::Decimal(*v)),
            Value::Text(s) => Self::parse(s),
            Value::Blob(bytes) => std::str::from_utf8(bytes).ok().and_then(Self::parse),
            Value::Float(_) | Value::Null | Value::Point(_) => None,
        }
    }

    /// Parse numeric text: integers first, then decimals, then floats.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(v) = raw.parse::<i128>() {
            return Some(Self::Int(v));
        }
        if let Ok(v) = Decimal::from_str(raw) {
            return Some(Self::Decimal(v));
        }

        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self::Float)
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
            Self::Decimal(v) => v.to_f64().unwrap_or(f64::NAN),
        }
    }

    pub(crate) fn as_decimal(self) -> Option<Decimal> {
        match self {
            Self::Int(v) => Decimal::from_i128(v),
            Self::Float(v) => Decimal::from_f64(v),
            Self::Decimal(v) => Some(v),
        }
    }

    pub(crate) fn is_zero(self) -> bool {
        match self {
            Self::Int(v) => v == 0,
            Self::Float(v) => v == 0.0,
            Self::Decimal(v) => v.is_zero(),
        }
    }

    /// Total order between two numeric views; `None` only for NaN.
    pub(crate) fn cmp_numeric(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(&b)),
            (Self::Int(a), Self::Decimal(b)) => match Decimal::from_i128(a) {
                Some(a) => Some(a.cmp(&b)),
                None => self.as_f64().partial_cmp(&other.as_f64()),
            },
            (Self::Decimal(a), Self::Int(b)) => match Decimal::from_i128(b) {
                Some(b) => Some(a.cmp(&b)),
                None => self.as_f64().partial_cmp(&other.as_f64()),
            },
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefers_exact_representations() {
        assert_eq!(Numeric::parse(" 42 "), Some(Numeric::Int(42)));
        assert_eq!(
            Numeric::parse("2.5"),
            Some(Numeric::Decimal(Decimal::new(25, 1)))
        );
        assert_eq!(Numeric::parse("abc"), None);
        assert_eq!(Numeric::parse("NaN"), None);
    }

    #[test]
    fn mixed_comparisons_are_exact_for_int_and_decimal() {
        let two = Numeric::Int(2);
        let two_and_half = Numeric::Decimal(Decimal::new(25, 1));

        assert_eq!(two.cmp_numeric(two_and_half), Some(Ordering::Less));
        assert_eq!(two_and_half.cmp_numeric(two), Some(Ordering::Greater));
        assert_eq!(
            Numeric::Float(2.0).cmp_numeric(two),
            Some(Ordering::Equal)
        );
    }
}
