//! Module: builder::rounding
//! Responsibility: rewrite comparisons of fixed-scale columns (integers,
//! decimals) against keys with more fractional digits than the column holds,
//! so that no row is wrongly admitted or excluded.
//! Does not own: domain clamping (see `ColumnType::convert`).

use crate::{types::Numeric, value::Value};
use num_traits::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

///
/// KeyOp
/// Comparison operator applied between a column and one key.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum KeyOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

///
/// Rounded
/// Outcome of fitting a key to a fixed-scale column.
///

#[derive(Clone, Debug, PartialEq)]
pub(super) enum Rounded {
    /// Compare against `key` with `op` (possibly tightened).
    Key { key: Value, op: KeyOp },
    /// No stored value satisfies the comparison.
    Empty,
    /// Every non-null stored value satisfies the comparison.
    NotNull,
}

///
/// ScaledBounds
/// A numeric key rounded down and up to a number of fractional digits.
///

#[derive(Clone, Debug, PartialEq)]
pub(super) struct ScaledBounds {
    floor: Value,
    ceil: Value,
}

impl ScaledBounds {
    /// Bounds of a numeric key at `scale` fractional digits; `None` for keys
    /// with no numeric view.
    pub(super) fn of(key: &Value, scale: u32) -> Option<Self> {
        let exact = || Self {
            floor: key.clone(),
            ceil: key.clone(),
        };

        let bounds = match Numeric::from_value(key)? {
            Numeric::Int(_) => exact(),
            Numeric::Float(v) if scale == 0 => Self {
                floor: Value::Float(v.floor()),
                ceil: Value::Float(v.ceil()),
            },
            // floats past the decimal range are left to domain clamping
            Numeric::Float(v) => Decimal::from_f64(v)
                .map_or_else(exact, |v| Self::of_decimal(v, scale)),
            Numeric::Decimal(v) => Self::of_decimal(v, scale),
        };

        Some(bounds)
    }

    fn of_decimal(v: Decimal, scale: u32) -> Self {
        let at = |strategy| Value::Decimal(v.round_dp_with_strategy(scale, strategy));

        Self {
            floor: at(RoundingStrategy::ToNegativeInfinity),
            ceil: at(RoundingStrategy::ToPositiveInfinity),
        }
    }

    /// Whether the key has digits past the scale.
    pub(super) fn is_inexact(&self) -> bool {
        self.floor != self.ceil
    }

    /// Fit the comparison to the column's scale.
    ///
    /// `> k` and `>= k` compare against `floor(k)`, `< k` and `<= k` against
    /// `ceil(k)`; inclusive operators turn strict when `k` lost digits.
    pub(super) fn round(self, op: KeyOp) -> Rounded {
        let inexact = self.is_inexact();

        match op {
            KeyOp::Eq if inexact => Rounded::Empty,
            KeyOp::NotEq if inexact => Rounded::NotNull,
            KeyOp::Eq | KeyOp::NotEq | KeyOp::Gt => Rounded::Key {
                key: self.floor,
                op,
            },
            KeyOp::Gte => Rounded::Key {
                key: self.floor,
                op: if inexact { KeyOp::Gt } else { KeyOp::Gte },
            },
            KeyOp::Lt => Rounded::Key { key: self.ceil, op },
            KeyOp::Lte => Rounded::Key {
                key: self.ceil,
                op: if inexact { KeyOp::Lt } else { KeyOp::Lte },
            },
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn round(key: Value, op: KeyOp) -> Rounded {
        round_to(key, 0, op)
    }

    fn round_to(key: Value, scale: u32, op: KeyOp) -> Rounded {
        ScaledBounds::of(&key, scale).expect("numeric key").round(op)
    }

    fn key(key: Value, op: KeyOp) -> Rounded {
        Rounded::Key { key, op }
    }

    #[test]
    fn fractional_float_keys_tighten_toward_admitted_side() {
        assert_eq!(round(Value::Float(2.5), KeyOp::Eq), Rounded::Empty);
        assert_eq!(round(Value::Float(2.5), KeyOp::NotEq), Rounded::NotNull);
        assert_eq!(
            round(Value::Float(2.5), KeyOp::Gt),
            key(Value::Float(2.0), KeyOp::Gt)
        );
        assert_eq!(
            round(Value::Float(2.5), KeyOp::Gte),
            key(Value::Float(2.0), KeyOp::Gt)
        );
        assert_eq!(
            round(Value::Float(2.5), KeyOp::Lt),
            key(Value::Float(3.0), KeyOp::Lt)
        );
        assert_eq!(
            round(Value::Float(2.5), KeyOp::Lte),
            key(Value::Float(3.0), KeyOp::Lt)
        );
    }

    #[test]
    fn whole_keys_keep_their_operator() {
        assert_eq!(
            round(Value::Float(2.0), KeyOp::Gte),
            key(Value::Float(2.0), KeyOp::Gte)
        );
        assert_eq!(
            round(Value::Int(7), KeyOp::Lte),
            key(Value::Int(7), KeyOp::Lte)
        );
        assert_eq!(
            round(Value::Int(7), KeyOp::Eq),
            key(Value::Int(7), KeyOp::Eq)
        );
    }

    #[test]
    fn negative_decimals_floor_away_from_zero() {
        assert_eq!(
            round(Value::Decimal(Decimal::new(-25, 1)), KeyOp::Gte),
            key(Value::Decimal(Decimal::new(-3, 0)), KeyOp::Gt)
        );
        assert_eq!(
            round(Value::Decimal(Decimal::new(-25, 1)), KeyOp::Lte),
            key(Value::Decimal(Decimal::new(-2, 0)), KeyOp::Lt)
        );
    }

    #[test]
    fn numeric_text_is_parsed_before_rounding() {
        assert_eq!(
            round(Value::from("2.5"), KeyOp::Gt),
            key(Value::Decimal(Decimal::new(2, 0)), KeyOp::Gt)
        );
        assert_eq!(ScaledBounds::of(&Value::from("abc"), 0), None);
        assert_eq!(ScaledBounds::of(&Value::Null, 0), None);
    }

    #[test]
    fn keys_round_to_the_column_scale() {
        let fine = || Value::Decimal(Decimal::new(2555, 3));
        let cents = |units| Value::Decimal(Decimal::new(units, 2));

        assert_eq!(round_to(fine(), 2, KeyOp::Eq), Rounded::Empty);
        assert_eq!(round_to(fine(), 2, KeyOp::NotEq), Rounded::NotNull);
        assert_eq!(round_to(fine(), 2, KeyOp::Gt), key(cents(255), KeyOp::Gt));
        assert_eq!(round_to(fine(), 2, KeyOp::Gte), key(cents(255), KeyOp::Gt));
        assert_eq!(round_to(fine(), 2, KeyOp::Lt), key(cents(256), KeyOp::Lt));
        assert_eq!(round_to(fine(), 2, KeyOp::Lte), key(cents(256), KeyOp::Lt));

        // digits within the scale are kept as is
        assert_eq!(round_to(fine(), 3, KeyOp::Gte), key(fine(), KeyOp::Gte));
    }

    #[test]
    fn float_keys_round_to_a_decimal_scale() {
        assert_eq!(
            round_to(Value::Float(0.5), 2, KeyOp::Lte),
            key(Value::Decimal(Decimal::new(50, 2)), KeyOp::Lte)
        );
        assert_eq!(round_to(Value::Float(0.125), 2, KeyOp::Eq), Rounded::Empty);
        assert_eq!(
            round_to(Value::Float(0.1), 2, KeyOp::Eq),
            key(Value::Decimal(Decimal::new(1, 1)), KeyOp::Eq)
        );
    }
}
