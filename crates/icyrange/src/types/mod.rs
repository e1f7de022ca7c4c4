//! Module: types
//! Responsibility: the column type capability consumed by range algebra
//! (ordering, key coercion, promotion, numeric classification).
//! Does not own: collation resolution or SQL-mode dependent coercion.

mod numeric;

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    value::{Point, Value},
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use thiserror::Error as ThisError;

pub(crate) use numeric::Numeric;

///
/// CONSTANTS
///

/// Largest decimal scale/precision representable by the backing decimal.
const MAX_DECIMAL_DIGITS: u8 = 28;

///
/// TypeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TypeError {
    #[error("value '{value}' ({kind}) cannot be converted to {ty}")]
    InvalidValue {
        ty: ColumnType,
        kind: &'static str,
        value: String,
    },

    #[error("values '{left}' and '{right}' cannot be ordered as {ty}")]
    Incomparable {
        ty: ColumnType,
        left: String,
        right: String,
    },
}

impl TypeError {
    pub(crate) fn invalid_value(ty: ColumnType, value: &Value) -> Self {
        Self::InvalidValue {
            ty,
            kind: value.kind(),
            value: value.to_string(),
        }
    }

    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidValue { .. } => ErrorClass::Unsupported,
            Self::Incomparable { .. } => ErrorClass::InvariantViolation,
        }
    }
}

impl From<TypeError> for InternalError {
    fn from(err: TypeError) -> Self {
        Self::new(err.class(), ErrorOrigin::Type, err.to_string())
    }
}

///
/// RangeCheck
///
/// Outcome of clamping a converted key into a column type's domain.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RangeCheck {
    InRange,
    Underflow,
    Overflow,
}

impl RangeCheck {
    #[must_use]
    pub const fn is_in_range(self) -> bool {
        matches!(self, Self::InRange)
    }
}

///
/// NumberClass
///
/// Numeric capability marker: float vs integer, signed vs unsigned.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NumberClass {
    pub float: bool,
    pub signed: bool,
}

///
/// ColumnType
///
/// Declared type of one index column expression.
/// Every bound value stored in a range cut is interpreted through it.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ColumnType {
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Decimal { precision: u8, scale: u8 },
    Text,
    Blob,
    Point,
}

impl ColumnType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int8 => "tinyint",
            Self::Int16 => "smallint",
            Self::Int32 => "int",
            Self::Int64 => "bigint",
            Self::Uint8 => "tinyint unsigned",
            Self::Uint16 => "smallint unsigned",
            Self::Uint32 => "int unsigned",
            Self::Uint64 => "bigint unsigned",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Decimal { .. } => "decimal",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Point => "point",
        }
    }

    /// Numeric marker; `None` for non-numeric and decimal columns.
    #[must_use]
    pub const fn number_class(self) -> Option<NumberClass> {
        match self {
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => Some(NumberClass {
                float: false,
                signed: true,
            }),
            Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64 => Some(NumberClass {
                float: false,
                signed: false,
            }),
            Self::Float32 | Self::Float64 => Some(NumberClass {
                float: true,
                signed: true,
            }),
            _ => None,
        }
    }

    /// Whether the column only holds whole numbers.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self.number_class(), Some(NumberClass { float: false, .. }))
    }

    /// Fractional digits every stored value fits in; `None` for columns
    /// without a fixed scale.
    #[must_use]
    pub fn key_scale(self) -> Option<u32> {
        match self {
            Self::Decimal { scale, .. } => Some(u32::from(scale.min(MAX_DECIMAL_DIGITS))),
            _ if self.is_integer() => Some(0),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }

    #[must_use]
    pub const fn is_spatial(self) -> bool {
        matches!(self, Self::Point)
    }

    /// Widest type of the same family.
    #[must_use]
    pub const fn promote(self) -> Self {
        match self {
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => Self::Int64,
            Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64 => Self::Uint64,
            Self::Float32 | Self::Float64 => Self::Float64,
            other => other,
        }
    }

    /// Order two values of this type. NULL sorts below every non-null value.
    pub fn compare(self, left: &Value, right: &Value) -> Result<Ordering, TypeError> {
        match (left, right) {
            (Value::Null, Value::Null) => return Ok(Ordering::Equal),
            (Value::Null, _) => return Ok(Ordering::Less),
            (_, Value::Null) => return Ok(Ordering::Greater),
            _ => {}
        }

        let ordering = match self {
            Self::Null => Some(Ordering::Equal),
            Self::Text => Some(left.to_text().cmp(&right.to_text())),
            Self::Blob => Some(blob_bytes(left).cmp(&blob_bytes(right))),
            Self::Point => match (left, right) {
                (Value::Point(a), Value::Point(b)) => cmp_point(a, b),
                _ => None,
            },
            _ => match (Numeric::from_value(left), Numeric::from_value(right)) {
                (Some(a), Some(b)) => a.cmp_numeric(b),
                _ => None,
            },
        };

        ordering.ok_or_else(|| TypeError::Incomparable {
            ty: self,
            left: left.to_string(),
            right: right.to_string(),
        })
    }

    /// Coerce a value into this type's domain.
    ///
    /// Out-of-domain numbers are clamped and reported through `RangeCheck`
    /// so callers can decide whether the clamped key is usable.
    pub fn convert(self, value: &Value) -> Result<(Value, RangeCheck), TypeError> {
        if value.is_null() {
            return Ok((Value::Null, RangeCheck::InRange));
        }

        match self {
            Self::Null => Ok((Value::Null, RangeCheck::InRange)),
            Self::Bool => {
                let n = self.numeric(value)?;
                Ok((Value::Bool(!n.is_zero()), RangeCheck::InRange))
            }
            Self::Int8 => self.convert_signed(value, i8::MIN.into(), i8::MAX.into()),
            Self::Int16 => self.convert_signed(value, i16::MIN.into(), i16::MAX.into()),
            Self::Int32 => self.convert_signed(value, i32::MIN.into(), i32::MAX.into()),
            Self::Int64 => self.convert_signed(value, i64::MIN.into(), i64::MAX.into()),
            Self::Uint8 => self.convert_unsigned(value, u8::MAX.into()),
            Self::Uint16 => self.convert_unsigned(value, u16::MAX.into()),
            Self::Uint32 => self.convert_unsigned(value, u32::MAX.into()),
            Self::Uint64 => self.convert_unsigned(value, u64::MAX.into()),
            Self::Float32 => self.convert_float32(value),
            Self::Float64 => self.convert_float64(value),
            Self::Decimal { precision, scale } => self.convert_decimal(value, precision, scale),
            Self::Text => Ok((Value::Text(value.to_text()), RangeCheck::InRange)),
            Self::Blob => Ok((Value::Blob(blob_bytes(value)), RangeCheck::InRange)),
            Self::Point => match value {
                Value::Point(p) if p.x.is_finite() && p.y.is_finite() => {
                    Ok((value.clone(), RangeCheck::InRange))
                }
                _ => Err(TypeError::invalid_value(self, value)),
            },
        }
    }

    fn numeric(self, value: &Value) -> Result<Numeric, TypeError> {
        Numeric::from_value(value).ok_or_else(|| TypeError::invalid_value(self, value))
    }

    // Round to a whole number (half away from zero) and clamp to [min, max].
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn whole_number(
        self,
        value: &Value,
        min: i128,
        max: i128,
    ) -> Result<(i128, RangeCheck), TypeError> {
        if let Some(check) = infinity(value) {
            return Ok((clamped(check, min, max), check));
        }

        let whole = match self.numeric(value)? {
            Numeric::Int(v) => v,
            Numeric::Decimal(v) => {
                let rounded = v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
                num_traits::ToPrimitive::to_i128(&rounded)
                    .ok_or_else(|| TypeError::invalid_value(self, value))?
            }
            Numeric::Float(v) => {
                let rounded = v.round();
                if rounded < min as f64 {
                    return Ok((min, RangeCheck::Underflow));
                }
                if rounded > max as f64 {
                    return Ok((max, RangeCheck::Overflow));
                }
                rounded as i128
            }
        };

        Ok(if whole < min {
            (min, RangeCheck::Underflow)
        } else if whole > max {
            (max, RangeCheck::Overflow)
        } else {
            (whole, RangeCheck::InRange)
        })
    }

    fn convert_signed(
        self,
        value: &Value,
        min: i128,
        max: i128,
    ) -> Result<(Value, RangeCheck), TypeError> {
        let (whole, check) = self.whole_number(value, min, max)?;
        let whole = i64::try_from(whole).map_err(|_| TypeError::invalid_value(self, value))?;

        Ok((Value::Int(whole), check))
    }

    fn convert_unsigned(self, value: &Value, max: i128) -> Result<(Value, RangeCheck), TypeError> {
        let (whole, check) = self.whole_number(value, 0, max)?;
        let whole = u64::try_from(whole).map_err(|_| TypeError::invalid_value(self, value))?;

        Ok((Value::Uint(whole), check))
    }

    fn convert_float32(self, value: &Value) -> Result<(Value, RangeCheck), TypeError> {
        let max = f64::from(f32::MAX);
        if let Some(check) = infinity(value) {
            return Ok((Value::Float(clamped(check, -max, max)), check));
        }

        let v = self.numeric(value)?.as_f64();
        if v > max {
            return Ok((Value::Float(max), RangeCheck::Overflow));
        }
        if v < -max {
            return Ok((Value::Float(-max), RangeCheck::Underflow));
        }

        #[allow(clippy::cast_possible_truncation)]
        let narrowed = v as f32;

        Ok((Value::Float(f64::from(narrowed)), RangeCheck::InRange))
    }

    fn convert_float64(self, value: &Value) -> Result<(Value, RangeCheck), TypeError> {
        if let Some(check) = infinity(value) {
            return Ok((Value::Float(clamped(check, f64::MIN, f64::MAX)), check));
        }

        let n = self.numeric(value)?;

        Ok((Value::Float(n.as_f64()), RangeCheck::InRange))
    }

    fn convert_decimal(
        self,
        value: &Value,
        precision: u8,
        scale: u8,
    ) -> Result<(Value, RangeCheck), TypeError> {
        let scale = scale.min(MAX_DECIMAL_DIGITS);

        // Largest magnitude with `precision - scale` integral digits.
        let integral_digits = precision.saturating_sub(scale);
        let limit = if integral_digits >= MAX_DECIMAL_DIGITS {
            Decimal::MAX
        } else {
            Decimal::from_i128_with_scale(10_i128.pow(u32::from(integral_digits)), 0)
                - Decimal::new(1, u32::from(scale))
        };

        if let Some(check) = infinity(value) {
            return Ok((Value::Decimal(clamped(check, -limit, limit)), check));
        }

        let n = self.numeric(value)?;
        let Some(decimal) = n.as_decimal() else {
            // finite, but past what the backing decimal holds
            return match n.as_f64() {
                v if v > 0.0 => Ok((Value::Decimal(limit), RangeCheck::Overflow)),
                v if v < 0.0 => Ok((Value::Decimal(-limit), RangeCheck::Underflow)),
                _ => Err(TypeError::invalid_value(self, value)),
            };
        };
        let decimal =
            decimal.round_dp_with_strategy(u32::from(scale), RoundingStrategy::MidpointAwayFromZero);

        Ok(if decimal > limit {
            (Value::Decimal(limit), RangeCheck::Overflow)
        } else if decimal < -limit {
            (Value::Decimal(-limit), RangeCheck::Underflow)
        } else {
            (Value::Decimal(decimal), RangeCheck::InRange)
        })
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            other => f.write_str(other.name()),
        }
    }
}

// Infinite float keys lie past either end of every numeric domain.
fn infinity(value: &Value) -> Option<RangeCheck> {
    match value {
        Value::Float(v) if v.is_infinite() => Some(if v.is_sign_positive() {
            RangeCheck::Overflow
        } else {
            RangeCheck::Underflow
        }),
        _ => None,
    }
}

fn clamped<T>(check: RangeCheck, min: T, max: T) -> T {
    if check == RangeCheck::Overflow {
        max
    } else {
        min
    }
}

fn blob_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::Blob(bytes) => bytes.clone(),
        Value::Text(s) => s.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}

fn cmp_point(left: &Point, right: &Point) -> Option<Ordering> {
    match left.x.partial_cmp(&right.x)? {
        Ordering::Equal => left.y.partial_cmp(&right.y),
        ordering => Some(ordering),
    }
}
