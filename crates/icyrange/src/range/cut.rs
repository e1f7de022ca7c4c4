use crate::{
    types::{ColumnType, TypeError},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// RangeCut
///
/// Boundary marker between two adjacent points of a column's domain.
///
/// A cut never denotes a value itself; it sits immediately below or above
/// one. As a lower cut `Below(k)` admits `k` and `Above(k)` excludes it; as
/// an upper cut `Above(k)` admits `k` and `Below(k)` excludes it.
///
/// Ordering: `BelowNull < NULL < AboveNull < Below(v) < v < Above(v) < AboveAll`.
/// A `Below(NULL)` cut is `BelowNull` and an `Above(NULL)` cut is `AboveNull`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum RangeCut {
    BelowNull,
    AboveNull,
    Below(Value),
    Above(Value),
    AboveAll,
}

// Borrowed cut with NULL keys folded into their sentinel.
#[derive(Clone, Copy)]
enum Slot<'a> {
    BelowNull,
    AboveNull,
    Below(&'a Value),
    Above(&'a Value),
    AboveAll,
}

impl RangeCut {
    /// Cut immediately below `key`.
    #[must_use]
    pub fn below(key: Value) -> Self {
        if key.is_null() {
            Self::BelowNull
        } else {
            Self::Below(key)
        }
    }

    /// Cut immediately above `key`.
    #[must_use]
    pub fn above(key: Value) -> Self {
        if key.is_null() {
            Self::AboveNull
        } else {
            Self::Above(key)
        }
    }

    /// Key the cut is anchored to, if any.
    #[must_use]
    pub const fn key(&self) -> Option<&Value> {
        match self {
            Self::Below(key) | Self::Above(key) => Some(key),
            Self::BelowNull | Self::AboveNull | Self::AboveAll => None,
        }
    }

    /// Whether the cut restricts anything when used as a bound.
    ///
    /// `BelowNull` (as a lower cut) and `AboveAll` (as an upper cut) leave
    /// that side of the interval open.
    #[must_use]
    pub const fn is_binding(&self) -> bool {
        match self.slot() {
            Slot::Below(_) | Slot::Above(_) | Slot::AboveNull => true,
            Slot::BelowNull | Slot::AboveAll => false,
        }
    }

    const fn slot(&self) -> Slot<'_> {
        match self {
            Self::BelowNull => Slot::BelowNull,
            Self::AboveNull => Slot::AboveNull,
            Self::AboveAll => Slot::AboveAll,
            Self::Below(Value::Null) => Slot::BelowNull,
            Self::Above(Value::Null) => Slot::AboveNull,
            Self::Below(key) => Slot::Below(key),
            Self::Above(key) => Slot::Above(key),
        }
    }

    /// Order two cuts; key comparison goes through the column type.
    pub fn compare(&self, other: &Self, typ: ColumnType) -> Result<Ordering, TypeError> {
        let ordering = match (self.slot(), other.slot()) {
            (Slot::BelowNull, Slot::BelowNull)
            | (Slot::AboveNull, Slot::AboveNull)
            | (Slot::AboveAll, Slot::AboveAll) => Ordering::Equal,

            (Slot::BelowNull, _) | (_, Slot::AboveAll) => Ordering::Less,
            (_, Slot::BelowNull) | (Slot::AboveAll, _) => Ordering::Greater,

            (Slot::AboveNull, _) => Ordering::Less,
            (_, Slot::AboveNull) => Ordering::Greater,

            (Slot::Below(a), Slot::Below(b)) | (Slot::Above(a), Slot::Above(b)) => {
                typ.compare(a, b)?
            }
            (Slot::Below(a), Slot::Above(b)) => match typ.compare(a, b)? {
                Ordering::Greater => Ordering::Greater,
                Ordering::Less | Ordering::Equal => Ordering::Less,
            },
            (Slot::Above(a), Slot::Below(b)) => match typ.compare(a, b)? {
                Ordering::Less => Ordering::Less,
                Ordering::Equal | Ordering::Greater => Ordering::Greater,
            },
        };

        Ok(ordering)
    }

    /// The larger of two cuts (the left one on ties).
    pub fn max<'a>(typ: ColumnType, left: &'a Self, right: &'a Self) -> Result<&'a Self, TypeError> {
        Ok(if left.compare(right, typ)? == Ordering::Less {
            right
        } else {
            left
        })
    }

    /// The smaller of two cuts (the left one on ties).
    pub fn min<'a>(typ: ColumnType, left: &'a Self, right: &'a Self) -> Result<&'a Self, TypeError> {
        Ok(if left.compare(right, typ)? == Ordering::Greater {
            right
        } else {
            left
        })
    }

    pub(crate) fn fmt_lower(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot() {
            Slot::BelowNull => f.write_str("[NULL"),
            Slot::AboveNull => f.write_str("(NULL"),
            Slot::Below(key) => write!(f, "[{key}"),
            Slot::Above(key) => write!(f, "({key}"),
            Slot::AboveAll => f.write_str("(∞"),
        }
    }

    pub(crate) fn fmt_upper(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot() {
            Slot::BelowNull => f.write_str("NULL)"),
            Slot::AboveNull => f.write_str("NULL]"),
            Slot::Below(key) => write!(f, "{key})"),
            Slot::Above(key) => write!(f, "{key}]"),
            Slot::AboveAll => f.write_str("∞)"),
        }
    }
}

///
/// TESTS
///
