//! Module: range::column
//! Responsibility: single-column interval algebra over typed range cuts.
//! Does not own: multi-column composition or overlap removal.

use crate::{
    range::{RangeCut, RangeError},
    types::ColumnType,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

///
/// RangeType
///
/// Shape classification of a column range by its cut pair.
/// Every representable cut pair maps to exactly one shape.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RangeType {
    Empty,
    All,
    EqualNull,
    NotNull,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    LessThanOrNull,
    LessOrEqualOrNull,
    OpenOpen,
    OpenClosed,
    ClosedOpen,
    ClosedClosed,
}

///
/// RangeColumnExpr
///
/// The set `{ x : lower_bound < x < upper_bound }` over one column's domain,
/// where `<` is cut ordering under `typ`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RangeColumnExpr {
    pub lower_bound: RangeCut,
    pub upper_bound: RangeCut,
    pub typ: ColumnType,
}

impl RangeColumnExpr {
    #[must_use]
    pub const fn new(lower_bound: RangeCut, upper_bound: RangeCut, typ: ColumnType) -> Self {
        Self {
            lower_bound,
            upper_bound,
            typ,
        }
    }

    /// `lower < x < upper`
    #[must_use]
    pub fn open(lower: Value, upper: Value, typ: ColumnType) -> Self {
        Self::new(RangeCut::above(lower), RangeCut::below(upper), typ)
    }

    /// `lower <= x <= upper`
    #[must_use]
    pub fn closed(lower: Value, upper: Value, typ: ColumnType) -> Self {
        Self::new(RangeCut::below(lower), RangeCut::above(upper), typ)
    }

    /// `lower <= x < upper`
    #[must_use]
    pub fn closed_open(lower: Value, upper: Value, typ: ColumnType) -> Self {
        Self::new(RangeCut::below(lower), RangeCut::below(upper), typ)
    }

    /// `lower < x <= upper`
    #[must_use]
    pub fn open_closed(lower: Value, upper: Value, typ: ColumnType) -> Self {
        Self::new(RangeCut::above(lower), RangeCut::above(upper), typ)
    }

    /// `x < upper` (NULL excluded)
    #[must_use]
    pub fn less_than(upper: Value, typ: ColumnType) -> Self {
        Self::new(RangeCut::AboveNull, RangeCut::below(upper), typ)
    }

    /// `x <= upper` (NULL excluded)
    #[must_use]
    pub fn less_or_equal(upper: Value, typ: ColumnType) -> Self {
        Self::new(RangeCut::AboveNull, RangeCut::above(upper), typ)
    }

    /// `x > lower`
    #[must_use]
    pub fn greater_than(lower: Value, typ: ColumnType) -> Self {
        Self::new(RangeCut::above(lower), RangeCut::AboveAll, typ)
    }

    /// `x >= lower`
    #[must_use]
    pub fn greater_or_equal(lower: Value, typ: ColumnType) -> Self {
        Self::new(RangeCut::below(lower), RangeCut::AboveAll, typ)
    }

    /// Every value including NULL.
    #[must_use]
    pub const fn all(typ: ColumnType) -> Self {
        Self::new(RangeCut::BelowNull, RangeCut::AboveAll, typ)
    }

    /// No value.
    #[must_use]
    pub const fn empty(typ: ColumnType) -> Self {
        Self::new(RangeCut::AboveAll, RangeCut::AboveAll, typ)
    }

    /// Only NULL.
    #[must_use]
    pub const fn null(typ: ColumnType) -> Self {
        Self::new(RangeCut::BelowNull, RangeCut::AboveNull, typ)
    }

    /// Every non-null value.
    #[must_use]
    pub const fn not_null(typ: ColumnType) -> Self {
        Self::new(RangeCut::AboveNull, RangeCut::AboveAll, typ)
    }

    #[must_use]
    pub const fn has_lower_bound(&self) -> bool {
        self.lower_bound.is_binding()
    }

    #[must_use]
    pub const fn has_upper_bound(&self) -> bool {
        self.upper_bound.is_binding()
    }

    /// Classify the cut pair.
    #[must_use]
    pub fn range_type(&self) -> RangeType {
        use RangeCut::{Above, AboveAll, AboveNull, Below, BelowNull};

        let lower = normalize(&self.lower_bound);
        let upper = normalize(&self.upper_bound);

        match (lower, upper) {
            (BelowNull, AboveAll) => RangeType::All,
            (BelowNull, AboveNull) => RangeType::EqualNull,
            (BelowNull, Below(_)) => RangeType::LessThanOrNull,
            (BelowNull, Above(_)) => RangeType::LessOrEqualOrNull,
            (AboveNull, AboveAll) => RangeType::NotNull,
            (AboveNull, Below(_)) => RangeType::LessThan,
            (AboveNull, Above(_)) => RangeType::LessOrEqual,
            (Above(_), AboveAll) => RangeType::GreaterThan,
            (Below(_), AboveAll) => RangeType::GreaterOrEqual,
            (Above(_), Below(_)) => RangeType::OpenOpen,
            (Above(_), Above(_)) => RangeType::OpenClosed,
            (Below(_), Below(_)) => RangeType::ClosedOpen,
            (Below(_), Above(_)) => RangeType::ClosedClosed,
            // Lower cut at or above the upper cut by sentinel order alone.
            (AboveAll, _)
            | (_, BelowNull)
            | (AboveNull | Below(_) | Above(_), AboveNull) => RangeType::Empty,
        }
    }

    /// Whether no value lies between the cuts.
    pub fn is_empty(&self) -> Result<bool, RangeError> {
        Ok(self.lower_bound.compare(&self.upper_bound, self.typ)? != Ordering::Less)
    }

    /// Same type and identical cut positions.
    pub fn equals(&self, other: &Self) -> Result<bool, RangeError> {
        if self.typ != other.typ {
            return Ok(false);
        }

        Ok(self.lower_bound.compare(&other.lower_bound, self.typ)? == Ordering::Equal
            && self.upper_bound.compare(&other.upper_bound, self.typ)? == Ordering::Equal)
    }

    /// Whether the two ranges overlap or touch.
    pub fn is_connected(&self, other: &Self) -> Result<bool, RangeError> {
        if self.typ != other.typ {
            return Ok(false);
        }
        if self.lower_bound.compare(&other.upper_bound, self.typ)? == Ordering::Greater {
            return Ok(false);
        }

        Ok(other.lower_bound.compare(&self.upper_bound, self.typ)? != Ordering::Greater)
    }

    /// Strict overlap; returns the shared interval when one exists.
    pub fn overlaps(&self, other: &Self) -> Result<Option<Self>, RangeError> {
        if self.typ != other.typ {
            return Ok(None);
        }
        if self.lower_bound.compare(&other.upper_bound, self.typ)? != Ordering::Less
            || other.lower_bound.compare(&self.upper_bound, self.typ)? != Ordering::Less
        {
            return Ok(None);
        }

        let overlap = Self::new(
            RangeCut::max(self.typ, &self.lower_bound, &other.lower_bound)?.clone(),
            RangeCut::min(self.typ, &self.upper_bound, &other.upper_bound)?.clone(),
            self.typ,
        );
        if overlap.is_empty()? {
            return Ok(None);
        }

        Ok(Some(overlap))
    }

    /// Set difference `self - other` as zero, one, or two fragments.
    ///
    /// Two fragments come back only when `other` sits strictly inside.
    pub fn subtract(&self, other: &Self) -> Result<Vec<Self>, RangeError> {
        if self.overlaps(other)?.is_none() {
            return Ok(vec![self.clone()]);
        }

        let lower_cmp = self.lower_bound.compare(&other.lower_bound, self.typ)?;
        let upper_cmp = self.upper_bound.compare(&other.upper_bound, self.typ)?;

        // The cut that closes one fragment opens the next, so reusing
        // `other`'s cuts with swapped roles excludes exactly `other`.
        let below = || Self::new(self.lower_bound.clone(), other.lower_bound.clone(), self.typ);
        let above = || Self::new(other.upper_bound.clone(), self.upper_bound.clone(), self.typ);

        let fragments = match (lower_cmp, upper_cmp) {
            (Ordering::Less, Ordering::Less | Ordering::Equal) => vec![below()],
            (Ordering::Less, Ordering::Greater) => vec![below(), above()],
            (Ordering::Equal | Ordering::Greater, Ordering::Greater) => vec![above()],
            (Ordering::Equal | Ordering::Greater, Ordering::Less | Ordering::Equal) => vec![],
        };

        Ok(fragments)
    }

    /// Non-strict containment of `self` in `other`.
    pub fn is_subset_of(&self, other: &Self) -> Result<bool, RangeError> {
        if self.typ != other.typ {
            return Ok(false);
        }
        if self.lower_bound.compare(&other.lower_bound, self.typ)? == Ordering::Less {
            return Ok(false);
        }

        Ok(self.upper_bound.compare(&other.upper_bound, self.typ)? != Ordering::Greater)
    }

    pub fn is_superset_of(&self, other: &Self) -> Result<bool, RangeError> {
        other.is_subset_of(self)
    }

    /// Intersection; `None` when the result would be empty.
    pub fn try_intersect(&self, other: &Self) -> Result<Option<Self>, RangeError> {
        if self.typ != other.typ {
            return Ok(None);
        }

        let intersection = Self::new(
            RangeCut::max(self.typ, &self.lower_bound, &other.lower_bound)?.clone(),
            RangeCut::min(self.typ, &self.upper_bound, &other.upper_bound)?.clone(),
            self.typ,
        );
        if intersection.is_empty()? {
            return Ok(None);
        }

        Ok(Some(intersection))
    }

    /// Union as a single interval; `None` when the ranges are disjoint and
    /// not adjacent.
    pub fn try_union(&self, other: &Self) -> Result<Option<Self>, RangeError> {
        if other.is_empty()? {
            return Ok(Some(self.clone()));
        }
        if self.is_empty()? {
            return Ok(Some(other.clone()));
        }
        if !self.is_connected(other)? {
            return Ok(None);
        }

        Ok(Some(Self::new(
            RangeCut::min(self.typ, &self.lower_bound, &other.lower_bound)?.clone(),
            RangeCut::max(self.typ, &self.upper_bound, &other.upper_bound)?.clone(),
            self.typ,
        )))
    }

    /// Order by lower cut, then upper cut.
    pub fn compare(&self, other: &Self) -> Result<Ordering, RangeError> {
        let lower = self.lower_bound.compare(&other.lower_bound, self.typ)?;
        if lower != Ordering::Equal {
            return Ok(lower);
        }

        Ok(self.upper_bound.compare(&other.upper_bound, self.typ)?)
    }
}

impl fmt::Display for RangeColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range_type() == RangeType::Empty {
            return f.write_str("∅");
        }

        self.lower_bound.fmt_lower(f)?;
        f.write_str(", ")?;
        self.upper_bound.fmt_upper(f)
    }
}

// Fold NULL-keyed cuts into sentinels so shape matching only sees one form.
fn normalize(cut: &RangeCut) -> &RangeCut {
    match cut {
        RangeCut::Below(Value::Null) => &RangeCut::BelowNull,
        RangeCut::Above(Value::Null) => &RangeCut::AboveNull,
        other => other,
    }
}
