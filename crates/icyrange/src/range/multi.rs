//! Module: range::multi
//! Responsibility: multi-column ranges (hyper-rectangles in index column
//! order) and their pairwise algebra, including overlap decomposition.
//! Does not own: collection-wide de-overlap (see `collection`).

use crate::{
    range::{RangeColumnExpr, RangeError, RangeType},
    types::ColumnType,
};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

///
/// Range
///
/// Conjunction of per-column ranges, one per index column in declared order.
///
/// Pairwise operations between ranges of different arity report "no
/// relationship" except `compare`, which treats it as an invariant violation.
///

#[repr(transparent)]
#[derive(Clone, Debug, Default, Deref, Deserialize, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
#[serde(transparent)]
pub struct Range(Vec<RangeColumnExpr>);

impl Range {
    #[must_use]
    pub const fn new(columns: Vec<RangeColumnExpr>) -> Self {
        Self(columns)
    }

    /// Unrestricted range over the given column types.
    #[must_use]
    pub fn all(types: impl IntoIterator<Item = ColumnType>) -> Self {
        Self(types.into_iter().map(RangeColumnExpr::all).collect())
    }

    /// Range matching nothing over the given column types.
    #[must_use]
    pub fn empty(types: impl IntoIterator<Item = ColumnType>) -> Self {
        Self(types.into_iter().map(RangeColumnExpr::empty).collect())
    }

    /// Same arity and types, every column empty.
    #[must_use]
    pub fn as_empty(&self) -> Self {
        Self::empty(self.types())
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<RangeColumnExpr> {
        self.0
    }

    pub fn types(&self) -> impl Iterator<Item = ColumnType> + '_ {
        self.0.iter().map(|column| column.typ)
    }

    /// Copy of this range with one column replaced.
    #[must_use]
    pub fn with_column(&self, index: usize, column: RangeColumnExpr) -> Self {
        let mut columns = self.0.clone();
        columns[index] = column;

        Self(columns)
    }

    /// Whether the range matches no row (any column empty).
    ///
    /// Shadows `Vec::is_empty`; use `len() == 0` for the column count.
    pub fn is_empty(&self) -> Result<bool, RangeError> {
        for column in &self.0 {
            if column.is_empty()? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Whether every column is unrestricted.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0
            .iter()
            .all(|column| column.range_type() == RangeType::All)
    }

    pub fn equals(&self, other: &Self) -> Result<bool, RangeError> {
        if self.len() != other.len() {
            return Ok(false);
        }
        for (a, b) in self.iter().zip(other.iter()) {
            if !a.equals(b)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Column-wise intersection; any disjoint column empties the whole range.
    pub fn intersect(&self, other: &Self) -> Result<Self, RangeError> {
        if self.len() != other.len() {
            return Ok(self.as_empty());
        }

        let mut columns = Vec::with_capacity(self.len());
        for (a, b) in self.iter().zip(other.iter()) {
            match a.try_intersect(b)? {
                Some(column) => columns.push(column),
                None => return Ok(self.as_empty()),
            }
        }

        Ok(Self(columns))
    }

    /// Strict overlap on every column; returns the shared box.
    pub fn overlaps(&self, other: &Self) -> Result<Option<Self>, RangeError> {
        if self.len() != other.len() {
            return Ok(None);
        }

        let mut columns = Vec::with_capacity(self.len());
        for (a, b) in self.iter().zip(other.iter()) {
            match a.overlaps(b)? {
                Some(column) => columns.push(column),
                None => return Ok(None),
            }
        }

        Ok(Some(Self(columns)))
    }

    /// Overlapping or touching on every column.
    pub fn is_connected(&self, other: &Self) -> Result<bool, RangeError> {
        if self.len() != other.len() {
            return Ok(false);
        }
        for (a, b) in self.iter().zip(other.iter()) {
            if !a.is_connected(b)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Set containment; an empty range is a subset of any range of equal arity.
    pub fn is_subset_of(&self, other: &Self) -> Result<bool, RangeError> {
        if self.len() != other.len() {
            return Ok(false);
        }
        if self.is_empty()? {
            return Ok(true);
        }
        for (a, b) in self.iter().zip(other.iter()) {
            if !a.is_subset_of(b)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    pub fn is_superset_of(&self, other: &Self) -> Result<bool, RangeError> {
        other.is_subset_of(self)
    }

    /// Represent `self ∪ other` as one range when geometry allows it.
    ///
    /// Succeeds when one contains the other, or when the two agree on every
    /// column but one and that column unions into a single interval.
    pub fn try_merge(&self, other: &Self) -> Result<Option<Self>, RangeError> {
        if self.len() != other.len() {
            return Ok(None);
        }
        if self.is_superset_of(other)? {
            return Ok(Some(self.clone()));
        }
        if other.is_superset_of(self)? {
            return Ok(Some(other.clone()));
        }

        let Some(index) = self.single_differing_column(other)? else {
            return Ok(None);
        };

        Ok(self[index]
            .try_union(&other[index])?
            .map(|column| self.with_column(index, column)))
    }

    /// Decompose two ranges into disjoint ranges covering their union.
    ///
    /// Returns `changed = false` with both inputs when they do not overlap and
    /// cannot be merged. Otherwise the first differing column (in index order)
    /// is split into the shared interval and each side's remainder; the two
    /// boxes aligned on the shared interval recurse with one fewer differing
    /// column.
    pub fn remove_overlap(&self, other: &Self) -> Result<(Vec<Self>, bool), RangeError> {
        if let Some(merged) = self.try_merge(other)? {
            return Ok((vec![merged], true));
        }
        if self.overlaps(other)?.is_none() {
            return Ok((vec![self.clone(), other.clone()], false));
        }

        for (index, (a, b)) in self.iter().zip(other.iter()).enumerate() {
            if a.equals(b)? {
                continue;
            }

            let shared = a
                .overlaps(b)?
                .ok_or_else(|| RangeError::ImpossibleOverlap(format!("{self} and {other}")))?;

            let mut fragments = Vec::new();
            for piece in a.subtract(&shared)? {
                fragments.push(self.with_column(index, piece));
            }
            for piece in b.subtract(&shared)? {
                fragments.push(other.with_column(index, piece));
            }

            let (rest, _) = self
                .with_column(index, shared.clone())
                .remove_overlap(&other.with_column(index, shared))?;
            fragments.extend(rest);

            return Ok((fragments, true));
        }

        // Equal on every column means `try_merge` already succeeded.
        Err(RangeError::ImpossibleOverlap(format!("{self} and {other}")))
    }

    /// Lexicographic order over per-column (lower, upper) cuts.
    pub fn compare(&self, other: &Self) -> Result<Ordering, RangeError> {
        if self.len() != other.len() {
            return Err(RangeError::ArityMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        for (a, b) in self.iter().zip(other.iter()) {
            let ordering = a.compare(b)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }

        Ok(Ordering::Equal)
    }

    // Index of the only column where the ranges differ; `None` when zero or
    // several columns differ.
    fn single_differing_column(&self, other: &Self) -> Result<Option<usize>, RangeError> {
        let mut differing = None;
        for (index, (a, b)) in self.iter().zip(other.iter()).enumerate() {
            if a.equals(b)? {
                continue;
            }
            if differing.is_some() {
                return Ok(None);
            }
            differing = Some(index);
        }

        Ok(differing)
    }
}

impl From<Vec<RangeColumnExpr>> for Range {
    fn from(columns: Vec<RangeColumnExpr>) -> Self {
        Self(columns)
    }
}

impl FromIterator<RangeColumnExpr> for Range {
    fn from_iter<I: IntoIterator<Item = RangeColumnExpr>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, column) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}")?;
        }
        f.write_str(")")
    }
}
