//! Module: range::collection
//! Responsibility: disjunctions of ranges, their intersection, and the
//! de-overlap pass that restores pairwise disjointness.
//! Does not own: per-column or per-range algebra.

use crate::{
    obs::sink::{MetricsEvent, record},
    range::{Range, RangeColumnExpr, RangeError, tree::RangeTree},
};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::VecDeque, fmt};
use tracing::{debug, trace};

///
/// RangeCollection
///
/// Disjunction of ranges over one index. Collections produced by
/// `intersect` and `remove_overlapping_ranges` are pairwise disjoint.
///

#[repr(transparent)]
#[derive(Clone, Debug, Default, Deref, Deserialize, IntoIterator, PartialEq, Serialize)]
#[into_iterator(owned, ref)]
#[serde(transparent)]
pub struct RangeCollection(Vec<Range>);

impl RangeCollection {
    #[must_use]
    pub const fn new(ranges: Vec<Range>) -> Self {
        Self(ranges)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Range> {
        self.0
    }

    pub fn push(&mut self, range: Range) {
        self.0.push(range);
    }

    /// AND of two disjunctions: every pairwise intersection, de-overlapped.
    pub fn intersect(&self, other: &Self) -> Result<Self, RangeError> {
        let mut ranges = Vec::with_capacity(self.len() * other.len());
        for a in &self.0 {
            for b in &other.0 {
                let range = a.intersect(b)?;
                if !range.is_empty()? {
                    ranges.push(range);
                }
            }
        }

        remove_overlapping_ranges(ranges)
    }

    /// Fail if any two members overlap.
    pub fn validate(&self) -> Result<(), RangeError> {
        for (i, a) in self.0.iter().enumerate() {
            for b in &self.0[i + 1..] {
                if a.overlaps(b)?.is_some() {
                    return Err(RangeError::ResidualOverlap {
                        left: a.to_string(),
                        right: b.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Whether the collection matches no row (no members, or only empty ones).
    ///
    /// Shadows `Vec::is_empty`; use `len() == 0` for the member count.
    pub fn is_empty(&self) -> Result<bool, RangeError> {
        for range in &self.0 {
            if !range.is_empty()? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl From<Vec<Range>> for RangeCollection {
    fn from(ranges: Vec<Range>) -> Self {
        Self(ranges)
    }
}

impl FromIterator<Range> for RangeCollection {
    fn from_iter<I: IntoIterator<Item = Range>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RangeCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, range) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{range}")?;
        }
        f.write_str("]")
    }
}

/// Rewrite a set of ranges into pairwise-disjoint ranges covering the same
/// rows. Empty inputs are dropped.
pub fn remove_overlapping_ranges(
    ranges: impl IntoIterator<Item = Range>,
) -> Result<RangeCollection, RangeError> {
    let mut queue = VecDeque::new();
    for range in ranges {
        if !range.is_empty()? {
            queue.push_back(range);
        }
    }
    let ranges_in = queue.len();

    let mut tree = RangeTree::default();
    'queue: while let Some(range) = queue.pop_front() {
        for position in tree.connected(&range)? {
            let (fragments, changed) = tree.get(position).remove_overlap(&range)?;
            if !changed {
                continue;
            }

            trace!(
                member = %tree.get(position),
                range = %range,
                fragments = fragments.len(),
                "range overlap resolved"
            );
            tree.remove(position);
            for fragment in fragments {
                if !fragment.is_empty()? {
                    queue.push_back(fragment);
                }
            }
            continue 'queue;
        }

        tree.insert(range)?;
    }

    let ranges_out = tree.len();
    let collection = RangeCollection(tree.into_ranges());
    collection.validate()?;

    debug!(ranges_in, ranges_out, "overlapping ranges removed");
    record(MetricsEvent::OverlapRemoval {
        ranges_in: ranges_in as u64,
        ranges_out: ranges_out as u64,
    });

    Ok(collection)
}

/// Merge single-column ranges into the minimal list of disjoint,
/// non-adjacent intervals, ordered by lower cut. Empty inputs are dropped.
pub fn simplify_range_column(
    exprs: impl IntoIterator<Item = RangeColumnExpr>,
) -> Result<Vec<RangeColumnExpr>, RangeError> {
    let exprs: Vec<RangeColumnExpr> = exprs.into_iter().collect();
    let Some(first) = exprs.first() else {
        return Ok(Vec::new());
    };

    let typ = first.typ;
    if let Some(other) = exprs.iter().find(|expr| expr.typ != typ) {
        return Err(RangeError::TypeMismatch {
            left: typ.to_string(),
            right: other.typ.to_string(),
        });
    }

    let mut kept = Vec::with_capacity(exprs.len());
    for expr in exprs {
        if !expr.is_empty()? {
            kept.push(expr);
        }
    }

    // sort_by cannot fail; remember the first comparison error instead
    let mut sort_err = None;
    kept.sort_by(|a, b| {
        a.compare(b).unwrap_or_else(|err| {
            sort_err.get_or_insert(err);
            Ordering::Equal
        })
    });
    if let Some(err) = sort_err {
        return Err(err);
    }

    let mut simplified: Vec<RangeColumnExpr> = Vec::with_capacity(kept.len());
    for expr in kept {
        if let Some(last) = simplified.last_mut()
            && let Some(union) = last.try_union(&expr)?
        {
            *last = union;
            continue;
        }
        simplified.push(expr);
    }

    Ok(simplified)
}
