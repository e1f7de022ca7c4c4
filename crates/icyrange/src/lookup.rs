//! Module: lookup
//! Responsibility: the finished artifact handed to the scan layer.
//! Does not own: how ranges are produced (see `builder` and `scan`).

use crate::{
    model::IndexModel,
    range::{Range, RangeCollection, RangeCut, RangeError, RangeType},
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, sync::Arc};

///
/// IndexLookup
///
/// Which rows of one index to scan: a disjoint collection of ranges plus
/// the flags the scan layer branches on.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct IndexLookup {
    index: Arc<IndexModel>,
    ranges: RangeCollection,
    is_empty_range: bool,
    is_spatial_lookup: bool,
    is_point_lookup: bool,
}

impl IndexLookup {
    pub fn new(
        index: Arc<IndexModel>,
        ranges: RangeCollection,
        is_spatial_lookup: bool,
    ) -> Result<Self, RangeError> {
        let is_empty_range = ranges.is_empty()?;
        let is_point_lookup = !is_empty_range && is_point_collection(&ranges)?;

        Ok(Self {
            index,
            ranges,
            is_empty_range,
            is_spatial_lookup,
            is_point_lookup,
        })
    }

    /// The lookup that matches no row: one all-empty range.
    #[must_use]
    pub fn empty(index: Arc<IndexModel>) -> Self {
        let types = index.column_expression_types().iter().map(|c| c.typ);
        let ranges = RangeCollection::new(vec![Range::empty(types)]);

        Self {
            is_spatial_lookup: index.is_spatial(),
            index,
            ranges,
            is_empty_range: true,
            is_point_lookup: false,
        }
    }

    #[must_use]
    pub const fn index(&self) -> &Arc<IndexModel> {
        &self.index
    }

    #[must_use]
    pub const fn ranges(&self) -> &RangeCollection {
        &self.ranges
    }

    #[must_use]
    pub fn into_ranges(self) -> RangeCollection {
        self.ranges
    }

    #[must_use]
    pub const fn is_empty_range(&self) -> bool {
        self.is_empty_range
    }

    #[must_use]
    pub const fn is_spatial_lookup(&self) -> bool {
        self.is_spatial_lookup
    }

    /// Every range pins every column to a single value.
    #[must_use]
    pub const fn is_point_lookup(&self) -> bool {
        self.is_point_lookup
    }

    /// A single range left open on the leading column restricts nothing.
    #[must_use]
    pub fn is_all_range(&self) -> bool {
        match self.ranges.as_slice() {
            [range] => range
                .first()
                .is_some_and(|column| column.range_type() == RangeType::All),
            _ => false,
        }
    }
}

impl fmt::Display for IndexLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty_range {
            write!(f, "{} EMPTY", self.index)
        } else {
            write!(f, "{} {}", self.index, self.ranges)
        }
    }
}

fn is_point_collection(ranges: &RangeCollection) -> Result<bool, RangeError> {
    for range in ranges {
        for column in range {
            let (RangeCut::Below(lower), RangeCut::Above(upper)) =
                (&column.lower_bound, &column.upper_bound)
            else {
                return Ok(false);
            };
            if column.typ.compare(lower, upper)? != Ordering::Equal {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

///
/// TESTS
///
