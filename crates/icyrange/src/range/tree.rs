use crate::range::{Range, RangeError};
use std::cmp::Ordering;

///
/// RangeTree
///
/// Pairwise-disjoint ranges kept sorted by their leading column, so that
/// candidates connected to a probe are found without a full scan.
///

#[derive(Debug, Default)]
pub(super) struct RangeTree {
    members: Vec<Range>,
}

impl RangeTree {
    pub(super) const fn len(&self) -> usize {
        self.members.len()
    }

    pub(super) fn into_ranges(self) -> Vec<Range> {
        self.members
    }

    /// Positions of members connected to `probe` on every column.
    ///
    /// Members are ordered by leading lower cut, so only the prefix whose
    /// lower cut does not pass the probe's upper cut can touch it.
    pub(super) fn connected(&self, probe: &Range) -> Result<Vec<usize>, RangeError> {
        let Some(lead) = probe.first() else {
            return Ok((0..self.members.len()).collect());
        };

        let end = self.partition_point(|member| {
            let Some(member_lead) = member.first() else {
                return Ok(true);
            };

            Ok(member_lead
                .lower_bound
                .compare(&lead.upper_bound, lead.typ)?
                != Ordering::Greater)
        })?;

        let mut positions = Vec::new();
        for (position, member) in self.members[..end].iter().enumerate() {
            if member.is_connected(probe)? {
                positions.push(position);
            }
        }

        Ok(positions)
    }

    pub(super) fn insert(&mut self, range: Range) -> Result<(), RangeError> {
        let position =
            self.partition_point(|member| Ok(leading_cmp(member, &range)? != Ordering::Greater))?;
        self.members.insert(position, range);

        Ok(())
    }

    pub(super) fn get(&self, position: usize) -> &Range {
        &self.members[position]
    }

    pub(super) fn remove(&mut self, position: usize) -> Range {
        self.members.remove(position)
    }

    // Binary search with a fallible predicate; members satisfying `pred`
    // must form a prefix.
    fn partition_point(
        &self,
        mut pred: impl FnMut(&Range) -> Result<bool, RangeError>,
    ) -> Result<usize, RangeError> {
        let (mut lo, mut hi) = (0, self.members.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pred(&self.members[mid])? {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        Ok(lo)
    }
}

// Order by the leading column's (lower, upper) cuts.
fn leading_cmp(left: &Range, right: &Range) -> Result<Ordering, RangeError> {
    match (left.first(), right.first()) {
        (Some(a), Some(b)) => a.compare(b),
        _ => Ok(Ordering::Equal),
    }
}

///
/// TESTS
///
