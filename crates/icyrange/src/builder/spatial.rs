use crate::{
    builder::BuilderError,
    lookup::IndexLookup,
    model::IndexModel,
    obs::sink::{LookupKind, MetricsEvent, record},
    range::{Range, RangeCollection, RangeColumnExpr, RangeCut},
    types::ColumnType,
    value::Value,
};
use std::sync::Arc;

///
/// SpatialIndexBuilder
///
/// Builds the single closed interval a spatial index scan walks.
/// Without a range the lookup covers every row.
///

#[derive(Clone, Debug)]
pub struct SpatialIndexBuilder {
    index: Arc<IndexModel>,
    range: RangeColumnExpr,
}

impl SpatialIndexBuilder {
    #[must_use]
    pub fn new(index: Arc<IndexModel>) -> Self {
        let typ = index
            .column_expression_types()
            .first()
            .map_or(ColumnType::Point, |c| c.typ);

        Self {
            index,
            range: RangeColumnExpr::all(typ),
        }
    }

    /// Scan `[lower, upper]`, replacing any earlier range.
    #[must_use]
    pub fn add_range(mut self, lower: Value, upper: Value) -> Self {
        self.range = RangeColumnExpr::new(
            RangeCut::below(lower),
            RangeCut::above(upper),
            self.range.typ,
        );
        self
    }

    pub fn build(self) -> Result<IndexLookup, BuilderError> {
        if !self.index.is_spatial() {
            return Err(BuilderError::NotSpatial(self.index.id().to_string()));
        }

        let empty = self.range.is_empty()?;
        let ranges = RangeCollection::new(vec![Range::new(vec![self.range])]);
        let lookup = IndexLookup::new(Arc::clone(&self.index), ranges, true)?;

        record(MetricsEvent::LookupBuilt {
            kind: LookupKind::Spatial,
            index: self.index.id(),
            ranges: 1,
            empty,
        });

        Ok(lookup)
    }
}
