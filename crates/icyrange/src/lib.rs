//! Index range algebra for SQL planners: typed interval cuts, multi-column
//! ranges, overlap removal, and the builders that turn filter predicates into
//! index lookups.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod builder;
pub mod config;
pub mod error;
pub mod lookup;
pub mod model;
pub mod obs;
pub mod range;
pub mod registry;
pub mod scan;
pub mod types;
pub mod value;

///
/// CONSTANTS
///

/// Hard upper limit on column expressions per index.
///
/// `RangeConfig::max_index_columns` may lower this but never raise it; the
/// overlap decomposition recurses once per column.
pub const MAX_INDEX_COLUMNS: usize = 64;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, registries, or sinks are re-exported here.
///

pub mod prelude {
    pub use crate::{
        builder::{EqualityIndexBuilder, IndexBuilder, SpatialIndexBuilder},
        lookup::IndexLookup,
        model::{ColumnExpressionType, IndexModel},
        range::{Range, RangeCollection, RangeColumnExpr, RangeCut, RangeType},
        types::ColumnType,
        value::{Point, Value},
    };
}
