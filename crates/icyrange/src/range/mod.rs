//! Module: range
//! Responsibility: interval algebra over typed index keys (cuts, column
//! ranges, multi-column ranges, disjoint range collections).
//! Does not own: predicate translation (see `builder`) or key coercion.

mod collection;
mod column;
mod cut;
mod multi;
mod tree;

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorClass, InternalError},
    types::TypeError,
};
use thiserror::Error as ThisError;

// re-exports
pub use collection::{RangeCollection, remove_overlapping_ranges, simplify_range_column};
pub use column::{RangeColumnExpr, RangeType};
pub use cut::RangeCut;
pub use multi::Range;

///
/// RangeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RangeError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("range arity mismatch: {left} columns vs {right} columns")]
    ArityMismatch { left: usize, right: usize },

    #[error("column ranges have different types: {left} vs {right}")]
    TypeMismatch { left: String, right: String },

    #[error("ranges still overlap after overlap removal: {left} and {right}")]
    ResidualOverlap { left: String, right: String },

    #[error("overlapping ranges share no differing column: {0}")]
    ImpossibleOverlap(String),
}

impl RangeError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::Type(err) => err.class(),
            Self::ArityMismatch { .. }
            | Self::TypeMismatch { .. }
            | Self::ResidualOverlap { .. }
            | Self::ImpossibleOverlap(_) => ErrorClass::InvariantViolation,
        }
    }
}

impl From<RangeError> for InternalError {
    fn from(err: RangeError) -> Self {
        match err {
            RangeError::Type(err) => err.into(),
            err => Self::range_invariant(err.to_string()),
        }
    }
}
