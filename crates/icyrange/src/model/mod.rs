pub mod index;

// re-exports
pub use index::{ColumnExpressionType, IndexModel, ModelError};
