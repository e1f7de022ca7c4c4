use crate::{
    config::RangeConfig,
    error::{ErrorClass, ErrorOrigin, InternalError},
    types::ColumnType,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error as ThisError;

///
/// ModelError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ModelError {
    #[error("index '{0}' declares no column expressions")]
    NoColumns(String),

    #[error("index '{id}' declares {count} column expressions, limit is {limit}")]
    TooManyColumns { id: String, count: usize, limit: usize },

    #[error("index '{id}' declares column expression '{expression}' twice")]
    DuplicateColumn { id: String, expression: String },

    #[error("spatial index '{0}' must declare exactly one point column")]
    InvalidSpatial(String),
}

impl ModelError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::NoColumns(_) | Self::TooManyColumns { .. } | Self::InvalidSpatial(_) => {
                ErrorClass::Unsupported
            }
            Self::DuplicateColumn { .. } => ErrorClass::Conflict,
        }
    }
}

impl From<ModelError> for InternalError {
    fn from(err: ModelError) -> Self {
        Self::new(err.class(), ErrorOrigin::Model, err.to_string())
    }
}

///
/// ColumnExpressionType
/// One indexed column expression paired with its declared type.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ColumnExpressionType {
    pub expression: String,
    pub typ: ColumnType,
}

impl ColumnExpressionType {
    #[must_use]
    pub fn new(expression: impl Into<String>, typ: ColumnType) -> Self {
        Self {
            expression: expression.into(),
            typ,
        }
    }
}

///
/// IndexModel
/// Runtime descriptor for an index consumed by builders and lookups.
/// Keeps the range algebra decoupled from catalog and storage shapes.
///
/// Column expressions are stored lower-cased; lookups by name are
/// case-insensitive.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexModel {
    id: String,
    database: String,
    table: String,
    columns: Vec<ColumnExpressionType>,
    spatial: bool,
}

impl IndexModel {
    /// Declare a regular index under the default configuration.
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        id: impl Into<String>,
        columns: impl IntoIterator<Item = ColumnExpressionType>,
    ) -> Result<Self, ModelError> {
        Self::with_config(&RangeConfig::default(), database, table, id, columns, false)
    }

    /// Declare a spatial index over one point column.
    pub fn spatial(
        database: impl Into<String>,
        table: impl Into<String>,
        id: impl Into<String>,
        column: ColumnExpressionType,
    ) -> Result<Self, ModelError> {
        Self::with_config(&RangeConfig::default(), database, table, id, [column], true)
    }

    pub fn with_config(
        config: &RangeConfig,
        database: impl Into<String>,
        table: impl Into<String>,
        id: impl Into<String>,
        columns: impl IntoIterator<Item = ColumnExpressionType>,
        spatial: bool,
    ) -> Result<Self, ModelError> {
        let id = id.into();
        let columns: Vec<_> = columns
            .into_iter()
            .map(|c| ColumnExpressionType::new(c.expression.to_lowercase(), c.typ))
            .collect();

        if columns.is_empty() {
            return Err(ModelError::NoColumns(id));
        }
        let limit = config.index_column_limit();
        if columns.len() > limit {
            return Err(ModelError::TooManyColumns {
                id,
                count: columns.len(),
                limit,
            });
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.expression == column.expression) {
                return Err(ModelError::DuplicateColumn {
                    id,
                    expression: column.expression.clone(),
                });
            }
        }
        if spatial && (columns.len() != 1 || !columns[0].typ.is_spatial()) {
            return Err(ModelError::InvalidSpatial(id));
        }

        Ok(Self {
            id,
            database: database.into(),
            table: table.into(),
            columns,
            spatial,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn is_spatial(&self) -> bool {
        self.spatial
    }

    /// Column expressions in declared order.
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.expression.as_str())
    }

    #[must_use]
    pub fn column_expression_types(&self) -> &[ColumnExpressionType] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Declared position and type of a column expression.
    #[must_use]
    pub fn column(&self, expression: &str) -> Option<(usize, ColumnType)> {
        let expression = expression.to_lowercase();

        self.columns
            .iter()
            .position(|c| c.expression == expression)
            .map(|i| (i, self.columns[i].typ))
    }

    /// Whether this index's column prefix matches the start of another index.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.columns.len() < other.columns.len() && other.columns.starts_with(&self.columns)
    }
}

impl Display for IndexModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self.expressions().collect::<Vec<_>>().join(", ");

        if self.spatial {
            write!(f, "SPATIAL {}.{}.{}({columns})", self.database, self.table, self.id)
        } else {
            write!(f, "{}.{}.{}({columns})", self.database, self.table, self.id)
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, typ: ColumnType) -> ColumnExpressionType {
        ColumnExpressionType::new(name, typ)
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let index = IndexModel::new(
            "db",
            "t",
            "idx_ab",
            [col("T.A", ColumnType::Int64), col("t.b", ColumnType::Text)],
        )
        .expect("index declares");

        assert_eq!(index.column("t.a"), Some((0, ColumnType::Int64)));
        assert_eq!(index.column("T.B"), Some((1, ColumnType::Text)));
        assert_eq!(index.column("t.c"), None);
        assert_eq!(index.to_string(), "db.t.idx_ab(t.a, t.b)");
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = IndexModel::new(
            "db",
            "t",
            "idx",
            [col("a", ColumnType::Int64), col("A", ColumnType::Int64)],
        )
        .expect_err("duplicate column");

        assert_eq!(
            err,
            ModelError::DuplicateColumn {
                id: "idx".to_string(),
                expression: "a".to_string(),
            }
        );
    }

    #[test]
    fn column_limit_comes_from_config() {
        let config = RangeConfig {
            max_index_columns: 1,
            ..RangeConfig::default()
        };
        let err = IndexModel::with_config(
            &config,
            "db",
            "t",
            "idx",
            [col("a", ColumnType::Int64), col("b", ColumnType::Int64)],
            false,
        )
        .expect_err("too many columns");

        assert!(matches!(err, ModelError::TooManyColumns { limit: 1, .. }));
    }

    #[test]
    fn spatial_index_requires_one_point_column() {
        assert!(IndexModel::spatial("db", "t", "sp", col("g", ColumnType::Point)).is_ok());
        assert_eq!(
            IndexModel::spatial("db", "t", "sp", col("g", ColumnType::Text)),
            Err(ModelError::InvalidSpatial("sp".to_string()))
        );
    }

    #[test]
    fn prefix_relation_between_indexes() {
        let a = IndexModel::new("db", "t", "a", [col("x", ColumnType::Int64)]).expect("index");
        let ab = IndexModel::new(
            "db",
            "t",
            "ab",
            [col("x", ColumnType::Int64), col("y", ColumnType::Int64)],
        )
        .expect("index");

        assert!(a.is_prefix_of(&ab));
        assert!(!ab.is_prefix_of(&a));
    }
}
