use crate::{
    builder::{BuilderError, rounding::ScaledBounds},
    lookup::IndexLookup,
    model::IndexModel,
    obs::sink::{LookupKind, MetricsEvent, record},
    range::{Range, RangeCollection, RangeColumnExpr},
    types::{ColumnType, TypeError},
    value::Value,
};
use std::sync::Arc;
use tracing::debug;

///
/// EqualityIndexBuilder
///
/// Fast path for conjunctions of `column = key` addressed by column
/// position. Each column takes at most one key; a second key on the same
/// column is an error rather than a narrowing. A key that can never match
/// marks the whole lookup empty and later keys are ignored.
///

#[derive(Clone, Debug)]
pub struct EqualityIndexBuilder {
    index: Arc<IndexModel>,
    columns: Vec<Option<RangeColumnExpr>>,
    empty: bool,
    err: Option<BuilderError>,
}

impl EqualityIndexBuilder {
    #[must_use]
    pub fn new(index: Arc<IndexModel>) -> Self {
        let columns = vec![None; index.len()];

        Self {
            index,
            columns,
            empty: false,
            err: None,
        }
    }

    /// Whether a key already ruled out every row.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.empty
    }

    /// `column[position] = key`
    #[must_use]
    pub fn add_equality(mut self, position: usize, key: Value) -> Self {
        if self.empty || self.err.is_some() {
            return self;
        }

        let Some(column) = self.index.column_expression_types().get(position) else {
            self.err = Some(BuilderError::ColumnOutOfRange {
                index: self.index.id().to_string(),
                position,
                len: self.index.len(),
            });
            return self;
        };
        let (expression, typ) = (column.expression.clone(), column.typ);

        if self.columns[position].is_some() {
            self.err = Some(BuilderError::RedundantRestriction {
                index: self.index.id().to_string(),
                expression,
            });
            return self;
        }

        match point_range(typ, &key) {
            Ok(Some(range)) => self.columns[position] = Some(range),
            Ok(None) => {
                debug!(
                    index = %self.index,
                    column = %expression,
                    key = %key,
                    "equality key matches no row"
                );
                self.empty = true;
            }
            Err(source) => {
                self.err = Some(BuilderError::KeyConversion {
                    index: self.index.id().to_string(),
                    expression,
                    source,
                });
            }
        }

        self
    }

    /// Finish as a single-range lookup; columns after the first
    /// unconstrained one are unrestricted.
    pub fn build(self) -> Result<IndexLookup, BuilderError> {
        if let Some(err) = self.err {
            return Err(err);
        }

        let lookup = if self.empty {
            IndexLookup::empty(Arc::clone(&self.index))
        } else {
            let prefix = self.columns.iter().take_while(|c| c.is_some()).count();
            let range: Range = self
                .columns
                .iter()
                .zip(self.index.column_expression_types())
                .enumerate()
                .map(|(i, (column, declared))| match column {
                    Some(column) if i < prefix => column.clone(),
                    _ => RangeColumnExpr::all(declared.typ),
                })
                .collect();

            IndexLookup::new(
                Arc::clone(&self.index),
                RangeCollection::new(vec![range]),
                false,
            )?
        };

        record(MetricsEvent::LookupBuilt {
            kind: LookupKind::Equality,
            index: self.index.id(),
            ranges: 1,
            empty: self.empty,
        });

        Ok(lookup)
    }
}

// Closed point range for `key`, or `None` when no row can hold it.
fn point_range(typ: ColumnType, key: &Value) -> Result<Option<RangeColumnExpr>, TypeError> {
    if key.is_null() {
        return Ok(None);
    }
    let inexact = typ
        .key_scale()
        .and_then(|scale| ScaledBounds::of(key, scale))
        .is_some_and(|bounds| bounds.is_inexact());
    if inexact {
        return Ok(None);
    }

    let (key, check) = typ.convert(key)?;
    if !check.is_in_range() {
        return Ok(None);
    }

    Ok(Some(RangeColumnExpr::closed(key.clone(), key, typ)))
}
