//! Module: builder
//! Responsibility: translate per-column predicates into index ranges and
//! compose them into lookups.
//! Does not own: range algebra (see `range`) or filter-tree walking (see `scan`).

mod equality;
mod rounding;
mod spatial;


use crate::{
    config::RangeConfig,
    error::{ErrorClass, ErrorOrigin, InternalError},
    lookup::IndexLookup,
    model::IndexModel,
    obs::sink::{LookupKind, MetricsEvent, record},
    range::{Range, RangeCollection, RangeColumnExpr, RangeError, simplify_range_column},
    types::{ColumnType, RangeCheck, TypeError},
    value::Value,
};
use rounding::{KeyOp, Rounded, ScaledBounds};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::debug;

// re-exports
pub use equality::EqualityIndexBuilder;
pub use spatial::SpatialIndexBuilder;

///
/// BuilderError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BuilderError {
    #[error("column expression '{expression}' is not part of index '{index}'")]
    UnknownColumn { index: String, expression: String },

    #[error("column position {position} is out of range for index '{index}' ({len} columns)")]
    ColumnOutOfRange {
        index: String,
        position: usize,
        len: usize,
    },

    #[error("{key_type} key for column '{expression}' of index '{index}' cannot be used: {source}")]
    Conversion {
        index: String,
        expression: String,
        key_type: ColumnType,
        source: TypeError,
    },

    #[error("key for column '{expression}' of index '{index}' cannot be used: {source}")]
    KeyConversion {
        index: String,
        expression: String,
        source: TypeError,
    },

    #[error("column '{expression}' of index '{index}' is already restricted")]
    RedundantRestriction { index: String, expression: String },

    #[error("index '{index}' expands to more than {limit} ranges")]
    TooManyRanges { index: String, limit: usize },

    #[error("index '{0}' is not a spatial index")]
    NotSpatial(String),

    #[error(transparent)]
    Range(#[from] RangeError),
}

impl BuilderError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownColumn { .. } => ErrorClass::NotFound,
            Self::Conversion { .. }
            | Self::KeyConversion { .. }
            | Self::TooManyRanges { .. }
            | Self::NotSpatial(_) => ErrorClass::Unsupported,
            Self::RedundantRestriction { .. } => ErrorClass::Conflict,
            Self::ColumnOutOfRange { .. } => ErrorClass::InvariantViolation,
            Self::Range(err) => err.class(),
        }
    }
}

impl From<BuilderError> for InternalError {
    fn from(err: BuilderError) -> Self {
        match err {
            BuilderError::Range(err) => err.into(),
            err => Self::new(err.class(), ErrorOrigin::Builder, err.to_string()),
        }
    }
}

///
/// IndexBuilder
///
/// Fluent translator from column predicates to the ranges of one index.
///
/// Each predicate narrows the OR-list of ranges kept for its column by
/// intersecting against what the column already holds. A column whose list
/// becomes empty makes the builder invalid: it still builds, yielding the
/// empty lookup. An unknown column or an unusable key poisons the builder
/// instead, and `ranges`/`build` report that first error. Once invalid or
/// poisoned, further predicates are ignored.
///

#[derive(Clone, Debug)]
pub struct IndexBuilder {
    index: Arc<IndexModel>,
    config: RangeConfig,
    columns: Vec<Option<Vec<RangeColumnExpr>>>,
    invalid: bool,
    err: Option<BuilderError>,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(index: Arc<IndexModel>) -> Self {
        Self::with_config(index, RangeConfig::default())
    }

    #[must_use]
    pub fn with_config(index: Arc<IndexModel>, config: RangeConfig) -> Self {
        let columns = vec![None; index.len()];

        Self {
            index,
            config,
            columns,
            invalid: false,
            err: None,
        }
    }

    #[must_use]
    pub const fn index(&self) -> &Arc<IndexModel> {
        &self.index
    }

    /// Whether the accumulated predicates can match no row.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// The error that poisoned this builder, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&BuilderError> {
        self.err.as_ref()
    }

    /// `column = key` for each key; several keys form an IN list.
    #[must_use]
    pub fn equals(
        mut self,
        column: &str,
        key_type: ColumnType,
        keys: impl IntoIterator<Item = Value>,
    ) -> Self {
        let Some((position, typ)) = self.resolve(column) else {
            return self;
        };

        let mut candidates = Vec::new();
        for key in keys {
            match key_ranges(KeyOp::Eq, typ, &key) {
                Ok(ranges) => candidates.extend(ranges),
                Err(source) => {
                    self.poison_conversion(column, key_type, source);
                    return self;
                }
            }
        }

        self.update_column(position, column, candidates);
        self
    }

    /// `column <> key`
    #[must_use]
    pub fn not_equals(self, column: &str, key_type: ColumnType, key: &Value) -> Self {
        self.compare(KeyOp::NotEq, column, key_type, key)
    }

    /// `column > key`
    #[must_use]
    pub fn greater_than(self, column: &str, key_type: ColumnType, key: &Value) -> Self {
        self.compare(KeyOp::Gt, column, key_type, key)
    }

    /// `column >= key`
    #[must_use]
    pub fn greater_or_equal(self, column: &str, key_type: ColumnType, key: &Value) -> Self {
        self.compare(KeyOp::Gte, column, key_type, key)
    }

    /// `column < key`
    #[must_use]
    pub fn less_than(self, column: &str, key_type: ColumnType, key: &Value) -> Self {
        self.compare(KeyOp::Lt, column, key_type, key)
    }

    /// `column <= key`
    #[must_use]
    pub fn less_or_equal(self, column: &str, key_type: ColumnType, key: &Value) -> Self {
        self.compare(KeyOp::Lte, column, key_type, key)
    }

    /// `column IS NULL`
    #[must_use]
    pub fn is_null(mut self, column: &str) -> Self {
        if let Some((position, typ)) = self.resolve(column) {
            self.update_column(position, column, vec![RangeColumnExpr::null(typ)]);
        }
        self
    }

    /// `column IS NOT NULL`
    #[must_use]
    pub fn is_not_null(mut self, column: &str) -> Self {
        if let Some((position, typ)) = self.resolve(column) {
            self.update_column(position, column, vec![RangeColumnExpr::not_null(typ)]);
        }
        self
    }

    /// Expand the per-column OR-lists into ranges over the full index.
    ///
    /// Only the leading run of constrained columns is used; every later
    /// column is unrestricted. Combinations that match nothing are dropped,
    /// and an invalid builder (or one with no surviving combination) yields
    /// a single empty range.
    pub fn ranges(&self) -> Result<RangeCollection, BuilderError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let types: Vec<ColumnType> = self
            .index
            .column_expression_types()
            .iter()
            .map(|c| c.typ)
            .collect();
        if self.invalid {
            return Ok(RangeCollection::new(vec![Range::empty(types)]));
        }

        // Phase 1: constrained prefix and the size of its cross product.
        let prefix: Vec<&[RangeColumnExpr]> = self
            .columns
            .iter()
            .map_while(|column| column.as_deref())
            .collect();
        let limit = self.config.max_range_permutations;
        let count = prefix
            .iter()
            .try_fold(1_usize, |acc, column| acc.checked_mul(column.len()));
        if count.is_none_or(|count| count > limit) {
            return Err(BuilderError::TooManyRanges {
                index: self.index.id().to_string(),
                limit,
            });
        }

        // Phase 2: odometer over the prefix, last column fastest.
        let mut digits = vec![0_usize; prefix.len()];
        let mut ranges = Vec::new();
        'odometer: loop {
            let range: Range = prefix
                .iter()
                .zip(&digits)
                .map(|(column, &digit)| column[digit].clone())
                .chain(types[prefix.len()..].iter().map(|&typ| RangeColumnExpr::all(typ)))
                .collect();
            if !range.is_empty()? {
                ranges.push(range);
            }

            for i in (0..digits.len()).rev() {
                digits[i] += 1;
                if digits[i] < prefix[i].len() {
                    continue 'odometer;
                }
                digits[i] = 0;
            }
            break;
        }

        if ranges.is_empty() {
            ranges.push(Range::empty(types));
        }

        Ok(RangeCollection::new(ranges))
    }

    /// Finish the builder as a lookup over its index.
    pub fn build(&self) -> Result<IndexLookup, BuilderError> {
        let ranges = self.ranges()?;
        let empty = self.invalid || ranges.is_empty()?;
        let lookup = if empty {
            IndexLookup::empty(Arc::clone(&self.index))
        } else {
            IndexLookup::new(Arc::clone(&self.index), ranges, false)?
        };

        record(MetricsEvent::LookupBuilt {
            kind: LookupKind::General,
            index: self.index.id(),
            ranges: lookup.ranges().len() as u64,
            empty,
        });

        Ok(lookup)
    }

    fn compare(mut self, op: KeyOp, column: &str, key_type: ColumnType, key: &Value) -> Self {
        let Some((position, typ)) = self.resolve(column) else {
            return self;
        };

        match key_ranges(op, typ, key) {
            Ok(candidates) => self.update_column(position, column, candidates),
            Err(source) => self.poison_conversion(column, key_type, source),
        }
        self
    }

    // Position and type of a column, or `None` when the builder should
    // ignore the predicate (already settled, or unknown column).
    fn resolve(&mut self, column: &str) -> Option<(usize, ColumnType)> {
        if self.invalid || self.err.is_some() {
            return None;
        }

        let resolved = self.index.column(column);
        if resolved.is_none() {
            self.poison(BuilderError::UnknownColumn {
                index: self.index.id().to_string(),
                expression: column.to_string(),
            });
        }

        resolved
    }

    // AND the candidate OR-list into the column's current list.
    fn update_column(&mut self, position: usize, column: &str, candidates: Vec<RangeColumnExpr>) {
        let narrowed = match self.columns[position].take() {
            None => simplify_range_column(candidates),
            Some(current) => intersect_lists(&current, &candidates),
        };

        match narrowed {
            Ok(ranges) if ranges.is_empty() => self.invalidate(column),
            Ok(ranges) => self.columns[position] = Some(ranges),
            Err(err) => self.poison(err.into()),
        }
    }

    fn invalidate(&mut self, column: &str) {
        debug!(index = %self.index, column, "index builder matches no row");
        record(MetricsEvent::BuilderInvalidated {
            index: self.index.id(),
        });

        self.invalid = true;
    }

    fn poison_conversion(&mut self, column: &str, key_type: ColumnType, source: TypeError) {
        self.poison(BuilderError::Conversion {
            index: self.index.id().to_string(),
            expression: column.to_string(),
            key_type,
            source,
        });
    }

    fn poison(&mut self, err: BuilderError) {
        debug!(index = %self.index, error = %err, "index builder poisoned");
        record(MetricsEvent::BuilderErrored {
            index: self.index.id(),
        });

        self.err = Some(err);
    }
}

// Pairwise intersections of two OR-lists, merged back into disjoint order.
fn intersect_lists(
    current: &[RangeColumnExpr],
    candidates: &[RangeColumnExpr],
) -> Result<Vec<RangeColumnExpr>, RangeError> {
    let mut narrowed = Vec::new();
    for a in current {
        for b in candidates {
            if let Some(range) = a.try_intersect(b)? {
                narrowed.push(range);
            }
        }
    }

    simplify_range_column(narrowed)
}

/// Column ranges admitted by `column <op> key`.
///
/// NULL keys admit nothing. Integer and decimal columns first round keys
/// with more fractional digits than they store, in the direction that keeps
/// every matching row; keys outside the column's domain widen or empty the
/// comparison rather than compare against the clamped value.
fn key_ranges(op: KeyOp, typ: ColumnType, key: &Value) -> Result<Vec<RangeColumnExpr>, TypeError> {
    if key.is_null() {
        return Ok(Vec::new());
    }

    // Phase 1: fit keys to the column scale.
    let bounds = typ
        .key_scale()
        .and_then(|scale| ScaledBounds::of(key, scale));
    let (key, op) = match bounds {
        Some(bounds) => match bounds.round(op) {
            Rounded::Key { key, op } => (key, op),
            Rounded::Empty => return Ok(Vec::new()),
            Rounded::NotNull => return Ok(vec![RangeColumnExpr::not_null(typ)]),
        },
        None => (key.clone(), op),
    };

    // Phase 2: coerce into the column domain.
    let (key, check) = typ.convert(&key)?;
    let ranges = match (op, check) {
        (KeyOp::Eq, RangeCheck::InRange) => vec![RangeColumnExpr::closed(key.clone(), key, typ)],
        (KeyOp::NotEq, RangeCheck::InRange) => vec![
            RangeColumnExpr::less_than(key.clone(), typ),
            RangeColumnExpr::greater_than(key, typ),
        ],
        (KeyOp::Gt, RangeCheck::InRange) => vec![RangeColumnExpr::greater_than(key, typ)],
        (KeyOp::Gte, RangeCheck::InRange) => vec![RangeColumnExpr::greater_or_equal(key, typ)],
        (KeyOp::Lt, RangeCheck::InRange) => vec![RangeColumnExpr::less_than(key, typ)],
        (KeyOp::Lte, RangeCheck::InRange) => vec![RangeColumnExpr::less_or_equal(key, typ)],

        (KeyOp::NotEq, _)
        | (KeyOp::Gt | KeyOp::Gte, RangeCheck::Underflow)
        | (KeyOp::Lt | KeyOp::Lte, RangeCheck::Overflow) => vec![RangeColumnExpr::not_null(typ)],

        (KeyOp::Eq, _)
        | (KeyOp::Gt | KeyOp::Gte, RangeCheck::Overflow)
        | (KeyOp::Lt | KeyOp::Lte, RangeCheck::Underflow) => Vec::new(),
    };

    Ok(ranges)
}
