//! Module: scan
//! Responsibility: turn a normalised filter tree into the lookup of one
//! candidate index.
//! Does not own: filter normalisation, costing, or choosing between indexes.


use crate::{
    builder::{BuilderError, IndexBuilder},
    error::InternalError,
    lookup::IndexLookup,
    model::IndexModel,
    range::{
        Range, RangeCollection, RangeColumnExpr, RangeCut, RangeType, remove_overlapping_ranges,
    },
    types::ColumnType,
    value::{Point, Value},
};
use std::{fmt, sync::Arc};
use tracing::debug;

///
/// ScanOp
/// Comparison carried by one filter leaf.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanOp {
    Eq,
    NotEq,
    InSet,
    NotInSet,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
    IsNotNull,
    NullSafeEq,
    SpatialEq,
}

impl ScanOp {
    // Number of literal values the operator reads; `None` for any count.
    const fn arity(self) -> Option<usize> {
        match self {
            Self::IsNull | Self::IsNotNull => Some(0),
            Self::InSet | Self::NotInSet | Self::SpatialEq => None,
            Self::Eq | Self::NotEq | Self::Gt | Self::Gte | Self::Lt | Self::Lte | Self::NullSafeEq => {
                Some(1)
            }
        }
    }
}

impl fmt::Display for ScanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::InSet => "IN",
            Self::NotInSet => "NOT IN",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::NullSafeEq => "<=>",
            Self::SpatialEq => "ST_EQUALS",
        };
        f.write_str(label)
    }
}

///
/// IndexFilter
///
/// Filter tree over the columns of one index. Leaves compare a column
/// expression against literal values of `key_type`.
///

#[derive(Clone, Debug, PartialEq)]
pub enum IndexFilter {
    Leaf {
        column: String,
        op: ScanOp,
        key_type: ColumnType,
        values: Vec<Value>,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
}

impl IndexFilter {
    #[must_use]
    pub fn leaf(
        column: impl Into<String>,
        op: ScanOp,
        key_type: ColumnType,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self::Leaf {
            column: column.into(),
            op,
            key_type,
            values: values.into_iter().collect(),
        }
    }
}

/// Lookup of `index` for `filter`.
///
/// `None` means the index cannot narrow the scan: the filter leaves the
/// leading column open, or a spatial index would need disjoint ranges.
pub fn lookup_for_filter(
    index: Arc<IndexModel>,
    filter: &IndexFilter,
) -> Result<Option<IndexLookup>, InternalError> {
    let ranges = remove_overlapping_ranges(filter_ranges(&index, filter)?)?;

    match ranges.as_slice() {
        [] => return Ok(Some(IndexLookup::empty(index))),
        [range] if leads_with_all(range) => {
            debug!(index = %index, "filter leaves the leading index column open");
            return Ok(None);
        }
        _ => {}
    }
    if index.is_spatial() && ranges.len() > 1 {
        debug!(index = %index, ranges = ranges.len(), "spatial index cannot scan disjoint ranges");
        return Ok(None);
    }

    let spatial = index.is_spatial();
    Ok(Some(IndexLookup::new(index, ranges, spatial)?))
}

fn leads_with_all(range: &Range) -> bool {
    range
        .first()
        .is_some_and(|column| column.range_type() == RangeType::All)
}

fn filter_ranges(
    index: &Arc<IndexModel>,
    filter: &IndexFilter,
) -> Result<RangeCollection, InternalError> {
    match filter {
        IndexFilter::Leaf {
            column,
            op,
            key_type,
            values,
        } => leaf_ranges(index, column, *op, *key_type, values),
        IndexFilter::And(children) => and_ranges(index, children),
        IndexFilter::Or(children) => {
            let mut ranges = RangeCollection::default();
            for child in children {
                for range in filter_ranges(index, child)? {
                    ranges.push(range);
                }
            }

            Ok(ranges)
        }
    }
}

// Leaf children share one builder; every other child is intersected in.
fn and_ranges(
    index: &Arc<IndexModel>,
    children: &[IndexFilter],
) -> Result<RangeCollection, InternalError> {
    let mut builder = IndexBuilder::new(Arc::clone(index));
    let mut parts = Vec::new();

    for child in children {
        match child {
            IndexFilter::Leaf {
                column,
                op,
                key_type,
                values,
            } if *op != ScanOp::SpatialEq => {
                builder = apply_leaf(builder, column, *op, *key_type, values)?;
            }
            _ => parts.push(filter_ranges(index, child)?),
        }
    }

    let mut ranges = builder.ranges()?;
    for part in parts {
        ranges = ranges.intersect(&part)?;
    }

    Ok(ranges)
}

fn leaf_ranges(
    index: &Arc<IndexModel>,
    column: &str,
    op: ScanOp,
    key_type: ColumnType,
    values: &[Value],
) -> Result<RangeCollection, InternalError> {
    if op == ScanOp::SpatialEq {
        return spatial_ranges(index, column, values);
    }

    let builder = apply_leaf(IndexBuilder::new(Arc::clone(index)), column, op, key_type, values)?;

    Ok(builder.ranges()?)
}

fn apply_leaf(
    builder: IndexBuilder,
    column: &str,
    op: ScanOp,
    key_type: ColumnType,
    values: &[Value],
) -> Result<IndexBuilder, InternalError> {
    if let Some(expected) = op.arity()
        && values.len() != expected
    {
        return Err(InternalError::scan_unsupported(format!(
            "'{column} {op}' expects {expected} value(s), got {}",
            values.len()
        )));
    }

    let builder = match (op, values) {
        (ScanOp::Eq | ScanOp::InSet, _) => builder.equals(column, key_type, values.iter().cloned()),
        (ScanOp::NullSafeEq, [Value::Null]) | (ScanOp::IsNull, _) => builder.is_null(column),
        (ScanOp::NullSafeEq, _) => builder.equals(column, key_type, values.iter().cloned()),
        (ScanOp::IsNotNull, _) => builder.is_not_null(column),
        (ScanOp::NotEq | ScanOp::NotInSet, _) => values
            .iter()
            .fold(builder, |b, value| b.not_equals(column, key_type, value)),
        (ScanOp::Gt, [value]) => builder.greater_than(column, key_type, value),
        (ScanOp::Gte, [value]) => builder.greater_or_equal(column, key_type, value),
        (ScanOp::Lt, [value]) => builder.less_than(column, key_type, value),
        (ScanOp::Lte, [value]) => builder.less_or_equal(column, key_type, value),
        (ScanOp::Gt | ScanOp::Gte | ScanOp::Lt | ScanOp::Lte | ScanOp::SpatialEq, _) => {
            return Err(InternalError::scan_unsupported(format!(
                "'{column} {op}' cannot drive an index builder"
            )));
        }
    };

    Ok(builder)
}

// Closed bounding box of the literal geometry on the spatial column.
fn spatial_ranges(
    index: &Arc<IndexModel>,
    column: &str,
    values: &[Value],
) -> Result<RangeCollection, InternalError> {
    if !index.is_spatial() {
        return Err(BuilderError::NotSpatial(index.id().to_string()).into());
    }
    let Some((_, typ)) = index.column(column) else {
        return Err(BuilderError::UnknownColumn {
            index: index.id().to_string(),
            expression: column.to_string(),
        }
        .into());
    };

    let points = values
        .iter()
        .map(|value| match value {
            Value::Point(p) => Ok(*p),
            other => Err(InternalError::scan_unsupported(format!(
                "spatial filter on '{column}' expects points, got {}",
                other.kind()
            ))),
        })
        .collect::<Result<Vec<Point>, _>>()?;
    let Some((lower, upper)) = bounding_box(&points) else {
        return Err(InternalError::scan_unsupported(format!(
            "spatial filter on '{column}' has no points"
        )));
    };

    let column = RangeColumnExpr::new(
        RangeCut::below(Value::Point(lower)),
        RangeCut::above(Value::Point(upper)),
        typ,
    );

    Ok(RangeCollection::new(vec![Range::new(vec![column])]))
}

fn bounding_box(points: &[Point]) -> Option<(Point, Point)> {
    let first = *points.first()?;

    Some(points.iter().fold((first, first), |(lo, hi), p| {
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    }))
}
