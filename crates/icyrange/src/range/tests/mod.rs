mod algebra;

use crate::{
    range::{Range, RangeColumnExpr, RangeCut},
    types::ColumnType,
    value::Value,
};
use std::cmp::Ordering;

// ---- helpers -----------------------------------------------------------

const T: ColumnType = ColumnType::Int64;

pub(super) fn int(v: i64) -> Value {
    Value::Int(v)
}

pub(super) fn closed(lo: i64, hi: i64) -> RangeColumnExpr {
    RangeColumnExpr::closed(int(lo), int(hi), T)
}

pub(super) fn open(lo: i64, hi: i64) -> RangeColumnExpr {
    RangeColumnExpr::open(int(lo), int(hi), T)
}

pub(super) fn boxed(cols: &[(i64, i64)]) -> Range {
    cols.iter().map(|&(lo, hi)| closed(lo, hi)).collect()
}

/// Whether `value` lies strictly between the expression's cuts.
pub(super) fn contains(expr: &RangeColumnExpr, value: &Value) -> bool {
    let lower = expr
        .lower_bound
        .compare(&RangeCut::below(value.clone()), expr.typ)
        .expect("comparable lower cut");
    let upper = expr
        .upper_bound
        .compare(&RangeCut::above(value.clone()), expr.typ)
        .expect("comparable upper cut");

    lower != Ordering::Greater && upper != Ordering::Less
}

pub(super) fn range_contains(range: &Range, point: &[Value]) -> bool {
    range
        .iter()
        .zip(point)
        .all(|(expr, value)| contains(expr, value))
}
