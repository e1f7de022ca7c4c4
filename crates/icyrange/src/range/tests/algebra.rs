use super::{T, boxed, closed, int, open};
use crate::{
    error::{ErrorClass, InternalError},
    range::{
        Range, RangeCollection, RangeColumnExpr, RangeCut, RangeError, RangeType,
        remove_overlapping_ranges, simplify_range_column,
    },
    types::ColumnType,
    value::Value,
};
use std::cmp::Ordering;

#[test]
fn single_point_is_not_empty_but_open_point_is() {
    assert!(!closed(5, 5).is_empty().expect("closed point"));
    assert!(open(5, 5).is_empty().expect("open point"));
    assert!(RangeColumnExpr::empty(T).is_empty().expect("empty"));
    assert!(!RangeColumnExpr::null(T).is_empty().expect("null"));
}

#[test]
fn constructors_classify_by_cut_pair() {
    let cases = [
        (RangeColumnExpr::all(T), RangeType::All),
        (RangeColumnExpr::empty(T), RangeType::Empty),
        (RangeColumnExpr::null(T), RangeType::EqualNull),
        (RangeColumnExpr::not_null(T), RangeType::NotNull),
        (RangeColumnExpr::greater_than(int(1), T), RangeType::GreaterThan),
        (RangeColumnExpr::greater_or_equal(int(1), T), RangeType::GreaterOrEqual),
        (RangeColumnExpr::less_than(int(1), T), RangeType::LessThan),
        (RangeColumnExpr::less_or_equal(int(1), T), RangeType::LessOrEqual),
        (open(1, 5), RangeType::OpenOpen),
        (closed(1, 5), RangeType::ClosedClosed),
        (RangeColumnExpr::closed_open(int(1), int(5), T), RangeType::ClosedOpen),
        (RangeColumnExpr::open_closed(int(1), int(5), T), RangeType::OpenClosed),
    ];

    for (expr, expected) in cases {
        assert_eq!(expr.range_type(), expected, "{expr}");
    }
}

#[test]
fn null_keyed_constructors_fold_into_null_shapes() {
    let expr = RangeColumnExpr::less_or_equal(Value::Null, T);

    assert_eq!(expr.range_type(), RangeType::Empty);
    assert!(expr.is_empty().expect("comparable"));
    assert_eq!(expr.upper_bound, RangeCut::AboveNull);
}

#[test]
fn binding_reports_open_sides() {
    let all = RangeColumnExpr::all(T);
    assert!(!all.has_lower_bound());
    assert!(!all.has_upper_bound());

    let gt = RangeColumnExpr::greater_than(int(3), T);
    assert!(gt.has_lower_bound());
    assert!(!gt.has_upper_bound());

    let not_null = RangeColumnExpr::not_null(T);
    assert!(not_null.has_lower_bound());
}

#[test]
fn display_uses_interval_notation() {
    assert_eq!(closed(1, 5).to_string(), "[1, 5]");
    assert_eq!(open(1, 5).to_string(), "(1, 5)");
    assert_eq!(
        RangeColumnExpr::closed_open(int(1), int(5), T).to_string(),
        "[1, 5)"
    );
    assert_eq!(RangeColumnExpr::all(T).to_string(), "[NULL, ∞)");
    assert_eq!(RangeColumnExpr::not_null(T).to_string(), "(NULL, ∞)");
    assert_eq!(RangeColumnExpr::null(T).to_string(), "[NULL, NULL]");
    assert_eq!(RangeColumnExpr::empty(T).to_string(), "∅");
    assert_eq!(boxed(&[(1, 2), (3, 4)]).to_string(), "([1, 2], [3, 4])");
}

#[test]
fn overlap_is_strict_but_connection_is_not() {
    let left = RangeColumnExpr::closed_open(int(1), int(5), T);
    let right = closed(5, 10);

    assert_eq!(left.overlaps(&right).expect("overlaps"), None);
    assert!(left.is_connected(&right).expect("connected"));

    assert_eq!(
        closed(1, 5).overlaps(&closed(5, 10)).expect("overlaps"),
        Some(closed(5, 5))
    );
}

#[test]
fn subtract_interior_leaves_two_wings() {
    let fragments = closed(1, 10).subtract(&closed(4, 6)).expect("subtract");

    assert_eq!(
        fragments,
        vec![
            RangeColumnExpr::closed_open(int(1), int(4), T),
            RangeColumnExpr::open_closed(int(6), int(10), T),
        ]
    );
}

#[test]
fn subtract_edge_cases() {
    // covering subtrahend
    assert!(closed(3, 4).subtract(&closed(1, 10)).expect("subtract").is_empty());
    // disjoint subtrahend
    assert_eq!(
        closed(1, 2).subtract(&closed(5, 6)).expect("subtract"),
        vec![closed(1, 2)]
    );
    // shared lower bound
    assert_eq!(
        closed(1, 10).subtract(&closed(1, 4)).expect("subtract"),
        vec![RangeColumnExpr::open_closed(int(4), int(10), T)]
    );
}

#[test]
fn union_requires_connection() {
    let adjacent = RangeColumnExpr::closed_open(int(1), int(5), T)
        .try_union(&closed(5, 10))
        .expect("union");
    assert_eq!(adjacent, Some(closed(1, 10)));

    assert_eq!(
        closed(1, 2).try_union(&closed(4, 5)).expect("union"),
        None
    );
    assert_eq!(
        RangeColumnExpr::empty(T)
            .try_union(&closed(4, 5))
            .expect("union"),
        Some(closed(4, 5))
    );
}

#[test]
fn different_types_have_no_relationship() {
    let ints = closed(1, 5);
    let texts = RangeColumnExpr::closed("a".into(), "z".into(), ColumnType::Text);

    assert!(!ints.is_connected(&texts).expect("connected"));
    assert_eq!(ints.try_intersect(&texts).expect("intersect"), None);
    assert!(!ints.is_subset_of(&texts).expect("subset"));
    assert!(!ints.equals(&texts).expect("equals"));
}

#[test]
fn simplify_merges_touching_ranges() {
    let simplified = simplify_range_column([closed(5, 10), closed(1, 5)]).expect("simplify");

    assert_eq!(simplified, vec![closed(1, 10)]);
}

#[test]
fn simplify_keeps_gaps_and_drops_empties() {
    let simplified = simplify_range_column([
        closed(8, 9),
        RangeColumnExpr::empty(T),
        open(1, 3),
        closed(2, 4),
    ])
    .expect("simplify");

    assert_eq!(
        simplified,
        vec![RangeColumnExpr::open_closed(int(1), int(4), T), closed(8, 9)]
    );
    assert!(
        simplify_range_column([RangeColumnExpr::empty(T)])
            .expect("simplify")
            .is_empty()
    );
}

#[test]
fn simplify_rejects_mixed_types() {
    let err = simplify_range_column([
        closed(1, 2),
        RangeColumnExpr::all(ColumnType::Text),
    ])
    .expect_err("mixed types");

    assert!(matches!(err, RangeError::TypeMismatch { .. }));
}

#[test]
fn range_intersect_empties_whole_row_on_disjoint_column() {
    let left = boxed(&[(1, 5), (1, 5)]);
    let right = boxed(&[(3, 8), (6, 9)]);

    let result = left.intersect(&right).expect("intersect");
    assert!(result.is_empty().expect("empty"));
    assert_eq!(result.len(), 2);

    let result = left.intersect(&boxed(&[(3, 8), (2, 3)])).expect("intersect");
    assert_eq!(result, boxed(&[(3, 5), (2, 3)]));
}

#[test]
fn arity_mismatch_is_no_relationship_except_compare() {
    let one = boxed(&[(1, 5)]);
    let two = boxed(&[(1, 5), (1, 5)]);

    assert_eq!(one.overlaps(&two).expect("overlaps"), None);
    assert!(!one.is_subset_of(&two).expect("subset"));
    assert!(one.intersect(&two).expect("intersect").is_empty().expect("empty"));

    let err = one.compare(&two).expect_err("arity mismatch");
    assert_eq!(err, RangeError::ArityMismatch { left: 1, right: 2 });

    let internal = InternalError::from(err);
    assert_eq!(internal.class, ErrorClass::InvariantViolation);
}

#[test]
fn compare_is_lexicographic_over_columns() {
    let a = boxed(&[(1, 5), (1, 9)]);
    let b = boxed(&[(1, 5), (2, 3)]);

    assert_eq!(a.compare(&b).expect("compare"), Ordering::Less);
    assert_eq!(b.compare(&a).expect("compare"), Ordering::Greater);
    assert_eq!(a.compare(&a).expect("compare"), Ordering::Equal);
}

#[test]
fn merge_needs_containment_or_one_differing_column() {
    let big = boxed(&[(1, 10), (1, 10)]);
    let small = boxed(&[(2, 3), (2, 3)]);
    assert_eq!(big.try_merge(&small).expect("merge"), Some(big.clone()));
    assert_eq!(small.try_merge(&big).expect("merge"), Some(big.clone()));

    let left = boxed(&[(1, 5), (1, 10)]);
    let right = boxed(&[(5, 9), (1, 10)]);
    assert_eq!(
        left.try_merge(&right).expect("merge"),
        Some(boxed(&[(1, 9), (1, 10)]))
    );

    let diagonal = boxed(&[(5, 9), (5, 15)]);
    assert_eq!(left.try_merge(&diagonal).expect("merge"), None);
}

#[test]
fn remove_overlap_splits_l_shape_into_three_boxes() {
    let r1 = boxed(&[(1, 10), (1, 10)]);
    let r2 = boxed(&[(5, 15), (5, 15)]);

    let (fragments, changed) = r1.remove_overlap(&r2).expect("remove overlap");

    assert!(changed);
    assert_eq!(
        fragments,
        vec![
            Range::new(vec![
                RangeColumnExpr::closed_open(int(1), int(5), T),
                closed(1, 10),
            ]),
            Range::new(vec![
                RangeColumnExpr::open_closed(int(10), int(15), T),
                closed(5, 15),
            ]),
            boxed(&[(5, 10), (1, 15)]),
        ]
    );
}

#[test]
fn remove_overlap_leaves_disjoint_ranges_alone() {
    let r1 = boxed(&[(1, 2), (1, 2)]);
    let r2 = boxed(&[(5, 6), (1, 2)]);

    let (fragments, changed) = r1.remove_overlap(&r2).expect("remove overlap");

    assert!(!changed);
    assert_eq!(fragments, vec![r1, r2]);
}

#[test]
fn collection_intersect_is_or_of_pairwise_ands() {
    let left = RangeCollection::new(vec![boxed(&[(1, 5)]), boxed(&[(10, 20)])]);
    let right = RangeCollection::new(vec![boxed(&[(4, 12)])]);

    let result = left.intersect(&right).expect("intersect");

    assert_eq!(result.len(), 2);
    assert!(result.contains(&boxed(&[(4, 5)])));
    assert!(result.contains(&boxed(&[(10, 12)])));
    result.validate().expect("disjoint");
}

#[test]
fn remove_overlapping_ranges_merges_and_drops_empties() {
    let result = remove_overlapping_ranges([
        boxed(&[(1, 5)]),
        Range::empty([T]),
        boxed(&[(3, 8)]),
        boxed(&[(20, 30)]),
        boxed(&[(8, 9)]),
    ])
    .expect("remove overlaps");

    assert_eq!(
        result,
        RangeCollection::new(vec![boxed(&[(1, 9)]), boxed(&[(20, 30)])])
    );
    assert_eq!(result.to_string(), "[([1, 9]), ([20, 30])]");
}

#[test]
fn remove_overlapping_ranges_of_only_empties_is_empty() {
    let result =
        remove_overlapping_ranges([Range::empty([T, T]), Range::empty([T, T])]).expect("remove");

    assert_eq!(result.len(), 0);
    assert!(result.is_empty().expect("empty"));
}

#[test]
fn validate_reports_residual_overlap() {
    let collection = RangeCollection::new(vec![boxed(&[(1, 5)]), boxed(&[(4, 8)])]);

    let err = collection.validate().expect_err("overlap");
    assert!(matches!(err, RangeError::ResidualOverlap { .. }));
}
