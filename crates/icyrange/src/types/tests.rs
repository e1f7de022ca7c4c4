use crate::{
    types::{ColumnType, RangeCheck, TypeError},
    value::{Point, Value},
};
use rust_decimal::Decimal;
use std::cmp::Ordering;

// ---- helpers -----------------------------------------------------------

fn dec(num: i64, scale: u32) -> Value {
    Value::Decimal(Decimal::new(num, scale))
}

#[test]
fn null_sorts_below_every_value() {
    for ty in [ColumnType::Int64, ColumnType::Text, ColumnType::Point] {
        let non_null = match ty {
            ColumnType::Point => Value::Point(Point::new(0.0, 0.0)),
            ColumnType::Text => Value::from(""),
            _ => Value::Int(i64::MIN),
        };

        assert_eq!(ty.compare(&Value::Null, &non_null), Ok(Ordering::Less));
        assert_eq!(ty.compare(&non_null, &Value::Null), Ok(Ordering::Greater));
        assert_eq!(ty.compare(&Value::Null, &Value::Null), Ok(Ordering::Equal));
    }
}

#[test]
fn numeric_compare_mixes_representations_exactly() {
    let ty = ColumnType::Decimal {
        precision: 10,
        scale: 2,
    };

    assert_eq!(ty.compare(&Value::Int(2), &dec(250, 2)), Ok(Ordering::Less));
    assert_eq!(ty.compare(&dec(300, 2), &Value::Uint(3)), Ok(Ordering::Equal));
    assert_eq!(
        ColumnType::Float64.compare(&Value::Float(2.5), &Value::from("2.5")),
        Ok(Ordering::Equal)
    );
}

#[test]
fn text_compare_coerces_blobs() {
    assert_eq!(
        ColumnType::Text.compare(&Value::Blob(b"abc".to_vec()), &Value::from("abd")),
        Ok(Ordering::Less)
    );
}

#[test]
fn incomparable_values_are_reported() {
    let err = ColumnType::Int64
        .compare(&Value::from("x"), &Value::Int(1))
        .expect_err("text is not numeric");

    assert!(matches!(err, TypeError::Incomparable { .. }));
}

#[test]
fn integer_conversion_rounds_and_clamps() {
    assert_eq!(
        ColumnType::Int64.convert(&Value::Float(2.5)),
        Ok((Value::Int(3), RangeCheck::InRange))
    );
    assert_eq!(
        ColumnType::Int64.convert(&dec(-25, 1)),
        Ok((Value::Int(-3), RangeCheck::InRange))
    );
    assert_eq!(
        ColumnType::Int8.convert(&Value::Int(300)),
        Ok((Value::Int(127), RangeCheck::Overflow))
    );
    assert_eq!(
        ColumnType::Uint8.convert(&Value::Int(-1)),
        Ok((Value::Uint(0), RangeCheck::Underflow))
    );
    assert_eq!(
        ColumnType::Int32.convert(&Value::Float(1e20)),
        Ok((Value::Int(i64::from(i32::MAX)), RangeCheck::Overflow))
    );
}

#[test]
fn decimal_conversion_rescales_and_clamps_precision() {
    let ty = ColumnType::Decimal {
        precision: 4,
        scale: 2,
    };

    assert_eq!(
        ty.convert(&Value::from("1.235")),
        Ok((dec(124, 2), RangeCheck::InRange))
    );
    assert_eq!(
        ty.convert(&Value::Int(100)),
        Ok((dec(9999, 2), RangeCheck::Overflow))
    );
}

#[test]
fn infinite_keys_clamp_to_the_domain_edge() {
    let decimal = ColumnType::Decimal {
        precision: 4,
        scale: 2,
    };

    assert_eq!(
        ColumnType::Int8.convert(&Value::Float(f64::INFINITY)),
        Ok((Value::Int(127), RangeCheck::Overflow))
    );
    assert_eq!(
        ColumnType::Uint16.convert(&Value::Float(f64::NEG_INFINITY)),
        Ok((Value::Uint(0), RangeCheck::Underflow))
    );
    assert_eq!(
        ColumnType::Float64.convert(&Value::Float(f64::INFINITY)),
        Ok((Value::Float(f64::MAX), RangeCheck::Overflow))
    );
    assert_eq!(
        decimal.convert(&Value::Float(f64::NEG_INFINITY)),
        Ok((dec(-9999, 2), RangeCheck::Underflow))
    );
    assert_eq!(
        decimal.convert(&Value::Float(1e40)),
        Ok((dec(9999, 2), RangeCheck::Overflow))
    );

    assert!(matches!(
        ColumnType::Int64.convert(&Value::Float(f64::NAN)),
        Err(TypeError::InvalidValue { .. })
    ));
}

#[test]
fn conversion_rejects_non_numeric_text() {
    let err = ColumnType::Int64
        .convert(&Value::from("abc"))
        .expect_err("text is not numeric");

    assert!(matches!(err, TypeError::InvalidValue { .. }));
    assert!(err.to_string().contains("bigint"));
}

#[test]
fn null_converts_to_null_for_every_type() {
    for ty in [ColumnType::Int8, ColumnType::Text, ColumnType::Point] {
        assert_eq!(ty.convert(&Value::Null), Ok((Value::Null, RangeCheck::InRange)));
    }
}

#[test]
fn promote_widens_within_family() {
    assert_eq!(ColumnType::Int8.promote(), ColumnType::Int64);
    assert_eq!(ColumnType::Uint16.promote(), ColumnType::Uint64);
    assert_eq!(ColumnType::Float32.promote(), ColumnType::Float64);
    assert_eq!(ColumnType::Text.promote(), ColumnType::Text);
}

#[test]
fn number_class_marks_integers() {
    assert!(ColumnType::Int32.is_integer());
    assert!(!ColumnType::Float64.is_integer());
    assert!(
        !ColumnType::Decimal {
            precision: 5,
            scale: 0
        }
        .is_integer()
    );
    assert_eq!(ColumnType::Uint8.number_class().map(|c| c.signed), Some(false));
}
