use ascl_ast::{IdRef, Meta, Nominal, NominalKind, TypeKind};
use ascl_core::meta::{compare, eval};
use ascl_core::ErrorKind;

fn nominal(id: u32, name: &str, kind: NominalKind) -> Option<Nominal> {
    Some(Nominal {
        id: IdRef(id),
        name: name.to_string(),
        kind,
    })
}

fn i32m() -> Meta {
    Meta::new(TypeKind::Int32)
}

#[test]
fn compare_is_directional_between_map_and_object() {
    let map = Meta::map(Meta::new(TypeKind::String), i32m());
    let obj = Meta::object(None);

    compare(&map, &obj).expect("object reference stored into a map");
    let err = compare(&obj, &map).expect_err("map is not an object");
    assert!(matches!(err.kind, ErrorKind::MismatchedType { .. }));
}

#[test]
fn tuple_target_spreads_nested_tuples() {
    let x = Meta::tuple(vec![i32m(), i32m(), i32m()]);

    let nested = Meta::tuple(vec![i32m(), Meta::tuple(vec![i32m(), i32m()])]);
    compare(&x, &nested).expect("three values after spreading");

    let short = Meta::tuple(vec![i32m(), i32m()]);
    let err = compare(&x, &short).expect_err("too few values");
    assert_eq!(
        err.kind,
        ErrorKind::MismatchedCount {
            label: "element",
            expected: 3,
            found: 2,
        }
    );
}

#[test]
fn struct_from_tuple_checks_field_count() {
    let mut s = Meta::default();
    s.set_struct(
        Nominal {
            id: IdRef(0),
            name: "S".to_string(),
            kind: NominalKind::Struct,
        },
        vec![i32m()],
    );
    let pair = Meta::tuple(vec![Meta::untyped(TypeKind::Int64); 2]);

    let err = compare(&s, &pair).expect_err("one field, two values");
    assert_eq!(
        err.kind,
        ErrorKind::MismatchedCount {
            label: "field",
            expected: 1,
            found: 2,
        }
    );
}

#[test]
fn contract_objects_match_by_declaration() {
    let a = Meta::object(nominal(1, "A", NominalKind::Contract));
    let b = Meta::object(nominal(2, "B", NominalKind::Contract));

    compare(&a, &a.clone()).expect("same contract");
    assert!(compare(&a, &b).is_err());

    let itf = Meta::object(nominal(3, "I", NominalKind::Interface));
    compare(&itf, &a).expect("any contract through an interface");
    compare(&itf, &b).expect("any contract through an interface");
}

#[test]
fn contract_target_rejects_an_interface_value() {
    let cont = Meta::object(nominal(1, "A", NominalKind::Contract));
    let itf = Meta::object(nominal(3, "I", NominalKind::Interface));

    let err = compare(&cont, &itf).expect_err("interface is not a particular contract");
    assert_eq!(
        err.kind,
        ErrorKind::MismatchedType {
            expected: "A".to_string(),
            found: "I".to_string(),
        }
    );
}

fn structure(id: u32, name: &str) -> Meta {
    let mut s = Meta::default();
    s.set_struct(
        Nominal {
            id: IdRef(id),
            name: name.to_string(),
            kind: NominalKind::Struct,
        },
        vec![i32m(), Meta::new(TypeKind::Bool)],
    );
    s
}

#[test]
fn structs_match_by_name_not_by_shape() {
    let s = structure(1, "S");
    let t = structure(2, "T");

    compare(&s, &structure(1, "S")).expect("same struct");
    let err = compare(&s, &t).expect_err("same fields, different struct");
    assert_eq!(
        err.kind,
        ErrorKind::MismatchedType {
            expected: "struct S".to_string(),
            found: "struct T".to_string(),
        }
    );
}

#[test]
fn null_fits_nullable_targets_only() {
    let null = Meta::untyped(TypeKind::Object);

    compare(&Meta::new(TypeKind::String), &null).expect("null string");
    compare(&Meta::object(None), &null).expect("null object");
    assert!(compare(&i32m(), &null).is_err());
}

#[test]
fn untyped_integer_fits_any_integer_width() {
    let lit = Meta::untyped(TypeKind::Int64);
    for ty in [TypeKind::Int8, TypeKind::Uint16, TypeKind::Int32, TypeKind::Uint64] {
        compare(&Meta::new(ty), &lit).expect("integer literal");
    }
    assert!(compare(&Meta::new(TypeKind::String), &lit).is_err());
    assert!(compare(&Meta::new(TypeKind::Bool), &lit).is_err());
}

#[test]
fn array_value_does_not_fit_a_scalar() {
    let arr = i32m().with_dims(vec![Some(2)]);
    assert!(compare(&i32m(), &arr).is_err());
}

#[test]
fn fixed_dimensions_must_agree() {
    let x = i32m().with_dims(vec![Some(3)]);
    let y = i32m().with_dims(vec![Some(2)]);

    let err = compare(&x, &y).expect_err("length differs");
    assert_eq!(
        err.kind,
        ErrorKind::MismatchedCount {
            label: "element",
            expected: 3,
            found: 2,
        }
    );

    let open = i32m().with_dims(vec![None]);
    compare(&open, &y).expect("open dimension takes any length");
}

#[test]
fn nested_aggregate_checks_inner_rows() {
    let x = i32m().with_dims(vec![Some(2), Some(2)]);
    let row = |n| Meta::tuple(vec![Meta::untyped(TypeKind::Int64); n]);

    compare(&x, &Meta::tuple(vec![row(2), row(2)])).expect("2x2");
    let err = compare(&x, &Meta::tuple(vec![row(2), row(3)])).expect_err("ragged");
    assert!(matches!(
        err.kind,
        ErrorKind::MismatchedCount {
            expected: 2,
            found: 3,
            ..
        }
    ));
}

#[test]
fn map_aggregate_pairs_are_checked_against_key_and_value() {
    let map = Meta::map(Meta::new(TypeKind::String), i32m());
    let pair = Meta::tuple(vec![Meta::new(TypeKind::String), Meta::untyped(TypeKind::Int64)]);
    let mut y = Meta::tuple(vec![pair.clone(), pair]);

    compare(&map, &y).expect("string to number pairs");

    let mut x = map.clone();
    eval(&mut x, &mut y);
    assert!(y.is_map());
    assert_eq!(y.elems, map.elems);

    let bad = Meta::tuple(vec![Meta::tuple(vec![Meta::new(TypeKind::String)])]);
    let err = compare(&map, &bad).expect_err("pair without a value");
    assert!(matches!(
        err.kind,
        ErrorKind::MismatchedCount {
            label: "key-value",
            ..
        }
    ));
}

#[test]
fn eval_pins_untyped_side_to_the_typed_one() {
    let mut x = Meta::untyped(TypeKind::Int64);
    let mut y = Meta::new(TypeKind::Uint8);
    eval(&mut x, &mut y);
    assert_eq!(x.ty, TypeKind::Uint8);
    assert!(!x.untyped);
}
