mod common;

use ascl_ast::{Exp, ExpKind, Meta, TypeKind, Value};
use ascl_core::meta::compare;
use ascl_core::{compile, Flags};
use common::{assign, assign_parts, body, decl, int, name, single, sp, var, Unit};
use proptest::{
    prelude::{any, prop},
    sample::select,
    strategy::{Just, Strategy},
    test_runner::{Config, TestCaseError, TestRunner},
};

const INTEGERS: [TypeKind; 9] = [
    TypeKind::Byte,
    TypeKind::Int8,
    TypeKind::Int16,
    TypeKind::Int32,
    TypeKind::Int64,
    TypeKind::Uint8,
    TypeKind::Uint16,
    TypeKind::Uint32,
    TypeKind::Uint64,
];

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 64,
        ..Config::default()
    })
}

#[test]
fn integer_literal_fits_every_integer_target_but_not_the_reverse_kinds() {
    runner()
        .run(&select(INTEGERS.to_vec()), |ty| {
            let lit = Meta::untyped(TypeKind::Int64);
            if compare(&Meta::new(ty), &lit).is_err() {
                return Err(TestCaseError::fail(format!("{} rejected a literal", ty.name())));
            }
            let typed = Meta::new(ty);
            if compare(&Meta::new(TypeKind::String), &typed).is_ok() {
                return Err(TestCaseError::fail("integer stored into a string"));
            }
            if ty != TypeKind::Int64 && compare(&Meta::new(TypeKind::Int64), &typed).is_ok() {
                return Err(TestCaseError::fail("typed integers of different widths matched"));
            }
            Ok(())
        })
        .expect("property");
}

#[test]
fn folded_aggregate_lands_in_the_segment_little_endian() {
    runner()
        .run(&prop::collection::vec(any::<i32>(), 1..8), |values| {
            let mut unit = Unit::new();
            let elems = values.iter().map(|v| int(i64::from(*v))).collect();
            let a = unit.add(
                var("a", TypeKind::Int32)
                    .with_size(Exp::null(sp()))
                    .with_init(Exp::init(elems, sp())),
            );
            let f = unit.func("f", vec![], vec![], vec![a], vec![decl(a)]);
            let mut ast = single(unit);
            let ir = compile(&mut ast, &Flags::default())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let (_, rhs) = assign_parts(&body(&ast, f)[0]);
            let expected: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            let stored = match rhs.kind {
                ExpKind::Lit(Value::Addr(addr)) => ir.segment.read(addr, rhs.meta.size()),
                ref other => return Err(TestCaseError::fail(format!("unexpected {other:?}"))),
            };
            if stored != Some(expected.as_slice()) {
                return Err(TestCaseError::fail(format!("segment holds {stored:?}")));
            }
            Ok(())
        })
        .expect("property");
}

#[test]
fn constant_index_folds_to_row_major_offset() {
    let strategy = (1u32..6, 1u32..6).prop_flat_map(|(rows, cols)| {
        (Just(rows), Just(cols), 0..rows, 0..cols)
    });

    runner()
        .run(&strategy, |(rows, cols, i, j)| {
            let mut unit = Unit::new();
            let m = unit.add(
                var("m", TypeKind::Int16)
                    .with_size(int(i64::from(rows)))
                    .with_size(int(i64::from(cols))),
            );
            let y = unit.add(var("y", TypeKind::Int16));
            let rhs = Exp::array(
                Exp::array(name("m"), int(i64::from(i)), sp()),
                int(i64::from(j)),
                sp(),
            );
            let f = unit.func("f", vec![], vec![], vec![m, y], vec![assign(name("y"), rhs)]);
            let mut ast = single(unit);
            compile(&mut ast, &Flags::default()).map_err(|e| TestCaseError::fail(e.to_string()))?;

            let (_, rhs) = assign_parts(&body(&ast, f)[0]);
            let want = (i * cols + j) * 2;
            match rhs.kind {
                ExpKind::Stack { base: 1, offset, .. } if offset == want => Ok(()),
                ref other => Err(TestCaseError::fail(format!(
                    "m[{i}][{j}] of {rows}x{cols}: expected offset {want}, got {other:?}"
                ))),
            }
        })
        .expect("property");
}
