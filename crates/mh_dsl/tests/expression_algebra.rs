// crates/mh_dsl/tests/expression_algebra.rs

//! 表达式代数性质测试
//!
//! 验证类别分区、插入顺序、缩放与减法的等价关系，以及显式求值的确定性。

use mh_dsl::prelude::*;
use mh_foundation::MhError;
use mh_runtime::{CpuBackend, Field};
use proptest::prelude::*;

type B = CpuBackend<f64>;

/// 便于比较的项签名：(类别, 系数, 模型名)
fn signature(expr: &Expression<B>) -> Vec<(TermKind, f64, String)> {
    TermKind::ALL
        .iter()
        .flat_map(|&kind| {
            expr.terms(kind)
                .iter()
                .map(|t| (t.kind(), t.coefficient(), t.name().to_string()))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn make_term(exec: &B, kind: TermKind, value: f64) -> Term<B> {
    match kind {
        TermKind::Temporal => Term::temporal(exec, Ddt),
        TermKind::Implicit => Term::implicit(exec, LinearSource::new(value)),
        TermKind::Explicit => Term::explicit(exec, ConstantSource::new(value)),
    }
}

fn kind_strategy() -> impl Strategy<Value = TermKind> {
    prop_oneof![
        Just(TermKind::Temporal),
        Just(TermKind::Implicit),
        Just(TermKind::Explicit),
    ]
}

fn build(exec: &B, layout: &[(TermKind, f64)]) -> Expression<B> {
    let mut expr = Expression::new(exec);
    for &(kind, value) in layout {
        expr.add_term(make_term(exec, kind, value)).unwrap();
    }
    expr
}

proptest! {
    #[test]
    fn size_is_sum_of_buckets(
        layout in prop::collection::vec((kind_strategy(), -10.0f64..10.0), 0..20),
    ) {
        let exec = B::new();
        let expr = build(&exec, &layout);
        prop_assert_eq!(expr.size(), layout.len());
        prop_assert_eq!(
            expr.size(),
            expr.temporal_terms().len() + expr.implicit_terms().len() + expr.explicit_terms().len()
        );
    }

    #[test]
    fn merge_concatenates_per_kind(
        a in prop::collection::vec((kind_strategy(), -10.0f64..10.0), 0..10),
        b in prop::collection::vec((kind_strategy(), -10.0f64..10.0), 0..10),
    ) {
        let exec = B::new();
        let ea = build(&exec, &a);
        let eb = build(&exec, &b);
        let mut merged = ea.clone();
        merged.add_expression(&eb).unwrap();

        for kind in TermKind::ALL {
            let expected: Vec<f64> = ea.terms(kind).iter().chain(eb.terms(kind))
                .map(|t| t.coefficient()).collect();
            let actual: Vec<f64> = merged.terms(kind).iter().map(|t| t.coefficient()).collect();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn scaling_multiplies_every_term(
        layout in prop::collection::vec((kind_strategy(), -10.0f64..10.0), 0..12),
        c in -5.0f64..5.0,
    ) {
        let exec = B::new();
        let expr = build(&exec, &layout);
        let scaled = c * expr.clone();
        for kind in TermKind::ALL {
            let before = expr.terms(kind);
            let after = scaled.terms(kind);
            prop_assert_eq!(before.len(), after.len());
            for (x, y) in before.iter().zip(after) {
                prop_assert_eq!(y.kind(), x.kind());
                prop_assert_eq!(y.name(), x.name());
                prop_assert_eq!(y.coefficient(), x.coefficient() * c);
            }
        }
    }

    #[test]
    fn subtraction_is_addition_of_negation(
        a in prop::collection::vec((kind_strategy(), -10.0f64..10.0), 0..8),
        b in prop::collection::vec((kind_strategy(), -10.0f64..10.0), 0..8),
    ) {
        let exec = B::new();
        let lhs = build(&exec, &a) - build(&exec, &b);
        let rhs = build(&exec, &a) + (-1.0 * build(&exec, &b));
        prop_assert_eq!(signature(&lhs), signature(&rhs));
    }

    #[test]
    fn explicit_evaluation_is_deterministic(
        values in prop::collection::vec(-100.0f64..100.0, 1..10),
        n in 1usize..32,
    ) {
        let exec = B::parallel();
        let mut expr = Expression::new(&exec);
        for &v in &values {
            expr.add_term(Term::explicit(&exec, ConstantSource::new(v))).unwrap();
        }
        let first = expr.explicit_operation(n).unwrap().copy_to_host();
        let second = expr.explicit_operation(n).unwrap().copy_to_host();
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        prop_assert_eq!(bits(&first[..]), bits(&second[..]));
    }
}

#[test]
fn term_sum_matches_incremental_construction() {
    let exec = B::new();
    let t1 = make_term(&exec, TermKind::Explicit, 1.0);
    let t2 = make_term(&exec, TermKind::Implicit, 2.0);

    let summed = t1.clone() + t2.clone();

    let mut incremental = Expression::new(&exec);
    incremental.add_term(t1).unwrap();
    incremental.add_term(t2).unwrap();

    assert_eq!(signature(&summed), signature(&incremental));
}

#[test]
fn empty_explicit_bucket_is_identity() {
    let exec = B::new();
    let expr = Term::temporal(&exec, Ddt) + Term::implicit(&exec, LinearSource::new(3.0));
    let mut field = Field::from_slice(&exec, &[1.0, -2.0, 3.5]);
    expr.explicit_operation_into(&mut field).unwrap();
    assert!(field.equal_slice(&[1.0, -2.0, 3.5]));
}

#[test]
fn constant_source_over_four_cells() {
    let exec = B::new();
    let mut expr = Expression::new(&exec);
    expr.add_term(Term::explicit(&exec, ConstantSource::new(5.0)))
        .unwrap();
    let source = expr.explicit_operation(4).unwrap();
    assert_eq!(source.copy_to_host(), vec![5.0, 5.0, 5.0, 5.0]);
}

#[test]
fn one_term_per_bucket() {
    let exec = B::new();
    let t1 = Term::temporal(&exec, Ddt);
    let i1 = Term::implicit(&exec, LinearSource::new(1.0));
    let e1 = Term::explicit(&exec, ConstantSource::new(1.0));
    let expr = t1 + i1 + e1;
    assert_eq!(expr.temporal_terms().len(), 1);
    assert_eq!(expr.implicit_terms().len(), 1);
    assert_eq!(expr.explicit_terms().len(), 1);
    assert_eq!(expr.size(), 3);
}

#[test]
fn term_difference_negates_right_operand() {
    let exec = B::new();
    let expr = Term::explicit(&exec, ConstantSource::new(3.0))
        - Term::explicit(&exec, ConstantSource::new(1.0));
    let coeffs: Vec<f64> = expr.explicit_terms().iter().map(|t| t.coefficient()).collect();
    assert_eq!(coeffs, vec![1.0, -1.0]);
    assert!(expr.explicit_operation(2).unwrap().equal_value(2.0));
}

#[test]
fn cross_context_merge_is_rejected() {
    let serial = CpuBackend::<f64>::serial();
    let parallel = CpuBackend::<f64>::parallel();

    let mut a = Expression::from(Term::explicit(&serial, ConstantSource::new(1.0)));
    let b = Expression::from(Term::explicit(&parallel, ConstantSource::new(1.0)));

    let err = a.add_expression(&b).unwrap_err();
    assert!(matches!(err, MhError::ContextMismatch { .. }));
    assert_eq!(a.size(), 1, "失败的合并不应修改表达式");
}

#[test]
fn clones_are_independent() {
    let exec = B::new();
    let original = Expression::from(Term::explicit(&exec, ConstantSource::new(1.0)));
    let mut copy = original.clone();
    copy.add_term(Term::explicit(&exec, ConstantSource::new(2.0)))
        .unwrap();
    copy.scale_in_place(3.0);

    assert_eq!(original.size(), 1);
    assert_eq!(original.explicit_terms()[0].coefficient(), 1.0);
    assert_eq!(copy.size(), 2);
}
