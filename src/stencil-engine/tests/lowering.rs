// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use float_cmp::approx_eq;
use proptest::prelude::*;

use stencil_engine::test_common::*;
use stencil_engine::{
    Cluster, DType, Dimension, Equation, ErrorCode, Expr, Fusion, FusionMode, LoweringConfig,
    MaximalFusion, Operation, Result, Symbol, lower, lower_index_derivatives,
};

fn unfused() -> LoweringConfig {
    LoweringConfig {
        fusion: FusionMode::Noop,
        ..Default::default()
    }
}

fn printed(clusters: &[Cluster]) -> Vec<String> {
    clusters.iter().map(|c| c.to_string()).collect()
}

/// Every weights table referenced in `expr`, as (coefficient bits, name).
fn collect_weights(expr: &Expr, out: &mut Vec<(Vec<u64>, String)>) {
    if let Expr::Weights(w) = expr {
        let bits = w.function().values().iter().map(|v| v.0.to_bits()).collect();
        out.push((bits, w.function().name().to_owned()));
    }
    for arg in expr.args() {
        collect_weights(arg, out);
    }
}

#[test]
fn nested_derivative_scenario() {
    let i0 = sd("i0", -1, 1);
    let i1 = sd("i1", -1, 1);
    let a = field("a");
    let u = sym("u");
    let clusters = vec![cluster(
        vec![Equation::new(u.expr(), dx2(&a, &i0, &i1, D2))],
        &[space("x")],
    )];

    let out = lower_index_derivatives(clusters, &unfused(), &MaximalFusion).unwrap();

    // the inner derivative is lowered first and takes `u` as accumulator;
    // the outer one gets a fresh temporary
    assert_eq!(
        vec![
            "[x[0,0]++, i0[0,2]++]\n  u = 0.0",
            "[x[0,0]++, i0[0,2]++, i1[0,2]++]\n  u += a[x + i0 - 1 + i1 - 1]*w0[i1]",
            "[x[0,0]++]\n  r0 = 0.0",
            "[x[0,0]++, i0[0,2]++]\n  r0 += u*w0[i0]",
            "[x[0,0]++]\n  u = r0",
        ],
        printed(&out)
    );

    let d0: Dimension = i0.into();
    let d1: Dimension = i1.into();
    let inner = out[1].ispace();
    assert_eq!(vec![space("x"), d0.clone(), d1.clone()], inner.itdims());
    assert!(inner.relations().contains(&vec![space("x"), d0, d1]));
}

#[test]
fn destination_becomes_the_accumulator() {
    let i0 = sd("i0", -1, 1);
    let a = field("a");
    let u = sym("u");
    let clusters = vec![cluster(
        vec![Equation::new(u.expr(), dx(&a, &i0, D2))],
        &[space("x")],
    )];

    let out = lower(clusters, &unfused()).unwrap();
    // `u = u` is gone
    assert_eq!(
        vec![
            "[x[0,0]++]\n  u = 0.0",
            "[x[0,0]++, i0[0,2]++]\n  u += a[x + i0 - 1]*w0[i0]",
        ],
        printed(&out)
    );
}

#[test]
fn coefficients_are_carried_over() {
    let i0 = sd("i0", -1, 1);
    let clusters = vec![cluster(
        vec![Equation::new(sym("u").expr(), dx(&field("a"), &i0, D1))],
        &[space("x")],
    )];

    let out = lower(clusters, &unfused()).unwrap();
    let mut weights = Vec::new();
    collect_weights(out[1].exprs()[0].rhs(), &mut weights);
    assert_eq!(1, weights.len());

    let values: Vec<f64> = weights[0].0.iter().map(|b| f64::from_bits(*b)).collect();
    assert_eq!(3, values.len());
    for (expected, actual) in D1.iter().zip(values.iter()) {
        assert!(approx_eq!(f64, *expected, *actual, ulps = 2));
    }
}

#[test]
fn init_immediately_precedes_accumulate() {
    let i0 = sd("i0", -2, 2);
    let i1 = sd("i1", -1, 1);
    let a = field("a");
    let b = field("b");
    let v = field("v");
    let clusters = vec![cluster(
        vec![Equation::new(
            v.at([x()]),
            Expr::add(vec![dx2(&a, &i0, &i1, D2), dx(&b, &i1, D1)]),
        )],
        &[space("x")],
    )];

    let out = lower(clusters, &unfused()).unwrap();
    let mut accumulations = 0;
    for (k, c) in out.iter().enumerate() {
        let e = &c.exprs()[0];
        if e.operation() != Some(Operation::Inc) {
            continue;
        }
        accumulations += 1;
        let init = &out[k - 1];
        assert_eq!(&Equation::new(e.lhs().clone(), Expr::float(0.0)), &init.exprs()[0]);

        let innermost = c.ispace().itdims().into_iter().rev().find(|d| d.is_stencil());
        let projected = c.ispace().project(|d| Some(d) != innermost.as_ref());
        assert_eq!(&projected, init.ispace());
    }
    assert_eq!(3, accumulations);
}

#[test]
fn reuse_is_scoped_to_its_equation() {
    let i0 = sd("i0", -1, 1);
    let p = sym("p");
    let q = sym("q");
    let clusters = vec![cluster(
        vec![
            Equation::new(p.expr(), Expr::add(vec![Expr::int(1), dx(&field("a"), &i0, D2)])),
            Equation::new(
                field("v").at([x()]),
                Expr::mul(vec![q.expr(), dx(&field("b"), &i0, D2)]),
            ),
        ],
        &[space("x")],
    )];

    let out = lower(clusters, &unfused()).unwrap();
    let accumulators: Vec<String> = out
        .iter()
        .flat_map(|c| c.exprs())
        .filter(|e| e.operation() == Some(Operation::Inc))
        .map(|e| e.lhs().to_string())
        .collect();
    // `p` serves its own equation; the array store gets a temporary
    assert_eq!(vec!["p".to_owned(), "r0".to_owned()], accumulators);
    assert_eq!("p = 1 + p", out[2].exprs()[0].to_string());
    assert_eq!("v[x] = q*r0", out[5].exprs()[0].to_string());
}

#[test]
fn mismatched_accumulator_type_aborts() {
    let i0 = sd("i0", -1, 1);
    let p = Symbol::new("p", DType::F64);
    let clusters = vec![cluster(
        vec![Equation::new(p.expr(), dx(&field("a"), &i0, D2))],
        &[space("x")],
    )];

    let err = lower(clusters, &LoweringConfig::default()).unwrap_err();
    assert_eq!(ErrorCode::AccumulatorTypeMismatch, err.code);
    assert!(err.get_details().unwrap_or_default().contains("p"));
}

#[test]
fn user_names_are_never_reused() {
    let i0 = sd("i0", -1, 1);
    let clusters = vec![cluster(
        vec![
            Equation::new(sym("r0").expr(), Expr::int(0)),
            Equation::new(
                field("w0").at([x()]),
                Expr::add(vec![sym("r0").expr(), dx(&field("a"), &i0, D2)]),
            ),
        ],
        &[space("x")],
    )];

    let out = lower(clusters, &unfused()).unwrap();
    let last = out.last().unwrap();
    assert_eq!("w0[x] = r0 + r1", last.exprs()[0].to_string());
    let mut weights = Vec::new();
    for c in out.iter() {
        for e in c.exprs() {
            collect_weights(e.rhs(), &mut weights);
        }
    }
    assert_eq!("w1", weights[0].1);
}

struct CountingFusion {
    calls: Cell<usize>,
}

impl Fusion for CountingFusion {
    fn fuse(&self, clusters: Vec<Cluster>) -> Result<Vec<Cluster>> {
        self.calls.set(self.calls.get() + 1);
        Ok(clusters)
    }
}

#[test]
fn fusion_mode_controls_the_collaborator() {
    let i0 = sd("i0", -1, 1);
    let input = vec![cluster(
        vec![Equation::new(sym("u").expr(), dx(&field("a"), &i0, D2))],
        &[space("x")],
    )];

    let fusion = CountingFusion {
        calls: Cell::new(0),
    };
    lower_index_derivatives(input.clone(), &unfused(), &fusion).unwrap();
    assert_eq!(0, fusion.calls.get());

    lower_index_derivatives(input.clone(), &LoweringConfig::default(), &fusion).unwrap();
    assert_eq!(1, fusion.calls.get());

    // nothing to lower: neither fusion nor elimination runs
    let plain = vec![cluster(
        vec![Equation::new(sym("u").expr(), Expr::int(1))],
        &[space("x")],
    )];
    lower_index_derivatives(plain, &LoweringConfig::default(), &fusion).unwrap();
    assert_eq!(1, fusion.calls.get());
}

#[test]
fn output_is_deterministic() {
    let i0 = sd("i0", -1, 1);
    let i1 = sd("i1", -1, 1);
    let build = || {
        TestClusters::new()
            .eq("p", dx2(&field("a"), &i0, &i1, D2))
            .eq("q", dx(&field("b"), &i1, D1))
            .eq("s", dx2(&field("a"), &i0, &i1, D2))
            .build()
    };

    let first = lower(build(), &LoweringConfig::default()).unwrap();
    for _ in 0..8 {
        assert_eq!(first, lower(build(), &LoweringConfig::default()).unwrap());
    }
}

/// A plain description of an expression, turned into IR inside each test
/// case.
#[derive(Clone, Debug)]
enum Term {
    Int(i64),
    Sym(usize),
    Field(usize),
    Add(Vec<Term>),
    Mul(Vec<Term>),
    Neg(Box<Term>),
    /// derivative of field `.0` with coefficient table `.1`
    Deriv(usize, usize),
}

const SYMBOLS: &[&str] = &["a", "b", "c"];
const FIELDS: &[&str] = &["u", "v", "f"];
const TABLES: &[&[f64]] = &[D2, D1, &[1.0, 1.0, 1.0]];

impl Term {
    fn build(&self) -> Rc<Expr> {
        match self {
            Term::Int(n) => Expr::int(*n),
            Term::Sym(i) => sym(SYMBOLS[*i]).expr(),
            Term::Field(i) => field(FIELDS[*i]).at([x()]),
            Term::Add(terms) => Expr::add(terms.iter().map(Term::build).collect()),
            Term::Mul(terms) => Expr::mul(terms.iter().map(Term::build).collect()),
            Term::Neg(t) => Expr::neg(t.build()),
            Term::Deriv(f, table) => dx(&field(FIELDS[*f]), &sd("i0", -1, 1), TABLES[*table]),
        }
    }
}

fn term_strategy(derivatives: bool) -> impl Strategy<Value = Term> {
    let leaf = if derivatives {
        prop_oneof![
            (-5i64..5).prop_map(Term::Int),
            (0..SYMBOLS.len()).prop_map(Term::Sym),
            (0..FIELDS.len(), 0..TABLES.len()).prop_map(|(f, t)| Term::Deriv(f, t)),
        ]
        .boxed()
    } else {
        prop_oneof![
            (-5i64..5).prop_map(Term::Int),
            (0..SYMBOLS.len()).prop_map(Term::Sym),
            (0..FIELDS.len()).prop_map(Term::Field),
        ]
        .boxed()
    };
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(Term::Add),
            prop::collection::vec(inner.clone(), 2..4).prop_map(Term::Mul),
            inner.prop_map(|t| Term::Neg(Box::new(t))),
        ]
    })
}

/// Clusters over `x` (or `x, y`), each assigning generated terms to
/// `e0`, `e1`, ...
fn build_clusters(groups: &[(bool, Vec<Term>)]) -> Vec<Cluster> {
    let mut n = 0;
    groups
        .iter()
        .map(|(nested, terms)| {
            let exprs = terms
                .iter()
                .map(|t| {
                    n += 1;
                    Equation::new(sym(&format!("e{n}")).expr(), t.build())
                })
                .collect();
            let dims = if *nested {
                vec![space("x"), space("y")]
            } else {
                vec![space("x")]
            };
            cluster(exprs, &dims)
        })
        .collect()
}

fn groups_strategy(derivatives: bool) -> impl Strategy<Value = Vec<(bool, Vec<Term>)>> {
    prop::collection::vec(
        (any::<bool>(), prop::collection::vec(term_strategy(derivatives), 1..4)),
        0..4,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn identity_without_derivatives(groups in groups_strategy(false)) {
        let clusters = build_clusters(&groups);
        let out = lower(clusters.clone(), &LoweringConfig::default()).unwrap();
        prop_assert_eq!(clusters, out);
    }

    #[test]
    fn equal_coefficients_share_one_table(groups in groups_strategy(true)) {
        let clusters = build_clusters(&groups);
        let out = lower(clusters, &unfused()).unwrap();

        let mut weights = Vec::new();
        for c in out.iter() {
            for e in c.exprs() {
                prop_assert!(!e.rhs().contains_derivative());
                collect_weights(e.rhs(), &mut weights);
            }
        }

        let mut by_values: HashMap<Vec<u64>, String> = HashMap::new();
        let mut by_name: HashMap<String, Vec<u64>> = HashMap::new();
        for (values, name) in weights {
            prop_assert!(name.starts_with('w'));
            let named = by_values.entry(values.clone()).or_insert_with(|| name.clone());
            prop_assert_eq!(&*named, &name);
            let valued = by_name.entry(name).or_insert_with(|| values.clone());
            prop_assert_eq!(&*valued, &values);
        }
    }

    #[test]
    fn new_stencil_loops_start_at_zero(min in -3i64..=0, max in 0i64..=3) {
        let i0 = sd("i0", min, max);
        let values: Vec<f64> = (min..=max).map(|k| k as f64).collect();
        let clusters = vec![cluster(
            vec![Equation::new(field("v").at([x()]), dx(&field("u"), &i0, &values))],
            &[space("x")],
        )];

        let out = lower(clusters, &unfused()).unwrap();
        let d0: Dimension = i0.into();
        let interval = out[1].ispace().interval(&d0).unwrap();
        prop_assert_eq!(Some((0, max - min)), interval.bounds());
    }
}
