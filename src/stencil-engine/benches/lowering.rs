// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Benchmarks for derivative lowering.
//!
//! Each case is a Laplacian-like sum of nested second derivatives over a
//! growing number of fields, so both lowering and the elimination of the
//! repeated inner reductions scale with the input.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use stencil_engine::test_common::*;
use stencil_engine::{Cluster, Expr, FusionMode, LoweringConfig, lower};

/// `e{k} = D(D(f{k % 4}))` for every k: fields repeat, so inner reductions
/// repeat too.
fn create_stencil_clusters(equations: usize) -> Vec<Cluster> {
    let i0 = sd("i0", -2, 2);
    let i1 = sd("i1", -2, 2);
    let coefficients = [-1.0 / 12.0, 4.0 / 3.0, -5.0 / 2.0, 4.0 / 3.0, -1.0 / 12.0];

    let mut builder = TestClusters::new();
    for k in 0..equations {
        let f = field(&format!("f{}", k % 4));
        let rhs = Expr::add(vec![
            dx2(&f, &i0, &i1, &coefficients),
            sym("c").expr(),
        ]);
        builder = builder.eq(&format!("e{k}"), rhs);
    }
    builder.build()
}

fn bench_lowering(c: &mut Criterion) {
    let mut group = c.benchmark_group("lower_index_derivatives");

    for size in [8, 32, 128] {
        let clusters = create_stencil_clusters(size);

        group.bench_with_input(BenchmarkId::new("noop", size), &clusters, |b, clusters| {
            let config = LoweringConfig {
                fusion: FusionMode::Noop,
                cde: false,
                ..Default::default()
            };
            b.iter(|| lower(black_box(clusters.clone()), &config))
        });

        group.bench_with_input(BenchmarkId::new("maximal", size), &clusters, |b, clusters| {
            let config = LoweringConfig::default();
            b.iter(|| lower(black_box(clusters.clone()), &config))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lowering);
criterion_main!(benches);
