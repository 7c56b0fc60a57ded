// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{HashMap, HashSet};

use crate::common::Ident;
use crate::ir::{Cluster, Expr};

/// Issues names that are unique within one compilation unit.
///
/// Each prefix has its own counter, so the first weights table is `w0` and
/// the first temporary `r0` regardless of how many of the other kind were
/// made.  Names already used by the input are skipped.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, Default)]
pub struct SymbolRegistry {
    counters: HashMap<String, usize>,
    taken: HashSet<Ident>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// A registry that will never hand out a name appearing in `clusters`.
    pub fn for_clusters(clusters: &[Cluster]) -> Self {
        let mut registry = SymbolRegistry::new();
        for c in clusters.iter() {
            for e in c.exprs() {
                registry.reserve_expr(e.lhs());
                registry.reserve_expr(e.rhs());
            }
        }
        registry
    }

    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_owned());
    }

    fn reserve_expr(&mut self, expr: &Expr) {
        self.taken.extend(expr.reads());
        self.reserve_weights(expr);
    }

    fn reserve_weights(&mut self, expr: &Expr) {
        match expr {
            Expr::Weights(w) => self.reserve(w.function().name()),
            Expr::Derivative(d) => {
                self.reserve(d.weights().function().name());
                self.reserve_weights(d.base());
            }
            _ => {
                for arg in expr.args() {
                    self.reserve_weights(arg);
                }
            }
        }
    }

    pub fn make_name(&mut self, prefix: &str) -> Ident {
        let counter = self.counters.entry(prefix.to_owned()).or_insert(0);
        loop {
            let name = format!("{prefix}{counter}");
            *counter += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}
