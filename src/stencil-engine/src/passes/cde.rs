// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Common derivative elimination.
//!
//! Two accumulators computing the same reduction within the same loop nest
//! hold the same value, so the second one can be dropped and its uses
//! pointed at the first.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use crate::common::Result;
use crate::ir::{Direction, Equation, Expr, Interval};
use crate::passes::derivatives::LoweringMap;
use crate::passes::queue::{ClusterArena, ClusterId, PrefixQueue};

pub struct CommonDerivativeElimination {
    /// Reductions computed by at least two accumulators.
    candidates: LoweringMap,
    /// Accumulators proven redundant → the accumulator replacing them.
    /// Filled by deeper groups, honored by every group visited later.
    redundant: HashMap<Rc<Expr>, Rc<Expr>>,
    seen: HashSet<ClusterId>,
    eliminated: usize,
}

impl CommonDerivativeElimination {
    pub fn new(mapper: &LoweringMap) -> Self {
        CommonDerivativeElimination {
            candidates: mapper.multiples(),
            redundant: HashMap::new(),
            seen: HashSet::new(),
            eliminated: 0,
        }
    }

    /// Number of accumulators found redundant so far.
    pub fn eliminated(&self) -> usize {
        self.eliminated
    }
}

impl PrefixQueue for CommonDerivativeElimination {
    fn callback(
        &mut self,
        arena: &mut ClusterArena,
        ids: Vec<ClusterId>,
        _prefix: &[(Interval, Direction)],
    ) -> Result<Vec<ClusterId>> {
        // reduction → accumulator already computing it in this group
        let mut local: HashMap<Rc<Expr>, Rc<Expr>> = HashMap::new();
        // `redundant` and `local` combined; reset whenever either changes
        let mut subs: Option<HashMap<Rc<Expr>, Rc<Expr>>> = None;

        let mut processed = Vec::with_capacity(ids.len());
        for id in ids {
            if self.seen.contains(&id) {
                processed.push(id);
                continue;
            }

            let c = arena.get(id);
            let mut exprs: Vec<Equation> = Vec::with_capacity(c.exprs().len());
            for e in c.exprs() {
                if self.redundant.contains_key(e.lhs()) {
                    continue;
                }
                if let Some(lhs) = local.get(e.rhs()) {
                    trace!(redundant = %e.lhs(), replacement = %lhs, "common derivative");
                    self.redundant.insert(e.lhs().clone(), lhs.clone());
                    self.eliminated += 1;
                    subs = None;
                    continue;
                }
                if self.candidates.contains(e.rhs()) {
                    local.insert(e.rhs().clone(), e.lhs().clone());
                    subs = None;
                    exprs.push(e.clone());
                } else {
                    let table = subs.get_or_insert_with(|| {
                        let mut table = self.redundant.clone();
                        table.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
                        table
                    });
                    exprs.push(e.xreplace(table));
                }
            }

            // a cluster left with nothing to compute disappears
            if exprs.is_empty() {
                continue;
            }
            let rebuilt = c.rebuild(exprs);
            let new_id = arena.alloc(rebuilt);
            self.seen.insert(new_id);
            processed.push(new_id);
        }

        Ok(processed)
    }
}
