// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Lowering of derivative operators into explicit reductions.
//!
//! A derivative `deriv[i](f[x + i], w[i])` becomes a scalar accumulator `r`
//! computed by two new clusters:
//!
//! ```text
//! [x]        r = 0.0
//! [x, i]     r += f[x + i + i_min]*w[i]
//! ```
//!
//! where the loop over `i` has been shifted to start at zero.  The
//! derivative node is then replaced by `r` in the equation it came from.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::rc::Rc;

use ordered_float::OrderedFloat;
use tracing::trace;

use crate::common::Result;
use crate::ir::{
    Cluster, DType, Dimension, Direction, Equation, Expr, Interval, IterationSpace,
    StencilDimension, Symbol, WeightsFunction, reuse_if_untouched, subs_dim,
};
use crate::lower_err;
use crate::symbols::SymbolRegistry;

/// Concrete coefficient tables, one per distinct tuple of values.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Default)]
pub struct WeightRegistry {
    tables: HashMap<Vec<OrderedFloat<f64>>, Rc<WeightsFunction>>,
}

impl WeightRegistry {
    /// The table holding the same coefficients as `w0`.  The first request
    /// for a tuple of coefficients mints a fresh name; later requests get
    /// that same table back, whatever their own name or type.
    pub fn resolve(
        &mut self,
        names: &mut SymbolRegistry,
        w0: &WeightsFunction,
        dtype: DType,
    ) -> Rc<WeightsFunction> {
        self.tables
            .entry(w0.values().to_vec())
            .or_insert_with(|| Rc::new(w0.rebuild(&names.make_name("w"), dtype)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Right-hand side of each emitted accumulation → every accumulator
/// computing it, in emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoweringMap {
    entries: HashMap<Rc<Expr>, Vec<Symbol>>,
}

impl LoweringMap {
    pub fn record(&mut self, rhs: Rc<Expr>, s: Symbol) {
        self.entries.entry(rhs).or_default().push(s);
    }

    pub fn get(&self, rhs: &Rc<Expr>) -> Option<&[Symbol]> {
        self.entries.get(rhs).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Only the right-hand sides computed more than once can be
    /// deduplicated.
    pub fn multiples(&self) -> LoweringMap {
        LoweringMap {
            entries: self
                .entries
                .iter()
                .filter(|(_, v)| v.len() > 1)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn contains(&self, rhs: &Rc<Expr>) -> bool {
        self.entries.contains_key(rhs)
    }
}

/// State of one run of the lowering.  Created when the pass starts and
/// dropped when it ends, so nothing carries over between compilations.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
pub struct LoweringContext {
    names: SymbolRegistry,
    weights: WeightRegistry,
    mapper: LoweringMap,
    reuse_destinations: bool,
}

impl LoweringContext {
    pub fn new(names: SymbolRegistry, reuse_destinations: bool) -> Self {
        LoweringContext {
            names,
            weights: WeightRegistry::default(),
            mapper: LoweringMap::default(),
            reuse_destinations,
        }
    }

    pub fn weights(&self) -> &WeightRegistry {
        &self.weights
    }

    pub fn mapper(&self) -> &LoweringMap {
        &self.mapper
    }

    pub fn into_mapper(self) -> LoweringMap {
        self.mapper
    }

    /// Lowers every derivative in `clusters`, returning the new cluster
    /// sequence.  Equations keep their relative order; the clusters computing
    /// a derivative are placed right before the equation that uses it.
    pub fn lower_clusters(&mut self, clusters: &[Cluster]) -> Result<Vec<Cluster>> {
        let mut processed: Vec<Cluster> = Vec::with_capacity(clusters.len());

        fn dump(exprs: &mut Vec<Equation>, c: &Cluster, processed: &mut Vec<Cluster>) {
            if !exprs.is_empty() {
                processed.push(c.rebuild(mem::take(exprs)));
            }
        }

        for c in clusters.iter() {
            let mut exprs: Vec<Equation> = Vec::new();
            for e in c.exprs() {
                // a scalar destination is free to act as the accumulator of
                // one of the derivatives computing it
                let mut reusable: Vec<Symbol> = match e.assigned_symbol() {
                    Some(s) if self.reuse_destinations => vec![s.clone()],
                    _ => vec![],
                };

                let (rhs, lowered) = self.lower_expr(e.rhs(), c, &mut reusable)?;

                if !lowered.is_empty() {
                    dump(&mut exprs, c, &mut processed);
                    processed.extend(lowered);
                }

                if Rc::ptr_eq(&rhs, e.rhs()) {
                    exprs.push(e.clone());
                } else if e.operation().is_none() && e.lhs() == &rhs {
                    // `r = deriv(...)` where `r` itself became the
                    // accumulator: nothing left to assign
                } else {
                    exprs.push(e.with_rhs(rhs));
                }
            }
            dump(&mut exprs, c, &mut processed);
        }

        Ok(processed)
    }

    /// Post-order rewrite of `expr`.  Returns the rewritten expression (the
    /// same `Rc` if nothing below it was lowered) and the clusters that now
    /// compute the derivatives it contained, innermost first.
    fn lower_expr(
        &mut self,
        expr: &Rc<Expr>,
        c: &Cluster,
        reusable: &mut Vec<Symbol>,
    ) -> Result<(Rc<Expr>, Vec<Cluster>)> {
        if expr.is_leaf() {
            return Ok((expr.clone(), vec![]));
        }

        let mut args: Vec<Rc<Expr>> = Vec::new();
        let mut processed: Vec<Cluster> = Vec::new();
        for a in expr.args() {
            let (arg, clusters) = self.lower_expr(a, c, reusable)?;
            args.push(arg);
            processed.extend(clusters);
        }

        let expr = reuse_if_untouched(expr, args);

        let Expr::Derivative(deriv) = expr.as_ref() else {
            return Ok((expr, processed));
        };

        let w = self
            .weights
            .resolve(&mut self.names, deriv.weights().function(), deriv.dtype());
        let deriv = deriv.with_weights_function(w.clone());

        // outer derivatives' dimensions nest around inner ones
        let mut all_dims = Expr::Derivative(deriv.clone()).stencil_dimensions();
        all_dims.reverse();
        let Some(fallback) = all_dims.last().cloned() else {
            return lower_err!(MissingStencilDimension, format!("{expr}"));
        };

        // a stencil dimension the cluster already iterates over keeps the
        // tap window it was given there
        let dims: Vec<StencilDimension> = all_dims
            .into_iter()
            .filter(|d| !c.ispace().contains(&Dimension::from(d.clone())))
            .collect();

        let intervals: Vec<Interval> = dims
            .iter()
            .map(|d| Interval::new(d.clone().into()))
            .collect();
        let directions: BTreeMap<Dimension, Direction> = dims
            .iter()
            .map(|d| {
                let dir = if d.is_backward() {
                    Direction::Backward
                } else {
                    Direction::Forward
                };
                (d.clone().into(), dir)
            })
            .collect();
        let ispace0 = IterationSpace::new(intervals, &directions);

        let mut nesting = c.ispace().itdims();
        nesting.extend(dims.iter().map(|d| Dimension::from(d.clone())));
        let mut ispace = c.ispace().union(&ispace0, &[nesting])?;

        // iterate the taps from zero rather than from `min`
        for d in dims.iter() {
            ispace = ispace.translate(&d.clone().into(), -d.tap_min())?;
        }

        let s = match reusable.pop() {
            Some(s) => {
                if s.dtype() != w.dtype() {
                    return lower_err!(
                        AccumulatorTypeMismatch,
                        format!(
                            "accumulator {} is {:?} but {} is {:?}",
                            s.name(),
                            s.dtype(),
                            w.name(),
                            w.dtype()
                        )
                    );
                }
                s
            }
            None => Symbol::new(&self.names.make_name("r"), w.dtype()),
        };

        // the initialization runs once per iteration of the enclosing
        // loops, not once per tap
        let innermost: Dimension = dims.last().cloned().unwrap_or(fallback).into();
        let init = Cluster::new(
            vec![Equation::new(s.expr(), Expr::float(0.0))],
            ispace.project(|d| d != &innermost),
        );

        // undo the shift of the loop counters in the accesses
        let mut base = deriv.base().clone();
        for d in dims.iter() {
            let shifted = Expr::add(vec![Expr::dim(d.clone()), Expr::int(d.tap_min())]);
            base = subs_dim(&base, &d.clone().into(), &shifted);
        }
        let rhs = Expr::mul(vec![base, Rc::new(Expr::Weights(deriv.weights().clone()))]);

        trace!(
            accumulator = s.name(),
            weights = w.name(),
            ispace = %ispace,
            "lowered derivative"
        );

        let acc = Cluster::new(vec![Equation::inc(s.expr(), rhs.clone())], ispace);
        processed.push(init);
        processed.push(acc);

        self.mapper.record(rhs, s.clone());

        Ok((s.expr(), processed))
    }
}
