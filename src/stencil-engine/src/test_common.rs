// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Common test infrastructure for building clusters
//!
//! Everything is single precision over one grid dimension `x` unless the
//! caller says otherwise.

use std::rc::Rc;

use crate::ir::{
    Cluster, DType, Derivative, Dimension, Equation, Expr, Function, IterationSpace,
    StencilDimension, Symbol, Weights, WeightsFunction,
};

/// Second derivative, centered, 3 points.
pub const D2: &[f64] = &[1.0, -2.0, 1.0];

/// First derivative, centered, 3 points.
pub const D1: &[f64] = &[-0.5, 0.0, 0.5];

pub fn space(name: &str) -> Dimension {
    Dimension::space(name)
}

/// The grid point `x` as an index expression.
pub fn x() -> Rc<Expr> {
    Expr::dim(space("x"))
}

pub fn sd(name: &str, min: i64, max: i64) -> StencilDimension {
    StencilDimension::new(name, min, max)
}

pub fn sym(name: &str) -> Symbol {
    Symbol::new(name, DType::F32)
}

pub fn field(name: &str) -> Function {
    Function::new(name, DType::F32)
}

/// `deriv[dim](base, fd[dim])` with coefficients `values`.
pub fn deriv(base: Rc<Expr>, dim: &StencilDimension, values: &[f64]) -> Rc<Expr> {
    let w = Rc::new(WeightsFunction::new("fd", values, DType::F32));
    Derivative::new(base, Weights::new(w, [dim.clone()]), DType::F32).expr()
}

/// Derivative of `f` along `x`, reading `f[x + dim]`.
pub fn dx(f: &Function, dim: &StencilDimension, values: &[f64]) -> Rc<Expr> {
    let base = f.at([Expr::add(vec![x(), Expr::dim(dim.clone())])]);
    deriv(base, dim, values)
}

/// Derivative of a derivative of `f` along `x`: the inner one over `inner`,
/// the outer one over `outer`, reading `f[x + outer + inner]`.
pub fn dx2(
    f: &Function,
    outer: &StencilDimension,
    inner: &StencilDimension,
    values: &[f64],
) -> Rc<Expr> {
    let base = f.at([Expr::add(vec![
        x(),
        Expr::dim(outer.clone()),
        Expr::dim(inner.clone()),
    ])]);
    deriv(deriv(base, inner, values), outer, values)
}

/// A cluster over `dims`, each with zero offsets and iterating forward.
pub fn cluster(exprs: Vec<Equation>, dims: &[Dimension]) -> Cluster {
    Cluster::new(exprs, IterationSpace::from_dims(dims.iter().cloned()))
}

/// Builder for a cluster sequence, one cluster per `eq` call unless
/// `group` is used.
pub struct TestClusters {
    dims: Vec<Dimension>,
    clusters: Vec<Cluster>,
}

impl TestClusters {
    /// Clusters iterating over `x` only.
    pub fn new() -> Self {
        Self::over(&[space("x")])
    }

    pub fn over(dims: &[Dimension]) -> Self {
        TestClusters {
            dims: dims.to_vec(),
            clusters: Vec::new(),
        }
    }

    /// Adds a cluster computing `lhs = rhs`.
    pub fn eq(self, lhs: &str, rhs: Rc<Expr>) -> Self {
        self.group(vec![Equation::new(sym(lhs).expr(), rhs)])
    }

    /// Adds a cluster computing the given equations in order.
    pub fn group(mut self, exprs: Vec<Equation>) -> Self {
        self.clusters.push(cluster(exprs, &self.dims));
        self
    }

    pub fn build(self) -> Vec<Cluster> {
        self.clusters
    }
}

impl Default for TestClusters {
    fn default() -> Self {
        Self::new()
    }
}
