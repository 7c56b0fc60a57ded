// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Scalar expression trees.
//!
//! Nodes are reference counted and never mutated.  A rewrite that leaves a
//! subtree alone hands back the very same `Rc`, so callers can use
//! `Rc::ptr_eq` to find out whether anything changed without comparing
//! whole trees.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use crate::common::Ident;
use crate::ir::dimension::{Dimension, StencilDimension};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    F32,
    F64,
}

/// A scalar variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    name: Ident,
    dtype: DType,
}

impl Symbol {
    pub fn new(name: &str, dtype: DType) -> Self {
        Symbol {
            name: name.to_owned(),
            dtype,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn expr(&self) -> Rc<Expr> {
        Rc::new(Expr::Symbol(self.clone()))
    }
}

/// An array living on the grid, e.g. a wavefield.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Function {
    name: Ident,
    dtype: DType,
}

impl Function {
    pub fn new(name: &str, dtype: DType) -> Self {
        Function {
            name: name.to_owned(),
            dtype,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// An access `self[indices...]`.
    pub fn at<I>(&self, indices: I) -> Rc<Expr>
    where
        I: IntoIterator<Item = Rc<Expr>>,
    {
        Rc::new(Expr::Indexed(self.clone(), indices.into_iter().collect()))
    }
}

/// A concrete table of stencil coefficients.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WeightsFunction {
    name: Ident,
    values: Vec<OrderedFloat<f64>>,
    dtype: DType,
}

impl WeightsFunction {
    pub fn new(name: &str, values: &[f64], dtype: DType) -> Self {
        WeightsFunction {
            name: name.to_owned(),
            values: values.iter().copied().map(OrderedFloat).collect(),
            dtype,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[OrderedFloat<f64>] {
        &self.values
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The same coefficients under a different name and type.
    pub fn rebuild(&self, name: &str, dtype: DType) -> Self {
        WeightsFunction {
            name: name.to_owned(),
            values: self.values.clone(),
            dtype,
        }
    }
}

/// An access into a coefficient table, indexed by stencil dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Weights {
    function: Rc<WeightsFunction>,
    dims: SmallVec<[StencilDimension; 2]>,
}

impl Weights {
    pub fn new<I>(function: Rc<WeightsFunction>, dims: I) -> Self
    where
        I: IntoIterator<Item = StencilDimension>,
    {
        Weights {
            function,
            dims: dims.into_iter().collect(),
        }
    }

    pub fn function(&self) -> &Rc<WeightsFunction> {
        &self.function
    }

    pub fn dims(&self) -> &[StencilDimension] {
        &self.dims
    }

    fn with_function(&self, function: Rc<WeightsFunction>) -> Self {
        Weights {
            function,
            dims: self.dims.clone(),
        }
    }
}

/// A weighted sum of `base` over the taps of the weights' stencil
/// dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Derivative {
    base: Rc<Expr>,
    weights: Weights,
    dtype: DType,
}

impl Derivative {
    pub fn new(base: Rc<Expr>, weights: Weights, dtype: DType) -> Self {
        Derivative {
            base,
            weights,
            dtype,
        }
    }

    pub fn base(&self) -> &Rc<Expr> {
        &self.base
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn expr(self) -> Rc<Expr> {
        Rc::new(Expr::Derivative(self))
    }

    /// The same derivative reading its coefficients from `function`.
    pub fn with_weights_function(&self, function: Rc<WeightsFunction>) -> Self {
        Derivative {
            base: self.base.clone(),
            weights: self.weights.with_function(function),
            dtype: self.dtype,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Int(i64),
    Float(OrderedFloat<f64>),
    Symbol(Symbol),
    Dim(Dimension),
    Indexed(Function, SmallVec<[Rc<Expr>; 4]>),
    Weights(Weights),
    Add(Vec<Rc<Expr>>),
    Mul(Vec<Rc<Expr>>),
    Pow(Rc<Expr>, Rc<Expr>),
    Neg(Rc<Expr>),
    Derivative(Derivative),
}

impl Expr {
    pub fn int(n: i64) -> Rc<Expr> {
        Rc::new(Expr::Int(n))
    }

    pub fn float(n: f64) -> Rc<Expr> {
        Rc::new(Expr::Float(OrderedFloat(n)))
    }

    pub fn dim<D: Into<Dimension>>(d: D) -> Rc<Expr> {
        Rc::new(Expr::Dim(d.into()))
    }

    pub fn add(terms: Vec<Rc<Expr>>) -> Rc<Expr> {
        Rc::new(Expr::Add(terms))
    }

    pub fn mul(factors: Vec<Rc<Expr>>) -> Rc<Expr> {
        Rc::new(Expr::Mul(factors))
    }

    pub fn pow(base: Rc<Expr>, exp: Rc<Expr>) -> Rc<Expr> {
        Rc::new(Expr::Pow(base, exp))
    }

    pub fn neg(arg: Rc<Expr>) -> Rc<Expr> {
        Rc::new(Expr::Neg(arg))
    }

    /// Leaves are never rewritten by the lowering; array accesses count as
    /// leaves since their indices are affine functions of dimensions.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expr::Int(_)
                | Expr::Float(_)
                | Expr::Symbol(_)
                | Expr::Dim(_)
                | Expr::Indexed(_, _)
                | Expr::Weights(_)
        )
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Expr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Operands visited by tree rewrites, in order.
    pub fn args(&self) -> SmallVec<[&Rc<Expr>; 4]> {
        match self {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Symbol(_)
            | Expr::Dim(_)
            | Expr::Indexed(_, _)
            | Expr::Weights(_) => SmallVec::new(),
            Expr::Add(terms) | Expr::Mul(terms) => terms.iter().collect(),
            Expr::Pow(base, exp) => smallvec::smallvec![base, exp],
            Expr::Neg(arg) => smallvec::smallvec![arg],
            Expr::Derivative(d) => smallvec::smallvec![&d.base],
        }
    }

    /// Rebuilds this node around new operands, which must line up with
    /// `args()`.
    pub fn with_args(&self, mut args: Vec<Rc<Expr>>) -> Expr {
        debug_assert_eq!(self.args().len(), args.len());
        match self {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Symbol(_)
            | Expr::Dim(_)
            | Expr::Indexed(_, _)
            | Expr::Weights(_) => self.clone(),
            Expr::Add(_) => Expr::Add(args),
            Expr::Mul(_) => Expr::Mul(args),
            Expr::Pow(_, _) => {
                let exp = args.pop().unwrap_or_else(|| Expr::int(1));
                let base = args.pop().unwrap_or_else(|| Expr::int(0));
                Expr::Pow(base, exp)
            }
            Expr::Neg(arg) => Expr::Neg(args.pop().unwrap_or_else(|| arg.clone())),
            Expr::Derivative(d) => Expr::Derivative(Derivative {
                base: args.pop().unwrap_or_else(|| d.base.clone()),
                weights: d.weights.clone(),
                dtype: d.dtype,
            }),
        }
    }

    /// Every stencil dimension in this tree, including those nested in
    /// array indices and derivative weights, deduplicated in first-seen
    /// order.  A derivative contributes its own dimensions before those of
    /// its base, so inner derivatives list their dimensions ahead of the
    /// outer ones they are nested in.
    pub fn stencil_dimensions(&self) -> Vec<StencilDimension> {
        let mut seen = Vec::new();
        self.collect_stencil_dimensions(&mut seen);
        seen
    }

    fn collect_stencil_dimensions(&self, seen: &mut Vec<StencilDimension>) {
        fn push(seen: &mut Vec<StencilDimension>, sd: &StencilDimension) {
            if !seen.contains(sd) {
                seen.push(sd.clone());
            }
        }
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Symbol(_) => {}
            Expr::Dim(d) => {
                if let Some(sd) = d.as_stencil() {
                    push(seen, sd);
                }
            }
            Expr::Weights(w) => {
                for sd in w.dims() {
                    push(seen, sd);
                }
            }
            Expr::Indexed(_, indices) => {
                for idx in indices.iter() {
                    idx.collect_stencil_dimensions(seen);
                }
            }
            Expr::Derivative(d) => {
                for sd in d.weights.dims() {
                    push(seen, sd);
                }
                d.base.collect_stencil_dimensions(seen);
            }
            Expr::Add(_) | Expr::Mul(_) | Expr::Pow(_, _) | Expr::Neg(_) => {
                for arg in self.args() {
                    arg.collect_stencil_dimensions(seen);
                }
            }
        }
    }

    /// Names of every symbol and array read by this expression.
    pub fn reads(&self) -> BTreeSet<Ident> {
        let mut names = BTreeSet::new();
        self.collect_reads(&mut names);
        names
    }

    pub(crate) fn collect_reads(&self, names: &mut BTreeSet<Ident>) {
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Dim(_) | Expr::Weights(_) => {}
            Expr::Symbol(s) => {
                names.insert(s.name.clone());
            }
            Expr::Indexed(f, indices) => {
                names.insert(f.name.clone());
                for idx in indices.iter() {
                    idx.collect_reads(names);
                }
            }
            _ => {
                for arg in self.args() {
                    arg.collect_reads(names);
                }
            }
        }
    }

    /// True if any node of this tree satisfies `pred`.
    pub fn any(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Expr::Indexed(_, indices) => indices.iter().any(|idx| idx.any(pred)),
            _ => self.args().into_iter().any(|arg| arg.any(pred)),
        }
    }

    pub fn contains_derivative(&self) -> bool {
        self.any(&|e| matches!(e, Expr::Derivative(_)))
    }
}

/// Returns `expr` itself when every new operand is the very same node as
/// the old one, otherwise a rebuilt copy.
pub fn reuse_if_untouched(expr: &Rc<Expr>, args: Vec<Rc<Expr>>) -> Rc<Expr> {
    let untouched = expr
        .args()
        .into_iter()
        .zip(args.iter())
        .all(|(old, new)| Rc::ptr_eq(old, new));
    if untouched {
        expr.clone()
    } else {
        Rc::new(expr.with_args(args))
    }
}

/// Replaces every occurrence of dimension `d` with `replacement`, array
/// indices included.
pub fn subs_dim(expr: &Rc<Expr>, d: &Dimension, replacement: &Rc<Expr>) -> Rc<Expr> {
    match expr.as_ref() {
        Expr::Dim(dim) if dim == d => replacement.clone(),
        Expr::Indexed(f, indices) => {
            let new: SmallVec<[Rc<Expr>; 4]> = indices
                .iter()
                .map(|idx| subs_dim(idx, d, replacement))
                .collect();
            if new.iter().zip(indices.iter()).all(|(a, b)| Rc::ptr_eq(a, b)) {
                expr.clone()
            } else {
                Rc::new(Expr::Indexed(f.clone(), new))
            }
        }
        _ if expr.is_leaf() => expr.clone(),
        _ => {
            let args = expr
                .args()
                .into_iter()
                .map(|arg| subs_dim(arg, d, replacement))
                .collect();
            reuse_if_untouched(expr, args)
        }
    }
}

/// Structural replacement: any subtree equal to a key of `mapper` is
/// swapped for the corresponding value.  Replacements are not themselves
/// rewritten.
pub fn xreplace(expr: &Rc<Expr>, mapper: &HashMap<Rc<Expr>, Rc<Expr>>) -> Rc<Expr> {
    if mapper.is_empty() {
        return expr.clone();
    }
    if let Some(new) = mapper.get(expr) {
        return new.clone();
    }
    match expr.as_ref() {
        Expr::Indexed(f, indices) => {
            let new: SmallVec<[Rc<Expr>; 4]> =
                indices.iter().map(|idx| xreplace(idx, mapper)).collect();
            if new.iter().zip(indices.iter()).all(|(a, b)| Rc::ptr_eq(a, b)) {
                expr.clone()
            } else {
                Rc::new(Expr::Indexed(f.clone(), new))
            }
        }
        _ if expr.is_leaf() => expr.clone(),
        _ => {
            let args = expr
                .args()
                .into_iter()
                .map(|arg| xreplace(arg, mapper))
                .collect();
            reuse_if_untouched(expr, args)
        }
    }
}
