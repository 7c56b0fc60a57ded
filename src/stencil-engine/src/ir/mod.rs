// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The intermediate representation the passes operate on: expressions,
//! equations, iteration spaces and the clusters binding them together.

pub mod cluster;
pub mod dimension;
pub mod equation;
pub mod expr;
pub mod ispace;
mod pretty;

pub use self::cluster::Cluster;
pub use self::dimension::{Dimension, StencilDimension};
pub use self::equation::{Equation, Operation};
pub use self::expr::{
    DType, Derivative, Expr, Function, Symbol, Weights, WeightsFunction, reuse_if_untouched,
    subs_dim, xreplace,
};
pub use self::ispace::{Direction, Interval, IterationSpace};
