// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
pub mod config;
pub mod ir;
pub mod passes;
pub mod symbols;

#[doc(hidden)]
pub mod test_common;

pub use self::common::{Error, ErrorCode, ErrorKind, Ident, Result};
pub use self::config::{FusionMode, LoweringConfig};
pub use self::ir::{
    Cluster, DType, Derivative, Dimension, Direction, Equation, Expr, Function, Interval,
    IterationSpace, Operation, StencilDimension, Symbol, Weights, WeightsFunction,
};
pub use self::passes::derivatives::LoweringMap;
pub use self::passes::fusion::{Fusion, MaximalFusion};
pub use self::passes::{lower, lower_index_derivatives};
pub use self::symbols::SymbolRegistry;
