// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeSet;

use crate::common::Ident;
use crate::ir::equation::Equation;
use crate::ir::ispace::IterationSpace;

/// An ordered group of equations sharing one iteration space.  Clusters
/// are never modified; passes build new ones with `rebuild`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    exprs: Vec<Equation>,
    ispace: IterationSpace,
}

impl Cluster {
    pub fn new(exprs: Vec<Equation>, ispace: IterationSpace) -> Self {
        Cluster { exprs, ispace }
    }

    pub fn exprs(&self) -> &[Equation] {
        &self.exprs
    }

    pub fn ispace(&self) -> &IterationSpace {
        &self.ispace
    }

    /// A cluster with new equations under the same iteration space.
    pub fn rebuild(&self, exprs: Vec<Equation>) -> Cluster {
        Cluster {
            exprs,
            ispace: self.ispace.clone(),
        }
    }

    pub fn writes(&self) -> BTreeSet<Ident> {
        self.exprs
            .iter()
            .filter_map(|e| e.writes().map(|w| w.to_owned()))
            .collect()
    }

    pub fn reads(&self) -> BTreeSet<Ident> {
        self.exprs.iter().flat_map(|e| e.reads()).collect()
    }

    pub fn contains_derivative(&self) -> bool {
        self.exprs
            .iter()
            .any(|e| e.lhs().contains_derivative() || e.rhs().contains_derivative())
    }
}
