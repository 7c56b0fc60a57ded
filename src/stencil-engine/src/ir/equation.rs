// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::common::Ident;
use crate::ir::expr::{Expr, Symbol, xreplace};

/// How the right-hand side is combined with the destination.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `lhs += rhs`
    Inc,
}

/// A scalar equation `lhs = rhs` (or `lhs += rhs`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Equation {
    lhs: Rc<Expr>,
    rhs: Rc<Expr>,
    operation: Option<Operation>,
}

impl Equation {
    pub fn new(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Self {
        Equation {
            lhs,
            rhs,
            operation: None,
        }
    }

    pub fn inc(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Self {
        Equation {
            lhs,
            rhs,
            operation: Some(Operation::Inc),
        }
    }

    pub fn lhs(&self) -> &Rc<Expr> {
        &self.lhs
    }

    pub fn rhs(&self) -> &Rc<Expr> {
        &self.rhs
    }

    pub fn operation(&self) -> Option<Operation> {
        self.operation
    }

    /// The destination symbol, if this is a plain assignment to a scalar.
    pub fn assigned_symbol(&self) -> Option<&Symbol> {
        match self.operation {
            None => self.lhs.as_symbol(),
            Some(_) => None,
        }
    }

    /// The same operation with a new right-hand side.
    pub fn with_rhs(&self, rhs: Rc<Expr>) -> Self {
        Equation {
            lhs: self.lhs.clone(),
            rhs,
            operation: self.operation,
        }
    }

    /// Applies `xreplace` to both sides.
    pub fn xreplace(&self, mapper: &HashMap<Rc<Expr>, Rc<Expr>>) -> Self {
        Equation {
            lhs: xreplace(&self.lhs, mapper),
            rhs: xreplace(&self.rhs, mapper),
            operation: self.operation,
        }
    }

    /// Name of the symbol or array written.
    pub fn writes(&self) -> Option<&str> {
        match self.lhs.as_ref() {
            Expr::Symbol(s) => Some(s.name()),
            Expr::Indexed(f, _) => Some(f.name()),
            _ => None,
        }
    }

    /// Names read, including the destination itself for increments and any
    /// symbols used to index the destination.
    pub fn reads(&self) -> BTreeSet<Ident> {
        let mut names = self.rhs.reads();
        match (self.lhs.as_ref(), self.operation) {
            (Expr::Indexed(_, indices), None) => {
                for idx in indices.iter() {
                    idx.collect_reads(&mut names);
                }
            }
            (_, Some(Operation::Inc)) => self.lhs.collect_reads(&mut names),
            _ => {}
        }
        names
    }
}
