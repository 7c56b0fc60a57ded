// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

use crate::ir::cluster::Cluster;
use crate::ir::equation::{Equation, Operation};
use crate::ir::expr::{Expr, Weights};
use crate::ir::ispace::{Direction, Interval, IterationSpace};

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Add(_) => 1,
        Expr::Mul(_) => 2,
        Expr::Neg(_) => 3,
        Expr::Pow(_, _) => 4,
        // negative literals bind like a unary minus
        Expr::Int(n) if *n < 0 => 3,
        Expr::Float(n) if n.0 < 0.0 => 3,
        _ => 5,
    }
}

fn child_needs_parens(parent: &Expr, child: &Expr) -> bool {
    match parent {
        // children are comma separated or bracketed, so no ambiguity possible
        Expr::Indexed(_, _) | Expr::Derivative(_) => false,
        // `a**b**c` is ambiguous to a reader, be explicit
        Expr::Pow(_, _) => precedence(child) <= precedence(parent),
        _ => precedence(parent) > precedence(child),
    }
}

fn paren_if_necessary(parent: &Expr, child: &Expr) -> String {
    if child_needs_parens(parent, child) {
        format!("({child})")
    } else {
        format!("{child}")
    }
}

fn pretty_weights(w: &Weights) -> String {
    let dims: Vec<&str> = w.dims().iter().map(|d| d.name()).collect();
    format!("{}[{}]", w.function().name(), dims.join(", "))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Float(n) => write!(f, "{:?}", n.0),
            Expr::Symbol(s) => write!(f, "{}", s.name()),
            Expr::Dim(d) => write!(f, "{d}"),
            Expr::Indexed(func, indices) => {
                let indices: Vec<String> = indices.iter().map(|i| format!("{i}")).collect();
                write!(f, "{}[{}]", func.name(), indices.join(", "))
            }
            Expr::Weights(w) => write!(f, "{}", pretty_weights(w)),
            Expr::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    match term.as_ref() {
                        // `x + -1` reads better as `x - 1`
                        Expr::Int(n) if i > 0 && *n < 0 => write!(f, " - {}", -n)?,
                        Expr::Neg(arg) if i > 0 => {
                            write!(f, " - {}", paren_if_necessary(self, arg))?
                        }
                        _ if i > 0 => write!(f, " + {}", paren_if_necessary(self, term))?,
                        _ => write!(f, "{}", paren_if_necessary(self, term))?,
                    }
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                let factors: Vec<String> =
                    factors.iter().map(|c| paren_if_necessary(self, c)).collect();
                write!(f, "{}", factors.join("*"))
            }
            Expr::Pow(base, exp) => write!(
                f,
                "{}**{}",
                paren_if_necessary(self, base),
                paren_if_necessary(self, exp)
            ),
            Expr::Neg(arg) => write!(f, "-{}", paren_if_necessary(self, arg)),
            Expr::Derivative(d) => {
                let dims: Vec<&str> = d.weights().dims().iter().map(|d| d.name()).collect();
                write!(
                    f,
                    "deriv[{}]({}, {})",
                    dims.join(", "),
                    d.base(),
                    pretty_weights(d.weights())
                )
            }
        }
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = match self.operation() {
            None => "=",
            Some(Operation::Inc) => "+=",
        };
        write!(f, "{} {} {}", self.lhs(), op, self.rhs())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Direction::Forward => "++",
            Direction::Backward => "--",
            Direction::Any => "**",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // stencil dimensions have known extents, grid dimensions only offsets
        let (lower, upper) = self.bounds().unwrap_or((self.lower(), self.upper()));
        write!(f, "{}[{},{}]", self.dim(), lower, upper)
    }
}

impl fmt::Display for IterationSpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let intervals: Vec<String> = self
            .intervals()
            .iter()
            .map(|i| {
                let dir = self.direction(i.dim()).unwrap_or(Direction::Forward);
                format!("{i}{dir}")
            })
            .collect();
        write!(f, "[{}]", intervals.join(", "))
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.ispace())?;
        for e in self.exprs() {
            write!(f, "\n  {e}")?;
        }
        Ok(())
    }
}
