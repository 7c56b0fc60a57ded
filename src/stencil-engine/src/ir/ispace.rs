// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Iteration spaces: the loop dimensions a cluster runs under.
//!
//! Every operation here returns a new value; an `IterationSpace` is never
//! changed in place once built.

use std::collections::{BTreeMap, BTreeSet};

use crate::common::{Result, stable_topo_sort};
use crate::ir::dimension::Dimension;
use crate::ispace_err;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    /// Either direction is acceptable; produced when merging spaces that
    /// disagree.
    Any,
}

impl Direction {
    fn union(self, other: Direction) -> Direction {
        if self == other { self } else { Direction::Any }
    }
}

/// The range covered by one dimension.  `lower` and `upper` are offsets
/// from the dimension's own extent: for a grid dimension `x` the loop runs
/// over `x_m + lower ..= x_M + upper`, for a stencil dimension over
/// `min + lower ..= max + upper`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    dim: Dimension,
    lower: i64,
    upper: i64,
}

impl Interval {
    pub fn new(dim: Dimension) -> Self {
        Interval {
            dim,
            lower: 0,
            upper: 0,
        }
    }

    pub fn with_offsets(dim: Dimension, lower: i64, upper: i64) -> Self {
        Interval { dim, lower, upper }
    }

    pub fn dim(&self) -> &Dimension {
        &self.dim
    }

    pub fn lower(&self) -> i64 {
        self.lower
    }

    pub fn upper(&self) -> i64 {
        self.upper
    }

    /// The absolute loop bounds, known only for stencil dimensions.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        self.dim
            .as_stencil()
            .map(|sd| (sd.tap_min() + self.lower, sd.tap_max() + self.upper))
    }

    pub fn translate(&self, v: i64) -> Interval {
        Interval {
            dim: self.dim.clone(),
            lower: self.lower + v,
            upper: self.upper + v,
        }
    }

    /// The smallest interval covering both `self` and `other`, which must
    /// be over the same dimension.
    fn union(&self, other: &Interval) -> Interval {
        debug_assert_eq!(self.dim, other.dim);
        Interval {
            dim: self.dim.clone(),
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct IterationSpace {
    intervals: Vec<Interval>,
    directions: BTreeMap<Dimension, Direction>,
    /// Each entry lists dimensions from outermost to innermost nesting.
    relations: BTreeSet<Vec<Dimension>>,
}

impl IterationSpace {
    /// A space over `intervals`, nested in the given order.  Dimensions
    /// missing from `directions` iterate forward.
    pub fn new(intervals: Vec<Interval>, directions: &BTreeMap<Dimension, Direction>) -> Self {
        let directions = intervals
            .iter()
            .map(|i| {
                let dir = directions
                    .get(&i.dim)
                    .copied()
                    .unwrap_or(Direction::Forward);
                (i.dim.clone(), dir)
            })
            .collect();
        IterationSpace {
            intervals,
            directions,
            relations: BTreeSet::new(),
        }
    }

    /// Shorthand for a forward space with zero offsets on every dimension.
    pub fn from_dims<I>(dims: I) -> Self
    where
        I: IntoIterator<Item = Dimension>,
    {
        let intervals = dims.into_iter().map(Interval::new).collect();
        IterationSpace::new(intervals, &BTreeMap::new())
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Dimensions from outermost to innermost.
    pub fn itdims(&self) -> Vec<Dimension> {
        self.intervals.iter().map(|i| i.dim.clone()).collect()
    }

    pub fn contains(&self, d: &Dimension) -> bool {
        self.intervals.iter().any(|i| &i.dim == d)
    }

    pub fn interval(&self, d: &Dimension) -> Option<&Interval> {
        self.intervals.iter().find(|i| &i.dim == d)
    }

    pub fn direction(&self, d: &Dimension) -> Option<Direction> {
        self.directions.get(d).copied()
    }

    pub fn relations(&self) -> &BTreeSet<Vec<Dimension>> {
        &self.relations
    }

    /// The outermost `level` intervals with their directions: what two
    /// clusters must agree on to share the first `level` loops.
    pub fn prefix(&self, level: usize) -> Vec<(Interval, Direction)> {
        self.intervals
            .iter()
            .take(level)
            .map(|i| {
                let dir = self.direction(&i.dim).unwrap_or(Direction::Forward);
                (i.clone(), dir)
            })
            .collect()
    }

    /// True if both spaces describe the same loop nest.
    pub fn same_nest(&self, other: &IterationSpace) -> bool {
        self.len() == other.len() && self.prefix(self.len()) == other.prefix(other.len())
    }

    /// Merges `self` and `other`.  Shared dimensions take the union of
    /// their intervals; the nesting order honors the order of both inputs,
    /// their relations, and `extra` (each entry outermost first).
    pub fn union(&self, other: &IterationSpace, extra: &[Vec<Dimension>]) -> Result<Self> {
        let mut intervals: Vec<Interval> = self.intervals.clone();
        for i in other.intervals.iter() {
            match intervals.iter_mut().find(|j| j.dim == i.dim) {
                Some(j) => *j = j.union(i),
                None => intervals.push(i.clone()),
            }
        }

        let mut directions = self.directions.clone();
        for (d, dir) in other.directions.iter() {
            let merged = match directions.get(d) {
                Some(existing) => existing.union(*dir),
                None => *dir,
            };
            directions.insert(d.clone(), merged);
        }

        let mut relations = self.relations.clone();
        relations.extend(other.relations.iter().cloned());
        relations.extend(extra.iter().filter(|r| r.len() > 1).cloned());

        let mut edges: Vec<(Dimension, Dimension)> = Vec::new();
        let implicit = [self.itdims(), other.itdims()];
        for order in implicit.iter().chain(relations.iter()) {
            for pair in order.windows(2) {
                edges.push((pair[0].clone(), pair[1].clone()));
            }
        }

        let dims: Vec<Dimension> = intervals.iter().map(|i| i.dim.clone()).collect();
        let Some(order) = stable_topo_sort(&dims, &edges) else {
            let names: Vec<&str> = dims.iter().map(|d| d.name()).collect();
            return ispace_err!(CyclicRelations, names.join(", "));
        };
        let intervals = order
            .iter()
            .filter_map(|d| intervals.iter().find(|i| &i.dim == d).cloned())
            .collect();

        Ok(IterationSpace {
            intervals,
            directions,
            relations,
        })
    }

    /// Drops every dimension for which `keep` returns false.
    pub fn project<P>(&self, keep: P) -> Self
    where
        P: Fn(&Dimension) -> bool,
    {
        let intervals = self
            .intervals
            .iter()
            .filter(|i| keep(&i.dim))
            .cloned()
            .collect();
        let directions = self
            .directions
            .iter()
            .filter(|(d, _)| keep(d))
            .map(|(d, dir)| (d.clone(), *dir))
            .collect();
        let relations = self
            .relations
            .iter()
            .map(|r| r.iter().filter(|d| keep(d)).cloned().collect::<Vec<_>>())
            .filter(|r| r.len() > 1)
            .collect();
        IterationSpace {
            intervals,
            directions,
            relations,
        }
    }

    /// Shifts the interval of `d` by `v`.
    pub fn translate(&self, d: &Dimension, v: i64) -> Result<Self> {
        if !self.contains(d) {
            return ispace_err!(UnknownDimension, d.name().to_owned());
        }
        let intervals = self
            .intervals
            .iter()
            .map(|i| if &i.dim == d { i.translate(v) } else { i.clone() })
            .collect();
        Ok(IterationSpace {
            intervals,
            directions: self.directions.clone(),
            relations: self.relations.clone(),
        })
    }
}
