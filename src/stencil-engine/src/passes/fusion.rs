// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeSet;

use crate::common::{Ident, Result};
use crate::ir::Cluster;

/// Reorders and merges clusters between lowering and common derivative
/// elimination.  Implementations must preserve every dependence between
/// the clusters they are given.
pub trait Fusion {
    fn fuse(&self, clusters: Vec<Cluster>) -> Result<Vec<Cluster>>;
}

/// Schedules clusters so that those sharing a loop nest end up next to
/// each other, then merges each run of independent clusters with the same
/// nest into one.
#[derive(Copy, Clone, Debug, Default)]
pub struct MaximalFusion;

struct Accesses {
    reads: BTreeSet<Ident>,
    writes: BTreeSet<Ident>,
}

impl Accesses {
    fn new(c: &Cluster) -> Self {
        Accesses {
            reads: c.reads(),
            writes: c.writes(),
        }
    }

    fn depends(&self, later: &Accesses) -> bool {
        !self.writes.is_disjoint(&later.reads)
            || !self.reads.is_disjoint(&later.writes)
            || !self.writes.is_disjoint(&later.writes)
    }
}

impl MaximalFusion {
    /// A topological order of the dependence graph.  When several clusters
    /// are ready, one in the same nest as the last scheduled cluster wins;
    /// ties go to the earliest in the input.
    fn schedule(&self, clusters: &[Cluster]) -> Vec<usize> {
        let accesses: Vec<Accesses> = clusters.iter().map(Accesses::new).collect();
        let n = clusters.len();

        let mut preds: Vec<usize> = vec![0; n];
        let mut succs: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                if accesses[i].depends(&accesses[j]) {
                    preds[j] += 1;
                    succs[i].push(j);
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| preds[i] == 0).collect();
        let mut order: Vec<usize> = Vec::with_capacity(n);
        while let Some(&first) = ready.iter().next() {
            let next = order
                .last()
                .and_then(|&last| {
                    let nest = clusters[last].ispace();
                    ready
                        .iter()
                        .copied()
                        .find(|&i| clusters[i].ispace().same_nest(nest))
                })
                .unwrap_or(first);

            ready.remove(&next);
            order.push(next);
            for &j in succs[next].iter() {
                preds[j] -= 1;
                if preds[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        order
    }
}

impl Fusion for MaximalFusion {
    fn fuse(&self, clusters: Vec<Cluster>) -> Result<Vec<Cluster>> {
        let order = self.schedule(&clusters);

        let mut fused: Vec<Cluster> = Vec::with_capacity(clusters.len());
        for i in order {
            let c = &clusters[i];
            if let Some(last) = fused.last_mut()
                && last.ispace().same_nest(c.ispace())
                && can_merge(last, c)
            {
                let mut exprs = last.exprs().to_vec();
                exprs.extend(c.exprs().iter().cloned());
                let ispace = last.ispace().union(c.ispace(), &[])?;
                *last = Cluster::new(exprs, ispace);
            } else {
                fused.push(c.clone());
            }
        }

        Ok(fused)
    }
}

/// Two clusters in the same nest may share its loops if neither reads or
/// writes anything the other writes, arrays included.
fn can_merge(a: &Cluster, b: &Cluster) -> bool {
    !Accesses::new(a).depends(&Accesses::new(b))
}
