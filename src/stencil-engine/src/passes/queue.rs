// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Traversal of a cluster sequence grouped by shared loop prefixes.
//!
//! Consecutive clusters agreeing on their outermost `level` intervals form a
//! group; each group is split again at `level + 1` until clusters run out of
//! dimensions.  A callback then sees every group, the narrowest first, with
//! the clusters its children returned.  This mirrors how the sequence will
//! eventually be scheduled into nested loops: whatever a callback learns
//! about a group holds inside that loop nest only.

use std::collections::VecDeque;

use crate::common::Result;
use crate::ir::{Cluster, Direction, Interval};

pub type Prefix = Vec<(Interval, Direction)>;

/// Index of a cluster in a [`ClusterArena`].  Two clusters are the same
/// cluster iff their ids are equal, whatever their contents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(usize);

#[derive(Clone, Debug, Default)]
pub struct ClusterArena {
    clusters: Vec<Cluster>,
}

impl ClusterArena {
    pub fn alloc(&mut self, c: Cluster) -> ClusterId {
        self.clusters.push(c);
        ClusterId(self.clusters.len() - 1)
    }

    pub fn get(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id.0]
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

pub trait PrefixQueue {
    /// Processes one group.  `prefix` is the loop prefix shared by every
    /// cluster in `ids`; it is empty for the outermost call.
    fn callback(
        &mut self,
        arena: &mut ClusterArena,
        ids: Vec<ClusterId>,
        prefix: &[(Interval, Direction)],
    ) -> Result<Vec<ClusterId>>;
}

struct Frame {
    level: usize,
    prefix: Prefix,
    pending: VecDeque<(Prefix, Vec<ClusterId>)>,
    processed: Vec<ClusterId>,
}

impl Frame {
    fn new(arena: &ClusterArena, ids: Vec<ClusterId>, level: usize, prefix: Prefix) -> Self {
        Frame {
            level,
            prefix,
            pending: group_by_prefix(arena, ids, level),
            processed: Vec::new(),
        }
    }
}

fn group_by_prefix(
    arena: &ClusterArena,
    ids: Vec<ClusterId>,
    level: usize,
) -> VecDeque<(Prefix, Vec<ClusterId>)> {
    let mut groups: VecDeque<(Prefix, Vec<ClusterId>)> = VecDeque::new();
    for id in ids {
        let key = arena.get(id).ispace().prefix(level);
        match groups.back_mut() {
            Some((k, group)) if *k == key => group.push(id),
            _ => groups.push_back((key, vec![id])),
        }
    }
    groups
}

/// Runs `queue` over `clusters`, returning the clusters the outermost
/// callback produced.
pub fn process<Q>(queue: &mut Q, clusters: Vec<Cluster>) -> Result<Vec<Cluster>>
where
    Q: PrefixQueue + ?Sized,
{
    let mut arena = ClusterArena::default();
    let ids: Vec<ClusterId> = clusters.into_iter().map(|c| arena.alloc(c)).collect();

    let mut stack = vec![Frame::new(&arena, ids, 1, Prefix::new())];
    let result = loop {
        let Some(top) = stack.last_mut() else {
            break Vec::new();
        };

        if let Some((key, group)) = top.pending.pop_front() {
            if top.level > key.len() {
                // nothing deeper to split on
                top.processed.extend(group);
            } else {
                let level = top.level + 1;
                let frame = Frame::new(&arena, group, level, key);
                stack.push(frame);
            }
            continue;
        }

        let Some(frame) = stack.pop() else {
            break Vec::new();
        };
        let out = queue.callback(&mut arena, frame.processed, &frame.prefix)?;
        match stack.last_mut() {
            Some(parent) => parent.processed.extend(out),
            None => break out,
        }
    };

    Ok(result.into_iter().map(|id| arena.get(id).clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Dimension, Equation, Expr};
    use crate::test_common::*;

    /// Records the groups it is called with and passes clusters through.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Vec<String>, Vec<String>)>,
    }

    impl PrefixQueue for Recorder {
        fn callback(
            &mut self,
            arena: &mut ClusterArena,
            ids: Vec<ClusterId>,
            prefix: &[(Interval, Direction)],
        ) -> Result<Vec<ClusterId>> {
            let prefix = prefix.iter().map(|(i, _)| i.dim().to_string()).collect();
            let lhs = ids
                .iter()
                .map(|id| arena.get(*id).exprs()[0].lhs().to_string())
                .collect();
            self.calls.push((prefix, lhs));
            Ok(ids)
        }
    }

    fn assign(name: &str, dims: &[Dimension]) -> Cluster {
        cluster(vec![Equation::new(sym(name).expr(), Expr::int(0))], dims)
    }

    #[test]
    fn test_groups_are_visited_narrowest_first() {
        let i0: Dimension = sd("i0", -1, 1).into();
        let i1: Dimension = sd("i1", -1, 1).into();
        let x = space("x");
        let clusters = vec![
            assign("a", &[x.clone(), i0.clone()]),
            assign("b", &[x.clone(), i0.clone(), i1.clone()]),
            assign("c", &[x.clone()]),
            assign("d", &[x.clone(), i1.clone()]),
        ];

        let mut recorder = Recorder::default();
        let out = process(&mut recorder, clusters.clone()).unwrap();
        assert_eq!(clusters, out);

        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            vec![
                (names(&["x", "i0", "i1"]), names(&["b"])),
                (names(&["x", "i0"]), names(&["a", "b"])),
                (names(&["x", "i1"]), names(&["d"])),
                (names(&["x"]), names(&["a", "b", "c", "d"])),
                (names(&[]), names(&["a", "b", "c", "d"])),
            ],
            recorder.calls
        );
    }

    #[test]
    fn test_groups_are_consecutive_runs() {
        let i0: Dimension = sd("i0", -1, 1).into();
        let x = space("x");
        // the two [x, i0] clusters are split by an [x] one
        let clusters = vec![
            assign("a", &[x.clone(), i0.clone()]),
            assign("b", &[x.clone()]),
            assign("c", &[x.clone(), i0.clone()]),
        ];

        let mut recorder = Recorder::default();
        process(&mut recorder, clusters).unwrap();
        let groups: Vec<usize> = recorder.calls.iter().map(|(_, lhs)| lhs.len()).collect();
        assert_eq!(vec![1, 1, 3, 3], groups);
    }

    #[test]
    fn test_empty_input() {
        let mut recorder = Recorder::default();
        assert!(process(&mut recorder, vec![]).unwrap().is_empty());
        assert_eq!(1, recorder.calls.len());
    }
}
