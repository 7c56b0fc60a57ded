// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Cluster-level passes.

use std::time::Instant;

use tracing::{debug, debug_span};

use crate::common::Result;
use crate::config::{FusionMode, LoweringConfig};
use crate::ir::Cluster;
use crate::symbols::SymbolRegistry;

pub mod cde;
pub mod derivatives;
pub mod fusion;
pub mod queue;

use self::cde::CommonDerivativeElimination;
use self::derivatives::LoweringContext;
use self::fusion::{Fusion, MaximalFusion};

/// Replaces every derivative in `clusters` with explicit reductions over
/// its stencil taps.
///
/// After lowering, `fusion` reorders and merges the result (unless the
/// configured mode is [`FusionMode::Noop`], in which case it is never
/// called), and common derivative elimination removes reductions computed
/// more than once in the same loop nest.  Input without any derivative is
/// returned as-is, with neither step run.
pub fn lower_index_derivatives<F>(
    clusters: Vec<Cluster>,
    config: &LoweringConfig,
    fusion: &F,
) -> Result<Vec<Cluster>>
where
    F: Fusion + ?Sized,
{
    let _span = debug_span!("lower_index_derivatives").entered();
    let start = Instant::now();

    let mut ctx = LoweringContext::new(
        SymbolRegistry::for_clusters(&clusters),
        config.reuse_destinations,
    );
    let lowered = ctx.lower_clusters(&clusters)?;

    if ctx.weights().is_empty() {
        debug!(clusters = clusters.len(), "no derivatives to lower");
        return Ok(clusters);
    }

    debug!(
        clusters_in = clusters.len(),
        clusters_out = lowered.len(),
        weights = ctx.weights().len(),
        "lowered derivatives"
    );

    let lowered = match config.fusion {
        FusionMode::Noop => lowered,
        FusionMode::Maximal => {
            let fused = fusion.fuse(lowered)?;
            debug!(clusters = fused.len(), "fused");
            fused
        }
    };

    let result = if config.cde {
        let mut cde = CommonDerivativeElimination::new(ctx.mapper());
        let result = queue::process(&mut cde, lowered)?;
        debug!(
            eliminated = cde.eliminated(),
            clusters = result.len(),
            "common derivative elimination"
        );
        result
    } else {
        lowered
    };

    debug!(elapsed_us = start.elapsed().as_micros() as u64, "done");

    Ok(result)
}

/// [`lower_index_derivatives`] with [`MaximalFusion`].
pub fn lower(clusters: Vec<Cluster>, config: &LoweringConfig) -> Result<Vec<Cluster>> {
    lower_index_derivatives(clusters, config, &MaximalFusion)
}
