// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use serde::Deserialize;

use crate::common::Result;

/// Whether clusters are fused between lowering and common derivative
/// elimination.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    /// Leave the lowered clusters in emission order; the fusion
    /// collaborator is not invoked at all.
    Noop,
    /// Reorder and fuse as aggressively as dependences allow.
    #[default]
    Maximal,
}

/// Options for `lower_index_derivatives`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoweringConfig {
    pub fusion: FusionMode,
    /// Reuse the destination of `r = <derivatives>` as the accumulator of
    /// one of its derivatives.
    pub reuse_destinations: bool,
    /// Run common derivative elimination after lowering.
    pub cde: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self {
            fusion: FusionMode::Maximal,
            reuse_destinations: true,
            cde: true,
        }
    }
}

impl LoweringConfig {
    /// Parses options from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
