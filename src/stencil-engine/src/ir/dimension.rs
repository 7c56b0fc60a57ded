// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

use crate::common::Ident;

/// A bounded dimension iterating over the taps of a finite-difference
/// stencil.  `min..=max` are the tap offsets relative to the grid point, so a
/// centered 3-point stencil has `min = -1` and `max = 1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StencilDimension {
    name: Ident,
    min: i64,
    max: i64,
    backward: bool,
}

impl StencilDimension {
    pub fn new(name: &str, min: i64, max: i64) -> Self {
        debug_assert!(min <= max, "stencil dimension {name} has min > max");
        StencilDimension {
            name: name.to_owned(),
            min,
            max,
            backward: false,
        }
    }

    /// The same dimension, iterated from `max` down to `min`.
    pub fn backward(mut self) -> Self {
        self.backward = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset of the first tap.
    pub fn tap_min(&self) -> i64 {
        self.min
    }

    /// Offset of the last tap.
    pub fn tap_max(&self) -> i64 {
        self.max
    }

    pub fn is_backward(&self) -> bool {
        self.backward
    }

    /// Number of taps.
    pub fn size(&self) -> usize {
        (self.max - self.min + 1) as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    /// A grid dimension whose extent is only known at run time.
    Space(Ident),
    Stencil(StencilDimension),
}

impl Dimension {
    pub fn space(name: &str) -> Self {
        Dimension::Space(name.to_owned())
    }

    pub fn name(&self) -> &str {
        match self {
            Dimension::Space(name) => name,
            Dimension::Stencil(sd) => sd.name(),
        }
    }

    pub fn as_stencil(&self) -> Option<&StencilDimension> {
        match self {
            Dimension::Stencil(sd) => Some(sd),
            Dimension::Space(_) => None,
        }
    }

    pub fn is_stencil(&self) -> bool {
        matches!(self, Dimension::Stencil(_))
    }
}

impl From<StencilDimension> for Dimension {
    fn from(sd: StencilDimension) -> Self {
        Dimension::Stencil(sd)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for StencilDimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
