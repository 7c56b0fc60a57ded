// Copyright 2026 The Stencil Engine Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::{error, result};

pub type Ident = String;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AccumulatorTypeMismatch,
    MissingStencilDimension,
    CyclicRelations,
    UnknownDimension,
    BadConfig,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            AccumulatorTypeMismatch => "accumulator_type_mismatch",
            MissingStencilDimension => "missing_stencil_dimension",
            CyclicRelations => "cyclic_relations",
            UnknownDimension => "unknown_dimension",
            BadConfig => "bad_config",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Lowering,
    IterationSpace,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Lowering => "LoweringError",
            ErrorKind::IterationSpace => "IterationSpaceError",
            ErrorKind::Config => "ConfigError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Config,
            code: ErrorCode::BadConfig,
            details: Some(err.to_string()),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! lower_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Lowering, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Lowering, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! ispace_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::IterationSpace,
            ErrorCode::$code,
            Some($str),
        ))
    }};
}

/// Orders `items` so that every `(before, after)` edge in `edges` is
/// respected.  Among items with no pending predecessors the one appearing
/// first in `items` wins, which keeps the result deterministic and as close
/// to the input order as the constraints allow.
///
/// Returns `None` if the edges contain a cycle.
pub fn stable_topo_sort<T>(items: &[T], edges: &[(T, T)]) -> Option<Vec<T>>
where
    T: Clone + Eq + Hash,
{
    let position: HashMap<&T, usize> = items.iter().enumerate().map(|(i, t)| (t, i)).collect();

    let mut preds: Vec<HashSet<usize>> = vec![HashSet::new(); items.len()];
    for (before, after) in edges.iter() {
        // edges may mention items that were projected away; ignore those
        if let (Some(&b), Some(&a)) = (position.get(before), position.get(after))
            && a != b
        {
            preds[a].insert(b);
        }
    }

    let mut result: Vec<T> = Vec::with_capacity(items.len());
    let mut done = vec![false; items.len()];
    while result.len() < items.len() {
        let next = (0..items.len()).find(|&i| !done[i] && preds[i].iter().all(|&p| done[p]))?;
        done[next] = true;
        result.push(items[next].clone());
    }

    Some(result)
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Lowering,
        ErrorCode::AccumulatorTypeMismatch,
        Some("r0".to_owned()),
    );
    assert_eq!("LoweringError{accumulator_type_mismatch: r0}", format!("{err}"));

    let err = Error::new(ErrorKind::Config, ErrorCode::BadConfig, None);
    assert_eq!("ConfigError{bad_config}", format!("{err}"));
}

#[test]
fn test_error_code_names() {
    use ErrorCode::*;
    let names: Vec<String> = [
        AccumulatorTypeMismatch,
        MissingStencilDimension,
        CyclicRelations,
        UnknownDimension,
        BadConfig,
    ]
    .iter()
    .map(|code| code.to_string())
    .collect();
    assert_eq!(
        vec![
            "accumulator_type_mismatch",
            "missing_stencil_dimension",
            "cyclic_relations",
            "unknown_dimension",
            "bad_config",
        ],
        names
    );
}

#[test]
fn test_stable_topo_sort() {
    // no constraints: input order is preserved
    assert_eq!(Some(vec![1, 2, 3]), stable_topo_sort(&[1, 2, 3], &[]));

    // 3 must come before 1
    assert_eq!(Some(vec![2, 3, 1]), stable_topo_sort(&[1, 2, 3], &[(3, 1)]));

    // edges on unknown items are ignored
    assert_eq!(Some(vec![1, 2]), stable_topo_sort(&[1, 2], &[(7, 1), (2, 9)]));

    // cycles are reported
    assert_eq!(None, stable_topo_sort(&[1, 2], &[(1, 2), (2, 1)]));
}
