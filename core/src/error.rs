//! Error types for the generation engine

use std::fmt;

use crate::config::SupernodeId;

/// Result alias used throughout the engine
pub type GenResult<T> = Result<T, GenError>;

/// Generation error types
///
/// Every failure is fail-fast: the engine never retries and never returns a
/// partially generated dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum GenError {
    /// Structural or semantic configuration violations, one message each
    InvalidConfiguration(Vec<String>),

    /// Fewer than two control points for a node that needs a curve
    InsufficientControlPoints {
        supernode: Option<SupernodeId>,
        found: usize,
    },

    /// Sampled curve has zero variance and cannot be rescaled
    DegenerateRange {
        supernode: Option<SupernodeId>,
        subnode: Option<usize>,
    },

    /// Dependent node reads a super node that has not been generated
    UnknownUpstreamSupernode {
        supernode: SupernodeId,
        upstream: SupernodeId,
    },

    /// Connections row width disagrees with the upstream sub-node count
    ConnectionLengthMismatch {
        supernode: SupernodeId,
        subnode: usize,
        upstream: SupernodeId,
        expected: usize,
        found: usize,
    },

    /// Super nodes that take part in a dependency cycle
    CyclicDependency(Vec<SupernodeId>),

    /// Failed to decode a configuration or request document
    Parse(String),

    /// Method not found in the registry
    UnknownMethod(String),

    /// Internal error
    Internal(String),
}

impl GenError {
    /// Attach a super-node / sub-node location to curve level errors.
    ///
    /// Errors that already carry a location are returned unchanged.
    pub fn locate(self, id: SupernodeId, index: usize) -> Self {
        match self {
            GenError::InsufficientControlPoints { supernode: None, found } => {
                GenError::InsufficientControlPoints {
                    supernode: Some(id),
                    found,
                }
            }
            GenError::DegenerateRange {
                supernode: None,
                subnode: None,
            } => GenError::DegenerateRange {
                supernode: Some(id),
                subnode: Some(index),
            },
            other => other,
        }
    }
}

fn location(supernode: &Option<SupernodeId>, subnode: &Option<usize>) -> String {
    match (supernode, subnode) {
        (Some(s), Some(i)) => format!(" (super node {}, sub node {})", s, i),
        (Some(s), None) => format!(" (super node {})", s),
        _ => String::new(),
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::InvalidConfiguration(v) => {
                write!(f, "Invalid configuration: {}", v.join("; "))
            }
            GenError::InsufficientControlPoints { supernode, found } => write!(
                f,
                "Insufficient control points: need at least 2, found {}{}",
                found,
                location(supernode, &None)
            ),
            GenError::DegenerateRange { supernode, subnode } => write!(
                f,
                "Degenerate range: sampled curve has zero variance{}",
                location(supernode, subnode)
            ),
            GenError::UnknownUpstreamSupernode { supernode, upstream } => write!(
                f,
                "Unknown upstream super node {} referenced by super node {}",
                upstream, supernode
            ),
            GenError::ConnectionLengthMismatch {
                supernode,
                subnode,
                upstream,
                expected,
                found,
            } => write!(
                f,
                "Connection length mismatch for super node {}, sub node {}: upstream {} has {} sub nodes, row has {}",
                supernode, subnode, upstream, expected, found
            ),
            GenError::CyclicDependency(ids) => {
                let ids: Vec<String> = ids.iter().map(|i| i.to_string()).collect();
                write!(f, "Cyclic dependency between super nodes [{}]", ids.join(", "))
            }
            GenError::Parse(e) => write!(f, "Parse error: {}", e),
            GenError::UnknownMethod(m) => write!(f, "Unknown method: {}", m),
            GenError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for GenError {}

impl From<serde_yaml::Error> for GenError {
    fn from(e: serde_yaml::Error) -> Self {
        GenError::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for GenError {
    fn from(e: serde_json::Error) -> Self {
        GenError::Parse(e.to_string())
    }
}
