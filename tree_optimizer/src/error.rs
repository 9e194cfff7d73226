//! Error types for the optimizer.

use thiserror::Error;

use crate::graph::NodeId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OptimizerError>;

/// Faults surfaced to the caller. None of them are retried internally: they mean the problem
/// handed to the optimizer is unsolvable or malformed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizerError {
    /// A required node cannot be reached from the start node.
    #[error("graph is not connected: node {to} cannot be reached from node {from}")]
    GraphNotConnected { from: NodeId, to: NodeId },

    /// Out-of-range constructor or configuration argument.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The fitness function returned a negative (or non-finite) value.
    #[error("fitness values must be finite and non-negative, got {0}")]
    NegativeFitness(f64),

    /// The input referenced a node id outside of the node universe.
    #[error("unknown node id {0}")]
    UnknownNode(NodeId),

    /// Preprocessing needs at least one fixed target node.
    #[error("at least one fixed target node must be provided")]
    NoTargets,
}

impl OptimizerError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        OptimizerError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
