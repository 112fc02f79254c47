//! Error types for graph mutation and configuration loading.
//!
//! A rejected drag is *not* an error: the drag controller reverts it and
//! reports the outcome. These errors cover programming mistakes such as
//! connecting two outputs or handing over an identity that no longer exists.

use crate::graph::{Direction, EdgeId, NodeId, PortId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cannot connect ports {a} and {b}: both are {direction:?}")]
    SameDirection {
        a: PortId,
        b: PortId,
        direction: Direction,
    },
    #[error("port {0} not found")]
    PortNotFound(PortId),
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {field}: {message}")]
    Validation { field: &'static str, message: String },
}
