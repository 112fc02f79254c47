//! Connection rules: which ports may be joined by an edge.
//!
//! All checks are pure reads of the [`Graph`]. Rejections come back as a
//! [`ValidationResult`] carrying the reason, so callers can log why a drop
//! was refused; the boolean wrappers cover the common case.

use crate::graph::{Capacity, EdgeId, Graph, PortId};
use std::fmt;

/// Outcome of checking a prospective connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// First failure wins.
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }
}

/// Why two ports may not be connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    PortNotFound(PortId),
    /// Both ports are inputs, or both are outputs.
    SameDirection,
    /// Both ports belong to the same node.
    SameNode,
    /// A `Single` port already carries a real edge.
    CapacityReached(PortId),
    /// A real edge already joins the two ports.
    AlreadyConnected,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortNotFound(id) => write!(f, "Port {} not found", id),
            Self::SameDirection => write!(f, "Must connect an input to an output"),
            Self::SameNode => write!(f, "Cannot connect ports on the same node"),
            Self::CapacityReached(id) => write!(f, "Port {} accepts no more connections", id),
            Self::AlreadyConnected => write!(f, "Ports are already connected"),
        }
    }
}

impl Graph {
    /// Whether a port carries at least one edge, optionally not counting
    /// candidate edges.
    pub fn connected(&self, port: PortId, ignore_candidate_edges: bool) -> bool {
        self.connected_excluding(port, ignore_candidate_edges, None)
    }

    fn connected_excluding(&self, port: PortId, ignore_candidate_edges: bool, exclude: Option<EdgeId>) -> bool {
        let Some(port) = self.port(port) else {
            return false;
        };
        port.connections()
            .filter(|id| Some(*id) != exclude)
            .filter_map(|id| self.edge(id))
            .any(|edge| !(ignore_candidate_edges && edge.is_candidate()))
    }

    /// `Multi` ports always accept more; `Single` ports only while unconnected.
    pub fn can_connect_to_more(&self, port: PortId, ignore_candidate_edges: bool) -> bool {
        match self.port(port) {
            Some(p) if p.capacity() == Capacity::Multi => true,
            Some(_) => !self.connected(port, ignore_candidate_edges),
            None => false,
        }
    }

    /// Whether a real edge already joins `a` and `b`.
    pub fn is_connected_to(&self, a: PortId, b: PortId) -> bool {
        self.is_connected_to_excluding(a, b, None)
    }

    fn is_connected_to_excluding(&self, a: PortId, b: PortId, exclude: Option<EdgeId>) -> bool {
        let Some(port) = self.port(a) else {
            return false;
        };
        port.connections()
            .filter(|id| Some(*id) != exclude)
            .filter_map(|id| self.edge(id))
            .filter(|edge| edge.is_real())
            .any(|edge| {
                (edge.output() == Some(a) && edge.input() == Some(b))
                    || (edge.output() == Some(b) && edge.input() == Some(a))
            })
    }

    /// Full rule check with the reason for a rejection.
    pub fn validate_connection(&self, a: PortId, b: PortId, ignore_candidate_edges: bool) -> ValidationResult {
        self.validate_connection_excluding(a, b, ignore_candidate_edges, None)
    }

    /// As [`Graph::validate_connection`], but pretending `exclude` does not
    /// exist. A dragged edge must not count against its own anchored port.
    pub(crate) fn validate_connection_excluding(
        &self,
        a: PortId,
        b: PortId,
        ignore_candidate_edges: bool,
        exclude: Option<EdgeId>,
    ) -> ValidationResult {
        let Some(pa) = self.port(a) else {
            return ValidationResult::Invalid(ValidationError::PortNotFound(a));
        };
        let Some(pb) = self.port(b) else {
            return ValidationResult::Invalid(ValidationError::PortNotFound(b));
        };

        if pa.direction() == pb.direction() {
            return ValidationResult::Invalid(ValidationError::SameDirection);
        }
        if pa.node() == pb.node() {
            return ValidationResult::Invalid(ValidationError::SameNode);
        }

        for p in [pa, pb] {
            if p.capacity() == Capacity::Single
                && self.connected_excluding(p.id(), ignore_candidate_edges, exclude)
            {
                return ValidationResult::Invalid(ValidationError::CapacityReached(p.id()));
            }
        }

        if self.is_connected_to_excluding(a, b, exclude) {
            return ValidationResult::Invalid(ValidationError::AlreadyConnected);
        }
        ValidationResult::Valid
    }

    pub fn can_connect_to(&self, a: PortId, b: PortId, ignore_candidate_edges: bool) -> bool {
        self.validate_connection(a, b, ignore_candidate_edges).is_valid()
    }
}
