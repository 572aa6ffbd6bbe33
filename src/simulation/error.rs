//! Simulation error type.

use thiserror::Error;

use super::types::{EdgeId, NodeId, VehicleId};

/// Errors produced by the simulation core.
///
/// `Capacity` and `Unreachable` are expected outcomes during a run and are
/// recovered by the engine; the others indicate misuse of the construction
/// API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("{edge} is at capacity")]
    Capacity { edge: EdgeId },

    #[error("no route from {from} to {to}")]
    Unreachable { from: NodeId, to: NodeId },

    #[error("{from} and {to} are already connected")]
    DuplicateEdge { from: NodeId, to: NodeId },

    #[error("{0} not found in network")]
    UnknownNode(NodeId),

    #[error("{0} not found in network")]
    UnknownEdge(EdgeId),

    #[error("{0} not registered")]
    UnknownVehicle(VehicleId),

    #[error("{edge} has no vehicle to release")]
    NotOccupied { edge: EdgeId },

    #[error("invalid road geometry: length {length}, speed {speed}")]
    InvalidEdge { length: f64, speed: f64 },
}

pub type SimResult<T> = Result<T, SimError>;
