//! Core types for the congestion simulation
//!
//! Identifiers are plain arena indices, assigned in creation order and never
//! reused during a run.

use std::fmt;

/// A wrapper type for intersection (node) IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A wrapper type for road segment (edge) IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle{}", self.0)
    }
}

/// Geographic position of an intersection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

impl Coordinates {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }
}

/// Which edge weight the planner reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostMode {
    /// Static free-flow traversal time; the baseline policy
    FreeFlow,
    /// Live occupancy-dependent traversal time; the optimized policy
    Congested,
}

impl CostMode {
    pub fn label(&self) -> &'static str {
        match self {
            CostMode::FreeFlow => "baseline",
            CostMode::Congested => "optimized",
        }
    }
}

/// Length one vehicle takes up on a road, in length units
pub const UNIT_VEHICLE_LENGTH: f64 = 5.0;

/// Spacing above which traffic moves at free-flow speed
pub const FREE_FLOW_SPACING: f64 = 10.0;

/// Spacing at or below which a road refuses another vehicle
pub const CRITICAL_SPACING: f64 = 1.0;

/// Simulated time advanced per tick
pub const TIME_FACTOR: f64 = 1.0;

/// Ticks between two vehicle deployments
pub const DEPLOYMENT_INTERVAL: u64 = 10;

/// Ticks a vehicle may stay blocked before it is stranded
pub const STALL_BUDGET: u64 = 100_000;
