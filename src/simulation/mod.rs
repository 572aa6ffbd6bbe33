//! Congestion-aware traffic simulation
//!
//! Vehicles drive a directed road graph whose traversal times depend on how
//! many vehicles share each road. The engine runs every vehicle twice, once
//! routed on free-flow times and once re-routed at every intersection on live
//! congested times, and compares the outcomes.

mod config;
mod edge;
mod engine;
mod error;
mod planner;
mod results;
mod road_network;
mod scenario;
mod types;
mod vehicle;

pub use config::{SimConfig, SpacingModel};
pub use edge::Road;
pub use engine::{PassReport, SimEngine};
pub use error::{SimError, SimResult};
pub use planner::{plan, EdgeWeight, Route};
pub use results::{percent_delay, PassOutcome, ResultsAggregator, RunSummary, SimulationResult};
pub use road_network::{Intersection, RoadNetwork};
pub use scenario::GridScenario;
pub use types::{
    Coordinates, CostMode, EdgeId, NodeId, VehicleId, CRITICAL_SPACING, DEPLOYMENT_INTERVAL,
    FREE_FLOW_SPACING, STALL_BUDGET, TIME_FACTOR, UNIT_VEHICLE_LENGTH,
};
pub use vehicle::{AdvanceOutcome, Vehicle, VehicleState};
