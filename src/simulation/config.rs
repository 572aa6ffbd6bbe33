//! Tunable parameters for a simulation run

use super::types::{
    CRITICAL_SPACING, DEPLOYMENT_INTERVAL, FREE_FLOW_SPACING, STALL_BUDGET, TIME_FACTOR,
    UNIT_VEHICLE_LENGTH,
};

/// Simulation configuration
///
/// The defaults match the constants in `types`; the headless binary
/// overlays values from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Road length taken by one vehicle
    pub unit_vehicle_length: f64,
    /// Spacing above which roads run at free-flow speed
    pub free_flow_spacing: f64,
    /// Spacing at or below which roads refuse admission
    pub critical_spacing: f64,
    /// Simulated time per tick
    pub time_factor: f64,
    /// A vehicle is deployed on every tick that is a multiple of this
    pub deployment_interval: u64,
    /// Ticks a waiting or stalled vehicle may stay blocked before stranding
    pub stall_budget: u64,
    /// Hard cap on ticks per pass, `None` for no cap
    pub max_ticks: Option<u64>,
    /// How far the optimized estimate must beat the baseline to count as a success
    pub success_margin: f64,
    /// How far the optimized estimate may exceed the baseline before it counts as a failure
    pub failure_tolerance: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            unit_vehicle_length: UNIT_VEHICLE_LENGTH,
            free_flow_spacing: FREE_FLOW_SPACING,
            critical_spacing: CRITICAL_SPACING,
            time_factor: TIME_FACTOR,
            deployment_interval: DEPLOYMENT_INTERVAL,
            stall_budget: STALL_BUDGET,
            max_ticks: None,
            success_margin: 0.0,
            failure_tolerance: 1.0,
        }
    }
}

impl SimConfig {
    /// Geometry parameters handed to every new road
    pub fn spacing_model(&self) -> SpacingModel {
        SpacingModel {
            unit_vehicle_length: self.unit_vehicle_length,
            free_flow_spacing: self.free_flow_spacing,
            critical_spacing: self.critical_spacing,
        }
    }
}

/// The part of the configuration the edge cost model reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacingModel {
    pub unit_vehicle_length: f64,
    pub free_flow_spacing: f64,
    pub critical_spacing: f64,
}

impl Default for SpacingModel {
    fn default() -> Self {
        SimConfig::default().spacing_model()
    }
}
