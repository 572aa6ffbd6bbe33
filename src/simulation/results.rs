//! Per-vehicle outcomes and run-level comparison of the two routing policies

use log::info;
use std::collections::BTreeMap;

use super::types::{CostMode, EdgeId, NodeId, VehicleId};
use super::vehicle::{Vehicle, VehicleState};

/// What happened to one vehicle during one pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    /// Route cost estimated at deployment
    pub expected_time: f64,
    /// Time actually spent on roads
    pub actual_time: f64,
    /// How much longer the trip took than estimated, in percent
    pub percent_delay: f64,
    /// Roads driven, in order
    pub path: Vec<EdgeId>,
    /// Nodes passed through, one more than `path` once the trip began
    pub nodes: Vec<NodeId>,
    pub stranded: bool,
}

impl PassOutcome {
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        let expected_time = vehicle.expected_time();
        let actual_time = vehicle.actual_time();
        let path = vehicle.traversed().to_vec();
        let nodes = if path.is_empty() {
            Vec::new()
        } else {
            vehicle
                .route_nodes()
                .get(..=path.len())
                .map(<[NodeId]>::to_vec)
                .unwrap_or_default()
        };
        Self {
            expected_time,
            actual_time,
            percent_delay: percent_delay(expected_time, actual_time),
            path,
            nodes,
            stranded: vehicle.state() == VehicleState::Stranded,
        }
    }

    /// Driven roads as `edge{id}(node{from}->node{to})`, joined by `, `
    pub fn path_label(&self) -> String {
        self.path
            .iter()
            .enumerate()
            .map(|(i, edge)| match (self.nodes.get(i), self.nodes.get(i + 1)) {
                (Some(from), Some(to)) => format!("{}({}->{})", edge, from, to),
                _ => edge.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `(actual / expected - 1) * 100`, or 0 when there is no usable estimate
pub fn percent_delay(expected: f64, actual: f64) -> f64 {
    if expected > 0.0 && expected.is_finite() {
        (actual / expected - 1.0) * 100.0
    } else {
        0.0
    }
}

/// Baseline and optimized outcomes for one vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub id: VehicleId,
    pub start: NodeId,
    pub end: NodeId,
    pub baseline: Option<PassOutcome>,
    pub optimized: Option<PassOutcome>,
}

impl SimulationResult {
    pub fn new(id: VehicleId, start: NodeId, end: NodeId) -> Self {
        Self {
            id,
            start,
            end,
            baseline: None,
            optimized: None,
        }
    }

    pub fn outcome(&self, mode: CostMode) -> Option<&PassOutcome> {
        match mode {
            CostMode::FreeFlow => self.baseline.as_ref(),
            CostMode::Congested => self.optimized.as_ref(),
        }
    }

    /// Both passes finished without stranding
    pub fn is_comparable(&self) -> bool {
        matches!(
            (&self.baseline, &self.optimized),
            (Some(baseline), Some(optimized)) if !baseline.stranded && !optimized.stranded
        )
    }
}

/// Run-level comparison counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Registered vehicles
    pub simulations: usize,
    /// Vehicles that finished both passes
    pub optimized_count: usize,
    /// Optimized estimate beat the realized baseline by more than the margin
    pub success_count: usize,
    /// Optimized estimate was worse than the realized baseline beyond the tolerance
    pub failure_count: usize,
}

/// Collects one [`SimulationResult`] per registered vehicle
#[derive(Debug, Clone, Default)]
pub struct ResultsAggregator {
    records: BTreeMap<VehicleId, SimulationResult>,
}

impl ResultsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an empty record for a newly registered vehicle
    pub fn register(&mut self, vehicle: &Vehicle) {
        self.records.insert(
            vehicle.id,
            SimulationResult::new(vehicle.id, vehicle.start, vehicle.end),
        );
    }

    /// Stores the vehicle's outcome for the pass run under `mode`
    pub fn record(&mut self, mode: CostMode, vehicle: &Vehicle) {
        let record = self
            .records
            .entry(vehicle.id)
            .or_insert_with(|| SimulationResult::new(vehicle.id, vehicle.start, vehicle.end));
        let outcome = Some(PassOutcome::from_vehicle(vehicle));
        match mode {
            CostMode::FreeFlow => record.baseline = outcome,
            CostMode::Congested => record.optimized = outcome,
        }
    }

    pub fn get(&self, id: VehicleId) -> Option<&SimulationResult> {
        self.records.get(&id)
    }

    /// Records ordered by vehicle ID
    pub fn records(&self) -> impl Iterator<Item = &SimulationResult> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compares the optimized estimate against the realized baseline time
    /// for every vehicle that finished both passes
    pub fn summary(&self, success_margin: f64, failure_tolerance: f64) -> RunSummary {
        let mut summary = RunSummary {
            simulations: self.records.len(),
            ..RunSummary::default()
        };

        for record in self.records.values() {
            let (Some(baseline), Some(optimized)) = (&record.baseline, &record.optimized) else {
                continue;
            };
            if baseline.stranded || optimized.stranded {
                continue;
            }
            summary.optimized_count += 1;

            if optimized.expected_time + success_margin < baseline.actual_time {
                summary.success_count += 1;
            } else if optimized.expected_time > baseline.actual_time + failure_tolerance {
                summary.failure_count += 1;
            }
        }

        summary
    }

    /// Writes one line per vehicle and pass, then the summary
    pub fn log_report(&self, success_margin: f64, failure_tolerance: f64) {
        for record in self.records.values() {
            for mode in [CostMode::FreeFlow, CostMode::Congested] {
                match record.outcome(mode) {
                    Some(outcome) if outcome.stranded => info!(
                        "{} {}: stranded on the way from {} to {} after {}",
                        record.id,
                        mode.label(),
                        record.start,
                        record.end,
                        outcome.path_label()
                    ),
                    Some(outcome) => info!(
                        "{} {}: {} -> {} via {} in {:.2} (expected {:.2}, {:.2}% delay)",
                        record.id,
                        mode.label(),
                        record.start,
                        record.end,
                        outcome.path_label(),
                        outcome.actual_time,
                        outcome.expected_time,
                        outcome.percent_delay
                    ),
                    None => info!("{} {}: not run", record.id, mode.label()),
                }
            }
        }

        let summary = self.summary(success_margin, failure_tolerance);
        info!("=== COMPARISON SUMMARY ===");
        info!("Simulations: {}", summary.simulations);
        info!("Optimized runs: {}", summary.optimized_count);
        info!("Successes: {}", summary.success_count);
        info!("Failures: {}", summary.failure_count);
    }
}
