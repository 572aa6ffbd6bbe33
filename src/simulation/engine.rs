//! Discrete time-stepped simulation engine
//!
//! Runs the same vehicles over the same network twice, once routing on
//! free-flow times (baseline) and once on live congested times (optimized).
//!
//! Within a tick the order is fixed: deployment first, then every travelling
//! vehicle in the order it was deployed. A vehicle therefore sees occupancy
//! changes made earlier in the same tick by vehicles deployed before it.

use log::{debug, info, warn};

use super::config::SimConfig;
use super::error::{SimError, SimResult};
use super::planner::plan;
use super::results::{ResultsAggregator, RunSummary};
use super::road_network::RoadNetwork;
use super::types::{CostMode, EdgeId, NodeId, VehicleId};
use super::vehicle::{AdvanceOutcome, Vehicle, VehicleState};

/// Statistics for one finished pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassReport {
    pub mode: CostMode,
    pub ticks: u64,
    pub elapsed: f64,
    pub completed: usize,
    pub stranded: usize,
}

/// What a deployment attempt achieved
enum Deployment {
    Started,
    /// Route or first road blocked for now
    Blocked,
    /// No road path exists at all
    Impossible,
}

/// The simulation engine: network, vehicles and results for one scenario
pub struct SimEngine {
    network: RoadNetwork,
    vehicles: Vec<Vehicle>,
    results: ResultsAggregator,
    config: SimConfig,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimEngine {
    pub fn new(config: SimConfig) -> Self {
        Self {
            network: RoadNetwork::new(config.spacing_model()),
            vehicles: Vec::new(),
            results: ResultsAggregator::new(),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> SimResult<&Vehicle> {
        self.vehicles.get(id.0).ok_or(SimError::UnknownVehicle(id))
    }

    pub fn results(&self) -> &ResultsAggregator {
        &self.results
    }

    /// Adds an intersection
    pub fn create_node(&mut self, lat: f64, long: f64) -> NodeId {
        self.network.create_node(lat, long)
    }

    /// Adds a one-way road
    pub fn create_edge(
        &mut self,
        source: NodeId,
        sink: NodeId,
        length: f64,
        free_flow_speed: f64,
    ) -> SimResult<EdgeId> {
        self.network.create_edge(source, sink, length, free_flow_speed)
    }

    /// Adds a road in each direction
    pub fn create_bidirectional_edge(
        &mut self,
        a: NodeId,
        b: NodeId,
        length: f64,
        free_flow_speed: f64,
    ) -> SimResult<(EdgeId, EdgeId)> {
        self.network
            .create_bidirectional_edge(a, b, length, free_flow_speed)
    }

    /// Registers a vehicle travelling from `start` to `end`
    pub fn create_vehicle(&mut self, start: NodeId, end: NodeId) -> SimResult<VehicleId> {
        for node in [start, end] {
            if !self.network.contains_node(node) {
                return Err(SimError::UnknownNode(node));
            }
        }

        let id = VehicleId(self.vehicles.len());
        let vehicle = Vehicle::new(id, start, end);
        self.results.register(&vehicle);
        self.vehicles.push(vehicle);
        Ok(id)
    }

    /// Runs the baseline pass: routes on free-flow times
    pub fn run_baseline(&mut self) -> SimResult<PassReport> {
        self.run_pass(CostMode::FreeFlow)
    }

    /// Runs the optimized pass: routes on live congested times
    pub fn run_optimized(&mut self) -> SimResult<PassReport> {
        self.run_pass(CostMode::Congested)
    }

    /// Runs both passes and compares them
    pub fn run_comparison(&mut self) -> SimResult<RunSummary> {
        self.run_baseline()?;
        self.run_optimized()?;
        Ok(self.summary())
    }

    pub fn summary(&self) -> RunSummary {
        self.results
            .summary(self.config.success_margin, self.config.failure_tolerance)
    }

    /// Runs one pass under `mode` until every vehicle has completed or been
    /// stranded. Road occupancy and vehicle state are reset first.
    pub fn run_pass(&mut self, mode: CostMode) -> SimResult<PassReport> {
        self.network.reset_occupancy();
        for vehicle in &mut self.vehicles {
            vehicle.reset();
        }

        info!(
            "Starting {} pass with {} vehicles",
            mode.label(),
            self.vehicles.len()
        );

        let dt = self.config.time_factor;
        let interval = self.config.deployment_interval.max(1);
        let total = self.vehicles.len();

        // Registration order; deployment pops from the back
        let mut waiting: Vec<usize> = (0..total).collect();
        let mut travelling: Vec<usize> = Vec::new();
        let mut finished = 0;
        let mut tick: u64 = 0;

        while finished < total {
            if self.config.max_ticks.is_some_and(|max| tick >= max) {
                warn!(
                    "{} pass hit the tick limit with {} vehicles unfinished",
                    mode.label(),
                    total - finished
                );
                let now = tick as f64 * dt;
                for index in travelling.drain(..).chain(waiting.drain(..)) {
                    self.vehicles[index].strand(&mut self.network, now)?;
                    self.results.record(mode, &self.vehicles[index]);
                }
                break;
            }

            let now = tick as f64 * dt;
            let end_of_tick = (tick + 1) as f64 * dt;

            if tick % interval == 0 {
                if let Some(&index) = waiting.last() {
                    match self.try_deploy(index, mode, now)? {
                        Deployment::Started => {
                            waiting.pop();
                            if self.vehicles[index].is_finished() {
                                self.results.record(mode, &self.vehicles[index]);
                                finished += 1;
                            } else {
                                travelling.push(index);
                            }
                        }
                        Deployment::Blocked => {
                            let vehicle = &mut self.vehicles[index];
                            vehicle.stall(interval);
                            if vehicle.stalled_ticks() > self.config.stall_budget {
                                warn!("{} stranded waiting to depart", vehicle.id);
                                vehicle.strand(&mut self.network, now)?;
                                self.results.record(mode, vehicle);
                                waiting.pop();
                                finished += 1;
                            }
                        }
                        Deployment::Impossible => {
                            let vehicle = &mut self.vehicles[index];
                            warn!(
                                "{} stranded: no road leads from {} to {}",
                                vehicle.id, vehicle.start, vehicle.end
                            );
                            vehicle.strand(&mut self.network, now)?;
                            self.results.record(mode, vehicle);
                            waiting.pop();
                            finished += 1;
                        }
                    }
                }
            }

            let mut still_travelling = Vec::with_capacity(travelling.len());
            for index in travelling.drain(..) {
                if self.advance_vehicle(index, mode, end_of_tick)? {
                    self.results.record(mode, &self.vehicles[index]);
                    finished += 1;
                } else {
                    still_travelling.push(index);
                }
            }
            travelling = still_travelling;

            tick += 1;
        }

        let stranded = self
            .vehicles
            .iter()
            .filter(|vehicle| vehicle.state() == VehicleState::Stranded)
            .count();
        let report = PassReport {
            mode,
            ticks: tick,
            elapsed: tick as f64 * dt,
            completed: total - stranded,
            stranded,
        };

        info!(
            "Finished {} pass after {} ticks: {} completed, {} stranded",
            mode.label(),
            report.ticks,
            report.completed,
            report.stranded
        );
        Ok(report)
    }

    fn try_deploy(&mut self, index: usize, mode: CostMode, now: f64) -> SimResult<Deployment> {
        let vehicle = &mut self.vehicles[index];
        if vehicle.start != vehicle.end && !self.network.is_connected(vehicle.start, vehicle.end) {
            return Ok(Deployment::Impossible);
        }

        let route = plan(&self.network, vehicle.start, vehicle.end, mode)?;
        match vehicle.begin_trip(route, &mut self.network, now) {
            Ok(()) => Ok(Deployment::Started),
            Err(SimError::Capacity { edge }) => {
                debug!("{} cannot enter {} yet", vehicle.id, edge);
                Ok(Deployment::Blocked)
            }
            Err(SimError::Unreachable { .. }) => {
                debug!("{} has no open route yet", vehicle.id);
                Ok(Deployment::Blocked)
            }
            Err(e) => Err(e),
        }
    }

    /// Moves one travelling vehicle forward by a tick, re-planning from its
    /// next node once it reaches the end of its road. Returns whether the
    /// vehicle finished.
    fn advance_vehicle(&mut self, index: usize, mode: CostMode, now: f64) -> SimResult<bool> {
        let vehicle = &mut self.vehicles[index];
        vehicle.tick(self.config.time_factor);
        if !vehicle.arrived(&self.network) {
            return Ok(false);
        }

        let route = plan(&self.network, vehicle.position(), vehicle.end, mode)?;
        match vehicle.advance(route, &mut self.network, now)? {
            AdvanceOutcome::Moved(_) => Ok(false),
            AdvanceOutcome::Completed => Ok(true),
            AdvanceOutcome::Stalled => {
                vehicle.stall(1);
                if vehicle.stalled_ticks() > self.config.stall_budget {
                    warn!("{} stranded at {}", vehicle.id, vehicle.position());
                    vehicle.strand(&mut self.network, now)?;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    /// Logs the size of the scenario
    pub fn log_summary(&self) {
        info!("Total intersections: {}", self.network.node_count());
        info!("Total roads: {}", self.network.road_count());
        info!("Total vehicles: {}", self.vehicles.len());
    }
}
