//! Vehicle progress through a planned route
//!
//! A vehicle never holds a reference into the network. Its progress is an
//! index into its own node and road sequences plus a state tag, and every
//! occupancy change goes through the [`RoadNetwork`].

use log::debug;

use super::error::{SimError, SimResult};
use super::planner::Route;
use super::road_network::RoadNetwork;
use super::types::{EdgeId, NodeId, VehicleId};

/// Lifecycle of a vehicle within one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    /// Registered, no route yet
    Waiting,
    /// Occupying a road on its route
    Travelling,
    /// Reached its destination
    Completed,
    /// Gave up after being blocked for too long
    Stranded,
}

/// Result of trying to leave the current road
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved onto the given road
    Moved(EdgeId),
    /// Reached the destination
    Completed,
    /// Could not move on; still occupying the current road
    Stalled,
}

/// A vehicle in the simulation
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub start: NodeId,
    pub end: NodeId,
    state: VehicleState,
    /// Nodes driven through so far followed by the planned remainder
    nodes: Vec<NodeId>,
    /// Roads driven so far followed by the planned remainder
    edges: Vec<EdgeId>,
    edge_index: usize,
    time_on_edge: f64,
    travel_times: Vec<f64>,
    expected_time: f64,
    deployed_at: Option<f64>,
    finished_at: Option<f64>,
    stalled_ticks: u64,
}

impl Vehicle {
    pub fn new(id: VehicleId, start: NodeId, end: NodeId) -> Self {
        Self {
            id,
            start,
            end,
            state: VehicleState::Waiting,
            nodes: Vec::new(),
            edges: Vec::new(),
            edge_index: 0,
            time_on_edge: 0.0,
            travel_times: Vec::new(),
            expected_time: 0.0,
            deployed_at: None,
            finished_at: None,
            stalled_ticks: 0,
        }
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// True once the vehicle has completed or been stranded
    pub fn is_finished(&self) -> bool {
        matches!(self.state, VehicleState::Completed | VehicleState::Stranded)
    }

    /// The road currently occupied, if travelling
    pub fn current_edge(&self) -> Option<EdgeId> {
        match self.state {
            VehicleState::Travelling => self.edges.get(self.edge_index).copied(),
            _ => None,
        }
    }

    /// The node the vehicle is at or heading to
    pub fn position(&self) -> NodeId {
        match self.state {
            VehicleState::Waiting => self.start,
            VehicleState::Travelling => self.nodes[self.edge_index + 1],
            VehicleState::Completed => self.end,
            VehicleState::Stranded => self.nodes.get(self.edge_index).copied().unwrap_or(self.start),
        }
    }

    /// Index of the current road within the route
    pub fn edge_index(&self) -> usize {
        self.edge_index
    }

    pub fn time_on_edge(&self) -> f64 {
        self.time_on_edge
    }

    /// Time spent on each road left so far, in driving order
    pub fn travel_times(&self) -> &[f64] {
        &self.travel_times
    }

    /// Total time spent on roads left so far
    pub fn actual_time(&self) -> f64 {
        self.travel_times.iter().sum()
    }

    /// Route cost estimated when the trip began
    pub fn expected_time(&self) -> f64 {
        self.expected_time
    }

    pub fn deployed_at(&self) -> Option<f64> {
        self.deployed_at
    }

    pub fn finished_at(&self) -> Option<f64> {
        self.finished_at
    }

    /// Roads fully driven so far
    pub fn traversed(&self) -> &[EdgeId] {
        &self.edges[..self.edge_index.min(self.edges.len())]
    }

    /// Nodes driven through plus the planned remainder
    pub fn route_nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Consecutive ticks spent blocked
    pub fn stalled_ticks(&self) -> u64 {
        self.stalled_ticks
    }

    pub fn stall(&mut self, ticks: u64) {
        self.stalled_ticks += ticks;
    }

    /// Starts the trip on the first road of `route`.
    ///
    /// On [`SimError::Capacity`] or [`SimError::Unreachable`] the vehicle
    /// stays waiting and may try again later.
    pub fn begin_trip(
        &mut self,
        route: Route,
        network: &mut RoadNetwork,
        now: f64,
    ) -> SimResult<()> {
        if !route.is_reachable() {
            return Err(SimError::Unreachable {
                from: self.start,
                to: self.end,
            });
        }

        if let Some(first) = route.edges.first() {
            network.admit(*first)?;
        }

        self.expected_time = route.cost;
        self.deployed_at = Some(now);
        self.stalled_ticks = 0;
        self.time_on_edge = 0.0;
        self.edge_index = 0;
        self.nodes = route.nodes;
        self.edges = route.edges;

        if self.edges.is_empty() {
            self.state = VehicleState::Completed;
            self.finished_at = Some(now);
            debug!("{} starts at its destination", self.id);
        } else {
            self.state = VehicleState::Travelling;
            debug!("{} deployed onto {} at t={}", self.id, self.edges[0], now);
        }
        Ok(())
    }

    /// Accumulates time on the current road
    pub fn tick(&mut self, dt: f64) {
        if self.state == VehicleState::Travelling {
            self.time_on_edge += dt;
        }
    }

    /// Whether enough time has passed to reach the end of the current road,
    /// judged by the road's live traversal time
    pub fn arrived(&self, network: &RoadNetwork) -> bool {
        self.current_edge()
            .and_then(|edge| network.road(edge))
            .is_some_and(|road| self.time_on_edge >= road.real_time())
    }

    /// Leaves the current road following `plan`, a fresh route from
    /// [`Vehicle::position`] to the destination.
    ///
    /// A plan without roads finishes the trip. Otherwise the vehicle enters
    /// the first road of the plan before releasing its current one, so a
    /// full road or a missing route leaves it where it is.
    pub fn advance(
        &mut self,
        plan: Route,
        network: &mut RoadNetwork,
        now: f64,
    ) -> SimResult<AdvanceOutcome> {
        let Some(current) = self.current_edge() else {
            return Ok(AdvanceOutcome::Stalled);
        };

        if !plan.is_reachable() {
            return Ok(AdvanceOutcome::Stalled);
        }

        let Some(next) = plan.edges.first().copied() else {
            network.release(current)?;
            self.leave_edge();
            self.state = VehicleState::Completed;
            self.finished_at = Some(now);
            debug!("{} completed at t={}", self.id, now);
            return Ok(AdvanceOutcome::Completed);
        };

        match network.admit(next) {
            Ok(()) => {}
            Err(SimError::Capacity { .. }) => return Ok(AdvanceOutcome::Stalled),
            Err(e) => return Err(e),
        }
        network.release(current)?;
        self.leave_edge();

        // Keep the driven prefix and swap in the new remainder
        self.edges.truncate(self.edge_index);
        self.edges.extend(plan.edges);
        self.nodes.truncate(self.edge_index);
        self.nodes.extend(plan.nodes);
        self.stalled_ticks = 0;

        debug!("{} moved onto {} at t={}", self.id, next, now);
        Ok(AdvanceOutcome::Moved(next))
    }

    /// Gives up on the trip, freeing any road still occupied
    pub fn strand(&mut self, network: &mut RoadNetwork, now: f64) -> SimResult<()> {
        if let Some(current) = self.current_edge() {
            network.release(current)?;
        }
        self.state = VehicleState::Stranded;
        self.finished_at = Some(now);
        Ok(())
    }

    /// Returns to the waiting state, dropping everything from the last pass
    pub fn reset(&mut self) {
        *self = Self::new(self.id, self.start, self.end);
    }

    fn leave_edge(&mut self) {
        self.travel_times.push(self.time_on_edge);
        self.time_on_edge = 0.0;
        self.edge_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::SpacingModel;
    use crate::simulation::planner::plan;
    use crate::simulation::types::CostMode;

    struct Line {
        net: RoadNetwork,
        nodes: Vec<NodeId>,
        edges: Vec<EdgeId>,
    }

    /// n0 -> n1 -> n2, 100 units at speed 10 each
    fn line() -> Line {
        let mut net = RoadNetwork::new(SpacingModel::default());
        let nodes: Vec<NodeId> = (0..3).map(|_| net.create_node(0.0, 0.0)).collect();
        let edges = vec![
            net.create_edge(nodes[0], nodes[1], 100.0, 10.0).unwrap(),
            net.create_edge(nodes[1], nodes[2], 100.0, 10.0).unwrap(),
        ];
        Line { net, nodes, edges }
    }

    fn replan(vehicle: &Vehicle, net: &RoadNetwork) -> Route {
        plan(net, vehicle.position(), vehicle.end, CostMode::FreeFlow).unwrap()
    }

    #[test]
    fn begin_trip_occupies_first_road() {
        let Line { mut net, nodes, edges } = line();
        let mut vehicle = Vehicle::new(VehicleId(0), nodes[0], nodes[2]);
        let route = plan(&net, nodes[0], nodes[2], CostMode::FreeFlow).unwrap();

        vehicle.begin_trip(route, &mut net, 30.0).unwrap();
        assert_eq!(vehicle.state(), VehicleState::Travelling);
        assert_eq!(vehicle.current_edge(), Some(edges[0]));
        assert_eq!(vehicle.position(), nodes[1]);
        assert_eq!(vehicle.expected_time(), 20.0);
        assert_eq!(vehicle.deployed_at(), Some(30.0));
        assert_eq!(net.road(edges[0]).unwrap().occupancy(), 1);
    }

    #[test]
    fn full_first_road_keeps_vehicle_waiting() {
        let Line { mut net, nodes, edges } = line();
        let route = plan(&net, nodes[0], nodes[2], CostMode::FreeFlow).unwrap();
        while net.admit(edges[0]).is_ok() {}
        let occupancy = net.road(edges[0]).unwrap().occupancy();

        let mut vehicle = Vehicle::new(VehicleId(0), nodes[0], nodes[2]);
        assert_eq!(
            vehicle.begin_trip(route, &mut net, 0.0),
            Err(SimError::Capacity { edge: edges[0] })
        );
        assert_eq!(vehicle.state(), VehicleState::Waiting);
        assert_eq!(vehicle.deployed_at(), None);
        assert_eq!(net.road(edges[0]).unwrap().occupancy(), occupancy);
    }

    #[test]
    fn unreachable_route_keeps_vehicle_waiting() {
        let Line { mut net, nodes, .. } = line();
        let mut vehicle = Vehicle::new(VehicleId(0), nodes[2], nodes[0]);
        assert_eq!(
            vehicle.begin_trip(Route::unreachable(), &mut net, 0.0),
            Err(SimError::Unreachable {
                from: nodes[2],
                to: nodes[0]
            })
        );
        assert_eq!(vehicle.state(), VehicleState::Waiting);
    }

    #[test]
    fn trip_to_own_start_completes_at_once() {
        let Line { mut net, nodes, .. } = line();
        let mut vehicle = Vehicle::new(VehicleId(0), nodes[1], nodes[1]);
        let route = replan(&vehicle, &net);
        vehicle.begin_trip(route, &mut net, 5.0).unwrap();
        assert_eq!(vehicle.state(), VehicleState::Completed);
        assert_eq!(vehicle.finished_at(), Some(5.0));
        assert_eq!(net.total_occupancy(), 0);
    }

    #[test]
    fn drives_to_destination() {
        let Line { mut net, nodes, edges } = line();
        let mut vehicle = Vehicle::new(VehicleId(0), nodes[0], nodes[2]);
        let route = replan(&vehicle, &net);
        vehicle.begin_trip(route, &mut net, 0.0).unwrap();

        let mut now = 0.0;
        while !vehicle.arrived(&net) {
            vehicle.tick(1.0);
            now += 1.0;
        }
        assert_eq!(now, 10.0);

        let outcome = vehicle.advance(replan(&vehicle, &net), &mut net, now).unwrap();
        assert_eq!(outcome, AdvanceOutcome::Moved(edges[1]));
        assert_eq!(net.road(edges[0]).unwrap().occupancy(), 0);
        assert_eq!(net.road(edges[1]).unwrap().occupancy(), 1);
        assert_eq!(vehicle.edge_index(), 1);
        assert_eq!(vehicle.travel_times(), &[10.0]);

        while !vehicle.arrived(&net) {
            vehicle.tick(1.0);
            now += 1.0;
        }
        let outcome = vehicle.advance(replan(&vehicle, &net), &mut net, now).unwrap();
        assert_eq!(outcome, AdvanceOutcome::Completed);
        assert_eq!(vehicle.state(), VehicleState::Completed);
        assert_eq!(vehicle.finished_at(), Some(20.0));
        assert_eq!(vehicle.actual_time(), 20.0);
        assert_eq!(vehicle.traversed(), edges.as_slice());
        assert_eq!(vehicle.route_nodes(), nodes.as_slice());
        assert_eq!(net.total_occupancy(), 0);
    }

    #[test]
    fn full_next_road_stalls_in_place() {
        let Line { mut net, nodes, edges } = line();
        let mut vehicle = Vehicle::new(VehicleId(0), nodes[0], nodes[2]);
        let route = replan(&vehicle, &net);
        vehicle.begin_trip(route, &mut net, 0.0).unwrap();
        for _ in 0..10 {
            vehicle.tick(1.0);
        }

        // Plan first, then fill the next road behind the planner's back
        let stale = replan(&vehicle, &net);
        while net.admit(edges[1]).is_ok() {}

        let outcome = vehicle.advance(stale, &mut net, 10.0).unwrap();
        assert_eq!(outcome, AdvanceOutcome::Stalled);
        assert_eq!(vehicle.current_edge(), Some(edges[0]));
        assert_eq!(net.road(edges[0]).unwrap().occupancy(), 1);
        assert!(vehicle.travel_times().is_empty());

        // With the road full the planner finds nothing either
        let fresh = replan(&vehicle, &net);
        assert!(!fresh.is_reachable());
        assert_eq!(
            vehicle.advance(fresh, &mut net, 11.0).unwrap(),
            AdvanceOutcome::Stalled
        );

        net.release(edges[1]).unwrap();
        vehicle.tick(1.0);
        let outcome = vehicle.advance(replan(&vehicle, &net), &mut net, 11.0).unwrap();
        assert_eq!(outcome, AdvanceOutcome::Moved(edges[1]));
        assert_eq!(vehicle.travel_times(), &[11.0]);
    }

    #[test]
    fn replan_at_node_replaces_rest_of_route() {
        let mut net = RoadNetwork::new(SpacingModel::default());
        let a = net.create_node(0.0, 0.0);
        let b = net.create_node(0.0, 0.0);
        let c = net.create_node(0.0, 0.0);
        let d = net.create_node(0.0, 0.0);
        let ab = net.create_edge(a, b, 100.0, 10.0).unwrap();
        let bd = net.create_edge(b, d, 30.0, 10.0).unwrap();
        let bc = net.create_edge(b, c, 40.0, 10.0).unwrap();
        net.create_edge(c, d, 40.0, 10.0).unwrap();

        let mut vehicle = Vehicle::new(VehicleId(0), a, d);
        let route = plan(&net, a, d, CostMode::Congested).unwrap();
        assert_eq!(route.edges, vec![ab, bd]);
        vehicle.begin_trip(route, &mut net, 0.0).unwrap();
        for _ in 0..10 {
            vehicle.tick(1.0);
        }
        assert!(vehicle.arrived(&net));

        while net.admit(bd).is_ok() {}
        let fresh = plan(&net, vehicle.position(), d, CostMode::Congested).unwrap();
        let outcome = vehicle.advance(fresh, &mut net, 10.0).unwrap();

        assert_eq!(outcome, AdvanceOutcome::Moved(bc));
        assert_eq!(vehicle.route_nodes(), &[a, b, c, d]);
        assert_eq!(vehicle.traversed(), &[ab]);
        assert_eq!(vehicle.current_edge(), Some(bc));
        assert_eq!(vehicle.position(), c);
        assert_eq!(net.road(ab).unwrap().occupancy(), 0);
        assert_eq!(net.road(bc).unwrap().occupancy(), 1);
    }

    #[test]
    fn strand_frees_current_road() {
        let Line { mut net, nodes, edges } = line();
        let mut vehicle = Vehicle::new(VehicleId(0), nodes[0], nodes[2]);
        let route = replan(&vehicle, &net);
        vehicle.begin_trip(route, &mut net, 0.0).unwrap();

        vehicle.strand(&mut net, 4.0).unwrap();
        assert_eq!(vehicle.state(), VehicleState::Stranded);
        assert!(vehicle.is_finished());
        assert_eq!(vehicle.current_edge(), None);
        assert_eq!(net.road(edges[0]).unwrap().occupancy(), 0);
    }

    #[test]
    fn reset_returns_to_waiting() {
        let Line { mut net, nodes, .. } = line();
        let mut vehicle = Vehicle::new(VehicleId(3), nodes[0], nodes[2]);
        let route = replan(&vehicle, &net);
        vehicle.begin_trip(route, &mut net, 0.0).unwrap();
        vehicle.stall(7);

        vehicle.reset();
        assert_eq!(vehicle.state(), VehicleState::Waiting);
        assert_eq!(vehicle.id, VehicleId(3));
        assert_eq!(vehicle.stalled_ticks(), 0);
        assert_eq!(vehicle.deployed_at(), None);
        assert!(vehicle.traversed().is_empty());
    }
}
