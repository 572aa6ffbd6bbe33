//! Shortest-path planning over the live road network
//!
//! Dijkstra from a single source with early exit at the target. Roads at
//! capacity are skipped as if their weight were infinite, which is how full
//! roads are kept out of new routes without touching the graph.
//!
//! Ties are resolved deterministically: among equally distant frontier
//! nodes the one reached first is expanded first, outgoing roads are relaxed
//! in creation order, and a predecessor is only replaced by a strictly
//! shorter alternative.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::edge::Road;
use super::error::{SimError, SimResult};
use super::road_network::RoadNetwork;
use super::types::{CostMode, EdgeId, NodeId};

/// Selects the weight the planner reads from each road
pub trait EdgeWeight {
    fn weight(&self, road: &Road) -> f64;
}

impl EdgeWeight for CostMode {
    fn weight(&self, road: &Road) -> f64 {
        road.weight(*self)
    }
}

/// A planned route: total cost plus the nodes and roads in traversal order
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub cost: f64,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

impl Route {
    /// The "no route" result: infinite cost, no nodes, no roads
    pub fn unreachable() -> Self {
        Self {
            cost: f64::INFINITY,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    fn trivial(node: NodeId) -> Self {
        Self {
            cost: 0.0,
            nodes: vec![node],
            edges: Vec::new(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.cost.is_finite()
    }

    /// True for a reachable route that needs no driving
    pub fn is_trivial(&self) -> bool {
        self.is_reachable() && self.edges.is_empty()
    }

    /// Turns the unreachable sentinel into [`SimError::Unreachable`]
    pub fn require(self, from: NodeId, to: NodeId) -> SimResult<Self> {
        if self.is_reachable() {
            Ok(self)
        } else {
            Err(SimError::Unreachable { from, to })
        }
    }
}

/// Plans the cheapest route from `source` to `target` under `weight`.
///
/// An unreachable target is not an error: it yields [`Route::unreachable`].
/// Only unknown node IDs fail.
pub fn plan<W: EdgeWeight>(
    network: &RoadNetwork,
    source: NodeId,
    target: NodeId,
    weight: W,
) -> SimResult<Route> {
    for node in [source, target] {
        if !network.contains_node(node) {
            return Err(SimError::UnknownNode(node));
        }
    }

    if source == target {
        return Ok(Route::trivial(source));
    }

    let node_count = network.node_count();
    let mut distance = vec![f64::INFINITY; node_count];
    let mut previous: Vec<Option<NodeId>> = vec![None; node_count];
    let mut visited = vec![false; node_count];

    // Min-heap on (distance, push order); push order breaks distance ties
    let mut frontier: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, NodeId)>> = BinaryHeap::new();
    let mut pushed: u64 = 0;

    distance[source.0] = 0.0;
    frontier.push(Reverse((OrderedFloat(0.0), pushed, source)));

    while let Some(Reverse((OrderedFloat(cost), _, node))) = frontier.pop() {
        if visited[node.0] {
            continue;
        }
        visited[node.0] = true;

        if node == target {
            break;
        }

        for road in network.outgoing(node) {
            if road.at_capacity() || visited[road.sink.0] {
                continue;
            }

            let candidate = cost + weight.weight(road);
            if candidate < distance[road.sink.0] {
                distance[road.sink.0] = candidate;
                previous[road.sink.0] = Some(node);
                pushed += 1;
                frontier.push(Reverse((OrderedFloat(candidate), pushed, road.sink)));
            }
        }
    }

    if !distance[target.0].is_finite() {
        return Ok(Route::unreachable());
    }

    reconstruct(network, &previous, source, target, distance[target.0])
}

fn reconstruct(
    network: &RoadNetwork,
    previous: &[Option<NodeId>],
    source: NodeId,
    target: NodeId,
    cost: f64,
) -> SimResult<Route> {
    let mut nodes = vec![target];
    let mut current = target;
    while current != source {
        current = previous[current.0].ok_or(SimError::Unreachable {
            from: source,
            to: target,
        })?;
        nodes.push(current);
    }
    nodes.reverse();

    let edges = nodes
        .windows(2)
        .map(|pair| {
            network
                .edge_between(pair[0], pair[1])
                .ok_or(SimError::Unreachable {
                    from: pair[0],
                    to: pair[1],
                })
        })
        .collect::<SimResult<Vec<EdgeId>>>()?;

    Ok(Route { cost, nodes, edges })
}
