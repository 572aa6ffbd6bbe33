//! Road network graph
//!
//! The network is the sole owner of intersections and roads. Planner and
//! engine read it freely, but road occupancy only changes through
//! [`RoadNetwork::admit`], [`RoadNetwork::release`] and
//! [`RoadNetwork::reset_occupancy`].

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};

use super::config::SpacingModel;
use super::edge::Road;
use super::error::{SimError, SimResult};
use super::types::{Coordinates, EdgeId, NodeId};

/// An intersection in the network
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    pub id: NodeId,
    pub position: Coordinates,
}

/// Directed road graph backed by a petgraph arena
///
/// Nodes and edges are never removed, so petgraph indices are stable and
/// equal to the creation order exposed through [`NodeId`] and [`EdgeId`].
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    graph: DiGraph<Intersection, Road>,
    model: SpacingModel,
}

impl RoadNetwork {
    pub fn new(model: SpacingModel) -> Self {
        Self {
            graph: DiGraph::new(),
            model,
        }
    }

    /// Adds an intersection and returns its ID
    pub fn create_node(&mut self, lat: f64, long: f64) -> NodeId {
        let id = NodeId(self.graph.node_count());
        self.graph.add_node(Intersection {
            id,
            position: Coordinates::new(lat, long),
        });
        id
    }

    /// Adds a one-way road from `source` to `sink`
    pub fn create_edge(
        &mut self,
        source: NodeId,
        sink: NodeId,
        length: f64,
        free_flow_speed: f64,
    ) -> SimResult<EdgeId> {
        let from = self.node_index(source)?;
        let to = self.node_index(sink)?;

        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(length) || !positive(free_flow_speed) {
            return Err(SimError::InvalidEdge {
                length,
                speed: free_flow_speed,
            });
        }

        if self.graph.find_edge(from, to).is_some() {
            return Err(SimError::DuplicateEdge {
                from: source,
                to: sink,
            });
        }

        let id = EdgeId(self.graph.edge_count());
        let road = Road::new(id, source, sink, length, free_flow_speed, self.model);
        self.graph.add_edge(from, to, road);
        Ok(id)
    }

    /// Adds a road in each direction between `a` and `b`
    ///
    /// Either both directions are created or neither is.
    pub fn create_bidirectional_edge(
        &mut self,
        a: NodeId,
        b: NodeId,
        length: f64,
        free_flow_speed: f64,
    ) -> SimResult<(EdgeId, EdgeId)> {
        if self.edge_between(b, a).is_some() {
            return Err(SimError::DuplicateEdge { from: b, to: a });
        }
        let forward = self.create_edge(a, b, length, free_flow_speed)?;
        let backward = self.create_edge(b, a, length, free_flow_speed)?;
        Ok((forward, backward))
    }

    pub fn node(&self, id: NodeId) -> Option<&Intersection> {
        self.graph.node_weight(NodeIndex::new(id.0))
    }

    pub fn road(&self, id: EdgeId) -> Option<&Road> {
        self.graph.edge_weight(EdgeIndex::new(id.0))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.0 < self.graph.node_count()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn road_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All roads in creation order
    pub fn roads(&self) -> impl Iterator<Item = &Road> {
        self.graph.edge_weights()
    }

    /// Roads leaving `id`, in creation order
    pub fn outgoing(&self, id: NodeId) -> Vec<&Road> {
        if !self.contains_node(id) {
            return Vec::new();
        }
        // petgraph walks adjacency newest first
        let mut roads: Vec<&Road> = self
            .graph
            .edges(NodeIndex::new(id.0))
            .map(|edge| edge.weight())
            .collect();
        roads.sort_by_key(|road| road.id);
        roads
    }

    /// The road from `source` to `sink`, if the pair is connected
    pub fn edge_between(&self, source: NodeId, sink: NodeId) -> Option<EdgeId> {
        if !self.contains_node(source) || !self.contains_node(sink) {
            return None;
        }
        self.graph
            .find_edge(NodeIndex::new(source.0), NodeIndex::new(sink.0))
            .map(|edge| EdgeId(edge.index()))
    }

    /// Whether any path joins the two nodes, ignoring occupancy
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        if !self.contains_node(from) || !self.contains_node(to) {
            return false;
        }
        has_path_connecting(&self.graph, NodeIndex::new(from.0), NodeIndex::new(to.0), None)
    }

    /// Puts one vehicle on a road
    pub fn admit(&mut self, id: EdgeId) -> SimResult<()> {
        self.road_mut(id)?.admit()
    }

    /// Takes one vehicle off a road
    pub fn release(&mut self, id: EdgeId) -> SimResult<()> {
        self.road_mut(id)?.release()
    }

    /// Empties every road
    pub fn reset_occupancy(&mut self) {
        for road in self.graph.edge_weights_mut() {
            road.reset();
        }
    }

    /// Number of vehicles currently on any road
    pub fn total_occupancy(&self) -> u64 {
        self.roads().map(|road| u64::from(road.occupancy())).sum()
    }

    fn road_mut(&mut self, id: EdgeId) -> SimResult<&mut Road> {
        self.graph
            .edge_weight_mut(EdgeIndex::new(id.0))
            .ok_or(SimError::UnknownEdge(id))
    }

    fn node_index(&self, id: NodeId) -> SimResult<NodeIndex> {
        if self.contains_node(id) {
            Ok(NodeIndex::new(id.0))
        } else {
            Err(SimError::UnknownNode(id))
        }
    }
}
