//! Seeded grid scenarios for headless runs

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::config::SimConfig;
use super::engine::SimEngine;
use super::error::SimResult;
use super::types::NodeId;

/// Free-flow speeds roads are drawn from
const ROAD_SPEEDS: [f64; 3] = [30.0, 50.0, 80.0];

/// Degrees between neighbouring intersections
const GRID_SPACING_DEGREES: f64 = 0.01;

/// A rectangular street grid with randomly placed trips
#[derive(Debug, Clone, PartialEq)]
pub struct GridScenario {
    pub rows: usize,
    pub cols: usize,
    pub vehicles: usize,
    /// Average block length; actual roads vary by ±50%
    pub block_length: f64,
    pub seed: u64,
}

impl Default for GridScenario {
    fn default() -> Self {
        Self {
            rows: 4,
            cols: 4,
            vehicles: 40,
            block_length: 200.0,
            seed: 42,
        }
    }
}

impl GridScenario {
    /// Builds the grid and registers the vehicles.
    ///
    /// Every intersection is joined to its right and lower neighbour in both
    /// directions. Each vehicle gets distinct start and end intersections
    /// when the grid has more than one.
    pub fn build(&self, config: SimConfig) -> SimResult<SimEngine> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut engine = SimEngine::new(config);

        let mut nodes: Vec<NodeId> = Vec::with_capacity(self.rows * self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                nodes.push(engine.create_node(
                    row as f64 * GRID_SPACING_DEGREES,
                    col as f64 * GRID_SPACING_DEGREES,
                ));
            }
        }

        for row in 0..self.rows {
            for col in 0..self.cols {
                let here = nodes[row * self.cols + col];
                if col + 1 < self.cols {
                    let right = nodes[row * self.cols + col + 1];
                    self.add_road(&mut engine, &mut rng, here, right)?;
                }
                if row + 1 < self.rows {
                    let below = nodes[(row + 1) * self.cols + col];
                    self.add_road(&mut engine, &mut rng, here, below)?;
                }
            }
        }

        if !nodes.is_empty() {
            for _ in 0..self.vehicles {
                let start = nodes[rng.random_range(0..nodes.len())];
                let end = loop {
                    let candidate = nodes[rng.random_range(0..nodes.len())];
                    if candidate != start || nodes.len() == 1 {
                        break candidate;
                    }
                };
                engine.create_vehicle(start, end)?;
            }
        }

        Ok(engine)
    }

    fn add_road(
        &self,
        engine: &mut SimEngine,
        rng: &mut StdRng,
        a: NodeId,
        b: NodeId,
    ) -> SimResult<()> {
        let length = self.block_length * rng.random_range(0.5..1.5);
        let speed = *ROAD_SPEEDS.choose(rng).unwrap_or(&ROAD_SPEEDS[0]);
        engine.create_bidirectional_edge(a, b, length, speed)?;
        Ok(())
    }
}
