//! Occupancy-dependent cost model for a single road segment
//!
//! Every vehicle on a road shrinks the average spacing between vehicles,
//! which lowers the effective speed and raises the traversal time. These
//! derived values are what the congested planner reads, so admitting and
//! releasing vehicles here is how routing decisions feed back into later
//! routing decisions.

use super::config::SpacingModel;
use super::error::{SimError, SimResult};
use super::types::{CostMode, EdgeId, NodeId};

/// A directed road segment with static geometry and live occupancy state
///
/// Only the static fields are public. Occupancy and everything derived from
/// it change through [`Road::admit`], [`Road::release`] and [`Road::reset`],
/// which keep the derived fields consistent with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Road {
    pub id: EdgeId,
    pub source: NodeId,
    pub sink: NodeId,
    pub length: f64,
    pub free_flow_speed: f64,
    model: SpacingModel,
    min_time: f64,
    occupancy: u32,
    spacing: f64,
    effective_speed: f64,
    real_time: f64,
    congestion: f64,
    at_capacity: bool,
}

impl Road {
    /// Creates an empty road. `length` and `free_flow_speed` must be positive.
    pub fn new(
        id: EdgeId,
        source: NodeId,
        sink: NodeId,
        length: f64,
        free_flow_speed: f64,
        model: SpacingModel,
    ) -> Self {
        let min_time = length / free_flow_speed;
        let mut road = Self {
            id,
            source,
            sink,
            length,
            free_flow_speed,
            model,
            min_time,
            occupancy: 0,
            spacing: length,
            effective_speed: free_flow_speed,
            real_time: min_time,
            congestion: 1.0,
            at_capacity: false,
        };
        road.recompute();
        road
    }

    /// Free-flow traversal time
    pub fn min_time(&self) -> f64 {
        self.min_time
    }

    /// Number of vehicles currently on the road
    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    /// Average distance between vehicles; the full length when empty
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn effective_speed(&self) -> f64 {
        self.effective_speed
    }

    /// Traversal time at the current occupancy
    pub fn real_time(&self) -> f64 {
        self.real_time
    }

    /// `real_time / min_time`, never below 1
    pub fn congestion(&self) -> f64 {
        self.congestion
    }

    /// True when one more vehicle would push spacing to the critical threshold
    pub fn at_capacity(&self) -> bool {
        self.at_capacity
    }

    /// Edge weight under the given cost mode
    pub fn weight(&self, mode: CostMode) -> f64 {
        match mode {
            CostMode::FreeFlow => self.min_time,
            CostMode::Congested => self.real_time,
        }
    }

    /// Adds one vehicle to the road.
    ///
    /// Fails with [`SimError::Capacity`] when the extra vehicle would bring
    /// spacing to or below the critical threshold. A failed admission leaves
    /// occupancy untouched and the road flagged as at capacity.
    pub fn admit(&mut self) -> SimResult<()> {
        if self.at_capacity || self.spacing_with(self.occupancy + 1) <= self.model.critical_spacing {
            self.at_capacity = true;
            return Err(SimError::Capacity { edge: self.id });
        }

        self.occupancy += 1;
        self.recompute();
        Ok(())
    }

    /// Removes one vehicle from the road.
    pub fn release(&mut self) -> SimResult<()> {
        if self.occupancy == 0 {
            return Err(SimError::NotOccupied { edge: self.id });
        }

        self.occupancy -= 1;
        self.recompute();
        Ok(())
    }

    /// Empties the road and restores free-flow values
    pub fn reset(&mut self) {
        self.occupancy = 0;
        self.recompute();
    }

    /// Spacing the road would have with `occupancy` vehicles on it
    fn spacing_with(&self, occupancy: u32) -> f64 {
        if occupancy == 0 {
            return self.length;
        }
        let occupied = f64::from(occupancy);
        (self.length - self.model.unit_vehicle_length * occupied) / occupied
    }

    fn recompute(&mut self) {
        self.spacing = self.spacing_with(self.occupancy);

        // An empty road is free-flowing regardless of how short it is
        self.effective_speed = if self.occupancy == 0 || self.spacing > self.model.free_flow_spacing {
            self.free_flow_speed
        } else {
            self.free_flow_speed * (1.0 - 1.0 / self.spacing)
        };

        self.real_time = if self.effective_speed == self.free_flow_speed {
            self.min_time
        } else {
            self.length / self.effective_speed
        };
        self.congestion = self.real_time / self.min_time;
        self.at_capacity = self.spacing_with(self.occupancy + 1) <= self.model.critical_spacing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::UNIT_VEHICLE_LENGTH;

    fn road(length: f64, speed: f64) -> Road {
        Road::new(
            EdgeId(0),
            NodeId(0),
            NodeId(1),
            length,
            speed,
            SpacingModel::default(),
        )
    }

    #[test]
    fn empty_road_is_free_flowing() {
        let road = road(50.0, 100.0);
        assert_eq!(road.occupancy(), 0);
        assert_eq!(road.min_time(), 0.5);
        assert_eq!(road.real_time(), road.min_time());
        assert_eq!(road.congestion(), 1.0);
        assert_eq!(road.spacing(), 50.0);
        assert!(!road.at_capacity());
    }

    #[test]
    fn short_empty_road_is_still_free_flowing() {
        // Spacing of an empty 8-unit road is below the free-flow threshold
        let road = road(8.0, 10.0);
        assert_eq!(road.effective_speed(), 10.0);
        assert_eq!(road.congestion(), 1.0);
    }

    #[test]
    fn light_traffic_keeps_free_flow_speed() {
        let mut road = road(5000.0, 100.0);
        road.admit().unwrap();
        assert_eq!(road.occupancy(), 1);
        assert_eq!(road.spacing(), 4995.0);
        assert_eq!(road.real_time(), road.min_time());
        assert_eq!(road.congestion(), 1.0);
    }

    #[test]
    fn dense_traffic_slows_the_road() {
        // 10 vehicles on 100 units: spacing (100 - 50) / 10 = 5
        let mut road = road(100.0, 100.0);
        for _ in 0..10 {
            road.admit().unwrap();
        }
        assert_eq!(road.spacing(), 5.0);
        assert!((road.effective_speed() - 80.0).abs() < 1e-9);
        assert!((road.real_time() - 1.25).abs() < 1e-9);
        assert!((road.congestion() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn congestion_never_drops_below_one() {
        let mut road = road(300.0, 60.0);
        while road.admit().is_ok() {
            assert!(road.congestion() >= 1.0);
            assert!(road.real_time() >= road.min_time());
        }
    }

    #[test]
    fn admission_stops_at_capacity_without_mutation() {
        let mut road = road(100.0, 100.0);
        let mut admitted = 0;
        while road.admit().is_ok() {
            admitted += 1;
            assert!(admitted <= 100, "road never filled up");
        }

        // (100 - 5n) / n > 1 holds up to n = 16
        assert_eq!(admitted, 16);
        assert!(road.at_capacity());
        assert!(road.spacing() > 1.0);

        let before = road.clone();
        assert_eq!(road.admit(), Err(SimError::Capacity { edge: EdgeId(0) }));
        assert_eq!(road, before);
    }

    #[test]
    fn occupancy_stays_below_geometric_limit() {
        let mut road = road(100.0, 100.0);
        for _ in 0..1000 {
            let _ = road.admit();
        }
        assert!(road.at_capacity());
        assert!(f64::from(road.occupancy()) <= 100.0 / UNIT_VEHICLE_LENGTH);
    }

    #[test]
    fn release_clears_capacity_flag() {
        let mut road = road(100.0, 100.0);
        while road.admit().is_ok() {}
        assert!(road.at_capacity());

        road.release().unwrap();
        assert!(!road.at_capacity());
        road.admit().unwrap();
        assert!(road.at_capacity());
    }

    #[test]
    fn admit_then_release_restores_empty_state() {
        let mut road = road(60.0, 30.0);
        let empty = road.clone();
        road.admit().unwrap();
        road.admit().unwrap();
        road.release().unwrap();
        road.release().unwrap();
        assert_eq!(road, empty);
    }

    #[test]
    fn release_on_empty_road_is_guarded() {
        let mut road = road(60.0, 30.0);
        assert_eq!(road.release(), Err(SimError::NotOccupied { edge: EdgeId(0) }));
        assert_eq!(road.occupancy(), 0);
    }

    #[test]
    fn reset_empties_road() {
        let mut road = road(100.0, 100.0);
        while road.admit().is_ok() {}
        road.reset();
        assert_eq!(road.occupancy(), 0);
        assert_eq!(road.congestion(), 1.0);
        assert!(!road.at_capacity());
    }

    #[test]
    fn weight_follows_cost_mode() {
        let mut road = road(100.0, 100.0);
        for _ in 0..10 {
            road.admit().unwrap();
        }
        assert_eq!(road.weight(CostMode::FreeFlow), 1.0);
        assert!((road.weight(CostMode::Congested) - 1.25).abs() < 1e-9);
    }
}
