//! Congestion Simulation Library
//!
//! Compares static and congestion-aware routing of vehicles over a road
//! network, headless and deterministic.

pub mod simulation;
