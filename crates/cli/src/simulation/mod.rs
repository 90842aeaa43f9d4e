//! Simulated consumer run.

mod runner;
mod stats;

pub use runner::{Simulation, SimulationConfig};
pub use stats::SimulationStats;
