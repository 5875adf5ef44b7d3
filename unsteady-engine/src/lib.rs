mod checkpoint;
mod engine;
mod error;
mod lifecycle;
mod solution_history;

#[cfg(test)]
mod test_utils;

pub use checkpoint::{CheckpointError, MESH_TAG, solution_tag, time_tag};
pub use engine::SimulationEngine;
pub use error::EngineError;
pub use lifecycle::{SolverLifecycle, SolverStatus};
pub use solution_history::SolutionHistory;
