//! Orchestrator - main simulation loop
//!
//! Drives the event clock and routes every resumption to the stages and
//! the coordinator.
//!
//! See `engine.rs` for full implementation.

pub mod engine;

// Re-export main types for convenience
pub use engine::{
    InspectStageConfig, MachineStageConfig, Orchestrator, ProcessorReport, SimulationConfig,
    SimulationError, SimulationSummary,
};
