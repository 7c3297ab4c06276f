//! Factory Simulator Core - Rust Engine
//!
//! Discrete-event simulator of a Build → Wash → Dry → Inspect plant with
//! deterministic execution.
//!
//! # Architecture
//!
//! - **core**: Event clock (time + schedule of pending resumptions)
//! - **models**: Domain types (Order, Patient, Item, Job, Processor, State)
//! - **policy**: Dispatch, rework placement and job splitting rules
//! - **process**: Generic stage engine and per-stage transition hooks
//! - **coordinator**: Order intake, defect batching, order completion
//! - **arrivals**: Periodic order generation
//! - **orchestrator**: Main simulation loop
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (seeded RNG, drawn in event order)
//! 2. Time never moves backwards; same-instant events resume in scheduling order
//! 3. A processor never holds more jobs than its capacity

// Module declarations
pub mod arrivals;
pub mod coordinator;
pub mod core;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod process;
pub mod rng;

// Re-exports for convenience
pub use arrivals::{OrderSource, OrderSourceConfig};
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use core::time::{ClockError, EventClock};
pub use models::{
    event::{Event, EventLog},
    state::SimulationState,
    Item, ItemId, Job, JobId, ModelError, Order, OrderId, Patient, PatientId, Processor,
};
pub use orchestrator::{
    Orchestrator, ProcessorReport, SimulationConfig, SimulationError, SimulationSummary,
};
pub use policy::{DispatchPolicy, JobSplitPolicy, ReworkPlacement};
pub use process::{Stage, StageId};
pub use rng::RngManager;
