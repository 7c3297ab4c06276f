//! Domain models for the plant simulator

pub mod error;
pub mod event;
pub mod ids;
pub mod job;
pub mod order;
pub mod processor;
pub mod state;

// Re-exports
pub use error::ModelError;
pub use event::{Event, EventLog};
pub use ids::{ItemId, JobId, OrderId, PatientId};
pub use job::{Job, ProcessingStep, Workstation};
pub use order::{Item, Order, Patient};
pub use processor::{Processor, ProcessorKind};
pub use state::SimulationState;
