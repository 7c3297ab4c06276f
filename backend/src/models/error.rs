//! Contract violations detected by the domain models
//!
//! None of these are expected at runtime: each one means a dispatch or
//! accounting bug, and is surfaced to the caller immediately.

use super::ids::{ItemId, JobId, OrderId, PatientId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("Item {0} already completed")]
    ItemAlreadyCompleted(ItemId),

    #[error("Patient {0} already completed")]
    PatientAlreadyCompleted(PatientId),

    #[error("Order {0} already completed")]
    OrderAlreadyCompleted(OrderId),

    #[error("Order {order} cannot complete at {time} before it started at {start}")]
    CompletionBeforeStart { order: OrderId, time: f64, start: f64 },

    #[error("Job {0} has no items")]
    EmptyJob(JobId),

    #[error("Job {job} has no item at position {position} ({num_items} items)")]
    ItemOutOfRange {
        job: JobId,
        position: usize,
        num_items: usize,
    },

    #[error("Job {0} has no open processing step")]
    NoOpenStep(JobId),

    #[error("Processor {processor} is at capacity {capacity}")]
    CapacityExceeded { processor: String, capacity: usize },

    #[error("Job {job} is not on processor {processor}")]
    JobNotOnProcessor { job: JobId, processor: String },

    #[error("Unknown order {0}")]
    UnknownOrder(OrderId),

    #[error("Unknown patient {0}")]
    UnknownPatient(PatientId),

    #[error("Unknown item {0}")]
    UnknownItem(ItemId),

    #[error("Unknown job {0}")]
    UnknownJob(JobId),

    #[error("Job {0} already exists")]
    DuplicateJob(JobId),
}
