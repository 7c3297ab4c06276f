//! Event logging for simulation replay and analysis.
//!
//! This module defines the Event enum capturing every significant state
//! change of a plant run. The log is plain data: reporting, charts and
//! human-readable traces are built from it outside the core.
//!
//! # Event Types
//!
//! - **OrderArrival**: an order entered the plant
//! - **JobCreated**: a forward or rework job was formed
//! - **JobQueued / JobDispatched / JobReleased**: one stage visit
//! - **DefectsMarked**: Build decided some items are defective
//! - **DefectsFound**: Inspect discovered defective items
//! - **ReworkJobCreated**: a rework batch left the defect buffer
//! - **PatientCompleted / OrderCompleted**: hierarchy completion
//!
//! # Example
//!
//! ```rust
//! use factory_simulator_core_rs::models::event::{Event, EventLog};
//! use factory_simulator_core_rs::models::{JobId, OrderId};
//!
//! let mut log = EventLog::new();
//! log.log(Event::JobCreated {
//!     time: 0.0,
//!     job_id: JobId(1),
//!     order_id: Some(OrderId(1)),
//!     num_items: 30,
//!     is_rework: false,
//! });
//!
//! assert_eq!(log.events_of_type("JobCreated").len(), 1);
//! ```

use super::ids::{JobId, OrderId, PatientId};
use crate::policy::ReworkPlacement;
use crate::process::StageId;
use serde::{Deserialize, Serialize};

/// Simulation event capturing a state change.
///
/// Events are logged in the order they are committed; `time` is the
/// simulation time of the resumption that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// New order received by the coordinator
    OrderArrival {
        time: f64,
        order_id: OrderId,
        num_patients: usize,
        num_items: usize,
    },

    /// Job formed from a patient's items (`order_id` set) or from defects
    JobCreated {
        time: f64,
        job_id: JobId,
        order_id: Option<OrderId>,
        num_items: usize,
        is_rework: bool,
    },

    /// Job inserted into a stage queue
    JobQueued {
        time: f64,
        job_id: JobId,
        stage: StageId,
        queue_length: usize,
    },

    /// Job assigned to a processor
    JobDispatched {
        time: f64,
        job_id: JobId,
        stage: StageId,
        processor_id: usize,
        processor_name: String,
    },

    /// Job finished on a processor
    JobReleased {
        time: f64,
        job_id: JobId,
        stage: StageId,
        processor_id: usize,
    },

    /// Build flagged items of a job as defective
    DefectsMarked {
        time: f64,
        job_id: JobId,
        num_defects: usize,
    },

    /// Inspect found defective items in a job
    DefectsFound {
        time: f64,
        job_id: JobId,
        num_defects: usize,
        buffer_size: usize,
    },

    /// Defect buffer drained into a rework job
    ReworkJobCreated {
        time: f64,
        job_id: JobId,
        num_items: usize,
        placement: ReworkPlacement,
    },

    /// All items of a patient passed inspection
    PatientCompleted {
        time: f64,
        patient_id: PatientId,
        order_id: OrderId,
    },

    /// All patients of an order completed
    OrderCompleted {
        time: f64,
        order_id: OrderId,
        makespan: f64,
    },
}

impl Event {
    /// Simulation time when this event occurred
    pub fn time(&self) -> f64 {
        match self {
            Event::OrderArrival { time, .. }
            | Event::JobCreated { time, .. }
            | Event::JobQueued { time, .. }
            | Event::JobDispatched { time, .. }
            | Event::JobReleased { time, .. }
            | Event::DefectsMarked { time, .. }
            | Event::DefectsFound { time, .. }
            | Event::ReworkJobCreated { time, .. }
            | Event::PatientCompleted { time, .. }
            | Event::OrderCompleted { time, .. } => *time,
        }
    }

    /// Short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::OrderArrival { .. } => "OrderArrival",
            Event::JobCreated { .. } => "JobCreated",
            Event::JobQueued { .. } => "JobQueued",
            Event::JobDispatched { .. } => "JobDispatched",
            Event::JobReleased { .. } => "JobReleased",
            Event::DefectsMarked { .. } => "DefectsMarked",
            Event::DefectsFound { .. } => "DefectsFound",
            Event::ReworkJobCreated { .. } => "ReworkJobCreated",
            Event::PatientCompleted { .. } => "PatientCompleted",
            Event::OrderCompleted { .. } => "OrderCompleted",
        }
    }

    /// Job the event relates to, if any
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Event::JobCreated { job_id, .. }
            | Event::JobQueued { job_id, .. }
            | Event::JobDispatched { job_id, .. }
            | Event::JobReleased { job_id, .. }
            | Event::DefectsMarked { job_id, .. }
            | Event::DefectsFound { job_id, .. }
            | Event::ReworkJobCreated { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Order the event relates to, if any
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            Event::OrderArrival { order_id, .. }
            | Event::PatientCompleted { order_id, .. }
            | Event::OrderCompleted { order_id, .. } => Some(*order_id),
            Event::JobCreated { order_id, .. } => *order_id,
            _ => None,
        }
    }

    /// Stage the event relates to, if any
    pub fn stage(&self) -> Option<StageId> {
        match self {
            Event::JobQueued { stage, .. }
            | Event::JobDispatched { stage, .. }
            | Event::JobReleased { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Events for a specific job
    pub fn events_for_job(&self, job_id: JobId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.job_id() == Some(job_id))
            .collect()
    }

    /// Events for a specific order
    pub fn events_for_order(&self, order_id: OrderId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.order_id() == Some(order_id))
            .collect()
    }

    /// Events with `from <= time < to`
    pub fn events_between(&self, from: f64, to: f64) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.time() >= from && e.time() < to)
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
