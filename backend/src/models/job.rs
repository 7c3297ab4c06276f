//! Job model
//!
//! A job is a pallet of items moving through the pipeline together. It holds
//! item ids only; item state lives in the item arena.
//!
//! Per stage visit a job goes `Queued → Assigned → Processing → Released`:
//! - `stamp_queued` on enqueue (`queue_in`)
//! - `stamp_dispatched` when a processor is seized (`queue_out`, `processing_start`,
//!   new history entry)
//! - `stamp_released` when the processor is released (`processing_end`, history
//!   entry closed)

use super::error::ModelError;
use super::ids::{ItemId, JobId};
use crate::process::StageId;
use serde::{Deserialize, Serialize};

/// Where a job currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstation {
    pub stage: StageId,
    /// Processor id within the stage (1-based); `None` while queued
    pub processor: Option<usize>,
}

/// One visit of a job to a processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub stage: StageId,
    pub processor_id: usize,
    pub processor_name: String,
    pub start: f64,
    pub end: Option<f64>,
}

impl ProcessingStep {
    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }
}

/// A batch of items travelling together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    items: Vec<ItemId>,
    workstation: Option<Workstation>,
    queue_in: Option<f64>,
    queue_out: Option<f64>,
    processing_start: Option<f64>,
    processing_end: Option<f64>,
    is_rework: bool,
    processing_history: Vec<ProcessingStep>,
}

impl Job {
    /// Create a forward-flow job
    ///
    /// # Errors
    /// `ModelError::EmptyJob` if `items` is empty
    pub fn new(id: JobId, items: Vec<ItemId>) -> Result<Self, ModelError> {
        if items.is_empty() {
            return Err(ModelError::EmptyJob(id));
        }
        Ok(Self {
            id,
            items,
            workstation: None,
            queue_in: None,
            queue_out: None,
            processing_start: None,
            processing_end: None,
            is_rework: false,
            processing_history: Vec::new(),
        })
    }

    /// Create a rework job from previously defective items
    pub fn new_rework(id: JobId, items: Vec<ItemId>) -> Result<Self, ModelError> {
        let mut job = Self::new(id, items)?;
        job.is_rework = true;
        Ok(job)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn is_rework(&self) -> bool {
        self.is_rework
    }

    pub fn workstation(&self) -> Option<Workstation> {
        self.workstation
    }

    pub fn queue_in(&self) -> Option<f64> {
        self.queue_in
    }

    pub fn queue_out(&self) -> Option<f64> {
        self.queue_out
    }

    pub fn processing_start(&self) -> Option<f64> {
        self.processing_start
    }

    pub fn processing_end(&self) -> Option<f64> {
        self.processing_end
    }

    pub fn processing_history(&self) -> &[ProcessingStep] {
        &self.processing_history
    }

    /// Time spent waiting in the current (or last) stage queue
    pub fn waiting_time(&self) -> Option<f64> {
        Some(self.queue_out? - self.queue_in?)
    }

    /// Time spent on the current (or last) processor
    pub fn processing_time(&self) -> Option<f64> {
        Some(self.processing_end? - self.processing_start?)
    }

    /// Enter a stage queue; clears the previous visit's timestamps
    pub fn stamp_queued(&mut self, stage: StageId, now: f64) {
        self.workstation = Some(Workstation {
            stage,
            processor: None,
        });
        self.queue_in = Some(now);
        self.queue_out = None;
        self.processing_start = None;
        self.processing_end = None;
    }

    /// Leave the queue and start on a processor
    pub fn stamp_dispatched(&mut self, stage: StageId, processor_id: usize, processor_name: &str, now: f64) {
        self.workstation = Some(Workstation {
            stage,
            processor: Some(processor_id),
        });
        self.queue_out = Some(now);
        self.processing_start = Some(now);
        self.processing_history.push(ProcessingStep {
            stage,
            processor_id,
            processor_name: processor_name.to_string(),
            start: now,
            end: None,
        });
    }

    /// Finish on the current processor, closing the open history entry
    pub fn stamp_released(&mut self, now: f64) -> Result<(), ModelError> {
        let step = self
            .processing_history
            .last_mut()
            .filter(|step| step.end.is_none())
            .ok_or(ModelError::NoOpenStep(self.id))?;
        step.end = Some(now);
        self.processing_end = Some(now);
        Ok(())
    }
}
