//! Generic stage engine: queue, dispatch, seize and release
//!
//! A stage owns its queue and its processors. It never touches job state;
//! the orchestrator stamps jobs with the assignments a dispatch returns.
//!
//! # Dispatch
//!
//! While the queue is non-empty and some processor is available, pop a job
//! under the dispatch policy and seize the first available processor in
//! stage order. Dispatch is idempotent: running it against a fully assigned
//! pool or an empty queue changes nothing.

use super::StageId;
use crate::models::{JobId, ModelError, Processor};
use crate::policy::{DispatchPolicy, QueuePosition};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Queue length observed at an instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueSample {
    pub time: f64,
    pub length: usize,
}

/// A job seized onto a processor by a dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub job_id: JobId,
    /// Index into the stage's processor list
    pub processor_index: usize,
}

#[derive(Debug, Clone)]
pub struct Stage {
    id: StageId,
    queue: VecDeque<JobId>,
    processors: Vec<Processor>,
    dispatch_policy: DispatchPolicy,
    queue_length_history: Vec<QueueSample>,
}

impl Stage {
    /// Stage served by `num_machines` identical machines
    pub fn with_machines(
        id: StageId,
        num_machines: usize,
        capacity: usize,
        processing_time: f64,
        dispatch_policy: DispatchPolicy,
    ) -> Self {
        let processors = (1..=num_machines)
            .map(|n| Processor::machine(n, id.processor_name(n), capacity, processing_time))
            .collect();
        Self::new(id, processors, dispatch_policy)
    }

    /// Stage served by `num_workers` workers, `time_per_item` per item
    pub fn with_workers(
        id: StageId,
        num_workers: usize,
        time_per_item: f64,
        dispatch_policy: DispatchPolicy,
    ) -> Self {
        let processors = (1..=num_workers)
            .map(|n| Processor::worker(n, id.processor_name(n), time_per_item))
            .collect();
        Self::new(id, processors, dispatch_policy)
    }

    pub fn new(id: StageId, processors: Vec<Processor>, dispatch_policy: DispatchPolicy) -> Self {
        Self {
            id,
            queue: VecDeque::new(),
            processors,
            dispatch_policy,
            queue_length_history: Vec::new(),
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        self.dispatch_policy
    }

    /// Waiting jobs, head first
    pub fn queue(&self) -> &VecDeque<JobId> {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    pub fn processor(&self, index: usize) -> Option<&Processor> {
        self.processors.get(index)
    }

    /// Queue length samples, one per insertion and per dispatch pop
    pub fn queue_length_history(&self) -> &[QueueSample] {
        &self.queue_length_history
    }

    /// Whether any processor has a free slot
    pub fn has_available_processor(&self) -> bool {
        self.processors.iter().any(Processor::is_available)
    }

    /// Insert a job into the queue and record the new length
    ///
    /// The caller follows up with [`Stage::dispatch`].
    pub fn insert(&mut self, job_id: JobId, position: QueuePosition, now: f64) -> usize {
        match position {
            QueuePosition::Head => self.queue.push_front(job_id),
            QueuePosition::Tail => self.queue.push_back(job_id),
        }
        self.record_queue_length(now);
        self.queue.len()
    }

    /// Assign queued jobs to free processors until one side runs out
    pub fn dispatch(&mut self, now: f64) -> Result<Vec<Assignment>, ModelError> {
        let mut assignments = Vec::new();

        while let Some(processor_index) = self.processors.iter().position(Processor::is_available) {
            let Some(queue_index) = self.dispatch_policy.select_index(self.queue.len()) else {
                break;
            };
            let Some(job_id) = self.queue.remove(queue_index) else {
                break;
            };
            self.record_queue_length(now);

            self.processors[processor_index].occupy(job_id, now)?;
            log::trace!(
                "{}: {} seized {}",
                self.id,
                job_id,
                self.processors[processor_index].name()
            );
            assignments.push(Assignment {
                job_id,
                processor_index,
            });
        }

        Ok(assignments)
    }

    /// Free the slot `job_id` holds on processor `processor_index`
    pub fn release(&mut self, processor_index: usize, job_id: JobId, now: f64) -> Result<(), ModelError> {
        let processor = self
            .processors
            .get_mut(processor_index)
            .ok_or_else(|| ModelError::JobNotOnProcessor {
                job: job_id,
                processor: format!("{}#{}", self.id, processor_index),
            })?;
        processor.release(job_id, now)
    }

    fn record_queue_length(&mut self, now: f64) {
        self.queue_length_history.push(QueueSample {
            time: now,
            length: self.queue.len(),
        });
    }
}
