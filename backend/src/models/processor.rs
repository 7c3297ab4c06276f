//! Processor model (machines and workers)
//!
//! One capability set for every resource in the plant:
//! - availability check (`occupancy < capacity`)
//! - occupy / release with capacity enforcement
//! - busy-time integration over intervals with occupancy > 0
//!
//! Machines (Build, Wash, Dry) hold up to `capacity` jobs at once and process
//! a job in one fixed hold. Workers (Inspect) hold one job and work through it
//! item by item.

use super::error::ModelError;
use super::ids::JobId;
use serde::{Deserialize, Serialize};

/// Resource variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorKind {
    /// Capacity-N machine; one hold of `processing_time` per job
    Machine,
    /// Capacity-1 worker; one hold of `processing_time` per item
    Worker,
}

impl ProcessorKind {
    /// Whether the hold is a sequence of per-item delays
    pub fn is_per_item(self) -> bool {
        matches!(self, ProcessorKind::Worker)
    }
}

/// A machine or worker allocated at setup for the whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Processor {
    id: usize,
    name: String,
    kind: ProcessorKind,
    capacity: usize,
    processing_time: f64,
    working_jobs: Vec<JobId>,
    busy_time: f64,
    last_status_change: f64,
}

impl Processor {
    /// Create a machine
    ///
    /// # Panics
    /// Panics if capacity is zero or processing_time is not positive
    /// (configuration is validated before processors are built)
    pub fn machine(id: usize, name: String, capacity: usize, processing_time: f64) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        assert!(processing_time > 0.0, "processing_time must be positive");
        Self {
            id,
            name,
            kind: ProcessorKind::Machine,
            capacity,
            processing_time,
            working_jobs: Vec::new(),
            busy_time: 0.0,
            last_status_change: 0.0,
        }
    }

    /// Create a worker (capacity fixed at 1)
    pub fn worker(id: usize, name: String, processing_time: f64) -> Self {
        let mut worker = Self::machine(id, name, 1, processing_time);
        worker.kind = ProcessorKind::Worker;
        worker
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fixed hold per job (machines) or per item (workers)
    pub fn processing_time(&self) -> f64 {
        self.processing_time
    }

    pub fn working_jobs(&self) -> &[JobId] {
        &self.working_jobs
    }

    pub fn occupancy(&self) -> usize {
        self.working_jobs.len()
    }

    pub fn is_available(&self) -> bool {
        self.working_jobs.len() < self.capacity
    }

    /// Busy time accumulated up to the last status change
    pub fn busy_time(&self) -> f64 {
        self.busy_time
    }

    pub fn last_status_change(&self) -> f64 {
        self.last_status_change
    }

    /// Busy time including the open interval up to `now`
    pub fn busy_time_at(&self, now: f64) -> f64 {
        if self.working_jobs.is_empty() {
            self.busy_time
        } else {
            self.busy_time + (now - self.last_status_change).max(0.0)
        }
    }

    /// Fraction of `[0, now]` spent with at least one job on board
    pub fn utilization(&self, now: f64) -> f64 {
        if now <= 0.0 {
            0.0
        } else {
            self.busy_time_at(now) / now
        }
    }

    /// Seize one capacity slot for `job`
    pub fn occupy(&mut self, job: JobId, now: f64) -> Result<(), ModelError> {
        if !self.is_available() {
            return Err(ModelError::CapacityExceeded {
                processor: self.name.clone(),
                capacity: self.capacity,
            });
        }
        self.accumulate(now);
        self.working_jobs.push(job);
        Ok(())
    }

    /// Give back the slot held by `job`
    pub fn release(&mut self, job: JobId, now: f64) -> Result<(), ModelError> {
        let position = self
            .working_jobs
            .iter()
            .position(|j| *j == job)
            .ok_or_else(|| ModelError::JobNotOnProcessor {
                job,
                processor: self.name.clone(),
            })?;
        self.accumulate(now);
        self.working_jobs.remove(position);
        Ok(())
    }

    fn accumulate(&mut self, now: f64) {
        if !self.working_jobs.is_empty() {
            self.busy_time += now - self.last_status_change;
        }
        self.last_status_change = now;
    }
}
