//! Coordinator - order intake, job formation, defect batching, completion
//!
//! The coordinator owns the plant-wide bookkeeping that no single stage owns:
//! - the job id sequence shared by forward and rework jobs
//! - the active / completed order lists
//! - the defect buffer (items waiting to be batched into rework jobs)
//!
//! It decides which jobs exist; the orchestrator routes them into stages.
//!
//! # Defect batching
//!
//! ```text
//! buffer += reported defects
//! while len(buffer) >= batch_size:
//!     rework job ← first batch_size items of buffer (FIFO drain)
//! ```

use crate::models::{ItemId, Job, JobId, ModelError, OrderId, SimulationState};
use crate::policy::{JobSplitPolicy, ReworkPlacement};
use std::collections::VecDeque;

/// Coordinator settings taken from the simulation configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub pallet_size_limit: usize,
    pub split_policy: JobSplitPolicy,
    pub defect_batch_size: usize,
    pub rework_placement: ReworkPlacement,
}

/// Plant manager: one instance per simulation run
///
/// # Example
///
/// ```rust
/// use factory_simulator_core_rs::coordinator::{Coordinator, CoordinatorConfig};
/// use factory_simulator_core_rs::policy::{JobSplitPolicy, ReworkPlacement};
/// use factory_simulator_core_rs::SimulationState;
///
/// let mut state = SimulationState::new();
/// let order_id = state.create_order(&[120], 0.0, 0.0);
///
/// let mut coordinator = Coordinator::new(CoordinatorConfig {
///     pallet_size_limit: 50,
///     split_policy: JobSplitPolicy::EqualSplit,
///     defect_batch_size: 20,
///     rework_placement: ReworkPlacement::QueueLast,
/// });
///
/// let jobs = coordinator.receive_order(order_id, &mut state, 0.0).unwrap();
/// let sizes: Vec<usize> = jobs.iter().map(|id| state.job(*id).unwrap().num_items()).collect();
/// assert_eq!(sizes, vec![40, 40, 40]);
/// ```
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: CoordinatorConfig,
    next_job_id: u64,
    defect_buffer: VecDeque<ItemId>,
    /// Every defective item ever reported, in report order
    defect_history: Vec<ItemId>,
    active_orders: Vec<OrderId>,
    completed_orders: Vec<OrderId>,
    rework_jobs_created: usize,
}

impl Coordinator {
    /// # Panics
    /// Panics if the pallet limit or the defect batch size is zero
    /// (both rejected by configuration validation)
    pub fn new(config: CoordinatorConfig) -> Self {
        assert!(config.pallet_size_limit > 0, "pallet_size_limit must be positive");
        assert!(config.defect_batch_size > 0, "defect_batch_size must be positive");

        Self {
            config,
            next_job_id: 1,
            defect_buffer: VecDeque::new(),
            defect_history: Vec::new(),
            active_orders: Vec::new(),
            completed_orders: Vec::new(),
            rework_jobs_created: 0,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn rework_placement(&self) -> ReworkPlacement {
        self.config.rework_placement
    }

    pub fn active_orders(&self) -> &[OrderId] {
        &self.active_orders
    }

    pub fn completed_orders(&self) -> &[OrderId] {
        &self.completed_orders
    }

    /// Items waiting to be batched, oldest first
    pub fn defect_buffer(&self) -> &VecDeque<ItemId> {
        &self.defect_buffer
    }

    pub fn defect_history(&self) -> &[ItemId] {
        &self.defect_history
    }

    pub fn rework_jobs_created(&self) -> usize {
        self.rework_jobs_created
    }

    fn allocate_job_id(&mut self) -> JobId {
        let id = JobId(self.next_job_id);
        self.next_job_id += 1;
        id
    }

    /// Accept an order and cut each patient's items into Build jobs
    ///
    /// Returns the new job ids in creation order; the caller enqueues them
    /// to Build in that order.
    pub fn receive_order(
        &mut self,
        order_id: OrderId,
        state: &mut SimulationState,
        now: f64,
    ) -> Result<Vec<JobId>, ModelError> {
        let order = state.order_mut(order_id)?;
        order.stamp_start(now);
        let patients = order.patients().to_vec();
        self.active_orders.push(order_id);

        let mut job_ids = Vec::new();
        for patient_id in patients {
            let items = state.patient(patient_id)?.items().to_vec();
            let chunks = self
                .config
                .split_policy
                .split(&items, self.config.pallet_size_limit);

            log::debug!(
                "{} of {}: {} items into {} jobs ({:?})",
                patient_id,
                order_id,
                items.len(),
                chunks.len(),
                self.config.split_policy
            );

            for chunk in chunks {
                let job_id = self.allocate_job_id();
                state.insert_job(Job::new(job_id, chunk)?)?;
                job_ids.push(job_id);
            }
        }

        Ok(job_ids)
    }

    /// Buffer defective items and emit full rework batches
    ///
    /// Each emitted job takes exactly `defect_batch_size` items from the
    /// buffer front. Items drained into a job have their defect flag reset
    /// for the next Build visit. Returns the new rework job ids in emission
    /// order.
    pub fn accumulate_defects(
        &mut self,
        items: &[ItemId],
        state: &mut SimulationState,
    ) -> Result<Vec<JobId>, ModelError> {
        self.defect_buffer.extend(items.iter().copied());
        self.defect_history.extend(items.iter().copied());

        let batch_size = self.config.defect_batch_size;
        let mut job_ids = Vec::new();

        while self.defect_buffer.len() >= batch_size {
            let batch: Vec<ItemId> = self.defect_buffer.drain(..batch_size).collect();
            for item_id in &batch {
                state.item_mut(*item_id)?.prepare_rework();
            }

            let job_id = self.allocate_job_id();
            state.insert_job(Job::new_rework(job_id, batch)?)?;
            self.rework_jobs_created += 1;
            job_ids.push(job_id);
        }

        log::debug!(
            "defects buffered: +{} -> {} waiting, {} rework jobs emitted",
            items.len(),
            self.defect_buffer.len(),
            job_ids.len()
        );
        Ok(job_ids)
    }

    /// Complete the order if all its patients have completed
    ///
    /// Idempotent: an order already completed is left untouched and `false`
    /// is returned. Returns `true` only on the call that completes it.
    pub fn check_order_completion(
        &mut self,
        order_id: OrderId,
        state: &mut SimulationState,
        now: f64,
    ) -> Result<bool, ModelError> {
        if state.order(order_id)?.is_completed() {
            return Ok(false);
        }
        if !state.is_order_fulfilled(order_id)? {
            return Ok(false);
        }

        state.order_mut(order_id)?.complete(now)?;
        self.active_orders.retain(|id| *id != order_id);
        self.completed_orders.push(order_id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientId;

    fn coordinator(split_policy: JobSplitPolicy, batch: usize) -> Coordinator {
        Coordinator::new(CoordinatorConfig {
            pallet_size_limit: 50,
            split_policy,
            defect_batch_size: batch,
            rework_placement: ReworkPlacement::QueueLast,
        })
    }

    #[test]
    fn test_receive_order_registers_and_splits_per_patient() {
        let mut state = SimulationState::new();
        let order_id = state.create_order(&[30, 120], 0.0, 10.0);
        let mut coordinator = coordinator(JobSplitPolicy::MaxPack, 20);

        let jobs = coordinator.receive_order(order_id, &mut state, 5.0).unwrap();
        let sizes: Vec<usize> = jobs
            .iter()
            .map(|id| state.job(*id).unwrap().num_items())
            .collect();

        assert_eq!(sizes, vec![30, 50, 50, 20]);
        assert_eq!(jobs, vec![JobId(1), JobId(2), JobId(3), JobId(4)]);
        assert_eq!(coordinator.active_orders(), &[order_id]);
        assert_eq!(state.order(order_id).unwrap().time_start(), 5.0);
    }

    #[test]
    fn test_defect_batches_drain_front() {
        let mut state = SimulationState::new();
        state.create_order(&[30], 0.0, 0.0);
        let mut coordinator = coordinator(JobSplitPolicy::EqualSplit, 20);

        let batch = |range: std::ops::Range<u64>| -> Vec<ItemId> { range.map(ItemId).collect() };

        assert!(coordinator.accumulate_defects(&batch(1..6), &mut state).unwrap().is_empty());
        assert!(coordinator.accumulate_defects(&batch(6..14), &mut state).unwrap().is_empty());
        let jobs = coordinator.accumulate_defects(&batch(14..24), &mut state).unwrap();

        assert_eq!(jobs.len(), 1);
        let job = state.job(jobs[0]).unwrap();
        assert!(job.is_rework());
        assert_eq!(job.items(), batch(1..21).as_slice());
        assert_eq!(
            coordinator.defect_buffer().iter().copied().collect::<Vec<_>>(),
            batch(21..24)
        );
        assert_eq!(coordinator.defect_history().len(), 23);
        assert_eq!(coordinator.rework_jobs_created(), 1);
    }

    #[test]
    fn test_order_completion_is_idempotent() {
        let mut state = SimulationState::new();
        let order_id = state.create_order(&[1], 0.0, 0.0);
        let mut coordinator = coordinator(JobSplitPolicy::EqualSplit, 20);
        coordinator.receive_order(order_id, &mut state, 0.0).unwrap();

        assert!(!coordinator.check_order_completion(order_id, &mut state, 10.0).unwrap());

        state.item_mut(ItemId(1)).unwrap().mark_completed().unwrap();
        state.refresh_patient_completion(PatientId(1)).unwrap();

        assert!(coordinator.check_order_completion(order_id, &mut state, 20.0).unwrap());
        assert!(!coordinator.check_order_completion(order_id, &mut state, 30.0).unwrap());
        assert_eq!(state.order(order_id).unwrap().time_end(), Some(20.0));
        assert!(coordinator.active_orders().is_empty());
        assert_eq!(coordinator.completed_orders(), &[order_id]);
    }
}
