//! Simulation State
//!
//! Owning arenas for every order, patient and item created during a run,
//! plus the map of in-flight jobs.
//!
//! # Critical Invariants
//!
//! 1. **Arena identity**: an entity with id `n` lives at arena position `n - 1`
//! 2. **Ownership**: orders own patients, patients own items; jobs only hold item ids
//! 3. **Retirement**: a job leaves the in-flight map after its Inspect visit

use super::error::ModelError;
use super::ids::{ItemId, JobId, OrderId, PatientId};
use super::job::Job;
use super::order::{Item, Order, Patient};
use std::collections::BTreeMap;

/// Complete entity state of a plant simulation
///
/// # Example
///
/// ```rust
/// use factory_simulator_core_rs::SimulationState;
///
/// let mut state = SimulationState::new();
/// let order_id = state.create_order(&[3, 2], 0.0, 60.0);
///
/// let order = state.order(order_id).unwrap();
/// assert_eq!(order.num_patients(), 2);
/// assert_eq!(state.num_items(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    orders: Vec<Order>,
    patients: Vec<Patient>,
    items: Vec<Item>,
    jobs: BTreeMap<JobId, Job>,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an order with one patient per entry of `items_per_patient`
    ///
    /// Order, patient and item ids continue the run-wide sequences.
    pub fn create_order(&mut self, items_per_patient: &[usize], created_at: f64, due_date_offset: f64) -> OrderId {
        let order_id = OrderId::from_index(self.orders.len());

        let mut patient_ids = Vec::with_capacity(items_per_patient.len());
        for &num_items in items_per_patient {
            let patient_id = PatientId::from_index(self.patients.len());

            let item_ids: Vec<ItemId> = (0..num_items)
                .map(|_| {
                    let item_id = ItemId::from_index(self.items.len());
                    self.items.push(Item::new(item_id, order_id, patient_id));
                    item_id
                })
                .collect();

            self.patients.push(Patient::new(patient_id, order_id, item_ids));
            patient_ids.push(patient_id);
        }

        self.orders
            .push(Order::new(order_id, patient_ids, created_at, due_date_offset));
        order_id
    }

    // ========================================================================
    // Arena access
    // ========================================================================

    pub fn order(&self, id: OrderId) -> Result<&Order, ModelError> {
        id.index()
            .and_then(|i| self.orders.get(i))
            .ok_or(ModelError::UnknownOrder(id))
    }

    pub fn order_mut(&mut self, id: OrderId) -> Result<&mut Order, ModelError> {
        id.index()
            .and_then(|i| self.orders.get_mut(i))
            .ok_or(ModelError::UnknownOrder(id))
    }

    pub fn patient(&self, id: PatientId) -> Result<&Patient, ModelError> {
        id.index()
            .and_then(|i| self.patients.get(i))
            .ok_or(ModelError::UnknownPatient(id))
    }

    pub fn patient_mut(&mut self, id: PatientId) -> Result<&mut Patient, ModelError> {
        id.index()
            .and_then(|i| self.patients.get_mut(i))
            .ok_or(ModelError::UnknownPatient(id))
    }

    pub fn item(&self, id: ItemId) -> Result<&Item, ModelError> {
        id.index()
            .and_then(|i| self.items.get(i))
            .ok_or(ModelError::UnknownItem(id))
    }

    pub fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, ModelError> {
        id.index()
            .and_then(|i| self.items.get_mut(i))
            .ok_or(ModelError::UnknownItem(id))
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn num_orders(&self) -> usize {
        self.orders.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    // ========================================================================
    // In-flight jobs
    // ========================================================================

    pub fn insert_job(&mut self, job: Job) -> Result<(), ModelError> {
        let id = job.id();
        if self.jobs.contains_key(&id) {
            return Err(ModelError::DuplicateJob(id));
        }
        self.jobs.insert(id, job);
        Ok(())
    }

    pub fn job(&self, id: JobId) -> Result<&Job, ModelError> {
        self.jobs.get(&id).ok_or(ModelError::UnknownJob(id))
    }

    pub fn job_mut(&mut self, id: JobId) -> Result<&mut Job, ModelError> {
        self.jobs.get_mut(&id).ok_or(ModelError::UnknownJob(id))
    }

    /// Remove a job that has finished its last stage
    pub fn retire_job(&mut self, id: JobId) -> Result<Job, ModelError> {
        self.jobs.remove(&id).ok_or(ModelError::UnknownJob(id))
    }

    pub fn jobs_in_flight(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn num_jobs_in_flight(&self) -> usize {
        self.jobs.len()
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Re-evaluate a patient after one of its items changed
    ///
    /// Returns `true` only on the call that completes the patient.
    pub fn refresh_patient_completion(&mut self, id: PatientId) -> Result<bool, ModelError> {
        let patient = self.patient(id)?;
        if patient.is_completed() {
            return Ok(false);
        }

        let mut all_done = true;
        for item_id in patient.items() {
            if !self.item(*item_id)?.is_completed() {
                all_done = false;
                break;
            }
        }

        if all_done {
            self.patient_mut(id)?.mark_completed()?;
        }
        Ok(all_done)
    }

    /// Whether every patient of the order has completed
    pub fn is_order_fulfilled(&self, id: OrderId) -> Result<bool, ModelError> {
        let order = self.order(id)?;
        for patient_id in order.patients() {
            if !self.patient(*patient_id)?.is_completed() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
