//! Order hierarchy: Order → Patient → Item
//!
//! Orders own patients, patients own items; both ownerships are expressed as
//! id lists into the arenas held by [`SimulationState`](crate::models::state::SimulationState).
//! Jobs only ever reference items by id.
//!
//! # Completion invariants
//!
//! - An item's completion flag is set once, during Inspect.
//! - A patient completes exactly once, the first time all its items have completed.
//! - An order's `time_end` is set exactly once, when its last patient completes,
//!   and never before `time_start`.

use super::error::ModelError;
use super::ids::{ItemId, OrderId, PatientId};
use serde::{Deserialize, Serialize};

/// Item type produced by the plant
pub const ITEM_TYPE_ALIGNER: &str = "aligner";

/// A single aligner travelling through the plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    order_id: OrderId,
    patient_id: PatientId,
    item_type: String,
    is_completed: bool,
    is_defect: bool,
    /// Number of times this item has been drained into a rework job
    rework_count: u32,
}

impl Item {
    pub fn new(id: ItemId, order_id: OrderId, patient_id: PatientId) -> Self {
        Self {
            id,
            order_id,
            patient_id,
            item_type: ITEM_TYPE_ALIGNER.to_string(),
            is_completed: false,
            is_defect: false,
            rework_count: 0,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn is_defect(&self) -> bool {
        self.is_defect
    }

    pub fn rework_count(&self) -> u32 {
        self.rework_count
    }

    /// Flag the item as defective (Build outcome)
    pub fn mark_defect(&mut self) {
        self.is_defect = true;
    }

    /// Mark the item as passed inspection
    pub fn mark_completed(&mut self) -> Result<(), ModelError> {
        if self.is_completed {
            return Err(ModelError::ItemAlreadyCompleted(self.id));
        }
        self.is_completed = true;
        Ok(())
    }

    /// Reset the defect flag as the item is batched for rework
    ///
    /// The next Build visit decides the defect outcome afresh.
    pub fn prepare_rework(&mut self) {
        self.is_defect = false;
        self.rework_count += 1;
    }
}

/// A patient: a fixed set of items created together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    id: PatientId,
    order_id: OrderId,
    items: Vec<ItemId>,
    is_completed: bool,
}

impl Patient {
    pub fn new(id: PatientId, order_id: OrderId, items: Vec<ItemId>) -> Self {
        Self {
            id,
            order_id,
            items,
            is_completed: false,
        }
    }

    pub fn id(&self) -> PatientId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Record that every item of the patient has completed
    pub fn mark_completed(&mut self) -> Result<(), ModelError> {
        if self.is_completed {
            return Err(ModelError::PatientAlreadyCompleted(self.id));
        }
        self.is_completed = true;
        Ok(())
    }
}

/// A customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    patients: Vec<PatientId>,
    due_date: f64,
    time_start: f64,
    time_end: Option<f64>,
}

impl Order {
    /// Create an order at `created_at`, due `due_date_offset` minutes later
    pub fn new(id: OrderId, patients: Vec<PatientId>, created_at: f64, due_date_offset: f64) -> Self {
        Self {
            id,
            patients,
            due_date: created_at + due_date_offset,
            time_start: created_at,
            time_end: None,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn patients(&self) -> &[PatientId] {
        &self.patients
    }

    pub fn num_patients(&self) -> usize {
        self.patients.len()
    }

    pub fn due_date(&self) -> f64 {
        self.due_date
    }

    pub fn time_start(&self) -> f64 {
        self.time_start
    }

    pub fn time_end(&self) -> Option<f64> {
        self.time_end
    }

    pub fn is_completed(&self) -> bool {
        self.time_end.is_some()
    }

    /// Elapsed time from creation to completion
    pub fn makespan(&self) -> Option<f64> {
        self.time_end.map(|end| end - self.time_start)
    }

    /// Whether a completed order finished after its due date
    pub fn is_late(&self) -> Option<bool> {
        self.time_end.map(|end| end > self.due_date)
    }

    /// Stamp the instant the plant accepted the order
    pub fn stamp_start(&mut self, now: f64) {
        self.time_start = now;
    }

    /// Stamp completion; refuses a second stamp
    pub fn complete(&mut self, now: f64) -> Result<(), ModelError> {
        if self.time_end.is_some() {
            return Err(ModelError::OrderAlreadyCompleted(self.id));
        }
        if now < self.time_start {
            return Err(ModelError::CompletionBeforeStart {
                order: self.id,
                time: now,
                start: self.time_start,
            });
        }
        self.time_end = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_completes_once() {
        let mut patient = Patient::new(PatientId(1), OrderId(1), vec![ItemId(1), ItemId(2)]);
        assert_eq!(patient.num_items(), 2);

        patient.mark_completed().unwrap();
        assert!(patient.is_completed());
        assert_eq!(
            patient.mark_completed(),
            Err(ModelError::PatientAlreadyCompleted(PatientId(1)))
        );
    }

    #[test]
    fn test_item_completes_once() {
        let mut item = Item::new(ItemId(1), OrderId(1), PatientId(1));
        assert_eq!(item.item_type(), "aligner");

        item.mark_completed().unwrap();
        assert_eq!(
            item.mark_completed(),
            Err(ModelError::ItemAlreadyCompleted(ItemId(1)))
        );
    }

    #[test]
    fn test_prepare_rework_clears_defect() {
        let mut item = Item::new(ItemId(3), OrderId(1), PatientId(1));
        item.mark_defect();
        assert!(item.is_defect());

        item.prepare_rework();
        assert!(!item.is_defect());
        assert_eq!(item.rework_count(), 1);
    }

    #[test]
    fn test_order_completion_is_stamped_once() {
        let mut order = Order::new(OrderId(1), vec![PatientId(1)], 100.0, 50.0);
        assert_eq!(order.due_date(), 150.0);

        order.complete(400.0).unwrap();
        assert_eq!(order.makespan(), Some(300.0));
        assert_eq!(order.is_late(), Some(true));
        assert_eq!(
            order.complete(500.0),
            Err(ModelError::OrderAlreadyCompleted(OrderId(1)))
        );
        assert_eq!(order.time_end(), Some(400.0));
    }

    #[test]
    fn test_order_cannot_complete_before_start() {
        let mut order = Order::new(OrderId(2), vec![], 100.0, 0.0);
        assert!(matches!(
            order.complete(50.0),
            Err(ModelError::CompletionBeforeStart { .. })
        ));
        assert!(!order.is_completed());
    }
}
