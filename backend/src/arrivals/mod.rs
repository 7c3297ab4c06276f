//! Arrival generation module for deterministic order creation.
//!
//! The order source plays the customer: every `interval` minutes it builds a
//! new order with a random number of patients and, per patient, a random
//! number of items, then hands it to the coordinator. It never blocks on
//! pipeline congestion.
//!
//! # Key Principles
//!
//! 1. **Determinism**: Same seed + same config → same orders
//! 2. **Draw order**: patient count first, then one item-count draw per patient
//! 3. **Run-wide ids**: order, patient and item ids keep increasing across orders
//!
//! # Example
//!
//! ```
//! use factory_simulator_core_rs::arrivals::{OrderSource, OrderSourceConfig};
//! use factory_simulator_core_rs::rng::RngManager;
//! use factory_simulator_core_rs::SimulationState;
//!
//! let source = OrderSource::new(OrderSourceConfig {
//!     interval: 60.0,
//!     patients_per_order: (2, 2),
//!     items_per_patient: (3, 3),
//! });
//!
//! let mut state = SimulationState::new();
//! let mut rng = RngManager::new(42);
//! let order_id = source.generate(&mut state, &mut rng, 0.0, 120.0);
//!
//! assert_eq!(state.order(order_id).unwrap().num_patients(), 2);
//! assert_eq!(state.num_items(), 6);
//! ```

use crate::models::{OrderId, SimulationState};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Configuration for periodic order arrivals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSourceConfig {
    /// Minutes between consecutive orders (first order at time 0)
    pub interval: f64,

    /// Patients per order, inclusive range (min, max)
    pub patients_per_order: (usize, usize),

    /// Items per patient, inclusive range (min, max)
    pub items_per_patient: (usize, usize),
}

impl Default for OrderSourceConfig {
    fn default() -> Self {
        Self {
            interval: 7.0 * 24.0 * 60.0,
            patients_per_order: (5, 5),
            items_per_patient: (5, 10),
        }
    }
}

impl OrderSourceConfig {
    /// Reject ranges the generator cannot draw from
    pub fn validate(&self) -> Result<(), String> {
        if !(self.interval.is_finite() && self.interval > 0.0) {
            return Err(format!("order interval must be positive, got {}", self.interval));
        }

        let (min_p, max_p) = self.patients_per_order;
        if min_p == 0 || min_p > max_p {
            return Err(format!(
                "patients_per_order must be a non-empty range starting at 1 or more, got ({}, {})",
                min_p, max_p
            ));
        }

        let (min_i, max_i) = self.items_per_patient;
        if min_i == 0 || min_i > max_i {
            return Err(format!(
                "items_per_patient must be a non-empty range starting at 1 or more, got ({}, {})",
                min_i, max_i
            ));
        }

        Ok(())
    }
}

/// Generator for periodic orders.
#[derive(Debug, Clone)]
pub struct OrderSource {
    config: OrderSourceConfig,
}

impl OrderSource {
    pub fn new(config: OrderSourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrderSourceConfig {
        &self.config
    }

    pub fn interval(&self) -> f64 {
        self.config.interval
    }

    /// Draw one order and add it to `state`.
    ///
    /// # Arguments
    ///
    /// * `state` - Arenas the order, its patients and items are created in
    /// * `rng` - Shared simulation RNG
    /// * `now` - Creation time
    /// * `due_date_offset` - Due date distance from creation
    pub fn generate(
        &self,
        state: &mut SimulationState,
        rng: &mut RngManager,
        now: f64,
        due_date_offset: f64,
    ) -> OrderId {
        let (min_p, max_p) = self.config.patients_per_order;
        let (min_i, max_i) = self.config.items_per_patient;

        let num_patients = rng.range_inclusive(min_p, max_p);
        let items_per_patient: Vec<usize> = (0..num_patients)
            .map(|_| rng.range_inclusive(min_i, max_i))
            .collect();

        state.create_order(&items_per_patient, now, due_date_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OrderSourceConfig {
        OrderSourceConfig {
            interval: 100.0,
            patients_per_order: (1, 4),
            items_per_patient: (5, 10),
        }
    }

    #[test]
    fn test_generate_within_ranges() {
        let source = OrderSource::new(config());
        let mut state = SimulationState::new();
        let mut rng = RngManager::new(7);

        for n in 0..50 {
            source.generate(&mut state, &mut rng, n as f64 * 100.0, 0.0);
        }

        for order in state.orders() {
            assert!((1..=4).contains(&order.num_patients()));
        }
        for patient in state.patients() {
            assert!((5..=10).contains(&patient.num_items()));
        }
    }

    #[test]
    fn test_generate_deterministic() {
        let source = OrderSource::new(config());

        let shape = |seed: u64| -> Vec<usize> {
            let mut state = SimulationState::new();
            let mut rng = RngManager::new(seed);
            for _ in 0..10 {
                source.generate(&mut state, &mut rng, 0.0, 0.0);
            }
            state.patients().iter().map(|p| p.num_items()).collect()
        };

        assert_eq!(shape(12345), shape(12345));
    }

    #[test]
    fn test_due_date_from_creation_time() {
        let source = OrderSource::new(config());
        let mut state = SimulationState::new();
        let mut rng = RngManager::new(1);

        let order_id = source.generate(&mut state, &mut rng, 300.0, 60.0);
        assert_eq!(state.order(order_id).unwrap().due_date(), 360.0);
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut bad = config();
        bad.patients_per_order = (3, 2);
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.items_per_patient = (0, 2);
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.interval = 0.0;
        assert!(bad.validate().is_err());

        assert!(config().validate().is_ok());
    }
}
