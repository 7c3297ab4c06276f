//! xorshift64* random number generator
//!
//! Every random draw in the plant (patients per order, items per patient,
//! per-item defect outcomes at Build) comes from one `RngManager`, consumed
//! in a fixed order by the single simulation thread. Same seed and same
//! configuration therefore reproduce the same run exactly.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use factory_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(42);
/// let patients = rng.range_inclusive(5, 10);
/// assert!((5..=10).contains(&patients));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is replaced by 1 (xorshift never leaves the zero state).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in `[min, max]` (both inclusive)
    ///
    /// # Panics
    /// Panics if min > max
    pub fn range_inclusive(&mut self, min: usize, max: usize) -> usize {
        assert!(min <= max, "min must not exceed max");

        let span = (max - min) as u64 + 1;
        min + (self.next() % span) as usize
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// One Bernoulli trial: true with probability `p`
    ///
    /// Always consumes exactly one draw, so the draw sequence does not depend
    /// on the probability configured.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Current internal state
    pub fn get_state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    #[should_panic(expected = "min must not exceed max")]
    fn test_range_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.range_inclusive(10, 5);
    }

    #[test]
    fn test_degenerate_range_is_constant() {
        let mut rng = RngManager::new(7);
        for _ in 0..50 {
            assert_eq!(rng.range_inclusive(5, 5), 5);
        }
    }

    #[test]
    fn test_bernoulli_extremes() {
        let mut rng = RngManager::new(99);
        for _ in 0..1000 {
            assert!(!rng.bernoulli(0.0));
            assert!(rng.bernoulli(1.0));
        }
    }

    #[test]
    fn test_next_f64_in_range() {
        let mut rng = RngManager::new(12345);

        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!(
                (0.0..1.0).contains(&val),
                "next_f64() produced value {} outside [0.0, 1.0)",
                val
            );
        }
    }
}
