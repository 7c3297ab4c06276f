//! Event clock for the simulation
//!
//! The simulation advances in continuous time (minutes). Suspended units of
//! work register a payload to be resumed at a given instant; the clock hands
//! them back one at a time in time order.
//!
//! # Ordering
//!
//! - Earlier instants always resume before later ones.
//! - Payloads scheduled for the same instant resume in the order they were
//!   scheduled (a monotonically increasing sequence number breaks ties).
//! - Time never moves backwards.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;

/// Errors raised when a resumption request would break clock monotonicity
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClockError {
    #[error("cannot schedule at {requested} before current time {now}")]
    InThePast { requested: f64, now: f64 },

    #[error("scheduled time must be finite, got {0}")]
    NonFinite(f64),
}

#[derive(Debug)]
struct Scheduled<T> {
    time: f64,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Manages simulation time and the schedule of pending resumptions
///
/// # Example
/// ```
/// use factory_simulator_core_rs::EventClock;
///
/// let mut clock = EventClock::new();
/// clock.schedule_in(10.0, "late").unwrap();
/// clock.schedule_in(0.0, "now").unwrap();
///
/// assert_eq!(clock.pop_next(), Some((0.0, "now")));
/// assert_eq!(clock.pop_next(), Some((10.0, "late")));
/// assert_eq!(clock.now(), 10.0);
/// ```
#[derive(Debug)]
pub struct EventClock<T> {
    now: f64,
    next_seq: u64,
    pending: BinaryHeap<Scheduled<T>>,
}

impl<T> Default for EventClock<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventClock<T> {
    /// Create a clock at time zero with nothing scheduled
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            pending: BinaryHeap::new(),
        }
    }

    /// Current simulation time in minutes
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Request resumption of `payload` at absolute time `time`
    ///
    /// `time` may equal `now()`; the payload then resumes after every payload
    /// already scheduled for this instant.
    pub fn schedule_at(&mut self, time: f64, payload: T) -> Result<(), ClockError> {
        if !time.is_finite() {
            return Err(ClockError::NonFinite(time));
        }
        if time < self.now {
            return Err(ClockError::InThePast {
                requested: time,
                now: self.now,
            });
        }

        self.pending.push(Scheduled {
            time,
            seq: self.next_seq,
            payload,
        });
        self.next_seq += 1;
        Ok(())
    }

    /// Request resumption of `payload` after `delay` minutes
    pub fn schedule_in(&mut self, delay: f64, payload: T) -> Result<(), ClockError> {
        self.schedule_at(self.now + delay, payload)
    }

    /// Time of the next pending resumption, if any
    pub fn peek_time(&self) -> Option<f64> {
        self.pending.peek().map(|s| s.time)
    }

    /// Advance to the next due resumption and hand its payload back
    pub fn pop_next(&mut self) -> Option<(f64, T)> {
        let scheduled = self.pending.pop()?;
        self.now = scheduled.time;
        Some((scheduled.time, scheduled.payload))
    }

    /// Move the clock forward to `time` without resuming anything
    ///
    /// Used at the end of a bounded run. Pending resumptions due before
    /// `time` must have been popped first.
    pub fn advance_to(&mut self, time: f64) -> Result<(), ClockError> {
        if !time.is_finite() {
            return Err(ClockError::NonFinite(time));
        }
        if time < self.now {
            return Err(ClockError::InThePast {
                requested: time,
                now: self.now,
            });
        }
        self.now = time;
        Ok(())
    }

    /// Number of pending resumptions
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is scheduled
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_instant_resumes_in_schedule_order() {
        let mut clock = EventClock::new();
        clock.schedule_at(5.0, 'a').unwrap();
        clock.schedule_at(5.0, 'b').unwrap();
        clock.schedule_at(1.0, 'c').unwrap();
        clock.schedule_at(5.0, 'd').unwrap();

        let order: Vec<char> = std::iter::from_fn(|| clock.pop_next().map(|(_, p)| p)).collect();
        assert_eq!(order, vec!['c', 'a', 'b', 'd']);
    }

    #[test]
    fn test_rejects_past_and_non_finite() {
        let mut clock = EventClock::new();
        clock.schedule_at(3.0, ()).unwrap();
        clock.pop_next();

        assert_eq!(
            clock.schedule_at(2.0, ()),
            Err(ClockError::InThePast {
                requested: 2.0,
                now: 3.0
            })
        );
        assert_eq!(
            clock.schedule_in(f64::NAN, ()).map_err(|e| matches!(e, ClockError::NonFinite(_))),
            Err(true)
        );
    }
}
