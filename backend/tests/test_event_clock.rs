//! Tests for EventClock
//!
//! Time ordering, same-instant FIFO tie-breaking and monotonicity.

use factory_simulator_core_rs::{ClockError, EventClock};

#[test]
fn test_clock_starts_idle_at_zero() {
    let clock: EventClock<u32> = EventClock::new();
    assert_eq!(clock.now(), 0.0);
    assert!(clock.is_idle());
    assert_eq!(clock.peek_time(), None);
}

#[test]
fn test_earlier_events_resume_first() {
    let mut clock = EventClock::new();
    clock.schedule_at(60.0, "wash").unwrap();
    clock.schedule_at(10.0, "inspect").unwrap();
    clock.schedule_at(120.0, "build").unwrap();

    let order: Vec<&str> = std::iter::from_fn(|| clock.pop_next().map(|(_, p)| p)).collect();
    assert_eq!(order, vec!["inspect", "wash", "build"]);
    assert_eq!(clock.now(), 120.0);
}

#[test]
fn test_same_instant_resumes_in_scheduling_order() {
    let mut clock = EventClock::new();
    for n in 0..10 {
        clock.schedule_at(5.0, n).unwrap();
    }

    let order: Vec<i32> = std::iter::from_fn(|| clock.pop_next().map(|(_, p)| p)).collect();
    assert_eq!(order, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_zero_delay_hop_runs_after_current_instant_events() {
    let mut clock = EventClock::new();
    clock.schedule_at(30.0, "release").unwrap();
    clock.schedule_at(30.0, "arrival").unwrap();

    // Resuming the release schedules a zero-length hop at the same instant
    let (time, first) = clock.pop_next().unwrap();
    assert_eq!(first, "release");
    clock.schedule_at(time, "redispatch").unwrap();

    assert_eq!(clock.pop_next(), Some((30.0, "arrival")));
    assert_eq!(clock.pop_next(), Some((30.0, "redispatch")));
}

#[test]
fn test_schedule_in_is_relative_to_now() {
    let mut clock = EventClock::new();
    clock.schedule_at(100.0, 1).unwrap();
    clock.pop_next();

    clock.schedule_in(20.0, 2).unwrap();
    assert_eq!(clock.peek_time(), Some(120.0));
}

#[test]
fn test_scheduling_in_the_past_is_refused() {
    let mut clock = EventClock::new();
    clock.schedule_at(50.0, ()).unwrap();
    clock.pop_next();

    assert_eq!(
        clock.schedule_at(49.0, ()),
        Err(ClockError::InThePast {
            requested: 49.0,
            now: 50.0
        })
    );
    assert!(clock.schedule_in(-1.0, ()).is_err());
}

#[test]
fn test_non_finite_time_is_refused() {
    let mut clock = EventClock::new();
    assert!(matches!(
        clock.schedule_at(f64::INFINITY, ()),
        Err(ClockError::NonFinite(_))
    ));
    assert!(matches!(
        clock.schedule_at(f64::NAN, ()),
        Err(ClockError::NonFinite(_))
    ));
    assert!(clock.is_idle());
}

#[test]
fn test_advance_to_never_goes_backwards() {
    let mut clock: EventClock<()> = EventClock::new();
    clock.advance_to(200.0).unwrap();
    assert_eq!(clock.now(), 200.0);

    assert!(clock.advance_to(150.0).is_err());
    assert_eq!(clock.now(), 200.0);
}
