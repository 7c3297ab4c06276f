//! Integration tests for the Orchestrator
//!
//! Full runs through Build → Wash → Dry → Inspect with manual and periodic
//! order arrivals.

use factory_simulator_core_rs::arrivals::OrderSourceConfig;
use factory_simulator_core_rs::{
    Event, Orchestrator, PatientId, SimulationConfig, StageId,
};
use std::collections::HashSet;

fn manual_config() -> SimulationConfig {
    SimulationConfig {
        order_source: None,
        ..SimulationConfig::default()
    }
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_single_job_makespan_540() {
    let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
    let order_id = orchestrator.submit_order(&[30]).unwrap();

    let summary = orchestrator.run().unwrap();

    let order = orchestrator.state().order(order_id).unwrap();
    assert_eq!(order.time_start(), 0.0);
    assert_eq!(order.time_end(), Some(540.0));
    assert_eq!(order.makespan(), Some(540.0));

    assert_eq!(orchestrator.event_log().events_of_type("JobCreated").len(), 1);
    assert_eq!(summary.orders_completed, 1);
    assert_eq!(summary.jobs_processed, 4);
    assert_eq!(summary.average_makespan, Some(540.0));
    assert_eq!(orchestrator.state().num_jobs_in_flight(), 0);
}

#[test]
fn test_equal_split_creates_three_jobs_of_40() {
    let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
    orchestrator.submit_order(&[120]).unwrap();

    let sizes: Vec<usize> = orchestrator
        .event_log()
        .events_of_type("JobCreated")
        .iter()
        .filter_map(|e| match e {
            Event::JobCreated { num_items, .. } => Some(*num_items),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![40, 40, 40]);

    orchestrator.run().unwrap();
    assert_eq!(orchestrator.summary().jobs_processed, 12);
    assert_eq!(orchestrator.completed_orders().len(), 1);
}

#[test]
fn test_order_submitted_mid_run_starts_at_submission() {
    let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
    orchestrator.run_until(1000.0).unwrap();
    let order_id = orchestrator.submit_order(&[10]).unwrap();
    orchestrator.run().unwrap();

    let order = orchestrator.state().order(order_id).unwrap();
    assert_eq!(order.time_start(), 1000.0);
    assert_eq!(order.makespan(), Some(120.0 + 60.0 + 60.0 + 100.0));
}

// ============================================================================
// Periodic arrivals
// ============================================================================

#[test]
fn test_default_plant_two_weeks() {
    let mut orchestrator = Orchestrator::new(SimulationConfig::default()).unwrap();
    let summary = orchestrator.run().unwrap();

    // Arrivals at 0 and 10080; the one due at the horizon is not resumed
    assert_eq!(summary.orders_created, 2);
    assert_eq!(summary.orders_completed, 2);
    assert_eq!(summary.late_orders, 0);
    assert_eq!(orchestrator.now(), 20160.0);

    for order in orchestrator.state().orders() {
        assert_eq!(order.num_patients(), 5);
    }
    for patient in orchestrator.state().patients() {
        assert!((5..=10).contains(&patient.num_items()));
    }

    let arrivals: Vec<f64> = orchestrator
        .event_log()
        .events_of_type("OrderArrival")
        .iter()
        .map(|e| e.time())
        .collect();
    assert_eq!(arrivals, vec![0.0, 10080.0]);
}

#[test]
fn test_late_orders_flagged() {
    let mut orchestrator = Orchestrator::new(SimulationConfig {
        due_date_offset: 100.0,
        ..manual_config()
    })
    .unwrap();
    let order_id = orchestrator.submit_order(&[5]).unwrap();
    orchestrator.run().unwrap();

    let order = orchestrator.state().order(order_id).unwrap();
    assert_eq!(order.due_date(), 100.0);
    assert_eq!(order.is_late(), Some(true));
    assert_eq!(orchestrator.summary().late_orders, 1);
}

// ============================================================================
// Completion invariants
// ============================================================================

#[test]
fn test_patients_and_orders_complete_exactly_once() {
    let mut orchestrator = Orchestrator::new(SimulationConfig {
        seed: 21,
        horizon: 5.0 * 24.0 * 60.0,
        order_source: Some(OrderSourceConfig {
            interval: 600.0,
            patients_per_order: (1, 4),
            items_per_patient: (5, 70),
        }),
        ..SimulationConfig::default()
    })
    .unwrap();
    orchestrator.run().unwrap();

    let mut completed_patients = HashSet::new();
    for event in orchestrator.event_log().events_of_type("PatientCompleted") {
        if let Event::PatientCompleted { patient_id, .. } = event {
            assert!(completed_patients.insert(*patient_id));
        }
    }

    let state = orchestrator.state();
    for patient in state.patients() {
        let all_items_done = patient
            .items()
            .iter()
            .all(|i| state.item(*i).unwrap().is_completed());
        assert_eq!(patient.is_completed(), all_items_done);
        assert_eq!(patient.is_completed(), completed_patients.contains(&patient.id()));
    }

    let mut completed_orders = HashSet::new();
    for event in orchestrator.event_log().events_of_type("OrderCompleted") {
        if let Event::OrderCompleted { order_id, .. } = event {
            assert!(completed_orders.insert(*order_id));
        }
    }
    for order in state.orders() {
        let all_patients_done = order
            .patients()
            .iter()
            .all(|p: &PatientId| state.patient(*p).unwrap().is_completed());
        assert_eq!(order.is_completed(), all_patients_done);
        if let Some(end) = order.time_end() {
            assert!(end >= order.time_start());
        }
    }
    assert!(!completed_orders.is_empty());
}

#[test]
fn test_event_times_never_decrease() {
    let mut orchestrator = Orchestrator::new(SimulationConfig {
        defect_probability: 0.1,
        defect_batch_size: 5,
        ..SimulationConfig::default()
    })
    .unwrap();
    orchestrator.run().unwrap();

    let times: Vec<f64> = orchestrator.event_log().events().iter().map(|e| e.time()).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_stage_visit_event_sequence_per_job() {
    let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
    orchestrator.submit_order(&[10]).unwrap();
    orchestrator.run().unwrap();

    let job_id = orchestrator.completed_jobs()[0].id();
    let kinds: Vec<(&str, Option<StageId>)> = orchestrator
        .event_log()
        .events_for_job(job_id)
        .iter()
        .map(|e| (e.event_type(), e.stage()))
        .collect();

    let mut expected = vec![("JobCreated", None)];
    for stage in StageId::ALL {
        expected.push(("JobQueued", Some(stage)));
        expected.push(("JobDispatched", Some(stage)));
        expected.push(("JobReleased", Some(stage)));
    }
    assert_eq!(kinds, expected);
}

#[test]
fn test_step_until_idle_without_order_source() {
    let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
    orchestrator.submit_order(&[2]).unwrap();

    let mut steps = 0;
    while orchestrator.step().unwrap().is_some() {
        steps += 1;
    }

    assert!(steps > 0);
    assert_eq!(orchestrator.pending_events(), 0);
    assert_eq!(orchestrator.now(), 120.0 + 60.0 + 60.0 + 20.0);
    assert_eq!(orchestrator.completed_orders().len(), 1);
}
