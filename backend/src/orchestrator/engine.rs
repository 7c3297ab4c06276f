//! Orchestrator Engine
//!
//! Main simulation loop integrating all components:
//! - Order arrivals (deterministic generation)
//! - Job formation and defect batching (coordinator)
//! - Stage queues, dispatch and processor holds
//! - Transition hooks (defect marking, routing, inspection)
//! - Event logging (complete simulation history)
//!
//! # Architecture
//!
//! Every suspended unit of work is a [`Resumption`] registered with the
//! [`EventClock`]. The loop pops one resumption at a time and runs it to its
//! next suspension point:
//!
//! ```text
//! OrderArrival      → generate order → coordinator → Build queue → reschedule
//! HoldComplete      → release machine → hook → route / retire → Redispatch
//! ItemStep(i)       → inspect item i → next ItemStep or release
//! Redispatch(stage) → dispatch freed slots of that stage
//! ```
//!
//! Enqueueing a job triggers dispatch immediately. Releasing a processor
//! triggers dispatch through a zero-length `Redispatch` hop, so releases and
//! arrivals at the same instant are served in scheduling order.
//!
//! # Example
//!
//! ```rust
//! use factory_simulator_core_rs::orchestrator::{Orchestrator, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     order_source: None,
//!     ..SimulationConfig::default()
//! };
//!
//! let mut orchestrator = Orchestrator::new(config).unwrap();
//! let order_id = orchestrator.submit_order(&[30]).unwrap();
//! orchestrator.run().unwrap();
//!
//! let order = orchestrator.state().order(order_id).unwrap();
//! assert_eq!(order.makespan(), Some(540.0));
//! ```

use crate::arrivals::{OrderSource, OrderSourceConfig};
use crate::coordinator::{Coordinator, CoordinatorConfig};
use crate::core::time::{ClockError, EventClock};
use crate::models::{
    Event, EventLog, ItemId, Job, JobId, ModelError, Order, OrderId, ProcessorKind, SimulationState,
};
use crate::policy::{DispatchPolicy, JobSplitPolicy, QueuePosition, ReworkPlacement};
use crate::process::{Stage, StageId, TransitionHook};
use crate::rng::RngManager;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

// ============================================================================
// Configuration Types
// ============================================================================

/// Stage served by identical machines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStageConfig {
    pub num_machines: usize,

    /// Jobs one machine holds at once
    pub capacity: usize,

    /// Minutes per job, independent of job size
    pub processing_time: f64,
}

impl MachineStageConfig {
    /// Three printers, two jobs each, 120 minutes per job
    pub fn build_default() -> Self {
        Self {
            num_machines: 3,
            capacity: 2,
            processing_time: 120.0,
        }
    }

    /// One washer or dryer, two jobs at once, 60 minutes per job
    pub fn wash_default() -> Self {
        Self {
            num_machines: 1,
            capacity: 2,
            processing_time: 60.0,
        }
    }

    pub fn dry_default() -> Self {
        Self::wash_default()
    }

    fn validate(&self, stage: StageId) -> Result<(), SimulationError> {
        if self.num_machines == 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "{}: num_machines must be positive",
                stage
            )));
        }
        if self.capacity == 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "{}: capacity must be positive",
                stage
            )));
        }
        if !(self.processing_time.is_finite() && self.processing_time > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "{}: processing_time must be positive, got {}",
                stage, self.processing_time
            )));
        }
        Ok(())
    }
}

/// Machine stage fields as read from configuration; absent fields keep
/// the stage's default
#[derive(Debug, Deserialize)]
struct MachineStageOverrides {
    num_machines: Option<usize>,
    capacity: Option<usize>,
    processing_time: Option<f64>,
}

impl MachineStageOverrides {
    fn apply(self, base: MachineStageConfig) -> MachineStageConfig {
        MachineStageConfig {
            num_machines: self.num_machines.unwrap_or(base.num_machines),
            capacity: self.capacity.unwrap_or(base.capacity),
            processing_time: self.processing_time.unwrap_or(base.processing_time),
        }
    }
}

fn build_stage<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MachineStageConfig, D::Error> {
    MachineStageOverrides::deserialize(deserializer).map(|o| o.apply(MachineStageConfig::build_default()))
}

fn wash_stage<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MachineStageConfig, D::Error> {
    MachineStageOverrides::deserialize(deserializer).map(|o| o.apply(MachineStageConfig::wash_default()))
}

fn dry_stage<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MachineStageConfig, D::Error> {
    MachineStageOverrides::deserialize(deserializer).map(|o| o.apply(MachineStageConfig::dry_default()))
}

/// Stage served by single-job workers processing item by item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectStageConfig {
    pub num_workers: usize,

    /// Minutes per item
    pub processing_time_per_item: f64,
}

impl Default for InspectStageConfig {
    fn default() -> Self {
        Self {
            num_workers: 5,
            processing_time_per_item: 10.0,
        }
    }
}

/// Complete simulation configuration
///
/// `Default` reproduces the reference plant: three printers, one washer,
/// one dryer, five inspectors, weekly orders over a two-week horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated minutes to run for
    pub horizon: f64,

    /// RNG seed for deterministic simulation
    pub seed: u64,

    #[serde(deserialize_with = "build_stage")]
    pub build: MachineStageConfig,
    #[serde(deserialize_with = "wash_stage")]
    pub wash: MachineStageConfig,
    #[serde(deserialize_with = "dry_stage")]
    pub dry: MachineStageConfig,
    pub inspect: InspectStageConfig,

    /// Maximum items per job
    pub pallet_size_limit: usize,

    /// Probability that Build flags an item as defective
    pub defect_probability: f64,

    /// Defective items per rework job
    pub defect_batch_size: usize,

    pub dispatch_policy: DispatchPolicy,
    pub rework_placement: ReworkPlacement,
    pub split_policy: JobSplitPolicy,

    /// Minutes from order creation to its due date
    pub due_date_offset: f64,

    /// Periodic order generation (None = orders are submitted manually)
    pub order_source: Option<OrderSourceConfig>,

    /// Record the structured event log
    pub event_logging: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon: 14.0 * MINUTES_PER_DAY,
            seed: 42,
            build: MachineStageConfig::build_default(),
            wash: MachineStageConfig::wash_default(),
            dry: MachineStageConfig::dry_default(),
            inspect: InspectStageConfig::default(),
            pallet_size_limit: 50,
            defect_probability: 0.0,
            defect_batch_size: 20,
            dispatch_policy: DispatchPolicy::Fifo,
            rework_placement: ReworkPlacement::QueueLast,
            split_policy: JobSplitPolicy::EqualSplit,
            due_date_offset: 7.0 * MINUTES_PER_DAY,
            order_source: Some(OrderSourceConfig::default()),
            event_logging: true,
        }
    }
}

impl SimulationConfig {
    /// Parse a JSON configuration and validate it
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        let config: SimulationConfig = serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidConfig(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on values that would corrupt a run
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "horizon must be positive, got {}",
                self.horizon
            )));
        }

        self.build.validate(StageId::Build)?;
        self.wash.validate(StageId::Wash)?;
        self.dry.validate(StageId::Dry)?;

        if self.inspect.num_workers == 0 {
            return Err(SimulationError::InvalidConfig(
                "Proc_Inspect: num_workers must be positive".to_string(),
            ));
        }
        if !(self.inspect.processing_time_per_item.is_finite()
            && self.inspect.processing_time_per_item > 0.0)
        {
            return Err(SimulationError::InvalidConfig(format!(
                "Proc_Inspect: processing_time_per_item must be positive, got {}",
                self.inspect.processing_time_per_item
            )));
        }

        if self.pallet_size_limit == 0 {
            return Err(SimulationError::InvalidConfig(
                "pallet_size_limit must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.defect_probability) {
            return Err(SimulationError::InvalidConfig(format!(
                "defect_probability must be within [0, 1], got {}",
                self.defect_probability
            )));
        }
        if self.defect_batch_size == 0 {
            return Err(SimulationError::InvalidConfig(
                "defect_batch_size must be positive".to_string(),
            ));
        }
        if !(self.due_date_offset.is_finite() && self.due_date_offset >= 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "due_date_offset must be non-negative, got {}",
                self.due_date_offset
            )));
        }

        if let Some(source) = &self.order_source {
            source.validate().map_err(SimulationError::InvalidConfig)?;
        }

        Ok(())
    }
}

// ============================================================================
// Errors and reports
// ============================================================================

/// Simulation error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Configuration validation error
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Entity invariant refused by the model
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Resumption requested before the current time
    #[error("Clock error: {0}")]
    TimeWentBackwards(#[from] ClockError),
}

/// Utilisation of one processor at the current time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorReport {
    pub stage: StageId,
    pub processor_id: usize,
    pub name: String,
    pub busy_time: f64,
    pub utilization: f64,
}

/// End-of-run figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub time: f64,
    pub orders_created: usize,
    pub orders_completed: usize,
    pub late_orders: usize,
    /// Stage visits completed (one job counts once per stage)
    pub jobs_processed: usize,
    /// Defective items found at inspection, counting repeats
    pub defective_items: usize,
    pub rework_jobs_created: usize,
    pub average_makespan: Option<f64>,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Suspended unit of work waiting on the clock
#[derive(Debug, Clone, Copy, PartialEq)]
enum Resumption {
    /// Next order from the order source
    OrderArrival,
    /// A machine finished holding a job
    HoldComplete {
        stage: StageId,
        processor_index: usize,
        job_id: JobId,
    },
    /// A worker finished the item at `position` of a job
    ItemStep {
        stage: StageId,
        processor_index: usize,
        job_id: JobId,
        position: usize,
    },
    /// Zero-length hop from a release to the stage's next dispatch
    Redispatch { stage: StageId },
}

/// Main orchestrator owning all simulation state and the event loop
///
/// # Determinism
///
/// All randomness is via one seeded xorshift64* stream, drawn in event
/// order. Same seed + same config = identical results.
pub struct Orchestrator {
    config: SimulationConfig,

    clock: EventClock<Resumption>,

    rng: RngManager,

    /// Orders, patients, items and in-flight jobs
    state: SimulationState,

    /// One per [`StageId`], in pipeline order
    stages: Vec<Stage>,

    coordinator: Coordinator,

    order_source: Option<OrderSource>,

    event_log: EventLog,

    /// Snapshot of every job at every stage release
    completed_jobs: Vec<Job>,

    defective_items_found: usize,
}

impl Orchestrator {
    /// Create new orchestrator from configuration
    ///
    /// Validates the configuration before anything is built. With an order
    /// source configured, the first arrival is scheduled at time zero.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let stages = StageId::ALL
            .iter()
            .map(|&id| match id {
                StageId::Build => Self::machine_stage(id, &config.build, config.dispatch_policy),
                StageId::Wash => Self::machine_stage(id, &config.wash, config.dispatch_policy),
                StageId::Dry => Self::machine_stage(id, &config.dry, config.dispatch_policy),
                StageId::Inspect => Stage::with_workers(
                    id,
                    config.inspect.num_workers,
                    config.inspect.processing_time_per_item,
                    config.dispatch_policy,
                ),
            })
            .collect();

        let coordinator = Coordinator::new(CoordinatorConfig {
            pallet_size_limit: config.pallet_size_limit,
            split_policy: config.split_policy,
            defect_batch_size: config.defect_batch_size,
            rework_placement: config.rework_placement,
        });

        let mut clock = EventClock::new();
        let order_source = config.order_source.clone().map(OrderSource::new);
        if order_source.is_some() {
            clock.schedule_at(0.0, Resumption::OrderArrival)?;
        }

        Ok(Self {
            rng: RngManager::new(config.seed),
            config,
            clock,
            state: SimulationState::new(),
            stages,
            coordinator,
            order_source,
            event_log: EventLog::new(),
            completed_jobs: Vec::new(),
            defective_items_found: 0,
        })
    }

    fn machine_stage(id: StageId, config: &MachineStageConfig, policy: DispatchPolicy) -> Stage {
        Stage::with_machines(
            id,
            config.num_machines,
            config.capacity,
            config.processing_time,
            policy,
        )
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current simulation time
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn horizon(&self) -> f64 {
        self.config.horizon
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn stage(&self, id: StageId) -> &Stage {
        &self.stages[id.index()]
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Job snapshots taken at each stage release, in release order
    pub fn completed_jobs(&self) -> &[Job] {
        &self.completed_jobs
    }

    /// Completed orders in completion order
    pub fn completed_orders(&self) -> Vec<&Order> {
        self.coordinator
            .completed_orders()
            .iter()
            .filter_map(|id| self.state.order(*id).ok())
            .collect()
    }

    /// Number of resumptions waiting on the clock
    pub fn pending_events(&self) -> usize {
        self.clock.pending()
    }

    pub fn processor_reports(&self) -> Vec<ProcessorReport> {
        let now = self.now();
        self.stages
            .iter()
            .flat_map(|stage| {
                stage.processors().iter().map(move |p| ProcessorReport {
                    stage: stage.id(),
                    processor_id: p.id(),
                    name: p.name().to_string(),
                    busy_time: p.busy_time_at(now),
                    utilization: p.utilization(now),
                })
            })
            .collect()
    }

    pub fn summary(&self) -> SimulationSummary {
        let completed = self.completed_orders();
        let makespans: Vec<f64> = completed.iter().filter_map(|o| o.makespan()).collect();
        let average_makespan = if makespans.is_empty() {
            None
        } else {
            Some(makespans.iter().sum::<f64>() / makespans.len() as f64)
        };

        SimulationSummary {
            time: self.now(),
            orders_created: self.state.num_orders(),
            orders_completed: completed.len(),
            late_orders: completed
                .iter()
                .filter(|o| o.is_late() == Some(true))
                .count(),
            jobs_processed: self.completed_jobs.len(),
            defective_items: self.defective_items_found,
            rework_jobs_created: self.coordinator.rework_jobs_created(),
            average_makespan,
        }
    }

    fn log_event(&mut self, event: Event) {
        if self.config.event_logging {
            self.event_log.log(event);
        }
    }

    // ========================================================================
    // Driving the clock
    // ========================================================================

    /// Build an order with explicit per-patient item counts at the current
    /// time and hand it to the coordinator
    pub fn submit_order(&mut self, items_per_patient: &[usize]) -> Result<OrderId, SimulationError> {
        if items_per_patient.is_empty() || items_per_patient.contains(&0) {
            return Err(SimulationError::InvalidConfig(format!(
                "an order needs at least one patient and every patient at least one item, got {:?}",
                items_per_patient
            )));
        }

        let order_id =
            self.state
                .create_order(items_per_patient, self.now(), self.config.due_date_offset);
        self.accept_order(order_id)?;
        Ok(order_id)
    }

    /// Resume exactly one pending event
    ///
    /// Returns the time of the resumed event, or `None` if nothing is pending.
    pub fn step(&mut self) -> Result<Option<f64>, SimulationError> {
        let Some((time, resumption)) = self.clock.pop_next() else {
            return Ok(None);
        };

        match resumption {
            Resumption::OrderArrival => self.handle_order_arrival()?,
            Resumption::HoldComplete {
                stage,
                processor_index,
                job_id,
            } => self.release(stage, processor_index, job_id)?,
            Resumption::ItemStep {
                stage,
                processor_index,
                job_id,
                position,
            } => self.handle_item_step(stage, processor_index, job_id, position)?,
            Resumption::Redispatch { stage } => self.dispatch(stage)?,
        }

        Ok(Some(time))
    }

    /// Resume every event due strictly before `until`, then move the clock
    /// to `until`
    pub fn run_until(&mut self, until: f64) -> Result<(), SimulationError> {
        while let Some(next) = self.clock.peek_time() {
            if next >= until {
                break;
            }
            self.step()?;
        }
        self.clock.advance_to(until)?;
        Ok(())
    }

    /// Run to the configured horizon
    pub fn run(&mut self) -> Result<SimulationSummary, SimulationError> {
        self.run_until(self.config.horizon)?;
        let summary = self.summary();
        log::debug!(
            "run finished at {}: {}/{} orders completed, {} stage visits, {} rework jobs",
            summary.time,
            summary.orders_completed,
            summary.orders_created,
            summary.jobs_processed,
            summary.rework_jobs_created
        );
        Ok(summary)
    }

    // ========================================================================
    // Resumption handlers
    // ========================================================================

    fn handle_order_arrival(&mut self) -> Result<(), SimulationError> {
        let Some(source) = &self.order_source else {
            return Ok(());
        };

        let now = self.now();
        let interval = source.interval();
        let order_id = source.generate(
            &mut self.state,
            &mut self.rng,
            now,
            self.config.due_date_offset,
        );
        self.accept_order(order_id)?;

        self.clock.schedule_in(interval, Resumption::OrderArrival)?;
        Ok(())
    }

    /// Log an order, split it into jobs and enqueue them to Build
    fn accept_order(&mut self, order_id: OrderId) -> Result<(), SimulationError> {
        let now = self.now();
        let order = self.state.order(order_id)?;
        let num_patients = order.num_patients();
        let mut num_items = 0;
        for patient_id in order.patients() {
            num_items += self.state.patient(*patient_id)?.num_items();
        }

        self.log_event(Event::OrderArrival {
            time: now,
            order_id,
            num_patients,
            num_items,
        });
        log::debug!(
            "t={}: {} arrived with {} patients, {} items",
            now,
            order_id,
            num_patients,
            num_items
        );

        let job_ids = self
            .coordinator
            .receive_order(order_id, &mut self.state, now)?;

        for &job_id in &job_ids {
            let num_items = self.state.job(job_id)?.num_items();
            self.log_event(Event::JobCreated {
                time: now,
                job_id,
                order_id: Some(order_id),
                num_items,
                is_rework: false,
            });
        }
        for job_id in job_ids {
            self.send_to_stage(StageId::Build, job_id, QueuePosition::Tail)?;
        }
        Ok(())
    }

    /// Enqueue a job and attempt dispatch at once
    fn send_to_stage(
        &mut self,
        stage: StageId,
        job_id: JobId,
        position: QueuePosition,
    ) -> Result<(), SimulationError> {
        let now = self.now();
        self.state.job_mut(job_id)?.stamp_queued(stage, now);
        let queue_length = self.stages[stage.index()].insert(job_id, position, now);

        self.log_event(Event::JobQueued {
            time: now,
            job_id,
            stage,
            queue_length,
        });

        self.dispatch(stage)
    }

    /// Seize free processors for queued jobs and schedule their holds
    fn dispatch(&mut self, stage: StageId) -> Result<(), SimulationError> {
        let now = self.now();
        let assignments = self.stages[stage.index()].dispatch(now)?;

        for assignment in assignments {
            let processor = self.stages[stage.index()]
                .processor(assignment.processor_index)
                .ok_or_else(|| ModelError::JobNotOnProcessor {
                    job: assignment.job_id,
                    processor: format!("{}#{}", stage, assignment.processor_index),
                })?;
            let processor_id = processor.id();
            let processor_name = processor.name().to_string();
            let kind = processor.kind();
            let processing_time = processor.processing_time();

            self.state.job_mut(assignment.job_id)?.stamp_dispatched(
                stage,
                processor_id,
                &processor_name,
                now,
            );
            self.log_event(Event::JobDispatched {
                time: now,
                job_id: assignment.job_id,
                stage,
                processor_id,
                processor_name,
            });

            let resumption = match kind {
                ProcessorKind::Machine => Resumption::HoldComplete {
                    stage,
                    processor_index: assignment.processor_index,
                    job_id: assignment.job_id,
                },
                ProcessorKind::Worker => Resumption::ItemStep {
                    stage,
                    processor_index: assignment.processor_index,
                    job_id: assignment.job_id,
                    position: 0,
                },
            };
            self.clock.schedule_in(processing_time, resumption)?;
        }

        Ok(())
    }

    /// Inspect one item; continue with the next or release the job
    fn handle_item_step(
        &mut self,
        stage: StageId,
        processor_index: usize,
        job_id: JobId,
        position: usize,
    ) -> Result<(), SimulationError> {
        let now = self.now();
        let job = self.state.job(job_id)?;
        let num_items = job.num_items();
        let item_id = job
            .items()
            .get(position)
            .copied()
            .ok_or(ModelError::ItemOutOfRange {
                job: job_id,
                position,
                num_items,
            })?;

        let item = self.state.item_mut(item_id)?;
        if !item.is_defect() {
            item.mark_completed()?;
            let patient_id = item.patient_id();
            let order_id = item.order_id();
            if self.state.refresh_patient_completion(patient_id)? {
                self.log_event(Event::PatientCompleted {
                    time: now,
                    patient_id,
                    order_id,
                });
            }
        }

        if position + 1 < num_items {
            let processing_time = self.stages[stage.index()]
                .processor(processor_index)
                .map(|p| p.processing_time())
                .ok_or_else(|| ModelError::JobNotOnProcessor {
                    job: job_id,
                    processor: format!("{}#{}", stage, processor_index),
                })?;
            self.clock.schedule_in(
                processing_time,
                Resumption::ItemStep {
                    stage,
                    processor_index,
                    job_id,
                    position: position + 1,
                },
            )?;
            Ok(())
        } else {
            self.release(stage, processor_index, job_id)
        }
    }

    /// Close the stage visit, apply the stage's hook and schedule redispatch
    fn release(
        &mut self,
        stage: StageId,
        processor_index: usize,
        job_id: JobId,
    ) -> Result<(), SimulationError> {
        let now = self.now();
        self.state.job_mut(job_id)?.stamp_released(now)?;
        self.stages[stage.index()].release(processor_index, job_id, now)?;

        let processor_id = self.stages[stage.index()]
            .processor(processor_index)
            .map(|p| p.id())
            .ok_or_else(|| ModelError::JobNotOnProcessor {
                job: job_id,
                processor: format!("{}#{}", stage, processor_index),
            })?;
        self.log_event(Event::JobReleased {
            time: now,
            job_id,
            stage,
            processor_id,
        });

        match stage.hook() {
            TransitionHook::MarkDefects { next } => {
                self.mark_defects(job_id)?;
                self.completed_jobs.push(self.state.job(job_id)?.clone());
                self.send_to_stage(next, job_id, QueuePosition::Tail)?;
            }
            TransitionHook::Route { next } => {
                self.completed_jobs.push(self.state.job(job_id)?.clone());
                self.send_to_stage(next, job_id, QueuePosition::Tail)?;
            }
            TransitionHook::Inspect => {
                let job = self.state.retire_job(job_id)?;
                let defective = self.defective_items(&job)?;
                self.completed_jobs.push(job);

                if !defective.is_empty() {
                    self.handle_defects(job_id, &defective)?;
                }
                self.check_active_orders()?;
            }
        }

        self.clock
            .schedule_at(now, Resumption::Redispatch { stage })?;
        Ok(())
    }

    /// Items of `job` flagged defective, in job order
    fn defective_items(&self, job: &Job) -> Result<Vec<ItemId>, ModelError> {
        let mut defective = Vec::new();
        for &item_id in job.items() {
            if self.state.item(item_id)?.is_defect() {
                defective.push(item_id);
            }
        }
        Ok(defective)
    }

    /// One Bernoulli draw per item of the job
    fn mark_defects(&mut self, job_id: JobId) -> Result<(), SimulationError> {
        let probability = self.config.defect_probability;
        let items = self.state.job(job_id)?.items().to_vec();

        let mut num_defects = 0;
        for item_id in items {
            if self.rng.bernoulli(probability) {
                self.state.item_mut(item_id)?.mark_defect();
                num_defects += 1;
            }
        }

        if num_defects > 0 {
            let now = self.now();
            self.log_event(Event::DefectsMarked {
                time: now,
                job_id,
                num_defects,
            });
        }
        Ok(())
    }

    /// Report defects to the coordinator and enqueue any rework jobs
    fn handle_defects(&mut self, job_id: JobId, defective: &[ItemId]) -> Result<(), SimulationError> {
        let now = self.now();
        self.defective_items_found += defective.len();

        let rework_jobs = self
            .coordinator
            .accumulate_defects(defective, &mut self.state)?;

        self.log_event(Event::DefectsFound {
            time: now,
            job_id,
            num_defects: defective.len(),
            buffer_size: self.coordinator.defect_buffer().len(),
        });

        let placement = self.coordinator.rework_placement();
        for rework_id in rework_jobs {
            let num_items = self.state.job(rework_id)?.num_items();
            self.log_event(Event::JobCreated {
                time: now,
                job_id: rework_id,
                order_id: None,
                num_items,
                is_rework: true,
            });
            self.log_event(Event::ReworkJobCreated {
                time: now,
                job_id: rework_id,
                num_items,
                placement,
            });
            log::debug!("t={}: {} ({} items) back to Build", now, rework_id, num_items);
            self.send_to_stage(StageId::Build, rework_id, placement.position())?;
        }
        Ok(())
    }

    fn check_active_orders(&mut self) -> Result<(), SimulationError> {
        let now = self.now();
        let active = self.coordinator.active_orders().to_vec();

        for order_id in active {
            if self
                .coordinator
                .check_order_completion(order_id, &mut self.state, now)?
            {
                let makespan = self.state.order(order_id)?.makespan().unwrap_or(0.0);
                self.log_event(Event::OrderCompleted {
                    time: now,
                    order_id,
                    makespan,
                });
                log::debug!("t={}: {} completed, makespan {}", now, order_id, makespan);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_config() -> SimulationConfig {
        SimulationConfig {
            order_source: None,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_orchestrator_creation() {
        let orchestrator = Orchestrator::new(manual_config()).unwrap();
        assert_eq!(orchestrator.now(), 0.0);
        assert_eq!(orchestrator.pending_events(), 0);
        assert_eq!(orchestrator.stage(StageId::Build).processors().len(), 3);
        assert_eq!(orchestrator.stage(StageId::Inspect).processors().len(), 5);
    }

    #[test]
    fn test_order_source_schedules_first_arrival() {
        let orchestrator = Orchestrator::new(SimulationConfig::default()).unwrap();
        assert_eq!(orchestrator.pending_events(), 1);
    }

    #[test]
    fn test_validate_config_zero_capacity() {
        let mut config = manual_config();
        config.wash.capacity = 0;
        assert!(matches!(
            Orchestrator::new(config),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_config_bad_probability() {
        let mut config = manual_config();
        config.defect_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_submit_order_rejects_empty_patient() {
        let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
        assert!(matches!(
            orchestrator.submit_order(&[3, 0]),
            Err(SimulationError::InvalidConfig(_))
        ));
        assert_eq!(orchestrator.state().num_orders(), 0);
    }

    #[test]
    fn test_step_resumes_one_event() {
        let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
        orchestrator.submit_order(&[10]).unwrap();

        assert_eq!(orchestrator.step().unwrap(), Some(120.0));
        assert_eq!(orchestrator.stage(StageId::Wash).processors()[0].occupancy(), 1);
    }

    #[test]
    fn test_step_on_idle_clock() {
        let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
        assert_eq!(orchestrator.step().unwrap(), None);
    }

    #[test]
    fn test_run_until_excludes_boundary() {
        let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
        orchestrator.submit_order(&[10]).unwrap();

        orchestrator.run_until(120.0).unwrap();
        assert_eq!(orchestrator.now(), 120.0);
        assert!(orchestrator.completed_jobs().is_empty());

        orchestrator.run_until(121.0).unwrap();
        assert_eq!(orchestrator.completed_jobs().len(), 1);
    }

    #[test]
    fn test_item_step_past_last_item_is_out_of_range() {
        let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
        orchestrator.submit_order(&[2]).unwrap();

        assert_eq!(
            orchestrator.handle_item_step(StageId::Inspect, 0, JobId(1), 5),
            Err(SimulationError::Model(ModelError::ItemOutOfRange {
                job: JobId(1),
                position: 5,
                num_items: 2,
            }))
        );
    }

    #[test]
    fn test_defective_items_surfaces_unknown_item() {
        let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
        orchestrator.submit_order(&[2]).unwrap();
        orchestrator.state.item_mut(ItemId(2)).unwrap().mark_defect();

        let job = Job::new(JobId(50), vec![ItemId(1), ItemId(2)]).unwrap();
        assert_eq!(orchestrator.defective_items(&job), Ok(vec![ItemId(2)]));

        let dangling = Job::new(JobId(51), vec![ItemId(1), ItemId(99)]).unwrap();
        assert_eq!(
            orchestrator.defective_items(&dangling),
            Err(ModelError::UnknownItem(ItemId(99)))
        );
    }

    #[test]
    fn test_release_logs_processor_id() {
        let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
        orchestrator.submit_order(&[60]).unwrap();
        orchestrator.run().unwrap();

        let released: Vec<(StageId, usize)> = orchestrator
            .event_log()
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::JobReleased {
                    stage, processor_id, ..
                } => Some((*stage, *processor_id)),
                _ => None,
            })
            .collect();

        // Two pallets of 30: both on the first printer, then two inspectors
        assert_eq!(
            released,
            vec![
                (StageId::Build, 1),
                (StageId::Build, 1),
                (StageId::Wash, 1),
                (StageId::Wash, 1),
                (StageId::Dry, 1),
                (StageId::Dry, 1),
                (StageId::Inspect, 1),
                (StageId::Inspect, 2),
            ]
        );
    }

    #[test]
    fn test_run_until_past_is_error() {
        let mut orchestrator = Orchestrator::new(manual_config()).unwrap();
        orchestrator.run_until(50.0).unwrap();
        assert!(matches!(
            orchestrator.run_until(10.0),
            Err(SimulationError::TimeWentBackwards(_))
        ));
    }
}
