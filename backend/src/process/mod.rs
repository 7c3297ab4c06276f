//! Pipeline stages
//!
//! Every stage runs the same queue + dispatch + seize/release engine
//! ([`Stage`]). What differs per pipeline position is captured by
//! [`StageId`]: its processor naming and its [`TransitionHook`], the side
//! effect applied when a job is released.
//!
//! ```text
//! Build ──▶ Wash ──▶ Dry ──▶ Inspect ──▶ (retired)
//!   ▲                           │
//!   └──── rework jobs ◀─────────┘  (via the coordinator's defect buffer)
//! ```

pub mod stage;

pub use stage::{Assignment, QueueSample, Stage};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageId {
    Build,
    Wash,
    Dry,
    Inspect,
}

/// Side effect applied when a job is released from a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionHook {
    /// Draw a defect outcome per item, then route onwards
    MarkDefects { next: StageId },
    /// Route onwards unchanged
    Route { next: StageId },
    /// Report defects to the coordinator, check order completion, retire the job
    Inspect,
}

impl StageId {
    /// All stages in pipeline order
    pub const ALL: [StageId; 4] = [StageId::Build, StageId::Wash, StageId::Dry, StageId::Inspect];

    /// Position in pipeline order
    pub fn index(self) -> usize {
        match self {
            StageId::Build => 0,
            StageId::Wash => 1,
            StageId::Dry => 2,
            StageId::Inspect => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StageId::Build => "Proc_Build",
            StageId::Wash => "Proc_Wash",
            StageId::Dry => "Proc_Dry",
            StageId::Inspect => "Proc_Inspect",
        }
    }

    /// Display name of the processor with 1-based id `id`
    pub fn processor_name(self, id: usize) -> String {
        match self {
            StageId::Build => format!("3DPrinter_{id}"),
            StageId::Wash => format!("Washer_{id}"),
            StageId::Dry => format!("Dryer_{id}"),
            StageId::Inspect => format!("Inspector_{id}"),
        }
    }

    pub fn hook(self) -> TransitionHook {
        match self {
            StageId::Build => TransitionHook::MarkDefects { next: StageId::Wash },
            StageId::Wash => TransitionHook::Route { next: StageId::Dry },
            StageId::Dry => TransitionHook::Route { next: StageId::Inspect },
            StageId::Inspect => TransitionHook::Inspect,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
