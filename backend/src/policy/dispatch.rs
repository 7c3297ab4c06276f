//! Queue policies
//!
//! - [`DispatchPolicy`] selects which waiting job a freed processor takes.
//! - [`ReworkPlacement`] decides where a rework job enters the Build queue.
//!
//! Both are configuration values; the stage engine has a single code path
//! that consults them.

use serde::{Deserialize, Serialize};

/// Position at which a job is inserted into a stage queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePosition {
    Head,
    Tail,
}

/// Rule selecting the next job to leave a stage queue
///
/// # Example
///
/// ```
/// use factory_simulator_core_rs::policy::DispatchPolicy;
///
/// assert_eq!(DispatchPolicy::Fifo.select_index(4), Some(0));
/// assert_eq!(DispatchPolicy::Lifo.select_index(4), Some(3));
/// assert_eq!(DispatchPolicy::Lifo.select_index(0), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispatchPolicy {
    /// Oldest job first (queue head)
    #[default]
    Fifo,
    /// Newest job first (queue tail)
    Lifo,
}

impl DispatchPolicy {
    /// Queue index to pop from a queue of `len` jobs
    pub fn select_index(self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        match self {
            DispatchPolicy::Fifo => Some(0),
            DispatchPolicy::Lifo => Some(len - 1),
        }
    }
}

/// Where rework jobs join the Build queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReworkPlacement {
    /// Ahead of every waiting job
    QueueFirst,
    /// Behind every waiting job
    #[default]
    QueueLast,
}

impl ReworkPlacement {
    pub fn position(self) -> QueuePosition {
        match self {
            ReworkPlacement::QueueFirst => QueuePosition::Head,
            ReworkPlacement::QueueLast => QueuePosition::Tail,
        }
    }
}
