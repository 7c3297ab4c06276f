//! Plant policies
//!
//! Policies are plain configuration values consulted by the stage engine and
//! the coordinator:
//!
//! 1. **DispatchPolicy** (`FIFO`, `LIFO`): which queued job leaves next
//! 2. **ReworkPlacement** (`QUEUE_FIRST`, `QUEUE_LAST`): where rework jobs
//!    enter the Build queue
//! 3. **JobSplitPolicy** (`EQUAL_SPLIT`, `MAX_PACK`, fallback `Single`):
//!    how a patient's items are cut into pallets

pub mod dispatch;
pub mod splitting;

pub use dispatch::{DispatchPolicy, QueuePosition, ReworkPlacement};
pub use splitting::JobSplitPolicy;
