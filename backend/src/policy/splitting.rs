//! Order-to-job splitting policies
//!
//! A patient's items are cut into pallets before entering Build.
//!
//! - **EqualSplit**: `n = ceil(N / P)` jobs; the first `n - 1` get
//!   `N / n` items each, the last absorbs the remainder
//! - **MaxPack**: full pallets of `P`, the last holds what is left
//! - **Single**: one job whatever the size (fallback for unknown policies)
//!
//! A patient with `N <= P` items always yields one job.

use serde::{Deserialize, Serialize};

/// Policy for cutting a patient's items into jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobSplitPolicy {
    #[default]
    EqualSplit,
    MaxPack,
    /// Degenerate fallback: no splitting, oversized jobs allowed
    #[serde(other)]
    Single,
}

impl JobSplitPolicy {
    /// Parse a configured policy name; unrecognised names fall back to `Single`
    ///
    /// # Example
    ///
    /// ```
    /// use factory_simulator_core_rs::policy::JobSplitPolicy;
    ///
    /// assert_eq!(JobSplitPolicy::from_name("MAX_PACK"), JobSplitPolicy::MaxPack);
    /// assert_eq!(JobSplitPolicy::from_name("ROUND_ROBIN"), JobSplitPolicy::Single);
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name {
            "EQUAL_SPLIT" => JobSplitPolicy::EqualSplit,
            "MAX_PACK" => JobSplitPolicy::MaxPack,
            other => {
                log::warn!("unknown job split policy {other:?}, using a single job per patient");
                JobSplitPolicy::Single
            }
        }
    }

    /// Sizes of the jobs cut from `num_items` items with pallet limit `limit`
    ///
    /// Returns no chunks for zero items.
    ///
    /// # Panics
    /// Panics if `limit` is zero (rejected by configuration validation)
    pub fn chunk_sizes(self, num_items: usize, limit: usize) -> Vec<usize> {
        assert!(limit > 0, "pallet limit must be positive");

        if num_items == 0 {
            return Vec::new();
        }
        if num_items <= limit {
            return vec![num_items];
        }

        match self {
            JobSplitPolicy::EqualSplit => {
                let num_jobs = num_items.div_ceil(limit);
                let base = num_items / num_jobs;
                let mut sizes = vec![base; num_jobs - 1];
                sizes.push(num_items - base * (num_jobs - 1));
                sizes
            }
            JobSplitPolicy::MaxPack => {
                let mut sizes = vec![limit; num_items / limit];
                if num_items % limit != 0 {
                    sizes.push(num_items % limit);
                }
                sizes
            }
            JobSplitPolicy::Single => vec![num_items],
        }
    }

    /// Cut `items` into consecutive chunks, preserving order
    pub fn split<T: Clone>(self, items: &[T], limit: usize) -> Vec<Vec<T>> {
        let mut start = 0;
        self.chunk_sizes(items.len(), limit)
            .into_iter()
            .map(|size| {
                let chunk = items[start..start + size].to_vec();
                start += size;
                chunk
            })
            .collect()
    }
}
