//! Scheduler configuration.
//!
//! One explicit config struct per scheduler instance; no process-wide
//! mutable settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Segment file inside each disk bucket directory.
pub const SEGMENT_FILE: &str = "segment.dat";
/// Head-offset sidecar inside each disk bucket directory.
pub const HEAD_FILE: &str = "head.idx";
/// Persisted dedup fingerprints, relative to the job directory.
pub const SEEN_FILE: &str = "requests.seen";
/// Resume manifest, relative to the job directory.
pub const MANIFEST_FILE: &str = "frontier.json";
/// Subdirectory of the job directory holding per-domain bucket trees.
pub const QUEUES_DIR: &str = "queues";

/// Which storage class backs a priority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoragePolicy {
    /// Every bucket in memory, even with a job directory configured.
    Memory,
    /// Every bucket on disk (requires a job directory).
    Disk,
    /// Priorities strictly below the cutoff stay in memory; the rest spill
    /// to disk. Lower priority values are the more urgent ones, so this
    /// keeps the hot front of the crawl out of the filesystem.
    MemoryBelow(i32),
}

/// Per-instance scheduler configuration.
///
/// Without a `job_dir` there is no persistence at all: buckets are
/// memory-backed regardless of `storage`, the dedup set is not written out,
/// and a closed scheduler cannot be resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Base path for persistence ("job directory"). Absent = memory-only.
    pub job_dir: Option<PathBuf>,
    /// Priority-to-storage-class policy, effective only with a job_dir.
    pub storage: StoragePolicy,
    /// Persist dedup fingerprints under the job_dir.
    pub persist_seen: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            job_dir: None,
            storage: StoragePolicy::Disk,
            persist_seen: true,
        }
    }
}

impl SchedulerConfig {
    /// Config with persistence rooted at `job_dir`.
    pub fn with_job_dir<P: Into<PathBuf>>(job_dir: P) -> Self {
        Self {
            job_dir: Some(job_dir.into()),
            ..Self::default()
        }
    }

    pub fn persistence_enabled(&self) -> bool {
        self.job_dir.is_some()
    }

    /// Whether a bucket at `priority` is disk-backed under this config.
    pub fn priority_on_disk(&self, priority: i32) -> bool {
        if self.job_dir.is_none() {
            return false;
        }
        match self.storage {
            StoragePolicy::Memory => false,
            StoragePolicy::Disk => true,
            StoragePolicy::MemoryBelow(cutoff) => priority >= cutoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_only_without_job_dir() {
        let config = SchedulerConfig::default();
        assert!(!config.persistence_enabled());
        assert!(!config.priority_on_disk(0));
    }

    #[test]
    fn test_priority_cutoff() {
        let mut config = SchedulerConfig::with_job_dir("/tmp/job");
        config.storage = StoragePolicy::MemoryBelow(2);
        assert!(!config.priority_on_disk(0));
        assert!(!config.priority_on_disk(1));
        assert!(config.priority_on_disk(2));
        assert!(config.priority_on_disk(100));
    }
}
