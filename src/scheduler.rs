//! Top-level request scheduler.
//!
//! The object the crawl engine talks to. On enqueue, a request is
//! fingerprinted and dropped if already seen, then routed into its domain's
//! priority queue, with disk or memory backing chosen per bucket by the
//! configured storage policy. On dequeue, domains rotate FIFO: the served
//! domain goes back to the tail of the rotation iff it still has pending
//! requests, which yields round-robin fairness across domains while each
//! domain internally serves strict priority order.
//!
//! Everything runs on one control thread and never blocks beyond local
//! file I/O. Backpressure is the caller's job: `len()` and
//! `has_pending_requests()` expose the pending count, but the scheduler
//! itself neither blocks nor rejects pushes based on size.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::config::{SchedulerConfig, MANIFEST_FILE, QUEUES_DIR, SEEN_FILE};
use crate::domainsch::{DomainScheduler, FifoDomainScheduler};
use crate::dupefilter::{request_fingerprint, DupeFilter, FilterError};
use crate::pqueue::{PriorityQueue, QueueFactory};
use crate::request::CrawlRequest;
use crate::squeue::{ByteQueue, DiskQueue, MemoryQueue, QueueError};
use crate::url_utils;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("dedup filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt resume manifest: {0}")]
    Manifest(String),
    #[error("scheduler is not open")]
    NotOpen,
    #[error("scheduler is already open")]
    AlreadyOpen,
    #[error("request has no schedulable domain: {0}")]
    InvalidRequest(String),
}

/// What `close()` left behind, per domain.
///
/// `resumable` priorities have their disk buckets intact under the job
/// directory and will be reloaded by the next `open()` at the same path.
/// `dropped` priorities were memory-backed buckets that still held requests;
/// their contents are gone. The split makes the memory-loss tradeoff
/// explicit instead of silent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloseReport {
    pub resumable: BTreeMap<String, Vec<i32>>,
    pub dropped: BTreeMap<String, Vec<i32>>,
}

impl CloseReport {
    /// True when nothing was pending anywhere at close time.
    pub fn is_clean(&self) -> bool {
        self.resumable.is_empty() && self.dropped.is_empty()
    }
}

/// Resume manifest persisted as `frontier.json` in the job directory.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ResumeManifest {
    domains: BTreeMap<String, Vec<i32>>,
}

pub struct Scheduler {
    config: SchedulerConfig,
    filter: DupeFilter,
    domains: Box<dyn DomainScheduler>,
    queues: HashMap<String, PriorityQueue>,
    open: bool,
}

impl Scheduler {
    /// Scheduler with the default FIFO domain rotation.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_domain_scheduler(config, Box::new(FifoDomainScheduler::new()))
    }

    /// Scheduler with a custom domain ordering policy.
    pub fn with_domain_scheduler(
        config: SchedulerConfig,
        domains: Box<dyn DomainScheduler>,
    ) -> Self {
        Self {
            config,
            filter: DupeFilter::new(),
            domains,
            queues: HashMap::new(),
            open: false,
        }
    }

    /// Transition CLOSED -> OPEN: load persisted fingerprints and reopen
    /// every disk bucket the last close recorded as non-empty.
    ///
    /// Disk errors and corruption fail the open; there is no silent
    /// fallback to memory-only mode.
    pub fn open(&mut self) -> Result<(), SchedulerError> {
        if self.open {
            return Err(SchedulerError::AlreadyOpen);
        }

        if let Some(job_dir) = self.config.job_dir.clone() {
            std::fs::create_dir_all(&job_dir)?;

            if self.config.persist_seen {
                self.filter = DupeFilter::open(job_dir.join(SEEN_FILE))?;
            }

            let manifest = self.read_manifest(&job_dir)?;
            for (domain, priorities) in manifest.domains {
                let factory = self.queue_factory(&domain);
                let queue = PriorityQueue::resume(factory, &priorities)?;
                if queue.is_empty() {
                    queue.close()?;
                    continue;
                }
                debug!(domain = %domain, pending = queue.len(), "resumed domain queue");
                self.domains.add_domain(&domain);
                self.queues.insert(domain, queue);
            }
        }

        self.open = true;
        info!(
            pending = self.len(),
            seen = self.filter.len(),
            persistent = self.config.persistence_enabled(),
            "scheduler opened"
        );
        Ok(())
    }

    fn read_manifest(&self, job_dir: &Path) -> Result<ResumeManifest, SchedulerError> {
        let path = job_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(ResumeManifest::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        serde_json::from_str(&raw)
            .map_err(|e| SchedulerError::Manifest(format!("{}: {}", path.display(), e)))
    }

    /// Bucket factory for one domain: disk-backed under
    /// `<job_dir>/queues/<domain>/<priority>` when the storage policy says
    /// so, memory-backed otherwise.
    fn queue_factory(&self, domain: &str) -> QueueFactory {
        let config = self.config.clone();
        let domain_dir = url_utils::fs_safe_domain(domain);
        Box::new(move |priority| {
            match (&config.job_dir, config.priority_on_disk(priority)) {
                (Some(job_dir), true) => {
                    let path = job_dir
                        .join(QUEUES_DIR)
                        .join(&domain_dir)
                        .join(priority.to_string());
                    Ok(Box::new(DiskQueue::open(path)?) as Box<dyn ByteQueue>)
                }
                _ => Ok(Box::new(MemoryQueue::new()) as Box<dyn ByteQueue>),
            }
        })
    }

    /// Enqueue a request unless its fingerprint was already seen.
    ///
    /// Returns `Ok(false)` for duplicates. The fingerprint is recorded only
    /// after the push succeeds, so a failed enqueue can be retried by the
    /// caller without being treated as a duplicate.
    pub fn enqueue_request(&mut self, request: &CrawlRequest) -> Result<bool, SchedulerError> {
        if !self.open {
            return Err(SchedulerError::NotOpen);
        }

        let fingerprint = request_fingerprint(request);
        if self.filter.seen(&fingerprint) {
            debug!(url = %request.url, "dropped duplicate request");
            return Ok(false);
        }

        let domain = request
            .scheduler_domain()
            .ok_or_else(|| SchedulerError::InvalidRequest(request.url.clone()))?;

        // Serialization failures surface here, before any queue mutation.
        let encoded = request.encode()?;

        if !self.queues.contains_key(&domain) {
            let factory = self.queue_factory(&domain);
            self.queues.insert(domain.clone(), PriorityQueue::new(factory));
        }
        let queue = self
            .queues
            .get_mut(&domain)
            .expect("queue ensured above");

        let was_empty = queue.is_empty();
        queue.push(&encoded, request.priority)?;
        if was_empty {
            self.domains.add_domain(&domain);
        }

        self.filter.add(fingerprint)?;
        trace!(url = %request.url, domain = %domain, priority = request.priority, "enqueued request");
        Ok(true)
    }

    /// Dequeue the next request, rotating across pending domains.
    pub fn next_request(&mut self) -> Result<Option<CrawlRequest>, SchedulerError> {
        if !self.open {
            return Err(SchedulerError::NotOpen);
        }

        loop {
            let domain = match self.domains.next_domain() {
                Some(d) => d,
                None => return Ok(None),
            };

            let queue = self
                .queues
                .get_mut(&domain)
                .expect("pending domain must have a queue");

            let record = match queue.pop() {
                Ok(record) => record,
                Err(e) => {
                    // The domain was already detached by next_domain; put it
                    // back so the registry keeps matching its pending work
                    // and the caller can retry.
                    self.domains.add_domain(&domain);
                    return Err(e.into());
                }
            };
            match record {
                Some(bytes) => {
                    if queue.is_empty() {
                        // Detached from the rotation already; close and drop
                        // so the domain re-registers on its next enqueue.
                        let queue = self
                            .queues
                            .remove(&domain)
                            .expect("queue present for served domain");
                        queue.close()?;
                        trace!(domain = %domain, "domain drained");
                    } else {
                        self.domains.add_domain(&domain);
                    }
                    let request = CrawlRequest::decode(&bytes)?;
                    return Ok(Some(request));
                }
                None => {
                    // Registry said pending but the queue is empty; repair
                    // the registry and keep rotating.
                    warn!(domain = %domain, "pending domain had empty queue");
                    let queue = self
                        .queues
                        .remove(&domain)
                        .expect("queue present for served domain");
                    queue.close()?;
                }
            }
        }
    }

    pub fn has_pending_requests(&self) -> bool {
        self.queues.values().any(|q| !q.is_empty())
    }

    /// Total pending requests across all domains. Backpressure surface for
    /// the engine; the scheduler never throttles on its own.
    pub fn len(&self) -> usize {
        self.queues.values().map(|q| q.len()).sum()
    }

    /// Drop a domain and everything it has pending. Disk buckets close with
    /// their contents intact (they will resume); memory buckets are lost.
    pub fn remove_domain(&mut self, domain: &str) -> Result<(), SchedulerError> {
        if !self.open {
            return Err(SchedulerError::NotOpen);
        }
        self.domains.remove_pending_domain(domain);
        if let Some(queue) = self.queues.remove(domain) {
            queue.close()?;
        }
        Ok(())
    }

    /// Transition OPEN -> CLOSED: close every queue, persist the resume
    /// manifest and dedup set, and report what was left pending.
    pub fn close(&mut self) -> Result<CloseReport, SchedulerError> {
        if !self.open {
            return Err(SchedulerError::NotOpen);
        }

        let mut report = CloseReport::default();
        let mut manifest = ResumeManifest::default();

        for (domain, queue) in self.queues.drain() {
            let pending = queue.close()?;
            if pending.is_empty() {
                continue;
            }

            let (resumable, dropped): (Vec<i32>, Vec<i32>) = pending
                .into_iter()
                .partition(|&p| self.config.priority_on_disk(p));

            if !resumable.is_empty() {
                manifest.domains.insert(domain.clone(), resumable.clone());
                report.resumable.insert(domain.clone(), resumable);
            }
            if !dropped.is_empty() {
                warn!(
                    domain = %domain,
                    priorities = ?dropped,
                    "memory-backed buckets dropped at close"
                );
                report.dropped.insert(domain, dropped);
            }
        }

        if let Some(job_dir) = &self.config.job_dir {
            let serialized = serde_json::to_string_pretty(&manifest)
                .map_err(|e| SchedulerError::Manifest(e.to_string()))?;
            std::fs::write(job_dir.join(MANIFEST_FILE), serialized)?;
        }

        let filter = std::mem::take(&mut self.filter);
        filter.close()?;

        while self.domains.next_domain().is_some() {}

        self.open = false;
        info!(
            resumable_domains = report.resumable.len(),
            dropped_domains = report.dropped.len(),
            "scheduler closed"
        );
        Ok(report)
    }
}
