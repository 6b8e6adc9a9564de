pub mod config;
pub mod domainsch;
pub mod dupefilter;
pub mod logging;
pub mod pqueue;
pub mod request;
pub mod scheduler;
pub mod squeue;
pub mod url_utils;

// Re-export main types for library usage
pub use config::{SchedulerConfig, StoragePolicy};
pub use domainsch::{DomainScheduler, FifoDomainScheduler};
pub use dupefilter::{request_fingerprint, DupeFilter, FilterError, Fingerprint, FINGERPRINT_LEN};
pub use pqueue::{PriorityQueue, QueueFactory};
pub use request::CrawlRequest;
pub use scheduler::{CloseReport, Scheduler, SchedulerError};
pub use squeue::{ByteQueue, DiskQueue, MemoryQueue, QueueError};
