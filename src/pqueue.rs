//! Priority queue over per-priority FIFO buckets.
//!
//! Items fan out into one [`ByteQueue`] bucket per integer priority; pops
//! always drain the lowest-numbered non-empty bucket, preserving FIFO order
//! within a bucket. Buckets are created lazily on first push and closed the
//! moment they empty, bounding open file handles.
//!
//! Ordering policy: lower priority value strictly dequeues first, with no
//! aging. A continuous stream of priority-0 pushes starves higher-numbered
//! priorities; priority is caller-controlled, so this is accepted behavior.

use std::collections::HashMap;
use tracing::trace;

use crate::squeue::{ByteQueue, QueueError};

/// Builds the bucket for a given priority. The factory decides the storage
/// class (memory or disk) and, for disk, the bucket path.
pub type QueueFactory = Box<dyn FnMut(i32) -> Result<Box<dyn ByteQueue>, QueueError>>;

pub struct PriorityQueue {
    factory: QueueFactory,
    buckets: HashMap<i32, Box<dyn ByteQueue>>,
    /// Cached lowest priority with a non-empty bucket; `None` iff no pending
    /// work. Recomputed only when the active bucket empties.
    min_priority: Option<i32>,
}

impl PriorityQueue {
    pub fn new(factory: QueueFactory) -> Self {
        Self {
            factory,
            buckets: HashMap::new(),
            min_priority: None,
        }
    }

    /// Rebuild a queue from the priorities recorded at last close.
    ///
    /// Each recorded bucket is reopened through the factory; buckets that
    /// come back empty (already fully consumed) are closed again right away.
    pub fn resume(mut factory: QueueFactory, startprios: &[i32]) -> Result<Self, QueueError> {
        let mut buckets: HashMap<i32, Box<dyn ByteQueue>> = HashMap::new();
        for &priority in startprios {
            let bucket = factory(priority)?;
            if bucket.is_empty() {
                bucket.close()?;
            } else {
                buckets.insert(priority, bucket);
            }
        }
        let min_priority = buckets.keys().copied().min();
        Ok(Self {
            factory,
            buckets,
            min_priority,
        })
    }

    pub fn push(&mut self, record: &[u8], priority: i32) -> Result<(), QueueError> {
        if !self.buckets.contains_key(&priority) {
            let bucket = (self.factory)(priority)?;
            self.buckets.insert(priority, bucket);
        }
        let bucket = self
            .buckets
            .get_mut(&priority)
            .expect("bucket ensured above");
        bucket.push(record)?;

        match self.min_priority {
            Some(current) if current <= priority => {}
            _ => self.min_priority = Some(priority),
        }
        trace!(priority, "pushed into priority bucket");
        Ok(())
    }

    /// Pop from the lowest non-empty priority bucket.
    ///
    /// Closing and recomputing on bucket exhaustion is the only O(buckets)
    /// step; every other pop is O(1).
    pub fn pop(&mut self) -> Result<Option<Vec<u8>>, QueueError> {
        let priority = match self.min_priority {
            Some(p) => p,
            None => return Ok(None),
        };

        let bucket = self
            .buckets
            .get_mut(&priority)
            .expect("cached min priority must have a bucket");
        let record = bucket.pop()?;
        debug_assert!(record.is_some(), "min-priority bucket was empty");

        if bucket.is_empty() {
            let bucket = self
                .buckets
                .remove(&priority)
                .expect("bucket present for cached min priority");
            bucket.close()?;
            self.min_priority = self.buckets.keys().copied().min();
            trace!(closed = priority, next = ?self.min_priority, "priority bucket drained");
        }

        Ok(record)
    }

    /// Total pending records across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.min_priority.is_none()
    }

    /// Close every bucket, returning the priorities that still held records
    /// (sorted), for the resume manifest.
    pub fn close(mut self) -> Result<Vec<i32>, QueueError> {
        let mut pending = Vec::new();
        for (priority, bucket) in self.buckets.drain() {
            if !bucket.is_empty() {
                pending.push(priority);
            }
            bucket.close()?;
        }
        pending.sort_unstable();
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squeue::MemoryQueue;

    fn memory_factory() -> QueueFactory {
        Box::new(|_priority| Ok(Box::new(MemoryQueue::new()) as Box<dyn ByteQueue>))
    }

    #[test]
    fn test_priority_ordering_with_fifo_inside() {
        let mut queue = PriorityQueue::new(memory_factory());
        queue.push(b"p5-a", 5).unwrap();
        queue.push(b"p1-a", 1).unwrap();
        queue.push(b"p3-a", 3).unwrap();
        queue.push(b"p1-b", 1).unwrap();

        assert_eq!(queue.pop().unwrap().unwrap(), b"p1-a");
        assert_eq!(queue.pop().unwrap().unwrap(), b"p1-b");
        assert_eq!(queue.pop().unwrap().unwrap(), b"p3-a");
        assert_eq!(queue.pop().unwrap().unwrap(), b"p5-a");
        assert_eq!(queue.pop().unwrap(), None);
    }

    #[test]
    fn test_bucket_cleanup_recomputes_min() {
        let mut queue = PriorityQueue::new(memory_factory());
        queue.push(b"one", 1).unwrap();
        queue.push(b"two", 2).unwrap();

        assert_eq!(queue.pop().unwrap().unwrap(), b"one");
        // Priority-1 bucket is now closed; next pop must come from 2.
        assert_eq!(queue.pop().unwrap().unwrap(), b"two");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_negative_priorities_win() {
        let mut queue = PriorityQueue::new(memory_factory());
        queue.push(b"normal", 0).unwrap();
        queue.push(b"urgent", -1).unwrap();
        assert_eq!(queue.pop().unwrap().unwrap(), b"urgent");
        assert_eq!(queue.pop().unwrap().unwrap(), b"normal");
    }

    #[test]
    fn test_len_sums_buckets() {
        let mut queue = PriorityQueue::new(memory_factory());
        assert_eq!(queue.len(), 0);
        queue.push(b"a", 0).unwrap();
        queue.push(b"b", 7).unwrap();
        queue.push(b"c", 7).unwrap();
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_close_reports_pending_priorities() {
        let mut queue = PriorityQueue::new(memory_factory());
        queue.push(b"a", 4).unwrap();
        queue.push(b"b", 1).unwrap();
        queue.push(b"c", 1).unwrap();

        let pending = queue.close().unwrap();
        assert_eq!(pending, vec![1, 4]);
    }

    #[test]
    fn test_close_skips_drained_buckets() {
        let mut queue = PriorityQueue::new(memory_factory());
        queue.push(b"a", 2).unwrap();
        queue.push(b"b", 5).unwrap();
        queue.pop().unwrap().unwrap();

        let pending = queue.close().unwrap();
        assert_eq!(pending, vec![5]);
    }
}
