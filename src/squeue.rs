//! FIFO byte queues: the storage layer under the priority queue.
//!
//! Two variants share the [`ByteQueue`] contract: an in-process
//! [`MemoryQueue`] and a [`DiskQueue`] persisted as an append-only segment
//! file with a head-offset sidecar. Records are opaque byte payloads framed
//! with a u32 little-endian length prefix.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{HEAD_FILE, SEGMENT_FILE};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Corrupt queue data: {0}")]
    Corrupt(String),
}

/// Single-bucket FIFO queue over serialized records.
///
/// `pop` on an empty queue is `Ok(None)`, never an error; real errors are
/// reserved for I/O failures and corruption.
pub trait ByteQueue {
    /// Append a record at the tail.
    fn push(&mut self, record: &[u8]) -> Result<(), QueueError>;

    /// Remove and return the head record, or `None` if empty.
    fn pop(&mut self) -> Result<Option<Vec<u8>>, QueueError>;

    /// Number of pending records. O(1).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release resources. Returns `true` if unconsumed records remain
    /// persisted, so the caller can record that this bucket must be reopened
    /// at the same path on restart.
    fn close(self: Box<Self>) -> Result<bool, QueueError>;
}

/// List-backed queue with no persistence. Contents are dropped on close;
/// the scheduler reports that loss explicitly in its close report.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    records: VecDeque<Vec<u8>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteQueue for MemoryQueue {
    fn push(&mut self, record: &[u8]) -> Result<(), QueueError> {
        self.records.push_back(record.to_vec());
        Ok(())
    }

    fn pop(&mut self) -> Result<Option<Vec<u8>>, QueueError> {
        Ok(self.records.pop_front())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn close(self: Box<Self>) -> Result<bool, QueueError> {
        Ok(false)
    }
}

/// Disk-backed queue for one priority bucket.
///
/// Layout under the bucket directory:
/// - `segment.dat`: append-only records, each `u32` LE length + payload
/// - `head.idx`: 8-byte LE byte offset of the next record to pop, written
///   when the queue closes with records remaining
///
/// The head offset is persisted only at close, so a crash mid-run
/// re-delivers records popped since the last close: at-least-once delivery.
///
/// Corruption policy is fail-closed: a truncated frame or malformed
/// `head.idx` surfaces as [`QueueError::Corrupt`] instead of being skipped,
/// because silent record loss is indistinguishable from dedup-driven skips
/// downstream.
pub struct DiskQueue {
    dir: PathBuf,
    file: File,
    /// Byte offset of the next record to pop.
    head: u64,
    /// Byte offset for the next append; always the segment length.
    tail: u64,
    len: usize,
}

impl DiskQueue {
    /// Open (or create) the bucket at `dir`, resuming any existing segment.
    ///
    /// Resuming scans frames from the recorded head offset to the end of the
    /// segment to recount pending records; a partial frame fails the open.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, QueueError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let segment_path = dir.join(SEGMENT_FILE);
        let head_path = dir.join(HEAD_FILE);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&segment_path)?;
        let tail = file.metadata()?.len();

        let head = if head_path.exists() {
            let bytes = std::fs::read(&head_path)?;
            let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                QueueError::Corrupt(format!(
                    "head index {} is {} bytes, expected 8",
                    head_path.display(),
                    bytes.len()
                ))
            })?;
            u64::from_le_bytes(raw)
        } else {
            0
        };

        if head > tail {
            return Err(QueueError::Corrupt(format!(
                "head offset {} beyond segment end {} in {}",
                head,
                tail,
                segment_path.display()
            )));
        }

        let len = Self::scan_records(&mut file, head, tail, &segment_path)?;
        if len > 0 {
            debug!(
                bucket = %dir.display(),
                pending = len,
                "resumed disk queue"
            );
        }

        Ok(Self {
            dir,
            file,
            head,
            tail,
            len,
        })
    }

    /// Count whole frames between `from` and `end`, failing on a partial one.
    fn scan_records(
        file: &mut File,
        from: u64,
        end: u64,
        path: &Path,
    ) -> Result<usize, QueueError> {
        let mut pos = from;
        let mut count = 0usize;
        file.seek(SeekFrom::Start(from))?;

        while pos < end {
            if pos + 4 > end {
                return Err(QueueError::Corrupt(format!(
                    "truncated length prefix at offset {} in {}",
                    pos,
                    path.display()
                )));
            }
            let mut len_bytes = [0u8; 4];
            file.read_exact(&mut len_bytes)?;
            let record_len = u32::from_le_bytes(len_bytes) as u64;
            if pos + 4 + record_len > end {
                return Err(QueueError::Corrupt(format!(
                    "truncated record at offset {} in {}",
                    pos,
                    path.display()
                )));
            }
            file.seek(SeekFrom::Current(record_len as i64))?;
            pos += 4 + record_len;
            count += 1;
        }

        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn persist_head(&self) -> Result<(), QueueError> {
        std::fs::write(self.dir.join(HEAD_FILE), self.head.to_le_bytes())?;
        Ok(())
    }
}

impl ByteQueue for DiskQueue {
    fn push(&mut self, record: &[u8]) -> Result<(), QueueError> {
        let record_len = u32::try_from(record.len()).map_err(|_| {
            QueueError::Serialization(format!("record of {} bytes exceeds frame limit", record.len()))
        })?;

        self.file.seek(SeekFrom::Start(self.tail))?;
        self.file.write_all(&record_len.to_le_bytes())?;
        self.file.write_all(record)?;

        self.tail += 4 + record.len() as u64;
        self.len += 1;
        trace!(bucket = %self.dir.display(), len = self.len, "pushed record");
        Ok(())
    }

    fn pop(&mut self) -> Result<Option<Vec<u8>>, QueueError> {
        if self.len == 0 {
            return Ok(None);
        }

        self.file.seek(SeekFrom::Start(self.head))?;

        let mut len_bytes = [0u8; 4];
        self.file.read_exact(&mut len_bytes).map_err(|e| {
            Self::read_failure(&self.dir, self.head, e)
        })?;
        let record_len = u32::from_le_bytes(len_bytes) as usize;

        let mut record = vec![0u8; record_len];
        self.file.read_exact(&mut record).map_err(|e| {
            Self::read_failure(&self.dir, self.head, e)
        })?;

        self.head += 4 + record_len as u64;
        self.len -= 1;
        Ok(Some(record))
    }

    fn len(&self) -> usize {
        self.len
    }

    fn close(self: Box<Self>) -> Result<bool, QueueError> {
        if self.len == 0 {
            // Fully consumed: remove the segment so restarts see no backlog.
            drop(self.file);
            let segment = self.dir.join(SEGMENT_FILE);
            if segment.exists() {
                std::fs::remove_file(&segment)?;
            }
            let head = self.dir.join(HEAD_FILE);
            if head.exists() {
                std::fs::remove_file(&head)?;
            }
            // Leave the parent tree alone; only this bucket's directory goes.
            let _ = std::fs::remove_dir(&self.dir);
            return Ok(false);
        }

        // A failed append may have left partial bytes past the logical
        // tail; cut them off so the segment scans cleanly on reopen.
        self.file.set_len(self.tail)?;
        self.file.sync_data()?;
        self.persist_head()?;
        debug!(
            bucket = %self.dir.display(),
            pending = self.len,
            "closed disk queue with records remaining"
        );
        Ok(true)
    }
}

impl DiskQueue {
    fn read_failure(dir: &Path, offset: u64, e: std::io::Error) -> QueueError {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            QueueError::Corrupt(format!(
                "segment in {} truncated at offset {}",
                dir.display(),
                offset
            ))
        } else {
            QueueError::Io(e)
        }
    }
}
