//! Request fingerprinting and deduplication.
//!
//! A fingerprint is a Sha256 digest over the request method, canonicalized
//! URL, and body, so semantically identical requests collide regardless of
//! cosmetic URL differences (host case, default ports, fragments). Seen
//! fingerprints are never forgotten within a crawl run.
//!
//! Persistence is a fixed-width append-only file: 32 bytes per record, no
//! length prefix, forward-readable from any clean cut. A file whose length
//! is not a multiple of the record width fails the open; silently resetting
//! the dedup set would re-fetch the entire crawl history.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::request::CrawlRequest;
use crate::url_utils;

pub const FINGERPRINT_LEN: usize = 32;

pub type Fingerprint = [u8; FINGERPRINT_LEN];

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt fingerprint file: {0}")]
    Corrupt(String),
}

/// Deterministic fingerprint over method + canonical URL + body.
///
/// Each component is hashed with a length frame so concatenation points
/// cannot collide across components.
pub fn request_fingerprint(request: &CrawlRequest) -> Fingerprint {
    let canonical_url = url_utils::canonicalize_url(&request.url);
    let mut hasher = Sha256::new();
    for part in [
        request.method.as_bytes(),
        canonical_url.as_bytes(),
        request.body.as_slice(),
    ] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Seen-fingerprint set, optionally backed by an append-only file.
pub struct DupeFilter {
    seen: HashSet<Fingerprint>,
    file: Option<File>,
    path: Option<PathBuf>,
}

impl DupeFilter {
    /// In-memory-only filter; nothing survives the run.
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            file: None,
            path: None,
        }
    }

    /// Disk-persisted filter: load every fingerprint already recorded at
    /// `path`, then append new ones as they arrive.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FilterError> {
        let path = path.as_ref().to_path_buf();
        let mut seen = HashSet::new();

        if path.exists() {
            let bytes = std::fs::read(&path)?;
            if bytes.len() % FINGERPRINT_LEN != 0 {
                return Err(FilterError::Corrupt(format!(
                    "{} is {} bytes, not a multiple of the {}-byte record width",
                    path.display(),
                    bytes.len(),
                    FINGERPRINT_LEN
                )));
            }
            for chunk in bytes.chunks_exact(FINGERPRINT_LEN) {
                let mut fingerprint = [0u8; FINGERPRINT_LEN];
                fingerprint.copy_from_slice(chunk);
                seen.insert(fingerprint);
            }
            info!(
                path = %path.display(),
                loaded = seen.len(),
                "loaded persisted request fingerprints"
            );
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            seen,
            file: Some(file),
            path: Some(path),
        })
    }

    pub fn seen(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Record a fingerprint. Already-known fingerprints are not re-appended.
    pub fn add(&mut self, fingerprint: Fingerprint) -> Result<(), FilterError> {
        if self.seen.insert(fingerprint) {
            if let Some(file) = self.file.as_mut() {
                file.write_all(&fingerprint)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Flush the persisted file, if any.
    pub fn close(mut self) -> Result<(), FilterError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
            file.sync_data()?;
            if let Some(path) = &self.path {
                debug!(path = %path.display(), total = self.seen.len(), "dedup filter closed");
            }
        }
        Ok(())
    }
}

impl Default for DupeFilter {
    fn default() -> Self {
        Self::new()
    }
}
