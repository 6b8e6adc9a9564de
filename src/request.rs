//! Crawl request descriptor and its on-disk encoding.

use rkyv::{AlignedVec, Archive, CheckBytes, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::squeue::QueueError;
use crate::url_utils;

/// One unit of fetch work, as seen by the scheduler.
///
/// The scheduler treats this as an opaque serializable record; only
/// `priority` (lower = more urgent) and the fairness domain influence
/// ordering. The fetch transport interprets the rest.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
#[archive_attr(derive(CheckBytes))]
pub struct CrawlRequest {
    pub url: String,
    pub method: String,
    pub body: Vec<u8>,
    pub priority: i32,
    /// Explicit fairness-group override. When unset, the URL host is used.
    pub domain: Option<String>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            body: Vec::new(),
            priority: 0,
            domain: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// The domain this request is grouped under for fairness: the explicit
    /// override if present, otherwise the URL host.
    pub fn scheduler_domain(&self) -> Option<String> {
        self.domain
            .clone()
            .or_else(|| url_utils::extract_host(&self.url))
    }

    /// Serialize for queue storage.
    pub fn encode(&self) -> Result<AlignedVec, QueueError> {
        rkyv::to_bytes::<_, 1024>(self)
            .map_err(|e| QueueError::Serialization(format!("failed to encode request: {}", e)))
    }

    /// Deserialize a queue record, validating the archive first so mangled
    /// bytes surface as corruption instead of undefined behavior.
    pub fn decode(bytes: &[u8]) -> Result<Self, QueueError> {
        // Queue records come back unaligned; rkyv requires aligned input.
        let mut aligned = AlignedVec::new();
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes(&aligned)
            .map_err(|e| QueueError::Corrupt(format!("failed to decode request: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let request = CrawlRequest::new("https://example.com/page")
            .with_method("POST")
            .with_body(b"payload".to_vec())
            .with_priority(3);

        let bytes = request.encode().unwrap();
        let decoded = CrawlRequest::decode(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_decode_rejects_truncated_record() {
        let request = CrawlRequest::new("https://example.com/page").with_body(b"data".to_vec());
        let bytes = request.encode().unwrap();

        match CrawlRequest::decode(&bytes[..bytes.len() / 2]) {
            Err(QueueError::Corrupt(_)) => {}
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_scheduler_domain_from_url() {
        let request = CrawlRequest::new("https://shop.example.com/item");
        assert_eq!(
            request.scheduler_domain(),
            Some("shop.example.com".to_string())
        );
    }

    #[test]
    fn test_scheduler_domain_override() {
        let request = CrawlRequest::new("https://shop.example.com/item").with_domain("example.com");
        assert_eq!(request.scheduler_domain(), Some("example.com".to_string()));
    }

    #[test]
    fn test_scheduler_domain_missing() {
        assert_eq!(CrawlRequest::new("not a url").scheduler_domain(), None);
    }
}
