//! Domain rotation: which domain gets served next.
//!
//! Deliberately narrow strategy seam, independent of request ordering
//! within a domain. The default policy is plain FIFO, which together with
//! the scheduler's re-add-on-non-empty rule yields round-robin fairness
//! across domains. Alternative orderings (weighted rotation, host budgets)
//! can be swapped in behind the trait as long as `next_domain` never blocks.

use std::collections::{HashSet, VecDeque};

pub trait DomainScheduler {
    /// Register a domain as having pending work. Idempotent: re-adding a
    /// domain already in rotation is a no-op.
    fn add_domain(&mut self, domain: &str);

    /// Remove and return the next domain to serve, or `None` if none pend.
    fn next_domain(&mut self) -> Option<String>;

    /// Purge every occurrence of `domain`, e.g. when a spider closes.
    fn remove_pending_domain(&mut self, domain: &str);

    fn has_pending_domain(&self, domain: &str) -> bool;
}

/// First-in-first-out rotation.
#[derive(Debug, Default)]
pub struct FifoDomainScheduler {
    order: VecDeque<String>,
    pending: HashSet<String>,
}

impl FifoDomainScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl DomainScheduler for FifoDomainScheduler {
    fn add_domain(&mut self, domain: &str) {
        if self.pending.insert(domain.to_string()) {
            self.order.push_back(domain.to_string());
        }
    }

    fn next_domain(&mut self) -> Option<String> {
        let domain = self.order.pop_front()?;
        self.pending.remove(&domain);
        Some(domain)
    }

    fn remove_pending_domain(&mut self, domain: &str) {
        if self.pending.remove(domain) {
            self.order.retain(|d| d != domain);
        }
    }

    fn has_pending_domain(&self, domain: &str) -> bool {
        self.pending.contains(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut sched = FifoDomainScheduler::new();
        sched.add_domain("a.example");
        sched.add_domain("b.example");
        sched.add_domain("c.example");

        assert_eq!(sched.next_domain().as_deref(), Some("a.example"));
        assert_eq!(sched.next_domain().as_deref(), Some("b.example"));
        assert_eq!(sched.next_domain().as_deref(), Some("c.example"));
        assert_eq!(sched.next_domain(), None);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut sched = FifoDomainScheduler::new();
        sched.add_domain("a.example");
        sched.add_domain("a.example");
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn test_remove_pending() {
        let mut sched = FifoDomainScheduler::new();
        sched.add_domain("a.example");
        sched.add_domain("b.example");
        sched.remove_pending_domain("a.example");

        assert!(!sched.has_pending_domain("a.example"));
        assert!(sched.has_pending_domain("b.example"));
        assert_eq!(sched.next_domain().as_deref(), Some("b.example"));
    }

    #[test]
    fn test_readd_goes_to_tail() {
        let mut sched = FifoDomainScheduler::new();
        sched.add_domain("a.example");
        sched.add_domain("b.example");

        let first = sched.next_domain().unwrap();
        sched.add_domain(&first);
        assert_eq!(sched.next_domain().as_deref(), Some("b.example"));
        assert_eq!(sched.next_domain().as_deref(), Some("a.example"));
    }
}
