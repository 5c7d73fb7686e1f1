//! Per-Host Command Outbox
//!
//! Cluster-wide side-effecting mutations (the demonstrated case: unloading a
//! module) must eventually reach every peer node. The accepting node enqueues
//! one command per affected resource into its per-host outbox; an external
//! propagation transport drains and delivers them. This core only produces
//! commands — there is no ack tracking and no replay, and eventual
//! consistency is the only guarantee.
//!
//! [`CommandQueue::enqueue`] is fire-and-forget: it never surfaces an error
//! to the caller, so a broken outbox can degrade propagation but can never
//! fail the local mutation.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Produce-only interface onto the per-host command outbox.
pub trait CommandQueue: Send + Sync {
    /// Appends a command for the given host. Never fails to the caller;
    /// delivery problems are the transport's concern.
    fn enqueue(&self, host: &str, command: &str);
}

/// In-memory outbox: append-only per host, consume-once via [`drain`].
///
/// Multiple producers may enqueue concurrently; per-host order is the
/// enqueue order.
///
/// [`drain`]: InMemoryCommandQueue::drain
pub struct InMemoryCommandQueue {
    inner: Mutex<HashMap<String, VecDeque<String>>>,
}

impl InMemoryCommandQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Consumes and returns all pending commands for a host, in enqueue
    /// order. Transport-side operation; the orchestration core never calls
    /// this.
    pub fn drain(&self, host: &str) -> Vec<String> {
        let Ok(mut inner) = self.inner.lock() else {
            return Vec::new();
        };
        inner
            .get_mut(host)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of pending commands for a host.
    pub fn pending(&self, host: &str) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.get(host).map(|q| q.len()).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for InMemoryCommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue for InMemoryCommandQueue {
    fn enqueue(&self, host: &str, command: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            // Fire-and-forget: a poisoned outbox must not fail the caller.
            tracing::warn!(host, command, "command outbox lock poisoned, dropping command");
            return;
        };
        tracing::debug!(host, command, "queued peer command");
        inner
            .entry(host.to_string())
            .or_default()
            .push_back(command.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_preserves_order() {
        let queue = InMemoryCommandQueue::new();
        queue.enqueue("localhost", "delete/module?name=a");
        queue.enqueue("localhost", "delete/module?name=b");
        queue.enqueue("localhost", "delete/module?name=c");

        assert_eq!(
            queue.drain("localhost"),
            vec![
                "delete/module?name=a",
                "delete/module?name=b",
                "delete/module?name=c",
            ]
        );
    }

    #[test]
    fn test_drain_consumes_once() {
        let queue = InMemoryCommandQueue::new();
        queue.enqueue("localhost", "delete/module?name=a");
        assert_eq!(queue.drain("localhost").len(), 1);
        assert!(queue.drain("localhost").is_empty());
    }

    #[test]
    fn test_queues_are_host_scoped() {
        let queue = InMemoryCommandQueue::new();
        queue.enqueue("host-a", "delete/module?name=x");
        queue.enqueue("host-b", "delete/module?name=y");
        assert_eq!(queue.pending("host-a"), 1);
        assert_eq!(queue.pending("host-b"), 1);
        assert_eq!(queue.drain("host-a"), vec!["delete/module?name=x"]);
        assert_eq!(queue.pending("host-b"), 1);
    }
}
