//! Process-global KV client metrics: dispatch/success/failure/retry counters.
//!
//! The abstract contract specifies non-atomic counters under single-threaded
//! cooperative scheduling; this crate hosts the core on a multi-threaded `tokio`
//! runtime, so the counters are `AtomicU64`.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ClientMetrics {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub retried: u64,
}

impl ClientMetrics {
    pub fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.retried.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_reset() {
        let m = ClientMetrics::default();
        m.record_dispatch();
        m.record_dispatch();
        m.record_success();
        m.record_failure();
        m.record_retry();
        let snap = m.snapshot();
        assert_eq!(
            snap,
            MetricsSnapshot {
                dispatched: 2,
                succeeded: 1,
                failed: 1,
                retried: 1,
            }
        );
        m.reset();
        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                dispatched: 0,
                succeeded: 0,
                failed: 0,
                retried: 0,
            }
        );
    }
}
