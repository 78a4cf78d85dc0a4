//! Exported counters. Names are normative; values are process-local
//! atomic counters rather than a full metrics pipeline — wiring these into
//! an actual exporter (OpenTelemetry, Prometheus, ...) is an operator
//! concern outside this core.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    put_count: AtomicU64,
    items_written: AtomicU64,
    dsn_queued: AtomicU64,
    deliver_attempts_pipe: AtomicU64,
    deliver_attempts_local: AtomicU64,
    deliver_attempts_remote: AtomicU64,
}

/// Which dispatch path a delivery attempt went through, for
/// `queue/deliverAttempts{pipe | email:local | email:remote}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Pipe,
    EmailLocal,
    EmailRemote,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_put(&self) {
        self.put_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_written(&self) {
        self.items_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dsn_queued(&self) {
        self.dsn_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deliver_attempt(&self, kind: AttemptKind) {
        let counter = match kind {
            AttemptKind::Pipe => &self.deliver_attempts_pipe,
            AttemptKind::EmailLocal => &self.deliver_attempts_local,
            AttemptKind::EmailRemote => &self.deliver_attempts_remote,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn put_count(&self) -> u64 {
        self.put_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn items_written(&self) -> u64 {
        self.items_written.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn dsn_queued(&self) -> u64 {
        self.dsn_queued.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn deliver_attempts(&self, kind: AttemptKind) -> u64 {
        let counter = match kind {
            AttemptKind::Pipe => &self.deliver_attempts_pipe,
            AttemptKind::EmailLocal => &self.deliver_attempts_local,
            AttemptKind::EmailRemote => &self.deliver_attempts_remote,
        };
        counter.load(Ordering::Relaxed)
    }
}
