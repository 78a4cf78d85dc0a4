//! Error taxonomy for the queue core.
//!
//! Mirrors the admission/delivery/persistence split in the design: callers of
//! [`crate::queue::Queue::put`] only ever see [`AdmissionError`]. Everything
//! past admission is internal and its only observable effects are on-disk
//! state, metrics, logs, and eventually a DSN.

use std::io;

use thiserror::Error;

/// Errors returned to the caller of `Put`. Nothing is persisted when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The queue is at or above `max_queue_size`.
    #[error("queue is full")]
    QueueFull,

    /// The alias resolver failed for one of the recipients.
    #[error("alias resolution failed for {address}: {reason}")]
    AliasResolution { address: String, reason: String },

    /// Alias resolution produced zero recipients for an admitted envelope.
    #[error("alias resolution for {address} produced no recipients")]
    EmptyExpansion { address: String },

    /// Anything else that should never happen in practice (id generation
    /// exhausted, index lock poisoned, etc).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Outcome of a single delivery attempt against a courier or the pipe
/// dispatcher. Never surfaced to callers of `Put`; consumed entirely by the
/// worker's per-attempt procedure (see `worker.rs`).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Recipient stays `pending`; retried on the next cycle.
    #[error("{0}")]
    Transient(String),

    /// Recipient becomes `failed`; no further attempts for it.
    #[error("{0}")]
    Permanent(String),
}

impl DispatchError {
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(m) | Self::Permanent(m) => m,
        }
    }
}

/// Errors from the item store. Always logged, never propagated: a failed
/// write is retried on the next persist cycle, a failed read during `Load`
/// means the file is skipped and left in place.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize item: {0}")]
    Serialize(#[from] ron::Error),

    #[error("failed to parse item: {0}")]
    Deserialize(#[from] ron::error::SpannedError),
}
