//! Queue configuration.
//!
//! A small struct deserialized from a RON document, with `const fn`
//! defaults wired through `#[serde(default = "...")]` so a partial config
//! is still valid.
//!
//! ```ron
//! Queue(
//!     directory: "/var/spool/mta/queue",
//! )
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AdmissionError;

const fn default_max_queue_size() -> usize {
    200
}

const fn default_give_up_secs() -> u64 {
    12 * 60 * 60
}

const fn default_retry_jitter_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Directory holding `m:<id>` item files. Created with mode `0700` if
    /// missing.
    pub directory: PathBuf,

    /// Advisory admission cap. Default 200.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Wall-clock window after which a worker gives up regardless of
    /// outstanding `pending` recipients. Default 12 hours.
    #[serde(default = "default_give_up_secs")]
    pub give_up_secs: u64,

    /// Upper bound of the uniform jitter added to every retry delay.
    /// Default 60 seconds.
    #[serde(default = "default_retry_jitter_secs")]
    pub retry_jitter_secs: u64,
}

impl QueueConfig {
    /// Construct a config pointed at `directory`, all other fields at their
    /// defaults.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            max_queue_size: default_max_queue_size(),
            give_up_secs: default_give_up_secs(),
            retry_jitter_secs: default_retry_jitter_secs(),
        }
    }

    /// Validates the queue directory is usable: absolute, and free of `..`
    /// traversal components. Does not check for OS system directories —
    /// this crate is not a general-purpose spool product, and pointing it
    /// at `/etc` is an operator mistake, not a boundary this layer enforces.
    pub(crate) fn validate(&self) -> Result<(), AdmissionError> {
        validate_queue_path(&self.directory)
    }
}

fn validate_queue_path(path: &Path) -> Result<(), AdmissionError> {
    if !path.is_absolute() {
        return Err(AdmissionError::Internal(format!(
            "queue directory must be absolute: {}",
            path.display()
        )));
    }

    if path
        .components()
        .any(|c| c == std::path::Component::ParentDir)
    {
        return Err(AdmissionError::Internal(format!(
            "queue directory cannot contain '..': {}",
            path.display()
        )));
    }

    Ok(())
}
