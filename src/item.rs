//! The queued item: one envelope plus per-recipient delivery state.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Sentinel sender address denoting the null sender. DSNs are emitted with
/// this as `from`; the null-sender guard in `worker.rs` checks against it
/// literally and must never be bypassed by a refactor.
pub const NULL_SENDER: &str = "<>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientKind {
    Mailbox,
    Pipe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientStatus {
    Pending,
    Sent,
    Failed,
}

/// One expanded delivery target produced by alias resolution at admission
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    /// Resolved destination: a mailbox address, or a command line for the
    /// pipe kind.
    pub address: String,

    /// The pre-alias address this recipient was expanded from. Used by the
    /// forwarding sender rewrite.
    pub original_address: String,

    pub kind: RecipientKind,

    pub status: RecipientStatus,

    /// Free-text diagnostic from the most recent attempt, or empty.
    #[serde(default)]
    pub last_failure_message: String,
}

impl Recipient {
    #[must_use]
    pub fn new(address: String, original_address: String, kind: RecipientKind) -> Self {
        Self {
            address,
            original_address,
            kind,
            status: RecipientStatus::Pending,
            last_failure_message: String::new(),
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            RecipientStatus::Sent | RecipientStatus::Failed
        )
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, RecipientStatus::Pending)
    }

    /// `pending -> sent`. Never called once the recipient is terminal.
    pub fn mark_sent(&mut self) {
        debug_assert!(!self.is_terminal(), "recipient status must be monotonic");
        self.status = RecipientStatus::Sent;
    }

    /// `pending -> failed`, recording the diagnostic.
    pub fn mark_failed(&mut self, message: String) {
        debug_assert!(!self.is_terminal(), "recipient status must be monotonic");
        self.status = RecipientStatus::Failed;
        self.last_failure_message = message;
    }

    /// Transient failure: status unchanged, diagnostic updated.
    pub fn record_transient_failure(&mut self, message: String) {
        self.last_failure_message = message;
    }
}

/// One queued envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,

    /// Sender address; `"<>"` denotes the null sender (a DSN).
    pub from: String,

    /// Original envelope recipients, as admitted, before alias expansion.
    pub to: Vec<String>,

    /// Message body, opaque bytes.
    #[serde(with = "serde_bytes_as_base64")]
    pub data: Vec<u8>,

    #[serde(with = "serde_system_time")]
    pub created_at: SystemTime,

    pub rcpt: Vec<Recipient>,
}

impl Item {
    #[must_use]
    pub const fn is_dsn(&self) -> bool {
        // `from == "<>"`. Spelled out as a helper so every call site that
        // needs the guard goes through one place and survives refactors.
        matches!(self.from.as_bytes(), b"<>")
    }

    /// True once every recipient has reached a terminal status.
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.rcpt.iter().all(Recipient::is_terminal)
    }

    /// Recipients that did not end up `sent`: `failed`, plus any still
    /// `pending` (give-up horizon reached). Used by the DSN emitter.
    #[must_use]
    pub fn non_sent_recipients(&self) -> Vec<&Recipient> {
        self.rcpt
            .iter()
            .filter(|r| !matches!(r.status, RecipientStatus::Sent))
            .collect()
    }

    /// File name for this item under the queue directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        file_name_for(&self.id)
    }
}

/// The `m:<id>` naming convention. Shared by `Item::file_name` and the
/// store's load-time parser so both sides agree on the prefix.
pub const FILE_PREFIX: &str = "m:";

#[must_use]
pub fn file_name_for(id: &str) -> String {
    format!("{FILE_PREFIX}{id}")
}

/// Extracts the item id from a file name if it matches the `m:<id>` prefix;
/// `None` for anything else, which the store's recovery scan ignores.
#[must_use]
pub fn id_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(FILE_PREFIX)
}

mod serde_system_time {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(time: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        secs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

mod serde_bytes_as_base64 {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        base64::engine::general_purpose::STANDARD
            .encode(bytes)
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}
