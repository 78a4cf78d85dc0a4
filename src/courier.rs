//! Courier contract (consumed, not implemented here) and the local-domain
//! predicate the dispatch policy routes on.

use async_trait::async_trait;

use crate::error::DispatchError;

/// `Deliver(from, to, data) -> (err?, permanent?)`, opaque to this crate.
/// `Err(DispatchError::Permanent(_))` means do not retry;
/// `Err(DispatchError::Transient(_))` means retry later; `Ok(())` is success.
#[async_trait]
pub trait Courier: Send + Sync + 'static {
    async fn deliver(&self, from: &str, to: &str, data: &[u8]) -> Result<(), DispatchError>;
}

/// Classifies whether a domain is served locally. Out of scope to implement
/// (referenced by contract only), but the dispatch policy needs *a* answer
/// to route mailbox recipients.
pub trait LocalDomains: Send + Sync + 'static {
    fn is_local(&self, domain: &str) -> bool;
}

/// A `LocalDomains` backed by a fixed set, useful for tests and for small
/// deployments that don't need dynamic domain configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticLocalDomains(std::collections::HashSet<String>);

impl StaticLocalDomains {
    #[must_use]
    pub fn new(domains: impl IntoIterator<Item = String>) -> Self {
        Self(domains.into_iter().map(|d| d.to_ascii_lowercase()).collect())
    }
}

impl LocalDomains for StaticLocalDomains {
    fn is_local(&self, domain: &str) -> bool {
        self.0.contains(&domain.to_ascii_lowercase())
    }
}
