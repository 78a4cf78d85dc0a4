//! Alias resolver contract: consumed by the queue façade at admission time,
//! not implemented here.

use async_trait::async_trait;
use thiserror::Error;

use crate::item::RecipientKind;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ResolveError(pub String);

/// One expansion target returned by [`AliasResolver::resolve`].
#[derive(Debug, Clone)]
pub struct Expansion {
    pub address: String,
    pub kind: RecipientKind,
}

/// `Resolve(addr) -> list of (addr, kind)`. Implementations must be safe to
/// call from many tasks concurrently.
#[async_trait]
pub trait AliasResolver: Send + Sync + 'static {
    async fn resolve(&self, address: &str) -> Result<Vec<Expansion>, ResolveError>;
}

/// Identity resolver: every address expands to exactly itself as a mailbox.
/// Useful as a default / in tests that don't exercise alias expansion.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

#[async_trait]
impl AliasResolver for IdentityResolver {
    async fn resolve(&self, address: &str) -> Result<Vec<Expansion>, ResolveError> {
        Ok(vec![Expansion {
            address: address.to_string(),
            kind: RecipientKind::Mailbox,
        }])
    }
}
