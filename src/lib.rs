//! Outbound mail queue core.
//!
//! Accepts validated envelopes, durably persists them, and asynchronously
//! drives delivery to each recipient: retrying transient failures, giving
//! up after a bounded wall-clock window, and emitting a delivery status
//! notification back to the sender for recipients that did not succeed.
//!
//! The SMTP listener, the couriers, the alias resolver, and the
//! local-domain predicate are external collaborators, referenced here only
//! by their trait contracts ([`courier::Courier`], [`alias::AliasResolver`],
//! [`courier::LocalDomains`]).

pub mod alias;
pub mod clock;
pub mod config;
pub mod courier;
pub mod dispatch;
pub mod dsn;
pub mod error;
pub mod id;
pub mod item;
mod logging;
pub mod metrics;
pub mod queue;
pub mod retry;
pub mod store;
mod worker;

pub use logging::init_logging;
pub use queue::{Queue, QueueBuilder};
