//! DSN emitter: builds a human-readable delivery status notification and
//! re-injects it into the queue as a null-sender item.

use chrono::{DateTime, Utc};

use crate::item::Item;

/// Whether the worker should emit a DSN for `item` at the end of its
/// attempt loop: at least one non-sent recipient, and the item itself is
/// not already a DSN (the `from == "<>"` guard that breaks the reentry
/// cycle and must survive refactors).
#[must_use]
pub fn should_emit(item: &Item) -> bool {
    !item.is_dsn() && !item.non_sent_recipients().is_empty()
}

/// Builds the DSN body: original sender, item id, and each non-sent
/// recipient with its last failure message.
#[must_use]
pub fn build_body(item: &Item) -> String {
    let arrival: DateTime<Utc> = item.created_at.into();

    let mut body = String::new();
    body.push_str("Delivery Status Notification\n\n");
    body.push_str(&format!("Original sender: {}\n", item.from));
    body.push_str(&format!("Item id: {}\n", item.id));
    body.push_str(&format!("Arrival-Date: {}\n\n", arrival.to_rfc2822()));
    body.push_str("The following recipients did not receive this message:\n\n");

    for recipient in item.non_sent_recipients() {
        let reason = if recipient.last_failure_message.is_empty() {
            "gave up after the retry window elapsed"
        } else {
            recipient.last_failure_message.as_str()
        };
        body.push_str(&format!("  {}: {}\n", recipient.address, reason));
    }

    body
}
