//! Delivery worker: one task per item, driving attempts on all still-pending
//! recipients in parallel until every recipient is terminal or the give-up
//! horizon elapses.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::dispatch;
use crate::dsn;
use crate::item::Item;
use crate::metrics::AttemptKind;
use crate::queue::{put_inner, Shared};
use crate::retry;
use crate::store;

/// Spawns the worker task for `item_lock`. Fire-and-forget: the worker
/// removes itself (and the item) from `shared`'s index when it finishes.
pub(crate) fn spawn(shared: Arc<Shared>, id: String, item_lock: Arc<Mutex<Item>>) {
    tokio::spawn(async move {
        run(shared, id, item_lock).await;
    });
}

async fn run(shared: Arc<Shared>, id: String, item_lock: Arc<Mutex<Item>>) {
    let give_up = Duration::from_secs(shared.config.give_up_secs);
    let jitter_bound = Duration::from_secs(shared.config.retry_jitter_secs);
    let created_at = item_lock.lock().await.created_at;

    loop {
        let since_created = shared
            .clock
            .now()
            .duration_since(created_at)
            .unwrap_or(Duration::ZERO);

        if retry::has_given_up(since_created, give_up) {
            warn!(item_id = %id, "item exceeded give-up horizon, abandoning remaining recipients");
            break;
        }

        let pending_indices: Vec<usize> = {
            let item = item_lock.lock().await;
            item.rcpt
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_pending())
                .map(|(i, _)| i)
                .collect()
        };

        if pending_indices.is_empty() {
            break;
        }

        run_attempt_round(&shared, &id, &item_lock, &pending_indices).await;

        let still_pending = {
            let item = item_lock.lock().await;
            item.rcpt.iter().any(|r| r.is_pending())
        };

        if !still_pending {
            break;
        }

        // Recompute elapsed time here rather than reusing the value from
        // the top of the loop: the attempt round above may have taken a
        // while (couriers own their own timeouts, not the worker), so the
        // schedule must be keyed off how old the item is *now*, not at the
        // start of this round.
        let since_created_for_sleep = shared
            .clock
            .now()
            .duration_since(created_at)
            .unwrap_or(Duration::ZERO);
        let delay = retry::next_delay(since_created_for_sleep, jitter_bound);
        shared.clock.sleep(delay).await;
    }

    finish(&shared, &id, &item_lock).await;
}

/// Spawns one task per pending recipient and joins all of them before
/// returning: the worker never proceeds to sleep or removal with
/// outstanding detached attempts.
async fn run_attempt_round(
    shared: &Arc<Shared>,
    id: &str,
    item_lock: &Arc<Mutex<Item>>,
    pending_indices: &[usize],
) {
    let mut handles = Vec::with_capacity(pending_indices.len());

    for &index in pending_indices {
        let shared = Arc::clone(shared);
        let item_lock = Arc::clone(item_lock);
        let id = id.to_string();
        handles.push(tokio::spawn(async move {
            attempt_one(&shared, &id, &item_lock, index).await;
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(item_id = %id, error = %e, "attempt task panicked");
        }
    }
}

/// One per-attempt procedure: dispatch, then fold the result into the
/// recipient's status under the item lock, then persist.
async fn attempt_one(shared: &Arc<Shared>, id: &str, item_lock: &Arc<Mutex<Item>>, index: usize) {
    let (item_snapshot, recipient_snapshot) = {
        let item = item_lock.lock().await;
        (item.clone(), item.rcpt[index].clone())
    };

    let attempt_kind = match recipient_snapshot.kind {
        crate::item::RecipientKind::Pipe => AttemptKind::Pipe,
        crate::item::RecipientKind::Mailbox => {
            if let Some((_, domain)) = dispatch::forward::split_user_domain(&recipient_snapshot.address)
            {
                if shared.local_domains.is_local(domain) {
                    AttemptKind::EmailLocal
                } else {
                    AttemptKind::EmailRemote
                }
            } else {
                AttemptKind::EmailLocal
            }
        }
    };
    shared.metrics.record_deliver_attempt(attempt_kind);

    let result = dispatch::dispatch(
        &item_snapshot,
        &recipient_snapshot,
        shared.local_domains.as_ref(),
        shared.local_courier.as_ref(),
        shared.remote_courier.as_ref(),
    )
    .await;

    {
        let mut item = item_lock.lock().await;
        let recipient = &mut item.rcpt[index];
        match result {
            Ok(()) => recipient.mark_sent(),
            Err(e) if e.is_permanent() => recipient.mark_failed(e.message().to_string()),
            Err(e) => recipient.record_transient_failure(e.message().to_string()),
        }
    }

    persist(shared, id, item_lock).await;
}

async fn persist(shared: &Arc<Shared>, id: &str, item_lock: &Arc<Mutex<Item>>) {
    let item = item_lock.lock().await;
    if let Err(e) = store::write_item(&shared.config.directory, &item).await {
        warn!(item_id = %id, error = %e, "failed to persist item, next cycle will retry the write");
    } else {
        shared.metrics.record_item_written();
    }
}

/// Worker termination: emit a DSN if warranted, then remove the item from
/// the index and disk.
async fn finish(shared: &Arc<Shared>, id: &str, item_lock: &Arc<Mutex<Item>>) {
    let item = item_lock.lock().await.clone();

    if dsn::should_emit(&item) {
        let body = dsn::build_body(&item);
        match put_inner(shared, "<>", &[item.from.clone()], body.into_bytes()).await {
            Ok(dsn_id) => {
                shared.metrics.record_dsn_queued();
                info!(item_id = %id, dsn_id = %dsn_id, "dsn enqueued");
            }
            Err(e) => {
                warn!(item_id = %id, error = %e, "failed to enqueue dsn, swallowing");
            }
        }
    }

    shared.index.write().await.remove(id);
    if let Err(e) = store::remove_item_file(&shared.config.directory, id).await {
        warn!(item_id = %id, error = %e, "failed to remove item file");
    }
}
