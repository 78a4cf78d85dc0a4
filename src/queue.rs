//! Queue façade: admission, removal, enumeration, startup recovery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::alias::AliasResolver;
use crate::clock::SharedClock;
use crate::config::QueueConfig;
use crate::courier::{Courier, LocalDomains};
use crate::error::AdmissionError;
use crate::id::IdGenerator;
use crate::item::{Item, Recipient};
use crate::metrics::Metrics;
use crate::{store, worker};

/// State shared between the façade and every item's worker task. Workers
/// hold an `Arc<Shared>` so they can persist, remove themselves from the
/// index, and re-enter `put` to emit a DSN.
pub(crate) struct Shared {
    pub(crate) config: QueueConfig,
    pub(crate) index: RwLock<HashMap<String, Arc<Mutex<Item>>>>,
    pub(crate) id_gen: IdGenerator,
    pub(crate) alias: Box<dyn AliasResolver>,
    pub(crate) local_domains: Box<dyn LocalDomains>,
    pub(crate) local_courier: Box<dyn Courier>,
    pub(crate) remote_courier: Box<dyn Courier>,
    pub(crate) clock: SharedClock,
    pub(crate) metrics: Metrics,
}

/// The queue façade. Cheap to clone (an `Arc` underneath); every clone
/// refers to the same index, disk directory, and metrics.
#[derive(Clone)]
pub struct Queue {
    shared: Arc<Shared>,
}

pub struct QueueBuilder {
    config: QueueConfig,
    alias: Box<dyn AliasResolver>,
    local_domains: Box<dyn LocalDomains>,
    local_courier: Box<dyn Courier>,
    remote_courier: Box<dyn Courier>,
    clock: SharedClock,
}

impl QueueBuilder {
    #[must_use]
    pub fn new(
        config: QueueConfig,
        alias: impl AliasResolver,
        local_domains: impl LocalDomains,
        local_courier: impl Courier,
        remote_courier: impl Courier,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            alias: Box::new(alias),
            local_domains: Box::new(local_domains),
            local_courier: Box::new(local_courier),
            remote_courier: Box::new(remote_courier),
            clock,
        }
    }

    /// Creates the queue directory if missing and builds the façade. Does
    /// not run `Load`; call [`Queue::load`] explicitly on startup if
    /// recovering from a previous run.
    pub async fn build(self) -> Result<Queue, AdmissionError> {
        self.config.validate()?;

        store::ensure_directory(&self.config.directory)
            .await
            .map_err(|e| AdmissionError::Internal(e.to_string()))?;

        Ok(Queue {
            shared: Arc::new(Shared {
                config: self.config,
                index: RwLock::new(HashMap::new()),
                id_gen: IdGenerator::spawn(),
                alias: self.alias,
                local_domains: self.local_domains,
                local_courier: self.local_courier,
                remote_courier: self.remote_courier,
                clock: self.clock,
                metrics: Metrics::new(),
            }),
        })
    }
}

/// Admission logic shared between `Queue::put` and the DSN re-entry path in
/// `worker.rs`, which holds an `Arc<Shared>` but not a `Queue` handle.
pub(crate) async fn put_inner(
    shared: &Arc<Shared>,
    from: &str,
    to: &[String],
    data: Vec<u8>,
) -> Result<String, AdmissionError> {
    {
        let len = shared.index.read().await.len();
        if len >= shared.config.max_queue_size {
            return Err(AdmissionError::QueueFull);
        }
    }

    let id = shared
        .id_gen
        .next()
        .await
        .ok_or_else(|| AdmissionError::Internal("id generator stopped".to_string()))?;

    let mut rcpt = Vec::new();
    for t in to {
        let expansions = shared
            .alias
            .resolve(t)
            .await
            .map_err(|e| AdmissionError::AliasResolution {
                address: t.clone(),
                reason: e.0,
            })?;

        if expansions.is_empty() {
            return Err(AdmissionError::EmptyExpansion { address: t.clone() });
        }

        for expansion in expansions {
            rcpt.push(Recipient::new(expansion.address, t.clone(), expansion.kind));
        }
    }

    let item = Item {
        id: id.clone(),
        from: from.to_string(),
        to: to.to_vec(),
        data,
        created_at: shared.clock.now(),
        rcpt,
    };

    store::write_item(&shared.config.directory, &item)
        .await
        .map_err(|e| AdmissionError::Internal(e.to_string()))?;
    shared.metrics.record_item_written();

    let item_lock = Arc::new(Mutex::new(item));
    shared
        .index
        .write()
        .await
        .insert(id.clone(), Arc::clone(&item_lock));

    shared.metrics.record_put();
    worker::spawn(Arc::clone(shared), id.clone(), item_lock);

    Ok(id)
}

impl Queue {
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.shared.metrics
    }

    /// Admits a new item: resolves aliases for every recipient, writes the
    /// item to disk, indexes it, and spawns its worker.
    pub async fn put(&self, from: &str, to: &[String], data: Vec<u8>) -> Result<String, AdmissionError> {
        put_inner(&self.shared, from, to, data).await
    }

    /// `Remove(id)` — unlinks the file and drops the index entry.
    /// Idempotent: removing an already-removed id is a no-op.
    pub async fn remove(&self, id: &str) {
        self.shared.index.write().await.remove(id);
        if let Err(e) = store::remove_item_file(&self.shared.config.directory, id).await {
            warn!(item_id = id, error = %e, "failed to remove item file");
        }
    }

    /// `Len()` — current index size.
    pub async fn len(&self) -> usize {
        self.shared.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// `DumpString()` — human-readable debug snapshot. No stability
    /// requirements; for diagnostics only.
    pub async fn dump_string(&self) -> String {
        let index = self.shared.index.read().await;
        let mut out = String::new();

        for (id, item_lock) in index.iter() {
            let item = item_lock.lock().await;
            let created: SystemTime = item.created_at;
            out.push_str(&format!("{id} from={} created_at={created:?}\n", item.from));
            for r in &item.rcpt {
                out.push_str(&format!(
                    "  {} ({:?}) status={:?} last_failure={:?}\n",
                    r.address, r.kind, r.status, r.last_failure_message
                ));
            }
        }

        out
    }

    /// Startup recovery. Globs `<dir>/m:*`, parses each file, inserts into
    /// the index, and spawns a worker per item. Parse failures are logged
    /// and skipped; the offending file is left in place.
    pub async fn load(&self) -> Result<usize, AdmissionError> {
        let files = store::list_item_files(&self.shared.config.directory)
            .await
            .map_err(|e| AdmissionError::Internal(e.to_string()))?;

        let mut loaded = 0;
        for path in files {
            match store::read_item(&path).await {
                Ok(item) => {
                    let id = item.id.clone();
                    let item_lock = Arc::new(Mutex::new(item));
                    self.shared
                        .index
                        .write()
                        .await
                        .insert(id.clone(), Arc::clone(&item_lock));
                    worker::spawn(Arc::clone(&self.shared), id, item_lock);
                    loaded += 1;
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to parse item on load, leaving file in place");
                }
            }
        }

        info!(loaded, "queue recovery complete");
        Ok(loaded)
    }
}
