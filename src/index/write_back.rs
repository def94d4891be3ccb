use std::sync::Arc;
use std::thread;
use crossbeam::channel::Receiver;
use tracing::{debug, error, warn};
use crate::core::error::Result;
use crate::index::document_cache::{DocumentCache, Retirement};
use crate::index::record::Eviction;
use crate::parallel::worker_pool::WorkerPool;
use crate::storage::codec::DocumentCodec;
use crate::storage::store::{RowMetadata, Store};

/// Everything a write-back job needs. Holds no reference to the index cache
/// itself, so records outliving the cache can still be persisted.
pub(crate) struct WriteBack {
    pub documents: Arc<DocumentCache>,
    pub workers: Arc<WorkerPool>,
    pub store: Arc<dyn Store>,
    pub codec: Arc<dyn DocumentCodec>,
}

impl WriteBack {
    /// Start the bookkeeping thread. It retires released records from the
    /// document cache and hands persistence to the worker pool, so it never
    /// waits on storage. Exits once every eviction sender is gone.
    pub fn start(self, evictions: Receiver<Eviction>) -> Result<()> {
        thread::Builder::new()
            .name("essay-cache-bookkeeper".into())
            .spawn(move || {
                for eviction in evictions.iter() {
                    self.retire(eviction);
                }
                debug!("Eviction channel closed, bookkeeper exiting");
            })?;
        Ok(())
    }

    fn retire(&self, eviction: Eviction) {
        match self.documents.retire(&eviction.identity) {
            Retirement::Superseded => {
                debug!(id = eviction.identity.id(), "Released record superseded, skipping write-back");
            }
            Retirement::Removed => {
                let store = Arc::clone(&self.store);
                let codec = Arc::clone(&self.codec);
                self.workers.spawn(move || persist(store.as_ref(), codec.as_ref(), eviction));
            }
        }
    }
}

/// Best effort: failures are logged and dropped
pub(crate) fn persist(store: &dyn Store, codec: &dyn DocumentCodec, eviction: Eviction) {
    let Eviction { identity, payload } = eviction;
    let metadata = RowMetadata::from_identity(&identity);

    let outcome = match payload {
        Some(document) => codec
            .encode(&document)
            .and_then(|bytes| store.upsert(&metadata, Some(&bytes))),
        None => store.upsert(&metadata, None),
    };

    match outcome {
        Ok(true) => debug!(id = metadata.id, title = %metadata.title, "Wrote back evicted record"),
        Ok(false) => warn!(
            id = metadata.id,
            "Closed record has no stored row to refresh, skipping write-back"
        ),
        Err(e) => error!(id = metadata.id, error = %e, "Write-back failed"),
    }
}
