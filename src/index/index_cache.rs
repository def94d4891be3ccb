use std::collections::{HashMap, HashSet};
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use crossbeam::channel::{Sender, unbounded};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use crate::analysis::extractor::DocumentExtractor;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::TimePeriod;
use crate::index::document_cache::DocumentCache;
use crate::index::identity::{IdentityInterner, RecordIdentity};
use crate::index::record::{Eviction, Record};
use crate::index::write_back::WriteBack;
use crate::parallel::worker_pool::{Pending, WorkerPool};
use crate::query::cache::{CacheStats, QueryCache};
use crate::query::translator::{Constraint, QueryTranslator, UNBOUNDED};
use crate::query::types::QueryDescription;
use crate::search::results::{ResultEntry, SearchResults};
use crate::storage::codec::{DocumentCodec, FormFeedCodec};
use crate::storage::sqlite::SqliteStore;
use crate::storage::store::{RowMetadata, Store, StoredRow};
use crate::taxonomy::registry::ReferenceRegistry;

type Waiter = oneshot::Sender<Result<Arc<SearchResults>>>;

struct Shared {
    store: Arc<dyn Store>,
    codec: Arc<dyn DocumentCodec>,
    extractor: DocumentExtractor,
    interner: IdentityInterner,
    documents: Arc<DocumentCache>,
    results: QueryCache,
    in_flight: Mutex<HashMap<QueryDescription, Vec<Waiter>>>,
    // Bumped on every invalidation; results computed against an older
    // generation are handed to waiters but not cached
    generation: AtomicU64,
    workers: Arc<WorkerPool>,
    evictions: Sender<Eviction>,
}

/// Query-result cache, weak document cache and bulk indexer over one store.
/// Cloning shares the same caches.
#[derive(Clone)]
pub struct IndexCache {
    shared: Arc<Shared>,
}

impl IndexCache {
    /// Wire a cache over an arbitrary store and codec
    pub fn new(
        config: &Config,
        registry: Arc<ReferenceRegistry>,
        store: Arc<dyn Store>,
        codec: Arc<dyn DocumentCodec>,
    ) -> Result<Self> {
        config.validate()?;
        let workers = Arc::new(WorkerPool::new(config.worker_threads())?);
        let documents = Arc::new(DocumentCache::new());
        let (evictions, receiver) = unbounded();

        WriteBack {
            documents: Arc::clone(&documents),
            workers: Arc::clone(&workers),
            store: Arc::clone(&store),
            codec: Arc::clone(&codec),
        }
        .start(receiver)?;

        info!(
            workers = workers.threads(),
            query_cache_size = config.query_cache_size,
            "Index cache ready"
        );

        Ok(IndexCache {
            shared: Arc::new(Shared {
                store,
                codec,
                extractor: DocumentExtractor::new(registry),
                interner: IdentityInterner::new(config.intern_capacity, config.intern_ttl()),
                documents,
                results: QueryCache::new(config.query_cache_size),
                in_flight: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                workers,
                evictions,
            }),
        })
    }

    /// SQLite store at `config.storage_path` with form-feed paged documents
    pub fn open(config: &Config, registry: Arc<ReferenceRegistry>) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(config)?);
        Self::new(config, registry, store, Arc::new(FormFeedCodec))
    }

    pub fn registry(&self) -> &Arc<ReferenceRegistry> {
        self.shared.extractor.registry()
    }

    /// Run `query`, reusing a cached result or an identical query already in flight
    pub fn query(&self, query: QueryDescription) -> Pending<Arc<SearchResults>> {
        // Fast path: cached result
        if let Some(results) = self.shared.results.get(&query) {
            debug!(?query, "Query cache hit");
            return Pending::ready(Ok(results));
        }

        let constraint = match QueryTranslator::translate(&query, UNBOUNDED) {
            Ok(constraint) => constraint,
            Err(e) => return Pending::ready(Err(e)),
        };

        let (waiter, pending) = Pending::channel();
        let generation = {
            let mut in_flight = self.shared.in_flight.lock();
            // Settled between the cache check and taking the lock
            if let Some(results) = self.shared.results.peek(&query) {
                return Pending::ready(Ok(results));
            }
            if let Some(waiters) = in_flight.get_mut(&query) {
                waiters.push(waiter);
                debug!(?query, waiters = waiters.len(), "Attached to in-flight query");
                return pending;
            }
            in_flight.insert(query.clone(), vec![waiter]);
            self.shared.generation.load(Ordering::Acquire)
        };

        // Slow path: run against storage on the worker pool
        let shared = Arc::clone(&self.shared);
        self.shared.workers.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| shared.execute(&constraint)))
                .unwrap_or_else(|_| Err(Error::new(ErrorKind::Internal, "Query execution panicked")));
            shared.settle(query, generation, outcome);
        });
        pending
    }

    /// Cached result for `query`, if any. Never touches storage.
    pub fn get_cached_result(&self, query: &QueryDescription) -> Option<Arc<SearchResults>> {
        self.shared.results.get(query)
    }

    /// Cached record for `identity`, if some owner still holds it. Never touches storage.
    pub fn get_cached_record(&self, identity: &RecordIdentity) -> Option<Arc<Record>> {
        self.shared.documents.get(identity)
    }

    pub fn list_cached_records(&self) -> Vec<Arc<Record>> {
        self.shared.documents.snapshot()
    }

    /// Put `record` in the document cache, replacing any record with the same
    /// identity. The record is written back once the last owner drops it.
    pub fn cache_record(&self, record: Record) -> Arc<Record> {
        self.shared.cache_record(record)
    }

    /// Index every file concurrently. `on_each` fires exactly once per file
    /// with whether it was indexed; the returned handle resolves after all of
    /// them have fired.
    pub fn index_all<I, F>(&self, files: I, on_each: F) -> Pending<()>
    where
        I: IntoIterator<Item = PathBuf>,
        F: Fn(&Path, bool) + Send + Sync + 'static,
    {
        let files: Vec<PathBuf> = files.into_iter().collect();
        if files.is_empty() {
            return Pending::ready(Ok(()));
        }
        info!(files = files.len(), "Indexing essays");

        let (done, pending) = Pending::channel();
        let done = Arc::new(Mutex::new(Some(done)));
        let remaining = Arc::new(AtomicUsize::new(files.len()));
        let on_each = Arc::new(on_each);

        for file in files {
            let shared = Arc::clone(&self.shared);
            let done = Arc::clone(&done);
            let remaining = Arc::clone(&remaining);
            let on_each = Arc::clone(&on_each);

            self.shared.workers.spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| shared.index_file(&file)))
                    .unwrap_or_else(|_| Err(Error::new(ErrorKind::Internal, "Indexing panicked")));
                match &outcome {
                    Ok(identity) => info!(file = %file.display(), id = identity.id(), "Indexed essay"),
                    Err(e) => warn!(file = %file.display(), error = %e, "Failed to index essay"),
                }

                let callback: &F = &on_each;
                if catch_unwind(AssertUnwindSafe(|| callback(&file, outcome.is_ok()))).is_err() {
                    error!(file = %file.display(), "Indexing callback panicked");
                }

                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    if let Some(done) = done.lock().take() {
                        let _ = done.send(Ok(()));
                    }
                }
            });
        }
        pending
    }

    /// Delete the stored row for `identity`. A cached record for it is
    /// detached first so its release does not write the row back.
    pub fn delete_record(&self, identity: &RecordIdentity) -> Pending<usize> {
        let shared = Arc::clone(&self.shared);
        let identity = identity.clone();
        self.shared.workers.submit(move || {
            shared.documents.disown_where(|cached| *cached == identity);
            let removed = shared.store.delete(identity.id())?;
            shared.invalidate_results();
            debug!(id = identity.id(), removed, "Deleted essay");
            Ok(removed)
        })
    }

    /// Delete every stored row matching `query`
    pub fn delete_matching(&self, query: &QueryDescription) -> Pending<usize> {
        let constraint = match QueryTranslator::translate(query, UNBOUNDED) {
            Ok(constraint) => constraint,
            Err(e) => return Pending::ready(Err(e)),
        };
        let shared = Arc::clone(&self.shared);
        self.shared.workers.submit(move || {
            let doomed: HashSet<u32> = shared.store.matching_ids(&constraint)?.into_iter().collect();
            let detached = shared.documents.disown_where(|cached| doomed.contains(&cached.id()));
            let removed = shared.store.delete_matching(&constraint)?;
            shared.invalidate_results();
            info!(removed, detached, "Deleted matching essays");
            Ok(removed)
        })
    }

    /// Drop every cached query result
    pub fn invalidate_results(&self) {
        self.shared.invalidate_results();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.results.stats()
    }
}

impl Shared {
    fn cache_record(&self, record: Record) -> Arc<Record> {
        let record = Arc::new(record);
        self.documents.insert(&record, &self.evictions);
        record
    }

    fn invalidate_results(&self) {
        let _in_flight = self.in_flight.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.results.clear();
    }

    fn execute(&self, constraint: &Constraint) -> Result<Arc<SearchResults>> {
        let started = Instant::now();
        let rows = self.store.select(constraint)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let record = self.resolve(row)?;
            entries.push(ResultEntry::new(record, &[]));
        }

        let purged = self.interner.purge_expired();
        let took_ms = started.elapsed().as_millis() as u64;
        debug!(rows = entries.len(), took_ms, purged, "Query executed");
        Ok(Arc::new(SearchResults::new(entries, took_ms)))
    }

    /// Complete a query: cache a success, then wake every waiter
    fn settle(&self, query: QueryDescription, generation: u64, outcome: Result<Arc<SearchResults>>) {
        let waiters = {
            let mut in_flight = self.in_flight.lock();
            match &outcome {
                Ok(results) if self.generation.load(Ordering::Acquire) == generation => {
                    self.results.put(query.clone(), Arc::clone(results));
                }
                Ok(_) => debug!(?query, "Results went stale while running, not caching"),
                Err(e) => warn!(?query, error = %e, "Query failed"),
            }
            in_flight.remove(&query).unwrap_or_default()
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Turn a stored row into a record, preferring the cached instance
    fn resolve(&self, row: StoredRow) -> Result<Arc<Record>> {
        let StoredRow { metadata, payload } = row;
        let id = metadata.id;

        let Some(category) = self.extractor.registry().lookup_by_name(&metadata.category) else {
            return self.rehydrate_unregistered(id, &metadata.category, &payload);
        };
        let period = TimePeriod::from_key(metadata.period_key).map_err(|e| corrupt(id, e))?;
        let identity = self
            .interner
            .intern(metadata.title, category, metadata.question, period);

        if let Some(cached) = self.documents.get(&identity) {
            return Ok(cached);
        }
        let document = self.codec.decode(&payload).map_err(|e| corrupt(id, e))?;
        Ok(self.cache_record(Record::new(identity, document)))
    }

    /// The stored category is not in the registry (for example a language seen
    /// by an earlier process), so read the fields again from the cover page
    fn rehydrate_unregistered(&self, id: u32, category: &str, payload: &[u8]) -> Result<Arc<Record>> {
        debug!(id, category, "Re-extracting row with unregistered category");
        let document = self.codec.decode(payload).map_err(|e| corrupt(id, e))?;
        let fields = self
            .extractor
            .extract(&document.pages)
            .map_err(|e| corrupt(id, e))?;
        let identity = self
            .interner
            .intern(fields.title, fields.category, fields.question, fields.period);

        if let Some(cached) = self.documents.get(&identity) {
            return Ok(cached);
        }
        Ok(self.cache_record(Record::new(identity, document)))
    }

    fn index_file(&self, path: &Path) -> Result<RecordIdentity> {
        let raw = fs::read(path)?;
        let document = self.codec.decode(&raw)?;
        let fields = self.extractor.extract(&document.pages)?;
        let identity = self
            .interner
            .intern(fields.title, fields.category, fields.question, fields.period);

        // Keep the record alive until the row is written
        let _record = self.cache_record(Record::new(identity.clone(), document));
        self.store
            .upsert(&RowMetadata::from_identity(&identity), Some(&raw))?;
        self.invalidate_results();
        Ok(identity)
    }
}

fn corrupt(id: u32, cause: Error) -> Error {
    Error::new(ErrorKind::Storage, format!("Corrupt row {}: {}", id, cause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use crate::core::types::{Document, Session};
    use crate::query::types::PeriodConstraint;

    const COVER: &str = "Subject: History\nTitle: The Role of Railways\n\
        Research Question: Did railways cause the war?\nNovember 2021\n";

    fn setup(dir: &TempDir) -> IndexCache {
        let config = Config {
            storage_path: dir.path().join("essays.db"),
            max_io_threads: 2,
            ..Config::default()
        };
        IndexCache::open(&config, Arc::new(ReferenceRegistry::with_default_taxonomy())).unwrap()
    }

    fn write_essay(dir: &TempDir, name: &str, cover: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("{}\x0Cbody text", cover)).unwrap();
        path
    }

    #[test]
    fn indexed_essay_is_queryable() {
        let dir = TempDir::new().unwrap();
        let cache = setup(&dir);
        let file = write_essay(&dir, "essay.txt", COVER);

        cache.index_all(vec![file], |_, _| {}).wait().unwrap();

        let query = QueryDescription::all().with_pattern("railways", "i");
        let results = cache.query(query.clone()).wait().unwrap();
        assert_eq!(results.len(), 1);

        let record = results.entries[0].record();
        assert_eq!(record.identity().title(), "The Role of Railways");
        assert_eq!(record.identity().period().display_name(), "N21");
        assert_eq!(record.with_document(|d| d.page_count()).unwrap(), 2);

        // Served from cache afterwards, same instance
        let again = cache.query(query).wait().unwrap();
        assert!(Arc::ptr_eq(&results, &again));
        assert_eq!(cache.cache_stats().hit_count, 1);
    }

    #[test]
    fn query_prefers_cached_records() {
        let dir = TempDir::new().unwrap();
        let cache = setup(&dir);
        let file = write_essay(&dir, "essay.txt", COVER);
        cache.index_all(vec![file], |_, _| {}).wait().unwrap();

        let first = cache.query(QueryDescription::all()).wait().unwrap();
        let held = Arc::clone(first.entries[0].record());
        cache.invalidate_results();

        let period = PeriodConstraint::only(TimePeriod::new(2021, Session::November).unwrap());
        let second = cache.query(QueryDescription::all().with_period(period)).wait().unwrap();
        assert!(Arc::ptr_eq(&held, second.entries[0].record()));
        assert!(cache.get_cached_record(held.identity()).is_some());
    }

    #[test]
    fn invalid_queries_fail_without_touching_storage() {
        let dir = TempDir::new().unwrap();
        let cache = setup(&dir);
        let err = cache
            .query(QueryDescription::all().with_pattern("x", "q"))
            .wait()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn cached_records_follow_their_owners() {
        let dir = TempDir::new().unwrap();
        let cache = setup(&dir);
        let identity = RecordIdentity::new(
            "Title".into(),
            cache.registry().lookup_by_name("History").unwrap(),
            "Why?".into(),
            TimePeriod::UNKNOWN,
        );
        let record = cache.cache_record(Record::new(identity.clone(), Document::new(vec![COVER.into()])));
        assert_eq!(cache.list_cached_records().len(), 1);
        drop(record);
        assert!(cache.get_cached_record(&identity).is_none());
        assert!(cache.list_cached_records().is_empty());
    }

    #[test]
    fn delete_record_removes_row_and_results() {
        let dir = TempDir::new().unwrap();
        let cache = setup(&dir);
        let file = write_essay(&dir, "essay.txt", COVER);
        cache.index_all(vec![file], |_, _| {}).wait().unwrap();
        // Let the write-back of the indexing-time record land first
        std::thread::sleep(Duration::from_millis(100));

        let results = cache.query(QueryDescription::all()).wait().unwrap();
        let identity = results.entries[0].record().identity().clone();
        drop(results);

        assert_eq!(cache.delete_record(&identity).wait().unwrap(), 1);
        assert!(cache.get_cached_result(&QueryDescription::all()).is_none());

        // Give any stray write-back a chance to run before checking
        std::thread::sleep(Duration::from_millis(100));
        assert!(cache.query(QueryDescription::all()).wait().unwrap().is_empty());
    }

    #[test]
    fn delete_matching_uses_the_query() {
        let dir = TempDir::new().unwrap();
        let cache = setup(&dir);
        let history = write_essay(&dir, "a.txt", COVER);
        let physics = write_essay(
            &dir,
            "b.txt",
            "Subject: Physics\nTitle: Light in Water\nResearch Question: How does light bend?\nMay 2019\n",
        );
        cache.index_all(vec![history, physics], |_, _| {}).wait().unwrap();
        std::thread::sleep(Duration::from_millis(100));

        let physics_only = QueryDescription::all()
            .with_categories([cache.registry().lookup_by_name("physics").unwrap()]);
        assert_eq!(cache.delete_matching(&physics_only).wait().unwrap(), 1);

        std::thread::sleep(Duration::from_millis(100));
        let remaining = cache.query(QueryDescription::all()).wait().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.entries[0].record().identity().category().display_name(), "History");
    }
}
