use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use parking_lot::Mutex;
use tempfile::TempDir;
use essay_index::core::logging;
use essay_index::query::translator::Constraint;
use essay_index::storage::codec::FormFeedCodec;
use essay_index::storage::sqlite::SqliteStore;
use essay_index::storage::store::{RowMetadata, Store, StoredRow};
use essay_index::{Config, Error, ErrorKind, IndexCache, QueryDescription, ReferenceRegistry, Result};

const HISTORY: &str = "Extended Essay\nSubject: History\nTitle: The Role of Railways\n\
    Research Question: Did railways cause the war?\nNovember 2021\n";
const PHYSICS: &str = "Subject: Physics\nTopic: Refraction in Water\n\
    Research Question: How does light bend in water?\nMay 2019\n";
const FRENCH: &str = "Subject: French A\nTitle: Camus and the Absurd\n\
    Research Question: Is Meursault guilty?\nMay 2020\n";

/// Store wrapper that counts selects, can slow them down and fail them on demand
struct InstrumentedStore {
    inner: SqliteStore,
    selects: AtomicUsize,
    select_delay: Mutex<Duration>,
    fail_next_select: AtomicBool,
}

impl InstrumentedStore {
    fn new(inner: SqliteStore) -> Self {
        InstrumentedStore {
            inner,
            selects: AtomicUsize::new(0),
            select_delay: Mutex::new(Duration::ZERO),
            fail_next_select: AtomicBool::new(false),
        }
    }
}

impl Store for InstrumentedStore {
    fn bootstrap(&self) -> Result<()> {
        self.inner.bootstrap()
    }

    fn upsert(&self, row: &RowMetadata, payload: Option<&[u8]>) -> Result<bool> {
        self.inner.upsert(row, payload)
    }

    fn delete(&self, id: u32) -> Result<usize> {
        self.inner.delete(id)
    }

    fn delete_matching(&self, constraint: &Constraint) -> Result<usize> {
        self.inner.delete_matching(constraint)
    }

    fn select(&self, constraint: &Constraint) -> Result<Vec<StoredRow>> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        let delay = *self.select_delay.lock();
        thread::sleep(delay);
        if self.fail_next_select.swap(false, Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::Storage, "connection reset"));
        }
        self.inner.select(constraint)
    }

    fn matching_ids(&self, constraint: &Constraint) -> Result<Vec<u32>> {
        self.inner.matching_ids(constraint)
    }
}

struct Fixture {
    dir: TempDir,
    config: Config,
    store: Arc<InstrumentedStore>,
    cache: IndexCache,
}

fn fixture() -> Fixture {
    logging::init("warn");
    let dir = TempDir::new().unwrap();
    let config = Config {
        storage_path: dir.path().join("essays.db"),
        max_io_threads: 4,
        ..Config::default()
    };
    let store = Arc::new(InstrumentedStore::new(SqliteStore::open(&config).unwrap()));
    let registry = Arc::new(ReferenceRegistry::with_default_taxonomy());
    let cache = IndexCache::new(&config, registry, store.clone(), Arc::new(FormFeedCodec)).unwrap();
    Fixture { dir, config, store, cache }
}

impl Fixture {
    fn essay(&self, name: &str, cover: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, format!("{}\x0CChapter one\x0CBibliography", cover)).unwrap();
        path
    }

    fn stored_rows(&self) -> Vec<StoredRow> {
        self.store.inner.select(&Constraint::default()).unwrap()
    }

    /// Index and wait for the indexing-time record to be written back
    fn index(&self, files: Vec<PathBuf>) {
        self.cache.index_all(files, |_, _| {}).wait().unwrap();
        thread::sleep(Duration::from_millis(100));
    }
}

fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn extracted_fields_survive_indexing() {
    let fx = fixture();
    fx.index(vec![fx.essay("history.txt", HISTORY)]);

    let results = fx.cache.query(QueryDescription::all()).wait().unwrap();
    assert_eq!(results.len(), 1);
    let identity = results.entries[0].record().identity();
    assert_eq!(identity.category().display_name(), "History");
    assert_eq!(identity.title(), "The Role of Railways");
    assert_eq!(identity.question(), "Did railways cause the war?");
    assert_eq!(identity.period().display_name(), "N21");
    assert!(results.entries[0].excerpts().is_empty());
}

#[test]
fn indexing_twice_keeps_one_row() {
    let fx = fixture();
    let file = fx.essay("history.txt", HISTORY);
    fx.index(vec![file.clone()]);
    fx.index(vec![file]);

    let rows = fx.stored_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].metadata.title, "The Role of Railways");
}

#[test]
fn each_file_reports_once_and_failures_do_not_abort_siblings() {
    let fx = fixture();
    let files = vec![
        fx.essay("history.txt", HISTORY),
        fx.essay("physics.txt", PHYSICS),
        fx.essay("blank.txt", "Nothing to see here\n"),
        fx.essay("unknown.txt", "Subject: Astrology\nTitle: Stars\nResearch Question: Why?\n"),
        fx.dir.path().join("missing.txt"),
    ];

    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    fx.cache
        .index_all(files, move |file, ok| {
            let name = file.file_name().unwrap().to_string_lossy().into_owned();
            sink.lock().push((name, ok));
        })
        .wait()
        .unwrap();

    let mut reports = reports.lock().clone();
    reports.sort();
    assert_eq!(
        reports,
        vec![
            ("blank.txt".to_string(), false),
            ("history.txt".to_string(), true),
            ("missing.txt".to_string(), false),
            ("physics.txt".to_string(), true),
            ("unknown.txt".to_string(), false),
        ]
    );
    assert_eq!(fx.stored_rows().len(), 2);
}

#[test]
fn empty_file_list_completes_immediately() {
    let fx = fixture();
    assert!(fx.cache.index_all(Vec::new(), |_, _| {}).wait().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn identical_concurrent_queries_hit_storage_once() {
    let fx = fixture();
    let file = fx.essay("history.txt", HISTORY);
    fx.cache.index_all(vec![file], |_, _| {}).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    *fx.store.select_delay.lock() = Duration::from_millis(200);

    let query = QueryDescription::all().with_pattern("rail", "i");
    let first = fx.cache.query(query.clone());
    let second = fx.cache.query(query.clone());
    let (first, second) = tokio::join!(first, second);

    let (first, second) = (first.unwrap(), second.unwrap());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 1);
    assert_eq!(fx.store.selects.load(Ordering::SeqCst), 1);

    // Third call is a cache hit
    fx.cache.query(query).await.unwrap();
    assert_eq!(fx.store.selects.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_query_is_retried_fresh() {
    let fx = fixture();
    fx.index(vec![fx.essay("history.txt", HISTORY)]);
    fx.store.fail_next_select.store(true, Ordering::SeqCst);

    let query = QueryDescription::all();
    let err = fx.cache.query(query.clone()).wait().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Storage);
    assert!(fx.cache.get_cached_result(&query).is_none());

    let results = fx.cache.query(query).wait().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(fx.store.selects.load(Ordering::SeqCst), 2);
}

#[test]
fn released_records_are_written_back() {
    let fx = fixture();
    fx.index(vec![fx.essay("history.txt", HISTORY)]);

    let results = fx.cache.query(QueryDescription::all()).wait().unwrap();
    let record = Arc::clone(results.entries[0].record());
    let id = record.identity().id();
    drop(results);
    fx.cache.invalidate_results();

    // Remove the row behind the cache's back; only the record still knows it
    assert_eq!(fx.store.delete(id).unwrap(), 1);
    assert!(fx.stored_rows().is_empty());

    let expected = record.document().unwrap();
    drop(record);

    assert!(wait_for(|| fx.stored_rows().len() == 1));
    let row = &fx.stored_rows()[0];
    assert_eq!(row.metadata.id, id);
    assert_eq!(row.payload, expected.pages.join("\x0C").into_bytes());
}

#[test]
fn unregistered_categories_are_recovered_from_the_payload() {
    let fx = fixture();
    fx.index(vec![fx.essay("french.txt", FRENCH)]);
    assert!(fx.cache.registry().contains_name("French"));

    // A later process starts with only the built-in taxonomy
    let fresh_registry = Arc::new(ReferenceRegistry::with_default_taxonomy());
    assert!(!fresh_registry.contains_name("French"));
    let reopened = IndexCache::new(&fx.config, Arc::clone(&fresh_registry), fx.store.clone(), Arc::new(FormFeedCodec)).unwrap();

    let results = reopened.query(QueryDescription::all()).wait().unwrap();
    assert_eq!(results.len(), 1);
    let category = results.entries[0].record().identity().category().clone();
    assert_eq!(category.display_name(), "French");
    assert_eq!(category.group(), 1);
    assert!(fresh_registry.contains_name("French"));
}

#[test]
fn zero_limit_is_rejected_by_the_translator() {
    use essay_index::query::translator::{QueryTranslator, UNBOUNDED};

    let err = QueryTranslator::translate(&QueryDescription::all(), 0).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidLimit);
    let unbounded = QueryTranslator::translate(&QueryDescription::all(), UNBOUNDED).unwrap();
    assert!(unbounded.limit_clause().is_empty());
}
