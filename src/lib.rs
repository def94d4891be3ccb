pub mod core;
pub mod taxonomy;
pub mod analysis;
pub mod index;
pub mod query;
pub mod search;
pub mod storage;
pub mod compression;
pub mod parallel;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::index::index_cache::IndexCache;
pub use crate::query::types::{ConstraintType, PeriodConstraint, QueryDescription};
pub use crate::taxonomy::registry::ReferenceRegistry;

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                          ESSAY INDEX ARCHITECTURE                            │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── IndexCache ──────────────────────────────────┐
│                                                                              │
│  query(QueryDescription) ──► QueryCache (LRU, 20) ── hit ──► Pending::ready  │
│            │ miss                                                            │
│            ▼                                                                 │
│  in_flight: Mutex<HashMap<QueryDescription, Vec<Waiter>>>  (single-flight)   │
│            │ first caller                                                    │
│            ▼                                                                 │
│  WorkerPool (rayon) ──► QueryTranslator ──► Store::select ──► resolve rows   │
│                                                                │             │
│                           DocumentCache (Weak<Record>) ◄───────┘             │
│                                  │                                           │
│  index_all(files) ──► codec ──► DocumentExtractor ──► IdentityInterner       │
│                                  │                                           │
└──────────────────────────────────┼───────────────────────────────────────────┘
                                   │ last Arc<Record> dropped
                                   ▼
            Record::drop ──► crossbeam channel ──► bookkeeper thread
                                                        │ DocumentCache::retire
                                                        ▼
                                          WorkerPool ──► Store::upsert

┌──────────────────────────── Reference data ──────────────────────────────────┐
│  ReferenceRegistry: RwLock<RegistryState>                                    │
│    by_name / by_lower_name / by_group / active / inactive                    │
│  read by DocumentExtractor and rehydration, written on first language seen   │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── Storage ─────────────────────────────────────┐
│  SqliteStore ── ConnectionPool (parking_lot Mutex + Condvar)                 │
│    essays(id, title, category, period_key, question, payload)                │
│    regexp_like(text, pattern, flags)   payload: tag byte + LZ4               │
└──────────────────────────────────────────────────────────────────────────────┘
*/
