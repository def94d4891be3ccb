use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use lru::LruCache;
use parking_lot::Mutex;
use crate::core::types::TimePeriod;
use crate::taxonomy::category::Category;

#[derive(Debug)]
struct IdentityData {
    id: u32,
    title: String,
    category: Category,
    question: String,
    period: TimePeriod,
}

/// Content-addressed identity of a parsed essay. Cloning is cheap; equality is
/// content equality with a pointer fast path.
#[derive(Clone)]
pub struct RecordIdentity(Arc<IdentityData>);

impl RecordIdentity {
    /// A fresh, un-interned identity
    pub fn new(title: String, category: Category, question: String, period: TimePeriod) -> Self {
        let id = content_hash(&title, &category, &question, &period);
        RecordIdentity(Arc::new(IdentityData {
            id,
            title,
            category,
            question,
            period,
        }))
    }

    /// The 32-bit content hash, also the storage primary key
    pub fn id(&self) -> u32 {
        self.0.id
    }

    pub fn title(&self) -> &str {
        &self.0.title
    }

    pub fn category(&self) -> &Category {
        &self.0.category
    }

    pub fn question(&self) -> &str {
        &self.0.question
    }

    pub fn period(&self) -> TimePeriod {
        self.0.period
    }

    /// Same in-memory instance
    pub fn ptr_eq(&self, other: &RecordIdentity) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn has_content(&self, title: &str, category: &Category, question: &str, period: &TimePeriod) -> bool {
        self.0.title == title
            && self.0.question == question
            && self.0.period == *period
            && self.0.category == *category
    }
}

impl PartialEq for RecordIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.id == other.0.id
                && other.has_content(&self.0.title, &self.0.category, &self.0.question, &self.0.period))
    }
}

impl Eq for RecordIdentity {}

impl Hash for RecordIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.0.id);
    }
}

impl fmt::Debug for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordIdentity")
            .field("id", &self.0.id)
            .field("title", &self.0.title)
            .field("category", &self.0.category.display_name())
            .field("question", &self.0.question)
            .field("period", &self.0.period.display_name())
            .finish()
    }
}

fn write_field(hasher: &mut crc32fast::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u32).to_le_bytes());
    hasher.update(bytes);
}

/// CRC-32 over a length-prefixed encoding of every identity field. Stable
/// across processes and platforms.
pub fn content_hash(title: &str, category: &Category, question: &str, period: &TimePeriod) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&[category.group(), category.is_active() as u8]);
    write_field(&mut hasher, category.display_name().as_bytes());
    hasher.update(&(category.aliases().len() as u32).to_le_bytes());
    for alias in category.aliases() {
        write_field(&mut hasher, alias.as_bytes());
    }
    write_field(&mut hasher, question.as_bytes());
    write_field(&mut hasher, title.as_bytes());
    hasher.update(&period.key().to_le_bytes());
    hasher.finalize()
}

struct InternEntry {
    identity: Weak<IdentityData>,
    touched: Instant,
}

/// Short-lived interning table: structurally identical identities resolve to
/// one instance while that instance is alive and was touched within `ttl`.
/// Purely an allocation saver; equal content compares equal either way.
pub struct IdentityInterner {
    entries: Mutex<LruCache<u32, InternEntry>>,
    ttl: Duration,
}

impl IdentityInterner {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        IdentityInterner {
            entries: Mutex::new(LruCache::new(cap)),
            ttl,
        }
    }

    pub fn intern(&self, title: String, category: Category, question: String, period: TimePeriod) -> RecordIdentity {
        let id = content_hash(&title, &category, &question, &period);
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(&id) {
            if entry.touched.elapsed() <= self.ttl {
                if let Some(data) = entry.identity.upgrade() {
                    let existing = RecordIdentity(data);
                    if existing.has_content(&title, &category, &question, &period) {
                        entry.touched = Instant::now();
                        return existing;
                    }
                }
            }
        }

        let identity = RecordIdentity(Arc::new(IdentityData {
            id,
            title,
            category,
            question,
            period,
        }));
        entries.put(id, InternEntry {
            identity: Arc::downgrade(&identity.0),
            touched: Instant::now(),
        });
        identity
    }

    /// Drop entries that expired or whose identity is gone
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let stale: Vec<u32> = entries
            .iter()
            .filter(|(_, entry)| entry.touched.elapsed() > self.ttl || entry.identity.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            entries.pop(id);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
