use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Document;
use crate::index::identity::RecordIdentity;

/// Sent when the last owner of a cached record lets go of it
#[derive(Debug)]
pub struct Eviction {
    pub identity: RecordIdentity,
    /// None if the record was closed before it was released
    pub payload: Option<Document>,
}

/// A parsed essay: immutable identity plus the document payload it owns
/// until closed.
pub struct Record {
    identity: RecordIdentity,
    payload: Mutex<Option<Document>>,
    write_back: OnceLock<Sender<Eviction>>,
    disowned: AtomicBool,
}

impl Record {
    pub fn new(identity: RecordIdentity, document: Document) -> Self {
        Record {
            identity,
            payload: Mutex::new(Some(document)),
            write_back: OnceLock::new(),
            disowned: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &RecordIdentity {
        &self.identity
    }

    /// Borrow the payload. Fails once the record is closed.
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> Result<R> {
        let payload = self.payload.lock();
        match payload.as_ref() {
            Some(document) => Ok(f(document)),
            None => Err(Error::new(
                ErrorKind::Closed,
                format!("Record {} is closed", self.identity.id()),
            )),
        }
    }

    pub fn document(&self) -> Result<Document> {
        self.with_document(Document::clone)
    }

    /// Release the payload. Idempotent; returns true on the call that released it.
    pub fn close(&self) -> bool {
        self.payload.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.payload.lock().is_none()
    }

    /// Route this record's payload to `sender` when it is dropped. Only the
    /// first attachment wins.
    pub(crate) fn attach_write_back(&self, sender: &Sender<Eviction>) -> bool {
        self.write_back.set(sender.clone()).is_ok()
    }

    /// The persisted row is gone; dropping this record must not bring it back
    pub(crate) fn disown(&self) {
        self.disowned.store(true, Ordering::Release);
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        if self.disowned.load(Ordering::Acquire) {
            return;
        }
        if let Some(sender) = self.write_back.get() {
            let payload = self.payload.get_mut().take();
            // Receiver gone means the cache shut down; nothing left to notify
            let _ = sender.send(Eviction {
                identity: self.identity.clone(),
                payload,
            });
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("identity", &self.identity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
