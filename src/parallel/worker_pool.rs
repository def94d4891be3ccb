use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::error;
use crate::core::error::{Error, ErrorKind, Result};

/// Bounded pool running storage and parsing work off the caller's thread
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("essay-io-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("Failed to start worker pool: {}", e)))?;
        Ok(WorkerPool { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Fire and forget. A panicking job is logged instead of taking the pool down.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(move || {
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                error!("Worker job panicked");
            }
        });
    }

    /// Run `job` on the pool and hand its result back through a `Pending`
    pub fn submit<T, F>(&self, job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, pending) = Pending::channel();
        self.pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(job))
                .unwrap_or_else(|_| Err(Error::new(ErrorKind::Internal, "Worker job panicked")));
            // Caller may have dropped the handle
            let _ = tx.send(outcome);
        });
        pending
    }
}

enum PendingState<T> {
    Ready(Option<Result<T>>),
    Waiting(oneshot::Receiver<Result<T>>),
}

/// Handle to a result produced on the worker pool. Await it from async code or
/// `wait()` for it from a plain thread. Dropping it does not cancel the work.
pub struct Pending<T> {
    state: PendingState<T>,
}

// The result is only ever moved out, never pinned
impl<T> Unpin for Pending<T> {}

impl<T> Pending<T> {
    pub fn ready(result: Result<T>) -> Self {
        Pending {
            state: PendingState::Ready(Some(result)),
        }
    }

    pub(crate) fn channel() -> (oneshot::Sender<Result<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Pending { state: PendingState::Waiting(rx) })
    }

    /// True if the result is available without waiting
    pub fn is_ready(&self) -> bool {
        matches!(self.state, PendingState::Ready(_))
    }

    /// Block the current thread until the result arrives. Must not be called
    /// from inside an async runtime.
    pub fn wait(self) -> Result<T> {
        match self.state {
            PendingState::Ready(slot) => slot.unwrap_or_else(|| Err(consumed())),
            PendingState::Waiting(rx) => rx.blocking_recv().unwrap_or_else(|_| Err(abandoned())),
        }
    }
}

fn consumed() -> Error {
    Error::new(ErrorKind::Internal, "Result already taken")
}

fn abandoned() -> Error {
    Error::new(ErrorKind::Internal, "Worker dropped the result")
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            PendingState::Ready(slot) => Poll::Ready(slot.take().unwrap_or_else(|| Err(consumed()))),
            PendingState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or_else(|_| Err(abandoned()))),
        }
    }
}
