use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::{Duration, Instant};
use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use crate::core::error::{Error, ErrorKind, Result};

/// Fixed-size pool of SQLite connections
pub struct ConnectionPool {
    idle: Mutex<Vec<Connection>>,
    available: Condvar,
    size: usize,
    timeout: Duration,
}

/// Connection on loan; goes back to the pool on drop
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl ConnectionPool {
    /// Open `size` connections to `path`, running `init` on each
    pub fn open<F>(path: &Path, size: usize, timeout: Duration, init: F) -> Result<Self>
    where
        F: Fn(&Connection) -> rusqlite::Result<()>,
    {
        if size == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "Pool size must be positive"));
        }
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open(path)?;
            init(&conn)?;
            connections.push(conn);
        }
        Ok(ConnectionPool {
            idle: Mutex::new(connections),
            available: Condvar::new(),
            size,
            timeout,
        })
    }

    /// Borrow a connection, waiting at most the pool timeout
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        let deadline = Instant::now() + self.timeout;
        let mut idle = self.idle.lock();
        loop {
            if let Some(conn) = idle.pop() {
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }
            if self.available.wait_until(&mut idle, deadline).timed_out() && idle.is_empty() {
                return Err(Error::new(
                    ErrorKind::Storage,
                    format!("Timed out after {:?} waiting for a connection", self.timeout),
                ));
            }
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, conn: Connection) {
        self.idle.lock().push(conn);
        self.available.notify_one();
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in drop
        self.conn.as_ref().expect("pooled connection already released")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        // Only taken in drop
        self.conn.as_mut().expect("pooled connection already released")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
