use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::compression::compress::CompressionType;
use crate::core::error::{Error, ErrorKind, Result};

/// Sentinel for "size the worker pool from the number of cores"
pub const AUTO_THREADS: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_path: PathBuf,
    pub query_cache_size: usize,

    // Worker pool shared by queries, bulk indexing and write-back
    pub max_io_threads: i32,

    // Connection pool
    pub pool_size: usize,
    pub pool_timeout_ms: u64,

    // Identity interning
    pub intern_ttl_secs: u64,
    pub intern_capacity: usize,

    pub payload_compression: CompressionType,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data/essays.db"),
            query_cache_size: 20,
            max_io_threads: AUTO_THREADS,
            pool_size: 4,
            pool_timeout_ms: 30_000,
            intern_ttl_secs: 60,
            intern_capacity: 4096,
            payload_compression: CompressionType::LZ4,
        }
    }
}

impl Config {
    /// Parse a JSON document, filling absent keys with defaults
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_io_threads == 0 || self.max_io_threads < AUTO_THREADS {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Invalid max_io_threads: {}", self.max_io_threads),
            ));
        }
        if self.query_cache_size == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "query_cache_size must be positive",
            ));
        }
        if self.pool_size == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "pool_size must be positive",
            ));
        }
        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        if self.max_io_threads == AUTO_THREADS {
            num_cpus::get().max(1)
        } else {
            self.max_io_threads as usize
        }
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout_ms)
    }

    pub fn intern_ttl(&self) -> Duration {
        Duration::from_secs(self.intern_ttl_secs)
    }
}
