use std::fs;
use std::path::Path;
use std::time::Duration;
use regex::{Regex, RegexBuilder};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ToSqlOutput;
use rusqlite::{Connection, ToSql, params, params_from_iter};
use tracing::{debug, info};
use crate::compression::compress::{CompressedBlock, CompressionType};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::translator::{Constraint, PATTERN_FLAGS, SqlParam};
use crate::storage::pool::ConnectionPool;
use crate::storage::schema::{self, COLUMN_ID, FOLD_FUNCTION, REGEXP_FUNCTION, TABLE};
use crate::storage::store::{RowMetadata, Store, StoredRow};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Text(text) => ToSqlOutput::from(text.as_str()),
            SqlParam::Integer(value) => ToSqlOutput::from(*value),
        })
    }
}

/// Build a regex from a pattern and a `[icnm]*` flag string
pub fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'c' => builder.case_insensitive(false),
            'n' => builder.dot_matches_new_line(true),
            'm' => builder.multi_line(true),
            other => {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("Unsupported pattern flag {:?}, expected one of {}", other, PATTERN_FLAGS),
                ));
            }
        };
    }
    Ok(builder.build()?)
}

/// `regexp_like(text, pattern, flags)`: true if `pattern` matches anywhere in `text`
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        REGEXP_FUNCTION,
        3,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx: &Context<'_>| {
            let flags: String = ctx.get(2)?;
            // Compiled once per statement while the pattern argument stays constant
            let regex = ctx.get_or_create_aux(1, |pattern| -> Result<Regex> {
                let pattern = pattern
                    .as_str()
                    .map_err(|e| Error::new(ErrorKind::InvalidArgument, e.to_string()))?;
                compile_pattern(pattern, &flags)
            })?;
            let text: Option<String> = ctx.get(0)?;
            Ok(text.is_some_and(|text| regex.is_match(&text)))
        },
    )
}

/// `fold_case(text)`: lowercase with the same rules as `str::to_lowercase`
fn register_fold_case(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx: &Context<'_>| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
}

fn init_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    register_regexp(conn)?;
    register_fold_case(conn)
}

/// SQLite-backed store over a pool of connections
pub struct SqliteStore {
    pool: ConnectionPool,
    compression: CompressionType,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `config.storage_path` and
    /// make sure the schema exists
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::open_at(
            &config.storage_path,
            config.pool_size,
            config.pool_timeout(),
            config.payload_compression,
        )
    }

    pub fn open_at(path: &Path, pool_size: usize, timeout: Duration, compression: CompressionType) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let pool = ConnectionPool::open(path, pool_size, timeout, init_connection)?;
        let store = SqliteStore { pool, compression };
        store.bootstrap()?;
        info!(path = %path.display(), pool_size, "Opened essay store");
        Ok(store)
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, i64, String, Vec<u8>)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
    }
}

fn stored_id(raw: i64) -> Result<u32> {
    u32::try_from(raw).map_err(|_| Error::new(ErrorKind::Storage, format!("Corrupt row id: {}", raw)))
}

impl Store for SqliteStore {
    fn bootstrap(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(&schema::bootstrap_sql())?;
        debug!(table = TABLE, "Schema ready");
        Ok(())
    }

    fn upsert(&self, row: &RowMetadata, payload: Option<&[u8]>) -> Result<bool> {
        let conn = self.pool.get()?;
        let changed = match payload {
            Some(bytes) => {
                let blob = CompressedBlock::compress(bytes, self.compression);
                conn.execute(
                    &schema::upsert_sql(),
                    params![row.id as i64, row.title, row.category, row.period_key, row.question, blob],
                )?
            }
            None => conn.execute(
                &schema::update_metadata_sql(),
                params![row.id as i64, row.title, row.category, row.period_key, row.question],
            )?,
        };
        Ok(changed > 0)
    }

    fn delete(&self, id: u32) -> Result<usize> {
        let conn = self.pool.get()?;
        let sql = format!("DELETE FROM {TABLE} WHERE {COLUMN_ID} = ?1");
        Ok(conn.execute(&sql, params![id as i64])?)
    }

    fn delete_matching(&self, constraint: &Constraint) -> Result<usize> {
        let conn = self.pool.get()?;
        // SQLite has no DELETE ... LIMIT unless compiled for it
        let sql = if constraint.limit.is_some() {
            format!(
                "DELETE FROM {TABLE} WHERE {COLUMN_ID} IN (SELECT {COLUMN_ID} FROM {TABLE}{}{})",
                constraint.where_clause(),
                constraint.limit_clause()
            )
        } else {
            format!("DELETE FROM {TABLE}{}", constraint.where_clause())
        };
        Ok(conn.execute(&sql, params_from_iter(constraint.params.iter()))?)
    }

    fn select(&self, constraint: &Constraint) -> Result<Vec<StoredRow>> {
        let sql = format!(
            "{}{}{}",
            schema::select_prefix(),
            constraint.where_clause(),
            constraint.limit_clause()
        );
        let raw_rows = {
            let conn = self.pool.get()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(constraint.params.iter()), Self::read_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        raw_rows
            .into_iter()
            .map(|(id, title, category, period_key, question, blob)| {
                Ok(StoredRow {
                    metadata: RowMetadata {
                        id: stored_id(id)?,
                        title,
                        category,
                        period_key,
                        question,
                    },
                    payload: CompressedBlock::decompress(&blob)?,
                })
            })
            .collect()
    }

    fn matching_ids(&self, constraint: &Constraint) -> Result<Vec<u32>> {
        let sql = format!(
            "SELECT {COLUMN_ID} FROM {TABLE}{}{}",
            constraint.where_clause(),
            constraint.limit_clause()
        );
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(constraint.params.iter()), |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids.into_iter().map(stored_id).collect()
    }
}
