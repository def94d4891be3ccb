pub const TABLE: &str = "essays";

pub const COLUMN_ID: &str = "id";
pub const COLUMN_TITLE: &str = "title";
pub const COLUMN_CATEGORY: &str = "category";
pub const COLUMN_PERIOD: &str = "period_key";
pub const COLUMN_QUESTION: &str = "question";
pub const COLUMN_PAYLOAD: &str = "payload";

/// Scalar SQL function `regexp_like(text, pattern, flags)`
pub const REGEXP_FUNCTION: &str = "regexp_like";

/// Unicode-aware lowercase; SQLite's own `lower()` only folds ASCII
pub const FOLD_FUNCTION: &str = "fold_case";

/// Table keyed by the 32-bit identity hash plus one index per queryable column
pub fn bootstrap_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (
            {COLUMN_ID} INTEGER NOT NULL PRIMARY KEY,
            {COLUMN_TITLE} TEXT NOT NULL,
            {COLUMN_CATEGORY} TEXT NOT NULL,
            {COLUMN_PERIOD} INTEGER NOT NULL,
            {COLUMN_QUESTION} TEXT NOT NULL,
            {COLUMN_PAYLOAD} BLOB NOT NULL,
            UNIQUE({COLUMN_TITLE}, {COLUMN_CATEGORY}, {COLUMN_PERIOD}, {COLUMN_QUESTION})
        );
        CREATE INDEX IF NOT EXISTS {TABLE}_{COLUMN_TITLE}_idx ON {TABLE} ({COLUMN_TITLE});
        CREATE INDEX IF NOT EXISTS {TABLE}_{COLUMN_CATEGORY}_idx ON {TABLE} ({COLUMN_CATEGORY});
        CREATE INDEX IF NOT EXISTS {TABLE}_{COLUMN_PERIOD}_idx ON {TABLE} ({COLUMN_PERIOD});
        CREATE INDEX IF NOT EXISTS {TABLE}_{COLUMN_QUESTION}_idx ON {TABLE} ({COLUMN_QUESTION});"
    )
}

pub fn select_prefix() -> String {
    format!(
        "SELECT {COLUMN_ID}, {COLUMN_TITLE}, {COLUMN_CATEGORY}, {COLUMN_PERIOD}, {COLUMN_QUESTION}, {COLUMN_PAYLOAD} FROM {TABLE}"
    )
}

pub fn upsert_sql() -> String {
    format!(
        "INSERT OR REPLACE INTO {TABLE} ({COLUMN_ID}, {COLUMN_TITLE}, {COLUMN_CATEGORY}, {COLUMN_PERIOD}, {COLUMN_QUESTION}, {COLUMN_PAYLOAD}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    )
}

pub fn update_metadata_sql() -> String {
    format!(
        "UPDATE {TABLE} SET {COLUMN_TITLE} = ?2, {COLUMN_CATEGORY} = ?3, {COLUMN_PERIOD} = ?4, {COLUMN_QUESTION} = ?5 \
         WHERE {COLUMN_ID} = ?1"
    )
}
