use std::collections::BTreeSet;
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::types::{PeriodConstraint, QueryDescription};
use crate::storage::schema::{
    COLUMN_CATEGORY, COLUMN_PERIOD, COLUMN_QUESTION, COLUMN_TITLE, FOLD_FUNCTION, REGEXP_FUNCTION,
};

/// Limit value meaning "no row limit"
pub const UNBOUNDED: i64 = -1;

/// Pattern flags understood by the storage regex function
pub const PATTERN_FLAGS: &str = "icnm";

/// A value bound to a `?` placeholder, in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
}

/// Storage-independent constraint: an optional predicate with its bound
/// parameters, plus an optional row limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    pub predicate: Option<String>,
    pub params: Vec<SqlParam>,
    pub limit: Option<u64>,
}

impl Constraint {
    /// " WHERE ..." or empty when the constraint matches everything
    pub fn where_clause(&self) -> String {
        match &self.predicate {
            Some(predicate) => format!(" WHERE {}", predicate),
            None => String::new(),
        }
    }

    pub fn limit_clause(&self) -> String {
        match self.limit {
            Some(limit) => format!(" LIMIT {}", limit),
            None => String::new(),
        }
    }
}

/// Turns query descriptions into constraints. Stateless and pure.
pub struct QueryTranslator;

impl QueryTranslator {
    pub fn translate(query: &QueryDescription, limit: i64) -> Result<Constraint> {
        let limit = match limit {
            UNBOUNDED => None,
            n if n > 0 => Some(n as u64),
            n => {
                return Err(Error::new(
                    ErrorKind::InvalidLimit,
                    format!("Limit must be -1 or positive, got {}", n),
                ));
            }
        };

        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(pattern) = query.active_pattern() {
            clauses.push(Self::pattern_clause(pattern, &query.flags)?);
        }

        if let Some(categories) = &query.categories {
            if !categories.is_empty() {
                // Collected through a BTreeSet so equal queries bind identical parameters
                let names: BTreeSet<String> = categories
                    .iter()
                    .map(|category| category.display_name().to_lowercase())
                    .collect();
                let alternatives: Vec<String> = names
                    .iter()
                    .map(|_| format!("{FOLD_FUNCTION}({COLUMN_CATEGORY}) = ?"))
                    .collect();
                clauses.push(format!("({})", alternatives.join(" OR ")));
                params.extend(names.into_iter().map(SqlParam::Text));
            }
        }

        if let Some(PeriodConstraint { period, kind }) = query.period {
            clauses.push(format!("{COLUMN_PERIOD} {} ?", kind.operator()));
            params.push(SqlParam::Integer(period.key()));
        }

        let predicate = if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        };

        Ok(Constraint { predicate, params, limit })
    }

    /// The pattern goes in as a literal rather than a bound parameter. Callers
    /// are trusted with regex syntax; only the quote is escaped.
    fn pattern_clause(pattern: &str, flags: &str) -> Result<String> {
        if let Some(bad) = flags.chars().find(|c| !PATTERN_FLAGS.contains(*c)) {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Unsupported pattern flag: {:?}", bad),
            ));
        }
        let literal = pattern.replace('\'', "''");
        Ok(format!(
            "({REGEXP_FUNCTION}({COLUMN_TITLE}, '{literal}', '{flags}') OR {REGEXP_FUNCTION}({COLUMN_QUESTION}, '{literal}', '{flags}'))"
        ))
    }
}
