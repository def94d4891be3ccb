use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};
use crate::core::types::TimePeriod;
use crate::taxonomy::category::Category;

/// How a query's period relates to the stored session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintType {
    Before,
    After,
    Only,
}

impl ConstraintType {
    pub fn operator(self) -> &'static str {
        match self {
            ConstraintType::Before => "<",
            ConstraintType::After => ">",
            ConstraintType::Only => "=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodConstraint {
    pub period: TimePeriod,
    pub kind: ConstraintType,
}

impl PeriodConstraint {
    pub fn before(period: TimePeriod) -> Self {
        PeriodConstraint { period, kind: ConstraintType::Before }
    }

    pub fn after(period: TimePeriod) -> Self {
        PeriodConstraint { period, kind: ConstraintType::After }
    }

    pub fn only(period: TimePeriod) -> Self {
        PeriodConstraint { period, kind: ConstraintType::Only }
    }
}

/// A structured search request. Doubles as the result-cache key, so every
/// field takes part in equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryDescription {
    pub pattern: Option<String>,
    /// Pattern-engine flags, passed through verbatim
    pub flags: String,
    pub categories: Option<BTreeSet<Category>>,
    pub period: Option<PeriodConstraint>,
    /// Reserved for scanning full documents; metadata-only for now
    pub deep_search: bool,
}

impl QueryDescription {
    /// Matches every stored essay
    pub fn all() -> Self {
        QueryDescription::default()
    }

    /// Copy with the pattern replaced. An empty pattern means none.
    pub fn with_pattern(&self, pattern: &str, flags: &str) -> Self {
        QueryDescription {
            pattern: Some(pattern.to_string()).filter(|p| !p.is_empty()),
            flags: flags.to_string(),
            ..self.clone()
        }
    }

    pub fn with_categories<I>(&self, categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        QueryDescription {
            categories: Some(categories.into_iter().collect()),
            ..self.clone()
        }
    }

    pub fn with_period(&self, period: PeriodConstraint) -> Self {
        QueryDescription {
            period: Some(period),
            ..self.clone()
        }
    }

    pub fn with_deep_search(&self, deep_search: bool) -> Self {
        QueryDescription {
            deep_search,
            ..self.clone()
        }
    }

    /// Pattern with empty strings treated as absent
    pub fn active_pattern(&self) -> Option<&str> {
        self.pattern.as_deref().filter(|p| !p.is_empty())
    }
}
