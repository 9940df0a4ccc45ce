// 🔍 Lookups behind the control panel
// Employee-name search and the starting-value prefill from a job title.

use crate::error::{DashboardError, Result};
use crate::filter::{to_canonical, CompensationMetric};
use crate::records::SourceTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// NAME SEARCH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMatch {
    pub name: String,
    pub years: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    Matches { names: Vec<NameMatch> },
    NoMatch,
    /// Query too broad to list; ask for a more specific name
    TooMany { count: usize },
}

/// Case-insensitive substring search over the name source.
pub fn search_names(table: &SourceTable, query: &str, limit: usize) -> SearchOutcome {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchOutcome::NoMatch;
    }

    let mut found: BTreeMap<&str, BTreeSet<i32>> = BTreeMap::new();
    for record in &table.records {
        if record.entity_id.to_lowercase().contains(&needle) {
            found.entry(record.entity_id.as_str()).or_default().insert(record.year);
        }
    }

    match found.len() {
        0 => SearchOutcome::NoMatch,
        count if count > limit => SearchOutcome::TooMany { count },
        _ => SearchOutcome::Matches {
            names: found
                .into_iter()
                .map(|(name, years)| NameMatch {
                    name: name.to_string(),
                    years: years.into_iter().collect(),
                })
                .collect(),
        },
    }
}

// ============================================================================
// STARTING VALUE
// ============================================================================

/// Compensation of `job` in `year`, in the canonical unit.
///
/// Defined only when exactly one row matches.
pub fn starting_compensation(
    jobs: &SourceTable,
    job: &str,
    year: i32,
    metric: CompensationMetric,
) -> Result<u64> {
    let unavailable = || DashboardError::StartingValueUnavailable {
        job: job.to_string(),
        year,
        metric,
    };

    let mut matches = jobs
        .records
        .iter()
        .filter(|r| r.entity_id == job && r.year == year);

    match (matches.next(), matches.next()) {
        (Some(record), None) => record
            .value(metric)
            .map(to_canonical)
            .ok_or_else(unavailable),
        _ => Err(unavailable()),
    }
}
