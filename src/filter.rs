// 🔎 Filter Stage - selection → working dataset
//
// Job rows first, then name rows. Duplicate (entity, year) rows are summed,
// zero-sum duplicates dropped, then values are restored to the canonical unit.
// Pure function of its inputs: safe to call on every control change.

use crate::config::YearBounds;
use crate::error::{DashboardError, Result};
use crate::records::{SourceTable, SourceTables};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// Multiplier restoring the upstream divided-by-100 values
pub const UNIT_SCALE: f64 = 100.0;

/// A scaled value this close to a whole number is that whole number
const WHOLE_UNIT_TOLERANCE: f64 = 1e-6;

/// Restore a raw (divided-by-100) value to the canonical unit.
///
/// Fractions left after scaling are truncated, but float noise around a
/// whole number (`612.43 * 100.0 == 61242.999...`) snaps to that number.
pub fn to_canonical(raw: f64) -> u64 {
    let scaled = raw * UNIT_SCALE;
    let nearest = scaled.round();
    if (scaled - nearest).abs() < WHOLE_UNIT_TOLERANCE {
        nearest as u64
    } else {
        scaled as u64
    }
}

// ============================================================================
// SELECTION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationMetric {
    #[serde(alias = "Total Pay")]
    Gross,
    #[serde(alias = "Total Pay & Benefits")]
    GrossPlusBenefits,
}

impl CompensationMetric {
    pub const ALL: [CompensationMetric; 2] =
        [CompensationMetric::Gross, CompensationMetric::GrossPlusBenefits];

    /// Source column header
    pub fn column(&self) -> &'static str {
        match self {
            CompensationMetric::Gross => "Total Pay",
            CompensationMetric::GrossPlusBenefits => "Total Pay & Benefits",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            CompensationMetric::Gross => CompensationMetric::GrossPlusBenefits,
            CompensationMetric::GrossPlusBenefits => CompensationMetric::Gross,
        }
    }
}

impl fmt::Display for CompensationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Result<Self> {
        let range = YearRange { min, max };
        range.check_order()?;
        Ok(range)
    }

    pub fn check_order(&self) -> Result<()> {
        if self.min > self.max {
            return Err(DashboardError::InvalidYearRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Ordered and inside the configured bounds
    pub fn validate(&self, bounds: &YearBounds) -> Result<()> {
        self.check_order()?;
        if self.min < bounds.min || self.max > bounds.max {
            return Err(DashboardError::YearOutOfBounds {
                min: self.min,
                max: self.max,
                lower: bounds.min,
                upper: bounds.max,
            });
        }
        Ok(())
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.min && year <= self.max
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.min, self.max)
    }
}

/// What the user picked in the control panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub selected_names: BTreeSet<String>,
    pub selected_jobs: BTreeSet<String>,
    pub years: YearRange,
    pub metric: CompensationMetric,
}

impl FilterSelection {
    pub fn new(years: YearRange, metric: CompensationMetric) -> Self {
        FilterSelection {
            selected_names: BTreeSet::new(),
            selected_jobs: BTreeSet::new(),
            years,
            metric,
        }
    }

    pub fn with_jobs<I, S>(mut self, jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_jobs = jobs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.selected_names.is_empty() && self.selected_jobs.is_empty()
    }
}

// ============================================================================
// FILTERED DATASET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationRow {
    pub entity_id: String,
    pub year: i32,
    /// Canonical unit (restored from the divided-by-100 source)
    pub compensation: u64,
}

/// At most one row per (entity, year). No identity across recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredDataset {
    pub metric: CompensationMetric,
    rows: Vec<CompensationRow>,
}

impl FilteredDataset {
    pub fn empty(metric: CompensationMetric) -> Self {
        FilteredDataset {
            metric,
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[CompensationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn entities(&self) -> BTreeSet<String> {
        self.rows.iter().map(|r| r.entity_id.clone()).collect()
    }

    pub fn entities_at(&self, year: i32) -> BTreeSet<String> {
        self.rows
            .iter()
            .filter(|r| r.year == year)
            .map(|r| r.entity_id.clone())
            .collect()
    }

    /// (year, compensation) pairs for one entity, sorted by year
    pub fn series_for(&self, entity_id: &str) -> Vec<(i32, u64)> {
        let mut points: Vec<(i32, u64)> = self
            .rows
            .iter()
            .filter(|r| r.entity_id == entity_id)
            .map(|r| (r.year, r.compensation))
            .collect();
        points.sort_by_key(|(year, _)| *year);
        points
    }

    pub fn value_at(&self, entity_id: &str, year: i32) -> Option<u64> {
        self.rows
            .iter()
            .find(|r| r.entity_id == entity_id && r.year == year)
            .map(|r| r.compensation)
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// Derive the working dataset for a selection.
///
/// An empty selection yields an empty dataset of the same metric. A metric
/// column missing from either source is a configuration error.
pub fn filter(sources: &SourceTables, selection: &FilterSelection) -> Result<FilteredDataset> {
    let metric = selection.metric;
    for table in [&sources.jobs, &sources.names] {
        if !table.has_metric(metric) {
            return Err(DashboardError::UnknownMetric {
                metric,
                table: table.kind,
            });
        }
    }
    selection.years.check_order()?;

    if selection.is_empty() {
        return Ok(FilteredDataset::empty(metric));
    }

    // Summed raw values plus how many rows fed each key
    let mut order: Vec<(String, i32)> = Vec::new();
    let mut groups: HashMap<(String, i32), (f64, usize)> = HashMap::new();

    let mut collect = |table: &SourceTable, wanted: &BTreeSet<String>| {
        for record in &table.records {
            if !wanted.contains(&record.entity_id) || !selection.years.contains(record.year) {
                continue;
            }
            let Some(value) = record.value(metric) else {
                debug!(entity = %record.entity_id, year = record.year, "skipping row without {}", metric);
                continue;
            };
            let key = (record.entity_id.clone(), record.year);
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (0.0, 0)
            });
            group.0 += value;
            group.1 += 1;
        }
    };

    collect(&sources.jobs, &selection.selected_jobs);
    collect(&sources.names, &selection.selected_names);

    let mut rows = Vec::with_capacity(order.len());
    let mut merged = 0usize;
    for key in order {
        let Some((sum, count)) = groups.remove(&key) else {
            continue;
        };
        if count > 1 {
            merged += 1;
            if sum == 0.0 {
                continue;
            }
        }
        let (entity_id, year) = key;
        rows.push(CompensationRow {
            entity_id,
            year,
            compensation: to_canonical(sum),
        });
    }

    debug!(rows = rows.len(), merged_duplicates = merged, metric = %metric, "filtered dataset");

    Ok(FilteredDataset { metric, rows })
}

// ============================================================================
// TESTS
// ============================================================================
