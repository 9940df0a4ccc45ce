// 📂 Source tables - salary rows keyed by (entity, year)
//
// Compensation columns are stored upstream divided by 100; the filter stage
// restores the canonical unit. Tables are loaded once and never mutated.

use crate::filter::CompensationMetric;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::info;

// ============================================================================
// SOURCE RECORD
// ============================================================================

/// One CSV row. Both sources share the `Employee Name` header; in the job
/// source it carries the job title.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceRecord {
    #[serde(rename = "Employee Name")]
    pub entity_id: String,

    #[serde(rename = "Year")]
    pub year: i32,

    #[serde(rename = "Total Pay", default)]
    pub total_pay: Option<f64>,

    #[serde(rename = "Total Pay & Benefits", default)]
    pub total_pay_and_benefits: Option<f64>,
}

impl SourceRecord {
    /// Raw (divided-by-100) value of a compensation column
    pub fn value(&self, metric: CompensationMetric) -> Option<f64> {
        match metric {
            CompensationMetric::Gross => self.total_pay,
            CompensationMetric::GrossPlusBenefits => self.total_pay_and_benefits,
        }
    }
}

// ============================================================================
// SOURCE TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Jobs,
    Names,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Jobs => write!(f, "job"),
            SourceKind::Names => write!(f, "name"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceTable {
    pub kind: SourceKind,
    /// Compensation columns present in the file header
    pub metrics: Vec<CompensationMetric>,
    pub records: Vec<SourceRecord>,
}

impl SourceTable {
    pub fn new(
        kind: SourceKind,
        metrics: Vec<CompensationMetric>,
        records: Vec<SourceRecord>,
    ) -> Self {
        SourceTable {
            kind,
            metrics,
            records,
        }
    }

    pub fn has_metric(&self, metric: CompensationMetric) -> bool {
        self.metrics.contains(&metric)
    }

    /// Unique entity ids in first-seen order
    pub fn entity_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.entity_id.as_str()))
            .map(|r| r.entity_id.clone())
            .collect()
    }
}

/// Both sources, shared read-only by every session
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub jobs: SourceTable,
    pub names: SourceTable,
}

impl SourceTables {
    pub fn load(jobs_path: &Path, names_path: &Path) -> Result<Self> {
        Ok(SourceTables {
            jobs: load_table(jobs_path, SourceKind::Jobs)?,
            names: load_table(names_path, SourceKind::Names)?,
        })
    }
}

// ============================================================================
// CSV LOADING
// ============================================================================

pub fn load_table(csv_path: &Path, kind: SourceKind) -> Result<SourceTable> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open {} CSV {}", kind, csv_path.display()))?;

    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let metrics: Vec<CompensationMetric> = CompensationMetric::ALL
        .iter()
        .copied()
        .filter(|m| headers.iter().any(|h| h == m.column()))
        .collect();

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: SourceRecord = result
            .with_context(|| format!("Failed to deserialize {} row {}", kind, line + 2))?;
        records.push(record);
    }

    info!(
        table = %kind,
        rows = records.len(),
        columns = metrics.len(),
        path = %csv_path.display(),
        "loaded source table"
    );

    Ok(SourceTable::new(kind, metrics, records))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_table_detects_metric_columns() {
        let file = write_csv(
            "Employee Name,Year,Total Pay,Total Pay & Benefits\n\
             Professor (II),2011,1020.5,1300\n\
             Professor (II),2012,1050,\n",
        );

        let table = load_table(file.path(), SourceKind::Jobs).unwrap();

        assert_eq!(table.metrics, CompensationMetric::ALL.to_vec());
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].total_pay, Some(1020.5));
        assert_eq!(table.records[1].total_pay_and_benefits, None);
    }

    #[test]
    fn test_load_table_without_benefits_column() {
        let file = write_csv("Employee Name,Year,Total Pay\njane doe,2015,700\n");

        let table = load_table(file.path(), SourceKind::Names).unwrap();

        assert!(table.has_metric(CompensationMetric::Gross));
        assert!(!table.has_metric(CompensationMetric::GrossPlusBenefits));
        assert_eq!(table.records[0].value(CompensationMetric::GrossPlusBenefits), None);
    }

    #[test]
    fn test_load_table_rejects_bad_year() {
        let file = write_csv("Employee Name,Year,Total Pay\njane doe,soon,700\n");

        let err = load_table(file.path(), SourceKind::Names).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_entity_ids_first_seen_order() {
        let rec = |name: &str, year| SourceRecord {
            entity_id: name.to_string(),
            year,
            total_pay: Some(1.0),
            total_pay_and_benefits: None,
        };
        let table = SourceTable::new(
            SourceKind::Jobs,
            vec![CompensationMetric::Gross],
            vec![rec("b", 2011), rec("a", 2011), rec("b", 2012)],
        );

        assert_eq!(table.entity_ids(), vec!["b".to_string(), "a".to_string()]);
    }
}
