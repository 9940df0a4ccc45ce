// ⚠️ Error types for the figure engine
// Configuration problems surface to the caller; the prior chart state is never touched.

use crate::filter::CompensationMetric;
use crate::records::SourceKind;

/// Errors raised while filtering data or reconciling figures.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum DashboardError {
    /// The selected compensation column is missing from a source table
    #[error("compensation column `{metric}` is not present in the {table} source")]
    UnknownMetric {
        metric: CompensationMetric,
        table: SourceKind,
    },

    /// Lower year after upper year
    #[error("invalid year range {min}-{max}")]
    InvalidYearRange { min: i32, max: i32 },

    /// Year range outside the configured bounds
    #[error("year range {min}-{max} is outside {lower}-{upper}")]
    YearOutOfBounds {
        min: i32,
        max: i32,
        lower: i32,
        upper: i32,
    },

    /// A ledger points at a slot the chart does not have
    #[error("trace index {index} is outside the chart's {len} traces")]
    TraceIndexOutOfRange { index: usize, len: usize },

    /// Entity or index already recorded in a ledger
    #[error("ledger already tracks `{entity}` or index {index}")]
    LedgerConflict { entity: String, index: usize },

    /// Prior-year compensation of zero makes the growth rate undefined
    #[error("zero compensation for `{entity}` in {year}")]
    ZeroCompensation { entity: String, year: i32 },

    /// No unique row to derive a starting value from
    #[error("no unique {metric} value for `{job}` in {year}")]
    StartingValueUnavailable {
        job: String,
        year: i32,
        metric: CompensationMetric,
    },
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
