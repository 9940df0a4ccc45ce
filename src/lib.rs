// Wage Dashboard - Core Library
// Exposes all modules for use in the TUI, the API server, and tests

pub mod config;
pub mod error;
pub mod logging;
pub mod records;    // Source tables (CSV)
pub mod filter;     // Selection → filtered dataset
pub mod lookup;     // Name search + starting-value prefill
pub mod chart;      // Figure data model
pub mod ledger;     // Entity → trace slot
pub mod series;     // Derived series
pub mod reconcile;  // Figure reconciliation engine
pub mod session;    // Per-user state

// Re-export commonly used types
pub use config::{DashboardConfig, YearBounds};
pub use error::{ConfigError, DashboardError};
pub use records::{load_table, SourceKind, SourceRecord, SourceTable, SourceTables};
pub use filter::{
    filter, CompensationMetric, CompensationRow, FilterSelection, FilteredDataset, YearRange,
};
pub use lookup::{search_names, starting_compensation, NameMatch, SearchOutcome};
pub use chart::{AxisScale, Chart, Trace};
pub use ledger::TraceLedger;
pub use series::{comparison_pairs, projected_values, ComparisonPair};
pub use reconcile::{
    DomainChange, FigureEngine, FigureEvent, FigureInputs, FigureState, LineFigure,
};
pub use session::{ControlChange, Dashboard, DashboardSession, SessionView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
