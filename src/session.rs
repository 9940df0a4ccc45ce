// 🧑‍💻 Sessions - one user's selection, dataset and figures
//
// Nothing here is shared between users: each session owns its ledgers and
// filtered dataset. `apply` computes every new value on copies and commits
// them together, so a rejected control change leaves the session untouched.

use crate::chart::AxisScale;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::filter::{filter, CompensationMetric, FilterSelection, FilteredDataset, YearRange};
use crate::lookup::{search_names, starting_compensation, SearchOutcome};
use crate::reconcile::{DomainChange, FigureEngine, FigureEvent, FigureInputs, FigureState};
use crate::records::SourceTables;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// CONTROL CHANGES
// ============================================================================

/// One user interaction on the control panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "control", content = "value", rename_all = "snake_case")]
pub enum ControlChange {
    SetJobs(Vec<String>),
    SetNames(Vec<String>),
    AddName(String),
    RemoveName(String),
    SetYearRange(YearRange),
    SetMetric(CompensationMetric),
    SetStartingValue(u64),
    /// Take the starting value from a job's pay at the lower year bound
    UseStartingJob(String),
    SetScale(AxisScale),
    Refresh,
}

// ============================================================================
// DASHBOARD (shared, read-only)
// ============================================================================

/// Process-wide pieces every session reads from
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub config: DashboardConfig,
    pub sources: SourceTables,
    pub engine: FigureEngine,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, sources: SourceTables) -> Self {
        Dashboard {
            config,
            sources,
            engine: FigureEngine::new(),
        }
    }

    /// Load both source tables named in the config
    pub fn load(config: DashboardConfig) -> anyhow::Result<Self> {
        let sources = SourceTables::load(&config.data.jobs_path, &config.data.names_path)?;
        Ok(Self::new(config, sources))
    }

    /// Fresh session with the configured default jobs plotted
    pub fn open_session(&self) -> Result<DashboardSession> {
        let defaults = &self.config.defaults;
        let years = self.config.years.full_range();
        let selection =
            FilterSelection::new(years, defaults.metric).with_jobs(defaults.jobs.iter().cloned());
        let dataset = filter(&self.sources, &selection)?;

        let empty = self.engine.empty_state(AxisScale::Linear, years);
        let inputs = FigureInputs {
            dataset: &dataset,
            years,
            starting_value: defaults.starting_value,
            scale: AxisScale::Linear,
        };
        let figures = self.engine.update(&empty, &inputs, FigureEvent::DataChanged)?;

        let now = Utc::now();
        let session = DashboardSession {
            id: Uuid::new_v4(),
            selection,
            starting_value: defaults.starting_value,
            starting_job: None,
            scale: AxisScale::Linear,
            dataset,
            figures,
            created_at: now,
            last_active: now,
        };
        info!(session = %session.id, rows = session.dataset.len(), "opened session");
        Ok(session)
    }

    pub fn job_titles(&self) -> Vec<String> {
        self.sources.jobs.entity_ids()
    }

    pub fn search_names(&self, query: &str) -> SearchOutcome {
        search_names(&self.sources.names, query, self.config.search.max_results)
    }
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone)]
pub struct DashboardSession {
    pub id: Uuid,
    selection: FilterSelection,
    starting_value: u64,
    starting_job: Option<String>,
    scale: AxisScale,
    dataset: FilteredDataset,
    figures: FigureState,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Serializable snapshot handed to renderers
#[derive(Debug, Clone, Serialize)]
pub struct SessionView<'a> {
    pub id: Uuid,
    pub selection: &'a FilterSelection,
    pub starting_value: u64,
    pub starting_job: Option<&'a str>,
    pub figures: &'a FigureState,
}

impl DashboardSession {
    /// Apply one control change; returns the event that drove the figures.
    pub fn apply(&mut self, dashboard: &Dashboard, change: ControlChange) -> Result<FigureEvent> {
        let mut selection = self.selection.clone();
        let mut starting_value = self.starting_value;
        let mut starting_job = self.starting_job.clone();
        let mut scale = self.scale;

        let event = match change {
            ControlChange::SetJobs(jobs) => {
                selection.selected_jobs = jobs.into_iter().collect();
                FigureEvent::DataChanged
            }
            ControlChange::SetNames(names) => {
                selection.selected_names = names.into_iter().collect();
                FigureEvent::DataChanged
            }
            ControlChange::AddName(name) => {
                selection.selected_names.insert(name);
                FigureEvent::DataChanged
            }
            ControlChange::RemoveName(name) => {
                selection.selected_names.remove(&name);
                FigureEvent::DataChanged
            }
            ControlChange::SetYearRange(years) => {
                years.validate(&dashboard.config.years)?;
                selection.years = years;
                FigureEvent::DomainChanged(DomainChange::YearRange)
            }
            ControlChange::SetMetric(metric) => {
                selection.metric = metric;
                FigureEvent::DomainChanged(DomainChange::Metric)
            }
            ControlChange::SetStartingValue(value) => {
                starting_value = value;
                starting_job = None;
                FigureEvent::DomainChanged(DomainChange::StartingValue)
            }
            ControlChange::UseStartingJob(job) => {
                starting_value = starting_compensation(
                    &dashboard.sources.jobs,
                    &job,
                    selection.years.min,
                    selection.metric,
                )?;
                starting_job = Some(job);
                FigureEvent::DomainChanged(DomainChange::StartingValue)
            }
            ControlChange::SetScale(new_scale) => {
                scale = new_scale;
                FigureEvent::ScaleToggled(new_scale)
            }
            ControlChange::Refresh => FigureEvent::RefreshRequested,
        };

        // a job-derived starting value follows the lower year and the metric
        if matches!(
            event,
            FigureEvent::DomainChanged(DomainChange::YearRange | DomainChange::Metric)
        ) {
            if let Some(job) = &starting_job {
                match starting_compensation(
                    &dashboard.sources.jobs,
                    job,
                    selection.years.min,
                    selection.metric,
                ) {
                    Ok(value) => starting_value = value,
                    Err(err) => {
                        warn!(session = %self.id, error = %err, "keeping previous starting value");
                        starting_job = None;
                    }
                }
            }
        }

        let dataset = if selection != self.selection {
            filter(&dashboard.sources, &selection)?
        } else {
            self.dataset.clone()
        };

        let inputs = FigureInputs {
            dataset: &dataset,
            years: selection.years,
            starting_value,
            scale,
        };
        let figures = dashboard.engine.update(&self.figures, &inputs, event)?;

        self.selection = selection;
        self.starting_value = starting_value;
        self.starting_job = starting_job;
        self.scale = scale;
        self.dataset = dataset;
        self.figures = figures;
        self.last_active = Utc::now();

        info!(session = %self.id, ?event, rows = self.dataset.len(), "applied control");
        Ok(event)
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn dataset(&self) -> &FilteredDataset {
        &self.dataset
    }

    pub fn figures(&self) -> &FigureState {
        &self.figures
    }

    pub fn starting_value(&self) -> u64 {
        self.starting_value
    }

    pub fn starting_job(&self) -> Option<&str> {
        self.starting_job.as_deref()
    }

    pub fn scale(&self) -> AxisScale {
        self.scale
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_active
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            id: self.id,
            selection: &self.selection,
            starting_value: self.starting_value,
            starting_job: self.starting_job.as_deref(),
            figures: &self.figures,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
