// ⚖️ Reconciliation Engine - keep figures in line with the wanted entities
//
// Per line chart:
//   to_remove = present - wanted   → blank the trace, forget the ledger entry
//   to_add    = wanted - present   → append a trace, record its slot
//   kept      = present ∩ wanted   → untouched (slot is stable)
//
// A domain change, refresh request, stale rendered axis, or empty wanted set
// replaces the chart with an empty one first. The comparison chart is rebuilt
// on every update because its row order depends on every entity.
//
// `FigureEngine::update` borrows the prior state and returns a new one, so a
// failed update leaves the caller's figures exactly as they were.

use crate::chart::{AxisScale, Chart, ChartTemplate, Trace};
use crate::error::Result;
use crate::filter::{FilteredDataset, YearRange};
use crate::ledger::TraceLedger;
use crate::series::{
    comparison_chart, comparison_pairs, comparison_title, compensation_trace, projected_trace,
    projected_values,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

pub const COMPENSATION_AXIS_TITLE: &str = "Compensation (USD)";
pub const PROJECTED_AXIS_TITLE: &str = "Your Projected Compensation (USD)";

// ============================================================================
// EVENTS
// ============================================================================

/// Inputs whose change invalidates previously computed series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainChange {
    YearRange,
    /// Only the projected chart depends on the starting value
    StartingValue,
    Metric,
}

/// What caused an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FigureEvent {
    DomainChanged(DomainChange),
    /// Cosmetic: only the compensation chart's y axis changes
    ScaleToggled(AxisScale),
    RefreshRequested,
    DataChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    Domain(DomainChange),
    Refresh,
    StaleAxis,
    NothingWanted,
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetReason::Domain(change) => write!(f, "domain change ({:?})", change),
            ResetReason::Refresh => write!(f, "refresh requested"),
            ResetReason::StaleAxis => write!(f, "rendered axis disagrees with year range"),
            ResetReason::NothingWanted => write!(f, "no entity wanted"),
        }
    }
}

/// Everything an update reads besides the prior figures
#[derive(Debug, Clone, Copy)]
pub struct FigureInputs<'a> {
    pub dataset: &'a FilteredDataset,
    pub years: YearRange,
    pub starting_value: u64,
    pub scale: AxisScale,
}

// ============================================================================
// LINE FIGURE (chart + ledger)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartPhase {
    Empty,
    Populated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub cleared: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFigure {
    pub chart: Chart,
    pub ledger: TraceLedger,
}

impl LineFigure {
    pub fn empty(template: &ChartTemplate) -> Self {
        LineFigure {
            chart: Chart::empty(template),
            ledger: TraceLedger::new(),
        }
    }

    pub fn phase(&self) -> ChartPhase {
        if self.ledger.is_empty() {
            ChartPhase::Empty
        } else {
            ChartPhase::Populated
        }
    }

    /// Rendered x axis shows a different year range than requested
    pub fn is_stale(&self, years: YearRange) -> bool {
        self.chart
            .rendered_year_bounds()
            .is_some_and(|bounds| bounds != (years.min, years.max))
    }

    pub fn trace_for(&self, entity_id: &str) -> Option<&Trace> {
        self.ledger
            .index_of(entity_id)
            .and_then(|i| self.chart.trace(i))
    }

    /// Bring the chart in line with `wanted` without touching kept traces.
    pub fn reconcile<F>(&mut self, wanted: &BTreeSet<String>, mut build: F) -> Result<ReconcileStats>
    where
        F: FnMut(&str) -> Result<Trace>,
    {
        let present = self.ledger.entities();
        let mut stats = ReconcileStats {
            kept: present.intersection(wanted).count(),
            ..ReconcileStats::default()
        };

        for entity in present.difference(wanted) {
            if let Some(index) = self.ledger.forget(entity) {
                self.chart.blank_trace(index)?;
                stats.cleared += 1;
            }
        }

        for entity in wanted.difference(&present) {
            let index = self.chart.push_trace(build(entity)?);
            self.ledger.record(entity, index)?;
            stats.added += 1;
        }

        Ok(stats)
    }
}

// ============================================================================
// FIGURE STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureState {
    /// Compensation over time
    pub real: LineFigure,
    /// Projected compensation under each entity's growth rate
    pub projected: LineFigure,
    /// First-year/last-year lollipop chart
    pub comparison: Chart,
    pub comparison_title: String,
    pub scale: AxisScale,
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct FigureEngine {
    real_template: ChartTemplate,
    projected_template: ChartTemplate,
}

impl Default for FigureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FigureEngine {
    pub fn new() -> Self {
        FigureEngine {
            real_template: ChartTemplate::line(COMPENSATION_AXIS_TITLE),
            projected_template: ChartTemplate::line(PROJECTED_AXIS_TITLE),
        }
    }

    /// All three charts empty, ledgers discarded
    pub fn empty_state(&self, scale: AxisScale, years: YearRange) -> FigureState {
        let mut real = LineFigure::empty(&self.real_template);
        real.chart.set_y_scale(scale);
        FigureState {
            real,
            projected: LineFigure::empty(&self.projected_template),
            comparison: Chart::empty(&ChartTemplate::lollipop()),
            comparison_title: comparison_title(years),
            scale,
        }
    }

    pub fn update(
        &self,
        prior: &FigureState,
        inputs: &FigureInputs<'_>,
        event: FigureEvent,
    ) -> Result<FigureState> {
        let years = inputs.years;
        years.check_order()?;

        if let FigureEvent::ScaleToggled(scale) = event {
            let mut next = prior.clone();
            next.scale = scale;
            next.real.chart.set_y_scale(scale);
            next.comparison_title = comparison_title(years);
            debug!(?scale, "axis scale toggled");
            return Ok(next);
        }

        let dataset = inputs.dataset;
        if dataset.is_empty() {
            info!("no entities selected, resetting figures");
            return Ok(self.empty_state(inputs.scale, years));
        }

        let event_reset = |chart_uses_starting_value: bool| match event {
            FigureEvent::DomainChanged(DomainChange::StartingValue) if !chart_uses_starting_value => None,
            FigureEvent::DomainChanged(change) => Some(ResetReason::Domain(change)),
            FigureEvent::RefreshRequested => Some(ResetReason::Refresh),
            FigureEvent::DataChanged | FigureEvent::ScaleToggled(_) => None,
        };
        let stale = |figure: &LineFigure| figure.is_stale(years).then_some(ResetReason::StaleAxis);

        // compensation over time: every entity in the dataset
        let real_wanted = dataset.entities();
        let mut real = self.prepare(
            "compensation",
            &prior.real,
            &self.real_template,
            event_reset(false).or_else(|| stale(&prior.real)),
            &real_wanted,
        );
        real.chart.set_y_scale(inputs.scale);
        if !real_wanted.is_empty() {
            let stats = real.reconcile(&real_wanted, |entity| {
                Ok(compensation_trace(entity, &dataset.series_for(entity)))
            })?;
            real.chart.set_year_domain(years);
            debug!(chart = "compensation", added = stats.added, cleared = stats.cleared, kept = stats.kept, "reconciled");
        }

        // projected + comparison: entities present at both boundary years
        let boundary: BTreeSet<String> = dataset
            .entities_at(years.min)
            .intersection(&dataset.entities_at(years.max))
            .cloned()
            .collect();

        // growth rates are undefined across a zero year; drop those entities up front
        let projected_wanted: BTreeSet<String> = boundary
            .iter()
            .filter(|entity| {
                match projected_values(entity, &dataset.series_for(entity), inputs.starting_value) {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(entity = %entity, error = %err, "excluding entity from projection");
                        false
                    }
                }
            })
            .cloned()
            .collect();

        let mut projected = self.prepare(
            "projected",
            &prior.projected,
            &self.projected_template,
            event_reset(true).or_else(|| stale(&prior.projected)),
            &projected_wanted,
        );
        if !projected_wanted.is_empty() {
            let stats = projected.reconcile(&projected_wanted, |entity| {
                projected_trace(entity, &dataset.series_for(entity), inputs.starting_value)
            })?;
            projected.chart.set_year_domain(years);
            debug!(chart = "projected", added = stats.added, cleared = stats.cleared, kept = stats.kept, "reconciled");
        }

        let pairs = comparison_pairs(dataset, &boundary, years);

        Ok(FigureState {
            real,
            projected,
            comparison: comparison_chart(&pairs, years),
            comparison_title: comparison_title(years),
            scale: inputs.scale,
        })
    }

    /// Start from the prior figure, or from an empty one when a reset applies
    fn prepare(
        &self,
        chart: &str,
        prior: &LineFigure,
        template: &ChartTemplate,
        reset: Option<ResetReason>,
        wanted: &BTreeSet<String>,
    ) -> LineFigure {
        let reset = if wanted.is_empty() {
            Some(ResetReason::NothingWanted)
        } else {
            reset
        };

        match reset {
            Some(reason) => {
                if prior.phase() == ChartPhase::Populated || reason != ResetReason::NothingWanted {
                    info!(chart, %reason, "resetting chart");
                }
                LineFigure::empty(template)
            }
            None => prior.clone(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
