// 📈 Chart sink - declarative figures with a stable-index trace store
//
// Traces are only ever appended. Removing an entity blanks its trace
// (empty series) so every other ledger index stays valid.

use crate::error::{DashboardError, Result};
use crate::filter::YearRange;
use serde::{Deserialize, Serialize};

pub mod colors {
    pub const PLOT_BACKGROUND: &str = "#edeff1";
    pub const END_MARKER: &str = "#355218";
    pub const START_MARKER: &str = "#759356";
    pub const LOLLIPOP_LINE: &str = "#7B7B7B";
    pub const GRID_LINES: &str = "#C5CCCA";
    pub const AXIS_LINE: &str = "black";
}

/// Padding around the first/last year on a time axis
pub const YEAR_PADDING: f64 = 0.5;

// ============================================================================
// TRACES
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

impl AxisScale {
    pub fn toggle(&self) -> Self {
        match self {
            AxisScale::Linear => AxisScale::Log,
            AxisScale::Log => AxisScale::Linear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesData {
    Numeric(Vec<f64>),
    Category(Vec<String>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Numeric(v) => v.len(),
            SeriesData::Category(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            SeriesData::Numeric(v) => Some(v),
            SeriesData::Category(_) => None,
        }
    }

    fn clear(&mut self) {
        match self {
            SeriesData::Numeric(v) => v.clear(),
            SeriesData::Category(v) => v.clear(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceMode {
    #[serde(rename = "lines")]
    Lines,
    #[serde(rename = "markers")]
    Markers,
    #[serde(rename = "lines+markers")]
    LinesMarkers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub color: String,
    pub size: f64,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: SeriesData,
    pub y: SeriesData,
    pub mode: TraceMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_template: Option<String>,
    #[serde(default)]
    pub hover_skip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerStyle>,
}

impl Trace {
    /// Line trace over numeric x/y with a hover format
    pub fn line(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>, hover: &str) -> Self {
        Trace {
            name: Some(name.into()),
            x: SeriesData::Numeric(x),
            y: SeriesData::Numeric(y),
            mode: TraceMode::LinesMarkers,
            hover_template: Some(hover.to_string()),
            hover_skip: false,
            line: None,
            marker: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.x.is_empty() && self.y.is_empty()
    }

    /// Tombstone: drop the plotted coordinates, keep the slot
    pub fn blank(&mut self) {
        self.x.clear();
        self.y.clear();
    }

    /// (x, y) pairs when both axes are numeric
    pub fn points(&self) -> Vec<(f64, f64)> {
        match (self.x.as_numeric(), self.y.as_numeric()) {
            (Some(x), Some(y)) => x.iter().copied().zip(y.iter().copied()).collect(),
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// LAYOUT & TEMPLATES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

/// Axis/style template an empty chart starts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTemplate {
    pub background: String,
    pub grid_color: String,
    pub axis_line_color: String,
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    /// Tick spacing on the x axis (one tick per year on line charts)
    pub x_dtick: Option<f64>,
    pub hover_mode: Option<String>,
    pub show_legend: bool,
    pub margin: Margin,
}

impl ChartTemplate {
    pub fn line(y_title: &str) -> Self {
        ChartTemplate {
            background: colors::PLOT_BACKGROUND.to_string(),
            grid_color: colors::GRID_LINES.to_string(),
            axis_line_color: colors::AXIS_LINE.to_string(),
            x_title: None,
            y_title: Some(y_title.to_string()),
            x_dtick: Some(1.0),
            hover_mode: Some("x".to_string()),
            show_legend: false,
            margin: Margin { l: 40, r: 0, t: 0, b: 40 },
        }
    }

    pub fn lollipop() -> Self {
        ChartTemplate {
            background: colors::PLOT_BACKGROUND.to_string(),
            grid_color: colors::GRID_LINES.to_string(),
            axis_line_color: colors::AXIS_LINE.to_string(),
            x_title: Some("Compensation (USD)".to_string()),
            y_title: None,
            x_dtick: None,
            hover_mode: None,
            show_legend: false,
            margin: Margin { l: 10, r: 0, t: 0, b: 40 },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisState {
    pub scale: AxisScale,
    /// Rendered bounds; `None` until the chart has been given a domain
    pub range: Option<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub template: ChartTemplate,
    pub x_axis: AxisState,
    pub y_axis: AxisState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

// ============================================================================
// CHART
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub layout: Layout,
    traces: Vec<Trace>,
}

impl Chart {
    pub fn empty(template: &ChartTemplate) -> Self {
        Chart {
            layout: Layout {
                template: template.clone(),
                x_axis: AxisState::default(),
                y_axis: AxisState::default(),
                height: None,
            },
            traces: Vec::new(),
        }
    }

    /// Append a trace and return its slot index
    pub fn push_trace(&mut self, trace: Trace) -> usize {
        self.traces.push(trace);
        self.traces.len() - 1
    }

    pub fn blank_trace(&mut self, index: usize) -> Result<()> {
        let len = self.traces.len();
        let trace = self
            .traces
            .get_mut(index)
            .ok_or(DashboardError::TraceIndexOutOfRange { index, len })?;
        trace.blank();
        Ok(())
    }

    pub fn trace(&self, index: usize) -> Option<&Trace> {
        self.traces.get(index)
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Traces that still have data, with their slot index
    pub fn visible_traces(&self) -> impl Iterator<Item = (usize, &Trace)> {
        self.traces.iter().enumerate().filter(|(_, t)| !t.is_blank())
    }

    pub fn set_y_scale(&mut self, scale: AxisScale) {
        self.layout.y_axis.scale = scale;
    }

    pub fn set_year_domain(&mut self, years: YearRange) {
        self.layout.x_axis.range = Some([
            years.min as f64 - YEAR_PADDING,
            years.max as f64 + YEAR_PADDING,
        ]);
    }

    /// Years shown on the x axis: lower bound rounded up, upper rounded down
    pub fn rendered_year_bounds(&self) -> Option<(i32, i32)> {
        self.layout
            .x_axis
            .range
            .map(|[lo, hi]| (lo.ceil() as i32, hi.floor() as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace(name: &str) -> Trace {
        Trace::line(name, vec![2011.0, 2012.0], vec![10.0, 11.0], "$%{y}")
    }

    #[test]
    fn test_blank_keeps_slot() {
        let mut chart = Chart::empty(&ChartTemplate::line("Compensation (USD)"));
        let a = chart.push_trace(sample_trace("a"));
        let b = chart.push_trace(sample_trace("b"));

        chart.blank_trace(a).unwrap();

        assert_eq!((a, b), (0, 1));
        assert_eq!(chart.len(), 2);
        assert!(chart.trace(a).unwrap().is_blank());
        let visible: Vec<usize> = chart.visible_traces().map(|(i, _)| i).collect();
        assert_eq!(visible, vec![1]);
    }

    #[test]
    fn test_blank_out_of_range() {
        let mut chart = Chart::empty(&ChartTemplate::lollipop());
        assert_eq!(
            chart.blank_trace(3),
            Err(DashboardError::TraceIndexOutOfRange { index: 3, len: 0 })
        );
    }

    #[test]
    fn test_rendered_year_bounds_round_inward() {
        let mut chart = Chart::empty(&ChartTemplate::line("Compensation (USD)"));
        assert_eq!(chart.rendered_year_bounds(), None);

        chart.set_year_domain(YearRange { min: 2013, max: 2018 });
        assert_eq!(chart.rendered_year_bounds(), Some((2013, 2018)));

        // autorange style bounds from a renderer
        chart.layout.x_axis.range = Some([2010.62, 2021.38]);
        assert_eq!(chart.rendered_year_bounds(), Some((2011, 2021)));
    }

    #[test]
    fn test_trace_serializes_plotly_style() {
        let json = serde_json::to_value(sample_trace("a")).unwrap();
        assert_eq!(json["mode"], "lines+markers");
        assert_eq!(json["x"], serde_json::json!([2011.0, 2012.0]));
        assert!(json.get("marker").is_none());
    }
}
