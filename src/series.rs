// 🧮 Derived-Series Calculator
//
// Compensation-over-time traces, projected pay under an entity's growth
// rate, and first-year/last-year comparison pairs.

use crate::chart::{colors, Chart, ChartTemplate, LineStyle, MarkerStyle, SeriesData, Trace, TraceMode};
use crate::error::{DashboardError, Result};
use crate::filter::{FilteredDataset, YearRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const COMPENSATION_HOVER: &str = "$%{y}";
pub const LOLLIPOP_MARKER_SIZE: f64 = 9.0;
pub const LOLLIPOP_LINE_WIDTH: f64 = 3.0;

// ============================================================================
// COMPENSATION OVER TIME
// ============================================================================

pub fn compensation_trace(entity_id: &str, points: &[(i32, u64)]) -> Trace {
    let (x, y): (Vec<f64>, Vec<f64>) = points
        .iter()
        .map(|&(year, value)| (year as f64, value as f64))
        .unzip();
    Trace::line(entity_id, x, y, COMPENSATION_HOVER)
}

// ============================================================================
// PROJECTED COMPENSATION
// ============================================================================

/// Round to the nearest 100, ties to even
pub fn round_to_hundred(value: f64) -> f64 {
    (value / 100.0).round_ties_even() * 100.0
}

/// Apply an entity's year-over-year growth to a starting value.
///
/// `adjustment[i] = c[i] / c[i-1]` with the first factor fixed at 1; the
/// running product scales `starting_value`. A zero in any denominator
/// position is rejected instead of producing inf/NaN.
pub fn projected_values(
    entity_id: &str,
    points: &[(i32, u64)],
    starting_value: u64,
) -> Result<Vec<f64>> {
    let mut projected = Vec::with_capacity(points.len());
    let mut cumulative = 1.0_f64;

    for (i, &(_, pay)) in points.iter().enumerate() {
        let (prior_year, prior_pay) = if i == 0 { points[0] } else { points[i - 1] };
        if prior_pay == 0 {
            return Err(DashboardError::ZeroCompensation {
                entity: entity_id.to_string(),
                year: prior_year,
            });
        }
        let adjustment = (pay as f64 - prior_pay as f64) / prior_pay as f64 + 1.0;
        cumulative *= adjustment;
        projected.push(round_to_hundred(cumulative * starting_value as f64));
    }

    Ok(projected)
}

pub fn projected_label(entity_id: &str) -> String {
    format!("at {} rate", entity_id)
}

pub fn projected_trace(entity_id: &str, points: &[(i32, u64)], starting_value: u64) -> Result<Trace> {
    let values = projected_values(entity_id, points, starting_value)?;
    let years = points.iter().map(|&(year, _)| year as f64).collect();
    Ok(Trace::line(projected_label(entity_id), years, values, COMPENSATION_HOVER))
}

// ============================================================================
// FIRST / LAST YEAR COMPARISON
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub entity_id: String,
    /// Compensation at the lower year bound
    pub start: u64,
    /// Compensation at the upper year bound
    pub end: u64,
}

/// Pairs for `wanted` entities, ascending by (end, start)
pub fn comparison_pairs(
    dataset: &FilteredDataset,
    wanted: &BTreeSet<String>,
    years: YearRange,
) -> Vec<ComparisonPair> {
    let mut pairs: Vec<ComparisonPair> = wanted
        .iter()
        .filter_map(|entity| {
            let start = dataset.value_at(entity, years.min)?;
            let end = dataset.value_at(entity, years.max)?;
            Some(ComparisonPair {
                entity_id: entity.clone(),
                start,
                end,
            })
        })
        .collect();

    pairs.sort_by(|a, b| {
        (a.end, a.start, &a.entity_id).cmp(&(b.end, b.start, &b.entity_id))
    });
    pairs
}

pub fn comparison_title(years: YearRange) -> String {
    format!("Years: {}", years.label())
}

/// Break the label at its first space so long names wrap
pub fn wrap_label(entity_id: &str) -> String {
    entity_id.replacen(' ', "<br>", 1)
}

pub fn comparison_height(rows: usize) -> u32 {
    if rows < 6 {
        400
    } else {
        (rows as u32 - 6) * 50 + 400
    }
}

/// Build the lollipop chart from scratch: one stem per entity plus a start
/// and an end marker trace.
pub fn comparison_chart(pairs: &[ComparisonPair], years: YearRange) -> Chart {
    let mut chart = Chart::empty(&ChartTemplate::lollipop());
    if pairs.is_empty() {
        return chart;
    }

    let labels: Vec<String> = pairs.iter().map(|p| wrap_label(&p.entity_id)).collect();

    for (pair, label) in pairs.iter().zip(&labels) {
        chart.push_trace(Trace {
            name: None,
            x: SeriesData::Numeric(vec![pair.start as f64, pair.end as f64]),
            y: SeriesData::Category(vec![label.clone(), label.clone()]),
            mode: TraceMode::Lines,
            hover_template: None,
            hover_skip: true,
            line: Some(LineStyle {
                color: colors::LOLLIPOP_LINE.to_string(),
                width: LOLLIPOP_LINE_WIDTH,
            }),
            marker: None,
        });
    }

    let markers = |values: Vec<f64>, year: i32, color: &str| Trace {
        name: None,
        x: SeriesData::Numeric(values),
        y: SeriesData::Category(labels.clone()),
        mode: TraceMode::Markers,
        hover_template: Some(format!("$%{{x}}<br>{}<extra></extra>", year)),
        hover_skip: false,
        line: None,
        marker: Some(MarkerStyle {
            color: color.to_string(),
            size: LOLLIPOP_MARKER_SIZE,
            symbol: "circle".to_string(),
        }),
    };

    chart.push_trace(markers(
        pairs.iter().map(|p| p.start as f64).collect(),
        years.min,
        colors::START_MARKER,
    ));
    chart.push_trace(markers(
        pairs.iter().map(|p| p.end as f64).collect(),
        years.max,
        colors::END_MARKER,
    ));

    chart.layout.height = Some(comparison_height(pairs.len()));
    chart
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter, CompensationMetric, FilterSelection};
    use crate::records::{SourceKind, SourceRecord, SourceTable, SourceTables};

    fn dataset(rows: &[(&str, i32, f64)]) -> FilteredDataset {
        let records: Vec<SourceRecord> = rows
            .iter()
            .map(|&(e, year, pay)| SourceRecord {
                entity_id: e.to_string(),
                year,
                total_pay: Some(pay),
                total_pay_and_benefits: None,
            })
            .collect();
        let names: Vec<String> = rows.iter().map(|r| r.0.to_string()).collect();
        let sources = SourceTables {
            jobs: SourceTable::new(SourceKind::Jobs, vec![CompensationMetric::Gross], vec![]),
            names: SourceTable::new(SourceKind::Names, vec![CompensationMetric::Gross], records),
        };
        let selection = FilterSelection::new(YearRange { min: 2011, max: 2021 }, CompensationMetric::Gross)
            .with_names(names);
        filter(&sources, &selection).unwrap()
    }

    #[test]
    fn test_projection_follows_growth_rate() {
        let points = [(2019, 200), (2020, 220), (2021, 200)];

        let projected = projected_values("a", &points, 1000).unwrap();

        assert_eq!(projected, vec![1000.0, 1100.0, 1000.0]);
    }

    #[test]
    fn test_projection_rounds_to_hundreds() {
        // 1.5% raise on 52_340 → 53_125.1, rounds to 53_100
        let points = [(2011, 1000), (2012, 1015)];

        let projected = projected_values("a", &points, 52_340).unwrap();

        assert_eq!(projected, vec![52_300.0, 53_100.0]);
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round_to_hundred(250.0), 200.0);
        assert_eq!(round_to_hundred(350.0), 400.0);
        assert_eq!(round_to_hundred(349.9), 300.0);
    }

    #[test]
    fn test_projection_rejects_zero_prior_pay() {
        let points = [(2011, 500), (2012, 0), (2013, 600)];

        let err = projected_values("a", &points, 1000).unwrap_err();

        assert_eq!(
            err,
            DashboardError::ZeroCompensation {
                entity: "a".to_string(),
                year: 2012
            }
        );
    }

    #[test]
    fn test_projection_allows_trailing_zero() {
        let projected = projected_values("a", &[(2011, 500), (2012, 0)], 1000).unwrap();
        assert_eq!(projected, vec![1000.0, 0.0]);
    }

    #[test]
    fn test_projected_trace_label() {
        let trace = projected_trace("Teaching Assistant", &[(2011, 10), (2012, 20)], 100).unwrap();
        assert_eq!(trace.name.as_deref(), Some("at Teaching Assistant rate"));
        assert_eq!(trace.points(), vec![(2011.0, 100.0), (2012.0, 200.0)]);
    }

    #[test]
    fn test_comparison_sorted_by_last_year() {
        let data = dataset(&[
            ("A", 2011, 5.0),
            ("A", 2021, 6.0),
            ("B", 2011, 8.0),
            ("B", 2021, 7.0),
        ]);
        let wanted = BTreeSet::from(["B".to_string(), "A".to_string()]);

        let pairs = comparison_pairs(&data, &wanted, YearRange { min: 2011, max: 2021 });

        let order: Vec<&str> = pairs.iter().map(|p| p.entity_id.as_str()).collect();
        assert_eq!(order, vec!["A", "B"]);
        assert_eq!((pairs[0].start, pairs[0].end), (500, 600));
    }

    #[test]
    fn test_comparison_ties_fall_back_to_first_year() {
        let data = dataset(&[
            ("A", 2011, 9.0),
            ("A", 2021, 7.0),
            ("B", 2011, 3.0),
            ("B", 2021, 7.0),
        ]);
        let wanted = data.entities();

        let pairs = comparison_pairs(&data, &wanted, YearRange { min: 2011, max: 2021 });

        assert_eq!(pairs[0].entity_id, "B");
    }

    #[test]
    fn test_comparison_chart_shape() {
        let pairs = vec![
            ComparisonPair { entity_id: "jane doe".to_string(), start: 100, end: 200 },
            ComparisonPair { entity_id: "TA".to_string(), start: 300, end: 400 },
        ];

        let chart = comparison_chart(&pairs, YearRange { min: 2012, max: 2020 });

        // two stems + start markers + end markers
        assert_eq!(chart.len(), 4);
        assert_eq!(chart.layout.height, Some(400));
        assert_eq!(
            chart.trace(0).unwrap().y,
            SeriesData::Category(vec!["jane<br>doe".to_string(), "jane<br>doe".to_string()])
        );
        assert_eq!(
            chart.trace(3).unwrap().hover_template.as_deref(),
            Some("$%{x}<br>2020<extra></extra>")
        );
    }

    #[test]
    fn test_comparison_height_grows_past_five() {
        assert_eq!(comparison_height(5), 400);
        assert_eq!(comparison_height(6), 400);
        assert_eq!(comparison_height(8), 500);
    }

    #[test]
    fn test_empty_comparison_chart() {
        let chart = comparison_chart(&[], YearRange { min: 2012, max: 2020 });
        assert!(chart.is_empty());
        assert_eq!(chart.layout.height, None);
    }
}
