use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;

use wage_dashboard::chart::{AxisScale, Chart as Figure, SeriesData};
use wage_dashboard::{ControlChange, Dashboard, DashboardSession, YearRange};

const STARTING_VALUE_STEP: u64 = 1_000;

const SERIES_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::LightBlue,
    Color::LightRed,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Compensation,
    Projected,
    Comparison,
}

impl Pane {
    pub fn next(&self) -> Self {
        match self {
            Pane::Compensation => Pane::Projected,
            Pane::Projected => Pane::Comparison,
            Pane::Comparison => Pane::Compensation,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Pane::Compensation => Pane::Comparison,
            Pane::Projected => Pane::Compensation,
            Pane::Comparison => Pane::Projected,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Pane::Compensation => "Compensation",
            Pane::Projected => "Projected",
            Pane::Comparison => "First vs Last Year",
        }
    }
}

pub struct App<'a> {
    pub dashboard: &'a Dashboard,
    pub session: DashboardSession,
    pub jobs: Vec<String>,
    pub job_state: TableState,
    pub current_pane: Pane,
    /// Last rejected control change, shown in the status bar
    pub message: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(dashboard: &'a Dashboard, session: DashboardSession) -> Self {
        let jobs = dashboard.job_titles();
        let mut job_state = TableState::default();
        if !jobs.is_empty() {
            job_state.select(Some(0));
        }

        Self {
            dashboard,
            session,
            jobs,
            job_state,
            current_pane: Pane::Compensation,
            message: None,
        }
    }

    fn apply(&mut self, change: ControlChange) {
        match self.session.apply(self.dashboard, change) {
            Ok(_) => self.message = None,
            Err(err) => {
                tracing::warn!(error = %err, "control change rejected");
                self.message = Some(err.to_string());
            }
        }
    }

    pub fn toggle_selected_job(&mut self) {
        let Some(job) = self.job_state.selected().and_then(|i| self.jobs.get(i)) else {
            return;
        };
        let mut jobs: BTreeSet<String> = self.session.selection().selected_jobs.clone();
        if !jobs.remove(job) {
            jobs.insert(job.clone());
        }
        self.apply(ControlChange::SetJobs(jobs.into_iter().collect()));
    }

    pub fn toggle_scale(&mut self) {
        let scale = self.session.scale().toggle();
        self.apply(ControlChange::SetScale(scale));
    }

    pub fn refresh(&mut self) {
        self.apply(ControlChange::Refresh);
    }

    pub fn toggle_metric(&mut self) {
        let metric = self.session.selection().metric.toggle();
        self.apply(ControlChange::SetMetric(metric));
    }

    pub fn shift_years(&mut self, lower: i32, upper: i32) {
        let years = self.session.selection().years;
        self.apply(ControlChange::SetYearRange(YearRange {
            min: years.min + lower,
            max: years.max + upper,
        }));
    }

    pub fn raise_starting_value(&mut self) {
        let value = self.session.starting_value().saturating_add(STARTING_VALUE_STEP);
        self.apply(ControlChange::SetStartingValue(value));
    }

    pub fn lower_starting_value(&mut self) {
        let value = self.session.starting_value().saturating_sub(STARTING_VALUE_STEP);
        self.apply(ControlChange::SetStartingValue(value));
    }

    pub fn next(&mut self) {
        let len = self.jobs.len();
        if len == 0 {
            return;
        }
        let i = match self.job_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.job_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.jobs.len();
        if len == 0 {
            return;
        }
        let i = match self.job_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.job_state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.current_pane = app.current_pane.next(),
                KeyCode::BackTab => app.current_pane = app.current_pane.previous(),
                KeyCode::Char(' ') => app.toggle_selected_job(),
                KeyCode::Char('l') => app.toggle_scale(),
                KeyCode::Char('r') => app.refresh(),
                KeyCode::Char('m') => app.toggle_metric(),
                KeyCode::Char('[') => app.shift_years(-1, 0),
                KeyCode::Char(']') => app.shift_years(1, 0),
                KeyCode::Char('{') => app.shift_years(0, -1),
                KeyCode::Char('}') => app.shift_years(0, 1),
                KeyCode::Char('+') | KeyCode::Char('=') => app.raise_starting_value(),
                KeyCode::Char('-') => app.lower_starting_value(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(())
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with pane tabs
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30), // Job list
            Constraint::Percentage(70), // Figure
        ])
        .split(chunks[1]);

    render_job_list(f, content_chunks[0], app);
    match app.current_pane {
        Pane::Compensation => {
            let figure = &app.session.figures().real.chart;
            render_line_figure(f, content_chunks[1], figure, " Compensation (USD) ");
        }
        Pane::Projected => {
            let title = format!(
                " Your Projected Compensation (USD) from ${} ",
                app.session.starting_value()
            );
            let figure = &app.session.figures().projected.chart;
            render_line_figure(f, content_chunks[1], figure, &title);
        }
        Pane::Comparison => render_comparison(f, content_chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let panes = [Pane::Compensation, Pane::Projected, Pane::Comparison];

    let mut tab_spans = vec![];
    for (i, pane) in panes.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *pane == app.current_pane {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(pane.title().to_string(), style));
    }

    let selection = app.session.selection();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Years: {}", selection.years.label()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        selection.metric.to_string(),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        match app.session.scale() {
            AxisScale::Linear => "linear",
            AxisScale::Log => "log",
        },
        Style::default().fg(Color::Cyan),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_job_list(f: &mut Frame, area: Rect, app: &mut App) {
    let selected = &app.session.selection().selected_jobs;
    let rows = app.jobs.iter().map(|job| {
        let (mark, color) = if selected.contains(job) {
            ("●", Color::Green)
        } else {
            ("○", Color::DarkGray)
        };
        Row::new(vec![
            Cell::from(mark).style(Style::default().fg(color)),
            Cell::from(truncate(job, 40)),
        ])
        .height(1)
    });

    let table = Table::new(rows, [Constraint::Length(2), Constraint::Min(10)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Jobs "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.job_state);
}

fn render_line_figure(f: &mut Frame, area: Rect, figure: &Figure, title: &str) {
    let scale = figure.layout.y_axis.scale;
    let series = plot_series(figure, scale);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title.to_string());

    let Some([x_lo, x_hi]) = figure.layout.x_axis.range else {
        let empty = Paragraph::new("  No data for the current selection").block(block);
        f.render_widget(empty, area);
        return;
    };
    let [y_lo, y_hi] = y_bounds(&series);

    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, (name, points))| {
            Dataset::default()
                .name(name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                .data(points)
        })
        .collect();

    let x_labels = vec![
        Span::raw(format!("{}", x_lo.ceil() as i32)),
        Span::raw(format!("{}", x_hi.floor() as i32)),
    ];
    let y_labels = vec![
        Span::raw(axis_label(y_lo, scale)),
        Span::raw(axis_label((y_lo + y_hi) / 2.0, scale)),
        Span::raw(axis_label(y_hi, scale)),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([x_lo, x_hi])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([y_lo, y_hi])
                .labels(y_labels),
        );

    f.render_widget(chart, area);
}

fn render_comparison(f: &mut Frame, area: Rect, app: &App) {
    let figures = app.session.figures();
    let rows = comparison_rows(&figures.comparison);

    let header_cells = ["Entity", "First Year", "Last Year", "Change"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let table_rows = rows.iter().map(|(label, start, end)| {
        let change = end - start;
        let color = if change >= 0.0 { Color::Green } else { Color::Red };
        Row::new(vec![
            Cell::from(truncate(label, 36)),
            Cell::from(format!("${:.0}", start)),
            Cell::from(format!("${:.0}", end)),
            Cell::from(format!("{:+.0}", change)).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        table_rows,
        [
            Constraint::Length(38),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", figures.comparison_title)),
    );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![Span::styled(
        format!(" Start: ${} ", app.session.starting_value()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(message) = &app.message {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Red)));
    }

    for (key, label) in [
        ("Space", " Job"),
        ("Tab", " Pane"),
        ("[ ]", " From"),
        ("{ }", " To"),
        ("m", " Metric"),
        ("l", " Log"),
        ("+/-", " Start"),
        ("r", " Refresh"),
    ] {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

// ============================================================================
// FIGURE → TERMINAL HELPERS
// ============================================================================

/// Visible traces as (name, points); log scale plots log10 of positive values
fn plot_series(figure: &Figure, scale: AxisScale) -> Vec<(String, Vec<(f64, f64)>)> {
    figure
        .visible_traces()
        .map(|(_, trace)| {
            let points = trace
                .points()
                .into_iter()
                .filter_map(|(x, y)| match scale {
                    AxisScale::Linear => Some((x, y)),
                    AxisScale::Log if y > 0.0 => Some((x, y.log10())),
                    AxisScale::Log => None,
                })
                .collect();
            (trace.name.clone().unwrap_or_default(), points)
        })
        .collect()
}

fn y_bounds(series: &[(String, Vec<(f64, f64)>)]) -> [f64; 2] {
    let mut values = series.iter().flat_map(|(_, points)| points.iter().map(|&(_, y)| y));
    let Some(first) = values.next() else {
        return [0.0, 1.0];
    };
    let (lo, hi) = values.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if lo == hi {
        [lo - 1.0, hi + 1.0]
    } else {
        let pad = (hi - lo) * 0.05;
        [lo - pad, hi + pad]
    }
}

fn axis_label(value: f64, scale: AxisScale) -> String {
    match scale {
        AxisScale::Linear => format!("${:.0}", value),
        AxisScale::Log => format!("${:.0}", 10f64.powf(value)),
    }
}

/// (label, first-year value, last-year value) read back from the lollipop
/// chart's start and end marker traces
fn comparison_rows(figure: &Figure) -> Vec<(String, f64, f64)> {
    let len = figure.len();
    if len < 2 {
        return Vec::new();
    }
    let (Some(start), Some(end)) = (figure.trace(len - 2), figure.trace(len - 1)) else {
        return Vec::new();
    };
    let (SeriesData::Category(labels), Some(starts), Some(ends)) =
        (&start.y, start.x.as_numeric(), end.x.as_numeric())
    else {
        return Vec::new();
    };

    labels
        .iter()
        .zip(starts.iter().zip(ends))
        .map(|(label, (&s, &e))| (label.replace("<br>", " "), s, e))
        .collect()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wage_dashboard::chart::{ChartTemplate, Trace};
    use wage_dashboard::series::{comparison_chart, ComparisonPair};

    #[test]
    fn test_log_scale_drops_non_positive_points() {
        let mut figure = Figure::empty(&ChartTemplate::line("Compensation (USD)"));
        figure.push_trace(Trace::line("a", vec![2011.0, 2012.0], vec![0.0, 1000.0], "$%{y}"));

        let series = plot_series(&figure, AxisScale::Log);

        assert_eq!(series[0].1.len(), 1);
        let (x, y) = series[0].1[0];
        assert_eq!(x, 2012.0);
        assert!((y - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_blank_traces_not_plotted() {
        let mut figure = Figure::empty(&ChartTemplate::line("Compensation (USD)"));
        let a = figure.push_trace(Trace::line("a", vec![2011.0], vec![1.0], "$%{y}"));
        figure.push_trace(Trace::line("b", vec![2011.0], vec![2.0], "$%{y}"));
        figure.blank_trace(a).unwrap();

        let series = plot_series(&figure, AxisScale::Linear);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].0, "b");
    }

    #[test]
    fn test_y_bounds_padding() {
        assert_eq!(y_bounds(&[]), [0.0, 1.0]);
        let series = vec![("a".to_string(), vec![(0.0, 100.0), (1.0, 200.0)])];
        assert_eq!(y_bounds(&series), [95.0, 205.0]);
    }

    #[test]
    fn test_comparison_rows_from_markers() {
        let pairs = vec![ComparisonPair {
            entity_id: "jane doe".to_string(),
            start: 100,
            end: 250,
        }];
        let figure = comparison_chart(&pairs, YearRange { min: 2011, max: 2021 });

        assert_eq!(
            comparison_rows(&figure),
            vec![("jane doe".to_string(), 100.0, 250.0)]
        );
    }
}
