// End-to-end: load the bundled CSVs, open a session, drive it through the
// control changes a user would make.

use std::path::PathBuf;
use wage_dashboard::{
    ControlChange, Dashboard, DashboardConfig, DomainChange, FigureEvent, SearchOutcome, YearRange,
};

fn create_test_dashboard() -> Dashboard {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    let mut config = DashboardConfig::default();
    config.data.jobs_path = data.join("salaries_by_job.csv");
    config.data.names_path = data.join("salaries_by_name.csv");
    Dashboard::load(config).unwrap()
}

#[test]
fn test_session_flow_over_bundled_data() {
    let dashboard = create_test_dashboard();
    let mut session = dashboard.open_session().unwrap();

    // five default jobs, all spanning 2011-2021
    assert_eq!(session.figures().real.ledger.len(), 5);
    assert_eq!(session.figures().projected.ledger.len(), 5);
    assert_eq!(session.figures().comparison.len(), 7);

    // duplicate 2015 rows for jane doe are summed
    session
        .apply(&dashboard, ControlChange::AddName("jane doe".to_string()))
        .unwrap();
    assert_eq!(session.figures().real.ledger.index_of("jane doe"), Some(5));
    assert_eq!(session.dataset().value_at("jane doe", 2015), Some(83_150));

    // starts in 2013: plotted, but neither projected nor compared
    session
        .apply(&dashboard, ControlChange::AddName("john q public".to_string()))
        .unwrap();
    assert!(session.figures().real.ledger.contains("john q public"));
    assert!(!session.figures().projected.ledger.contains("john q public"));

    let event = session
        .apply(&dashboard, ControlChange::SetYearRange(YearRange { min: 2013, max: 2016 }))
        .unwrap();
    assert_eq!(event, FigureEvent::DomainChanged(DomainChange::YearRange));
    assert_eq!(session.figures().real.chart.len(), 7);
    assert!(session.figures().projected.ledger.contains("john q public"));
    assert_eq!(session.figures().comparison_title, "Years: 2013-2016");

    session
        .apply(&dashboard, ControlChange::UseStartingJob("Professor (II)".to_string()))
        .unwrap();
    assert_eq!(session.starting_value(), 145_100);
    let projected = session.figures().projected.trace_for("Professor (II)").unwrap();
    assert_eq!(projected.points()[0], (2013.0, 145_100.0));
}

#[test]
fn test_name_search_over_bundled_data() {
    let dashboard = create_test_dashboard();

    match dashboard.search_names("Garcia") {
        SearchOutcome::Matches { names } => {
            assert_eq!(names.len(), 1);
            assert_eq!(names[0].name, "maria garcia");
            assert_eq!(names[0].years, (2011..=2016).collect::<Vec<_>>());
        }
        other => panic!("expected matches, got {:?}", other),
    }
    assert_eq!(dashboard.search_names("nobody"), SearchOutcome::NoMatch);
}
