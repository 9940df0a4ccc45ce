// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use std::env;

use wage_dashboard::{logging, Dashboard, DashboardConfig, SourceTables};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = DashboardConfig::load().context("Failed to load configuration")?;

    if args.len() > 1 && args[1] == "inspect" {
        // Inspect mode: load sources, print what's there
        logging::init("info");
        run_inspect(config)?;
    } else {
        // UI mode (default)
        run_ui_mode(config)?;
    }

    Ok(())
}

fn run_inspect(config: DashboardConfig) -> Result<()> {
    println!("🔎 Wage Dashboard - Source Inspection");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load both sources
    println!("\n📂 Loading CSV sources...");
    let sources = SourceTables::load(&config.data.jobs_path, &config.data.names_path)?;

    for table in [&sources.jobs, &sources.names] {
        let metrics: Vec<String> = table.metrics.iter().map(|m| m.to_string()).collect();
        println!(
            "✓ {} source: {} rows, {} unique, columns [{}]",
            table.kind,
            table.records.len(),
            table.entity_ids().len(),
            metrics.join(", ")
        );
    }

    // 2. Default jobs present?
    println!("\n🔍 Checking default jobs...");
    let known = sources.jobs.entity_ids();
    for job in &config.defaults.jobs {
        if known.contains(job) {
            println!("✓ {}", job);
        } else {
            println!("⚠️  {} (not in job source)", job);
        }
    }

    // 3. Build a session with the defaults
    println!("\n📈 Building default figures...");
    let dashboard = Dashboard::new(config, sources);
    let session = dashboard.open_session()?;
    let figures = session.figures();
    println!(
        "✓ {} compensation traces, {} projected traces, {} compared",
        figures.real.ledger.len(),
        figures.projected.ledger.len(),
        // one stem per entity plus the two marker traces
        figures.comparison.len().saturating_sub(2)
    );

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Sources OK ({})", figures.comparison_title);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: DashboardConfig) -> Result<()> {
    // The terminal belongs to the UI; only log when asked to
    if logging::requested() {
        logging::init("warn");
    }

    println!("🖥️  Loading Wage Dashboard UI...\n");

    if !config.data.jobs_path.exists() || !config.data.names_path.exists() {
        eprintln!("❌ Source data not found!");
        eprintln!("   Expected {}", config.data.jobs_path.display());
        eprintln!("        and {}", config.data.names_path.display());
        eprintln!("   Set WAGE_DASHBOARD_DATA__JOBS_PATH / WAGE_DASHBOARD_DATA__NAMES_PATH");
        std::process::exit(1);
    }

    println!("📊 Loading salary tables...");
    let dashboard = Dashboard::load(config)?;
    let session = dashboard.open_session()?;

    println!(
        "✓ Loaded {} jobs and {} names\n",
        dashboard.sources.jobs.entity_ids().len(),
        dashboard.sources.names.entity_ids().len()
    );
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(&dashboard, session);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: DashboardConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin wage-server --features server");
    std::process::exit(1);
}
