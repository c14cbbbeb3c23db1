// Only compile the dashboard module when the TUI feature is enabled
#[cfg(feature = "tui")]
mod dashboard;

use anyhow::{bail, Context, Result};
use std::env;

use cost_analytics::{
    available_periods, default_periods, fetch_to_file, init_tracing, AnalyticsConfig,
    DashboardReport, RecordCache, Selection,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("dashboard");

    // Log lines would tear the dashboard's alternate screen; opt in via RUST_LOG
    if command != "dashboard" || env::var_os("RUST_LOG").is_some() {
        init_tracing("cost_analytics=info");
    }

    let config = AnalyticsConfig::load()?;

    match command {
        "report" => run_report(config, &args[1..]),
        "periods" => run_periods(config),
        "fetch" => run_fetch(&config),
        "dashboard" => run_dashboard(config),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            bail!("unknown command: {}", other)
        }
    }
}

fn print_usage() {
    println!("cost-analytics {}", cost_analytics::VERSION);
    println!();
    println!("USAGE:");
    println!("    cost-analytics [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    dashboard                 Interactive terminal dashboard (default)");
    println!("    report [A] [B] [--json]   Compare period A with period B");
    println!("    periods                   List available periods, most recent first");
    println!("    fetch                     Download the health-unit registry CSV");
}

fn run_report(config: AnalyticsConfig, args: &[String]) -> Result<()> {
    let as_json = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let network_label = config.network_label.clone();
    let mut cache = RecordCache::new(config);
    let table = cache.get()?;

    let periods = available_periods(&table);
    let (default_a, default_b) = match default_periods(&periods) {
        Some(pair) => pair,
        None => bail!("no records available after catalog resolution"),
    };

    let period_a = positional.first().map(|s| s.to_string()).unwrap_or(default_a);
    let period_b = positional.get(1).map(|s| s.to_string()).unwrap_or(default_b);

    let selection = Selection::everything(&table);
    let report = DashboardReport::build(&table, &selection, &period_a, &period_b, &network_label);

    if as_json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print!("{}", report.render_text());
    }

    Ok(())
}

fn run_periods(config: AnalyticsConfig) -> Result<()> {
    let mut cache = RecordCache::new(config);
    let table = cache.get()?;

    for period in available_periods(&table) {
        println!("{}", period);
    }

    Ok(())
}

fn run_fetch(config: &AnalyticsConfig) -> Result<()> {
    println!("📡 Connecting to data server...");

    let summary = fetch_to_file(&config.fetch)
        .with_context(|| format!("Download from {} failed", config.fetch.url))?;

    println!(
        "✅ Success! '{}' written ({} rows, {} bytes)",
        summary.path.display(),
        summary.rows,
        summary.bytes
    );

    Ok(())
}

#[cfg(feature = "tui")]
fn run_dashboard(config: AnalyticsConfig) -> Result<()> {
    let network_label = config.network_label.clone();
    let mut cache = RecordCache::new(config);
    let table = cache.get()?;

    if table.is_empty() {
        bail!("no records available after catalog resolution");
    }

    let mut app = dashboard::App::new(table, network_label);
    dashboard::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_dashboard(_config: AnalyticsConfig) -> Result<()> {
    eprintln!("❌ Dashboard mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: cost-analytics report");
    std::process::exit(1);
}
