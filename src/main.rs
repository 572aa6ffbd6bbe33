use anyhow::Context;
use clap::Parser;
use log::info;

use congestion_sim::simulation::{GridScenario, SimConfig};

#[derive(Parser)]
#[command(name = "congestion_sim")]
#[command(about = "Compare free-flow and congestion-aware routing on a street grid")]
struct Cli {
    /// Intersections per grid column
    #[arg(long, default_value = "4")]
    rows: usize,

    /// Intersections per grid row
    #[arg(long, default_value = "4")]
    cols: usize,

    /// Number of vehicles to route
    #[arg(long, default_value = "40")]
    vehicles: usize,

    /// Seed for road lengths, speeds and trips
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Deploy one vehicle every this many ticks
    #[arg(long, default_value = "10")]
    deployment_interval: u64,

    /// Simulated time per tick
    #[arg(long, default_value = "1.0")]
    time_factor: f64,

    /// Ticks a blocked vehicle may wait before it is stranded
    #[arg(long, default_value = "100000")]
    stall_budget: u64,

    /// Stop each pass after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Log per-vehicle transitions
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "warn,congestion_sim=debug"
    } else {
        "warn,congestion_sim=info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if cli.deployment_interval == 0 {
        anyhow::bail!("--deployment-interval must be at least 1");
    }
    if cli.time_factor.is_nan() || cli.time_factor <= 0.0 {
        anyhow::bail!("--time-factor must be positive");
    }

    let config = SimConfig {
        time_factor: cli.time_factor,
        deployment_interval: cli.deployment_interval,
        stall_budget: cli.stall_budget,
        max_ticks: cli.max_ticks,
        ..SimConfig::default()
    };
    let scenario = GridScenario {
        rows: cli.rows,
        cols: cli.cols,
        vehicles: cli.vehicles,
        seed: cli.seed,
        ..GridScenario::default()
    };

    info!(
        "Building {}x{} grid with {} vehicles (seed {})",
        scenario.rows, scenario.cols, scenario.vehicles, scenario.seed
    );
    let mut engine = scenario
        .build(config.clone())
        .context("failed to build grid scenario")?;
    engine.log_summary();

    let baseline = engine.run_baseline().context("baseline pass failed")?;
    let optimized = engine.run_optimized().context("optimized pass failed")?;
    for report in [baseline, optimized] {
        info!(
            "{} pass: {} ticks, {:.1} time units, {} completed, {} stranded",
            report.mode.label(),
            report.ticks,
            report.elapsed,
            report.completed,
            report.stranded
        );
    }

    engine
        .results()
        .log_report(config.success_margin, config.failure_tolerance);

    info!("=== SIMULATION COMPLETE ===");
    Ok(())
}
