//! iopoint-sim - I/O point simulator for VoltageEMS
//!
//! Drives a set of I/O points against simulated devices on a fixed cycle,
//! logging every state change and printing a summary when it stops.

mod config;
mod device;
mod simulator;

use crate::config::SimConfig;
use crate::simulator::{PointSummary, Simulator};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use common::logging::{self, LogConfig};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use voltage_iopoint::{IoPoint, SystemTimeProvider};

/// Environment prefix for configuration overrides
const ENV_PREFIX: &str = "IOPOINT_SIM_";

#[derive(Parser, Debug)]
#[command(name = "iopoint-sim")]
#[command(about = "Simulate VoltageEMS I/O points against fault-injecting devices")]
#[command(version)]
struct Cli {
    /// Configuration file (yaml, toml or json)
    #[arg(short, long, env = "IOPOINT_SIM_CONFIG")]
    config: Option<PathBuf>,

    /// Stop after this many cycles
    #[arg(short = 'n', long)]
    cycles: Option<u64>,

    /// Cycle interval in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Seed for fault injection
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter, e.g. "debug" or "info,voltage_iopoint=trace"
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for the daily rolling log file
    #[arg(long, env = "IOPOINT_SIM_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Write the log file as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut SimConfig) {
        if let Some(cycles) = self.cycles {
            config.max_cycles = Some(cycles);
        }
        if let Some(interval_ms) = self.interval_ms {
            config.cycle_interval_ms = interval_ms;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_with_config(LogConfig {
        log_dir: cli.log_dir.clone(),
        default_filter: cli.log_level.clone(),
        enable_json: cli.json_logs,
        ..LogConfig::new("iopoint-sim")
    })
    .context("initializing logging")?;

    let mut config: SimConfig = common::config::load_config(cli.config.as_deref(), ENV_PREFIX)
        .context("loading simulator configuration")?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    info!(
        class = IoPoint::<f64>::CLASS_NAME,
        points = config.points.len(),
        interval_ms = config.cycle_interval_ms,
        "Starting simulation"
    );

    let simulator = Simulator::new(&config, Arc::new(SystemTimeProvider))?;
    let interval = Duration::from_millis(config.cycle_interval_ms);

    tokio::select! {
        _ = simulator.run(interval, config.max_cycles) => {},
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        },
    }

    print_summary(&simulator.summary());
    let stats = simulator.stats();
    println!(
        "\n{} cycles, {} state changes, {} setpoints submitted",
        stats.cycles.load(Ordering::Relaxed),
        stats.changes.load(Ordering::Relaxed),
        stats.writes_submitted.load(Ordering::Relaxed)
    );
    Ok(())
}

fn print_summary(rows: &[PointSummary]) {
    println!("\n{}", "Point summary".bold());
    println!(
        "{:<24} {:<7} {:>12} {:<8} {:<22} {}",
        "POINT", "DIR", "VALUE", "QUALITY", "ERROR", "UPDATED"
    );
    for row in rows {
        let quality = if row.quality.is_good() {
            row.quality.as_str().green()
        } else {
            row.quality.as_str().red()
        };
        println!(
            "{:<24} {:<7} {:>12.3} {:<8} {:<22} {}",
            row.name,
            row.direction.as_str(),
            row.value,
            quality,
            row.error.to_string(),
            row.update_time
        );
    }
}
