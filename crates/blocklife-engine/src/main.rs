//! Host binary for the BlockLife simulation.
//!
//! Wires configuration, the simulation facade, a logging observer, and the
//! scheduler loop together, then runs until the cycle limit or Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`BLOCKLIFE_CONFIG` or `blocklife-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the simulation, runner, and notification bus
//! 4. Subscribe the logging observer
//! 5. Place the configured seed blocks
//! 6. Run the scheduler loop
//! 7. Log totals and check grid integrity

mod error;
mod log_observer;

use std::path::PathBuf;
use std::sync::Arc;

use blocklife_core::config::LoggingConfig;
use blocklife_core::{Command, SchedulerControl, Simulation, SimulationConfig, run_scheduler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::log_observer::{LogObserver, Tally};

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "blocklife-config.yaml";

/// Environment variable that overrides the config path.
const CONFIG_PATH_ENV: &str = "BLOCKLIFE_CONFIG";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the simulation
/// cannot be built, or the grid fails its integrity check at shutdown.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_found) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("blocklife-engine starting");
    if !config_found {
        info!("Config file not found, using defaults");
    }
    info!(
        width = config.grid.width,
        height = config.grid.height,
        patterns = config.patterns.definitions.len(),
        interval_ms = config.scheduler.interval_ms,
        max_cycles = config.scheduler.max_cycles,
        "Configuration loaded"
    );

    // 3. Build the simulation.
    let (simulation, runner, bus) =
        Simulation::from_config(&config).map_err(EngineError::from)?;

    // 4. Subscribe the logging observer.
    let tally = Arc::new(Tally::default());
    let subscription = bus.subscribe(LogObserver::new(Arc::clone(&tally)));
    info!(subscription = %subscription.id(), "Logging observer subscribed");

    // 5. Place seed blocks.
    let seeded = seed(&simulation, &config);
    info!(
        seeded,
        requested = config.seed.len(),
        entities = simulation.entity_count(),
        "Seed blocks placed"
    );

    // 6. Run the scheduler until the cycle limit or Ctrl-C.
    let control = Arc::new(SchedulerControl::new(&config.scheduler));
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping after final drain");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }
    let summary = run_scheduler(&runner, &control).await;

    // 7. Log results and check integrity.
    let stats = runner.stats();
    info!(
        end_reason = ?summary.end_reason,
        cycles = summary.cycles,
        published = stats.published,
        duplicates_skipped = stats.duplicates_skipped,
        deliveries = stats.deliveries,
        delivery_failures = stats.delivery_failures,
        "Runner finished"
    );
    tally.log();
    drop(subscription);

    let violations = simulation.verify_integrity();
    if !violations.is_empty() {
        for violation in &violations {
            error!(?violation, "grid integrity violation");
        }
        return Err(EngineError::Integrity {
            violations: violations.len(),
        }
        .into());
    }

    info!(
        entities = simulation.entity_count(),
        "blocklife-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `BLOCKLIFE_CONFIG` or the default path.
///
/// Falls back to defaults when the file does not exist. The second value
/// reports whether a file was read.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let config_path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if config_path.exists() {
        let config = SimulationConfig::from_file(&config_path)?;
        Ok((config, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Place every configured seed block, skipping the ones the grid rejects.
///
/// Returns how many were placed.
fn seed(simulation: &Simulation, config: &SimulationConfig) -> usize {
    let mut placed: usize = 0;
    for block in &config.seed {
        let command = Command::Place {
            position: block.position(),
            category: block.category(),
        };
        match simulation.submit(command) {
            Ok(outcome) => {
                placed = placed.saturating_add(1);
                if outcome.chain.merges() > 0 {
                    info!(
                        position = %block.position(),
                        merges = outcome.chain.merges(),
                        "Seed block triggered merges"
                    );
                }
            }
            Err(e) => warn!(
                position = %block.position(),
                error = %e,
                "Seed block rejected"
            ),
        }
    }
    placed
}
