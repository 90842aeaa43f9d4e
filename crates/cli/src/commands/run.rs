//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use config_loader::{force_polling_from, parse_flag, RuntimeProbe};

use super::load_table;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::simulation::{Simulation, SimulationConfig};

/// Environment variable that disables the push transport
const FORCE_POLLING_ENV: &str = "TABLE_SYNC_FORCE_POLLING";

/// Execute the `run` command
pub async fn run_simulation(args: &RunArgs) -> Result<()> {
    check_args(args)?;

    let table = load_table(args.config.as_deref()).context("Failed to load configuration")?;

    let probe = RuntimeProbe {
        hostname: args.hostname.clone(),
        cookie_names: args.cookies.clone(),
    };
    let env_flag = std::env::var(FORCE_POLLING_ENV)
        .map(|v| parse_flag(&v))
        .unwrap_or(false);
    let force_polling = force_polling_from(args.force_polling || env_flag, &probe);
    if force_polling && !(args.force_polling || env_flag) {
        warn!(hostname = ?args.hostname, "Edge proxy detected, push transport disabled");
    }

    if !table.has_environment(&args.env) {
        warn!(env = %args.env, "Unknown environment, using base sync config");
    }
    let sync = table.resolve(&args.env).with_force_polling(force_polling);
    info!(
        env = %args.env,
        preset = args.preset.preset().name,
        polling_interval_ms = args.preset.preset().polling_interval.as_millis() as u64,
        debounce_window_ms = sync.debounce_window.as_millis() as u64,
        push_allowed = sync.push_allowed(),
        "Configuration resolved"
    );

    let config = SimulationConfig {
        sync,
        preset: args.preset,
        rows: args.rows,
        mutation_interval: Duration::from_millis(args.mutation_interval_ms),
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        push_mode: args.push,
        drop_push_after: args.drop_push_after.map(Duration::from_secs),
        failure_rate: args.failure_rate,
        refresh_interval: (args.refresh_interval_ms > 0)
            .then(|| Duration::from_millis(args.refresh_interval_ms)),
        seed: args.seed.unwrap_or_else(rand::random),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting simulation...");
    let stats = Simulation::new(config)
        .run(shutdown_signal())
        .await
        .context("Simulation failed")?;

    info!(
        deliveries = stats.deliveries,
        mutations = stats.mutations,
        duration_secs = stats.duration.as_secs_f64(),
        "Simulation completed"
    );
    stats.print_summary();

    info!("table-sync finished");
    Ok(())
}

fn check_args(args: &RunArgs) -> crate::error::Result<()> {
    if !(0.0..=1.0).contains(&args.failure_rate) {
        return Err(CliError::invalid_argument(
            "failure-rate",
            "must be between 0.0 and 1.0",
        ));
    }
    if args.mutation_interval_ms == 0 {
        return Err(CliError::invalid_argument(
            "mutation-interval-ms",
            "must be greater than 0",
        ));
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
