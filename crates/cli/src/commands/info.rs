//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::SyncConfig;

use super::load_table;
use crate::cli::InfoArgs;

/// Resolved configuration for JSON output
#[derive(Serialize)]
struct EnvironmentInfo {
    environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    preset: Option<&'static str>,
    push_allowed: bool,
    config: SyncConfig,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let table = load_table(args.config.as_deref()).context("Failed to load configuration")?;

    let environments: Vec<String> = match &args.env {
        Some(env) => vec![env.clone()],
        None => table.environment_names().map(str::to_string).collect(),
    };
    info!(environments = environments.len(), "Resolving configuration");

    let preset = args.preset.map(|p| p.preset());
    let infos: Vec<EnvironmentInfo> = environments
        .into_iter()
        .map(|environment| {
            let mut config = table.resolve(&environment);
            if let Some(preset) = &preset {
                config = preset.apply(&config);
            }
            EnvironmentInfo {
                environment,
                preset: preset.map(|p| p.name),
                push_allowed: config.push_allowed(),
                config,
            }
        })
        .collect();

    if args.json {
        let json =
            serde_json::to_string_pretty(&infos).context("Failed to serialize configuration")?;
        println!("{}", json);
    } else {
        for info in &infos {
            print_environment(info);
        }
    }

    Ok(())
}

fn print_environment(info: &EnvironmentInfo) {
    let config = &info.config;
    match info.preset {
        Some(preset) => println!("\n=== {} ({}) ===", info.environment, preset),
        None => println!("\n=== {} ===", info.environment),
    }
    println!("  polling_interval:   {:?}", config.polling_interval);
    println!("  debounce_window:    {:?}", config.debounce_window);
    println!("  retry_delay:        {:?}", config.retry_delay);
    println!("  max_retries:        {}", config.max_retries);
    println!("  heartbeat_interval: {:?}", config.heartbeat_interval);
    println!("  websocket_enabled:  {}", config.websocket_enabled);
    println!("  force_polling_mode: {}", config.force_polling_mode);
    println!("  push allowed:       {}", info.push_allowed);
}
