//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use adapters::AdapterPreset;
use contracts::PushStatus;
use transport::ChannelBehavior;

/// table-sync - keep read-side consumers fresh against a shared table
#[derive(Parser, Debug)]
#[command(
    name = "table-sync",
    author,
    version,
    about = "Push/poll table synchronization engine",
    long_about = "Keeps read-side consumers fresh against a shared table.\n\n\
                  Prefers a realtime push channel, falls back to fingerprinted \n\
                  polling, and debounces manual refreshes. `run` drives the engine \n\
                  against an in-memory table that mutates on a timer."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TABLE_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TABLE_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a consumer against a simulated table
    Run(RunArgs),

    /// Validate an override file without running
    Validate(ValidateArgs),

    /// Display the resolved configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Override file (TOML or JSON). Built-in table when omitted.
    #[arg(short, long, env = "TABLE_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Environment to resolve
    #[arg(short, long, default_value = "development", env = "TABLE_SYNC_ENV")]
    pub env: String,

    /// Consumer preset
    #[arg(long, value_enum, default_value = "locator", env = "TABLE_SYNC_PRESET")]
    pub preset: PresetArg,

    /// Never attempt the push channel (also TABLE_SYNC_FORCE_POLLING=1)
    #[arg(long)]
    pub force_polling: bool,

    /// Public hostname, checked against known edge platforms
    #[arg(long, env = "TABLE_SYNC_HOSTNAME")]
    pub hostname: Option<String>,

    /// Session cookie names, checked against known edge proxies
    #[arg(long = "cookie", value_name = "NAME")]
    pub cookies: Vec<String>,

    /// How the simulated push channel answers subscriptions
    #[arg(long, value_enum, default_value = "confirm")]
    pub push: PushMode,

    /// Break a confirmed push channel after this many seconds
    #[arg(long, value_name = "SECS")]
    pub drop_push_after: Option<u64>,

    /// Run duration in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "30", env = "TABLE_SYNC_DURATION")]
    pub duration: u64,

    /// Rows seeded into the simulated table
    #[arg(long, default_value = "25")]
    pub rows: usize,

    /// Milliseconds between two simulated writes
    #[arg(long, default_value = "2000")]
    pub mutation_interval_ms: u64,

    /// Probability that a write tick also fails the next query
    #[arg(long, default_value = "0.0")]
    pub failure_rate: f64,

    /// Milliseconds between simulated manual refreshes (0 = never)
    #[arg(long, default_value = "0")]
    pub refresh_interval_ms: u64,

    /// Seed for the simulated writes
    #[arg(long)]
    pub seed: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TABLE_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Override file to validate
    #[arg(short, long, default_value = "table-sync.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Override file. Built-in table when omitted.
    #[arg(short, long, env = "TABLE_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only show this environment
    #[arg(short, long)]
    pub env: Option<String>,

    /// Apply a consumer preset on top
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Consumer preset
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresetArg {
    /// Admin console
    Admin,
    /// End-user locator
    Locator,
}

impl PresetArg {
    pub fn preset(&self) -> AdapterPreset {
        match self {
            Self::Admin => AdapterPreset::admin(),
            Self::Locator => AdapterPreset::locator(),
        }
    }
}

/// Simulated push channel behaviour
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushMode {
    /// Confirm subscriptions
    Confirm,
    /// Answer with CHANNEL_ERROR
    Reject,
    /// Never answer (heartbeat timeout)
    Silent,
}

impl From<PushMode> for ChannelBehavior {
    fn from(mode: PushMode) -> Self {
        match mode {
            PushMode::Confirm => ChannelBehavior::Confirm,
            PushMode::Reject => ChannelBehavior::Reject(PushStatus::ChannelError),
            PushMode::Silent => ChannelBehavior::Silent,
        }
    }
}
