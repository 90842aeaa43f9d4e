//! # Sync Engine
//!
//! Per-consumer synchronization state machine.
//!
//! Responsibilities:
//! - Prefer the push transport, fall back to polling for the session on failure
//! - Emit poll updates only when the dataset fingerprint changes
//! - Debounce manual refreshes
//! - Stop without leaking tasks or late deliveries
//!
//! ## Example
//!
//! ```ignore
//! use sync_engine::SyncEngineBuilder;
//!
//! let engine = SyncEngineBuilder::new("locator", table.clone(), "locations")
//!     .config(config_loader::resolve("production"))
//!     .on_update(|event| tracing::info!(source = event.source.as_str(), "update"))
//!     .build();
//!
//! engine.start();
//! // ...
//! engine.stop();
//! ```

mod builder;
mod clock;
mod engine;
mod phase;
mod stats;

pub use builder::SyncEngineBuilder;
pub use engine::{RefreshOutcome, SyncEngine};
pub use phase::EnginePhase;
pub use stats::{EngineStats, StatsSnapshot};

// Re-export contracts types
pub use contracts::{ChangeEvent, ConnectionStatus, ConnectionType, SyncConfig};
