//! # Adapters
//!
//! Named consumer presets over the sync engine.
//!
//! Responsibilities:
//! - Instantiate the engine with per-consumer interval/retry defaults
//! - Translate `ChangeEvent`s into what each surface renders
//! - Derive the three-state connection badge
//!
//! No synchronization logic lives here.

mod admin;
mod badge;
mod consumer;
mod locator;
mod preset;

pub use admin::{AdminRefresh, AdminSync, RefreshReason};
pub use badge::ConnectionBadge;
pub use consumer::{ConsumerAdapter, SyncSource};
pub use locator::{LocationsUpdate, LocatorSync};
pub use preset::AdapterPreset;

pub use sync_engine::RefreshOutcome;
