//! # Contracts
//!
//! Frozen interface contracts shared by every table-sync crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Row freshness uses the store's `updated_at` (`DateTime<Utc>`)
//! - Engine timers use Tokio's monotonic clock; observable timestamps are UTC

mod config;
mod error;
mod event;
mod fingerprint;
mod row;
mod row_id;
mod source;
mod status;

pub use config::*;
pub use error::*;
pub use event::*;
pub use fingerprint::DatasetFingerprint;
pub use row::*;
pub use row_id::RowId;
pub use source::*;
pub use status::*;
