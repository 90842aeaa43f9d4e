//! # Transport
//!
//! The two ways a consumer learns about table changes.
//!
//! - [`PollTransport`]: periodic projection query + dataset fingerprint
//! - [`PushTransport`]: realtime channel adapter with idempotent teardown
//! - [`MemoryTable`] / [`MemoryChannel`]: in-memory store for tests and demos
//!
//! Neither transport retries or keeps connection state; both report failures
//! as values and leave policy to the sync engine.

mod error;
mod fingerprint;
mod memory;
mod poll;
mod push;

pub use error::{Result, TransportError};
pub use fingerprint::fingerprint;
pub use memory::{ChannelBehavior, MemoryChannel, MemoryTable};
pub use poll::{PollOutcome, PollTransport};
pub use push::{PushTransport, Subscription};
