//! Storage layer for the interstitial engine
//!
//! This crate provides the durable key-value backing, a clock abstraction,
//! and the display timestamp store used to gate interstitial replays.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod kv;
pub mod timestamps;

pub use clock::{Clock, ManualClock, SystemClock};
pub use kv::{KeyValueStore, KvConfig, KvError, KvStore, MemoryStore};
pub use timestamps::{DisplayTimestampStore, TimestampStoreError};
