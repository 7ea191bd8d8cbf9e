//! Interstitials
//!
//! Umbrella crate for the interstitial presentation engine. It re-exports the
//! workspace crates and owns process-level logging setup.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use interstitial;
pub use storage;

pub mod telemetry;
