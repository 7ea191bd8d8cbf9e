//! Logging setup
//!
//! The engine logs through `tracing`; hosts call [`init_tracing`] once at
//! startup to route those events to stderr.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVE: &str = "interstitial=info,storage=warn";

/// Install a formatting subscriber filtered by `RUST_LOG`, or `default_directive`
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_existing_subscriber() {
        init_tracing(DEFAULT_DIRECTIVE);
        assert!(!init_tracing("debug"));
    }
}
