//! Global `tracing` subscriber setup shared by both binaries.
//!
//! Output goes to stderr so the CLI can stream CSV on stdout. `RUST_LOG`
//! overrides the level passed in, e.g. `RUST_LOG=cmb_explorer=debug`.

use anyhow::{Result, anyhow};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub const DEFAULT_LEVEL: &str = "info";

/// Install the stderr subscriber. Fails if one is already installed.
pub fn init_logging(default_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        // The first call may lose the race against another test; the second never wins.
        let _ = init_logging("warn");
        assert!(init_logging("warn").is_err());
    }
}
