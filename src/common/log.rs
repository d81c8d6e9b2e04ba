//! Diagnostics for the provider itself, emitted through `tracing`.
//!
//! The host usually owns the process, so installing a subscriber is best
//! effort: if one is already set, ours is silently skipped.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INIT: OnceLock<bool> = OnceLock::new();

/// Install a fmt subscriber on stderr once per process.
///
/// `RUST_LOG` takes precedence over `default_level`. Returns whether this
/// call (or an earlier one) managed to install the subscriber.
pub fn init(default_level: &str) -> bool {
    *INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let first = init("debug");
        let second = init("not a ( valid filter");
        assert_eq!(first, second);
    }
}
