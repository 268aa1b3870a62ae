//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,tavola=debug,sqlx=warn";

/// Installs the global `tracing` subscriber.
///
/// Honours `RUST_LOG`. Calling it again, or after another subscriber was
/// installed, leaves the first one in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init_tracing();
        init_tracing();
        tracing::debug!("still alive");
    }
}
