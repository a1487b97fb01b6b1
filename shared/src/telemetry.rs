//! Tracing setup shared by every function.

use tracing_subscriber::EnvFilter;

/// Install the JSON subscriber.
///
/// `RUST_LOG` wins when set; otherwise the `LOG_LEVEL` variable the stacks
/// configure on each function is used, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .json()
        .init();
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL")
            .map(|l| l.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}
