use tracing_subscriber::EnvFilter;

/// Installs the process-wide tracing subscriber (spec.md §6's ambient logging
/// surface). `RUST_LOG` overrides `default_level` when set.
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();
}
