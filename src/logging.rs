// 📝 Logging - tracing subscriber setup shared by both binaries

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "risk_control=info,tower_http=info";

/// RUST_LOG wins over the default filter
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the fmt subscriber; a second call is a no-op
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init();
}
