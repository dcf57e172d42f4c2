use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs the JSON subscriber used by every binary. `RUST_LOG` overrides the
/// default `info` level. Calling it twice keeps the first subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_current_span(false)
        .without_time()
        .try_init();
}
