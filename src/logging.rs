use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "cineload=info";
/// Filter used with `--quiet`.
pub const QUIET_FILTER: &str = "cineload=warn";

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Logs go to stderr so the
/// summary on stdout stays clean.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}
