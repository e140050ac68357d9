use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install a stderr subscriber. `RUST_LOG` overrides the configured level; stdout is left to
/// query results.
pub fn init_logging(logging: &LoggingConfig) {
    let level = logging.level().unwrap_or(Level::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    // Ignore error if a global subscriber is already set
    let _ = tracing::subscriber::set_global_default(subscriber);
}
