//! Tracing setup

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber; `RUST_LOG` overrides the configured level.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let json = config.json.then(|| fmt::layer().json());
    let plain = (!config.json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()?;
    Ok(())
}
