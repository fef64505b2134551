//! Tracing setup for binaries and demos. The library itself only emits
//! `tracing` events; nothing is printed unless a subscriber is installed.

use crate::config::SynthConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "info";

/// Install a console subscriber. `RUST_LOG` wins over the config filter.
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logging(config: Option<&SynthConfig>) {
    let filter_str = config
        .map(|c| c.logging.filter.clone())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
