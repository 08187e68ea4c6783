//! Logging bootstrap.

use crate::tracing_layer::{SessionEventLayer, SessionLogEvent};
use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "medicheck=info,medicheck_application=info,medicheck_interaction=info";
const VERBOSE_LOG_FILTER: &str =
    "medicheck=debug,medicheck_application=debug,medicheck_interaction=debug,medicheck_infrastructure=debug";

/// Logging configuration shared by MediCheck binaries.
#[derive(Default)]
pub struct LogConfig {
    /// Widen the default filter to `debug`
    pub verbose: bool,
    /// Emit JSON lines on stderr instead of human-readable text
    pub json: bool,
    /// Also forward every event to this channel
    pub events: Option<mpsc::UnboundedSender<SessionLogEvent>>,
}

/// The filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}

/// Installs the global subscriber: stderr output filtered by `RUST_LOG`
/// (or the default filter), plus the event feed when configured.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(config.verbose)))
    };

    let stderr = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter())
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter())
            .boxed()
    };

    let feed = config
        .events
        .map(|sender| SessionEventLayer::new(sender).with_filter(filter()));

    tracing_subscriber::registry()
        .with(stderr)
        .with(feed)
        .try_init()
        .context("Failed to install tracing subscriber")
}
