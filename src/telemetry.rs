//! Subscriber installation for embedders and tests.
//!
//! `RUST_LOG` wins when set; otherwise the filter from [`LogConfig`] is used.
//! Events go to stderr, either human-readable or as JSON lines.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::{LogConfig, LogFormat};

/// Install the global subscriber described by `config`.
///
/// Returns `false` if a subscriber was already installed; the existing one is
/// left in place.
pub fn init(config: &LogConfig) -> bool {
    let filter = env_filter(config);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .try_init(),
    };
    installed.is_ok()
}

fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        let config = LogConfig {
            format: LogFormat::Json,
            filter: "otsync=trace".to_owned(),
        };
        // Another test may already own the global subscriber.
        let _ = init(&config);
        assert!(!init(&config));
    }
}
