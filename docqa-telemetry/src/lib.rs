//! Logging for docqa.
//!
//! Everything is written to stderr so stdout stays free for answers.
//! `RUST_LOG` overrides the configured level:
//!
//! ```bash
//! RUST_LOG=docqa_rag=debug docqa --file report.pdf
//! ```

use std::str::FromStr;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `docqa_rag=debug`.
    pub default_level: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { default_level: "info".to_string(), format: LogFormat::Text }
    }
}

/// The filter `init` would install: `RUST_LOG` if set and valid, the
/// configured directive otherwise.
pub fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Only the first call has any effect.
pub fn init(config: &TelemetryConfig) {
    INIT.call_once(|| {
        let filter = env_filter(config);
        let layer = match config.format {
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_filter(filter)
                .boxed(),
        };
        // Another subscriber may already be installed (e.g. by a test harness).
        let _ = tracing_subscriber::registry().with(layer).try_init();
    });
}
