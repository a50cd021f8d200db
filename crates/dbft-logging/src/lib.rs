//! Tracing setup shared by dBFT binaries and tests.
//!
//! The filter is taken from `DBFT_LOG`, then `RUST_LOG`, then the default
//! in [`LogConfig`].

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Filter used when neither `DBFT_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "dbft_consensus=info,dbft=info";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Fallback filter directive.
    pub default_filter: String,
    /// Colored output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Defaults, with `DBFT_LOG_ANSI=0|false` turning colors off.
    pub fn from_env() -> Self {
        let ansi = std::env::var("DBFT_LOG_ANSI")
            .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
            .unwrap_or(true);
        Self {
            ansi,
            ..Default::default()
        }
    }

    /// Set the fallback filter.
    #[must_use]
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    /// Resolve the effective filter.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env("DBFT_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn try_init(config: &LogConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(config.filter())
        .with(tracing_subscriber::fmt::layer().with_ansi(config.ansi))
        .try_init()
}

/// Install the global subscriber from the environment, ignoring a second call.
pub fn init() {
    if try_init(&LogConfig::from_env()).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Subscriber for tests: output goes through the test harness capture.
pub fn init_for_tests() {
    let config = LogConfig::default().with_default_filter("debug");
    let _ = tracing_subscriber::registry()
        .with(config.filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_ansi(false),
        )
        .try_init();
}
