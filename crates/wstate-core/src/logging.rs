#![forbid(unsafe_code)]

//! Logging setup.
//!
//! The state layer emits structured events through `tracing` and never
//! installs a subscriber on its own. Applications that want the stock JSON
//! output enable the `tracing-json` feature and call [`init_json_logging`]
//! once at startup; everyone else installs their own subscriber.
//!
//! The filter is read from [`LOG_FILTER_ENV`] using `EnvFilter` directive
//! syntax (`WSTATE_LOG=wstate_runtime=debug`).

/// Environment variable holding the log filter directive.
pub const LOG_FILTER_ENV: &str = "WSTATE_LOG";

/// Filter used when [`LOG_FILTER_ENV`] is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[cfg(feature = "tracing-json")]
mod json {
    use std::fmt;

    use tracing_subscriber::EnvFilter;

    use super::{DEFAULT_LOG_FILTER, LOG_FILTER_ENV};

    /// A global subscriber was already installed.
    #[derive(Debug)]
    pub struct LoggingError(String);

    impl fmt::Display for LoggingError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "logging init failed: {}", self.0)
        }
    }

    impl std::error::Error for LoggingError {}

    /// Install a JSON `tracing` subscriber filtered by [`LOG_FILTER_ENV`].
    pub fn init_json_logging() -> Result<(), LoggingError> {
        let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| LoggingError(e.to_string()))?;
        tracing::debug!(env = LOG_FILTER_ENV, "json logging initialized");
        Ok(())
    }
}

#[cfg(feature = "tracing-json")]
pub use json::{LoggingError, init_json_logging};
