//! Manager configuration.
//!
//! Defaults suit an interactive client. Every knob can be overridden from the
//! environment with [`ManagerConfig::from_env`]:
//!
//! | Variable | Field | Format |
//! |----------|-------|--------|
//! | `WSTATE_MAX_BATCH_AGE_MS` | `scheduler.max_batch_age_ms` | integer ms |
//! | `WSTATE_PRUNE_ON_REFRESH` | `prune_on_refresh` | `1/0/true/false/on/off` |
//! | `WSTATE_DECISION_LOG` | `scheduler.enable_logging` | same as above |
//!
//! Unset or unparsable variables leave the default in place.

use std::env;

use crate::rerun_scheduler::SchedulerConfig;

pub const ENV_MAX_BATCH_AGE_MS: &str = "WSTATE_MAX_BATCH_AGE_MS";
pub const ENV_PRUNE_ON_REFRESH: &str = "WSTATE_PRUNE_ON_REFRESH";
pub const ENV_DECISION_LOG: &str = "WSTATE_DECISION_LOG";

/// Configuration for [`WidgetStateManager`](crate::state_manager::WidgetStateManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    pub scheduler: SchedulerConfig,

    /// Drop state for widgets missing from a full spec refresh.
    pub prune_on_refresh: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            prune_on_refresh: true,
        }
    }
}

impl ManagerConfig {
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn with_prune_on_refresh(mut self, prune: bool) -> Self {
        self.prune_on_refresh = prune;
        self
    }

    /// Defaults overridden by the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps a variable name to its
    /// value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_BATCH_AGE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.scheduler.max_batch_age_ms = ms,
                Err(_) => tracing::warn!(var = ENV_MAX_BATCH_AGE_MS, value = %raw, "ignoring invalid value"),
            }
        }
        if let Some(raw) = lookup(ENV_PRUNE_ON_REFRESH) {
            match parse_flag(&raw) {
                Some(flag) => config.prune_on_refresh = flag,
                None => tracing::warn!(var = ENV_PRUNE_ON_REFRESH, value = %raw, "ignoring invalid value"),
            }
        }
        if let Some(raw) = lookup(ENV_DECISION_LOG) {
            match parse_flag(&raw) {
                Some(flag) => config.scheduler.enable_logging = flag,
                None => tracing::warn!(var = ENV_DECISION_LOG, value = %raw, "ignoring invalid value"),
            }
        }

        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
