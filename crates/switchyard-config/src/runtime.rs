//! Core-relevant runtime configuration (§6 "Environment variables"),
//! read once at process start and handed to each component's constructor.

use std::collections::HashMap;

use chrono::Duration;
use switchyard_crashguard::CrashGuardConfig;
use switchyard_dispatcher::RunDispatcherConfig;
use switchyard_queue::SessionQueueConfig;

use crate::error::{ConfigError, ConfigResult};
use crate::trust_mode::PluginTrustMode;

/// `PLUGIN_TRUST_MODE`
pub const ENV_PLUGIN_TRUST_MODE: &str = "PLUGIN_TRUST_MODE";
/// `PLUGIN_CRASH_THRESHOLD`
pub const ENV_PLUGIN_CRASH_THRESHOLD: &str = "PLUGIN_CRASH_THRESHOLD";
/// `PLUGIN_CRASH_WINDOW_MS`
pub const ENV_PLUGIN_CRASH_WINDOW_MS: &str = "PLUGIN_CRASH_WINDOW_MS";
/// `HOOK_EVENT_BUDGET_MS`
pub const ENV_HOOK_EVENT_BUDGET_MS: &str = "HOOK_EVENT_BUDGET_MS";
/// `DISPATCH_LEASE_MS`
pub const ENV_DISPATCH_LEASE_MS: &str = "DISPATCH_LEASE_MS";
/// `DISPATCH_MAX_ATTEMPTS`
pub const ENV_DISPATCH_MAX_ATTEMPTS: &str = "DISPATCH_MAX_ATTEMPTS";
/// `DEBOUNCE_MS`
pub const ENV_DEBOUNCE_MS: &str = "DEBOUNCE_MS";
/// `MAX_QUEUED_PER_LANE`
pub const ENV_MAX_QUEUED_PER_LANE: &str = "MAX_QUEUED_PER_LANE";

const DEFAULT_PLUGIN_CRASH_THRESHOLD: usize = 5;
const DEFAULT_PLUGIN_CRASH_WINDOW_MS: i64 = 300_000;
const DEFAULT_HOOK_EVENT_BUDGET_MS: u64 = 8_000;
const DEFAULT_DISPATCH_LEASE_MS: i64 = 30_000;
const DEFAULT_DISPATCH_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_DEBOUNCE_MS: i64 = 300;
const DEFAULT_MAX_QUEUED_PER_LANE: i32 = 20;

/// The core-relevant environment variables, parsed and defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Whether third-party plugins load at all.
    pub plugin_trust_mode: PluginTrustMode,
    /// Hook failures within [`Self::plugin_crash_window_ms`] at or above this
    /// count auto-disable the plugin (§4.G).
    pub plugin_crash_threshold: usize,
    /// Width of the Crash Guard's sliding failure window, in milliseconds.
    pub plugin_crash_window_ms: i64,
    /// Wall-clock budget allotted to one hook dispatch (§4.F).
    pub hook_event_budget_ms: u64,
    /// Lease duration held by a dispatcher worker on a claimed run (§4.C).
    pub dispatch_lease_ms: i64,
    /// Attempts allowed before a dispatch is marked `failed` (§4.C).
    pub dispatch_max_attempts: u32,
    /// Debounce window for the Session Queue's coalescing buffer (§4.B).
    pub debounce_ms: i64,
    /// Cap on queued-but-not-yet-dispatched messages per lane (§4.B).
    pub max_queued_per_lane: i32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            plugin_trust_mode: PluginTrustMode::default(),
            plugin_crash_threshold: DEFAULT_PLUGIN_CRASH_THRESHOLD,
            plugin_crash_window_ms: DEFAULT_PLUGIN_CRASH_WINDOW_MS,
            hook_event_budget_ms: DEFAULT_HOOK_EVENT_BUDGET_MS,
            dispatch_lease_ms: DEFAULT_DISPATCH_LEASE_MS,
            dispatch_max_attempts: DEFAULT_DISPATCH_MAX_ATTEMPTS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_queued_per_lane: DEFAULT_MAX_QUEUED_PER_LANE,
        }
    }
}

impl RuntimeConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any set env var holds a value that doesn't
    /// parse against its expected type or vocabulary.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_map(&std::env::vars().collect())
    }

    /// Parse configuration out of an explicit key/value map, independent of
    /// the process environment. `from_env` is a thin wrapper over this so
    /// the parsing logic is unit-testable without mutating global state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any present key holds a value that doesn't
    /// parse against its expected type or vocabulary.
    pub fn from_map(vars: &HashMap<String, String>) -> ConfigResult<Self> {
        let defaults = Self::default();

        let plugin_trust_mode = match vars.get(ENV_PLUGIN_TRUST_MODE) {
            Some(raw) => raw.parse()?,
            None => defaults.plugin_trust_mode,
        };

        Ok(Self {
            plugin_trust_mode,
            plugin_crash_threshold: parse_or_default(
                vars,
                ENV_PLUGIN_CRASH_THRESHOLD,
                defaults.plugin_crash_threshold,
            )?,
            plugin_crash_window_ms: parse_or_default(
                vars,
                ENV_PLUGIN_CRASH_WINDOW_MS,
                defaults.plugin_crash_window_ms,
            )?,
            hook_event_budget_ms: parse_or_default(
                vars,
                ENV_HOOK_EVENT_BUDGET_MS,
                defaults.hook_event_budget_ms,
            )?,
            dispatch_lease_ms: parse_or_default(
                vars,
                ENV_DISPATCH_LEASE_MS,
                defaults.dispatch_lease_ms,
            )?,
            dispatch_max_attempts: parse_or_default(
                vars,
                ENV_DISPATCH_MAX_ATTEMPTS,
                defaults.dispatch_max_attempts,
            )?,
            debounce_ms: parse_or_default(vars, ENV_DEBOUNCE_MS, defaults.debounce_ms)?,
            max_queued_per_lane: parse_or_default(
                vars,
                ENV_MAX_QUEUED_PER_LANE,
                defaults.max_queued_per_lane,
            )?,
        })
    }

    /// Build the Crash Guard's sliding-window configuration from this config.
    #[must_use]
    pub fn crash_guard_config(&self) -> CrashGuardConfig {
        CrashGuardConfig::default()
            .with_threshold(self.plugin_crash_threshold)
            .with_window(Duration::milliseconds(self.plugin_crash_window_ms))
    }

    /// Build the Run Dispatcher's worker pool configuration from this config.
    #[must_use]
    pub fn run_dispatcher_config(&self) -> RunDispatcherConfig {
        RunDispatcherConfig::default()
            .with_lease_ms(self.dispatch_lease_ms)
            .with_max_attempts(self.dispatch_max_attempts)
    }

    /// Build the Session Queue's debounce/coalesce configuration from this
    /// config.
    #[must_use]
    pub fn session_queue_config(&self) -> SessionQueueConfig {
        SessionQueueConfig::default()
            .with_debounce_ms(self.debounce_ms)
            .with_max_queued(self.max_queued_per_lane)
    }
}

fn parse_or_default<T>(
    vars: &HashMap<String, String>,
    var: &'static str,
    default: T,
) -> ConfigResult<T>
where
    T: std::str::FromStr,
{
    match vars.get(var) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
            var,
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = RuntimeConfig::from_map(&HashMap::new()).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.plugin_crash_threshold, 5);
        assert_eq!(config.plugin_crash_window_ms, 300_000);
        assert_eq!(config.hook_event_budget_ms, 8_000);
        assert_eq!(config.dispatch_lease_ms, 30_000);
        assert_eq!(config.dispatch_max_attempts, 3);
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.max_queued_per_lane, 20);
    }

    #[test]
    fn overrides_are_applied() {
        let vars = map(&[
            (ENV_PLUGIN_TRUST_MODE, "saas_locked"),
            (ENV_PLUGIN_CRASH_THRESHOLD, "10"),
            (ENV_DEBOUNCE_MS, "500"),
        ]);
        let config = RuntimeConfig::from_map(&vars).unwrap();
        assert_eq!(config.plugin_trust_mode, PluginTrustMode::SaasLocked);
        assert_eq!(config.plugin_crash_threshold, 10);
        assert_eq!(config.debounce_ms, 500);
        // Untouched vars keep their defaults.
        assert_eq!(config.max_queued_per_lane, 20);
    }

    #[test]
    fn rejects_unparseable_number() {
        let vars = map(&[(ENV_DISPATCH_MAX_ATTEMPTS, "not-a-number")]);
        let err = RuntimeConfig::from_map(&vars).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: ENV_DISPATCH_MAX_ATTEMPTS,
                value: "not-a-number".to_string(),
            }
        );
    }

    #[test]
    fn rejects_unknown_trust_mode() {
        let vars = map(&[(ENV_PLUGIN_TRUST_MODE, "wide_open")]);
        assert!(RuntimeConfig::from_map(&vars).is_err());
    }
}
