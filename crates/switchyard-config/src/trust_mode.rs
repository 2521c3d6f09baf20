//! `PLUGIN_TRUST_MODE`'s closed vocabulary (§6 "Environment variables").

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Whether third-party plugins load at all, and how guarded that loading is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginTrustMode {
    /// Self-hosted, no restrictions on which plugins load.
    SelfHostOpen,
    /// Self-hosted, but plugins are sandboxed/vetted before loading.
    SelfHostGuarded,
    /// Hosted SaaS deployment: only first-party plugins load.
    SaasLocked,
}

impl Default for PluginTrustMode {
    fn default() -> Self {
        Self::SelfHostGuarded
    }
}

impl fmt::Display for PluginTrustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SelfHostOpen => "self_host_open",
            Self::SelfHostGuarded => "self_host_guarded",
            Self::SaasLocked => "saas_locked",
        })
    }
}

impl FromStr for PluginTrustMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self_host_open" => Ok(Self::SelfHostOpen),
            "self_host_guarded" => Ok(Self::SelfHostGuarded),
            "saas_locked" => Ok(Self::SaasLocked),
            other => Err(ConfigError::InvalidTrustMode {
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        for mode in [
            PluginTrustMode::SelfHostOpen,
            PluginTrustMode::SelfHostGuarded,
            PluginTrustMode::SaasLocked,
        ] {
            assert_eq!(mode.to_string().parse::<PluginTrustMode>().unwrap(), mode);
        }
    }

    #[test]
    fn rejects_unknown_value() {
        assert_eq!(
            "nonsense".parse::<PluginTrustMode>(),
            Err(ConfigError::InvalidTrustMode {
                value: "nonsense".to_string()
            })
        );
    }
}
