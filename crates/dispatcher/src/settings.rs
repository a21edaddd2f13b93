use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Dispatcher behavior knobs, read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Executor used when a runner does not name one
    pub default_executor: String,

    /// Reject jobs needing features the executor lacks. When off, the mismatch is only logged.
    pub strict_features: bool,

    /// Deadline for `wait`. An exceeded deadline fails the job in the wait phase.
    pub wait_timeout: Option<Duration>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            default_executor: "shell".to_string(),
            strict_features: true,
            wait_timeout: None,
        }
    }
}

impl DispatchSettings {
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout.filter(|limit| !limit.is_zero())
    }

    /// Load from `EXECUTOR_DEFAULT`, `EXECUTOR_STRICT_FEATURES` and
    /// `EXECUTOR_WAIT_TIMEOUT_SECS`, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let default_executor = lookup("EXECUTOR_DEFAULT")
            .map(|v| v.trim().to_string())
            .unwrap_or(defaults.default_executor);
        let strict_features = match lookup("EXECUTOR_STRICT_FEATURES") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                anyhow!("EXECUTOR_STRICT_FEATURES must be a boolean, got {:?}", raw)
            })?,
            None => defaults.strict_features,
        };
        let wait_timeout = match lookup("EXECUTOR_WAIT_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    anyhow!(
                        "EXECUTOR_WAIT_TIMEOUT_SECS must be whole seconds, got {:?}: {}",
                        raw,
                        e
                    )
                })?;
                Some(Duration::from_secs(secs))
            }
            None => defaults.wait_timeout,
        };

        Ok(Self { default_executor, strict_features, wait_timeout })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<DispatchSettings> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        DispatchSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let settings = load(&[]).unwrap();
        assert_eq!(settings.default_executor, "shell");
        assert!(settings.strict_features);
        assert_eq!(settings.wait_timeout(), None);
    }

    #[test]
    fn reads_overrides() {
        let settings = load(&[
            ("EXECUTOR_DEFAULT", " docker "),
            ("EXECUTOR_STRICT_FEATURES", "off"),
            ("EXECUTOR_WAIT_TIMEOUT_SECS", "3600"),
        ])
        .unwrap();
        assert_eq!(settings.default_executor, "docker");
        assert!(!settings.strict_features);
        assert_eq!(settings.wait_timeout(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        let settings = load(&[("EXECUTOR_WAIT_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(settings.wait_timeout(), None);
    }

    #[test]
    fn rejects_garbage_values() {
        assert!(load(&[("EXECUTOR_STRICT_FEATURES", "maybe")]).is_err());
        assert!(load(&[("EXECUTOR_WAIT_TIMEOUT_SECS", "1h")]).is_err());
    }
}
