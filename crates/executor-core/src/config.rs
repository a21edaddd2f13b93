use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::features::FeaturesInfo;

/// Process-wide settings shared by every runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of jobs running at once across all runners
    pub concurrency: usize,
    pub check_interval_secs: u64,
    pub log_level: String,
    pub runners: Vec<RunnerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 1,
            check_interval_secs: 3,
            log_level: "info".to_string(),
            runners: Vec::new(),
        }
    }
}

/// Settings for a single runner. `executor` names the backend in the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub name: String,
    pub executor: String,
    pub builds_dir: Option<String>,
    pub cache_dir: Option<String>,
    pub shell: Option<String>,
    /// Extra `KEY=value` entries exported to every job
    pub environment: Vec<String>,
    /// Jobs this runner may run at once, 0 means unlimited
    pub limit: usize,
}

impl RunnerConfig {
    pub fn new(name: impl Into<String>, executor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executor: executor.into(),
            ..Default::default()
        }
    }
}

/// Per-job build specification handed to `Executor::prepare`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Build {
    pub id: u64,
    pub name: String,
    pub image: Option<String>,
    pub services: Vec<String>,
    pub variables: HashMap<String, String>,
    pub artifacts: Vec<String>,
    pub cache_paths: Vec<String>,
    pub interactive_session: bool,
    pub terminal: bool,
}

impl Build {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Capabilities an executor needs to run this build
    pub fn required_features(&self) -> FeaturesInfo {
        let image = self.image.as_deref().map_or(false, |i| !i.trim().is_empty());
        FeaturesInfo {
            variables: !self.variables.is_empty(),
            image,
            services: !self.services.is_empty(),
            artifacts: !self.artifacts.is_empty(),
            upload_multiple_artifacts: self.artifacts.len() > 1,
            cache: !self.cache_paths.is_empty(),
            session: self.interactive_session,
            terminal: self.terminal,
            shared: false,
        }
    }
}
