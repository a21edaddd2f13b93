use anyhow::Result;
use async_trait::async_trait;

use crate::config::{Build, Config, RunnerConfig};
use crate::features::FeaturesInfo;

/// Per-job backend driven through prepare, start, wait, finish and cleanup.
///
/// An instance is owned by one dispatcher for one job and is never reused.
/// `cleanup` is owed on every path, including a failed `prepare`.
#[async_trait]
pub trait Executor: Send {
    /// Validate configuration and acquire per-job resources without running the payload
    async fn prepare(
        &mut self,
        global: &Config,
        runner: &RunnerConfig,
        build: &Build,
    ) -> Result<()>;

    /// Launch the job payload; must not block until it completes
    async fn start(&mut self) -> Result<()>;

    /// Suspend until the payload completes. The result reflects the job itself.
    async fn wait(&mut self) -> Result<()>;

    /// Report the final outcome. Must not fail in a way that blocks cleanup.
    async fn finish(&mut self, err: Option<&anyhow::Error>);

    /// Release everything acquired since creation, whatever phase was reached
    async fn cleanup(&mut self);
}

/// Constructor and capability descriptor for one backend kind.
pub trait ExecutorProvider: Send + Sync {
    /// Host self-check, e.g. platform support or required binaries
    fn can_create(&self) -> bool;

    /// Fresh, independent instance. No job-specific work happens here.
    fn create(&self) -> Box<dyn Executor>;

    fn features(&self) -> FeaturesInfo;
}
