use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{Build, Config, RunnerConfig};
use crate::error::LifecycleError;
use crate::executor::Executor;
use crate::registry::ExecutorRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Prepare,
    Start,
    Wait,
    Finish,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Prepare => write!(f, "prepare"),
            Phase::Start => write!(f, "start"),
            Phase::Wait => write!(f, "wait"),
            Phase::Finish => write!(f, "finish"),
            Phase::Cleanup => write!(f, "cleanup"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Created,
    Prepared,
    Running,
    Completed,
    Failed(Phase),
    Finished,
    CleanedUp,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Created => write!(f, "Created"),
            LifecycleState::Prepared => write!(f, "Prepared"),
            LifecycleState::Running => write!(f, "Running"),
            LifecycleState::Completed => write!(f, "Completed"),
            LifecycleState::Failed(phase) => write!(f, "Failed in {}", phase),
            LifecycleState::Finished => write!(f, "Finished"),
            LifecycleState::CleanedUp => write!(f, "CleanedUp"),
        }
    }
}

impl LifecycleState {
    /// Whether `phase` may run from this state. Cleanup is always permitted.
    pub fn can_run(&self, phase: Phase) -> bool {
        match (self, phase) {
            (LifecycleState::Created, Phase::Prepare) => true,
            (LifecycleState::Prepared, Phase::Start) => true,
            (LifecycleState::Running, Phase::Wait) => true,
            (LifecycleState::Completed, Phase::Finish) => true,
            (LifecycleState::Failed(_), Phase::Finish) => true,
            (_, Phase::Cleanup) => true,
            _ => false,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LifecycleState::Failed(_))
    }
}

/// One executor instance bound to one job, with phase ordering enforced.
///
/// Out-of-order calls are rejected before they reach the backend. Cleanup may
/// be requested more than once; the backend only ever sees the first request.
/// Dropping an instance that was never cleaned up hands the backend to the
/// current tokio runtime for cleanup.
pub struct Lifecycle {
    id: Uuid,
    name: String,
    state: LifecycleState,
    in_flight: Option<Phase>,
    executor: Box<dyn Executor>,
}

impl Lifecycle {
    pub fn new(name: impl Into<String>, executor: Box<dyn Executor>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state: LifecycleState::Created,
            in_flight: None,
            executor,
        }
    }

    /// Create a fresh instance through the named provider
    pub fn from_registry(registry: &ExecutorRegistry, name: &str) -> Option<Self> {
        registry.create(name).map(|executor| Self::new(name, executor))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Phase whose backend call started but has not returned
    pub fn in_flight(&self) -> Option<Phase> {
        self.in_flight
    }

    /// Fail the phase in flight after its future panicked or was dropped.
    /// Returns `None` when no phase was running.
    pub fn interrupt(&mut self, error: anyhow::Error) -> Option<LifecycleError> {
        let phase = self.in_flight.take()?;
        warn!(executor = %self.name, instance = %self.id, %phase, "Executor phase interrupted");
        self.state = LifecycleState::Failed(phase);
        Some(LifecycleError::Failed { phase, error })
    }

    fn enter(&mut self, phase: Phase) -> Result<(), LifecycleError> {
        if !self.state.can_run(phase) {
            return Err(LifecycleError::InvalidTransition { from: self.state, phase });
        }
        debug!(executor = %self.name, instance = %self.id, %phase, "Executor phase");
        self.in_flight = Some(phase);
        Ok(())
    }

    fn settle(
        &mut self,
        phase: Phase,
        result: anyhow::Result<()>,
        next: LifecycleState,
    ) -> Result<(), LifecycleError> {
        self.in_flight = None;
        match result {
            Ok(()) => {
                self.state = next;
                Ok(())
            }
            Err(error) => {
                self.state = LifecycleState::Failed(phase);
                Err(LifecycleError::Failed { phase, error })
            }
        }
    }

    pub async fn prepare(
        &mut self,
        global: &Config,
        runner: &RunnerConfig,
        build: &Build,
    ) -> Result<(), LifecycleError> {
        self.enter(Phase::Prepare)?;
        let result = self.executor.prepare(global, runner, build).await;
        self.settle(Phase::Prepare, result, LifecycleState::Prepared)
    }

    pub async fn start(&mut self) -> Result<(), LifecycleError> {
        self.enter(Phase::Start)?;
        let result = self.executor.start().await;
        self.settle(Phase::Start, result, LifecycleState::Running)
    }

    pub async fn wait(&mut self) -> Result<(), LifecycleError> {
        self.enter(Phase::Wait)?;
        let result = self.executor.wait().await;
        self.settle(Phase::Wait, result, LifecycleState::Completed)
    }

    pub async fn finish(&mut self, err: Option<&anyhow::Error>) -> Result<(), LifecycleError> {
        self.enter(Phase::Finish)?;
        self.executor.finish(err).await;
        self.in_flight = None;
        self.state = LifecycleState::Finished;
        Ok(())
    }

    /// Release the backend. Marked done before the backend runs, so a panicking
    /// or cancelled cleanup is never retried.
    pub async fn cleanup(&mut self) {
        if self.state == LifecycleState::CleanedUp {
            debug!(executor = %self.name, instance = %self.id, "Cleanup already done");
            return;
        }
        debug!(
            executor = %self.name,
            instance = %self.id,
            from = %self.state,
            "Executor phase cleanup"
        );
        self.in_flight = None;
        self.state = LifecycleState::CleanedUp;
        self.executor.cleanup().await;
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if self.state == LifecycleState::CleanedUp {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(
                    executor = %self.name,
                    instance = %self.id,
                    state = %self.state,
                    "Executor dropped before cleanup, cleaning up in background"
                );
                let mut executor = std::mem::replace(&mut self.executor, Box::new(Released));
                handle.spawn(async move { executor.cleanup().await });
            }
            Err(_) => {
                warn!(
                    executor = %self.name,
                    instance = %self.id,
                    state = %self.state,
                    "Executor dropped without cleanup outside a runtime"
                );
            }
        }
    }
}

/// Stands in for a backend that was handed off for cleanup.
struct Released;

#[async_trait]
impl Executor for Released {
    async fn prepare(&mut self, _: &Config, _: &RunnerConfig, _: &Build) -> anyhow::Result<()> {
        Ok(())
    }
    async fn start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn wait(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn finish(&mut self, _err: Option<&anyhow::Error>) {}
    async fn cleanup(&mut self) {}
}
