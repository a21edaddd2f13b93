//! Simple providers for demos and tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{Build, Config, RunnerConfig};
use crate::executor::{Executor, ExecutorProvider};
use crate::features::FeaturesInfo;
use crate::lifecycle::Phase;

/// Provider whose executors succeed at every phase and hold nothing.
#[derive(Debug, Clone, Default)]
pub struct NoopProvider {
    features: FeaturesInfo,
}

impl NoopProvider {
    pub fn with_features(features: FeaturesInfo) -> Self {
        Self { features }
    }
}

impl ExecutorProvider for NoopProvider {
    fn can_create(&self) -> bool {
        true
    }

    fn create(&self) -> Box<dyn Executor> {
        Box::new(NoopExecutor)
    }

    fn features(&self) -> FeaturesInfo {
        self.features
    }
}

pub struct NoopExecutor;

#[async_trait]
impl Executor for NoopExecutor {
    async fn prepare(
        &mut self,
        _global: &Config,
        _runner: &RunnerConfig,
        _build: &Build,
    ) -> Result<()> {
        Ok(())
    }
    async fn start(&mut self) -> Result<()> {
        Ok(())
    }
    async fn wait(&mut self) -> Result<()> {
        Ok(())
    }
    async fn finish(&mut self, _err: Option<&anyhow::Error>) {}
    async fn cleanup(&mut self) {}
}

/// Provider whose executors fail at a chosen phase and record every call.
///
/// `prepare` acquires one resource before deciding whether to fail, so a
/// failing prepare still leaves something for cleanup to release.
#[derive(Clone)]
pub struct ScriptedProvider {
    fail_at: Option<Phase>,
    available: bool,
    features: FeaturesInfo,
    calls: Arc<Mutex<Vec<Phase>>>,
    finish_errors: Arc<Mutex<Vec<Option<String>>>>,
    held: Arc<AtomicUsize>,
    created: Arc<AtomicUsize>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            fail_at: None,
            available: true,
            features: FeaturesInfo::default(),
            calls: Arc::new(Mutex::new(Vec::new())),
            finish_errors: Arc::new(Mutex::new(Vec::new())),
            held: Arc::new(AtomicUsize::new(0)),
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_at(phase: Phase) -> Self {
        Self { fail_at: Some(phase), ..Self::new() }
    }

    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    pub fn with_features(mut self, features: FeaturesInfo) -> Self {
        self.features = features;
        self
    }

    /// Phases executed so far, across every instance
    pub fn calls(&self) -> Vec<Phase> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Error messages passed to `finish`, `None` for a successful outcome
    pub fn finish_errors(&self) -> Vec<Option<String>> {
        self.finish_errors.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Resources acquired by prepare and not yet released by cleanup
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ExecutorProvider for ScriptedProvider {
    fn can_create(&self) -> bool {
        self.available
    }

    fn create(&self) -> Box<dyn Executor> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedExecutor {
            fail_at: self.fail_at,
            calls: self.calls.clone(),
            finish_errors: self.finish_errors.clone(),
            held: self.held.clone(),
            acquired: 0,
        })
    }

    fn features(&self) -> FeaturesInfo {
        self.features
    }
}

pub struct ScriptedExecutor {
    fail_at: Option<Phase>,
    calls: Arc<Mutex<Vec<Phase>>>,
    finish_errors: Arc<Mutex<Vec<Option<String>>>>,
    held: Arc<AtomicUsize>,
    acquired: usize,
}

impl ScriptedExecutor {
    fn record(&self, phase: Phase) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(phase);
        }
        if self.fail_at == Some(phase) {
            Err(anyhow!("scripted {} failure", phase))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn prepare(
        &mut self,
        _global: &Config,
        _runner: &RunnerConfig,
        _build: &Build,
    ) -> Result<()> {
        self.acquired += 1;
        self.held.fetch_add(1, Ordering::SeqCst);
        self.record(Phase::Prepare)
    }

    async fn start(&mut self) -> Result<()> {
        self.record(Phase::Start)
    }

    async fn wait(&mut self) -> Result<()> {
        self.record(Phase::Wait)
    }

    async fn finish(&mut self, err: Option<&anyhow::Error>) {
        let _ = self.record(Phase::Finish);
        if let Ok(mut errors) = self.finish_errors.lock() {
            errors.push(err.map(|e| e.to_string()));
        }
    }

    async fn cleanup(&mut self) {
        let _ = self.record(Phase::Cleanup);
        self.held.fetch_sub(self.acquired, Ordering::SeqCst);
        self.acquired = 0;
    }
}
