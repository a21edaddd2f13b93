use anyhow::anyhow;
use chrono::Utc;
use executor_core::{
    Build, Config, ExecutorProvider, ExecutorRegistry, Lifecycle, LifecycleError, Phase,
    RunnerConfig,
};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::outcome::{JobOutcome, JobStatus};
use crate::settings::DispatchSettings;

/// Resolves the executor for a job, validates it, and drives it to cleanup.
pub struct JobDispatcher<'a> {
    registry: &'a ExecutorRegistry,
    settings: DispatchSettings,
}

impl JobDispatcher<'static> {
    /// Dispatcher over the process-wide registry
    pub fn global(settings: DispatchSettings) -> Self {
        Self::new(ExecutorRegistry::global(), settings)
    }
}

impl<'a> JobDispatcher<'a> {
    pub fn new(registry: &'a ExecutorRegistry, settings: DispatchSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    fn executor_name<'r>(&'r self, runner: &'r RunnerConfig) -> Result<&'r str, DispatchError> {
        let name = match runner.executor.trim() {
            "" => self.settings.default_executor.trim(),
            named => named,
        };
        if name.is_empty() {
            return Err(DispatchError::NoExecutorName);
        }
        Ok(name)
    }

    /// Capability check. Returns the resolved executor name and its provider;
    /// nothing is created when this fails.
    pub fn check(
        &self,
        runner: &RunnerConfig,
        build: &Build,
    ) -> Result<(String, Arc<dyn ExecutorProvider>), DispatchError> {
        let name = self.executor_name(runner)?;
        let provider = self.registry.lookup(name).ok_or_else(|| DispatchError::UnknownExecutor {
            name: name.to_string(),
            available: self.registry.list_names(),
        })?;

        if !provider.can_create() {
            return Err(DispatchError::Unavailable(name.to_string()));
        }

        let missing = provider.features().missing(&build.required_features());
        if !missing.is_empty() {
            if self.settings.strict_features {
                return Err(DispatchError::MissingFeatures { name: name.to_string(), missing });
            }
            warn!(
                executor = name,
                build = build.id,
                ?missing,
                "Executor lacks features the job uses"
            );
        }

        Ok((name.to_string(), provider))
    }

    /// Run one job. Phase failures, panics and an exceeded wait deadline become
    /// the job's outcome; only configuration errors are returned as `Err`.
    pub async fn dispatch(
        &self,
        global: &Config,
        runner: &RunnerConfig,
        build: &Build,
    ) -> Result<JobOutcome, DispatchError> {
        let (name, provider) = self.check(runner, build)?;
        let mut lifecycle = Lifecycle::new(name.as_str(), provider.create());
        let started_at = Utc::now();
        info!(
            executor = %name,
            instance = %lifecycle.id(),
            build = build.id,
            runner = %runner.name,
            "Dispatching job"
        );

        let wait_timeout = self.settings.wait_timeout();
        let driven = AssertUnwindSafe(drive(&mut lifecycle, global, runner, build, wait_timeout))
            .catch_unwind()
            .await;
        let result = match driven {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(executor = %name, build = build.id, %message, "Executor panicked");
                let from = lifecycle.state();
                Err(lifecycle
                    .interrupt(anyhow!("executor panicked: {}", message))
                    .unwrap_or(LifecycleError::InvalidTransition { from, phase: Phase::Finish }))
            }
        };

        let failure = match result {
            Ok(()) => None,
            Err(e) => {
                let phase = e.phase();
                warn!(executor = %name, build = build.id, %phase, error = %e, "Job failed");
                Some((phase, e.into_outcome()))
            }
        };

        let finished = AssertUnwindSafe(lifecycle.finish(failure.as_ref().map(|(_, err)| err)))
            .catch_unwind()
            .await;
        match finished {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(executor = %name, build = build.id, error = %e, "Finish skipped"),
            Err(panic) => error!(
                executor = %name,
                build = build.id,
                message = %panic_message(panic.as_ref()),
                "Executor panicked in finish"
            ),
        }
        lifecycle.cleanup().await;
        debug!(executor = %name, build = build.id, "Executor cleaned up");

        let status = match failure {
            None => JobStatus::Success,
            Some((phase, err)) => JobStatus::Failed { phase, message: format!("{:#}", err) },
        };
        let outcome = JobOutcome {
            build_id: build.id,
            executor: name,
            instance_id: lifecycle.id(),
            status,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            executor = %outcome.executor,
            build = build.id,
            success = outcome.succeeded(),
            "Job finished"
        );
        Ok(outcome)
    }
}

async fn drive(
    lifecycle: &mut Lifecycle,
    global: &Config,
    runner: &RunnerConfig,
    build: &Build,
    wait_timeout: Option<Duration>,
) -> Result<(), LifecycleError> {
    lifecycle.prepare(global, runner, build).await?;
    lifecycle.start().await?;

    let Some(limit) = wait_timeout else {
        return lifecycle.wait().await;
    };
    match tokio::time::timeout(limit, lifecycle.wait()).await {
        Ok(result) => result,
        Err(_) => {
            let error = anyhow!("job exceeded wait timeout of {}s", limit.as_secs_f64());
            let from = lifecycle.state();
            Err(lifecycle
                .interrupt(error)
                .unwrap_or(LifecycleError::InvalidTransition { from, phase: Phase::Wait }))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor_core::mocks::{NoopProvider, ScriptedProvider};
    use executor_core::FeaturesInfo;

    fn registry_with(names: &[&str]) -> ExecutorRegistry {
        let registry = ExecutorRegistry::new();
        for name in names {
            registry.register(name, NoopProvider::default()).unwrap();
        }
        registry
    }

    #[test]
    fn empty_runner_executor_falls_back_to_default() {
        let registry = registry_with(&["shell"]);
        let dispatcher = JobDispatcher::new(&registry, DispatchSettings::default());

        let (name, _) = dispatcher
            .check(&RunnerConfig::new("r", ""), &Build::new(1, "b"))
            .unwrap();
        assert_eq!(name, "shell");
    }

    #[test]
    fn executor_names_are_trimmed() {
        let registry = registry_with(&["shell", "docker"]);
        let settings =
            DispatchSettings { default_executor: " shell ".into(), ..Default::default() };
        let dispatcher = JobDispatcher::new(&registry, settings);

        let (name, _) = dispatcher
            .check(&RunnerConfig::new("r", " docker "), &Build::new(1, "b"))
            .unwrap();
        assert_eq!(name, "docker");

        let (name, _) = dispatcher
            .check(&RunnerConfig::new("r", "  "), &Build::new(1, "b"))
            .unwrap();
        assert_eq!(name, "shell");
    }

    #[test]
    fn no_name_and_no_default_is_a_config_error() {
        let registry = ExecutorRegistry::new();
        let settings = DispatchSettings { default_executor: String::new(), ..Default::default() };
        let dispatcher = JobDispatcher::new(&registry, settings);

        let err = dispatcher
            .check(&RunnerConfig::new("r", " "), &Build::new(1, "b"))
            .err()
            .expect("config error");
        assert_eq!(err, DispatchError::NoExecutorName);
    }

    #[test]
    fn unknown_executor_message_lists_registered_names() {
        let registry = registry_with(&["shell", "docker"]);
        let dispatcher = JobDispatcher::new(&registry, DispatchSettings::default());

        let err = dispatcher
            .check(&RunnerConfig::new("r", "dokcer"), &Build::new(1, "b"))
            .err()
            .expect("config error");
        assert_eq!(
            err.to_string(),
            "unknown executor \"dokcer\", registered executors: [docker, shell]"
        );
    }

    #[test]
    fn lenient_mode_accepts_feature_mismatch() {
        let registry = ExecutorRegistry::new();
        let provider = ScriptedProvider::new().with_features(FeaturesInfo::default());
        registry.register("shell", provider.clone()).unwrap();
        let settings = DispatchSettings { strict_features: false, ..Default::default() };
        let dispatcher = JobDispatcher::new(&registry, settings);

        let mut build = Build::new(3, "needs-image");
        build.image = Some("alpine".into());
        assert!(dispatcher.check(&RunnerConfig::new("r", "shell"), &build).is_ok());
        assert_eq!(provider.created(), 0);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(s.as_ref()), "boom");
        assert_eq!(panic_message(owned.as_ref()), "owned boom");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
