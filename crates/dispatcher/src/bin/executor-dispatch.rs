use anyhow::Result;
use dispatcher::{demo, DispatchSettings, JobDispatcher};
use executor_core::{Build, Config, ExecutorRegistry, RunnerConfig};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "dispatcher=info,executor_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = DispatchSettings::from_env()?;
    let registry = ExecutorRegistry::global();
    demo::register_demo_executors(registry);

    info!("Registered executors: {}", registry.list_names().join(", "));
    info!("Available on this host: {}", registry.available().join(", "));

    // Executor names from args, or the configured default
    let mut names: Vec<String> = env::args().skip(1).collect();
    if names.is_empty() {
        names.push(settings.default_executor.clone());
    }

    let global = Config::default();
    let dispatcher = JobDispatcher::global(settings);
    for (i, name) in names.iter().enumerate() {
        let runner = RunnerConfig::new(format!("demo-runner-{}", i), name.as_str());
        let build = Build::new(i as u64 + 1, format!("demo-job-{}", i));

        match dispatcher.dispatch(&global, &runner, &build).await {
            Ok(outcome) => {
                let s = serde_json::to_string_pretty(&outcome).unwrap_or_default();
                println!("{}", s);
            }
            Err(e) => error!(runner = %runner.name, "Job rejected: {}", e),
        }
    }

    Ok(())
}
