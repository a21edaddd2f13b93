//! Executor plugin registry and the lifecycle contract every backend implements.
//!
//! Backends register an [`ExecutorProvider`] under a unique name at startup.
//! Dispatchers look the provider up by the name found in runner configuration,
//! check its [`FeaturesInfo`], create a fresh [`Executor`] per job and drive it
//! through prepare, start, wait, finish and cleanup.

pub mod config;
pub mod error;
pub mod executor;
pub mod features;
pub mod lifecycle;
pub mod mocks;
pub mod registry;

pub use config::{Build, Config, RunnerConfig};
pub use error::{LifecycleError, RegistryError};
pub use executor::{Executor, ExecutorProvider};
pub use features::FeaturesInfo;
pub use lifecycle::{Lifecycle, LifecycleState, Phase};
pub use registry::{
    get_executor_features, get_executor_provider, get_executors, new_executor, register_executor,
    ExecutorRegistry,
};
