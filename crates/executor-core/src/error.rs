use thiserror::Error;

use crate::lifecycle::{LifecycleState, Phase};

/// Registration failures. Both indicate a defective build, not a runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("executor name must not be empty")]
    EmptyName,

    #[error("executor already exists: {0}")]
    AlreadyRegistered(String),
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("cannot {phase} executor in state {from}")]
    InvalidTransition { from: LifecycleState, phase: Phase },

    /// The backend reported a failure for this phase
    #[error("{phase} failed: {error:#}")]
    Failed { phase: Phase, error: anyhow::Error },
}

impl LifecycleError {
    pub fn phase(&self) -> Phase {
        match self {
            LifecycleError::InvalidTransition { phase, .. } => *phase,
            LifecycleError::Failed { phase, .. } => *phase,
        }
    }

    /// Convert into the error handed to `Executor::finish`
    pub fn into_outcome(self) -> anyhow::Error {
        match self {
            LifecycleError::Failed { error, .. } => error,
            other => anyhow::Error::new(other),
        }
    }
}
