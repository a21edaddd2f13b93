use thiserror::Error;

/// Job configuration problems found before any executor is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("runner does not name an executor and no default is configured")]
    NoExecutorName,

    #[error("unknown executor {name:?}, registered executors: [{}]", .available.join(", "))]
    UnknownExecutor { name: String, available: Vec<String> },

    #[error("executor {0:?} cannot run on this host")]
    Unavailable(String),

    #[error("executor {name:?} does not support: {}", .missing.join(", "))]
    MissingFeatures { name: String, missing: Vec<&'static str> },
}
