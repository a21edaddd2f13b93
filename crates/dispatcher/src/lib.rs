//! Job dispatch over the executor registry: capability checks before any
//! executor exists, then prepare, start and wait with finish and cleanup on
//! every path.

pub mod demo;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod settings;

pub use dispatch::JobDispatcher;
pub use error::DispatchError;
pub use outcome::{JobOutcome, JobStatus};
pub use settings::DispatchSettings;
