use chrono::{DateTime, Utc};
use executor_core::Phase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed { phase: Phase, message: String },
}

/// Result of one dispatched job. Cleanup has already run when this exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub build_id: u64,
    pub executor: String,
    pub instance_id: Uuid,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Success
    }

    pub fn failed_phase(&self) -> Option<Phase> {
        match &self.status {
            JobStatus::Success => None,
            JobStatus::Failed { phase, .. } => Some(*phase),
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
