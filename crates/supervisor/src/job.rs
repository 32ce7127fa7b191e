//! Job identity and lifecycle types.

use scangate_common::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Starting -> Running -> {Completed, Terminated, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Starting,
    Running,
    Completed,
    Terminated,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Terminated | JobState::Failed
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Starting => "starting",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Terminated => "terminated",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a scan engine run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Terminated,
    Failed(String),
}

impl From<&JobOutcome> for JobState {
    fn from(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed => JobState::Completed,
            JobOutcome::Terminated => JobState::Terminated,
            JobOutcome::Failed(_) => JobState::Failed,
        }
    }
}

/// Snapshot of a job as tracked by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
    pub process_id: Option<u32>,
    pub started_at: Timestamp,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl JobHandle {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            process_id: None,
            started_at: Timestamp::now(),
            state: JobState::Starting,
            finished_at: None,
            detail: None,
        }
    }
}

/// Lifecycle notifications sent from job tasks to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Running {
        id: JobId,
        process_id: Option<u32>,
    },
    Finished {
        id: JobId,
        state: JobState,
        detail: Option<String>,
    },
}
