//! Scan engines that carry out an admitted configuration.

use crate::job::{JobEvent, JobId, JobOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use scangate_scan_config::ScanRequestConfig;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Environment variable carrying the job id into engine processes.
pub const JOB_ID_ENV: &str = "SCANGATE_JOB_ID";

/// Per-job context handed to an engine.
#[derive(Debug, Clone)]
pub struct JobContext {
    id: JobId,
    events: UnboundedSender<JobEvent>,
}

impl JobContext {
    pub(crate) fn new(id: JobId, events: UnboundedSender<JobEvent>) -> Self {
        Self { id, events }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Report that the job has left `Starting`.
    pub fn mark_running(&self, process_id: Option<u32>) {
        // The aggregator is gone only once the supervisor itself is dropped.
        let _ = self.events.send(JobEvent::Running {
            id: self.id,
            process_id,
        });
    }
}

/// Trait for scan execution.
///
/// Implementations must return promptly once `cancel` fires.
#[async_trait]
pub trait ScanEngine: Send + Sync {
    async fn run(
        &self,
        job: &JobContext,
        config: &ScanRequestConfig,
        cancel: CancellationToken,
    ) -> Result<JobOutcome>;

    fn name(&self) -> &str;
}

/// Runs an external scanner process per job.
///
/// The configuration is written to the child's stdin as JSON. Cancellation
/// kills the child.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl ScanEngine for CommandEngine {
    async fn run(
        &self,
        job: &JobContext,
        config: &ScanRequestConfig,
        cancel: CancellationToken,
    ) -> Result<JobOutcome> {
        let payload = serde_json::to_vec(config).context("Failed to encode scan configuration")?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(JOB_ID_ENV, job.id().to_string())
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start scan engine {}", self.program.display()))?;

        let process_id = child.id();
        debug!(job_id = %job.id(), pid = ?process_id, "Scan engine started");
        job.mark_running(process_id);

        if let Some(mut stdin) = child.stdin.take() {
            let job_id = job.id();
            tokio::spawn(async move {
                if let Err(err) = stdin.write_all(&payload).await {
                    debug!(job_id = %job_id, error = %err, "Scan engine closed stdin early");
                }
            });
        }

        tokio::select! {
            status = child.wait() => {
                let status = status.context("Failed to wait for scan engine")?;
                if status.success() {
                    Ok(JobOutcome::Completed)
                } else {
                    Ok(JobOutcome::Failed(format!("scan engine exited with {}", status)))
                }
            }
            _ = cancel.cancelled() => {
                if let Err(err) = child.start_kill() {
                    warn!(job_id = %job.id(), error = %err, "Failed to kill scan engine");
                }
                let _ = child.wait().await;
                Ok(JobOutcome::Terminated)
            }
        }
    }

    fn name(&self) -> &str {
        "command"
    }
}
