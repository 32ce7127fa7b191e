//! Job registry, reaping and shutdown.

use crate::engine::{JobContext, ScanEngine};
use crate::job::{JobEvent, JobHandle, JobId, JobOutcome, JobState};
use scangate_common::Timestamp;
use scangate_scan_config::ScanRequestConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors returned by [`JobSupervisor`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("supervisor is shutting down")]
    ShuttingDown,
}

/// Tuning knobs for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Period of the reaper sweep and of shutdown polling.
    pub reap_interval: Duration,
    /// How many polls shutdown waits before aborting stragglers.
    pub shutdown_polls: u32,
    /// Number of finished jobs kept for inspection.
    pub history_limit: usize,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            reap_interval: Duration::from_millis(300),
            shutdown_polls: 20,
            history_limit: 256,
        }
    }
}

/// Summary of a shutdown run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Jobs active when shutdown began.
    pub signalled: usize,
    /// Jobs that ignored cancellation and were aborted.
    pub forced: usize,
}

struct ActiveJob {
    handle: JobHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    active: HashMap<JobId, ActiveJob>,
    finished: VecDeque<JobHandle>,
}

struct Inner {
    engine: Arc<dyn ScanEngine>,
    options: SupervisorOptions,
    registry: Mutex<Registry>,
    events: UnboundedSender<JobEvent>,
    root: CancellationToken,
    reaper_stop: CancellationToken,
    accepting: AtomicBool,
}

/// Starts scan jobs and tracks them until they are reaped.
///
/// Cloning is cheap; all clones share one registry.
#[derive(Clone)]
pub struct JobSupervisor {
    inner: Arc<Inner>,
}

impl JobSupervisor {
    /// Create a supervisor and spawn its reaper. Must be called inside a
    /// tokio runtime.
    pub fn start(engine: Arc<dyn ScanEngine>, options: SupervisorOptions) -> Self {
        let (events, receiver) = mpsc::unbounded_channel();
        let reaper_stop = CancellationToken::new();
        let interval = options.reap_interval;

        let inner = Arc::new(Inner {
            engine,
            options,
            registry: Mutex::new(Registry::default()),
            events,
            root: CancellationToken::new(),
            reaper_stop: reaper_stop.clone(),
            accepting: AtomicBool::new(true),
        });

        tokio::spawn(reap_loop(
            Arc::downgrade(&inner),
            receiver,
            interval,
            reaper_stop,
        ));

        info!(
            engine = inner.engine.name(),
            reap_interval_ms = interval.as_millis() as u64,
            "Job supervisor started"
        );
        Self { inner }
    }

    /// Launch a job for an already validated configuration.
    pub fn submit(&self, config: ScanRequestConfig) -> Result<JobHandle, SupervisorError> {
        if !self.is_accepting() {
            return Err(SupervisorError::ShuttingDown);
        }

        let id = JobId::new();
        let handle = JobHandle::new(id);
        let cancel = self.inner.root.child_token();
        let ctx = JobContext::new(id, self.inner.events.clone());
        let targets = config.targets().to_string();

        // Insert under the lock so the aggregator never sees events for an
        // unregistered job.
        let mut registry = self.inner.lock();
        let task = tokio::spawn(run_job(
            self.inner.engine.clone(),
            ctx,
            config,
            cancel.clone(),
            self.inner.events.clone(),
        ));
        registry.active.insert(
            id,
            ActiveJob {
                handle: handle.clone(),
                cancel,
                task,
            },
        );
        drop(registry);

        info!(job_id = %id, targets = %targets, "Scan job submitted");
        Ok(handle)
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    /// Snapshot of active jobs, oldest first.
    pub fn active_jobs(&self) -> Vec<JobHandle> {
        let mut jobs: Vec<JobHandle> = self
            .inner
            .lock()
            .active
            .values()
            .map(|job| job.handle.clone())
            .collect();
        jobs.sort_by_key(|job| job.started_at);
        jobs
    }

    /// Recently reaped jobs, oldest first.
    pub fn finished_jobs(&self) -> Vec<JobHandle> {
        self.inner.lock().finished.iter().cloned().collect()
    }

    pub fn job(&self, id: JobId) -> Option<JobHandle> {
        let registry = self.inner.lock();
        registry
            .active
            .get(&id)
            .map(|job| job.handle.clone())
            .or_else(|| registry.finished.iter().find(|job| job.id == id).cloned())
    }

    /// Cancel one active job. Returns false if it is not active.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.inner.lock().active.get(&id) {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop accepting work, cancel every active job and wait for them to
    /// be reaped. Jobs still running after the poll budget are aborted.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.inner.accepting.store(false, Ordering::SeqCst);

        let signalled = {
            let registry = self.inner.lock();
            for job in registry.active.values() {
                job.cancel.cancel();
            }
            registry.active.len()
        };
        self.inner.root.cancel();
        info!(active = signalled, "Terminating active scan jobs");

        let mut polls = 0;
        while self.active_count() > 0 && polls < self.inner.options.shutdown_polls {
            tokio::time::sleep(self.inner.options.reap_interval).await;
            polls += 1;
        }

        let forced = self.inner.force_remaining();
        if forced > 0 {
            warn!(forced, "Aborted scan jobs that ignored termination");
        }

        self.inner.reaper_stop.cancel();
        info!(signalled, forced, "Job supervisor stopped");
        ShutdownReport { signalled, forced }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn apply(&self, event: JobEvent) {
        let mut registry = self.lock();
        match event {
            JobEvent::Running { id, process_id } => {
                if let Some(job) = registry.active.get_mut(&id) {
                    if job.handle.state == JobState::Starting {
                        job.handle.state = JobState::Running;
                        job.handle.process_id = process_id;
                        debug!(job_id = %id, pid = ?process_id, "Scan job running");
                    }
                }
            }
            JobEvent::Finished { id, state, detail } => {
                if let Some(job) = registry.active.remove(&id) {
                    match (&state, &detail) {
                        (JobState::Failed, Some(reason)) => {
                            warn!(job_id = %id, reason = %reason, "Scan job failed")
                        }
                        _ => info!(job_id = %id, state = %state, "Scan job finished"),
                    }
                    self.retire(&mut registry, job.handle, state, detail);
                }
            }
        }
    }

    /// Reap tasks that ended without reporting, e.g. after a panic.
    fn sweep(&self) {
        let mut registry = self.lock();
        let ended: Vec<JobId> = registry
            .active
            .iter()
            .filter(|(_, job)| job.task.is_finished())
            .map(|(id, _)| *id)
            .collect();

        for id in ended {
            if let Some(job) = registry.active.remove(&id) {
                warn!(job_id = %id, "Scan job ended without reporting");
                self.retire(
                    &mut registry,
                    job.handle,
                    JobState::Failed,
                    Some("job task ended unexpectedly".to_string()),
                );
            }
        }
    }

    fn force_remaining(&self) -> usize {
        let mut registry = self.lock();
        let remaining: Vec<ActiveJob> = registry.active.drain().map(|(_, job)| job).collect();
        let forced = remaining.len();
        for job in remaining {
            job.task.abort();
            self.retire(
                &mut registry,
                job.handle,
                JobState::Terminated,
                Some("aborted after shutdown timeout".to_string()),
            );
        }
        forced
    }

    fn retire(
        &self,
        registry: &mut Registry,
        mut handle: JobHandle,
        state: JobState,
        detail: Option<String>,
    ) {
        handle.state = state;
        handle.detail = detail;
        handle.finished_at = Some(Timestamp::now());
        registry.finished.push_back(handle);
        while registry.finished.len() > self.options.history_limit {
            registry.finished.pop_front();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.root.cancel();
        self.reaper_stop.cancel();
    }
}

async fn run_job(
    engine: Arc<dyn ScanEngine>,
    ctx: JobContext,
    config: ScanRequestConfig,
    cancel: CancellationToken,
    events: UnboundedSender<JobEvent>,
) {
    let id = ctx.id();
    let (state, detail) = match engine.run(&ctx, &config, cancel.clone()).await {
        Ok(JobOutcome::Failed(reason)) => (JobState::Failed, Some(reason)),
        Ok(outcome) => (JobState::from(&outcome), None),
        Err(_) if cancel.is_cancelled() => (JobState::Terminated, None),
        Err(err) => (JobState::Failed, Some(format!("{:#}", err))),
    };
    let _ = events.send(JobEvent::Finished { id, state, detail });
}

async fn reap_loop(
    inner: Weak<Inner>,
    mut events: UnboundedReceiver<JobEvent>,
    interval: Duration,
    stop: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            event = events.recv() => {
                let (Some(event), Some(inner)) = (event, inner.upgrade()) else {
                    break;
                };
                inner.apply(event);
            }
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                while let Ok(event) = events.try_recv() {
                    inner.apply(event);
                }
                inner.sweep();
            }
        }
    }
    debug!("Job reaper stopped");
}
