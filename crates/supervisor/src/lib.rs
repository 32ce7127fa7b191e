//! Supervision of asynchronous scan jobs.
//!
//! Each admitted configuration runs on its own task with its own
//! cancellation token. Jobs report progress over a channel to a single
//! aggregator that owns the lifecycle bookkeeping, and one shutdown call
//! cancels every active job.

pub mod engine;
pub mod job;
pub mod supervisor;

pub use engine::{CommandEngine, JobContext, ScanEngine};
pub use job::{JobEvent, JobHandle, JobId, JobOutcome, JobState};
pub use supervisor::{JobSupervisor, ShutdownReport, SupervisorError, SupervisorOptions};
