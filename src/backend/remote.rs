//! Remote job backend adapter
//!
//! Hardware and cloud simulators are reached through an asynchronous
//! submit/poll/fetch protocol. [`RemoteBackend`] turns any [`JobService`]
//! into a blocking [`ExecutionBackend`]; the orchestrator's deadline bounds the
//! whole round trip. Credentials belong to the `JobService` implementation.

use super::{BackendError, ExecutionBackend, RemoteJobError, WireCounts};
use crate::normalize::RawCounts;
use crate::program::Program;
use std::thread;
use std::time::Duration;

/// State of a submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed(String),
}

/// Asynchronous job protocol of a remote execution service
pub trait JobService: Send + Sync {
    type Handle: Send;

    fn submit(&self, program: &Program, level: u8, shots: u64)
        -> Result<Self::Handle, RemoteJobError>;

    fn status(&self, handle: &Self::Handle) -> Result<JobStatus, RemoteJobError>;

    /// Terminal result, in the same shape as a local counts reply
    fn fetch(&self, handle: &Self::Handle) -> Result<WireCounts, RemoteJobError>;
}

/// Blocking [`ExecutionBackend`] over a [`JobService`]
pub struct RemoteBackend<S> {
    service: S,
    name: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl<S: JobService> RemoteBackend<S> {
    pub fn new(name: impl Into<String>, service: S) -> Self {
        RemoteBackend {
            service,
            name: name.into(),
            poll_interval: Duration::from_secs(2),
            max_polls: 900,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up (as a transient failure) after this many status checks
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }
}

impl<S: JobService> ExecutionBackend for RemoteBackend<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run_shots(&self, program: &Program, level: u8, shots: u64) -> Result<RawCounts, BackendError> {
        let handle = self.service.submit(program, level, shots)?;
        tracing::debug!(
            backend = %self.name,
            circuit = program.circuit_number,
            level,
            "submitted remote job"
        );

        for _ in 0..self.max_polls {
            match self.service.status(&handle)? {
                JobStatus::Done => {
                    return Ok(self.service.fetch(&handle)?.into_raw_counts());
                }
                JobStatus::Failed(reason) => {
                    return Err(RemoteJobError::Permanent(reason).into());
                }
                JobStatus::Queued | JobStatus::Running => thread::sleep(self.poll_interval),
            }
        }

        Err(RemoteJobError::Transient(format!(
            "job still pending after {} polls",
            self.max_polls
        ))
        .into())
    }
}
