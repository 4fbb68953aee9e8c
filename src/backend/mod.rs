//! Execution backends
//!
//! The orchestrator depends only on the [`ExecutionBackend`] capability.
//! Concrete simulators, compilers and job services live outside this crate and
//! are reached through one of the adapters here:
//!
//! - [`CommandBackend`]: spawns an external runner and reads a JSON reply
//! - [`ReplayBackend`]: serves replies recorded earlier, keyed by circuit number
//! - [`SamplingBackend`]: samples shots from known final states (tests, benches)
//! - [`RemoteBackend`]: submit/poll/fetch over a [`JobService`]

mod command;
mod remote;
mod replay;
mod sampling;

pub use command::{BackendReply, CommandBackend};
pub use remote::{JobService, JobStatus, RemoteBackend};
pub use replay::{Recording, ReplayBackend};
pub use sampling::SamplingBackend;

use crate::comparison::StateVector;
use crate::diagnostic::Diagnostic;
use crate::normalize::{RawCounts, RawLabel};
use crate::program::Program;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure reported by a job service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteJobError {
    /// Worth retrying later (network blip, queue full)
    #[error("transient: {0}")]
    Transient(String),

    /// Retrying will not help (job rejected, credentials refused)
    #[error("permanent: {0}")]
    Permanent(String),
}

/// Failure of one backend call
#[derive(Error, Debug)]
pub enum BackendError {
    /// Backend classified the problem as a diagnosable input error
    #[error("{0}")]
    Diagnostic(Diagnostic),

    #[error("Backend {backend} does not support {operation}")]
    Unsupported {
        backend: String,
        operation: &'static str,
    },

    #[error("Remote job failed ({0})")]
    Remote(#[from] RemoteJobError),

    /// Failure with a captured trace (e.g. a child process's stderr)
    #[error("{message}")]
    Failed { message: String, trace: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BackendError {
    pub fn failed(message: impl Into<String>, trace: impl Into<String>) -> Self {
        BackendError::Failed {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Full failure trace for logging
    pub fn trace(&self) -> String {
        match self {
            BackendError::Diagnostic(d) => d.render(),
            BackendError::Failed { trace, .. } => trace.clone(),
            BackendError::Other(e) => format!("{:?}", e),
            other => other.to_string(),
        }
    }

    /// Whether a caller may reasonably retry the same call
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Remote(RemoteJobError::Transient(_)))
    }
}

/// Counts as they appear on the wire
///
/// Either a JSON object keyed by bit string (`{"0 1": 500}`) or a list of
/// `[bits, count]` pairs (`[[[0, 1], 500]]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireCounts {
    Map(BTreeMap<String, u64>),
    Pairs(Vec<(RawLabel, u64)>),
}

impl WireCounts {
    pub fn into_raw_counts(self) -> RawCounts {
        match self {
            WireCounts::Map(map) => map
                .into_iter()
                .map(|(label, count)| (RawLabel::Text(label), count))
                .collect(),
            WireCounts::Pairs(pairs) => pairs,
        }
    }
}

/// Capability every execution backend provides
///
/// `run_shots` must report exactly `shots` occurrences in total; the
/// comparator rejects anything else as a contract violation.
pub trait ExecutionBackend: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    /// Compile `program` at `level` and sample `shots` outcomes
    fn run_shots(&self, program: &Program, level: u8, shots: u64)
        -> Result<RawCounts, BackendError>;

    /// Compile `program` at `level` and return its exact final state
    fn run_state(&self, program: &Program, level: u8) -> Result<StateVector, BackendError> {
        let _ = (program, level);
        Err(BackendError::Unsupported {
            backend: self.name().to_string(),
            operation: "run_state",
        })
    }
}
