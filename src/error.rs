//! Error taxonomy for the triage engine
//!
//! `OracleError` covers everything the core itself can reject. Collaborator
//! failures arrive as [`crate::backend::BackendError`] and are converted into
//! verdicts by the orchestrator, never propagated past it.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the normalizer, comparator, artifact store and config layer
#[derive(Error, Debug)]
pub enum OracleError {
    /// An outcome label contained something other than bits
    #[error("Malformed outcome label {label:?}: {reason}")]
    MalformedLabel { label: String, reason: String },

    /// Reconstructed sample sizes disagree with the shot count the caller asked for
    #[error(
        "Sample size does not match number of shots: expected {expected}, got {left} and {right}"
    )]
    SampleSizeMismatch {
        expected: u64,
        left: u64,
        right: u64,
    },

    /// Counts for one outcome sum past what a shot total can hold
    #[error("Outcome counts overflow u64 at index {index}")]
    CountOverflow { index: u64 },

    /// Two-sample test requested over zero shots
    #[error("Cannot compare empty samples")]
    EmptySample,

    /// State vectors of different dimension
    #[error("State vector dimensions differ: {left} vs {right}")]
    StateDimensionMismatch { left: usize, right: usize },

    /// A bounded step did not finish before its deadline
    #[error("Execution exceeded deadline of {0:?}")]
    Timeout(Duration),

    /// Backend reported a diagnosable problem with the input program
    #[error("Backend diagnostic: {0}")]
    StructuredBackendError(String),

    /// Anything else that went wrong while executing a backend step
    #[error("Unexpected failure: {0}")]
    UnexpectedFailure(String),

    /// Source of an interesting case was never written to disk
    #[error("Artifact source not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// Job service failed on its side
    #[error("Remote job failed: {0}")]
    RemoteJobFailure(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OracleError {
    /// True for errors that mean the caller or backend broke an input contract
    ///
    /// These must never be read as "low divergence".
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            OracleError::MalformedLabel { .. }
                | OracleError::SampleSizeMismatch { .. }
                | OracleError::CountOverflow { .. }
                | OracleError::EmptySample
                | OracleError::StateDimensionMismatch { .. }
        )
    }
}

/// Result type for triage engine operations
pub type Result<T> = std::result::Result<T, OracleError>;
