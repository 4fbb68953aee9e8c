//! Deadline-bounded execution of backend steps
//!
//! Compilers under test can hang. Every backend call runs on a single worker
//! thread while the caller waits on a channel with a deadline.
//!
//! # Cancellation is best-effort
//!
//! On timeout the caller stops waiting, but the worker is not killed: Rust has
//! no safe way to preempt a thread, and the backend may be stuck in a child
//! process or FFI call. The worker keeps running until its task returns, and
//! its result is then discarded. Anything moved into the task must be safe to
//! abandon; do not hand it state the caller will keep mutating.

use crate::backend::BackendError;
use crate::diagnostic::Diagnostic;
use crate::error::OracleError;
use crossbeam::channel::{self, RecvTimeoutError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

/// Outcome of a bounded task
#[derive(Debug)]
pub enum BoundedOutcome<T> {
    /// Task finished in time
    Completed(T),

    /// Deadline expired; the task may still be running
    TimedOut { deadline: Duration },

    /// Backend reported a diagnosable input problem (already rendered to stderr)
    StructuredError(Diagnostic),

    /// Any other failure, with its full trace
    Unexpected {
        message: String,
        trace: String,
        /// Backend marked the failure as transient
        retryable: bool,
    },
}

impl<T> BoundedOutcome<T> {
    /// Failure the backend marked as transient
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BoundedOutcome::Unexpected {
                retryable: true,
                ..
            }
        )
    }

    /// Collapse into the crate error taxonomy
    pub fn into_result(self) -> crate::error::Result<T> {
        match self {
            BoundedOutcome::Completed(value) => Ok(value),
            BoundedOutcome::TimedOut { deadline } => Err(OracleError::Timeout(deadline)),
            BoundedOutcome::StructuredError(d) => {
                Err(OracleError::StructuredBackendError(d.to_string()))
            }
            BoundedOutcome::Unexpected {
                message,
                retryable: true,
                ..
            } => Err(OracleError::RemoteJobFailure(message)),
            BoundedOutcome::Unexpected { message, .. } => {
                Err(OracleError::UnexpectedFailure(message))
            }
        }
    }
}

type TaskResult<T> = std::thread::Result<Result<T, BackendError>>;

/// Run `task` on a worker thread and wait at most `deadline` for it
///
/// `label` names the worker thread (visible in panics and debuggers).
///
/// # Example
/// ```
/// use difftriage::bounded::{run_bounded, BoundedOutcome};
/// use std::time::Duration;
///
/// let outcome = run_bounded("demo", Duration::from_secs(5), || Ok(21 * 2));
/// assert!(matches!(outcome, BoundedOutcome::Completed(42)));
/// ```
pub fn run_bounded<T, F>(label: &str, deadline: Duration, task: F) -> BoundedOutcome<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
{
    let (tx, rx) = channel::bounded::<TaskResult<T>>(1);

    let spawned = thread::Builder::new()
        .name(format!("bounded-{}", label))
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task));
            // The caller may have stopped listening after a timeout
            let _ = tx.send(result);
        });

    if let Err(e) = spawned {
        return BoundedOutcome::Unexpected {
            message: format!("Failed to spawn bounded worker: {}", e),
            trace: String::new(),
            retryable: false,
        };
    }

    match rx.recv_timeout(deadline) {
        Ok(Ok(Ok(value))) => BoundedOutcome::Completed(value),
        Ok(Ok(Err(BackendError::Diagnostic(diagnostic)))) => {
            eprint!("{}", diagnostic.render());
            tracing::warn!(task = label, diagnostic = %diagnostic, "backend reported diagnostic");
            BoundedOutcome::StructuredError(diagnostic)
        }
        Ok(Ok(Err(err))) => {
            let trace = err.trace();
            tracing::error!(task = label, error = %err, "bounded task failed");
            tracing::debug!(task = label, %trace, "failure trace");
            BoundedOutcome::Unexpected {
                message: err.to_string(),
                retryable: err.is_transient(),
                trace,
            }
        }
        Ok(Err(payload)) => {
            let message = panic_message(payload);
            tracing::error!(task = label, panic = %message, "bounded task panicked");
            BoundedOutcome::Unexpected {
                message: format!("Task panicked: {}", message),
                trace: message,
                retryable: false,
            }
        }
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(task = label, ?deadline, "bounded task exceeded deadline");
            BoundedOutcome::TimedOut { deadline }
        }
        Err(RecvTimeoutError::Disconnected) => BoundedOutcome::Unexpected {
            message: "Bounded worker exited without reporting a result".to_string(),
            trace: String::new(),
            retryable: false,
        },
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic payload".to_string()
    }
}
