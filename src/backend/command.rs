//! External command backend
//!
//! Runs a user-supplied runner script once per (program, level) and reads a
//! single JSON reply from its stdout:
//!
//! ```text
//! {"counts": {"00": 498, "11": 502}}
//! {"statevector": [[0.7071, 0.0], [0.0, 0.0], [0.0, 0.0], [0.7071, 0.0]]}
//! {"diagnostic": {"message": "...", "kind": "GuppyError", "line": 4, "column": 2}}
//! ```
//!
//! A non-zero exit without a diagnostic reply is an unexpected failure whose
//! trace is the runner's stderr.
//!
//! With a timeout set, a runner still alive at the deadline is killed and
//! reaped. Only the direct child is signalled, so runner scripts should
//! `exec` the long-running process rather than fork it.

use super::{BackendError, ExecutionBackend, WireCounts};
use crate::comparison::StateVector;
use crate::config::BackendConfig;
use crate::diagnostic::Diagnostic;
use crate::normalize::RawCounts;
use crate::program::Program;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One reply from a runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendReply {
    Counts(WireCounts),
    Statevector(StateVector),
    Diagnostic(Diagnostic),
}

/// Backend that shells out to an external runner
#[derive(Debug, Clone)]
pub struct CommandBackend {
    argv: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandBackend {
    /// Create from an argv template
    ///
    /// `{source}`, `{circuit}`, `{level}`, `{shots}` and `{mode}` are
    /// substituted in every argument.
    pub fn new(argv: Vec<String>) -> anyhow::Result<Self> {
        if argv.is_empty() {
            anyhow::bail!("Backend command must not be empty");
        }
        Ok(CommandBackend {
            argv,
            working_dir: None,
            timeout: None,
        })
    }

    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        let mut backend = Self::new(config.command.clone())?;
        backend.working_dir = config.working_dir.clone();
        Ok(backend)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill runners that are still alive after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn expand(&self, program: &Program, level: u8, shots: Option<u64>, mode: &str) -> Vec<String> {
        let source = program.source.display().to_string();
        let circuit = program.circuit_number.to_string();
        let level = level.to_string();
        let shots = shots.map(|s| s.to_string()).unwrap_or_default();
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{source}", &source)
                    .replace("{circuit}", &circuit)
                    .replace("{level}", &level)
                    .replace("{shots}", &shots)
                    .replace("{mode}", mode)
            })
            .collect()
    }

    fn invoke(&self, args: &[String]) -> Result<BackendReply, BackendError> {
        let mut cmd = Command::new(&args[0]);
        cmd.args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = ?args, "invoking backend runner");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn backend runner: {}", args[0]))?;

        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let status = match wait_with_deadline(&mut child, self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                terminate_and_reap(&mut child);
                let limit = self.timeout.unwrap_or_default();
                tracing::warn!(command = ?args, ?limit, "backend runner killed after timeout");
                // Readers are left behind: a grandchild may still hold the pipes
                return Err(BackendError::failed(
                    format!("Backend runner exceeded {:?} and was killed", limit),
                    String::new(),
                ));
            }
            Err(e) => {
                terminate_and_reap(&mut child);
                return Err(anyhow::Error::new(e)
                    .context("Failed waiting for backend runner")
                    .into());
            }
        };

        let stdout_bytes = stdout_reader.join().unwrap_or_default();
        let stderr_bytes = stderr_reader.join().unwrap_or_default();
        let stdout = String::from_utf8_lossy(&stdout_bytes);
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
        let reply = serde_json::from_str::<BackendReply>(stdout.trim());

        match (status.success(), reply) {
            (_, Ok(BackendReply::Diagnostic(d))) => Err(BackendError::Diagnostic(d)),
            (true, Ok(reply)) => Ok(reply),
            (true, Err(e)) => Err(BackendError::failed(
                format!("Backend runner produced an invalid reply: {}", e),
                format!("stdout:\n{}\nstderr:\n{}", stdout, stderr),
            )),
            (false, _) => Err(BackendError::failed(
                format!("Backend runner exited with {}", status),
                stderr,
            )),
        }
    }
}

/// Read a child pipe to EOF on its own thread so the child never blocks on a full pipe
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// `Ok(None)` when the child is still running at the deadline
fn wait_with_deadline(
    child: &mut Child,
    timeout: Option<Duration>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn terminate_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl ExecutionBackend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    fn run_shots(
        &self,
        program: &Program,
        level: u8,
        shots: u64,
    ) -> Result<RawCounts, BackendError> {
        let args = self.expand(program, level, Some(shots), "counts");
        match self.invoke(&args)? {
            BackendReply::Counts(counts) => Ok(counts.into_raw_counts()),
            other => Err(BackendError::failed(
                "Backend runner replied with a state vector to a counts request",
                format!("{:?}", other),
            )),
        }
    }

    fn run_state(&self, program: &Program, level: u8) -> Result<StateVector, BackendError> {
        let args = self.expand(program, level, None, "state");
        match self.invoke(&args)? {
            BackendReply::Statevector(state) => Ok(state),
            other => Err(BackendError::failed(
                "Backend runner replied with counts to a state request",
                format!("{:?}", other),
            )),
        }
    }
}
