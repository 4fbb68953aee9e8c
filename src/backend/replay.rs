//! Replay backend: serves previously recorded backend replies
//!
//! Recordings live in one JSON file per circuit, `circuit{N}.json`:
//!
//! ```json
//! {
//!   "counts": { "0": {"00": 500, "11": 500}, "1": {"00": 497, "11": 503} },
//!   "states": { "0": [[1.0, 0.0], [0.0, 0.0]] },
//!   "diagnostics": { "2": {"message": "unsupported gate"} }
//! }
//! ```
//!
//! Keys are levels. Re-triaging a recorded run needs no simulator.

use super::{BackendError, ExecutionBackend, WireCounts};
use crate::comparison::StateVector;
use crate::diagnostic::Diagnostic;
use crate::normalize::RawCounts;
use crate::program::{circuit_number_from_path, Program};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Recorded replies for one circuit, keyed by level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub counts: BTreeMap<u8, WireCounts>,

    #[serde(default)]
    pub states: BTreeMap<u8, StateVector>,

    #[serde(default)]
    pub diagnostics: BTreeMap<u8, Diagnostic>,
}

impl Recording {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read recording: {}", path.as_ref().display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse recording: {}", path.as_ref().display()))
    }
}

/// Backend answering from [`Recording`]s
#[derive(Debug, Clone, Default)]
pub struct ReplayBackend {
    recordings: HashMap<u64, Recording>,
}

impl ReplayBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, circuit_number: u64, recording: Recording) {
        self.recordings.insert(circuit_number, recording);
    }

    /// Load every `circuit{N}.json` in `dir`; other files are ignored
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut backend = Self::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read replay directory: {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(number) = circuit_number_from_path(&path) else {
                continue;
            };
            backend.insert(number, Recording::from_file(&path)?);
        }

        tracing::info!(
            recordings = backend.recordings.len(),
            dir = %dir.display(),
            "loaded replay recordings"
        );
        Ok(backend)
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    fn recording(&self, program: &Program) -> Result<&Recording, BackendError> {
        self.recordings.get(&program.circuit_number).ok_or_else(|| {
            BackendError::failed(
                format!("No recording for circuit {}", program.circuit_number),
                String::new(),
            )
        })
    }
}

impl ExecutionBackend for ReplayBackend {
    fn name(&self) -> &str {
        "replay"
    }

    fn run_shots(&self, program: &Program, level: u8, _shots: u64) -> Result<RawCounts, BackendError> {
        let recording = self.recording(program)?;
        if let Some(diagnostic) = recording.diagnostics.get(&level) {
            return Err(BackendError::Diagnostic(diagnostic.clone()));
        }
        recording
            .counts
            .get(&level)
            .cloned()
            .map(WireCounts::into_raw_counts)
            .ok_or_else(|| {
                BackendError::failed(
                    format!(
                        "No recorded counts for circuit {} level {}",
                        program.circuit_number, level
                    ),
                    String::new(),
                )
            })
    }

    fn run_state(&self, program: &Program, level: u8) -> Result<StateVector, BackendError> {
        let recording = self.recording(program)?;
        if let Some(diagnostic) = recording.diagnostics.get(&level) {
            return Err(BackendError::Diagnostic(diagnostic.clone()));
        }
        recording.states.get(&level).cloned().ok_or_else(|| {
            BackendError::failed(
                format!(
                    "No recorded state for circuit {} level {}",
                    program.circuit_number, level
                ),
                String::new(),
            )
        })
    }
}
