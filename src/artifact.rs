//! Artifact persistence for interesting cases
//!
//! Layout under the configured output directory:
//!
//! ```text
//! outputs/
//! ├── circuit{N}/
//! │   ├── output{N}_uncompiled.json   rendered baseline distribution
//! │   ├── output{N}_uncompiled.txt
//! │   ├── output{N}_{level}.json      rendered per-level distribution
//! │   └── output{N}_{level}.txt
//! └── interesting_circuits/
//!     ├── circuit{N}.{ext}            copy of the program source
//!     └── circuit{N}.verdict.json     verdict manifest
//! ```
//!
//! Directories are created with `create_dir_all`, so concurrent workers
//! creating sibling directories do not race.

use crate::error::{OracleError, Result};
use crate::normalize::Distribution;
use crate::report::{LevelReport, TestCaseReport};
use crate::triage::Verdict;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const INTERESTING_DIR: &str = "interesting_circuits";
const BAR_WIDTH: u64 = 50;

/// Verdict manifest stored next to an interesting source copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub circuit_number: u64,
    pub verdict: Verdict,
    pub levels: Vec<LevelReport>,
    pub source: PathBuf,
    /// SHA-256 of the source at save time, absent when it was never written
    pub source_sha256: Option<String>,
    pub tool_version: String,
}

/// Rendered distribution of one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedDistribution {
    pub circuit_number: u64,
    pub level: u8,
    pub title: String,
    pub shots: u64,
    pub counts: Distribution,
}

/// Writes artifacts under one output directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn interesting_dir(&self) -> PathBuf {
        self.root.join(INTERESTING_DIR)
    }

    pub fn circuit_dir(&self, circuit_number: u64) -> PathBuf {
        self.root.join(format!("circuit{}", circuit_number))
    }

    /// Copy an interesting program's source into `interesting_circuits/`
    ///
    /// Returns `Ok(None)` with a warning when the source was never
    /// materialized; that is not worth aborting the test case over.
    /// An existing copy for the same circuit number is overwritten.
    pub fn save(&self, circuit_number: u64, source: &Path) -> Result<Option<PathBuf>> {
        if !source.is_file() {
            let missing = OracleError::ArtifactMissing(source.to_path_buf());
            tracing::warn!(circuit = circuit_number, error = %missing, "skipping artifact");
            return Ok(None);
        }

        let dir = self.interesting_dir();
        fs::create_dir_all(&dir)?;

        let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("py");
        let dest = dir.join(format!("circuit{}.{}", circuit_number, ext));
        fs::copy(source, &dest)?;

        tracing::info!(circuit = circuit_number, path = %dest.display(), "saved interesting circuit");
        Ok(Some(dest))
    }

    /// Write `circuit{N}.verdict.json` for an interesting report
    pub fn save_manifest(&self, report: &TestCaseReport) -> Result<PathBuf> {
        let dir = self.interesting_dir();
        fs::create_dir_all(&dir)?;

        let source_sha256 = fs::read(&report.source)
            .ok()
            .map(|bytes| hex::encode(Sha256::digest(&bytes)));

        let manifest = ArtifactManifest {
            circuit_number: report.circuit_number,
            verdict: report.verdict.clone(),
            levels: report.levels.clone(),
            source: report.source.clone(),
            source_sha256,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let path = dir.join(format!("circuit{}.verdict.json", report.circuit_number));
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        Ok(path)
    }

    /// Write a level's distribution as JSON plus a text bar chart
    ///
    /// Level 0 is the untransformed run and is labelled `uncompiled`.
    pub fn render_distribution(
        &self,
        circuit_number: u64,
        level: u8,
        title: &str,
        distribution: &Distribution,
    ) -> Result<PathBuf> {
        let dir = self.circuit_dir(circuit_number);
        fs::create_dir_all(&dir)?;

        let suffix = if level == 0 {
            "uncompiled".to_string()
        } else {
            level.to_string()
        };
        let stem = format!("output{}_{}", circuit_number, suffix);

        let rendered = RenderedDistribution {
            circuit_number,
            level,
            title: title.to_string(),
            shots: distribution.total(),
            counts: distribution.clone(),
        };
        let json_path = dir.join(format!("{}.json", stem));
        fs::write(&json_path, serde_json::to_string_pretty(&rendered)?)?;
        fs::write(
            dir.join(format!("{}.txt", stem)),
            histogram(title, distribution),
        )?;

        Ok(json_path)
    }
}

/// Horizontal bar chart of a distribution
fn histogram(title: &str, distribution: &Distribution) -> String {
    let mut out = format!("{}\n", title);
    let peak = distribution.iter().map(|(_, c)| c).max().unwrap_or(0);
    let width = distribution
        .max_index()
        .map(|m| m.to_string().len())
        .unwrap_or(1);

    for (index, count) in distribution.iter() {
        let bar = if peak == 0 {
            0
        } else {
            u128::from(count) * u128::from(BAR_WIDTH) / u128::from(peak)
        };
        out.push_str(&format!(
            "{:>width$} | {} {}\n",
            index,
            "█".repeat(bar as usize),
            count,
            width = width
        ));
    }
    out.push_str(&format!("total: {}\n", distribution.total()));
    out
}
