//! Oracle configuration
//!
//! Everything the orchestrator needs is passed in explicitly through
//! [`OracleConfig`]; there is no process-wide output directory. Values come
//! from `Default`, an optional TOML file, and CLI overrides, in that order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How two execution paths are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Sample shots and run the two-sample KS test
    #[default]
    Distribution,
    /// Fetch exact state vectors and compare their overlap
    StateVector,
}

/// Decision thresholds for the classifier
///
/// # Example
/// ```
/// use difftriage::config::Thresholds;
///
/// let thresholds = Thresholds::default();
/// assert_eq!(thresholds.significance, 0.05);
/// assert_eq!(thresholds.consistency_limit, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A single comparison below this p-value is interesting on its own
    pub significance: f64,

    /// Comparisons below this p-value count towards the consistency counter
    pub mild_divergence: f64,

    /// Mildly divergent comparisons needed before the case is interesting
    pub consistency_limit: u32,

    /// Decimal places kept when rounding state overlaps
    pub overlap_precision: u32,

    /// Treat backend diagnostics as interesting instead of inconclusive
    ///
    /// Useful when the generator is known to produce only valid programs, so
    /// any rejection is itself a regression.
    pub promote_structured_errors: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            significance: 0.05,
            mild_divergence: 0.2,
            consistency_limit: 2,
            overlap_precision: 6,
            promote_structured_errors: false,
        }
    }
}

impl Thresholds {
    /// Fewer flagged cases: stricter p-values, three mild hits required
    pub fn strict() -> Self {
        Self {
            significance: 0.01,
            mild_divergence: 0.1,
            consistency_limit: 3,
            ..Self::default()
        }
    }

    /// More flagged cases: looser p-values
    pub fn permissive() -> Self {
        Self {
            significance: 0.10,
            mild_divergence: 0.3,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.significance) {
            return Err(format!(
                "significance must be in [0, 1], got {}",
                self.significance
            ));
        }
        if !(0.0..=1.0).contains(&self.mild_divergence) {
            return Err(format!(
                "mild_divergence must be in [0, 1], got {}",
                self.mild_divergence
            ));
        }
        if self.mild_divergence < self.significance {
            return Err(format!(
                "mild_divergence ({}) must not be below significance ({})",
                self.mild_divergence, self.significance
            ));
        }
        if self.consistency_limit == 0 {
            return Err("consistency_limit must be >= 1".to_string());
        }
        if self.overlap_precision > 15 {
            return Err(format!(
                "overlap_precision must be <= 15, got {}",
                self.overlap_precision
            ));
        }
        Ok(())
    }
}

/// External command backend settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Program and arguments; `{source}`, `{level}`, `{shots}` and `{mode}` are substituted
    pub command: Vec<String>,

    /// Working directory for the command
    pub working_dir: Option<PathBuf>,
}

/// Full oracle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Shots per execution; both sides of a comparison use the same count
    pub shots: u64,

    /// Deadline for each backend step, in seconds
    pub deadline_secs: f64,

    /// Level of the untransformed reference run
    pub baseline_level: u8,

    /// Levels compared against the baseline, in order
    pub levels: Vec<u8>,

    pub mode: ComparisonMode,

    /// Write per-level distributions under `output_dir/circuit{N}/`
    pub render_distributions: bool,

    /// Root of the artifact layout
    pub output_dir: PathBuf,

    pub thresholds: Thresholds,

    pub backend: BackendConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            shots: 1000,
            deadline_secs: 30.0,
            baseline_level: 0,
            levels: vec![1, 2, 3],
            mode: ComparisonMode::Distribution,
            render_distributions: false,
            output_dir: PathBuf::from("outputs"),
            thresholds: Thresholds::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl OracleConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    ///
    /// # Example TOML
    /// ```toml
    /// shots = 10000
    /// deadline_secs = 60
    /// levels = [1, 2, 3]
    /// render_distributions = true
    ///
    /// [thresholds]
    /// significance = 0.05
    /// mild_divergence = 0.2
    ///
    /// [backend]
    /// command = ["python3", "run_circuit.py", "{source}", "{level}", "{shots}"]
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        let config: OracleConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML oracle config")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs_f64(self.deadline_secs)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.shots == 0 {
            return Err("shots must be > 0".to_string());
        }
        if !self.deadline_secs.is_finite() || self.deadline_secs <= 0.0 {
            return Err(format!(
                "deadline_secs must be positive, got {}",
                self.deadline_secs
            ));
        }
        if self.levels.is_empty() {
            return Err("at least one comparison level is required".to_string());
        }
        self.thresholds.validate()
    }
}
