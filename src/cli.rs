//! CLI argument parsing for difftriage

use crate::config::{ComparisonMode, OracleConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "difftriage")]
#[command(version)]
#[command(
    about = "Differential-testing oracle for quantum compiler pipelines",
    long_about = None
)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run programs through every level and classify them
    Triage(TriageArgs),

    /// Two-sample KS comparison of two recorded count files
    Compare {
        /// Counts JSON of the reference run
        left: PathBuf,

        /// Counts JSON of the run under test
        right: PathBuf,

        /// Expected shots per side (default: total of the left file)
        #[arg(long = "shots", value_name = "N")]
        shots: Option<u64>,

        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Overlap of two recorded state vectors
    Overlap {
        left: PathBuf,
        right: PathBuf,

        /// Decimal places kept when rounding
        #[arg(long = "precision", default_value = "6")]
        precision: u32,
    },
}

#[derive(Args, Debug)]
pub struct TriageArgs {
    /// Program sources; circuit numbers come from `circuit{N}` file names
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,

    /// Oracle configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Answer from recordings in DIR instead of executing
    #[arg(long = "replay", value_name = "DIR", conflicts_with = "backend_cmd")]
    pub replay: Option<PathBuf>,

    /// Backend command line, e.g. "python3 run.py {source} {level} {shots}"
    ///
    /// Split on whitespace with no quoting or escapes. Arguments that contain
    /// spaces belong in `[backend] command` in the config file instead.
    #[arg(long = "backend-cmd", value_name = "CMD")]
    pub backend_cmd: Option<String>,

    /// Shots per execution
    #[arg(long = "shots", value_name = "N")]
    pub shots: Option<u64>,

    /// Deadline per backend step, in seconds
    #[arg(long = "deadline", value_name = "SECS")]
    pub deadline: Option<f64>,

    /// Comparison levels (e.g., --levels 1,2,3)
    #[arg(long = "levels", value_delimiter = ',', value_name = "LEVELS")]
    pub levels: Option<Vec<u8>>,

    /// Write rendered distributions for every level
    #[arg(long = "plot")]
    pub plot: bool,

    /// Compare state vectors instead of sampled distributions
    #[arg(long = "state-vector")]
    pub state_vector: bool,

    /// Root directory for artifacts
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl TriageArgs {
    /// Overlay command-line flags onto a loaded configuration
    pub fn apply(&self, config: &mut OracleConfig) {
        if let Some(shots) = self.shots {
            config.shots = shots;
        }
        if let Some(deadline) = self.deadline {
            config.deadline_secs = deadline;
        }
        if let Some(levels) = &self.levels {
            config.levels = levels.clone();
        }
        if self.plot {
            config.render_distributions = true;
        }
        if self.state_vector {
            config.mode = ComparisonMode::StateVector;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(cmd) = &self.backend_cmd {
            config.backend.command = cmd.split_whitespace().map(String::from).collect();
        }
    }
}
