use anyhow::{Context, Result};
use clap::Parser;
use difftriage::backend::{CommandBackend, ExecutionBackend, ReplayBackend, WireCounts};
use difftriage::cli::{Cli, Command, OutputFormat, TriageArgs};
use difftriage::comparison::{compare, overlap, StateVector};
use difftriage::config::OracleConfig;
use difftriage::normalize::{normalize, Distribution};
use difftriage::oracle::Oracle;
use difftriage::program::number_programs;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_distribution(path: &Path) -> Result<Distribution> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read counts file: {}", path.display()))?;
    let counts: WireCounts = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse counts file: {}", path.display()))?;
    Ok(normalize(&counts.into_raw_counts())?)
}

fn load_state(path: &Path) -> Result<StateVector> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))
}

fn select_backend(args: &TriageArgs, config: &OracleConfig) -> Result<Arc<dyn ExecutionBackend>> {
    if let Some(dir) = &args.replay {
        let backend = ReplayBackend::load_dir(dir)?;
        tracing::info!(recordings = backend.len(), dir = %dir.display(), "loaded replay backend");
        return Ok(Arc::new(backend));
    }
    if config.backend.command.is_empty() {
        anyhow::bail!("No backend configured: pass --replay DIR, --backend-cmd CMD, or set [backend] command in the config file");
    }
    let backend = CommandBackend::from_config(&config.backend)?.with_timeout(config.deadline());
    Ok(Arc::new(backend))
}

fn run_triage(args: TriageArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => OracleConfig::from_toml(path)?,
        None => OracleConfig::default(),
    };
    args.apply(&mut config);

    let backend = select_backend(&args, &config)?;
    let oracle = Oracle::new(config, backend).context("Invalid oracle configuration")?;

    let programs = number_programs(&args.sources)?;
    let summary = oracle.run_batch(&programs);

    match args.format {
        OutputFormat::Text => print!("{}", summary.to_report_string()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn run_compare(left: &Path, right: &Path, shots: Option<u64>, format: OutputFormat) -> Result<()> {
    let a = load_distribution(left)?;
    let b = load_distribution(right)?;
    let result = compare(&a, &b, shots.unwrap_or_else(|| a.total()))?;

    match format {
        OutputFormat::Text => {
            println!("ks-test p-value: {:.6}", result.p_value);
            println!("statistic: {:.6}", result.statistic);
            println!("shots: {} / {}", result.left_shots, result.right_shots);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    match args.command {
        Command::Triage(triage) => run_triage(triage),
        Command::Compare {
            left,
            right,
            shots,
            format,
        } => run_compare(&left, &right, shots, format),
        Command::Overlap {
            left,
            right,
            precision,
        } => {
            let value = overlap(&load_state(&left)?, &load_state(&right)?, precision)?;
            println!("{}", value);
            Ok(())
        }
    }
}
