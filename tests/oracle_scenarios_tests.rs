//! Triage scenarios driven through the public library API

use difftriage::backend::{BackendError, ExecutionBackend, SamplingBackend};
use difftriage::comparison::Amplitude;
use difftriage::config::{OracleConfig, Thresholds};
use difftriage::diagnostic::Diagnostic;
use difftriage::normalize::{RawCounts, RawLabel};
use difftriage::oracle::Oracle;
use difftriage::program::Program;
use difftriage::report::LevelOutcome;
use difftriage::triage::{Reason, Verdict};
use std::collections::HashMap;
use std::sync::Arc;

/// Backend returning fixed counts per level
struct ScriptedBackend {
    levels: HashMap<u8, Result<Vec<(&'static str, u64)>, &'static str>>,
}

impl ScriptedBackend {
    fn new(levels: &[(u8, Result<Vec<(&'static str, u64)>, &'static str>)]) -> Self {
        ScriptedBackend {
            levels: levels.iter().cloned().collect(),
        }
    }
}

impl ExecutionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn run_shots(&self, _: &Program, level: u8, _: u64) -> Result<RawCounts, BackendError> {
        match self.levels.get(&level) {
            Some(Ok(counts)) => Ok(counts
                .iter()
                .map(|(label, count)| (RawLabel::from(*label), *count))
                .collect()),
            Some(Err(msg)) if *msg == "panic" => panic!("simulator crashed at level {}", level),
            Some(Err(msg)) => Err(BackendError::Diagnostic(Diagnostic::new(*msg))),
            None => Err(BackendError::failed("no such level", "")),
        }
    }
}

fn config(out: &std::path::Path) -> OracleConfig {
    OracleConfig {
        output_dir: out.to_path_buf(),
        deadline_secs: 5.0,
        ..OracleConfig::default()
    }
}

#[test]
fn test_uniform_vs_shifted_uniform_is_interesting() {
    let out = tempfile::tempdir().unwrap();
    let uniform = vec![("000", 250), ("001", 250), ("010", 250), ("011", 250)];
    let shifted = vec![("100", 250), ("101", 250), ("110", 250), ("111", 250)];
    let backend = ScriptedBackend::new(&[
        (0, Ok(uniform.clone())),
        (1, Ok(uniform.clone())),
        (2, Ok(shifted)),
        (3, Ok(uniform)),
    ]);

    let oracle = Oracle::new(config(out.path()), Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(11, "circuit11.py"));

    assert_eq!(report.verdict, Verdict::Interesting(Reason::HighDivergence));
    assert!(report.min_p_value().unwrap() < 0.01);
}

#[test]
fn test_repeated_mild_divergence() {
    let out = tempfile::tempdir().unwrap();
    // 550/450 vs 500/500 gives D=0.05, p≈0.16: mild but not significant
    let baseline = vec![("0", 500), ("1", 500)];
    let mild = vec![("0", 550), ("1", 450)];
    let backend = ScriptedBackend::new(&[
        (0, Ok(baseline)),
        (1, Ok(mild.clone())),
        (2, Ok(mild.clone())),
        (3, Ok(mild)),
    ]);

    let oracle = Oracle::new(config(out.path()), Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(12, "circuit12.py"));

    assert_eq!(
        report.verdict,
        Verdict::Interesting(Reason::RepeatedMildDivergence)
    );
}

#[test]
fn test_single_mild_divergence_is_not_interesting() {
    let out = tempfile::tempdir().unwrap();
    let baseline = vec![("0", 500), ("1", 500)];
    let backend = ScriptedBackend::new(&[
        (0, Ok(baseline.clone())),
        (1, Ok(vec![("0", 550), ("1", 450)])),
        (2, Ok(baseline.clone())),
        (3, Ok(baseline)),
    ]);

    let oracle = Oracle::new(config(out.path()), Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(13, "circuit13.py"));

    assert_eq!(report.verdict, Verdict::NotInteresting);
}

#[test]
fn test_strict_thresholds_need_more_evidence() {
    let out = tempfile::tempdir().unwrap();
    let baseline = vec![("0", 500), ("1", 500)];
    let mild = vec![("0", 550), ("1", 450)];
    let backend = ScriptedBackend::new(&[
        (0, Ok(baseline.clone())),
        (1, Ok(mild.clone())),
        (2, Ok(mild)),
        (3, Ok(baseline)),
    ]);

    let config = OracleConfig {
        thresholds: Thresholds::strict(),
        ..config(out.path())
    };
    let oracle = Oracle::new(config, Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(14, "circuit14.py"));

    // p≈0.16 is above the strict mild threshold of 0.1
    assert_eq!(report.verdict, Verdict::NotInteresting);
}

#[test]
fn test_panicking_backend_is_unexpected_failure() {
    let out = tempfile::tempdir().unwrap();
    let dist = vec![("0", 1000)];
    let backend = ScriptedBackend::new(&[
        (0, Ok(dist.clone())),
        (1, Err("panic")),
        (2, Ok(dist.clone())),
        (3, Ok(dist)),
    ]);

    let oracle = Oracle::new(config(out.path()), Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(15, "circuit15.py"));

    assert_eq!(
        report.verdict,
        Verdict::Interesting(Reason::UnexpectedFailure)
    );
    match &report.levels[0].outcome {
        LevelOutcome::Failed { message } => assert!(message.contains("simulator crashed")),
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[test]
fn test_level_diagnostic_then_divergence() {
    let out = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(&[
        (0, Ok(vec![("0", 1000)])),
        (1, Err("unsupported gate")),
        (2, Ok(vec![("1", 1000)])),
        (3, Ok(vec![("0", 1000)])),
    ]);

    let oracle = Oracle::new(config(out.path()), Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(16, "circuit16.py"));

    // Divergence at level 2 overrides the inconclusive level 1
    assert_eq!(report.verdict, Verdict::Interesting(Reason::HighDivergence));
    assert!(matches!(
        report.levels[0].outcome,
        LevelOutcome::Diagnostic { .. }
    ));
}

#[test]
fn test_promoted_diagnostic_is_interesting() {
    let out = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(&[
        (0, Ok(vec![("0", 1000)])),
        (1, Err("unsupported gate")),
        (2, Ok(vec![("0", 1000)])),
        (3, Ok(vec![("0", 1000)])),
    ]);

    let mut config = config(out.path());
    config.thresholds.promote_structured_errors = true;
    let oracle = Oracle::new(config, Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(17, "circuit17.py"));

    assert_eq!(
        report.verdict,
        Verdict::Interesting(Reason::UnexpectedFailure)
    );
}

#[test]
fn test_malformed_label_is_unexpected_failure() {
    let out = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(&[
        (0, Ok(vec![("0", 1000)])),
        (1, Ok(vec![("0x1", 1000)])),
        (2, Ok(vec![("0", 1000)])),
        (3, Ok(vec![("0", 1000)])),
    ]);

    let oracle = Oracle::new(config(out.path()), Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(18, "circuit18.py"));

    assert_eq!(
        report.verdict,
        Verdict::Interesting(Reason::UnexpectedFailure)
    );
    match &report.levels[0].outcome {
        LevelOutcome::Failed { message } => assert!(message.contains("Malformed")),
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[test]
fn test_sampled_identical_states_agree() {
    let out = tempfile::tempdir().unwrap();
    let h = 0.5;
    let state = vec![
        Amplitude::new(h, 0.0),
        Amplitude::new(h, 0.0),
        Amplitude::new(h, 0.0),
        Amplitude::new(h, 0.0),
    ];
    let backend = SamplingBackend::new(state).with_seed(7);

    let config = OracleConfig {
        shots: 4000,
        ..config(out.path())
    };
    let oracle = Oracle::new(config, Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(19, "circuit19.py"));

    for level in &report.levels {
        assert!(matches!(level.outcome, LevelOutcome::Compared { .. }));
    }
    assert_eq!(report.levels.len(), 3);
}

#[test]
fn test_batch_continues_past_failures() {
    let out = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(&[(0, Err("panic"))]);
    let oracle = Oracle::new(config(out.path()), Arc::new(backend)).unwrap();

    let programs = vec![
        Program::new(1, "circuit1.py"),
        Program::new(2, "circuit2.py"),
    ];
    let summary = oracle.run_batch(&programs);

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.interesting(), 2);
    // Baseline failure stops the case before any comparison level
    assert!(summary.reports.iter().all(|r| r.levels.len() == 1));
}

#[test]
fn test_saturated_count_does_not_abort_case() {
    let out = tempfile::tempdir().unwrap();
    let dist = vec![("0", 1000)];
    let backend = ScriptedBackend::new(&[
        (0, Ok(dist.clone())),
        (1, Ok(vec![("0", u64::MAX)])),
        (2, Ok(dist.clone())),
        (3, Ok(dist)),
    ]);

    let oracle = Oracle::new(config(out.path()), Arc::new(backend)).unwrap();
    let report = oracle.run(&Program::new(20, "circuit20.py"));

    assert_eq!(
        report.verdict,
        Verdict::Interesting(Reason::UnexpectedFailure)
    );
    assert_eq!(report.levels.len(), 3);
    assert!(matches!(
        report.levels[0].outcome,
        LevelOutcome::Failed { .. }
    ));
}
