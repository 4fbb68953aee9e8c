//! Orchestrator: drives one program through baseline and comparison levels
//!
//! ```text
//! baseline (level 0) ─┐
//!                     ├─ normalize ─ compare ─ classify ─┐
//! level 1..N ─────────┘                                  ├─ verdict ─ artifacts
//!               timeout / diagnostic / failure ──────────┘
//! ```
//!
//! This is the only place backend failures are caught. Every outcome,
//! including contract violations, ends up in the [`TestCaseReport`]; nothing
//! escapes [`Oracle::run`], so one bad program never stops a batch.

use crate::artifact::ArtifactStore;
use crate::backend::ExecutionBackend;
use crate::bounded::{run_bounded, BoundedOutcome};
use crate::comparison::{compare, overlap, StateVector};
use crate::config::{ComparisonMode, OracleConfig};
use crate::error::OracleError;
use crate::normalize::{normalize, Distribution, RawCounts};
use crate::program::Program;
use crate::report::{BatchSummary, LevelOutcome, LevelReport, TestCaseReport};
use crate::triage::Classifier;
use std::sync::Arc;

/// Differential-testing oracle over one execution backend
pub struct Oracle {
    config: OracleConfig,
    backend: Arc<dyn ExecutionBackend>,
    store: ArtifactStore,
}

/// Mutable state of one test case
struct CaseState {
    classifier: Classifier,
    levels: Vec<LevelReport>,
    retryable: bool,
}

impl CaseState {
    fn record(&mut self, level: u8, outcome: LevelOutcome) {
        self.levels.push(LevelReport { level, outcome });
    }
}

impl Oracle {
    /// Create an oracle; fails if the configuration is invalid
    pub fn new(config: OracleConfig, backend: Arc<dyn ExecutionBackend>) -> anyhow::Result<Self> {
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        let store = ArtifactStore::new(config.output_dir.clone());
        Ok(Oracle {
            config,
            backend,
            store,
        })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Triage one program
    pub fn run(&self, program: &Program) -> TestCaseReport {
        let span = tracing::info_span!("test_case", circuit = program.circuit_number);
        let _guard = span.enter();

        let mut state = CaseState {
            classifier: Classifier::new(&self.config.thresholds),
            levels: Vec::with_capacity(self.config.levels.len() + 1),
            retryable: false,
        };

        match self.config.mode {
            ComparisonMode::Distribution => self.run_distributions(program, &mut state),
            ComparisonMode::StateVector => self.run_state_vectors(program, &mut state),
        }

        let verdict = state.classifier.finish();
        tracing::info!(verdict = %verdict, "test case finished");

        let mut report = TestCaseReport {
            circuit_number: program.circuit_number,
            source: program.source.clone(),
            backend: self.backend.name().to_string(),
            verdict,
            levels: state.levels,
            artifact: None,
            retryable: state.retryable,
        };

        if report.verdict.is_interesting() {
            self.persist(program, &mut report);
        }

        report
    }

    /// Triage programs one after another
    pub fn run_batch<'a, I>(&self, programs: I) -> BatchSummary
    where
        I: IntoIterator<Item = &'a Program>,
    {
        let reports = programs.into_iter().map(|p| self.run(p)).collect();
        BatchSummary { reports }
    }

    fn run_distributions(&self, program: &Program, state: &mut CaseState) {
        let baseline_level = self.config.baseline_level;
        let shots = self.config.shots;

        let outcome = self.execute_shots(program, baseline_level);
        let Some(raw) = self.settle(baseline_level, outcome, state) else {
            return;
        };
        let baseline = match normalize(&raw) {
            Ok(dist) => dist,
            Err(e) => return self.record_failure(baseline_level, e, state),
        };
        self.render(program, baseline_level, "Uncompiled Circuit Results", &baseline);

        for &level in &self.config.levels {
            let outcome = self.execute_shots(program, level);
            let Some(raw) = self.settle(level, outcome, state) else {
                continue;
            };
            let compiled = match normalize(&raw) {
                Ok(dist) => dist,
                Err(e) => {
                    self.record_failure(level, e, state);
                    continue;
                }
            };
            self.render(program, level, "Compiled Circuit Results", &compiled);

            match compare(&baseline, &compiled, shots) {
                Ok(result) => {
                    tracing::info!(
                        level,
                        p_value = result.p_value,
                        statistic = result.statistic,
                        "ks-test"
                    );
                    state.classifier.observe_p_value(result.p_value);
                    state.record(
                        level,
                        LevelOutcome::Compared {
                            p_value: result.p_value,
                            statistic: result.statistic,
                        },
                    );
                }
                Err(e) => self.record_failure(level, e, state),
            }
        }
    }

    fn run_state_vectors(&self, program: &Program, state: &mut CaseState) {
        let baseline_level = self.config.baseline_level;
        let precision = self.config.thresholds.overlap_precision;

        let outcome = self.execute_state(program, baseline_level);
        let Some(baseline) = self.settle(baseline_level, outcome, state) else {
            return;
        };

        for &level in &self.config.levels {
            let outcome = self.execute_state(program, level);
            let Some(compiled) = self.settle(level, outcome, state) else {
                continue;
            };
            match overlap(&baseline, &compiled, precision) {
                Ok(value) => {
                    if value < 1.0 {
                        tracing::info!(level, overlap = value, "state vectors differ");
                    } else {
                        tracing::info!(level, "state vectors are the same");
                    }
                    state.classifier.observe_overlap(value);
                    state.record(level, LevelOutcome::Overlap { overlap: value });
                }
                Err(e) => self.record_failure(level, e, state),
            }
        }
    }

    fn execute_shots(&self, program: &Program, level: u8) -> BoundedOutcome<RawCounts> {
        let backend = Arc::clone(&self.backend);
        let task_program = program.clone();
        let shots = self.config.shots;
        run_bounded(
            &format!("c{}-l{}", program.circuit_number, level),
            self.config.deadline(),
            move || backend.run_shots(&task_program, level, shots),
        )
    }

    fn execute_state(&self, program: &Program, level: u8) -> BoundedOutcome<StateVector> {
        let backend = Arc::clone(&self.backend);
        let task_program = program.clone();
        run_bounded(
            &format!("c{}-l{}", program.circuit_number, level),
            self.config.deadline(),
            move || backend.run_state(&task_program, level),
        )
    }

    /// Feed a non-completed outcome to the classifier; pass a completed one through
    fn settle<T>(&self, level: u8, outcome: BoundedOutcome<T>, state: &mut CaseState) -> Option<T> {
        if let BoundedOutcome::StructuredError(diagnostic) = &outcome {
            state.classifier.observe_structured_error(diagnostic);
            state.record(
                level,
                LevelOutcome::Diagnostic {
                    message: diagnostic.to_string(),
                },
            );
            return None;
        }

        state.retryable |= outcome.is_retryable();
        match outcome.into_result() {
            Ok(value) => Some(value),
            Err(error) => {
                self.record_failure(level, error, state);
                None
            }
        }
    }

    /// Record a level that produced no comparable result
    fn record_failure(&self, level: u8, error: OracleError, state: &mut CaseState) {
        if let OracleError::Timeout(deadline) = error {
            state.classifier.observe_timeout();
            state.record(
                level,
                LevelOutcome::TimedOut {
                    deadline_secs: deadline.as_secs_f64(),
                },
            );
            return;
        }

        tracing::error!(
            level,
            error = %error,
            contract = error.is_contract_violation(),
            "comparison could not be completed"
        );
        state.classifier.observe_unexpected_failure();
        state.record(
            level,
            LevelOutcome::Failed {
                message: error.to_string(),
            },
        );
    }

    fn render(&self, program: &Program, level: u8, title: &str, distribution: &Distribution) {
        if !self.config.render_distributions {
            return;
        }
        if let Err(e) =
            self.store
                .render_distribution(program.circuit_number, level, title, distribution)
        {
            tracing::warn!(level, error = %e, "failed to render distribution");
        }
    }

    fn persist(&self, program: &Program, report: &mut TestCaseReport) {
        match self.store.save(program.circuit_number, &program.source) {
            Ok(artifact) => report.artifact = artifact,
            Err(e) => tracing::warn!(error = %e, "failed to save interesting circuit"),
        }
        if let Err(e) = self.store.save_manifest(report) {
            tracing::warn!(error = %e, "failed to write verdict manifest");
        }
    }
}
