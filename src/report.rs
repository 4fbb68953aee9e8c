//! Per-test-case and batch reports
//!
//! Text output follows the same shape as the regression report: a verdict
//! header, then one line per compared level.

use crate::triage::Verdict;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened at one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LevelOutcome {
    /// Distribution compared against the baseline
    Compared { p_value: f64, statistic: f64 },
    /// State overlap with the baseline
    Overlap { overlap: f64 },
    TimedOut { deadline_secs: f64 },
    /// Backend rejected the input
    Diagnostic { message: String },
    /// Unexpected failure or contract violation
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    pub level: u8,
    #[serde(flatten)]
    pub outcome: LevelOutcome,
}

/// Everything the oracle learned about one program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseReport {
    pub circuit_number: u64,
    pub source: PathBuf,
    pub backend: String,
    pub verdict: Verdict,
    pub levels: Vec<LevelReport>,
    /// Persisted copy of the source, when interesting and present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    /// A transient remote failure contributed to the verdict
    #[serde(default)]
    pub retryable: bool,
}

impl TestCaseReport {
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Smallest p-value among compared levels
    pub fn min_p_value(&self) -> Option<f64> {
        self.levels
            .iter()
            .filter_map(|l| match l.outcome {
                LevelOutcome::Compared { p_value, .. } => Some(p_value),
                _ => None,
            })
            .reduce(f64::min)
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        let header = match &self.verdict {
            Verdict::NotInteresting => "✅ NOT INTERESTING".to_string(),
            Verdict::Interesting(reason) => format!("❌ INTERESTING ({})", reason),
            Verdict::Inconclusive(why) => format!("⚠️  INCONCLUSIVE ({})", why),
        };
        report.push_str(&format!(
            "circuit{} [{}]: {}\n",
            self.circuit_number, self.backend, header
        ));

        for level in &self.levels {
            let line = match &level.outcome {
                LevelOutcome::Compared { p_value, statistic } => {
                    format!("ks-test p-value: {:.6} (D={:.4})", p_value, statistic)
                }
                LevelOutcome::Overlap { overlap } => format!("state overlap: {}", overlap),
                LevelOutcome::TimedOut { deadline_secs } => {
                    format!("timed out after {}s", deadline_secs)
                }
                LevelOutcome::Diagnostic { message } => format!("diagnostic: {}", message),
                LevelOutcome::Failed { message } => format!("failed: {}", message),
            };
            report.push_str(&format!("  level {}: {}\n", level.level, line));
        }

        if let Some(artifact) = &self.artifact {
            report.push_str(&format!("  saved: {}\n", artifact.display()));
        }
        if self.retryable {
            report.push_str("  (transient backend failure; retry may succeed)\n");
        }

        report
    }
}

/// Reports of a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub reports: Vec<TestCaseReport>,
}

impl BatchSummary {
    pub fn interesting(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.verdict.is_interesting())
            .count()
    }

    pub fn inconclusive(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.verdict, Verdict::Inconclusive(_)))
            .count()
    }

    pub fn not_interesting(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.verdict == Verdict::NotInteresting)
            .count()
    }

    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        for case in &self.reports {
            report.push_str(&case.to_report_string());
        }
        report.push_str(&format!(
            "\n📊 {} circuits: {} interesting, {} inconclusive, {} not interesting\n",
            self.reports.len(),
            self.interesting(),
            self.inconclusive(),
            self.not_interesting()
        ));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::Reason;

    fn case(verdict: Verdict, levels: Vec<LevelReport>) -> TestCaseReport {
        TestCaseReport {
            circuit_number: 4,
            source: PathBuf::from("circuit4.py"),
            backend: "replay".to_string(),
            verdict,
            levels,
            artifact: None,
            retryable: false,
        }
    }

    #[test]
    fn test_report_string_interesting() {
        let report = case(
            Verdict::Interesting(Reason::HighDivergence),
            vec![
                LevelReport {
                    level: 1,
                    outcome: LevelOutcome::Compared {
                        p_value: 0.93,
                        statistic: 0.01,
                    },
                },
                LevelReport {
                    level: 2,
                    outcome: LevelOutcome::Compared {
                        p_value: 0.001,
                        statistic: 0.2,
                    },
                },
            ],
        );
        let text = report.to_report_string();
        assert!(text.contains("circuit4 [replay]: ❌ INTERESTING (high-divergence)"));
        assert!(text.contains("level 2: ks-test p-value: 0.001000"));
        assert_eq!(report.min_p_value(), Some(0.001));
    }

    #[test]
    fn test_report_string_timeout_and_diagnostic() {
        let report = case(
            Verdict::Interesting(Reason::Timeout),
            vec![
                LevelReport {
                    level: 1,
                    outcome: LevelOutcome::TimedOut { deadline_secs: 30.0 },
                },
                LevelReport {
                    level: 2,
                    outcome: LevelOutcome::Diagnostic {
                        message: "bad gate".into(),
                    },
                },
            ],
        );
        let text = report.to_report_string();
        assert!(text.contains("level 1: timed out after 30s"));
        assert!(text.contains("level 2: diagnostic: bad gate"));
        assert_eq!(report.min_p_value(), None);
    }

    #[test]
    fn test_level_report_json_is_flat() {
        let level = LevelReport {
            level: 3,
            outcome: LevelOutcome::Overlap { overlap: 1.0 },
        };
        let json = serde_json::to_value(&level).unwrap();
        assert_eq!(json["level"], 3);
        assert_eq!(json["status"], "overlap");
        assert_eq!(json["overlap"], 1.0);
    }

    #[test]
    fn test_batch_counts() {
        let summary = BatchSummary {
            reports: vec![
                case(Verdict::NotInteresting, vec![]),
                case(Verdict::Interesting(Reason::Timeout), vec![]),
                case(Verdict::Inconclusive("x".into()), vec![]),
                case(Verdict::NotInteresting, vec![]),
            ],
        };
        assert_eq!(summary.interesting(), 1);
        assert_eq!(summary.inconclusive(), 1);
        assert_eq!(summary.not_interesting(), 2);
        assert!(summary
            .to_report_string()
            .contains("4 circuits: 1 interesting, 1 inconclusive, 2 not interesting"));
    }
}
