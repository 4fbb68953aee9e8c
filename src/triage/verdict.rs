// Verdict of a single test case

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a test case was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// One comparison crossed the strict significance level
    HighDivergence,

    /// A bounded step ran past its deadline
    Timeout,

    /// A step failed in a way the backend did not classify as an input problem
    UnexpectedFailure,

    /// Several comparisons were mildly divergent
    RepeatedMildDivergence,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::HighDivergence => "high-divergence",
            Reason::Timeout => "timeout",
            Reason::UnexpectedFailure => "unexpected-failure",
            Reason::RepeatedMildDivergence => "repeated-mild-divergence",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final classification of a test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    /// All comparisons agreed
    NotInteresting,

    /// Likely pipeline defect; artifacts are preserved
    Interesting(Reason),

    /// Could not decide (e.g. the backend rejected the generated input)
    Inconclusive(String),
}

impl Verdict {
    pub fn is_interesting(&self) -> bool {
        matches!(self, Verdict::Interesting(_))
    }

    pub fn reason(&self) -> Option<Reason> {
        match self {
            Verdict::Interesting(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::NotInteresting => f.write_str("not_interesting"),
            Verdict::Interesting(reason) => write!(f, "interesting({})", reason),
            Verdict::Inconclusive(why) => write!(f, "inconclusive({})", why),
        }
    }
}
