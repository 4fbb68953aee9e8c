// Per-test-case classifier with a consistency counter

use crate::config::Thresholds;
use crate::diagnostic::Diagnostic;
use crate::triage::verdict::{Reason, Verdict};

/// Accumulates the signals of one test case into a [`Verdict`]
///
/// Create one per program; observations are fed in level order.
///
/// # Example
/// ```
/// use difftriage::config::Thresholds;
/// use difftriage::triage::{Classifier, Reason, Verdict};
///
/// let mut classifier = Classifier::new(&Thresholds::default());
/// classifier.observe_p_value(0.12);
/// classifier.observe_p_value(0.15);
/// assert_eq!(
///     classifier.finish(),
///     Verdict::Interesting(Reason::RepeatedMildDivergence)
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Classifier {
    thresholds: Thresholds,
    consistency_counter: u32,
    verdict: Verdict,
}

impl Classifier {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            thresholds: thresholds.clone(),
            consistency_counter: 0,
            verdict: Verdict::NotInteresting,
        }
    }

    /// Mildly divergent comparisons seen so far
    pub fn consistency_counter(&self) -> u32 {
        self.consistency_counter
    }

    pub fn is_interesting(&self) -> bool {
        self.verdict.is_interesting()
    }

    /// Current verdict without consuming the classifier
    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// Record the p-value of one level's comparison
    pub fn observe_p_value(&mut self, p_value: f64) {
        if p_value < self.thresholds.mild_divergence {
            self.consistency_counter += 1;
        }

        if p_value < self.thresholds.significance {
            self.mark(Reason::HighDivergence);
        } else if self.consistency_counter >= self.thresholds.consistency_limit {
            self.mark(Reason::RepeatedMildDivergence);
        }
    }

    /// Record a rounded state overlap; anything short of 1.0 is a divergence
    pub fn observe_overlap(&mut self, overlap: f64) {
        if overlap < 1.0 {
            self.mark(Reason::HighDivergence);
        }
    }

    pub fn observe_timeout(&mut self) {
        self.mark(Reason::Timeout);
    }

    pub fn observe_unexpected_failure(&mut self) {
        self.mark(Reason::UnexpectedFailure);
    }

    /// Record a backend diagnostic about the input program
    pub fn observe_structured_error(&mut self, diagnostic: &Diagnostic) {
        if self.thresholds.promote_structured_errors {
            self.mark(Reason::UnexpectedFailure);
            return;
        }
        if self.verdict == Verdict::NotInteresting {
            self.verdict = Verdict::Inconclusive(diagnostic.to_string());
        }
    }

    pub fn finish(self) -> Verdict {
        self.verdict
    }

    // Interesting is sticky and overrides inconclusive
    fn mark(&mut self, reason: Reason) {
        if !self.verdict.is_interesting() {
            self.verdict = Verdict::Interesting(reason);
        }
    }
}
