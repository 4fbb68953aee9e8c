// Interesting-case triage
//
// Turns the per-level signals of one test case (p-values, overlaps, timeouts,
// backend failures) into a single verdict. A case is interesting when it
// likely exposes a defect in the compilation pipeline under test:
// - one strongly divergent comparison (p < significance), or
// - repeated mild divergence across levels (p < mild threshold, twice), or
// - a step that timed out or failed in an unexpected way.
//
// Backend diagnostics about the generated input are inconclusive: they describe
// the program, not the pipeline.

mod classifier;
mod verdict;

pub use classifier::Classifier;
pub use verdict::{Reason, Verdict};
