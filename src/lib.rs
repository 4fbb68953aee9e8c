//! difftriage - differential-testing oracle for quantum compiler pipelines
//!
//! Each program is executed once untransformed (the baseline) and once per
//! compiler optimization level. Measurement distributions are normalized and
//! compared with a two-sample Kolmogorov-Smirnov test (or, in state-vector
//! mode, by state overlap). Every backend step runs under a deadline, and the
//! combined signals classify the program as interesting, inconclusive, or not
//! interesting. Interesting programs are copied into an artifact directory.

pub mod artifact;
pub mod backend;
pub mod bounded;
pub mod cli;
pub mod comparison;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod normalize;
pub mod oracle;
pub mod program;
pub mod report;
pub mod triage;
