// Distribution comparison for differential testing
//
// Two ways of deciding whether two execution paths agree:
// - Empirical outcome distributions, compared with a two-sample
//   Kolmogorov-Smirnov test over the reconstructed shot samples
// - Exact state vectors, compared by the magnitude of their inner product
//
// Scientific Foundation:
// [1] Smirnov, N. (1948). Table for estimating the goodness of fit of
//     empirical distributions. Annals of Mathematical Statistics, 19(2).
// [2] Stephens, M. A. (1970). Use of the Kolmogorov-Smirnov, Cramer-von Mises
//     and related statistics without extensive tables. JRSS B, 32(1).
//
// Limitation: outcome indices are ordered only because they are built from
// bit patterns. KS treats them as a numeric domain, so two distributions that
// permute probability mass between distant indices score differently from
// ones that permute between neighbours.

mod ks;
mod overlap;

pub use ks::{compare, kolmogorov_survival, ks_statistic, ComparisonResult};
pub use overlap::{overlap, Amplitude, StateOverlap, StateVector};
