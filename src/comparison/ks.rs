// Two-sample Kolmogorov-Smirnov test over reconstructed shot samples

use crate::error::{OracleError, Result};
use crate::normalize::Distribution;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Below this λ the alternating series converges too slowly; use the theta form
const SMALL_LAMBDA: f64 = 1.18;

const SERIES_EPSILON: f64 = 1e-12;
const SERIES_MAX_TERMS: u32 = 100;

/// Result of comparing two outcome distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Asymptotic two-sided p-value
    /// - small: the samples likely come from different distributions
    /// - near 1: no evidence of divergence
    pub p_value: f64,

    /// KS statistic D = sup |F_a(x) - F_b(x)|
    pub statistic: f64,

    /// Shots in the first sample
    pub left_shots: u64,

    /// Shots in the second sample
    pub right_shots: u64,
}

/// Compare two distributions built from the same number of shots
///
/// Each distribution stands for its flat sample (index repeated by count).
/// Both must total exactly `expected_total_shots`; anything else is a broken
/// backend or caller and fails with [`OracleError::SampleSizeMismatch`]
/// rather than producing a p-value. Totals are checked before any work, and
/// the statistic is taken over the count maps, so a bogus count never
/// drives an allocation.
///
/// # Example
/// ```
/// use difftriage::comparison::compare;
/// use difftriage::normalize::Distribution;
///
/// let a: Distribution = vec![(0, 500), (1, 500)].into_iter().collect();
/// let result = compare(&a, &a, 1000).unwrap();
/// assert!(result.p_value > 0.99);
/// ```
pub fn compare(
    a: &Distribution,
    b: &Distribution,
    expected_total_shots: u64,
) -> Result<ComparisonResult> {
    let (left, right) = (a.total(), b.total());
    if left != expected_total_shots || right != expected_total_shots {
        return Err(OracleError::SampleSizeMismatch {
            expected: expected_total_shots,
            left,
            right,
        });
    }
    if expected_total_shots == 0 {
        return Err(OracleError::EmptySample);
    }

    let statistic = distribution_statistic(a, b);
    let p_value = ks_p_value(statistic, left, right);

    tracing::trace!(statistic, p_value, shots = expected_total_shots, "ks test");

    Ok(ComparisonResult {
        p_value,
        statistic,
        left_shots: left,
        right_shots: right,
    })
}

/// KS statistic over the count maps, equal to [`ks_statistic`] on the flat samples
///
/// Both totals must be non-zero.
fn distribution_statistic(a: &Distribution, b: &Distribution) -> f64 {
    let (n, m) = (a.total() as f64, b.total() as f64);
    let mut left = a.iter().peekable();
    let mut right = b.iter().peekable();
    let (mut cum_a, mut cum_b) = (0u64, 0u64);
    let mut d: f64 = 0.0;

    loop {
        let index = match (left.peek(), right.peek()) {
            (Some(&(i, _)), Some(&(j, _))) => i.min(j),
            (Some(&(i, _)), None) => i,
            (None, Some(&(j, _))) => j,
            (None, None) => break,
        };
        if let Some((_, count)) = left.next_if(|&(i, _)| i == index) {
            cum_a = cum_a.saturating_add(count);
        }
        if let Some((_, count)) = right.next_if(|&(j, _)| j == index) {
            cum_b = cum_b.saturating_add(count);
        }
        d = d.max((cum_a as f64 / n - cum_b as f64 / m).abs());
    }

    d
}

/// Maximum distance between the empirical CDFs of two sorted samples
///
/// Ties are handled with right-continuous CDFs: every copy of a value is
/// consumed on both sides before the distance is measured.
pub fn ks_statistic(sorted_a: &[u64], sorted_b: &[u64]) -> f64 {
    let (n, m) = (sorted_a.len(), sorted_b.len());
    if n == 0 || m == 0 {
        return if n == m { 0.0 } else { 1.0 };
    }

    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;

    // Once one side is exhausted its CDF is 1 and the gap can only shrink
    while i < n && j < m {
        let v = sorted_a[i].min(sorted_b[j]);
        while i < n && sorted_a[i] <= v {
            i += 1;
        }
        while j < m && sorted_b[j] <= v {
            j += 1;
        }
        let gap = (i as f64 / n as f64 - j as f64 / m as f64).abs();
        d = d.max(gap);
    }

    d
}

fn ks_p_value(statistic: f64, n: u64, m: u64) -> f64 {
    if statistic <= 0.0 {
        return 1.0;
    }
    let en = (n as f64 * m as f64) / (n as f64 + m as f64);
    let sqrt_en = en.sqrt();
    let lambda = (sqrt_en + 0.12 + 0.11 / sqrt_en) * statistic;
    kolmogorov_survival(lambda)
}

/// Survival function of the Kolmogorov distribution, Q_KS(λ) = P(K > λ)
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    if lambda < SMALL_LAMBDA {
        // P(K <= λ) = √(2π)/λ · Σ exp(-(2k-1)²π² / (8λ²))
        let base = -PI * PI / (8.0 * lambda * lambda);
        let mut sum = 0.0;
        for k in 1..=SERIES_MAX_TERMS {
            let odd = f64::from(2 * k - 1);
            let term = (base * odd * odd).exp();
            sum += term;
            if term < SERIES_EPSILON * sum {
                break;
            }
        }
        let cdf = (2.0 * PI).sqrt() / lambda * sum;
        (1.0 - cdf).clamp(0.0, 1.0)
    } else {
        // Q(λ) = 2 Σ (-1)^(k-1) exp(-2k²λ²)
        let mut sum = 0.0;
        let mut sign = 1.0;
        for k in 1..=SERIES_MAX_TERMS {
            let kf = f64::from(k);
            let term = (-2.0 * kf * kf * lambda * lambda).exp();
            sum += sign * term;
            if term <= SERIES_EPSILON * sum.abs() || term == 0.0 {
                break;
            }
            sign = -sign;
        }
        (2.0 * sum).clamp(0.0, 1.0)
    }
}
