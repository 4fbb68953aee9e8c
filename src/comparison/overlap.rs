// State-vector overlap for exact-state backends

use crate::error::{OracleError, Result};
use serde::{Deserialize, Serialize};

/// One complex amplitude
///
/// Serialized as a `[re, im]` pair, the shape simulators emit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Amplitude {
    pub re: f64,
    pub im: f64,
}

impl Amplitude {
    pub const fn new(re: f64, im: f64) -> Self {
        Amplitude { re, im }
    }

    /// Rotate by `theta` radians (multiply by e^{iθ})
    pub fn rotate(self, theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Amplitude {
            re: self.re * cos - self.im * sin,
            im: self.re * sin + self.im * cos,
        }
    }
}

impl From<(f64, f64)> for Amplitude {
    fn from((re, im): (f64, f64)) -> Self {
        Amplitude { re, im }
    }
}

impl From<Amplitude> for (f64, f64) {
    fn from(a: Amplitude) -> Self {
        (a.re, a.im)
    }
}

/// State vector of dimension 2^n
pub type StateVector = Vec<Amplitude>;

/// Rounded magnitude of the inner product of two states, in [0, 1]
pub type StateOverlap = f64;

/// Compute `round(|⟨a, b⟩|, precision)`
///
/// The first argument is conjugated, so a global phase difference between
/// otherwise identical states still gives 1.0.
///
/// # Example
/// ```
/// use difftriage::comparison::{overlap, Amplitude};
///
/// let h = std::f64::consts::FRAC_1_SQRT_2;
/// let plus = vec![Amplitude::new(h, 0.0), Amplitude::new(h, 0.0)];
/// assert_eq!(overlap(&plus, &plus, 6).unwrap(), 1.0);
/// ```
pub fn overlap(a: &[Amplitude], b: &[Amplitude], precision: u32) -> Result<StateOverlap> {
    if a.len() != b.len() {
        return Err(OracleError::StateDimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    // conj(a) · b
    let (re, im) = a.iter().zip(b).fold((0.0, 0.0), |(re, im), (x, y)| {
        (re + x.re * y.re + x.im * y.im, im + x.re * y.im - x.im * y.re)
    });

    let magnitude = re.hypot(im);
    Ok(round_to(magnitude, precision))
}

fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision.min(15) as i32);
    (value * scale).round() / scale
}
