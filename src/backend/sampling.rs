//! Sampling backend: draws shots from known final states
//!
//! Stands in for a simulator when the final state of each level is already
//! known, e.g. in tests and benchmarks. Sampling is seeded, so a given
//! (seed, circuit, level) always yields the same counts.

use super::{BackendError, ExecutionBackend};
use crate::comparison::{Amplitude, StateVector};
use crate::normalize::{RawCounts, RawLabel};
use crate::program::Program;
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Backend that measures fixed state vectors
#[derive(Debug, Clone)]
pub struct SamplingBackend {
    default_state: StateVector,
    levels: BTreeMap<u8, StateVector>,
    seed: u64,
}

impl SamplingBackend {
    /// Every level produces `state` unless overridden with [`Self::with_level`]
    pub fn new(state: StateVector) -> Self {
        SamplingBackend {
            default_state: state,
            levels: BTreeMap::new(),
            seed: 0x5eed,
        }
    }

    /// Computational basis state |index⟩ over `qubits` qubits
    pub fn basis_state(qubits: u32, index: usize) -> StateVector {
        let mut state = vec![Amplitude::default(); 1usize << qubits];
        state[index] = Amplitude::new(1.0, 0.0);
        state
    }

    /// Replace the state produced at `level` (e.g. a miscompiled one)
    pub fn with_level(mut self, level: u8, state: StateVector) -> Self {
        self.levels.insert(level, state);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn state_for(&self, level: u8) -> &StateVector {
        self.levels.get(&level).unwrap_or(&self.default_state)
    }
}

/// Number of bits needed to label every basis state of `state`
fn label_width(state: &[Amplitude]) -> usize {
    let dim = state.len().max(2);
    (usize::BITS - (dim - 1).leading_zeros()) as usize
}

impl ExecutionBackend for SamplingBackend {
    fn name(&self) -> &str {
        "sampling"
    }

    fn run_shots(&self, program: &Program, level: u8, shots: u64) -> Result<RawCounts, BackendError> {
        let state = self.state_for(level);
        let weights: Vec<f64> = state.iter().map(|a| a.re * a.re + a.im * a.im).collect();
        let index = WeightedIndex::new(&weights)
            .map_err(|e| anyhow::anyhow!("State cannot be sampled: {}", e))?;

        let seed = self
            .seed
            .wrapping_mul(0x9e37_79b9_7f4a_7c15)
            .wrapping_add(program.circuit_number << 8)
            .wrapping_add(u64::from(level));
        let mut rng = StdRng::seed_from_u64(seed);

        let mut counts: BTreeMap<usize, u64> = BTreeMap::new();
        for _ in 0..shots {
            *counts.entry(index.sample(&mut rng)).or_insert(0) += 1;
        }

        let width = label_width(state);
        Ok(counts
            .into_iter()
            .map(|(outcome, count)| {
                (
                    RawLabel::Text(format!("{:0width$b}", outcome, width = width)),
                    count,
                )
            })
            .collect())
    }

    fn run_state(&self, _program: &Program, level: u8) -> Result<StateVector, BackendError> {
        Ok(self.state_for(level).clone())
    }
}
