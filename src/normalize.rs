//! Outcome normalization
//!
//! Backends report outcomes as bit labels, either as a sequence of bit symbols
//! (`[0, 1, 1]`) or as a string that may contain register separators
//! (`"01 1"`). Both are folded into a canonical [`Distribution`] keyed by the
//! label's base-2 value.

use crate::error::{OracleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One outcome label as reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLabel {
    /// Sequence of bit symbols, most significant first
    Bits(Vec<u8>),
    /// Bit string, whitespace ignored
    Text(String),
}

impl RawLabel {
    /// Interpret the label as a base-2 integer
    pub fn to_index(&self) -> Result<u64> {
        match self {
            RawLabel::Bits(bits) => bits_to_index(bits.iter().copied(), || self.to_string()),
            RawLabel::Text(text) => {
                let mut bits = Vec::with_capacity(text.len());
                for c in text.chars().filter(|c| !c.is_whitespace()) {
                    match c {
                        '0' => bits.push(0),
                        '1' => bits.push(1),
                        other => {
                            return Err(OracleError::MalformedLabel {
                                label: text.clone(),
                                reason: format!("symbol {:?} is not a bit", other),
                            })
                        }
                    }
                }
                bits_to_index(bits, || text.clone())
            }
        }
    }
}

impl fmt::Display for RawLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawLabel::Bits(bits) => {
                for b in bits {
                    write!(f, "{}", b)?;
                }
                Ok(())
            }
            RawLabel::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for RawLabel {
    fn from(text: &str) -> Self {
        RawLabel::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RawLabel {
    fn from(bits: Vec<u8>) -> Self {
        RawLabel::Bits(bits)
    }
}

fn bits_to_index<I, F>(bits: I, label: F) -> Result<u64>
where
    I: IntoIterator<Item = u8>,
    F: Fn() -> String,
{
    let mut value: u64 = 0;
    let mut width = 0usize;
    for bit in bits {
        if bit > 1 {
            return Err(OracleError::MalformedLabel {
                label: label(),
                reason: format!("symbol {} is not a bit", bit),
            });
        }
        width += 1;
        if width > 64 {
            return Err(OracleError::MalformedLabel {
                label: label(),
                reason: "label wider than 64 bits".to_string(),
            });
        }
        value = (value << 1) | u64::from(bit);
    }

    if width == 0 {
        return Err(OracleError::MalformedLabel {
            label: label(),
            reason: "label has no bits".to_string(),
        });
    }

    Ok(value)
}

/// Raw outcome counts in the order the backend reported them
pub type RawCounts = Vec<(RawLabel, u64)>;

/// Canonical outcome distribution: outcome index → occurrence count, sorted by index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution {
    counts: BTreeMap<u64, u64>,
}

impl Distribution {
    /// Total number of shots represented, saturating at `u64::MAX`
    pub fn total(&self) -> u64 {
        self.counts.values().fold(0, |acc, &c| acc.saturating_add(c))
    }

    /// Occurrence count for an outcome index (0 when absent)
    pub fn count(&self, index: u64) -> u64 {
        self.counts.get(&index).copied().unwrap_or(0)
    }

    /// Entries in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.counts.iter().map(|(&k, &v)| (k, v))
    }

    /// Number of distinct outcomes observed
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Largest observed outcome index
    pub fn max_index(&self) -> Option<u64> {
        self.counts.keys().next_back().copied()
    }

    /// Flat sample: each index repeated by its count, ascending
    ///
    /// Allocates `total()` entries; callers bound the total first.
    pub fn to_samples(&self) -> Vec<u64> {
        let mut samples = Vec::with_capacity(self.total() as usize);
        for (index, count) in self.iter() {
            samples.extend(std::iter::repeat(index).take(count as usize));
        }
        samples
    }
}

impl FromIterator<(u64, u64)> for Distribution {
    fn from_iter<T: IntoIterator<Item = (u64, u64)>>(iter: T) -> Self {
        let mut counts = BTreeMap::new();
        for (index, count) in iter {
            let slot = counts.entry(index).or_insert(0u64);
            *slot = slot.saturating_add(count);
        }
        Distribution { counts }
    }
}

/// Convert raw backend counts into a canonical [`Distribution`]
///
/// Labels that map to the same integer (e.g. `"01 1"` and `[0, 1, 1]`) are summed.
/// A sum past `u64::MAX` fails with [`OracleError::CountOverflow`].
///
/// # Example
/// ```
/// use difftriage::normalize::{normalize, RawLabel};
///
/// let raw = vec![(RawLabel::from("1 1"), 300), (RawLabel::from("00"), 700)];
/// let dist = normalize(&raw).unwrap();
/// assert_eq!(dist.iter().collect::<Vec<_>>(), vec![(0, 700), (3, 300)]);
/// ```
pub fn normalize(raw: &[(RawLabel, u64)]) -> Result<Distribution> {
    let mut counts = BTreeMap::new();
    for (label, count) in raw {
        let index = label.to_index()?;
        let slot = counts.entry(index).or_insert(0u64);
        *slot = slot
            .checked_add(*count)
            .ok_or(OracleError::CountOverflow { index })?;
    }
    Ok(Distribution { counts })
}
