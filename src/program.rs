//! Program under test
//!
//! The oracle never looks inside a program. It only needs a stable number to
//! key artifacts by and the path where the generator materialized the source,
//! which backends read and the artifact store copies.

use crate::error::{OracleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A generated test program, identified by its circuit number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Program {
    pub circuit_number: u64,
    pub source: PathBuf,
}

impl Program {
    pub fn new(circuit_number: u64, source: impl Into<PathBuf>) -> Self {
        Program {
            circuit_number,
            source: source.into(),
        }
    }

    /// File extension of the source, `py` when absent
    pub fn extension(&self) -> &str {
        self.source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("py")
    }
}

/// Number a batch of source paths
///
/// A `circuit{N}` stem keeps `N`, and two sources claiming the same `N` are
/// rejected. Every other source takes the smallest number no stem claims.
///
/// # Example
/// ```
/// use difftriage::program::number_programs;
///
/// let programs = number_programs(&["out/bell.py", "out/circuit1.py"]).unwrap();
/// assert_eq!(programs[0].circuit_number, 2);
/// assert_eq!(programs[1].circuit_number, 1);
/// ```
pub fn number_programs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Program>> {
    let mut claimed: HashMap<u64, &Path> = HashMap::new();
    for path in paths {
        let path: &Path = path.as_ref();
        if let Some(number) = circuit_number_from_path(path) {
            if let Some(previous) = claimed.insert(number, path) {
                return Err(OracleError::Config(format!(
                    "Duplicate circuit number {}: {} and {}",
                    number,
                    previous.display(),
                    path.display()
                )));
            }
        }
    }

    let mut next = 1u64;
    let programs = paths
        .iter()
        .map(|path| {
            let path: &Path = path.as_ref();
            let number = circuit_number_from_path(path).unwrap_or_else(|| {
                while claimed.contains_key(&next) {
                    next += 1;
                }
                next += 1;
                next - 1
            });
            Program::new(number, path)
        })
        .collect();
    Ok(programs)
}

/// Parse `N` out of a `circuit{N}.*` path
pub fn circuit_number_from_path(path: &Path) -> Option<u64> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("circuit")?
        .parse()
        .ok()
}
