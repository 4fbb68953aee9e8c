//! Structured backend diagnostics
//!
//! Some compilers report problems with the generated input in a structured
//! form (message plus source location). Those are properties of the test
//! program, not of the pipeline, and are rendered for the user instead of
//! being counted as bugs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

/// A backend-reported, diagnosable problem with the input program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Human-readable message
    pub message: String,

    /// Diagnostic category reported by the backend (e.g. "GuppyTypeError")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Source file the location refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// 1-based line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// 1-based column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,

    /// Offending source line, if the backend supplied it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            kind: None,
            file: None,
            line: None,
            column: None,
            snippet: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: usize, column: usize) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Offending source line: the backend's snippet, else read from `file`
    fn source_line(&self) -> Option<String> {
        if let Some(snippet) = &self.snippet {
            return Some(snippet.clone());
        }
        let (file, line) = (self.file.as_ref()?, self.line?);
        let content = fs::read_to_string(file).ok()?;
        content.lines().nth(line.checked_sub(1)?).map(str::to_string)
    }

    /// Render as a compiler-style report with a caret under the column
    ///
    /// ```text
    /// error[GuppyTypeError]: expected qubit, got bit
    ///   --> circuit3.py:12:9
    ///    |
    /// 12 |     cx(q0, b1)
    ///    |         ^
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        match &self.kind {
            Some(kind) => out.push_str(&format!("error[{}]: {}\n", kind, self.message)),
            None => out.push_str(&format!("error: {}\n", self.message)),
        }

        let Some(file) = &self.file else {
            return out;
        };

        let line_label = self.line.map(|l| l.to_string()).unwrap_or_default();
        let gutter = " ".repeat(line_label.len());
        match (self.line, self.column) {
            (Some(line), Some(col)) => {
                out.push_str(&format!("{}--> {}:{}:{}\n", gutter, file, line, col))
            }
            (Some(line), None) => out.push_str(&format!("{}--> {}:{}\n", gutter, file, line)),
            _ => out.push_str(&format!("{}--> {}\n", gutter, file)),
        }

        if let Some(source) = self.source_line() {
            out.push_str(&format!("{} |\n", gutter));
            out.push_str(&format!("{} | {}\n", line_label, source));
            if let Some(col) = self.column {
                out.push_str(&format!(
                    "{} | {}^\n",
                    gutter,
                    " ".repeat(col.saturating_sub(1))
                ));
            }
        }

        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{}: {}", kind, self.message),
            None => f.write_str(&self.message),
        }
    }
}
