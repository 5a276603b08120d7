//! Normalized diagnostic records.
//!
//! A [`DiagnosticRecord`] is the single currency passed from the aggregator to
//! the grouping engine. Fields are private; the only construction path is
//! [`DiagnosticRecord::new`], so a record cannot change after it is built.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Hint => "hint",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 0-based range inside a file. The end position is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct TextRange {
    start_line: u32,
    start_col: u32,
    end_line: u32,
    end_col: u32,
}

impl TextRange {
    /// Build a range, collapsing an end that precedes the start onto the start.
    #[must_use]
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        let (end_line, end_col) = if (end_line, end_col) < (start_line, start_col) {
            (start_line, start_col)
        } else {
            (end_line, end_col)
        };
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Zero-width range at a single position.
    #[must_use]
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    #[must_use]
    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    #[must_use]
    pub fn start_col(&self) -> u32 {
        self.start_col
    }

    #[must_use]
    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    #[must_use]
    pub fn end_col(&self) -> u32 {
        self.end_col
    }
}

/// A single diagnostic, normalized across producers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    file_path: PathBuf,
    range: TextRange,
    severity: Severity,
    message: String,
    /// Producer identifier (e.g. "typecheck", "lint").
    source: String,
    /// Rule id or error code.
    code: Option<String>,
}

impl DiagnosticRecord {
    #[must_use]
    pub fn new(
        file_path: PathBuf,
        range: TextRange,
        severity: Severity,
        message: String,
        source: String,
        code: Option<String>,
    ) -> Self {
        Self {
            file_path,
            range,
            severity,
            message,
            source,
            code,
        }
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    #[must_use]
    pub fn range(&self) -> TextRange {
        self.range
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Format as `path:line:col: severity: [source/code] message` (1-indexed for display).
    ///
    /// `path` is whatever the caller wants shown, typically the root-relative path.
    #[must_use]
    pub fn display_with_path(&self, path: &Path) -> String {
        let origin = match &self.code {
            Some(code) => format!("{}/{code}", self.source),
            None => self.source.clone(),
        };
        format!(
            "{}:{}:{}: {}: [{origin}] {}",
            path.display(),
            self.range.start_line + 1,
            self.range.start_col + 1,
            self.severity.label(),
            self.message,
        )
    }
}

/// Per-severity tallies over a set of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hints: usize,
}

impl SeverityCounts {
    #[must_use]
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a DiagnosticRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.severity() {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.infos += 1,
                Severity::Hint => counts.hints += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos + self.hints
    }

    /// Compact status string like "E:3 W:5"; empty when there is nothing to report.
    #[must_use]
    pub fn status_string(&self) -> String {
        if self.total() == 0 {
            return String::new();
        }
        format!("E:{} W:{}", self.errors, self.warnings)
    }
}
