//! Display-side types: the grouped tree, group modes and badge state.
//!
//! These are pure data; the grouping engine in `lintlens-engine` builds them
//! and the host renders them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::diagnostic::DiagnosticRecord;

/// How the diagnostic list is arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    /// One group per file.
    #[default]
    #[serde(alias = "byfile")]
    File,
    /// One group per `(source, code)` pair.
    #[serde(alias = "byrule")]
    Rule,
    /// Files first, then rules inside each file.
    Both,
}

impl GroupMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Rule => "rule",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for GroupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown group mode '{0}' (expected file, rule or both)")]
pub struct ParseGroupModeError(String);

impl FromStr for GroupMode {
    type Err = ParseGroupModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "byfile" => Ok(Self::File),
            "rule" | "byrule" => Ok(Self::Rule),
            "both" => Ok(Self::Both),
            other => Err(ParseGroupModeError(other.to_string())),
        }
    }
}

/// A node in the displayed diagnostics tree.
///
/// Group nodes own their children in sort order. A leaf wraps exactly one
/// record; `file_uri` is shared with every other leaf from the same file.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayNode {
    FileGroup {
        label: String,
        path: PathBuf,
        children: Vec<DisplayNode>,
    },
    RuleGroup {
        label: String,
        children: Vec<DisplayNode>,
    },
    Leaf {
        record: Arc<DiagnosticRecord>,
        file_uri: Option<Arc<Url>>,
    },
}

impl DisplayNode {
    /// Label shown for the node. Leaves use their message.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::FileGroup { label, .. } | Self::RuleGroup { label, .. } => label,
            Self::Leaf { record, .. } => record.message(),
        }
    }

    #[must_use]
    pub fn children(&self) -> &[DisplayNode] {
        match self {
            Self::FileGroup { children, .. } | Self::RuleGroup { children, .. } => children,
            Self::Leaf { .. } => &[],
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// The wrapped record, for leaves only.
    #[must_use]
    pub fn record(&self) -> Option<&Arc<DiagnosticRecord>> {
        match self {
            Self::Leaf { record, .. } => Some(record),
            _ => None,
        }
    }

    /// The file a file group stands for.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::FileGroup { path, .. } => Some(path),
            Self::Leaf { record, .. } => Some(record.file_path()),
            Self::RuleGroup { .. } => None,
        }
    }

    /// Number of leaves at or below this node.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            _ => self.children().iter().map(DisplayNode::leaf_count).sum(),
        }
    }

    /// Depth-first, left-to-right walk collecting leaf records into `out`.
    pub fn collect_leaves(&self, out: &mut Vec<Arc<DiagnosticRecord>>) {
        match self {
            Self::Leaf { record, .. } => out.push(Arc::clone(record)),
            _ => {
                for child in self.children() {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// Badge shown on the host's tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeState {
    /// A scan is running; no number is shown.
    Scanning { tooltip: String },
    /// Number of error diagnostics in the current list.
    Count { tooltip: String, value: usize },
    /// No badge at all.
    Clear,
}

impl BadgeState {
    pub const SCANNING_TOOLTIP: &'static str = "Scanning for problems...";

    #[must_use]
    pub fn scanning() -> Self {
        Self::Scanning {
            tooltip: Self::SCANNING_TOOLTIP.to_string(),
        }
    }

    /// Badge for `errors` error-severity diagnostics; zero clears it.
    #[must_use]
    pub fn for_errors(errors: usize) -> Self {
        match errors {
            0 => Self::Clear,
            1 => Self::Count {
                tooltip: "1 error".to_string(),
                value: 1,
            },
            n => Self::Count {
                tooltip: format!("{n} errors"),
                value: n,
            },
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<usize> {
        match self {
            Self::Count { value, .. } => Some(*value),
            Self::Scanning { .. } | Self::Clear => None,
        }
    }
}
