//! Pipeline-level failures. Producer failures never show up here; the
//! aggregator absorbs them.

use std::path::PathBuf;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("workspace root {} is not a directory", .0.display())]
    WorkspaceUnavailable(PathBuf),
    #[error("invalid exclude pattern: {0}")]
    InvalidExcludePattern(#[from] regex::Error),
    #[error("scan failed unexpectedly: {0}")]
    FailedUnexpectedly(String),
}
