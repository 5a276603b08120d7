//! Engine discovery.
//!
//! Producers prefer the project's own copy of an engine over whatever is
//! installed globally, so a workspace pinned to an older compiler is checked
//! with that compiler.

use std::path::{Path, PathBuf};

/// Resolves an engine binary name to an executable path.
pub trait EngineLocator: Send + Sync {
    fn locate(&self, engine: &str, workspace_root: &Path) -> Option<PathBuf>;
}

/// Searches `node_modules/.bin` from the workspace root upward, then `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeModulesLocator;

impl EngineLocator for NodeModulesLocator {
    fn locate(&self, engine: &str, workspace_root: &Path) -> Option<PathBuf> {
        for dir in workspace_root.ancestors() {
            let bin_dir = dir.join("node_modules").join(".bin");
            if !bin_dir.is_dir() {
                continue;
            }
            if let Ok(path) = which::which_in(engine, Some(&bin_dir), workspace_root) {
                tracing::debug!(engine, path = %path.display(), "Using project-local engine");
                return Some(path);
            }
        }
        let path = which::which(engine).ok()?;
        tracing::debug!(engine, path = %path.display(), "Using engine from PATH");
        Some(path)
    }
}
