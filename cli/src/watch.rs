//! Workspace file watching for `lintlens watch`.
//!
//! Raw notify events are batched by `notify-debouncer-mini` and forwarded
//! into a tokio channel. The refresh coordinator does the real debouncing;
//! this only keeps editor save bursts from flooding the channel.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use lintlens_config::affects_resolution;
use lintlens_config::settings::WORKSPACE_SETTINGS_FILE;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use tokio::sync::mpsc::UnboundedSender;

const BATCH_WINDOW: Duration = Duration::from_millis(100);

/// Directories whose contents never feed diagnostics.
const IGNORED_DIRS: &[&str] = &["node_modules", ".git", ".lintlens"];

/// What a batch of file changes means for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceChange {
    /// Source files changed; rescan.
    Sources,
    /// A config or framework marker changed; re-resolve the project first.
    ProjectConfig,
    /// The lintlens settings file changed.
    Settings(PathBuf),
    Error(String),
}

fn is_ignored(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name)),
        _ => false,
    })
}

/// Reduce a batch of changed paths to the strongest change it implies.
pub fn classify(paths: &[PathBuf], settings_file: Option<&Path>) -> Option<WorkspaceChange> {
    let relevant: Vec<&PathBuf> = paths.iter().filter(|p| !is_ignored(p)).collect();
    if relevant.is_empty() {
        return None;
    }
    let settings_hit = relevant.iter().find(|p| {
        settings_file.is_some_and(|s| p.as_path() == s)
            || p.file_name().is_some_and(|n| n == WORKSPACE_SETTINGS_FILE)
    });
    if let Some(path) = settings_hit {
        return Some(WorkspaceChange::Settings((*path).clone()));
    }
    if relevant.iter().any(|p| affects_resolution(p)) {
        return Some(WorkspaceChange::ProjectConfig);
    }
    Some(WorkspaceChange::Sources)
}

/// Keeps the underlying watcher alive; dropping it stops watching.
pub struct WorkspaceWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl WorkspaceWatcher {
    /// Watch `root` recursively, sending classified changes to `tx`.
    pub fn spawn(
        root: &Path,
        settings_file: Option<PathBuf>,
        tx: UnboundedSender<WorkspaceChange>,
    ) -> Result<Self> {
        let mut debouncer = new_debouncer(
            BATCH_WINDOW,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| {
                let change = match result {
                    Ok(events) => {
                        let paths: Vec<PathBuf> = events
                            .into_iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .map(|e| e.path)
                            .collect();
                        classify(&paths, settings_file.as_deref())
                    }
                    Err(e) => Some(WorkspaceChange::Error(e.to_string())),
                };
                if let Some(change) = change {
                    let _ = tx.send(change);
                }
            },
        )
        .context("creating file watcher")?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("watching {}", root.display()))?;
        tracing::info!(root = %root.display(), "Watching workspace");

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}
