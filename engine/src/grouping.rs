//! Grouping engine - arranges records into the display tree.
//!
//! Pure: the same records and mode always produce the same tree. Groups are
//! sorted by label; leaves inside a group keep arrival order. The flat list
//! is the depth-first, left-to-right leaf order of the tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lintlens_types::{DiagnosticRecord, DisplayNode, GroupMode, SeverityCounts};
use url::Url;

use crate::exclude::relative_slash_path;

const UNKNOWN: &str = "unknown";

/// Grouped tree plus its flat navigation order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedView {
    mode: GroupMode,
    roots: Vec<DisplayNode>,
    flat: Vec<Arc<DiagnosticRecord>>,
}

impl GroupedView {
    #[must_use]
    pub fn empty(mode: GroupMode) -> Self {
        Self {
            mode,
            roots: Vec::new(),
            flat: Vec::new(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> GroupMode {
        self.mode
    }

    #[must_use]
    pub fn roots(&self) -> &[DisplayNode] {
        &self.roots
    }

    #[must_use]
    pub fn flat(&self) -> &[Arc<DiagnosticRecord>] {
        &self.flat
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.roots.iter().map(DisplayNode::leaf_count).sum()
    }

    /// Error-severity leaves, which is what the badge shows.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.flat.iter().filter(|r| r.severity().is_error()).count()
    }

    #[must_use]
    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts::tally(self.flat.iter().map(|r| &**r))
    }
}

/// Label for a rule group: `"{source}: {code}"`, or the source alone.
#[must_use]
pub fn rule_label(record: &DiagnosticRecord) -> String {
    let source = if record.source().is_empty() {
        UNKNOWN
    } else {
        record.source()
    };
    match record.code() {
        Some(code) if !code.is_empty() => format!("{source}: {code}"),
        _ => source.to_string(),
    }
}

/// One `Arc<Url>` per file, shared by all of that file's leaves.
#[derive(Default)]
struct UriCache {
    uris: HashMap<PathBuf, Option<Arc<Url>>>,
}

impl UriCache {
    fn get(&mut self, path: &Path) -> Option<Arc<Url>> {
        self.uris
            .entry(path.to_path_buf())
            .or_insert_with(|| Url::from_file_path(path).ok().map(Arc::new))
            .clone()
    }

    fn leaf(&mut self, record: &Arc<DiagnosticRecord>) -> DisplayNode {
        DisplayNode::Leaf {
            record: Arc::clone(record),
            file_uri: self.get(record.file_path()),
        }
    }
}

fn group_by_rule(records: &[Arc<DiagnosticRecord>], uris: &mut UriCache) -> Vec<DisplayNode> {
    let mut order: Vec<(String, Vec<Arc<DiagnosticRecord>>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in records {
        let label = rule_label(record);
        let slot = *index.entry(label.clone()).or_insert_with(|| {
            order.push((label, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(Arc::clone(record));
    }
    order.sort_by(|a, b| a.0.cmp(&b.0));
    order
        .into_iter()
        .map(|(label, members)| DisplayNode::RuleGroup {
            label,
            children: members.iter().map(|r| uris.leaf(r)).collect(),
        })
        .collect()
}

fn group_by_file(
    records: &[Arc<DiagnosticRecord>],
    root: &Path,
    nest_rules: bool,
    uris: &mut UriCache,
) -> Vec<DisplayNode> {
    let mut order: Vec<(PathBuf, Vec<Arc<DiagnosticRecord>>)> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();
    for record in records {
        let path = record.file_path();
        let slot = match index.get(path) {
            Some(&slot) => slot,
            None => {
                order.push((path.to_path_buf(), Vec::new()));
                index.insert(path.to_path_buf(), order.len() - 1);
                order.len() - 1
            }
        };
        order[slot].1.push(Arc::clone(record));
    }

    let mut groups: Vec<(String, PathBuf, Vec<Arc<DiagnosticRecord>>)> = order
        .into_iter()
        .map(|(path, members)| (relative_slash_path(root, &path), path, members))
        .collect();
    // Path breaks ties between files that render to the same label.
    groups.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    groups
        .into_iter()
        .map(|(label, path, members)| {
            let children = if nest_rules {
                group_by_rule(&members, uris)
            } else {
                members.iter().map(|r| uris.leaf(r)).collect()
            };
            DisplayNode::FileGroup {
                label,
                path,
                children,
            }
        })
        .collect()
}

/// Build the display tree and flat list for `records`.
#[must_use]
pub fn group(records: &[Arc<DiagnosticRecord>], mode: GroupMode, root: &Path) -> GroupedView {
    let mut uris = UriCache::default();
    let roots = match mode {
        GroupMode::File => group_by_file(records, root, false, &mut uris),
        GroupMode::Rule => group_by_rule(records, &mut uris),
        GroupMode::Both => group_by_file(records, root, true, &mut uris),
    };
    let mut flat = Vec::with_capacity(records.len());
    for node in &roots {
        node.collect_leaves(&mut flat);
    }
    GroupedView { mode, roots, flat }
}
