//! Plain-text rendering of the grouped diagnostics tree.

use std::fmt::Write as _;
use std::path::Path;

use lintlens_engine::GroupedView;
use lintlens_engine::exclude::relative_slash_path;
use lintlens_types::{BadgeState, DiagnosticRecord, DisplayNode};

const INDENT: &str = "  ";

fn leaf_line(record: &DiagnosticRecord) -> String {
    let range = record.range();
    let origin = match record.code() {
        Some(code) => format!("{}/{code}", record.source()),
        None => record.source().to_string(),
    };
    // First line only; continuation lines would break the tree layout.
    let message = record.message().lines().next().unwrap_or_default();
    format!(
        "{}:{} {} {message} [{origin}]",
        range.start_line() + 1,
        range.start_col() + 1,
        record.severity(),
    )
}

fn render_node(
    node: &DisplayNode,
    depth: usize,
    selected: Option<usize>,
    leaf_index: &mut usize,
    out: &mut String,
) {
    let indent = INDENT.repeat(depth);
    match node {
        DisplayNode::Leaf { record, .. } => {
            let marker = if selected == Some(*leaf_index) { ">" } else { " " };
            let _ = writeln!(out, "{marker}{indent}{}", leaf_line(record));
            *leaf_index += 1;
        }
        DisplayNode::FileGroup { label, children, .. }
        | DisplayNode::RuleGroup { label, children } => {
            let _ = writeln!(out, " {indent}{label} ({})", node.leaf_count());
            for child in children {
                render_node(child, depth + 1, selected, leaf_index, out);
            }
        }
    }
}

/// Render the tree, marking the leaf at flat index `selected` with `>`.
pub fn tree(view: &GroupedView, selected: Option<usize>) -> String {
    let mut out = String::new();
    let mut leaf_index = 0;
    for root in view.roots() {
        render_node(root, 0, selected, &mut leaf_index, &mut out);
    }
    out
}

/// One-line summary, e.g. `3 problems (E:2 W:1)`.
pub fn summary(view: &GroupedView) -> String {
    let counts = view.counts();
    match counts.total() {
        0 => "No problems".to_string(),
        1 => format!("1 problem ({})", counts.status_string()),
        n => format!("{n} problems ({})", counts.status_string()),
    }
}

pub fn badge(badge: &BadgeState) -> Option<String> {
    match badge {
        BadgeState::Scanning { tooltip } => Some(tooltip.clone()),
        BadgeState::Count { tooltip, value } => Some(format!("[{value}] {tooltip}")),
        BadgeState::Clear => None,
    }
}

/// `path:line:col: severity: [source/code] message`, path relative to `root`.
pub fn location(record: &DiagnosticRecord, root: &Path) -> String {
    let relative = relative_slash_path(root, record.file_path());
    record.display_with_path(Path::new(&relative))
}
