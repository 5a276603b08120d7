//! Aggregation and grouping end to end, with scripted producers.

use std::path::PathBuf;
use std::sync::Arc;

use lintlens_config::{ProjectConfig, ScanMode, Settings, resolve_project};
use lintlens_engine::{Aggregator, DiagnosticFilters, GroupedView, ScanError, group};
use lintlens_producers::{LiveDiagnosticsStore, ProducerError, ProducerOutput, RawSeverity};
use lintlens_types::{GroupMode, Severity};

use crate::common::{ScriptedProducer, Workspace, raw};

fn lint_output() -> ProducerOutput {
    let mut output = ProducerOutput::default();
    output.push(
        "packages/app/src/main.ts".into(),
        raw(RawSeverity::Warning, 3, "Expected '==='", Some("eqeqeq")),
    );
    output.push(
        "packages/app/dist/index.js".into(),
        raw(RawSeverity::Error, 1, "built output", Some("no-undef")),
    );
    output.push(
        "packages/app/distinct/index.js".into(),
        raw(RawSeverity::Error, 1, "real source", Some("no-undef")),
    );
    output
}

fn type_check_output() -> ProducerOutput {
    let mut output = ProducerOutput::default();
    output.push(
        "packages/app/src/main.ts".into(),
        raw(RawSeverity::Error, 7, "Type mismatch", None),
    );
    output.global.push(raw(RawSeverity::Error, 1, "Cannot find global type 'Array'.", None));
    output
}

async fn collect_records(
    workspace: &Workspace,
    filters: &DiagnosticFilters,
) -> (Vec<Arc<lintlens_types::DiagnosticRecord>>, usize, Vec<ProducerError>) {
    let aggregator = Aggregator::new(
        ScriptedProducer::new("typecheck", type_check_output()),
        ScriptedProducer::new("lint", lint_output()),
        Arc::new(LiveDiagnosticsStore::new()),
    );
    let project = resolve_project(workspace.root(), &Default::default());
    let collection = aggregator.collect(&project, filters).await.unwrap();
    (
        collection.records.into_iter().map(Arc::new).collect(),
        collection.global.len(),
        collection.failures,
    )
}

fn filters_with_exclude(patterns: &[&str]) -> DiagnosticFilters {
    let mut settings = Settings::default();
    settings.filters.exclude = patterns.iter().map(ToString::to_string).collect();
    DiagnosticFilters::from(&settings)
}

fn messages(view: &GroupedView) -> Vec<&str> {
    view.flat().iter().map(|r| r.message()).collect()
}

#[tokio::test]
async fn dist_exclusion_keeps_lookalike_directories() {
    let workspace = Workspace::typescript();
    let (records, _, _) = collect_records(&workspace, &filters_with_exclude(&["**/dist/**"])).await;
    let view = group(&records, GroupMode::File, workspace.root());

    let labels: Vec<&str> = view.roots().iter().map(|n| n.label()).collect();
    assert_eq!(
        labels,
        ["packages/app/distinct/index.js", "packages/app/src/main.ts"]
    );
    assert!(!messages(&view).contains(&"built output"));
    assert!(messages(&view).contains(&"real source"));
}

#[tokio::test]
async fn program_wide_diagnostics_never_become_leaves() {
    let workspace = Workspace::typescript();
    let (records, global, failures) = collect_records(&workspace, &DiagnosticFilters::default()).await;
    assert_eq!(global, 1);
    assert!(failures.is_empty());
    for mode in [GroupMode::File, GroupMode::Rule, GroupMode::Both] {
        let view = group(&records, mode, workspace.root());
        assert!(!messages(&view).contains(&"Cannot find global type 'Array'."));
        assert_eq!(view.flat().len(), 4);
        assert_eq!(view.leaf_count(), 4);
    }
}

#[tokio::test]
async fn warnings_hidden_errors_kept() {
    let workspace = Workspace::typescript();
    let mut filters = DiagnosticFilters::default();
    filters.show_warnings = false;
    let (records, _, _) = collect_records(&workspace, &filters).await;
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.severity() == Severity::Error));
}

#[tokio::test]
async fn rule_grouping_labels_sources_and_codes() {
    let workspace = Workspace::typescript();
    let (records, _, _) = collect_records(&workspace, &DiagnosticFilters::default()).await;
    let view = group(&records, GroupMode::Rule, workspace.root());
    let labels: Vec<&str> = view.roots().iter().map(|n| n.label()).collect();
    assert_eq!(labels, ["lint: eqeqeq", "lint: no-undef", "typecheck"]);
    assert_eq!(view.roots()[1].leaf_count(), 2);
}

#[tokio::test]
async fn both_mode_partitions_like_file_mode() {
    let workspace = Workspace::typescript();
    let (records, _, _) = collect_records(&workspace, &DiagnosticFilters::default()).await;
    let by_file = group(&records, GroupMode::File, workspace.root());
    let both = group(&records, GroupMode::Both, workspace.root());

    assert_eq!(by_file.roots().len(), both.roots().len());
    for (file, nested) in by_file.roots().iter().zip(both.roots()) {
        assert_eq!(file.label(), nested.label());
        assert_eq!(file.leaf_count(), nested.leaf_count());
        assert!(nested.children().iter().all(|c| !c.is_leaf()));
    }
    let mut a = messages(&by_file);
    let mut b = messages(&both);
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
}

#[tokio::test]
async fn failing_producer_does_not_sink_the_scan() {
    let workspace = Workspace::typescript();
    let aggregator = Aggregator::new(
        ScriptedProducer::failing(
            "typecheck",
            ProducerError::EngineNotFound {
                producer: "typecheck".to_string(),
                engine: "tsc".to_string(),
            },
        ),
        ScriptedProducer::new("lint", lint_output()),
        Arc::new(LiveDiagnosticsStore::new()),
    );
    let project = resolve_project(workspace.root(), &Default::default());
    let collection = aggregator
        .collect(&project, &DiagnosticFilters::default())
        .await
        .unwrap();
    assert_eq!(collection.records.len(), 3);
    assert_eq!(collection.failures.len(), 1);
    assert_eq!(collection.failures[0].producer(), "typecheck");
}

#[tokio::test]
async fn lint_request_carries_resolved_config() {
    let workspace = Workspace::typescript();
    let lint = ScriptedProducer::new("lint", ProducerOutput::default());
    let type_check = ScriptedProducer::new("typecheck", ProducerOutput::default());
    let aggregator = Aggregator::new(
        type_check.clone(),
        lint.clone(),
        Arc::new(LiveDiagnosticsStore::new()),
    );
    let project = resolve_project(workspace.root(), &Default::default());
    aggregator
        .collect(&project, &DiagnosticFilters::default())
        .await
        .unwrap();

    assert_eq!(
        lint.last_request().unwrap().config_path,
        Some(workspace.path("eslint.config.js"))
    );
    assert_eq!(
        type_check.last_request().unwrap().config_path,
        Some(workspace.path("tsconfig.json"))
    );
}

#[tokio::test]
async fn type_check_skipped_without_config() {
    let workspace = Workspace::new().with_file("package.json", "{}");
    let type_check = ScriptedProducer::new("typecheck", type_check_output());
    let aggregator = Aggregator::new(
        type_check.clone(),
        ScriptedProducer::new("lint", ProducerOutput::default()),
        Arc::new(LiveDiagnosticsStore::new()),
    );
    let project = resolve_project(workspace.root(), &Default::default());
    let collection = aggregator
        .collect(&project, &DiagnosticFilters::default())
        .await
        .unwrap();
    assert_eq!(type_check.calls(), 0);
    assert!(collection.records.is_empty());
}

#[tokio::test]
async fn open_files_mode_reads_live_store_only() {
    let workspace = Workspace::typescript();
    let live = Arc::new(LiveDiagnosticsStore::new());
    live.update(
        workspace.path("src/open.ts"),
        vec![raw(RawSeverity::Error, 2, "live finding", Some("2304"))],
    );
    let type_check = ScriptedProducer::new("typecheck", type_check_output());
    let lint = ScriptedProducer::new("lint", lint_output());
    let aggregator = Aggregator::new(type_check.clone(), lint.clone(), live);

    let mut filters = DiagnosticFilters::default();
    filters.scan_mode = ScanMode::OpenFiles;
    let project = resolve_project(workspace.root(), &Default::default());
    let collection = aggregator.collect(&project, &filters).await.unwrap();

    assert_eq!(type_check.calls() + lint.calls(), 0);
    assert_eq!(collection.records.len(), 1);
    assert_eq!(collection.records[0].message(), "live finding");
    assert_eq!(collection.records[0].range().start_line(), 1);
}

#[tokio::test]
async fn missing_workspace_is_a_scan_error() {
    let aggregator = Aggregator::new(
        ScriptedProducer::new("typecheck", ProducerOutput::default()),
        ScriptedProducer::new("lint", ProducerOutput::default()),
        Arc::new(LiveDiagnosticsStore::new()),
    );
    let project = ProjectConfig::bare(PathBuf::from("/definitely/not/here"));
    let result = aggregator
        .collect(&project, &DiagnosticFilters::default())
        .await;
    assert!(matches!(result, Err(ScanError::WorkspaceUnavailable(_))));
}
