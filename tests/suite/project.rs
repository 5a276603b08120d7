//! Project resolution against real directory layouts.

use std::sync::Arc;

use lintlens_config::{ConfigOverrides, ConfigWarning, LintConfigLocation, Settings, resolve_project};
use lintlens_engine::{Aggregator, DiagnosticFilters};
use lintlens_producers::{LiveDiagnosticsStore, ProducerOutput, RawSeverity};

use crate::common::{ScriptedProducer, Workspace, raw};

#[test]
fn nuxt_project_uses_vue_checker_and_excludes_build_dirs() {
    let workspace = Workspace::typescript().with_file("nuxt.config.ts", "export default {}");
    let project = resolve_project(workspace.root(), &ConfigOverrides::default());
    assert_eq!(project.framework().map(|f| f.name()), Some("Nuxt"));
    assert!(project.uses_vue_checker());
    assert!(project.framework_excludes().iter().any(|p| p == "**/.nuxt/**"));
}

#[test]
fn legacy_lint_config_from_manifest() {
    let workspace = Workspace::new().with_file(
        "package.json",
        r#"{ "name": "app", "eslintConfig": { "extends": "eslint:recommended" } }"#,
    );
    let project = resolve_project(workspace.root(), &ConfigOverrides::default());
    assert!(matches!(
        project.lint_config(),
        Some(LintConfigLocation::PackageManifest(_))
    ));
    assert_eq!(project.framework().map(|f| f.name()), Some("JavaScript"));
    assert!(project.type_check_config().is_none());
}

#[test]
fn missing_override_falls_back_with_warning() {
    let workspace = Workspace::typescript();
    let overrides = ConfigOverrides {
        type_check_config: Some("configs/tsconfig.strict.json".into()),
        lint_config: None,
    };
    let project = resolve_project(workspace.root(), &overrides);
    assert_eq!(
        project.type_check_config(),
        Some(workspace.path("tsconfig.json").as_path())
    );
    assert!(
        project
            .warnings()
            .iter()
            .any(|w| matches!(w, ConfigWarning::OverrideNotFound { .. }))
    );
}

#[test]
fn settings_file_in_workspace_wins_over_defaults() {
    let workspace = Workspace::typescript().with_file(
        ".lintlens.toml",
        "[view]\ngroup_by = \"rule\"\n\n[refresh]\ndebounce_ms = 250\n",
    );
    let (settings, source) = Settings::discover(workspace.root(), None).unwrap();
    assert_eq!(source, Some(workspace.path(".lintlens.toml")));
    assert_eq!(settings.view.group_by, lintlens_types::GroupMode::Rule);
    assert_eq!(settings.refresh.debounce_ms, 250);
    assert_eq!(settings.refresh.follow_up_delay_ms, 100);
}

#[tokio::test]
async fn framework_excludes_apply_during_collection() {
    let workspace = Workspace::typescript().with_file("angular.json", "{}");
    let mut output = ProducerOutput::default();
    output.push(
        ".angular/cache/vendor.js".into(),
        raw(RawSeverity::Error, 1, "cached", None),
    );
    output.push("src/app.ts".into(), raw(RawSeverity::Error, 1, "real", None));

    let aggregator = Aggregator::new(
        ScriptedProducer::new("typecheck", ProducerOutput::default()),
        ScriptedProducer::new("lint", output),
        Arc::new(LiveDiagnosticsStore::new()),
    );
    let project = resolve_project(workspace.root(), &ConfigOverrides::default());
    let collection = aggregator
        .collect(&project, &DiagnosticFilters::default())
        .await
        .unwrap();
    let messages: Vec<&str> = collection.records.iter().map(|r| r.message()).collect();
    assert_eq!(messages, ["real"]);
}
