//! Refresh coordinator driven through its public surface on paused time.

use std::sync::Arc;
use std::time::Duration;

use lintlens_config::{ConfigOverrides, Settings, resolve_project};
use lintlens_engine::{Aggregator, Phase, RefreshCoordinator};
use lintlens_producers::{LiveDiagnosticsStore, ProducerOutput, RawSeverity};
use lintlens_types::{BadgeState, GroupMode};

use crate::common::{RecordingHost, ScriptedProducer, Workspace, raw};

struct Harness {
    workspace: Workspace,
    coordinator: RefreshCoordinator,
    host: Arc<RecordingHost>,
    type_check: Arc<ScriptedProducer>,
    lint: Arc<ScriptedProducer>,
}

fn lint_output(errors: usize) -> ProducerOutput {
    let mut output = ProducerOutput::default();
    for line in 1..=errors {
        output.push(
            "src/main.ts".into(),
            raw(RawSeverity::Error, line as u32, "no-undef", Some("no-undef")),
        );
    }
    output.push(
        "src/util.ts".into(),
        raw(RawSeverity::Warning, 1, "prefer-const", Some("prefer-const")),
    );
    output
}

fn harness(workspace: Workspace, scan_time: Duration) -> Harness {
    let host = RecordingHost::new();
    let type_check = ScriptedProducer::new("typecheck", ProducerOutput::default());
    let lint = ScriptedProducer::delayed("lint", lint_output(2), scan_time);
    let aggregator = Aggregator::new(
        type_check.clone(),
        lint.clone(),
        Arc::new(LiveDiagnosticsStore::new()),
    );
    let settings = Settings::default();
    let project = resolve_project(
        workspace.root(),
        &ConfigOverrides::from(&settings.producers),
    );
    let coordinator = RefreshCoordinator::new(aggregator, project, &settings, host.sinks());
    Harness {
        workspace,
        coordinator,
        host,
        type_check,
        lint,
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn save_burst_collapses_into_one_scan() {
    let h = harness(Workspace::typescript(), Duration::from_millis(20));
    for _ in 0..10 {
        h.coordinator.request_refresh();
        advance(30).await;
    }
    assert_eq!(h.lint.calls(), 0);
    advance(600).await;
    assert_eq!(h.lint.calls(), 1);
    assert_eq!(h.coordinator.scans_started(), 1);
    assert_eq!(h.coordinator.snapshot().view.flat().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn busy_scan_gets_exactly_one_follow_up() {
    let h = harness(Workspace::typescript(), Duration::from_millis(2_000));
    h.coordinator.request_refresh_immediate();
    advance(10).await;
    for _ in 0..20 {
        h.coordinator.request_refresh();
        advance(50).await;
    }
    assert_eq!(h.lint.calls(), 1);
    advance(10_000).await;
    assert_eq!(h.lint.calls(), 2);
    assert_eq!(h.coordinator.snapshot().phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn badge_follows_error_count() {
    let h = harness(Workspace::typescript(), Duration::from_millis(10));
    h.coordinator.request_refresh_immediate();
    assert!(matches!(
        h.host.last_badge(),
        Some(BadgeState::Scanning { .. })
    ));
    advance(50).await;
    assert_eq!(h.host.last_badge().and_then(|b| b.value()), Some(2));

    h.lint.set_output(lint_output(0));
    h.coordinator.request_refresh_immediate();
    advance(50).await;
    assert_eq!(h.host.last_badge(), Some(BadgeState::Clear));
    assert_eq!(h.coordinator.snapshot().view.flat().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_blanks_the_tree_until_resumed() {
    let h = harness(Workspace::typescript(), Duration::from_millis(10));
    h.coordinator.request_refresh_immediate();
    advance(50).await;
    let changes_before = h.host.change_count();

    assert!(h.coordinator.toggle_pause());
    assert!(h.coordinator.snapshot().view.is_empty());
    assert!(h.host.change_count() > changes_before);

    h.coordinator.request_refresh();
    h.coordinator.request_refresh_immediate();
    advance(1_000).await;
    assert_eq!(h.lint.calls(), 1);

    assert!(!h.coordinator.toggle_pause());
    advance(50).await;
    assert_eq!(h.lint.calls(), 2);
    assert_eq!(h.coordinator.snapshot().view.flat().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn revalidation_picks_up_new_type_check_config() {
    let workspace = Workspace::new().with_file("eslint.config.js", "export default [];");
    let h = harness(workspace, Duration::ZERO);
    h.coordinator.request_refresh_immediate();
    advance(10).await;
    assert_eq!(h.type_check.calls(), 0);

    h.workspace.write("tsconfig.json", "{}");
    h.coordinator.revalidate_config();
    advance(10).await;
    assert_eq!(h.type_check.calls(), 1);
    assert_eq!(
        h.coordinator.project().type_check_config(),
        Some(h.workspace.path("tsconfig.json").as_path())
    );
}

#[tokio::test(start_paused = true)]
async fn navigation_walks_the_flat_list() {
    let h = harness(Workspace::typescript(), Duration::ZERO);
    h.coordinator.request_refresh_immediate();
    advance(10).await;

    let first = h.coordinator.navigate_next().unwrap();
    let second = h.coordinator.navigate_next().unwrap();
    let third = h.coordinator.navigate_next().unwrap();
    let wrapped = h.coordinator.navigate_next().unwrap();
    assert_eq!(first.range().start_line(), 0);
    assert_eq!(second.range().start_line(), 1);
    assert_eq!(third.file_path(), h.workspace.path("src/util.ts"));
    assert_eq!(wrapped, first);
    assert_eq!(h.host.revealed.lock().unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn regrouping_does_not_rescan() {
    let h = harness(Workspace::typescript(), Duration::ZERO);
    h.coordinator.request_refresh_immediate();
    advance(10).await;

    h.coordinator.set_group_mode(GroupMode::Rule);
    let view = h.coordinator.snapshot().view;
    let labels: Vec<&str> = view.roots().iter().map(|n| n.label()).collect();
    assert_eq!(labels, ["lint: no-undef", "lint: prefer-const"]);
    assert_eq!(h.lint.calls(), 1);
}

async fn wait_for_idle(coordinator: &RefreshCoordinator, scans: u64) {
    for _ in 0..1_000 {
        let snapshot = coordinator.snapshot();
        if coordinator.scans_started() == scans && snapshot.phase == Phase::Idle {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("scan {scans} never finished");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn finished_scan_badge_is_never_overtaken_across_workers() {
    let h = harness(Workspace::typescript(), Duration::ZERO);
    for scan in 1..=50 {
        h.coordinator.request_refresh_immediate();
        wait_for_idle(&h.coordinator, scan).await;
        // let any in-progress delivery drain
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(
            h.host.last_badge().and_then(|b| b.value()),
            Some(2),
            "scan {scan} left {:?}",
            h.host.last_badge()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pause_toggles_never_cancel_out() {
    let h = harness(Workspace::typescript(), Duration::ZERO);
    let toggles: Vec<_> = (0..64)
        .map(|_| {
            let coordinator = h.coordinator.clone();
            tokio::spawn(async move { coordinator.toggle_pause() })
        })
        .collect();
    let mut paused_results = 0;
    for toggle in toggles {
        if toggle.await.unwrap() {
            paused_results += 1;
        }
    }
    // every toggle saw the previous one, so half of them paused
    assert_eq!(paused_results, 32);
    assert!(!h.coordinator.is_paused());
}
