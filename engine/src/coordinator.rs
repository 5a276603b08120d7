//! Refresh coordinator - runs the [`ScanState`] machine on tokio.
//!
//! All state lives behind one `std::sync::Mutex` that is never held across
//! an `.await` or while calling into the host. Each entry point:
//! 1. takes the lock and applies a transition,
//! 2. carries out the returned [`RefreshAction`] (arm a timer, spawn a scan),
//! 3. queues side effects, releases the lock, then flushes the queue.
//!
//! Only one caller flushes at a time, so the host sees effects in the order
//! the transitions happened even when tasks run on several workers.
//!
//! At most one scan task exists at any time. A scan always uses the project
//! config, filters and group mode captured when it started.
//!
//! Entry points spawn tasks and must be called from within a tokio runtime.

use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use lintlens_config::{ConfigOverrides, ProjectConfig, Settings, resolve_project};
use lintlens_producers::ProducerError;
use lintlens_types::{BadgeState, DiagnosticRecord, GroupMode};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::aggregator::{Aggregator, DiagnosticFilters};
use crate::error::ScanError;
use crate::grouping::{GroupedView, group};
use crate::host::HostSinks;
use crate::scan_state::{Phase, RefreshAction, RefreshTimings, ScanState};

/// What the display surface pulls after `data_changed`.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub view: Arc<GroupedView>,
    /// Program-wide diagnostics from the last scan. Not part of the tree.
    pub global: Arc<[DiagnosticRecord]>,
    /// Set when the last scan failed outright.
    pub error: Option<String>,
    pub phase: Phase,
    pub paused: bool,
    pub navigation_index: Option<usize>,
}

enum Effect {
    Badge(BadgeState),
    DataChanged,
    ShowError(String),
    Notify(String),
    Reveal(Arc<DiagnosticRecord>),
}

struct ScanOutput {
    records: Arc<[Arc<DiagnosticRecord>]>,
    global: Arc<[DiagnosticRecord]>,
    failures: Vec<ProducerError>,
    view: GroupedView,
}

struct Shared {
    state: ScanState,
    project: Arc<ProjectConfig>,
    overrides: ConfigOverrides,
    filters: Arc<DiagnosticFilters>,
    group_mode: GroupMode,
    /// Records behind the current view, kept for regrouping.
    records: Arc<[Arc<DiagnosticRecord>]>,
    global: Arc<[DiagnosticRecord]>,
    view: Arc<GroupedView>,
    error: Option<String>,
    /// Producers whose failure the user has already been told about.
    notified: HashSet<String>,
    timer: Option<JoinHandle<()>>,
    scan: Option<JoinHandle<()>>,
    scans_started: u64,
    /// Bumped by every revalidation request.
    config_revision: u64,
    /// Effects waiting for delivery, in transition order.
    effects: VecDeque<Effect>,
    /// Set while some caller is delivering `effects`.
    flushing: bool,
}

impl Shared {
    fn clear_results(&mut self) {
        self.records = Arc::from(Vec::new());
        self.global = Arc::from(Vec::new());
        self.view = Arc::new(GroupedView::empty(self.group_mode));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Inner {
    aggregator: Aggregator,
    host: HostSinks,
    shared: Mutex<Shared>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, effect: Effect) {
        match effect {
            Effect::Badge(badge) => self.host.badge.set_badge(badge),
            Effect::DataChanged => self.host.display.data_changed(),
            Effect::ShowError(message) => self.host.display.show_error(&message),
            Effect::Notify(message) => self.host.notifier.notify(&message),
            Effect::Reveal(record) => self.host.display.reveal(&record),
        }
    }

    /// Deliver queued effects unless another caller already is.
    ///
    /// The host is called without the lock held, so sinks may call back into
    /// the coordinator. Effects they cause are delivered by this same loop.
    fn flush(&self) {
        {
            let mut shared = self.lock();
            if shared.flushing {
                return;
            }
            shared.flushing = true;
        }
        loop {
            let batch: Vec<Effect> = {
                let mut shared = self.lock();
                if shared.effects.is_empty() {
                    shared.flushing = false;
                    return;
                }
                shared.effects.drain(..).collect()
            };
            for effect in batch {
                self.deliver(effect);
            }
        }
    }

    fn transition<T>(
        self: &Arc<Self>,
        f: impl FnOnce(&mut ScanState) -> (RefreshAction, T),
    ) -> T {
        let value = {
            let mut shared = self.lock();
            let (action, value) = f(&mut shared.state);
            self.apply(&mut shared, action);
            value
        };
        self.flush();
        value
    }

    fn apply(self: &Arc<Self>, shared: &mut Shared, action: RefreshAction) {
        match action {
            RefreshAction::None | RefreshAction::Queued => {}
            RefreshAction::ArmTimer { generation, delay } => {
                shared.cancel_timer();
                let inner = Arc::clone(self);
                shared.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.timer_fired(generation);
                }));
            }
            RefreshAction::StartScan => {
                shared.cancel_timer();
                self.spawn_scan(shared);
                shared.effects.push_back(Effect::Badge(BadgeState::scanning()));
            }
            RefreshAction::Paused => {
                shared.cancel_timer();
                shared.clear_results();
                shared.error = None;
                shared.effects.push_back(Effect::Badge(BadgeState::Clear));
                shared.effects.push_back(Effect::DataChanged);
            }
        }
    }

    fn timer_fired(self: &Arc<Self>, generation: u64) {
        {
            let mut shared = self.lock();
            let action = shared.state.timer_elapsed(generation);
            if action != RefreshAction::None {
                // Still the armed timer; this task is ending on its own.
                shared.timer = None;
            }
            self.apply(&mut shared, action);
        }
        self.flush();
    }

    fn spawn_scan(self: &Arc<Self>, shared: &mut Shared) {
        shared.scans_started += 1;
        let scan_id = shared.scans_started;
        let inner = Arc::clone(self);
        let project = Arc::clone(&shared.project);
        let filters = Arc::clone(&shared.filters);
        let mode = shared.group_mode;

        tracing::debug!(scan_id, "Starting scan");
        shared.scan = Some(tokio::spawn(async move {
            let started = Instant::now();
            let pipeline = scan_pipeline(&inner.aggregator, &project, &filters, mode);
            let outcome = match AssertUnwindSafe(pipeline).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => Err(ScanError::FailedUnexpectedly(
                    "scan task panicked".to_string(),
                )),
            };
            tracing::info!(
                scan_id,
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                ok = outcome.is_ok(),
                "Scan finished"
            );
            inner.finish_scan(outcome);
        }));
    }

    fn finish_scan(self: &Arc<Self>, outcome: Result<ScanOutput, ScanError>) {
        {
            let mut shared = self.lock();
            shared.scan = None;
            let completion = shared.state.scan_finished();
            if completion.publish {
                match outcome {
                    Ok(output) => Self::publish(&mut shared, output),
                    Err(e) => {
                        tracing::error!("{e}");
                        shared.clear_results();
                        shared.state.reset_navigation(0);
                        let message = e.to_string();
                        shared.error = Some(message.clone());
                        shared.effects.push_back(Effect::Badge(BadgeState::Clear));
                        shared.effects.push_back(Effect::ShowError(message));
                    }
                }
            } else {
                tracing::debug!("Discarding result of a scan that ran into a pause");
            }
            self.apply(&mut shared, completion.next);
        }
        self.flush();
    }

    fn publish(shared: &mut Shared, output: ScanOutput) {
        // The group mode may have changed while the scan ran.
        let view = if output.view.mode() == shared.group_mode {
            output.view
        } else {
            group(
                &output.records,
                shared.group_mode,
                shared.project.workspace_root(),
            )
        };
        shared.state.set_flat_len(view.flat().len());

        for failure in &output.failures {
            if shared.notified.insert(failure.producer().to_string()) {
                shared
                    .effects
                    .push_back(Effect::Notify(failure.to_string()));
            }
        }

        shared
            .effects
            .push_back(Effect::Badge(BadgeState::for_errors(view.error_count())));
        shared.records = output.records;
        shared.global = output.global;
        shared.view = Arc::new(view);
        shared.error = None;
        shared.effects.push_back(Effect::DataChanged);
    }
}

async fn scan_pipeline(
    aggregator: &Aggregator,
    project: &ProjectConfig,
    filters: &DiagnosticFilters,
    mode: GroupMode,
) -> Result<ScanOutput, ScanError> {
    let collection = aggregator.collect(project, filters).await?;
    let records: Arc<[Arc<DiagnosticRecord>]> =
        collection.records.into_iter().map(Arc::new).collect();
    let view = group(&records, mode, project.workspace_root());
    Ok(ScanOutput {
        records,
        global: collection.global.into(),
        failures: collection.failures,
        view,
    })
}

/// Owns the scan lifecycle for one tree view. Cheap to clone.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(
        aggregator: Aggregator,
        project: ProjectConfig,
        settings: &Settings,
        host: HostSinks,
    ) -> Self {
        let group_mode = settings.view.group_by;
        let shared = Shared {
            state: ScanState::new(RefreshTimings::from(&settings.refresh)),
            project: Arc::new(project),
            overrides: ConfigOverrides::from(&settings.producers),
            filters: Arc::new(DiagnosticFilters::from(settings)),
            group_mode,
            records: Arc::from(Vec::new()),
            global: Arc::from(Vec::new()),
            view: Arc::new(GroupedView::empty(group_mode)),
            error: None,
            notified: HashSet::new(),
            timer: None,
            scan: None,
            scans_started: 0,
            config_revision: 0,
            effects: VecDeque::new(),
            flushing: false,
        };
        Self {
            inner: Arc::new(Inner {
                aggregator,
                host,
                shared: Mutex::new(shared),
            }),
        }
    }

    /// Debounced refresh, for file-change and save events.
    pub fn request_refresh(&self) {
        self.inner.transition(|state| (state.request_refresh(), ()));
    }

    /// Refresh now, for explicit user requests.
    pub fn request_refresh_immediate(&self) {
        self.inner
            .transition(|state| (state.request_refresh_immediate(), ()));
    }

    /// Pausing empties the tree and clears the badge; resuming rescans once.
    pub fn set_paused(&self, paused: bool) {
        tracing::info!(paused, "Pause toggled");
        self.inner.transition(|state| (state.set_paused(paused), ()));
    }

    /// Flip the pause flag, returning the new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = self.inner.transition(|state| {
            let paused = !state.is_paused();
            (state.set_paused(paused), paused)
        });
        tracing::info!(paused, "Pause toggled");
        paused
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.lock().state.is_paused()
    }

    #[must_use]
    pub fn group_mode(&self) -> GroupMode {
        self.inner.lock().group_mode
    }

    /// Regroup the current records without rescanning.
    pub fn set_group_mode(&self, mode: GroupMode) {
        {
            let mut shared = self.inner.lock();
            if shared.group_mode == mode {
                return;
            }
            shared.group_mode = mode;
            if shared.state.is_paused() || shared.error.is_some() {
                shared.view = Arc::new(GroupedView::empty(mode));
            } else {
                let view = group(&shared.records, mode, shared.project.workspace_root());
                shared.state.reset_navigation(view.flat().len());
                shared.view = Arc::new(view);
                shared.effects.push_back(Effect::DataChanged);
            }
        }
        self.inner.flush();
    }

    /// Apply new settings and schedule a refresh.
    ///
    /// Changed config overrides trigger re-resolution of the project.
    pub fn update_settings(&self, settings: &Settings) {
        let overrides_changed = {
            let mut shared = self.inner.lock();
            shared.filters = Arc::new(DiagnosticFilters::from(settings));
            shared
                .state
                .set_timings(RefreshTimings::from(&settings.refresh));
            let overrides = ConfigOverrides::from(&settings.producers);
            let changed = overrides != shared.overrides;
            shared.overrides = overrides;
            changed
        };
        self.set_group_mode(settings.view.group_by);
        if overrides_changed {
            self.revalidate_config();
        } else {
            self.request_refresh();
        }
    }

    /// Re-resolve the project configuration off the runtime, then refresh
    /// immediately.
    ///
    /// Overlapping calls resolve in parallel; only the newest result lands.
    pub fn revalidate_config(&self) {
        let (root, overrides, revision) = {
            let mut shared = self.inner.lock();
            shared.config_revision += 1;
            (
                shared.project.workspace_root().to_path_buf(),
                shared.overrides.clone(),
                shared.config_revision,
            )
        };
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let project =
                match tokio::task::spawn_blocking(move || resolve_project(&root, &overrides))
                    .await
                {
                    Ok(project) => project,
                    Err(e) => {
                        tracing::error!("Project resolution failed: {e}");
                        return;
                    }
                };
            for warning in project.warnings() {
                tracing::warn!("{warning}");
            }
            {
                let mut shared = inner.lock();
                if shared.config_revision != revision {
                    tracing::debug!(revision, "Dropping superseded project resolution");
                    return;
                }
                shared.project = Arc::new(project);
                let action = shared.state.request_refresh_immediate();
                inner.apply(&mut shared, action);
            }
            inner.flush();
        });
    }

    #[must_use]
    pub fn project(&self) -> Arc<ProjectConfig> {
        Arc::clone(&self.inner.lock().project)
    }

    fn navigate(
        &self,
        step: impl FnOnce(&mut ScanState) -> Option<usize>,
    ) -> Option<Arc<DiagnosticRecord>> {
        let record = {
            let mut shared = self.inner.lock();
            let index = step(&mut shared.state)?;
            let record = Arc::clone(shared.view.flat().get(index)?);
            shared
                .effects
                .push_back(Effect::Reveal(Arc::clone(&record)));
            record
        };
        self.inner.flush();
        Some(record)
    }

    /// Reveal the next record, wrapping at the end.
    pub fn navigate_next(&self) -> Option<Arc<DiagnosticRecord>> {
        self.navigate(ScanState::navigate_next)
    }

    /// Reveal the previous record, wrapping at the start.
    pub fn navigate_previous(&self) -> Option<Arc<DiagnosticRecord>> {
        self.navigate(ScanState::navigate_previous)
    }

    pub fn navigate_to(&self, index: usize) -> Option<Arc<DiagnosticRecord>> {
        self.navigate(|state| state.navigate_to(index))
    }

    #[must_use]
    pub fn snapshot(&self) -> ScanSnapshot {
        let shared = self.inner.lock();
        ScanSnapshot {
            view: Arc::clone(&shared.view),
            global: Arc::clone(&shared.global),
            error: shared.error.clone(),
            phase: shared.state.phase(),
            paused: shared.state.is_paused(),
            navigation_index: shared.state.navigation_index(),
        }
    }

    /// Scans started since construction.
    #[must_use]
    pub fn scans_started(&self) -> u64 {
        self.inner.lock().scans_started
    }

    /// Abort the pending timer and any running scan.
    pub fn shutdown(&self) {
        let mut shared = self.inner.lock();
        shared.cancel_timer();
        if let Some(scan) = shared.scan.take() {
            scan.abort();
        }
    }
}
