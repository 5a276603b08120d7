//! Shared test utilities and fixtures
//!
//! Scripted producers, a recording host and throwaway workspaces.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lintlens_engine::{BadgeSink, DisplaySurface, HostSinks, Notifier};
use lintlens_producers::{
    DiagnosticProducer, PositionBase, ProducerError, ProducerFut, ProducerOutput, ProducerRequest,
    RawCode, RawDiagnostic, RawPosition, RawSeverity,
};
use lintlens_types::{BadgeState, DiagnosticRecord};
use tempfile::TempDir;

/// One-based raw finding with an optional rule code.
pub fn raw(severity: RawSeverity, line: u32, message: &str, code: Option<&str>) -> RawDiagnostic {
    RawDiagnostic {
        start: RawPosition::new(line, 1),
        end: None,
        base: PositionBase::OneBased,
        severity,
        message: message.to_string(),
        code: code.map(|c| RawCode::Text(c.to_string())),
        source: None,
    }
}

/// Producer that returns a fixed output after an optional delay.
pub struct ScriptedProducer {
    id: &'static str,
    delay: Duration,
    output: Mutex<Result<ProducerOutput, ProducerError>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ProducerRequest>>,
}

impl ScriptedProducer {
    pub fn new(id: &'static str, output: ProducerOutput) -> Arc<Self> {
        Self::delayed(id, output, Duration::ZERO)
    }

    pub fn delayed(id: &'static str, output: ProducerOutput, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id,
            delay,
            output: Mutex::new(Ok(output)),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(id: &'static str, error: ProducerError) -> Arc<Self> {
        Arc::new(Self {
            id,
            delay: Duration::ZERO,
            output: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_output(&self, output: ProducerOutput) {
        *self.output.lock().unwrap() = Ok(output);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ProducerRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl DiagnosticProducer for ScriptedProducer {
    fn id(&self) -> &str {
        self.id
    }

    fn get_all_diagnostics<'a>(&'a self, request: &'a ProducerRequest) -> ProducerFut<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.output.lock().unwrap().clone()
        })
    }
}

/// Host that records every side effect the coordinator reports.
#[derive(Default)]
pub struct RecordingHost {
    pub changes: AtomicUsize,
    pub badges: Mutex<Vec<BadgeState>>,
    pub revealed: Mutex<Vec<DiagnosticRecord>>,
    pub errors: Mutex<Vec<String>>,
    pub notices: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sinks(self: &Arc<Self>) -> HostSinks {
        HostSinks {
            display: self.clone(),
            badge: self.clone(),
            notifier: self.clone(),
        }
    }

    pub fn last_badge(&self) -> Option<BadgeState> {
        self.badges.lock().unwrap().last().cloned()
    }

    pub fn change_count(&self) -> usize {
        self.changes.load(Ordering::SeqCst)
    }
}

impl DisplaySurface for RecordingHost {
    fn data_changed(&self) {
        self.changes.fetch_add(1, Ordering::SeqCst);
    }

    fn reveal(&self, record: &DiagnosticRecord) {
        self.revealed.lock().unwrap().push(record.clone());
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

impl BadgeSink for RecordingHost {
    fn set_badge(&self, badge: BadgeState) {
        self.badges.lock().unwrap().push(badge);
    }
}

impl Notifier for RecordingHost {
    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}

/// Temporary workspace populated file by file.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// A workspace with `tsconfig.json` and a flat lint config.
    pub fn typescript() -> Self {
        Self::new()
            .with_file("tsconfig.json", "{}")
            .with_file("eslint.config.js", "export default [];")
    }

    pub fn with_file(self, relative: &str, content: &str) -> Self {
        self.write(relative, content);
        self
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}
