//! Aggregator - merges producer outputs into normalized, filtered records.
//!
//! Producers run one after another. Each call is isolated: an error or a
//! panic becomes a [`ProducerError`] in [`Collection::failures`] and that
//! producer contributes nothing to the scan. Only pipeline problems (missing
//! workspace, bad exclude patterns) fail the whole collection.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::FutureExt;
use lintlens_config::{ProjectConfig, ScanMode, Settings};
use lintlens_producers::{
    DiagnosticProducer, EslintProducer, LiveDiagnosticsStore, PositionBase, ProducerError,
    ProducerOutput, ProducerRequest, RawCode, RawDiagnostic, RawSeverity, TypeScriptProducer,
};
use lintlens_types::{DiagnosticRecord, Severity, TextRange};

use crate::error::ScanError;
use crate::exclude::{ExcludeMatcher, relative_slash_path};

/// Which records make it into a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticFilters {
    pub show_errors: bool,
    pub show_warnings: bool,
    pub enable_type_check: bool,
    pub enable_lint: bool,
    /// File-name suffixes to keep. Empty keeps everything.
    pub file_types: Vec<String>,
    /// User exclude patterns; framework patterns are added at collection time.
    pub exclude_patterns: Vec<String>,
    pub scan_mode: ScanMode,
}

impl Default for DiagnosticFilters {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for DiagnosticFilters {
    fn from(settings: &Settings) -> Self {
        Self {
            show_errors: settings.filters.show_errors,
            show_warnings: settings.filters.show_warnings,
            enable_type_check: settings.producers.type_check,
            enable_lint: settings.producers.lint,
            file_types: settings.filters.file_types.clone(),
            exclude_patterns: settings.filters.exclude.clone(),
            scan_mode: settings.view.scan_mode,
        }
    }
}

impl DiagnosticFilters {
    /// Info and Hint always pass.
    #[must_use]
    pub fn allows_severity(&self, severity: Severity) -> bool {
        match severity {
            Severity::Error => self.show_errors,
            Severity::Warning => self.show_warnings,
            Severity::Info | Severity::Hint => true,
        }
    }

    #[must_use]
    pub fn allows_file_type(&self, path: &Path) -> bool {
        if self.file_types.is_empty() {
            return true;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_ascii_lowercase()) else {
            return false;
        };
        self.file_types
            .iter()
            .any(|suffix| name.ends_with(&suffix.to_ascii_lowercase()))
    }
}

/// Result of one collection pass.
#[derive(Debug, Default)]
pub struct Collection {
    /// Per-file records in producer order, then file order, then finding order.
    pub records: Vec<DiagnosticRecord>,
    /// Program-wide findings. Never displayed as leaves.
    pub global: Vec<DiagnosticRecord>,
    /// Producers that contributed nothing because they failed.
    pub failures: Vec<ProducerError>,
}

pub struct Aggregator {
    type_check: Arc<dyn DiagnosticProducer>,
    lint: Arc<dyn DiagnosticProducer>,
    live: Arc<dyn DiagnosticProducer>,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        type_check: Arc<dyn DiagnosticProducer>,
        lint: Arc<dyn DiagnosticProducer>,
        live: Arc<dyn DiagnosticProducer>,
    ) -> Self {
        Self {
            type_check,
            lint,
            live,
        }
    }

    /// The subprocess-backed producers plus a host-fed live store.
    #[must_use]
    pub fn with_default_producers(live: Arc<LiveDiagnosticsStore>) -> Self {
        Self::new(
            Arc::new(TypeScriptProducer::new()),
            Arc::new(EslintProducer::new()),
            live,
        )
    }

    pub async fn collect(
        &self,
        project: &ProjectConfig,
        filters: &DiagnosticFilters,
    ) -> Result<Collection, ScanError> {
        let root = project.workspace_root();
        if !root.is_dir() {
            return Err(ScanError::WorkspaceUnavailable(root.to_path_buf()));
        }

        let matcher = ExcludeMatcher::new(
            filters
                .exclude_patterns
                .iter()
                .chain(project.framework_excludes()),
        )?;

        let mut collection = Collection::default();
        let ingest = Ingest {
            root,
            matcher: &matcher,
            filters,
        };

        match filters.scan_mode {
            ScanMode::Workspace => {
                if filters.enable_type_check {
                    if let Some(config) = project.type_check_config() {
                        let request = ProducerRequest {
                            workspace_root: root.to_path_buf(),
                            config_path: Some(config.to_path_buf()),
                            use_vue_checker: project.uses_vue_checker(),
                        };
                        run_producer(self.type_check.as_ref(), &request, &ingest, &mut collection)
                            .await;
                    } else {
                        tracing::debug!("No type-check config; skipping type check");
                    }
                }
                if filters.enable_lint {
                    let request = ProducerRequest {
                        workspace_root: root.to_path_buf(),
                        config_path: project.lint_config().map(|c| c.path().to_path_buf()),
                        use_vue_checker: false,
                    };
                    run_producer(self.lint.as_ref(), &request, &ingest, &mut collection).await;
                }
            }
            ScanMode::OpenFiles => {
                let request = ProducerRequest::new(root.to_path_buf());
                run_producer(self.live.as_ref(), &request, &ingest, &mut collection).await;
            }
        }

        for record in &collection.global {
            tracing::info!(
                source = record.source(),
                code = record.code().unwrap_or_default(),
                "Program-wide diagnostic: {}",
                record.message()
            );
        }
        tracing::info!(
            records = collection.records.len(),
            global = collection.global.len(),
            failures = collection.failures.len(),
            "Collection finished"
        );
        Ok(collection)
    }
}

async fn run_producer(
    producer: &dyn DiagnosticProducer,
    request: &ProducerRequest,
    ingest: &Ingest<'_>,
    collection: &mut Collection,
) {
    match invoke_isolated(producer, request).await {
        Ok(output) => ingest.absorb(producer.id(), output, collection),
        Err(e) => {
            tracing::warn!(producer = producer.id(), "{e}");
            collection.failures.push(e);
        }
    }
}

/// Await a producer, converting a panic into [`ProducerError::Panicked`].
async fn invoke_isolated(
    producer: &dyn DiagnosticProducer,
    request: &ProducerRequest,
) -> Result<ProducerOutput, ProducerError> {
    let call = async { producer.get_all_diagnostics(request).await };
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ProducerError::Panicked {
                producer: producer.id().to_string(),
                message,
            })
        }
    }
}

/// Per-collection context for turning raw output into records.
struct Ingest<'a> {
    root: &'a Path,
    matcher: &'a ExcludeMatcher,
    filters: &'a DiagnosticFilters,
}

impl Ingest<'_> {
    fn absorb(&self, producer_id: &str, output: ProducerOutput, collection: &mut Collection) {
        let mut skipped_files = 0usize;
        for (file, diagnostics) in output.files {
            let path = if file.is_absolute() {
                file
            } else {
                self.root.join(file)
            };
            if !self.filters.allows_file_type(&path)
                || self
                    .matcher
                    .is_excluded(&relative_slash_path(self.root, &path))
            {
                skipped_files += 1;
                continue;
            }
            for raw in diagnostics {
                let record = normalize(raw, path.clone(), producer_id);
                if self.filters.allows_severity(record.severity()) {
                    collection.records.push(record);
                }
            }
        }

        let global_path = self.root.to_path_buf();
        collection.global.extend(
            output
                .global
                .into_iter()
                .map(|raw| normalize(raw, global_path.clone(), producer_id)),
        );

        if skipped_files > 0 {
            tracing::debug!(producer = producer_id, skipped_files, "Files filtered out");
        }
    }
}

fn to_zero_based(value: u32, base: PositionBase) -> u32 {
    match base {
        PositionBase::ZeroBased => value,
        PositionBase::OneBased => value.saturating_sub(1),
    }
}

/// Convert a raw finding into a record for `file`.
#[must_use]
pub fn normalize(raw: RawDiagnostic, file: PathBuf, producer_id: &str) -> DiagnosticRecord {
    let start_line = to_zero_based(raw.start.line, raw.base);
    let start_col = to_zero_based(raw.start.column, raw.base);
    let range = match raw.end {
        Some(end) => TextRange::new(
            start_line,
            start_col,
            to_zero_based(end.line, raw.base),
            to_zero_based(end.column, raw.base),
        ),
        None => TextRange::point(start_line, start_col),
    };
    let severity = match raw.severity {
        RawSeverity::Error => Severity::Error,
        RawSeverity::Warning => Severity::Warning,
        RawSeverity::Information => Severity::Info,
        RawSeverity::Hint => Severity::Hint,
    };
    let code = match raw.code {
        Some(RawCode::Numeric(n)) => Some(n.to_string()),
        Some(RawCode::Text(text)) if !text.is_empty() => Some(text),
        Some(RawCode::Text(_)) | None => None,
    };
    let source = raw
        .source
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| producer_id.to_string());
    DiagnosticRecord::new(file, range, severity, raw.message, source, code)
}
