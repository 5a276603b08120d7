//! Diagnostic producers - the engines that actually find problems.
//!
//! Every producer implements [`DiagnosticProducer`] and returns a
//! [`ProducerOutput`] keyed by file path. The aggregator only ever sees the
//! trait, so tests can substitute a double returning fixed mappings.

pub mod eslint;
pub mod live;
pub mod locator;
pub(crate) mod process;
pub mod typescript;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

pub use eslint::EslintProducer;
pub use live::LiveDiagnosticsStore;
pub use locator::{EngineLocator, NodeModulesLocator};
pub use typescript::TypeScriptProducer;

/// Producer future type alias.
pub type ProducerFut<'a> =
    Pin<Box<dyn Future<Output = Result<ProducerOutput, ProducerError>> + Send + 'a>>;

/// A whole-project diagnostic source.
///
/// Implementations must not carry state from one call to the next: each call
/// re-derives the full diagnostic set.
pub trait DiagnosticProducer: Send + Sync {
    /// Stable identifier, also used as the default record source.
    fn id(&self) -> &str;

    fn get_all_diagnostics<'a>(&'a self, request: &'a ProducerRequest) -> ProducerFut<'a>;
}

/// Arguments for one producer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerRequest {
    pub workspace_root: PathBuf,
    /// Config file the producer must use. `None` lets it discover its own.
    pub config_path: Option<PathBuf>,
    /// Substitute the Vue-aware checker for the generic one.
    pub use_vue_checker: bool,
}

impl ProducerRequest {
    #[must_use]
    pub fn new(workspace_root: PathBuf) -> Self {
        Self {
            workspace_root,
            config_path: None,
            use_vue_checker: false,
        }
    }
}

/// Raw findings from one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerOutput {
    /// Per-file findings. Paths may be absolute or workspace-relative.
    pub files: BTreeMap<PathBuf, Vec<RawDiagnostic>>,
    /// Program-wide findings not tied to any file.
    pub global: Vec<RawDiagnostic>,
}

impl ProducerOutput {
    pub fn push(&mut self, file: PathBuf, diagnostic: RawDiagnostic) {
        self.files.entry(file).or_default().push(diagnostic);
    }

    /// Number of findings across all files, excluding global ones.
    #[must_use]
    pub fn file_diagnostic_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

/// Whether a raw position counts lines and columns from 0 or from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionBase {
    ZeroBased,
    OneBased,
}

/// A line/column pair as reported by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPosition {
    pub line: u32,
    pub column: u32,
}

impl RawPosition {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

/// Producer-native code: numeric for the type checker, a rule id for lint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCode {
    Numeric(u32),
    Text(String),
}

/// A finding before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDiagnostic {
    pub start: RawPosition,
    pub end: Option<RawPosition>,
    pub base: PositionBase,
    pub severity: RawSeverity,
    pub message: String,
    pub code: Option<RawCode>,
    /// Overrides the producer id as the record source when set.
    pub source: Option<String>,
}

/// Why a producer contributed nothing to a scan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProducerError {
    #[error("{producer} failed: {message}")]
    InvocationFailed { producer: String, message: String },
    #[error("{producer} produced output that could not be parsed: {message}")]
    OutputUnparseable { producer: String, message: String },
    #[error("{producer}: could not find {engine} (install it in node_modules or on PATH)")]
    EngineNotFound { producer: String, engine: String },
    #[error("{producer} panicked: {message}")]
    Panicked { producer: String, message: String },
}

impl ProducerError {
    #[must_use]
    pub fn producer(&self) -> &str {
        match self {
            Self::InvocationFailed { producer, .. }
            | Self::OutputUnparseable { producer, .. }
            | Self::EngineNotFound { producer, .. }
            | Self::Panicked { producer, .. } => producer,
        }
    }
}
