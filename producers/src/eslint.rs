//! Lint producer backed by ESLint's JSON formatter.
//!
//! ESLint exits non-zero whenever it finds an error, so the exit status alone
//! says nothing about whether the run worked. Stdout is always parsed first;
//! only output that is not a valid report counts as a failure.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use lintlens_config::{LintConfigLocation, PackageManifest, discover_lint_config};
use serde::Deserialize;

use crate::locator::{EngineLocator, NodeModulesLocator};
use crate::process::run_engine;
use crate::{
    DiagnosticProducer, PositionBase, ProducerError, ProducerFut, ProducerOutput, ProducerRequest,
    RawCode, RawDiagnostic, RawPosition, RawSeverity,
};

pub const LINT_PRODUCER_ID: &str = "lint";

const ESLINT: &str = "eslint";
const LEGACY_EXTENSIONS: &str = ".js,.jsx,.ts,.tsx,.vue";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileReport {
    file_path: PathBuf,
    #[serde(default)]
    messages: Vec<LintMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LintMessage {
    #[serde(default)]
    rule_id: Option<String>,
    #[serde(default)]
    severity: u8,
    #[serde(default)]
    fatal: bool,
    message: String,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
    #[serde(default)]
    end_line: Option<u32>,
    #[serde(default)]
    end_column: Option<u32>,
}

impl LintMessage {
    fn into_raw(self) -> RawDiagnostic {
        let severity = if self.fatal || self.severity >= 2 {
            RawSeverity::Error
        } else {
            RawSeverity::Warning
        };
        let start = RawPosition::new(
            self.line.unwrap_or(1).max(1),
            self.column.unwrap_or(1).max(1),
        );
        let end = self
            .end_line
            .map(|line| RawPosition::new(line, self.end_column.unwrap_or(start.column)));
        RawDiagnostic {
            start,
            end,
            base: PositionBase::OneBased,
            severity,
            message: self.message,
            code: self.rule_id.map(RawCode::Text),
            source: None,
        }
    }
}

/// Parse the output of `eslint --format json`.
pub fn parse_eslint_json(stdout: &str) -> Result<ProducerOutput, serde_json::Error> {
    let reports: Vec<FileReport> = serde_json::from_str(stdout.trim())?;
    let mut output = ProducerOutput::default();
    for report in reports {
        if report.messages.is_empty() {
            continue;
        }
        let entry = output.files.entry(report.file_path).or_default();
        entry.extend(report.messages.into_iter().map(LintMessage::into_raw));
    }
    Ok(output)
}

/// Invocation details derived from the lint config format.
#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    args: Vec<OsString>,
    legacy: bool,
}

fn build_invocation(config: &LintConfigLocation, explicit: bool) -> Invocation {
    let mut args: Vec<OsString> = vec!["--format".into(), "json".into()];
    let legacy = !config.is_flat();
    // An embedded `eslintConfig` cannot be named with --config.
    if explicit && !matches!(config, LintConfigLocation::PackageManifest(_)) {
        args.push("--config".into());
        args.push(config.path().as_os_str().to_owned());
    }
    if legacy {
        args.push("--ext".into());
        args.push(LEGACY_EXTENSIONS.into());
    }
    args.push(".".into());
    Invocation { args, legacy }
}

/// Project-wide ESLint run.
pub struct EslintProducer {
    locator: Arc<dyn EngineLocator>,
}

impl Default for EslintProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl EslintProducer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_locator(Arc::new(NodeModulesLocator))
    }

    #[must_use]
    pub fn with_locator(locator: Arc<dyn EngineLocator>) -> Self {
        Self { locator }
    }

    /// Explicit config from the request wins; otherwise discover it.
    fn lint_config(request: &ProducerRequest) -> (Option<LintConfigLocation>, bool) {
        if let Some(path) = &request.config_path {
            return (Some(LintConfigLocation::classify(path.clone())), true);
        }
        let manifest = PackageManifest::read(&request.workspace_root).ok().flatten();
        (discover_lint_config(&request.workspace_root, manifest.as_ref()), false)
    }

    async fn run(&self, request: &ProducerRequest) -> Result<ProducerOutput, ProducerError> {
        let (config, explicit) = Self::lint_config(request);
        let Some(config) = config else {
            tracing::info!(
                root = %request.workspace_root.display(),
                "No lint configuration; skipping lint"
            );
            return Ok(ProducerOutput::default());
        };

        let program = self
            .locator
            .locate(ESLINT, &request.workspace_root)
            .ok_or_else(|| ProducerError::EngineNotFound {
                producer: LINT_PRODUCER_ID.to_string(),
                engine: ESLINT.to_string(),
            })?;

        let invocation = build_invocation(&config, explicit);
        let envs: &[(&str, &str)] = if invocation.legacy {
            &[("ESLINT_USE_FLAT_CONFIG", "false")]
        } else {
            &[]
        };

        let result = run_engine(&program, &invocation.args, &request.workspace_root, envs)
            .await
            .map_err(|e| ProducerError::InvocationFailed {
                producer: LINT_PRODUCER_ID.to_string(),
                message: format!("{e:#}"),
            })?;

        match parse_eslint_json(&result.stdout) {
            Ok(output) => {
                if !result.status.success() {
                    tracing::debug!(status = %result.status, "ESLint reported findings via exit status");
                }
                Ok(output)
            }
            Err(e) if result.status.success() => Err(ProducerError::OutputUnparseable {
                producer: LINT_PRODUCER_ID.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(ProducerError::InvocationFailed {
                producer: LINT_PRODUCER_ID.to_string(),
                message: format!("eslint exited with {}: {}", result.status, result.stderr_tail()),
            }),
        }
    }
}

impl DiagnosticProducer for EslintProducer {
    fn id(&self) -> &str {
        LINT_PRODUCER_ID
    }

    fn get_all_diagnostics<'a>(&'a self, request: &'a ProducerRequest) -> ProducerFut<'a> {
        Box::pin(async move {
            let output = self.run(request).await?;
            tracing::info!(
                producer = LINT_PRODUCER_ID,
                files = output.files.len(),
                diagnostics = output.file_diagnostic_count(),
                "Lint finished"
            );
            Ok(output)
        })
    }
}
