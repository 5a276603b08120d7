//! Type-check producer backed by `tsc` (or `vue-tsc` for Vue projects).
//!
//! Runs the compiler once over the whole program with `--noEmit --pretty false`
//! and parses its line-oriented output:
//!
//! ```text
//! src/app.ts(12,5): error TS2322: Type 'string' is not assignable to type 'number'.
//!   Continuation lines are indented.
//! error TS5083: Cannot read file 'tsconfig.base.json'.
//! ```
//!
//! Lines without a location are program-wide and land in
//! [`ProducerOutput::global`].

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::locator::{EngineLocator, NodeModulesLocator};
use crate::process::run_engine;
use crate::{
    DiagnosticProducer, PositionBase, ProducerError, ProducerFut, ProducerOutput, ProducerRequest,
    RawCode, RawDiagnostic, RawPosition, RawSeverity,
};

pub const TYPE_CHECK_PRODUCER_ID: &str = "typecheck";

const TSC: &str = "tsc";
const VUE_TSC: &str = "vue-tsc";

struct Patterns {
    located: Regex,
    global: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        located: Regex::new(
            r"^(?P<file>.+?)\((?P<line>\d+),(?P<col>\d+)\): (?P<category>error|warning|suggestion|message) TS(?P<code>\d+): (?P<message>.*)$",
        )
        .expect("valid located diagnostic regex"),
        global: Regex::new(
            r"^(?P<category>error|warning|suggestion|message) TS(?P<code>\d+): (?P<message>.*)$",
        )
        .expect("valid global diagnostic regex"),
    })
}

fn severity_from_category(category: &str) -> RawSeverity {
    match category {
        "warning" => RawSeverity::Warning,
        "suggestion" => RawSeverity::Hint,
        "message" => RawSeverity::Information,
        _ => RawSeverity::Error,
    }
}

/// Where the most recent diagnostic went, so continuation lines can follow it.
enum Last {
    None,
    File(PathBuf),
    Global,
}

/// Parse `--pretty false` compiler output.
///
/// Returns the findings and the number of non-blank lines that matched
/// nothing.
#[must_use]
pub fn parse_tsc_output(stdout: &str) -> (ProducerOutput, usize) {
    let patterns = patterns();
    let mut output = ProducerOutput::default();
    let mut unparsed = 0;
    let mut last = Last::None;

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            let target = match &last {
                Last::File(file) => output.files.get_mut(file).and_then(|d| d.last_mut()),
                Last::Global => output.global.last_mut(),
                Last::None => None,
            };
            if let Some(diagnostic) = target {
                diagnostic.message.push('\n');
                diagnostic.message.push_str(line.trim());
            } else {
                unparsed += 1;
            }
            continue;
        }

        if let Some(caps) = patterns.located.captures(line) {
            let (Ok(line_no), Ok(col), Ok(code)) = (
                caps["line"].parse::<u32>(),
                caps["col"].parse::<u32>(),
                caps["code"].parse::<u32>(),
            ) else {
                unparsed += 1;
                continue;
            };
            let file = PathBuf::from(&caps["file"]);
            output.push(
                file.clone(),
                RawDiagnostic {
                    start: RawPosition::new(line_no, col),
                    end: None,
                    base: PositionBase::OneBased,
                    severity: severity_from_category(&caps["category"]),
                    message: caps["message"].to_string(),
                    code: Some(RawCode::Numeric(code)),
                    source: None,
                },
            );
            last = Last::File(file);
        } else if let Some(caps) = patterns.global.captures(line) {
            let Ok(code) = caps["code"].parse::<u32>() else {
                unparsed += 1;
                continue;
            };
            output.global.push(RawDiagnostic {
                start: RawPosition::new(1, 1),
                end: None,
                base: PositionBase::OneBased,
                severity: severity_from_category(&caps["category"]),
                message: caps["message"].to_string(),
                code: Some(RawCode::Numeric(code)),
                source: None,
            });
            last = Last::Global;
        } else {
            unparsed += 1;
            last = Last::None;
        }
    }

    (output, unparsed)
}

/// Whole-program type checker.
pub struct TypeScriptProducer {
    locator: Arc<dyn EngineLocator>,
}

impl Default for TypeScriptProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeScriptProducer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_locator(Arc::new(NodeModulesLocator))
    }

    #[must_use]
    pub fn with_locator(locator: Arc<dyn EngineLocator>) -> Self {
        Self { locator }
    }

    fn build_args(request: &ProducerRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--noEmit".into(), "--pretty".into(), "false".into()];
        if let Some(config) = &request.config_path {
            args.push("-p".into());
            args.push(config.as_os_str().to_owned());
        }
        args
    }

    async fn run(&self, request: &ProducerRequest) -> Result<ProducerOutput, ProducerError> {
        let engine = if request.use_vue_checker { VUE_TSC } else { TSC };
        let program = self
            .locator
            .locate(engine, &request.workspace_root)
            .ok_or_else(|| ProducerError::EngineNotFound {
                producer: TYPE_CHECK_PRODUCER_ID.to_string(),
                engine: engine.to_string(),
            })?;

        let args = Self::build_args(request);
        let result = run_engine(&program, &args, &request.workspace_root, &[])
            .await
            .map_err(|e| ProducerError::InvocationFailed {
                producer: TYPE_CHECK_PRODUCER_ID.to_string(),
                message: format!("{e:#}"),
            })?;

        let (output, unparsed) = parse_tsc_output(&result.stdout);
        let found = output.file_diagnostic_count() + output.global.len();
        if unparsed > 0 {
            tracing::debug!(unparsed, "Ignored unrecognized type checker output lines");
        }

        match result.status.code() {
            Some(0) => Ok(output),
            // 1 and 2 mean "diagnostics reported"; output must back that up.
            Some(1 | 2) if found > 0 => Ok(output),
            Some(1 | 2) => Err(ProducerError::OutputUnparseable {
                producer: TYPE_CHECK_PRODUCER_ID.to_string(),
                message: first_lines(&result.stdout, &result.stderr_tail()),
            }),
            _ if found > 0 => {
                tracing::warn!(status = %result.status, "Type checker exited abnormally; keeping parsed output");
                Ok(output)
            }
            _ => Err(ProducerError::InvocationFailed {
                producer: TYPE_CHECK_PRODUCER_ID.to_string(),
                message: format!("{engine} exited with {}: {}", result.status, result.stderr_tail()),
            }),
        }
    }
}

fn first_lines(stdout: &str, stderr_tail: &str) -> String {
    let head: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).take(3).collect();
    if head.is_empty() {
        stderr_tail.to_string()
    } else {
        head.join("\n")
    }
}

impl DiagnosticProducer for TypeScriptProducer {
    fn id(&self) -> &str {
        TYPE_CHECK_PRODUCER_ID
    }

    fn get_all_diagnostics<'a>(&'a self, request: &'a ProducerRequest) -> ProducerFut<'a> {
        Box::pin(async move {
            let output = self.run(request).await?;
            tracing::info!(
                producer = TYPE_CHECK_PRODUCER_ID,
                files = output.files.len(),
                diagnostics = output.file_diagnostic_count(),
                global = output.global.len(),
                "Type check finished"
            );
            Ok(output)
        })
    }
}
