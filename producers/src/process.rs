//! Subprocess plumbing shared by the external producers.

use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use anyhow::Context;
use tokio::process::Command;

/// Captured result of one engine run.
pub(crate) struct EngineOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    /// Last few stderr lines, for error messages.
    pub fn stderr_tail(&self) -> String {
        const MAX_LINES: usize = 8;
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(MAX_LINES);
        lines[start..].join("\n")
    }
}

/// Run `program` in `cwd` to completion and capture both streams.
///
/// The child is killed if the returned future is dropped. No timeout is
/// applied; a hung engine hangs the caller.
pub(crate) async fn run_engine(
    program: &Path,
    args: &[OsString],
    cwd: &Path,
    envs: &[(&str, &str)],
) -> anyhow::Result<EngineOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        cmd.env(key, value);
    }

    tracing::debug!(program = %program.display(), ?args, cwd = %cwd.display(), "Spawning engine");
    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning {}", program.display()))?;

    Ok(EngineOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
