//! lintlens CLI - terminal host for the diagnostics engine.
//!
//! # Commands
//!
//! - `scan`: one collection pass, printed as a grouped tree (or JSON)
//! - `watch`: keeps a [`RefreshCoordinator`] fed with file-change events and
//!   stdin commands until interrupted
//! - `config`: prints the resolved project configuration
//!
//! Logs go to `~/.lintlens/logs/lintlens.log` so they never interleave with
//! the tree on stdout.

mod render;
mod terminal;
mod watch;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lintlens_config::{ConfigOverrides, ProjectConfig, ScanMode, Settings, resolve_project};
use lintlens_engine::{Aggregator, DiagnosticFilters, RefreshCoordinator, group};
use lintlens_producers::LiveDiagnosticsStore;
use lintlens_types::GroupMode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::terminal::{HELP, HostEvent, TerminalHost, UserCommand};
use crate::watch::{WorkspaceChange, WorkspaceWatcher};

#[derive(Parser)]
#[command(name = "lintlens")]
#[command(about = "Aggregate type-check and lint diagnostics for a JavaScript/TypeScript workspace")]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, short = 'C', global = true)]
    root: Option<PathBuf>,
    /// Settings file to use instead of .lintlens.toml or ~/.lintlens/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan once and print the grouped diagnostics
    Scan {
        /// Group by file, rule or both
        #[arg(long)]
        group: Option<GroupMode>,
        /// Print records as JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
    /// Rescan whenever the workspace changes
    Watch {
        /// Group by file, rule or both
        #[arg(long)]
        group: Option<GroupMode>,
    },
    /// Print the resolved project configuration as JSON
    Config,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.lintlens/logs/lintlens.log
    if let Some(settings_path) = Settings::global_path()
        && let Some(dir) = settings_path.parent()
    {
        candidates.push(dir.join("logs").join("lintlens.log"));
    }

    candidates.push(PathBuf::from(".lintlens").join("logs").join("lintlens.log"));

    candidates
}

fn workspace_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let root = match explicit {
        Some(root) => root,
        None => std::env::current_dir().context("reading current directory")?,
    };
    root.canonicalize()
        .with_context(|| format!("workspace root {}", root.display()))
}

fn load_settings(root: &Path, explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>)> {
    let (settings, source) = Settings::discover(root, explicit)?;
    match &source {
        Some(path) => tracing::info!(path = %path.display(), "Settings loaded"),
        None => tracing::info!("Using default settings"),
    }
    Ok((settings, source))
}

fn resolve(root: &Path, settings: &Settings) -> ProjectConfig {
    let project = resolve_project(root, &ConfigOverrides::from(&settings.producers));
    for warning in project.warnings() {
        eprintln!("note: {warning}");
    }
    project
}

// Host callbacks and coordinator tasks share one thread, one at a time.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let root = workspace_root(cli.root)?;
    let (mut settings, settings_path) = load_settings(&root, cli.config.as_deref())?;

    match cli.command {
        Commands::Scan { group, json } => {
            if let Some(mode) = group {
                settings.view.group_by = mode;
            }
            run_scan(&root, &settings, json).await
        }
        Commands::Watch { group } => {
            if let Some(mode) = group {
                settings.view.group_by = mode;
            }
            let explicit = cli.config.is_some();
            run_watch(root, settings, settings_path, explicit).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            let project = resolve_project(&root, &ConfigOverrides::from(&settings.producers));
            println!("{}", serde_json::to_string_pretty(&project)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Exits non-zero when any error-severity record is shown.
async fn run_scan(root: &Path, settings: &Settings, json: bool) -> Result<ExitCode> {
    let project = resolve(root, settings);
    let filters = DiagnosticFilters::from(settings);
    if filters.scan_mode == ScanMode::OpenFiles {
        eprintln!("note: open-files mode has no live diagnostics source in the terminal");
    }

    let aggregator = Aggregator::with_default_producers(Arc::new(LiveDiagnosticsStore::new()));
    let collection = aggregator.collect(&project, &filters).await?;
    for failure in &collection.failures {
        eprintln!("warning: {failure}");
    }

    let records: Vec<_> = collection.records.into_iter().map(Arc::new).collect();
    let view = group(&records, settings.view.group_by, root);

    if json {
        let report = serde_json::json!({
            "root": root,
            "records": view.flat().iter().map(|r| &**r).collect::<Vec<_>>(),
            "global": collection.global,
            "failures": collection.failures.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for record in &collection.global {
            println!("{}", render::location(record, root));
        }
        print!("{}", render::tree(&view, None));
        println!("{}", render::summary(&view));
    }

    Ok(if view.error_count() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_watch(
    root: PathBuf,
    settings: Settings,
    settings_path: Option<PathBuf>,
    explicit_settings: bool,
) -> Result<()> {
    let (host_tx, mut host_events) = mpsc::unbounded_channel();
    let project = resolve(&root, &settings);
    if settings.view.scan_mode == ScanMode::OpenFiles {
        eprintln!("note: open-files mode has no live diagnostics source in the terminal");
    }
    let coordinator = RefreshCoordinator::new(
        Aggregator::with_default_producers(Arc::new(LiveDiagnosticsStore::new())),
        project,
        &settings,
        TerminalHost::sinks(host_tx),
    );

    let (change_tx, mut changes) = mpsc::unbounded_channel();
    let _watcher = WorkspaceWatcher::spawn(&root, settings_path.clone(), change_tx)?;

    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    eprintln!("{HELP}");
    coordinator.request_refresh_immediate();

    loop {
        tokio::select! {
            Some(event) = host_events.recv() => show(&event, &coordinator, &root),
            Some(change) = changes.recv() => {
                apply_change(change, &coordinator, &root, settings_path.as_deref(), explicit_settings);
            }
            line = commands.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match UserCommand::parse(&line) {
                    Some(UserCommand::Quit) => break,
                    Some(command) => run_command(command, &coordinator),
                    None if line.trim().is_empty() => {}
                    None => eprintln!("unknown command: {}", line.trim()),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("stdin read failed: {e}");
                    stdin_open = false;
                }
            },
            _ = &mut shutdown => break,
        }
    }

    coordinator.shutdown();
    Ok(())
}

fn show(event: &HostEvent, coordinator: &RefreshCoordinator, root: &Path) {
    match event {
        HostEvent::DataChanged => {
            let snapshot = coordinator.snapshot();
            if snapshot.paused {
                println!("-- paused --");
                return;
            }
            for record in snapshot.global.iter() {
                println!("{}", render::location(record, root));
            }
            print!("{}", render::tree(&snapshot.view, snapshot.navigation_index));
            println!("{}", render::summary(&snapshot.view));
        }
        HostEvent::Reveal(record) => println!("> {}", render::location(record, root)),
        HostEvent::Error(message) => eprintln!("error: {message}"),
        HostEvent::Badge(badge) => {
            if let Some(text) = render::badge(badge) {
                eprintln!("{text}");
            }
        }
        HostEvent::Notice(message) => eprintln!("warning: {message}"),
    }
}

fn apply_change(
    change: WorkspaceChange,
    coordinator: &RefreshCoordinator,
    root: &Path,
    settings_path: Option<&Path>,
    explicit_settings: bool,
) {
    match change {
        WorkspaceChange::Sources => coordinator.request_refresh(),
        WorkspaceChange::ProjectConfig => coordinator.revalidate_config(),
        WorkspaceChange::Settings(path) => {
            // A workspace file only wins when no --config was given.
            let source = if explicit_settings { settings_path } else { None };
            match Settings::discover(root, source) {
                Ok((settings, _)) => {
                    tracing::info!(path = %path.display(), "Settings changed");
                    coordinator.update_settings(&settings);
                }
                Err(e) => eprintln!("error: {e}"),
            }
        }
        WorkspaceChange::Error(message) => tracing::warn!("watch error: {message}"),
    }
}

fn run_command(command: UserCommand, coordinator: &RefreshCoordinator) {
    match command {
        UserCommand::Refresh => coordinator.request_refresh_immediate(),
        UserCommand::TogglePause => {
            let paused = coordinator.toggle_pause();
            eprintln!("{}", if paused { "paused" } else { "resumed" });
        }
        UserCommand::Next => {
            if coordinator.navigate_next().is_none() {
                eprintln!("no problems");
            }
        }
        UserCommand::Previous => {
            if coordinator.navigate_previous().is_none() {
                eprintln!("no problems");
            }
        }
        UserCommand::Goto(position) => {
            if coordinator.navigate_to(position - 1).is_none() {
                eprintln!("no problem #{position}");
            }
        }
        UserCommand::Group(mode) => coordinator.set_group_mode(mode),
        UserCommand::Revalidate => coordinator.revalidate_config(),
        UserCommand::Help => eprintln!("{HELP}"),
        UserCommand::Quit => {}
    }
}
