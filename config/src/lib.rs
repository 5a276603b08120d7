//! Configuration for lintlens.
//!
//! Two halves:
//! - **`settings`**: user preferences loaded from TOML (filters, producer
//!   switches, group mode, refresh timings)
//! - **`project`**: what the workspace itself contains (type-check config,
//!   lint config, framework), resolved once per workspace open

pub mod framework;
pub mod manifest;
pub mod project;
pub mod settings;

pub use framework::{Framework, detect_framework, is_framework_marker};
pub use manifest::PackageManifest;
pub use project::{
    ConfigOverrides, ConfigWarning, LintConfigLocation, ProjectConfig, affects_resolution,
    discover_lint_config, resolve_project,
};
pub use settings::{
    ConfigError, FilterSettings, ProducerSettings, RefreshSettings, ScanMode, Settings,
    ViewSettings,
};
