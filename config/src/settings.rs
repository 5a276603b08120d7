//! User settings loaded from TOML.
//!
//! Lookup order: explicit path → `<root>/.lintlens.toml` →
//! `~/.lintlens/config.toml` → built-in defaults. Every section and field is
//! optional in the file; missing values fall back to the defaults below.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lintlens_types::GroupMode;
use serde::Deserialize;

/// File name looked up in the workspace root.
pub const WORKSPACE_SETTINGS_FILE: &str = ".lintlens.toml";

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_FOLLOW_UP_DELAY_MS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub filters: FilterSettings,
    pub producers: ProducerSettings,
    pub view: ViewSettings,
    pub refresh: RefreshSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub show_errors: bool,
    pub show_warnings: bool,
    /// Suffix allow-list (e.g. ".ts"). Empty allows every file.
    pub file_types: Vec<String>,
    /// Glob-like patterns matched against root-relative paths.
    pub exclude: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            show_errors: true,
            show_warnings: true,
            file_types: [".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".vue"]
                .into_iter()
                .map(String::from)
                .collect(),
            exclude: vec!["**/node_modules/**".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProducerSettings {
    pub type_check: bool,
    pub lint: bool,
    /// Type-check config override, absolute or root-relative.
    pub type_check_config: Option<PathBuf>,
    /// Lint config override, absolute or root-relative.
    pub lint_config: Option<PathBuf>,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            type_check: true,
            lint: true,
            type_check_config: None,
            lint_config: None,
        }
    }
}

/// Where a scan reads its diagnostics from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// Run both producers over the whole project.
    #[default]
    Workspace,
    /// Read what the host's live diagnostics stream already published.
    OpenFiles,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub group_by: GroupMode,
    pub scan_mode: ScanMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Quiet window before a requested refresh starts.
    pub debounce_ms: u64,
    /// Delay before the follow-up scan queued during a running scan.
    pub follow_up_delay_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            follow_up_delay_ms: DEFAULT_FOLLOW_UP_DELAY_MS,
        }
    }
}

impl RefreshSettings {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn follow_up_delay(&self) -> Duration {
        Duration::from_millis(self.follow_up_delay_ms)
    }
}

impl Settings {
    /// Global settings path: `~/.lintlens/config.toml`.
    #[must_use]
    pub fn global_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".lintlens").join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings for `workspace_root`, returning the file they came from.
    ///
    /// An explicit path must exist. The implicit candidates are skipped when
    /// absent; when none exists the defaults are returned with `None`.
    pub fn discover(
        workspace_root: &Path,
        explicit: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path).map(|settings| (settings, Some(path.to_path_buf())));
        }

        let candidates = std::iter::once(workspace_root.join(WORKSPACE_SETTINGS_FILE))
            .chain(Self::global_path());
        for candidate in candidates {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "Loading settings");
                return Self::load_from(&candidate).map(|settings| (settings, Some(candidate)));
            }
        }

        Ok((Self::default(), None))
    }
}
