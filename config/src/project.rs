//! Config & framework resolution for a workspace.
//!
//! Resolution never fails: anything missing becomes a [`ConfigWarning`] on the
//! returned [`ProjectConfig`] and the affected producer is simply not run.
//! Search order is a tie-break policy; re-running on an unchanged workspace
//! yields an identical `ProjectConfig`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::framework::{Framework, detect_framework, is_framework_marker};
use crate::manifest::{MANIFEST_FILE, PackageManifest};
use crate::settings::ProducerSettings;

/// Conventional type-check config names, in priority order.
pub const TYPE_CHECK_CONFIG_FILES: &[&str] = &[
    "tsconfig.json",
    "tsconfig.app.json",
    "tsconfig.build.json",
    "jsconfig.json",
];

/// Flat-config lint files, checked before the legacy ones.
pub const FLAT_LINT_CONFIG_FILES: &[&str] = &[
    "eslint.config.js",
    "eslint.config.mjs",
    "eslint.config.cjs",
    "eslint.config.ts",
    "eslint.config.mts",
    "eslint.config.cts",
];

pub const LEGACY_LINT_CONFIG_FILES: &[&str] = &[
    ".eslintrc.js",
    ".eslintrc.cjs",
    ".eslintrc.yaml",
    ".eslintrc.yml",
    ".eslintrc.json",
    ".eslintrc",
];

/// Where the lint configuration lives, which also decides invocation syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "format", content = "path", rename_all = "kebab-case")]
pub enum LintConfigLocation {
    Flat(PathBuf),
    Legacy(PathBuf),
    /// `eslintConfig` embedded in `package.json`; legacy format.
    PackageManifest(PathBuf),
}

impl LintConfigLocation {
    /// Classify a lint config file by its name.
    #[must_use]
    pub fn classify(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name == MANIFEST_FILE {
            Self::PackageManifest(path)
        } else if name.starts_with("eslint.config.") {
            Self::Flat(path)
        } else {
            Self::Legacy(path)
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Flat(path) | Self::Legacy(path) | Self::PackageManifest(path) => path,
        }
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat(_))
    }
}

/// Soft failures found while resolving a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ConfigWarning {
    #[error("no type-check configuration found in {}", root.display())]
    TypeCheckConfigNotFound { root: PathBuf },
    #[error("no lint configuration found in {}", root.display())]
    LintConfigNotFound { root: PathBuf },
    #[error("{kind} override {} does not exist", path.display())]
    OverrideNotFound { kind: &'static str, path: PathBuf },
    #[error("could not read {}: {reason}", path.display())]
    ManifestUnreadable { path: PathBuf, reason: String },
}

/// Explicit config paths supplied by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub type_check_config: Option<PathBuf>,
    pub lint_config: Option<PathBuf>,
}

impl From<&ProducerSettings> for ConfigOverrides {
    fn from(settings: &ProducerSettings) -> Self {
        Self {
            type_check_config: settings.type_check_config.clone(),
            lint_config: settings.lint_config.clone(),
        }
    }
}

/// Resolved configuration for one workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectConfig {
    workspace_root: PathBuf,
    type_check_config: Option<PathBuf>,
    lint_config: Option<LintConfigLocation>,
    framework: Option<Framework>,
    warnings: Vec<ConfigWarning>,
}

impl ProjectConfig {
    /// A config with nothing resolved, for hosts that bypass discovery.
    #[must_use]
    pub fn bare(workspace_root: PathBuf) -> Self {
        Self {
            workspace_root,
            type_check_config: None,
            lint_config: None,
            framework: None,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_type_check_config(mut self, path: PathBuf) -> Self {
        self.type_check_config = Some(path);
        self
    }

    #[must_use]
    pub fn with_lint_config(mut self, location: LintConfigLocation) -> Self {
        self.lint_config = Some(location);
        self
    }

    #[must_use]
    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    #[must_use]
    pub fn type_check_config(&self) -> Option<&Path> {
        self.type_check_config.as_deref()
    }

    #[must_use]
    pub fn lint_config(&self) -> Option<&LintConfigLocation> {
        self.lint_config.as_ref()
    }

    #[must_use]
    pub fn framework(&self) -> Option<&Framework> {
        self.framework.as_ref()
    }

    #[must_use]
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Framework-derived exclusion globs (empty without a framework).
    #[must_use]
    pub fn framework_excludes(&self) -> &[String] {
        match &self.framework {
            Some(fw) => fw.exclude_patterns(),
            None => &[],
        }
    }

    #[must_use]
    pub fn uses_vue_checker(&self) -> bool {
        self.framework
            .as_ref()
            .is_some_and(Framework::uses_vue_checker)
    }
}

fn resolve_override(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn first_existing(root: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| root.join(name))
        .find(|candidate| candidate.is_file())
}

fn find_type_check_config(
    root: &Path,
    overrides: &ConfigOverrides,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<PathBuf> {
    if let Some(path) = &overrides.type_check_config {
        let resolved = resolve_override(root, path);
        if resolved.is_file() {
            return Some(resolved);
        }
        warnings.push(ConfigWarning::OverrideNotFound {
            kind: "type-check config",
            path: resolved,
        });
    }
    first_existing(root, TYPE_CHECK_CONFIG_FILES)
}

/// Locate the lint configuration without consulting user overrides.
///
/// The lint producer calls this directly to pick its invocation syntax.
#[must_use]
pub fn discover_lint_config(
    root: &Path,
    manifest: Option<&PackageManifest>,
) -> Option<LintConfigLocation> {
    if let Some(path) = first_existing(root, FLAT_LINT_CONFIG_FILES) {
        return Some(LintConfigLocation::Flat(path));
    }
    if let Some(path) = first_existing(root, LEGACY_LINT_CONFIG_FILES) {
        return Some(LintConfigLocation::Legacy(path));
    }
    manifest
        .filter(|m| m.has_eslint_config())
        .map(|_| LintConfigLocation::PackageManifest(root.join(MANIFEST_FILE)))
}

fn find_lint_config(
    root: &Path,
    overrides: &ConfigOverrides,
    manifest: Option<&PackageManifest>,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<LintConfigLocation> {
    if let Some(path) = &overrides.lint_config {
        let resolved = resolve_override(root, path);
        if resolved.is_file() {
            return Some(LintConfigLocation::classify(resolved));
        }
        warnings.push(ConfigWarning::OverrideNotFound {
            kind: "lint config",
            path: resolved,
        });
    }
    discover_lint_config(root, manifest)
}

/// Whether a change to `path` can alter what [`resolve_project`] returns.
#[must_use]
pub fn affects_resolution(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name == MANIFEST_FILE
        || TYPE_CHECK_CONFIG_FILES.contains(&name)
        || FLAT_LINT_CONFIG_FILES.contains(&name)
        || LEGACY_LINT_CONFIG_FILES.contains(&name)
        || is_framework_marker(name)
}

/// Resolve type-check config, lint config and framework for `root`.
#[must_use]
pub fn resolve_project(root: &Path, overrides: &ConfigOverrides) -> ProjectConfig {
    let mut warnings = Vec::new();

    let manifest = match PackageManifest::read(root) {
        Ok(manifest) => manifest,
        Err(e) => {
            warnings.push(ConfigWarning::ManifestUnreadable {
                path: root.join(MANIFEST_FILE),
                reason: e.to_string(),
            });
            None
        }
    };

    let type_check_config = find_type_check_config(root, overrides, &mut warnings);
    if type_check_config.is_none() {
        warnings.push(ConfigWarning::TypeCheckConfigNotFound {
            root: root.to_path_buf(),
        });
    }

    let lint_config = find_lint_config(root, overrides, manifest.as_ref(), &mut warnings);
    if lint_config.is_none() {
        warnings.push(ConfigWarning::LintConfigNotFound {
            root: root.to_path_buf(),
        });
    }

    let framework = detect_framework(root, manifest.as_ref(), type_check_config.is_some());

    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(
        root = %root.display(),
        type_check = ?type_check_config,
        lint = ?lint_config.as_ref().map(LintConfigLocation::path),
        framework = framework.as_ref().map_or("none", Framework::name),
        "Resolved project configuration"
    );

    ProjectConfig {
        workspace_root: root.to_path_buf(),
        type_check_config,
        lint_config,
        framework,
        warnings,
    }
}
