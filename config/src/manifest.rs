//! The slice of `package.json` the resolver cares about.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, serde_json::Value>,
    /// Embedded lint configuration; only its presence matters.
    #[serde(default)]
    eslint_config: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("{0}")]
    Read(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

impl PackageManifest {
    /// Read `<root>/package.json`. `Ok(None)` when the file does not exist.
    pub fn read(root: &Path) -> Result<Option<Self>, ManifestError> {
        let path = root.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(Self::parse(&content)?))
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Whether `name` appears in any dependency table.
    #[must_use]
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
            || self.dev_dependencies.contains_key(name)
            || self.peer_dependencies.contains_key(name)
    }

    #[must_use]
    pub fn has_eslint_config(&self) -> bool {
        self.eslint_config
            .as_ref()
            .is_some_and(|value| !value.is_null())
    }
}
