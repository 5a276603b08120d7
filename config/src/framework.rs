//! Project framework detection.
//!
//! Signatures are checked in table order and the first match wins. Each
//! framework contributes the build-output globs that should never show up in
//! the diagnostics list, and whether `vue-tsc` replaces `tsc`.

use std::path::Path;

use serde::Serialize;

use crate::manifest::PackageManifest;

struct Signature {
    name: &'static str,
    /// Any one of these files in the root counts as a marker hit.
    markers: &'static [&'static str],
    /// When set, the manifest must also depend on this package.
    dependency: Option<&'static str>,
    excludes: &'static [&'static str],
    uses_vue_checker: bool,
}

const VITE_CONFIGS: &[&str] = &["vite.config.ts", "vite.config.js", "vite.config.mjs"];

const SIGNATURES: &[Signature] = &[
    Signature {
        name: "Nuxt",
        markers: &["nuxt.config.ts", "nuxt.config.js", "nuxt.config.mjs"],
        dependency: None,
        excludes: &["**/.nuxt/**", "**/.output/**"],
        uses_vue_checker: true,
    },
    Signature {
        name: "Next.js",
        markers: &["next.config.js", "next.config.mjs", "next.config.ts"],
        dependency: None,
        excludes: &["**/.next/**", "**/out/**"],
        uses_vue_checker: false,
    },
    Signature {
        name: "SvelteKit",
        markers: &["svelte.config.js", "svelte.config.mjs"],
        dependency: Some("@sveltejs/kit"),
        excludes: &["**/.svelte-kit/**", "**/build/**"],
        uses_vue_checker: false,
    },
    Signature {
        name: "Astro",
        markers: &["astro.config.mjs", "astro.config.ts", "astro.config.js"],
        dependency: None,
        excludes: &["**/.astro/**", "**/dist/**"],
        uses_vue_checker: false,
    },
    Signature {
        name: "Angular",
        markers: &["angular.json"],
        dependency: None,
        excludes: &["**/.angular/**", "**/dist/**"],
        uses_vue_checker: false,
    },
    Signature {
        name: "Remix",
        markers: &["remix.config.js", "remix.config.mjs"],
        dependency: None,
        excludes: &["**/build/**", "**/public/build/**", "**/.cache/**"],
        uses_vue_checker: false,
    },
    Signature {
        name: "Gatsby",
        markers: &["gatsby-config.js", "gatsby-config.ts"],
        dependency: None,
        excludes: &["**/.cache/**", "**/public/**"],
        uses_vue_checker: false,
    },
    Signature {
        name: "Vue (Vite)",
        markers: VITE_CONFIGS,
        dependency: Some("vue"),
        excludes: &["**/dist/**"],
        uses_vue_checker: true,
    },
    Signature {
        name: "React (Vite)",
        markers: VITE_CONFIGS,
        dependency: Some("react"),
        excludes: &["**/dist/**"],
        uses_vue_checker: false,
    },
    Signature {
        name: "Vue CLI",
        markers: &["vue.config.js"],
        dependency: Some("@vue/cli-service"),
        excludes: &["**/dist/**"],
        uses_vue_checker: true,
    },
];

/// Detected framework classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Framework {
    name: String,
    exclude_patterns: Vec<String>,
    uses_vue_checker: bool,
}

impl Framework {
    fn from_signature(signature: &Signature) -> Self {
        Self {
            name: signature.name.to_string(),
            exclude_patterns: signature.excludes.iter().map(ToString::to_string).collect(),
            uses_vue_checker: signature.uses_vue_checker,
        }
    }

    fn generic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exclude_patterns: Vec::new(),
            uses_vue_checker: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    #[must_use]
    pub fn uses_vue_checker(&self) -> bool {
        self.uses_vue_checker
    }
}

/// Whether `file_name` is a marker of any known framework.
#[must_use]
pub fn is_framework_marker(file_name: &str) -> bool {
    SIGNATURES
        .iter()
        .any(|signature| signature.markers.contains(&file_name))
}

/// Classify the project at `root`.
///
/// `has_type_check_config` and `manifest` come from the resolver so the
/// manifest is only read once per resolution.
#[must_use]
pub fn detect_framework(
    root: &Path,
    manifest: Option<&PackageManifest>,
    has_type_check_config: bool,
) -> Option<Framework> {
    for signature in SIGNATURES {
        let marker_hit = signature
            .markers
            .iter()
            .any(|marker| root.join(marker).is_file());
        if !marker_hit {
            continue;
        }
        let dependency_ok = match signature.dependency {
            None => true,
            Some(dep) => manifest.is_some_and(|m| m.has_dependency(dep)),
        };
        if dependency_ok {
            return Some(Framework::from_signature(signature));
        }
    }

    if has_type_check_config {
        Some(Framework::generic("TypeScript"))
    } else if manifest.is_some() {
        Some(Framework::generic("JavaScript"))
    } else {
        None
    }
}
