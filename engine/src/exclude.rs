//! Glob-like exclude patterns.
//!
//! Two wildcards are supported: `**` spans any number of path segments and
//! `*` stays inside one segment. A leading `**/` may match zero segments and
//! a trailing `/**` may match nothing, so `**/dist/**` also excludes a
//! top-level `dist` file. Patterns are anchored at both ends and matched
//! against the root-relative path with `/` separators.

use std::path::{Component, Path};

use regex::RegexSet;

/// Translate one pattern into an anchored regular expression.
#[must_use]
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**/") {
            out.push_str("(?:.*/)?");
            rest = tail;
        } else if rest == "/**" {
            out.push_str("(?:/.*)?");
            rest = "";
        } else if let Some(tail) = rest.strip_prefix("**") {
            out.push_str(".*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            out.push_str("[^/]*");
            rest = tail;
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            }
            rest = chars.as_str();
        }
    }
    out.push('$');
    out
}

/// Root-relative path with forward slashes.
///
/// Paths outside the root stay absolute (`/opt/lib/x.ts`), so they never pass
/// for workspace paths. Patterns starting with `**` still reach them.
#[must_use]
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut out = String::new();
    for component in relative.components() {
        let part = match component {
            Component::Normal(part) => part.to_string_lossy(),
            Component::ParentDir => "..".into(),
            Component::Prefix(prefix) => {
                out.push_str(&prefix.as_os_str().to_string_lossy());
                continue;
            }
            Component::RootDir => {
                out.push('/');
                continue;
            }
            Component::CurDir => continue,
        };
        if !out.is_empty() && !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(&part);
    }
    out
}

/// Compiled set of exclude patterns.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    set: RegexSet,
}

impl ExcludeMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let regexes: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .map(|p| glob_to_regex(&p))
            .collect();
        Ok(Self {
            set: RegexSet::new(regexes)?,
        })
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Match an already root-relative, slash-separated path.
    #[must_use]
    pub fn is_excluded(&self, relative: &str) -> bool {
        self.set.is_match(relative)
    }
}
