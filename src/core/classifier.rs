use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};

use crate::config::{ScanConfig, BUILTIN_IGNORE_PATTERNS};
use crate::error::Result;

/// Decides which paths are skipped, shown, and extracted.
///
/// Holds compiled pattern sets only; every query is a pure function of the
/// path it is given.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    ignore: GlobSet,
    important: GlobSet,
    include: GlobSet,
}

impl PathClassifier {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let ignore_patterns = BUILTIN_IGNORE_PATTERNS
            .iter()
            .copied()
            .chain(config.exclude_patterns.iter().map(String::as_str));

        Ok(Self {
            ignore: build_set(ignore_patterns)?,
            important: build_set(config.important_patterns.iter().map(String::as_str))?,
            include: build_set(config.include_patterns.iter().map(String::as_str))?,
        })
    }

    /// True when the path, given relative to the scan root, or any of its
    /// components matches an ignore pattern.
    pub fn should_ignore(&self, relative: &Path) -> bool {
        let normalized = normalize(relative);
        if normalized.is_empty() {
            return false;
        }

        if self.ignore.is_match(&normalized) {
            return true;
        }

        relative.components().any(|component| match component {
            Component::Normal(segment) => self.ignore.is_match(Path::new(segment)),
            _ => false,
        })
    }

    /// True when the file name marks a manifest, config or doc worth listing.
    pub fn is_important(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.important.is_match(Path::new(name)))
            .unwrap_or(false)
    }

    /// True when the file passes the include filter for extraction.
    pub fn is_included(&self, relative: &Path) -> bool {
        if self.include.is_match(normalize(relative)) {
            return true;
        }
        relative
            .file_name()
            .map(|name| self.include.is_match(Path::new(name)))
            .unwrap_or(false)
    }
}

fn build_set<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim().trim_end_matches('/');
        if pattern.is_empty() {
            continue;
        }
        builder.add(compile(pattern)?);
    }
    Ok(builder.build()?)
}

fn compile(pattern: &str) -> Result<Glob> {
    Ok(GlobBuilder::new(pattern).literal_separator(true).build()?)
}

/// `/`-separated form of a relative path so patterns behave the same on every platform
pub fn normalize(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        PathClassifier::new(&ScanConfig::default()).unwrap()
    }

    #[test]
    fn test_ignores_builtin_directories() {
        let classifier = classifier();

        assert!(classifier.should_ignore(Path::new("node_modules")));
        assert!(classifier.should_ignore(Path::new(".git")));
        assert!(classifier.should_ignore(Path::new("pkg/__pycache__")));
        assert!(classifier.should_ignore(Path::new("mylib.egg-info")));
        assert!(!classifier.should_ignore(Path::new("src/app.py")));
    }

    #[test]
    fn test_ignore_is_inherited_by_descendants() {
        let classifier = classifier();

        assert!(classifier.should_ignore(Path::new("node_modules/left-pad/index.js")));
        assert!(classifier.should_ignore(Path::new("a/b/build/c/d.py")));
        assert!(classifier.should_ignore(Path::new("src/cache.pyc")));
    }

    #[test]
    fn test_ignore_is_case_sensitive() {
        let classifier = classifier();

        assert!(!classifier.should_ignore(Path::new("Build/setup.py")));
        assert!(!classifier.should_ignore(Path::new("NODE_MODULES")));
    }

    #[test]
    fn test_empty_relative_path_is_never_ignored() {
        assert!(!classifier().should_ignore(Path::new("")));
    }

    #[test]
    fn test_exclude_patterns_layer_on_builtins() {
        let config = ScanConfig {
            exclude_patterns: vec!["fixtures".to_string(), "docs/legacy/**".to_string()],
            ..ScanConfig::default()
        };
        let classifier = PathClassifier::new(&config).unwrap();

        assert!(classifier.should_ignore(Path::new("tests/fixtures/sample.py")));
        assert!(classifier.should_ignore(Path::new("docs/legacy/old.md")));
        assert!(classifier.should_ignore(Path::new("node_modules")));
        assert!(!classifier.should_ignore(Path::new("docs/current.md")));
    }

    #[test]
    fn test_important_files() {
        let classifier = classifier();

        assert!(classifier.is_important(Path::new("README.md")));
        assert!(classifier.is_important(Path::new("deploy/Dockerfile")));
        assert!(classifier.is_important(Path::new("requirements-dev.txt")));
        assert!(classifier.is_important(Path::new("pyproject.toml")));
        assert!(!classifier.is_important(Path::new("notes.txt")));
        assert!(!classifier.is_important(Path::new("logo.png")));
    }

    #[test]
    fn test_include_patterns() {
        let classifier = classifier();

        assert!(classifier.is_included(Path::new("src/app.py")));
        assert!(classifier.is_included(Path::new("web/App.svelte")));
        assert!(!classifier.is_included(Path::new("README.md")));

        let config = ScanConfig {
            include_patterns: vec!["src/**/*.py".to_string()],
            ..ScanConfig::default()
        };
        let narrow = PathClassifier::new(&config).unwrap();
        assert!(narrow.is_included(Path::new("src/pkg/mod.py")));
        assert!(!narrow.is_included(Path::new("scripts/tool.py")));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = ScanConfig {
            exclude_patterns: vec!["[unclosed".to_string()],
            ..ScanConfig::default()
        };
        assert!(PathClassifier::new(&config).is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./a/b/c.py")), "a/b/c.py");
        assert_eq!(normalize(Path::new("")), "");
    }
}
