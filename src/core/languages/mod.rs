//! Language-specific extractors
//!
//! Python goes through a real tree-sitter parse. The JavaScript family
//! (plain scripts, TypeScript and Svelte components) is handled lexically with
//! regular expressions, which tolerates the looser superset syntax without a
//! grammar per dialect.

mod javascript;
mod python;

pub use javascript::{JavaScriptExtractor, ScriptFlavor};
pub use python::PythonExtractor;

use std::path::Path;

use super::Extraction;
use crate::error::Result;

/// Trait that all language extractors implement
pub trait LanguageExtractor {
    /// Recover models and functions from one file's contents.
    ///
    /// `file` is the scan-relative path stamped onto every entity.
    fn extract(&mut self, content: &str, file: &str) -> Result<Extraction>;

    /// Get the language name
    fn language_name(&self) -> &str;
}

/// Closed set of languages with an extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    /// JavaScript and TypeScript sources
    Script,
    /// Single-file components whose code lives in `<script>` blocks
    Component,
}

impl Language {
    /// Select the extractor family for a path by its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "py" | "pyi" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" => Some(Self::Script),
            "svelte" => Some(Self::Component),
            _ => None,
        }
    }
}

/// One extractor per language, created once per scan and reused across files
pub struct Extractors {
    python: PythonExtractor,
    script: JavaScriptExtractor,
    component: JavaScriptExtractor,
}

impl Extractors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            python: PythonExtractor::new()?,
            script: JavaScriptExtractor::new(ScriptFlavor::Script)?,
            component: JavaScriptExtractor::new(ScriptFlavor::Component)?,
        })
    }

    pub fn for_language(&mut self, language: Language) -> &mut dyn LanguageExtractor {
        match language {
            Language::Python => &mut self.python,
            Language::Script => &mut self.script,
            Language::Component => &mut self.component,
        }
    }
}
