use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TreedocError};

/// Names that are never scanned or shown, whatever the configuration says.
pub const BUILTIN_IGNORE_PATTERNS: &[&str] = &[
    // Version control
    ".git",
    ".hg",
    ".svn",
    // Python caches and environments
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".tox",
    ".venv",
    "venv",
    "env",
    ".env",
    "*.pyc",
    "*.pyo",
    "*.egg-info",
    "__package__",
    // JavaScript dependencies and build output
    "node_modules",
    ".svelte-kit",
    ".next",
    "dist",
    "build",
    "target",
    "output",
    "generated",
    // Editors and OS metadata
    ".idea",
    ".vscode",
    "*.swp",
    ".DS_Store",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Which files are walked, extracted and shown
    pub scan: ScanConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Template customization
    pub templates: TemplateConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Display name; the scanned directory name is used when unset
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// A file must match one of these to be handed to an extractor
    pub include_patterns: Vec<String>,

    /// Extra ignore patterns layered on top of the built-in set
    pub exclude_patterns: Vec<String>,

    /// Files shown in the tree even though they are not parsed
    pub important_patterns: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Document path; relative paths resolve against the scanned root
    pub path: PathBuf,

    /// Rendering format
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Tera template replacing the built-in markdown layout
    pub template_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            scan: ScanConfig::default(),
            output: OutputConfig::default(),
            templates: TemplateConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        let include_patterns = [
            "*.py", "*.pyi", "*.js", "*.jsx", "*.mjs", "*.cjs", "*.ts", "*.tsx", "*.mts", "*.cts",
            "*.svelte",
        ];
        let important_patterns = [
            "*.md",
            "*.rst",
            "requirements*.txt",
            "*.yml",
            "*.yaml",
            "*.toml",
            "*.cfg",
            "*.ini",
            "Dockerfile",
            "docker-compose*.yml",
            "Makefile",
            ".env.example",
            "setup.py",
            "package.json",
            "package-lock.json",
            "yarn.lock",
            "pnpm-lock.yaml",
            "poetry.lock",
            "tsconfig.json",
            "svelte.config.js",
            "vite.config.ts",
        ];

        Self {
            include_patterns: include_patterns.iter().map(|p| p.to_string()).collect(),
            exclude_patterns: Vec::new(),
            important_patterns: important_patterns.iter().map(|p| p.to_string()).collect(),
            max_file_size: 1024 * 1024, // 1MB
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("TECHNICAL_DOCS.md"),
            format: OutputFormat::Markdown,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = TreedocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(TreedocError::Config(format!("Unknown output format: {}", other))),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| TreedocError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TreedocError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = ["treedoc.toml", ".treedoc.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}
