use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{DocRenderer, ScanResult, Scanner, TreeBuilder};
use crate::config::{Config, OutputFormat};

/// Main orchestration engine: scan, render, write
pub struct Engine {
    config: Config,
}

/// Per-invocation overrides from the command line
#[derive(Debug, Default, Clone)]
pub struct GenerateOptions {
    pub output: Option<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub format: Option<OutputFormat>,
}

impl Engine {
    /// Create a new engine instance from an optional config file path
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Scan `source` and write the rendered document; returns the scan and the output path
    pub fn generate(&mut self, source: &Path, options: GenerateOptions) -> Result<(ScanResult, PathBuf)> {
        // Extra include patterns also mark files worth showing in the tree
        self.config
            .scan
            .important_patterns
            .extend(options.include.iter().cloned());
        self.config.scan.include_patterns.extend(options.include);
        self.config.scan.exclude_patterns.extend(options.exclude);
        if let Some(output) = options.output {
            self.config.output.path = output;
        }
        if let Some(format) = options.format {
            self.config.output.format = format;
        }

        info!("Generating documentation for: {}", source.display());

        let mut scanner = Scanner::new(&self.config.scan)?;
        let result = scanner
            .scan(source)
            .with_context(|| format!("Failed to scan {}", source.display()))?;

        let renderer = match &self.config.templates.template_file {
            Some(template_file) => {
                let template = std::fs::read_to_string(template_file).with_context(|| {
                    format!("Failed to read template {}", template_file.display())
                })?;
                DocRenderer::with_template(&template)?
            }
            None => DocRenderer::new()?,
        };

        let project_name = self.project_name(source);
        let document = renderer.render(&result, &project_name, self.config.output.format)?;

        let output_path = if self.config.output.path.is_absolute() {
            self.config.output.path.clone()
        } else {
            source.join(&self.config.output.path)
        };
        std::fs::write(&output_path, document)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        info!("Documentation generated: {}", output_path.display());
        info!("  - {} models documented", result.models.len());
        info!("  - {} functions documented", result.functions.len());
        info!("  - {} lines in tree", result.tree.lines().count());

        Ok((result, output_path))
    }

    /// Build only the tree text for `source`
    pub fn tree(&self, source: &Path) -> Result<String> {
        if !source.is_dir() {
            anyhow::bail!("Path is not a directory: {}", source.display());
        }
        let scanner = Scanner::new(&self.config.scan)?;
        Ok(TreeBuilder::new(scanner.classifier()).build(source))
    }

    /// Write a default configuration file into `dir`
    pub fn init(&self, dir: &Path, force: bool) -> Result<PathBuf> {
        let path = dir.join("treedoc.toml");
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Config::default().save(&path)?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    fn project_name(&self, source: &Path) -> String {
        if let Some(name) = &self.config.project.name {
            return name.clone();
        }
        source
            .canonicalize()
            .ok()
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().to_string()))
            .unwrap_or_else(|| source.display().to_string())
    }
}
