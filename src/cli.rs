use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputFormat;
use crate::core::{Engine, GenerateOptions};

#[derive(Parser)]
#[command(name = "treedoc")]
#[command(about = "Structural summaries of Python and JavaScript/TypeScript source trees")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a source tree and write the documentation file
    Generate {
        /// Root path of the codebase
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output file (relative paths are placed under the scanned root)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Additional patterns for files to show and scan (comma-separated)
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Additional exclude patterns (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Output format (markdown, json)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Print the filtered project tree
    Tree {
        /// Root path of the codebase
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Write a default treedoc.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn execute(self, mut engine: Engine) -> Result<()> {
        match self.command {
            Commands::Generate {
                path,
                output,
                include,
                exclude,
                format,
            } => {
                let options = GenerateOptions {
                    output,
                    include: trimmed(include),
                    exclude: trimmed(exclude),
                    format,
                };
                let (result, output_path) = engine.generate(&path, options)?;
                println!("✓ Documentation generated: {}", output_path.display());
                println!("  Models: {}", result.models.len());
                println!("  Functions: {}", result.functions.len());
                if !result.failures.is_empty() {
                    println!("  Skipped files: {}", result.failures.len());
                }
                Ok(())
            }
            Commands::Tree { path } => {
                println!("{}", engine.tree(&path)?);
                Ok(())
            }
            Commands::Init { path, force } => {
                let dir = path.unwrap_or_else(|| PathBuf::from("."));
                let written = engine.init(&dir, force)?;
                println!("✓ Wrote {}", written.display());
                Ok(())
            }
        }
    }
}

fn trimmed(patterns: Vec<String>) -> Vec<String> {
    patterns
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_args() {
        let cli = Cli::parse_from([
            "treedoc",
            "generate",
            "src",
            "-o",
            "DOCS.md",
            "--exclude",
            "fixtures, legacy",
            "--format",
            "json",
        ]);

        match cli.command {
            Commands::Generate {
                path,
                output,
                exclude,
                format,
                ..
            } => {
                assert_eq!(path, PathBuf::from("src"));
                assert_eq!(output, Some(PathBuf::from("DOCS.md")));
                assert_eq!(trimmed(exclude), vec!["fixtures", "legacy"]);
                assert_eq!(format, Some(OutputFormat::Json));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_default_path() {
        let cli = Cli::parse_from(["treedoc", "-v", "tree"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Tree { path } if path == PathBuf::from(".")));
    }
}
