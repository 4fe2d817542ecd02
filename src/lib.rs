//! Structural documentation for Python and JavaScript/TypeScript/Svelte
//! source trees: a filtered project tree plus an inventory of classes,
//! fields and functions, rendered as markdown or JSON.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use config::{Config, OutputFormat};
pub use core::{Engine, GenerateOptions, ScanResult, Scanner};
pub use error::{Result, TreedocError};
