mod classifier;
mod engine;
mod model;
mod renderer;
mod scanner;
mod tree;

// Language-specific extractors
pub mod languages;

pub use classifier::PathClassifier;
pub use model::{Extraction, FileFailure, Function, Model, ModelField, Param, ScanResult};
pub use renderer::DocRenderer;
pub use scanner::Scanner;
pub use tree::TreeBuilder;

// Export the main engine
pub use engine::{Engine, GenerateOptions};
