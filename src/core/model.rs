use serde::{Deserialize, Serialize};

/// A single parameter of an extracted function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name as written, including `*`/`**`/`...` prefixes
    pub name: String,

    /// Type annotation text, when the language and source provide one
    pub type_annotation: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, type_annotation: Option<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation,
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.type_annotation {
            Some(ty) => write!(f, "{}: {}", self.name, ty),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A free-standing function declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,

    /// Path relative to the scan root, `/`-separated
    pub file: String,

    pub params: Vec<Param>,

    pub returns: Option<String>,

    /// First line of the attached documentation
    pub docstring: Option<String>,
}

/// A field of a class-like declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: Option<String>,

    /// Source text of the default value expression
    pub default: Option<String>,
}

/// A class-like declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,

    /// Path relative to the scan root, `/`-separated
    pub file: String,

    pub fields: Vec<ModelField>,

    /// Method names in declaration order
    pub methods: Vec<String>,

    /// Parent type names as written, not resolved
    pub base_classes: Vec<String>,
}

/// Entities recovered from one file, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub models: Vec<Model>,
    pub functions: Vec<Function>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.functions.is_empty()
    }
}

/// A file that was visited but contributed nothing because of an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub reason: String,
}

/// Everything a scan hands to the renderer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub models: Vec<Model>,
    pub functions: Vec<Function>,
    pub tree: String,
    pub files_scanned: usize,
    pub failures: Vec<FileFailure>,
}
