use serde::Serialize;
use std::collections::BTreeMap;
use tera::{Context, Tera};

use super::{Function, Model, ScanResult};
use crate::config::OutputFormat;
use crate::error::Result;

const TEMPLATE_NAME: &str = "technical_docs.md";
const DEFAULT_TEMPLATE: &str = include_str!("../templates/technical_docs.md");

/// Formats a finished [`ScanResult`]; it never looks at source files.
pub struct DocRenderer {
    tera: Tera,
}

#[derive(Debug, Serialize)]
struct DocumentView<'a> {
    project_name: &'a str,
    tree: &'a str,
    model_groups: Vec<FileGroup<ModelView>>,
    function_groups: Vec<FileGroup<FunctionView>>,
    failures: &'a [super::FileFailure],
}

#[derive(Debug, Serialize)]
struct FileGroup<T> {
    file: String,
    items: Vec<T>,
}

#[derive(Debug, Serialize)]
struct ModelView {
    name: String,
    base_classes: String,
    fields: Vec<FieldView>,
    methods: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FieldView {
    name: String,
    field_type: String,
    default: String,
}

#[derive(Debug, Serialize)]
struct FunctionView {
    signature: String,
    returns: String,
    docstring: Option<String>,
}

impl DocRenderer {
    /// Renderer using the built-in markdown layout
    pub fn new() -> Result<Self> {
        Self::with_template(DEFAULT_TEMPLATE)
    }

    /// Renderer using a caller-supplied Tera template
    pub fn with_template(template: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)?;
        Ok(Self { tera })
    }

    pub fn render(
        &self,
        result: &ScanResult,
        project_name: &str,
        format: OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Markdown => self.render_markdown(result, project_name),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        }
    }

    pub fn render_markdown(&self, result: &ScanResult, project_name: &str) -> Result<String> {
        let view = DocumentView {
            project_name,
            tree: &result.tree,
            model_groups: group_by_file(&result.models, |m| (&m.file, &m.name), model_view),
            function_groups: group_by_file(
                &result.functions,
                |f| (&f.file, &f.name),
                function_view,
            ),
            failures: &result.failures,
        };

        let context = Context::from_serialize(&view)?;
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }
}

/// Sort by (file, name) and bucket per file; the sort is stable so
/// same-named entities keep their source order.
fn group_by_file<'a, E, V>(
    entities: &'a [E],
    key: impl Fn(&'a E) -> (&'a String, &'a String),
    view: impl Fn(&E) -> V,
) -> Vec<FileGroup<V>> {
    let mut sorted: Vec<&E> = entities.iter().collect();
    sorted.sort_by(|a, b| key(*a).cmp(&key(*b)));

    let mut groups: BTreeMap<&String, Vec<V>> = BTreeMap::new();
    for entity in sorted {
        groups.entry(key(entity).0).or_default().push(view(entity));
    }

    groups
        .into_iter()
        .map(|(file, items)| FileGroup {
            file: file.clone(),
            items,
        })
        .collect()
}

fn model_view(model: &Model) -> ModelView {
    ModelView {
        name: model.name.clone(),
        base_classes: model.base_classes.join(", "),
        fields: model
            .fields
            .iter()
            .map(|field| FieldView {
                name: field.name.clone(),
                field_type: table_cell(field.field_type.as_deref()),
                default: table_cell(field.default.as_deref()),
            })
            .collect(),
        methods: model.methods.clone(),
    }
}

/// A table row cannot span lines; other whitespace is kept as written
fn table_cell(text: Option<&str>) -> String {
    match text {
        Some(text) => text.replace("\r\n", " ").replace('\n', " "),
        None => "-".to_string(),
    }
}

fn function_view(function: &Function) -> FunctionView {
    let params: Vec<String> = function.params.iter().map(ToString::to_string).collect();
    FunctionView {
        signature: format!("{}({})", function.name, params.join(", ")),
        returns: function
            .returns
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        docstring: function.docstring.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ModelField, Param};

    fn sample() -> ScanResult {
        ScanResult {
            models: vec![
                Model {
                    name: "User".to_string(),
                    file: "app/models.py".to_string(),
                    fields: vec![
                        ModelField {
                            name: "name".to_string(),
                            field_type: Some("str".to_string()),
                            default: None,
                        },
                        ModelField {
                            name: "active".to_string(),
                            field_type: Some("bool".to_string()),
                            default: Some("True".to_string()),
                        },
                    ],
                    methods: vec!["save".to_string()],
                    base_classes: vec!["Base".to_string(), "Mixin".to_string()],
                },
                Model {
                    name: "Account".to_string(),
                    file: "app/models.py".to_string(),
                    fields: vec![],
                    methods: vec![],
                    base_classes: vec![],
                },
            ],
            functions: vec![Function {
                name: "load".to_string(),
                file: "app/io.py".to_string(),
                params: vec![Param::new("path", Some("str".to_string())), Param::untyped("mode")],
                returns: None,
                docstring: Some("Load a file.".to_string()),
            }],
            tree: "project/\n└── app/".to_string(),
            files_scanned: 2,
            failures: vec![],
        }
    }

    #[test]
    fn test_markdown_sections() {
        let renderer = DocRenderer::new().unwrap();
        let doc = renderer.render_markdown(&sample(), "project").unwrap();

        assert!(doc.starts_with("# Technical Documentation"));
        assert!(doc.contains("*Auto-generated from: project*"));
        assert!(doc.contains("project/\n└── app/"));
        assert!(doc.contains("### app/models.py"));
        assert!(doc.contains("*Inherits from: Base, Mixin*"));
        assert!(doc.contains("| `name` | `str` | `-` |"));
        assert!(doc.contains("| `active` | `bool` | `True` |"));
        assert!(doc.contains("- `save()`"));
        assert!(doc.contains("#### `load(path: str, mode)`"));
        assert!(doc.contains("*Returns: `unknown`*"));
        assert!(doc.contains("Load a file."));

        // Models are sorted by name within a file
        let account = doc.find("#### `Account`").unwrap();
        let user = doc.find("#### `User`").unwrap();
        assert!(account < user);
    }

    #[test]
    fn test_multiline_default_stays_in_its_row() {
        let mut result = sample();
        result.models[0].fields[1].default = Some("\"a  b\nc\"".to_string());

        let doc = DocRenderer::new()
            .unwrap()
            .render_markdown(&result, "project")
            .unwrap();
        assert!(doc.contains("| `active` | `bool` | `\"a  b c\"` |"));
    }

    #[test]
    fn test_markdown_empty_result() {
        let renderer = DocRenderer::new().unwrap();
        let doc = renderer
            .render_markdown(&ScanResult::default(), "empty")
            .unwrap();

        assert!(doc.contains("*No models or classes found*"));
        assert!(doc.contains("*No functions found*"));
    }

    #[test]
    fn test_json_output() {
        let renderer = DocRenderer::new().unwrap();
        let json = renderer
            .render(&sample(), "project", OutputFormat::Json)
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["models"][0]["name"], "User");
        assert_eq!(value["models"][0]["fields"][0]["type"], "str");
        assert_eq!(value["functions"][0]["returns"], serde_json::Value::Null);
    }

    #[test]
    fn test_custom_template() {
        let renderer =
            DocRenderer::with_template("{{ project_name }}: {{ model_groups | length }}").unwrap();
        let doc = renderer.render_markdown(&sample(), "demo").unwrap();
        assert_eq!(doc, "demo: 1");
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        assert!(DocRenderer::with_template("{% if %}").is_err());
    }
}
