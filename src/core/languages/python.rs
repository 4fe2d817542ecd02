use tree_sitter::{Language, Node, Parser};

use super::LanguageExtractor;
use crate::core::{Extraction, Function, Model, ModelField, Param};
use crate::error::{Result, TreedocError};

/// Methods whose `self.<attr> = ...` assignments declare instance fields
const INITIALIZERS: &[&str] = &["__init__", "__post_init__"];

/// Leading parameters that are bound implicitly and never shown
const IMPLICIT_RECEIVERS: &[&str] = &["self", "cls"];

/// Python extractor backed by a full tree-sitter parse
pub struct PythonExtractor {
    parser: Parser,
}

/// Where a definition sits, for deciding whether a function is module-level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Module,
    Nested,
}

impl PythonExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let python_language: Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&python_language)
            .map_err(|e| TreedocError::Parser(format!("Failed to set Python language: {}", e)))?;

        Ok(Self { parser })
    }
}

impl LanguageExtractor for PythonExtractor {
    fn extract(&mut self, content: &str, file: &str) -> Result<Extraction> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| TreedocError::Parser("Failed to parse Python code".to_string()))?;

        let root_node = tree.root_node();
        if root_node.has_error() {
            let (line, column) = first_error_position(root_node);
            return Err(TreedocError::Syntax { line, column });
        }

        let mut extraction = Extraction::default();
        self.extract_python_items(root_node, content, file, Scope::Module, &mut extraction);
        Ok(extraction)
    }

    fn language_name(&self) -> &str {
        "python"
    }
}

impl PythonExtractor {
    /// Walk the tree in source order collecting classes anywhere and functions at module scope
    fn extract_python_items(
        &self,
        node: Node,
        source: &str,
        file: &str,
        scope: Scope,
        out: &mut Extraction,
    ) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "class_definition" => {
                    if let Some(model) = self.parse_class(child, source, file) {
                        out.models.push(model);
                    }
                    if let Some(body) = child.child_by_field_name("body") {
                        self.extract_python_items(body, source, file, Scope::Nested, out);
                    }
                }
                "function_definition" => {
                    if scope == Scope::Module {
                        if let Some(function) = self.parse_function(child, source, file) {
                            out.functions.push(function);
                        }
                    }
                    if let Some(body) = child.child_by_field_name("body") {
                        self.extract_python_items(body, source, file, Scope::Nested, out);
                    }
                }
                _ => self.extract_python_items(child, source, file, scope, out),
            }
        }
    }

    fn parse_class(&self, node: Node, source: &str, file: &str) -> Option<Model> {
        let name = node_text(node.child_by_field_name("name")?, source).to_string();

        let base_classes = node
            .child_by_field_name("superclasses")
            .map(|bases| self.extract_base_classes(bases, source))
            .unwrap_or_default();

        let mut fields = Vec::new();
        let mut methods = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for item in body.named_children(&mut cursor) {
                match item.kind() {
                    "expression_statement" => {
                        let mut expr_cursor = item.walk();
                        for expr in item.named_children(&mut expr_cursor) {
                            if expr.kind() == "assignment" {
                                self.collect_class_assignment(expr, source, &mut fields);
                            }
                        }
                    }
                    "function_definition" | "decorated_definition" => {
                        let Some(method) = unwrap_decorated(item) else {
                            continue;
                        };
                        let Some(method_name) = method.child_by_field_name("name") else {
                            continue;
                        };
                        let method_name = node_text(method_name, source);
                        if INITIALIZERS.contains(&method_name) {
                            self.collect_initializer_fields(method, source, &mut fields);
                        }
                        methods.push(method_name.to_string());
                    }
                    _ => {}
                }
            }
        }

        Some(Model {
            name,
            file: file.to_string(),
            fields,
            methods,
            base_classes,
        })
    }

    fn extract_base_classes(&self, bases: Node, source: &str) -> Vec<String> {
        let mut cursor = bases.walk();
        bases
            .named_children(&mut cursor)
            .filter(|base| !matches!(base.kind(), "keyword_argument" | "comment"))
            .map(|base| node_text(base, source).to_string())
            .collect()
    }

    /// `name: T = v`, `name: T`, `name = v`, and chained `a = b = v` in a class body
    fn collect_class_assignment(&self, node: Node, source: &str, fields: &mut Vec<ModelField>) {
        let mut targets = Vec::new();
        let mut current = node;
        let field_type = node
            .child_by_field_name("type")
            .map(|ty| node_text(ty, source).to_string());

        let value = loop {
            if let Some(left) = current.child_by_field_name("left") {
                targets.push(left);
            }
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                other => break other,
            }
        };
        let default = value.map(|value| node_text(value, source).to_string());

        for target in targets {
            if target.kind() == "identifier" {
                push_field(
                    fields,
                    ModelField {
                        name: node_text(target, source).to_string(),
                        field_type: field_type.clone(),
                        default: default.clone(),
                    },
                );
            }
        }
    }

    /// Attribute assignments on the receiver inside an initializer body
    fn collect_initializer_fields(&self, method: Node, source: &str, fields: &mut Vec<ModelField>) {
        let Some(receiver) = method
            .child_by_field_name("parameters")
            .and_then(|params| self.extract_params(params, source).into_iter().next())
            .map(|param| param.name)
        else {
            return;
        };

        if let Some(body) = method.child_by_field_name("body") {
            self.walk_receiver_assignments(body, source, &receiver, fields);
        }
    }

    fn walk_receiver_assignments(
        &self,
        node: Node,
        source: &str,
        receiver: &str,
        fields: &mut Vec<ModelField>,
    ) {
        match node.kind() {
            // Nested scopes do not assign the receiver's attributes
            "function_definition" | "class_definition" | "lambda" => return,
            "assignment" => {
                let field_type = node
                    .child_by_field_name("type")
                    .map(|ty| node_text(ty, source).to_string());
                if let Some(left) = node.child_by_field_name("left") {
                    for name in receiver_attributes(left, source, receiver) {
                        push_field(
                            fields,
                            ModelField {
                                name,
                                field_type: field_type.clone(),
                                default: None,
                            },
                        );
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk_receiver_assignments(child, source, receiver, fields);
        }
    }

    fn parse_function(&self, node: Node, source: &str, file: &str) -> Option<Function> {
        let name = node_text(node.child_by_field_name("name")?, source).to_string();

        let mut params = node
            .child_by_field_name("parameters")
            .map(|params| self.extract_params(params, source))
            .unwrap_or_default();
        if params
            .first()
            .is_some_and(|first| IMPLICIT_RECEIVERS.contains(&first.name.as_str()))
        {
            params.remove(0);
        }

        let returns = node
            .child_by_field_name("return_type")
            .map(|ty| node_text(ty, source).to_string());

        Some(Function {
            name,
            file: file.to_string(),
            params,
            returns,
            docstring: self.extract_docstring(node, source),
        })
    }

    fn extract_params(&self, params: Node, source: &str) -> Vec<Param> {
        let mut cursor = params.walk();
        let mut result = Vec::new();

        for param in params.named_children(&mut cursor) {
            let type_annotation = param
                .child_by_field_name("type")
                .map(|ty| node_text(ty, source).to_string());

            let name = match param.kind() {
                "positional_separator" | "keyword_separator" | "comment" => continue,
                "default_parameter" | "typed_default_parameter" => param
                    .child_by_field_name("name")
                    .map(|name| node_text(name, source)),
                "typed_parameter" => param.named_child(0).map(|name| node_text(name, source)),
                _ => Some(node_text(param, source)),
            };

            if let Some(name) = name {
                result.push(Param::new(name, type_annotation));
            }
        }

        result
    }

    /// First line of the string literal opening a function body
    fn extract_docstring(&self, node: Node, source: &str) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let mut cursor = body.walk();
        let first = body
            .named_children(&mut cursor)
            .find(|child| child.kind() != "comment")?;

        if first.kind() != "expression_statement" || first.named_child_count() != 1 {
            return None;
        }
        let literal = first.named_child(0)?;
        if literal.kind() != "string" {
            return None;
        }

        docstring_first_line(node_text(literal, source))
    }
}

fn unwrap_decorated(node: Node) -> Option<Node> {
    match node.kind() {
        "decorated_definition" => node
            .child_by_field_name("definition")
            .filter(|def| def.kind() == "function_definition"),
        "function_definition" => Some(node),
        _ => None,
    }
}

/// Attribute names assigned through `receiver`, including tuple targets
fn receiver_attributes(target: Node, source: &str, receiver: &str) -> Vec<String> {
    match target.kind() {
        "attribute" => {
            let object = target.child_by_field_name("object");
            let attribute = target.child_by_field_name("attribute");
            match (object, attribute) {
                (Some(object), Some(attribute))
                    if object.kind() == "identifier" && node_text(object, source) == receiver =>
                {
                    vec![node_text(attribute, source).to_string()]
                }
                _ => Vec::new(),
            }
        }
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut cursor = target.walk();
            target
                .named_children(&mut cursor)
                .flat_map(|child| receiver_attributes(child, source, receiver))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Fields are unique by name; the first declaration wins
fn push_field(fields: &mut Vec<ModelField>, field: ModelField) {
    if !fields.iter().any(|existing| existing.name == field.name) {
        fields.push(field);
    }
}

fn first_error_position(node: Node) -> (usize, usize) {
    if node.is_error() || node.is_missing() {
        let position = node.start_position();
        return (position.row + 1, position.column + 1);
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    for child in children {
        if child.has_error() || child.is_missing() {
            return first_error_position(child);
        }
    }

    let position = node.start_position();
    (position.row + 1, position.column + 1)
}

fn docstring_first_line(literal: &str) -> Option<String> {
    let unprefixed = literal.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    let body = ["\"\"\"", "'''", "\"", "'"].iter().find_map(|quote| {
        unprefixed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })?;

    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Extract text content of a node
fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or("")
}
