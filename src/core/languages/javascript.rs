use regex::Regex;
use std::ops::Range;

use super::LanguageExtractor;
use crate::core::{Extraction, Function, Model, Param};
use crate::error::{Result, TreedocError};

/// Words that look like `name(...) {` inside a class body but never name a method
const NON_METHOD_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "do", "else",
];

/// Keywords whose parenthesised head ends a statement prefix, so `if (x) /re/` is a regex
const CONTROL_HEAD_KEYWORDS: &[&str] = &["if", "while", "for", "with"];

/// Keywords after which a `/` starts a regular expression literal
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "void", "yield", "await", "in", "of", "delete", "throw",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlavor {
    /// `.js`, `.ts` and friends: the whole file is code
    Script,
    /// `.svelte`: only `<script>` blocks are code
    Component,
}

/// Pattern-based extractor for the JavaScript family.
///
/// Comments and literal contents are blanked out first (keeping byte offsets),
/// so the declaration patterns never fire inside strings and the bracket
/// balance of the file can be checked cheaply.
pub struct JavaScriptExtractor {
    flavor: ScriptFlavor,
    script_block_regex: Regex,
    class_regex: Regex,
    function_regex: Regex,
    arrow_regex: Regex,
    /// Optional return annotation and `=>` after an arrow's parameter list
    arrow_tail_regex: Regex,
    method_regex: Regex,
}

/// A recovered entity and where its opening token starts
struct Located<T> {
    offset: usize,
    item: T,
}

impl JavaScriptExtractor {
    pub fn new(flavor: ScriptFlavor) -> Result<Self> {
        Ok(Self {
            flavor,
            script_block_regex: Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>")?,
            class_regex: Regex::new(
                r"\b(?:export\s+(?:default\s+)?)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)(?:\s*<[^>{]*>)?(?:\s+extends\s+([A-Za-z_$][\w$.]*))?[^{;]*\{",
            )?,
            function_regex: Regex::new(
                r"\b(?:export\s+(?:default\s+)?)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\(",
            )?,
            arrow_regex: Regex::new(
                r"\b(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=;]+)?=\s*(?:async\s+)?(?:<[^>(]*>\s*)?(?:(\()|([A-Za-z_$][\w$]*)\s*=>)",
            )?,
            arrow_tail_regex: Regex::new(r"^\s*(?::\s*[^=;{]+?)?\s*=>")?,
            method_regex: Regex::new(
                r"(?:(?:public|private|protected|static|readonly|override|abstract|async|get|set)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\([^)]*\)\s*(?::\s*[^{;=]+)?\{",
            )?,
        })
    }

    /// Ranges of `source` holding code for this flavor
    fn code_regions(&self, source: &str) -> Vec<Range<usize>> {
        match self.flavor {
            ScriptFlavor::Script => vec![0..source.len()],
            ScriptFlavor::Component => self
                .script_block_regex
                .captures_iter(source)
                .filter_map(|caps| caps.get(1))
                .map(|body| body.range())
                .collect(),
        }
    }

    fn extract_region(
        &self,
        code: &str,
        file: &str,
        models: &mut Vec<Located<Model>>,
        functions: &mut Vec<Located<Function>>,
    ) -> Result<()> {
        let masked = mask_source(code)?;

        for caps in self.class_regex.captures_iter(&masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let open_brace = whole.end() - 1;
            let body = match matching_bracket(&masked, open_brace) {
                Some(close) => open_brace + 1..close,
                None => continue,
            };

            models.push(Located {
                offset: whole.start(),
                item: Model {
                    name: name.as_str().to_string(),
                    file: file.to_string(),
                    fields: Vec::new(),
                    methods: self.extract_methods(&masked[body.clone()]),
                    base_classes: caps
                        .get(2)
                        .map(|base| vec![base.as_str().to_string()])
                        .unwrap_or_default(),
                },
            });
        }

        for caps in self.function_regex.captures_iter(&masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let open = whole.end() - 1;
            let params = matching_bracket(&masked, open)
                .map(|close| split_params(code, &masked, open + 1..close))
                .unwrap_or_default();

            functions.push(Located {
                offset: whole.start(),
                item: self.build_function(code, file, name.as_str(), params, whole.start()),
            });
        }

        for caps in self.arrow_regex.captures_iter(&masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let params = match (caps.get(2), caps.get(3)) {
                (Some(open), _) => {
                    let Some(close) = matching_bracket(&masked, open.start()) else {
                        continue;
                    };
                    if !self.arrow_tail_regex.is_match(&masked[close + 1..]) {
                        continue;
                    }
                    split_params(code, &masked, open.start() + 1..close)
                }
                (None, Some(single)) => vec![Param::untyped(single.as_str())],
                (None, None) => continue,
            };

            functions.push(Located {
                offset: whole.start(),
                item: self.build_function(code, file, name.as_str(), params, whole.start()),
            });
        }

        Ok(())
    }

    fn build_function(
        &self,
        code: &str,
        file: &str,
        name: &str,
        params: Vec<Param>,
        offset: usize,
    ) -> Function {
        Function {
            name: name.to_string(),
            file: file.to_string(),
            params,
            returns: None,
            docstring: extract_docs_before(code, offset),
        }
    }

    /// Method names declared at the top nesting level of a masked class body
    fn extract_methods(&self, body: &str) -> Vec<String> {
        let bytes = body.as_bytes();
        let mut methods = Vec::new();
        let mut depth = 0usize;
        let mut scanned = 0usize;

        for caps in self.method_regex.captures_iter(body) {
            let Some(name) = caps.get(1) else {
                continue;
            };

            for &byte in &bytes[scanned..name.start()] {
                match byte {
                    b'{' | b'(' | b'[' => depth += 1,
                    b'}' | b')' | b']' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            scanned = name.start();

            if depth == 0 && !NON_METHOD_KEYWORDS.contains(&name.as_str()) {
                methods.push(name.as_str().to_string());
            }
        }

        methods
    }
}

impl LanguageExtractor for JavaScriptExtractor {
    fn extract(&mut self, content: &str, file: &str) -> Result<Extraction> {
        let mut models = Vec::new();
        let mut functions = Vec::new();

        for region in self.code_regions(content) {
            let mut region_models = Vec::new();
            let mut region_functions = Vec::new();
            self.extract_region(
                &content[region.clone()],
                file,
                &mut region_models,
                &mut region_functions,
            )?;

            models.extend(region_models.into_iter().map(|located| Located {
                offset: located.offset + region.start,
                item: located.item,
            }));
            functions.extend(region_functions.into_iter().map(|located| Located {
                offset: located.offset + region.start,
                item: located.item,
            }));
        }

        models.sort_by_key(|located| located.offset);
        functions.sort_by_key(|located| located.offset);

        Ok(Extraction {
            models: models.into_iter().map(|located| located.item).collect(),
            functions: functions.into_iter().map(|located| located.item).collect(),
        })
    }

    fn language_name(&self) -> &str {
        match self.flavor {
            ScriptFlavor::Script => "javascript",
            ScriptFlavor::Component => "svelte",
        }
    }
}

/// Blank out comments, the contents of string, template and regex literals,
/// and the text and tag names of JSX elements.
///
/// Every masked byte becomes a space (newlines are kept), so offsets into the
/// result are offsets into `source`. Fails when brackets do not balance or a
/// block comment or template literal never closes.
fn mask_source(source: &str) -> Result<String> {
    let mut masker = Masker::new(source);
    masker.code(false)?;
    String::from_utf8(masker.out).map_err(|e| TreedocError::Parser(e.to_string()))
}

/// Cursor over the source plus the masked output emitted so far
struct Masker<'a> {
    source: &'a str,
    bytes: &'a [u8],
    out: Vec<u8>,
    pos: usize,
    /// Output index of the last `)` closing an `if`/`while`/`for`/`with` head
    control_close: Option<usize>,
}

impl<'a> Masker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            out: Vec::with_capacity(source.len()),
            pos: 0,
            control_close: None,
        }
    }

    /// Mask code to the end of input or, inside a JSX expression container,
    /// up to the `}` closing it (left for the caller).
    fn code(&mut self, in_container: bool) -> Result<()> {
        let mut stack: Vec<(u8, usize, bool)> = Vec::new();

        while self.pos < self.bytes.len() {
            let i = self.pos;
            let byte = self.bytes[i];
            let next = self.peek(1);

            match byte {
                b'/' if next == Some(b'/') => {
                    let end = self.bytes[i..]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(self.bytes.len(), |p| i + p);
                    self.blank_to(end);
                }
                b'/' if next == Some(b'*') => {
                    let end = find(self.bytes, b"*/", i + 2)
                        .ok_or_else(|| self.error("unterminated block comment", i))?;
                    self.blank_to(end + 2);
                }
                b'\'' | b'"' => self.quoted(),
                b'`' => self.template()?,
                b'/' if self.regex_allowed() => self.regex_literal(),
                b'<' if starts_jsx(next) && self.regex_allowed() => {
                    if !self.jsx_element() {
                        self.emit(byte);
                    }
                }
                b'{' | b'(' | b'[' => {
                    let control_head =
                        byte == b'(' && CONTROL_HEAD_KEYWORDS.contains(&trailing_word(&self.out));
                    stack.push((byte, i, control_head));
                    self.emit(byte);
                }
                b'}' if in_container && stack.is_empty() => return Ok(()),
                b'}' | b')' | b']' => {
                    let expected = match byte {
                        b'}' => b'{',
                        b')' => b'(',
                        _ => b'[',
                    };
                    match stack.pop() {
                        Some((open, _, control_head)) if open == expected => {
                            if control_head {
                                self.control_close = Some(self.out.len());
                            }
                        }
                        _ => {
                            return Err(
                                self.error(&format!("unbalanced `{}`", byte as char), i)
                            )
                        }
                    }
                    self.emit(byte);
                }
                _ => self.emit(byte),
            }
        }

        if let Some((open, position, _)) = stack.pop() {
            return Err(self.error(&format!("unclosed `{}` opened", open as char), position));
        }
        if in_container {
            return Err(self.error("unclosed JSX expression", self.pos));
        }
        Ok(())
    }

    fn error(&self, what: &str, offset: usize) -> TreedocError {
        TreedocError::Parser(format!("{} at line {}", what, line_of(self.source, offset)))
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn emit(&mut self, byte: u8) {
        self.out.push(byte);
        self.pos += 1;
    }

    fn blank_to(&mut self, end: usize) {
        blank(&mut self.out, &self.bytes[self.pos..end]);
        self.pos = end;
    }

    /// A quoted string; one still open at end of line ends there
    fn quoted(&mut self) {
        let quote = self.bytes[self.pos];
        self.emit(quote);

        while let Some(byte) = self.peek(0) {
            match byte {
                b'\\' => self.blank_to((self.pos + 2).min(self.bytes.len())),
                b'\n' => return,
                b if b == quote => {
                    self.emit(quote);
                    return;
                }
                _ => self.blank_to(self.pos + 1),
            }
        }
    }

    fn template(&mut self) -> Result<()> {
        let start = self.pos;
        self.emit(b'`');

        while let Some(byte) = self.peek(0) {
            match byte {
                b'\\' => self.blank_to((self.pos + 2).min(self.bytes.len())),
                b'`' => {
                    self.emit(b'`');
                    return Ok(());
                }
                _ => self.blank_to(self.pos + 1),
            }
        }

        Err(self.error("unterminated template literal", start))
    }

    fn regex_literal(&mut self) {
        match regex_literal_end(self.bytes, self.pos) {
            Some(end) => {
                self.emit(b'/');
                self.blank_to(end - 1);
                self.emit(b'/');
            }
            None => self.emit(b'/'),
        }
    }

    /// Whether the emitted code ends where an expression may start, so a `/`
    /// opens a regex literal and a `<` may open a JSX element
    fn regex_allowed(&self) -> bool {
        let end = self
            .out
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |p| p + 1);
        let trimmed = &self.out[..end];
        let Some(&last) = trimmed.last() else {
            return true;
        };

        if last == b')' {
            return self.control_close == Some(end - 1);
        }
        if b"(,=:[!&|?{};+-*%<>~^".contains(&last) {
            return true;
        }
        if is_identifier_byte(last) {
            return REGEX_PRECEDING_KEYWORDS.contains(&trailing_word(trimmed));
        }
        false
    }

    /// Mask a JSX element at `<`; on failure nothing is consumed
    fn jsx_element(&mut self) -> bool {
        let (pos, emitted, control_close) = (self.pos, self.out.len(), self.control_close);
        if self.element().is_some() {
            return true;
        }
        self.pos = pos;
        self.out.truncate(emitted);
        self.control_close = control_close;
        false
    }

    fn element(&mut self) -> Option<()> {
        self.emit(b'<');
        let name = self.jsx_name();

        loop {
            self.skip_whitespace();
            match self.peek(0)? {
                b'/' if self.peek(1) == Some(b'>') => {
                    self.emit(b'/');
                    self.emit(b'>');
                    return Some(());
                }
                b'>' => {
                    self.emit(b'>');
                    return self.children(&name);
                }
                b'{' => self.container()?,
                b'"' | b'\'' => self.attribute_value()?,
                b'=' => self.emit(b'='),
                b if is_jsx_name_byte(b) => {
                    self.jsx_name();
                }
                _ => return None,
            }
        }
    }

    /// Text, expression containers and nested elements up to `</name>`
    fn children(&mut self, name: &str) -> Option<()> {
        loop {
            match self.peek(0)? {
                b'{' => self.container()?,
                b'<' if self.peek(1) == Some(b'/') => {
                    self.emit(b'<');
                    self.emit(b'/');
                    self.skip_whitespace();
                    let closing = self.jsx_name();
                    self.skip_whitespace();
                    if closing != name || self.peek(0) != Some(b'>') {
                        return None;
                    }
                    self.emit(b'>');
                    return Some(());
                }
                b'<' if starts_jsx(self.peek(1)) => self.element()?,
                b'<' => return None,
                _ => self.blank_to(self.pos + 1),
            }
        }
    }

    fn container(&mut self) -> Option<()> {
        self.emit(b'{');
        self.code(true).ok()?;
        self.emit(b'}');
        Some(())
    }

    /// Attribute strings have no escapes and may span lines
    fn attribute_value(&mut self) -> Option<()> {
        let quote = self.bytes[self.pos];
        let close = self.pos + 1 + self.bytes[self.pos + 1..].iter().position(|&b| b == quote)?;
        self.emit(quote);
        self.blank_to(close);
        self.emit(quote);
        Some(())
    }

    /// Blank a tag or attribute name and return it
    fn jsx_name(&mut self) -> String {
        let start = self.pos;
        while self.peek(0).is_some_and(is_jsx_name_byte) {
            self.blank_to(self.pos + 1);
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek(0) {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.emit(byte);
        }
    }
}

/// `<` followed by a tag name or `>` (fragment)
fn starts_jsx(next: Option<u8>) -> bool {
    next.is_some_and(|b| b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b == b'>')
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

fn is_jsx_name_byte(byte: u8) -> bool {
    is_identifier_byte(byte) || matches!(byte, b'-' | b'.' | b':')
}

/// The identifier the emitted code ends with, ignoring trailing whitespace
fn trailing_word(emitted: &[u8]) -> &str {
    let end = emitted
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |p| p + 1);
    let emitted = &emitted[..end];
    let start = emitted
        .iter()
        .rposition(|&b| !is_identifier_byte(b))
        .map_or(0, |p| p + 1);
    std::str::from_utf8(&emitted[start..]).unwrap_or("")
}

/// End (exclusive) of a regex literal opening at `start`, if it closes on the same line
fn regex_literal_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut j = start + 1;
    let mut in_class = false;

    while j < bytes.len() {
        match bytes[j] {
            b'\n' => return None,
            b'\\' => j += 1,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => return Some(j + 1),
            _ => {}
        }
        j += 1;
    }

    None
}

fn blank(out: &mut Vec<u8>, masked: &[u8]) {
    out.extend(masked.iter().map(|&b| if b == b'\n' { b'\n' } else { b' ' }));
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|p| from + p)
}

fn line_of(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// Index of the bracket closing the one at `open` in masked text
fn matching_bracket(masked: &str, open: usize) -> Option<usize> {
    let bytes = masked.as_bytes();
    let (open_byte, close_byte) = match bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    for (index, &byte) in bytes.iter().enumerate().skip(open) {
        if byte == open_byte {
            depth += 1;
        } else if byte == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

/// Split a parameter list on top-level commas and reduce each entry to its binding
fn split_params(code: &str, masked: &str, range: Range<usize>) -> Vec<Param> {
    let masked_list = &masked.as_bytes()[range.clone()];
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut piece_start = range.start;

    for (index, &byte) in masked_list.iter().enumerate() {
        match byte {
            b'{' | b'[' | b'(' | b'<' => depth += 1,
            b'}' | b']' | b')' | b'>' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                pieces.push(piece_start..range.start + index);
                piece_start = range.start + index + 1;
            }
            _ => {}
        }
    }
    pieces.push(piece_start..range.end);

    pieces
        .into_iter()
        .filter_map(|piece| param_binding(code, masked, piece))
        .map(Param::untyped)
        .collect()
}

fn param_binding(code: &str, masked: &str, piece: Range<usize>) -> Option<String> {
    let masked_piece = masked.get(piece.clone())?;
    let leading = masked_piece.len() - masked_piece.trim_start().len();
    let start = piece.start + leading;
    let masked_piece = masked_piece.trim();
    if masked_piece.is_empty() {
        return None;
    }

    // Destructuring patterns are kept verbatim up to their closing bracket
    if masked_piece.starts_with('{') || masked_piece.starts_with('[') {
        let mut depth = 0usize;
        for (index, byte) in masked_piece.bytes().enumerate() {
            match byte {
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let pattern = code.get(start..start + index + 1)?;
                        return Some(pattern.split_whitespace().collect::<Vec<_>>().join(" "));
                    }
                }
                _ => {}
            }
        }
        return Some(masked_piece.to_string());
    }

    let binding = masked_piece
        .split([':', '='])
        .next()
        .unwrap_or(masked_piece)
        .trim()
        .trim_end_matches('?');
    let binding = ["public ", "private ", "protected ", "readonly ", "override "]
        .iter()
        .fold(binding, |acc, modifier| acc.strip_prefix(*modifier).unwrap_or(acc).trim_start());

    if binding.is_empty() {
        None
    } else {
        Some(binding.to_string())
    }
}

/// First line of a `/** ... */` block directly above `offset`
fn extract_docs_before(code: &str, offset: usize) -> Option<String> {
    let before = code.get(..offset)?.trim_end();
    if !before.ends_with("*/") {
        return None;
    }
    let open = before.rfind("/**")?;
    let block = before.get(open + 3..before.len() - 2)?;
    if block.contains("*/") {
        return None;
    }

    block
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .find(|line| !line.is_empty() && !line.starts_with('@'))
        .map(str::to_string)
}
