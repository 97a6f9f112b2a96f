//! Placeholder rendering
//!
//! Substitutes a [`RenderContext`] into the text-bearing parts of a DOCX
//! template and repackages the container.
//!
//! # Tag syntax
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `{name}` | value of `name`, looked up from the innermost section outwards |
//! | `{a.b}` | nested lookup through mappings |
//! | `{.}` | current element of a section over scalars |
//! | `{#name}...{/name}` | repeat per sequence element, or render once for a truthy value |
//! | `{^name}...{/name}` | render when `name` is missing, false, null or empty |
//!
//! When a section's opening and closing tags each sit alone in their own
//! paragraph, the section repeats the paragraphs between them and the two tag
//! paragraphs disappear from the output. When the tags sit in different cells
//! of one table row, the section repeats the whole row instead.
//!
//! # Example
//!
//! ```
//! use docfill_ooxml::render::{RenderContext, Renderer};
//! use docfill_ooxml::test_utils::{docx_with_body, extract_document_xml};
//! use docfill_ooxml::Template;
//!
//! let bytes = docx_with_body("<w:p><w:r><w:t>{nombre}</w:t></w:r></w:p>");
//! let template = Template::from_bytes(bytes, "plantilla.docx")?;
//!
//! let context: RenderContext = serde_json::from_str(r#"{"nombre": "Ana"}"#).unwrap();
//! let rendered = Renderer::default().render(&template, &context)?;
//! assert!(extract_document_xml(&rendered.bytes).contains(">Ana<"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod lexer;
mod tree;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{OoxmlError, RenderError};
use crate::template::Template;
use tree::Node;

/// Content type of a WordprocessingML document
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Markup inserted for a line break inside a value
const LINE_BREAK: &str = "</w:t><w:br/><w:t xml:space=\"preserve\">";

/// Data bound to placeholders
pub type RenderContext = Map<String, Value>;

/// What to do with a placeholder that has no data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Stop with [`RenderError::MissingDataField`]
    #[default]
    Fail,
    /// Substitute an empty string and skip sections
    Blank,
}

/// Rendering options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Handling of placeholders without data
    pub missing: MissingPolicy,
}

/// A filled document container
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// DOCX bytes
    pub bytes: Vec<u8>,
    /// Always [`DOCX_CONTENT_TYPE`]
    pub content_type: &'static str,
}

/// Fills templates with context data
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    /// Create a renderer with the given options
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// The options in use
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render a template into a new DOCX container
    ///
    /// Nothing is produced on failure.
    pub fn render(
        &self,
        template: &Template,
        context: &RenderContext,
    ) -> Result<RenderedDocument, RenderError> {
        let mut archive = template.archive().clone();

        for part in archive.text_parts() {
            let xml = archive
                .get_string(&part)?
                .ok_or_else(|| OoxmlError::MissingFile(part.clone()))?;
            let rendered = self.render_part(&part, &xml, context)?;
            archive.set_string(part, rendered);
        }

        let bytes = archive.to_bytes()?;
        debug!(template = %template.origin().display(), size = bytes.len(), "template rendered");

        Ok(RenderedDocument {
            bytes,
            content_type: DOCX_CONTENT_TYPE,
        })
    }

    /// Render a single XML part
    ///
    /// `part` is only used in error messages.
    pub fn render_part(
        &self,
        part: &str,
        xml: &str,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        if !xml.contains('{') {
            return Ok(xml.to_string());
        }

        let nodes = tree::build(part, lexer::lex(part, xml)?)?;
        let mut out = String::with_capacity(xml.len());
        Evaluator::new(context, self.options.missing).render(&nodes, &mut out)?;
        Ok(out)
    }

    /// Placeholder names used by a template, in order of first appearance
    ///
    /// Section names are listed with their leading `#` or `^`.
    pub fn placeholders(&self, template: &Template) -> Result<Vec<String>, RenderError> {
        let archive = template.archive();
        let mut names = Vec::new();

        for part in archive.text_parts() {
            let xml = archive
                .get_string(&part)?
                .ok_or_else(|| OoxmlError::MissingFile(part.clone()))?;
            if !xml.contains('{') {
                continue;
            }
            let nodes = tree::build(&part, lexer::lex(&part, &xml)?)?;
            collect_names(&nodes, &mut names);
        }

        Ok(names)
    }
}

fn collect_names(nodes: &[Node], names: &mut Vec<String>) {
    for node in nodes {
        let name = match node {
            Node::Markup(_) => continue,
            Node::Value { name } => name.clone(),
            Node::Section {
                name,
                inverted,
                body,
            } => {
                let marker = if *inverted { '^' } else { '#' };
                let entry = format!("{marker}{name}");
                if !names.contains(&entry) {
                    names.push(entry);
                }
                collect_names(body, names);
                continue;
            }
        };
        if !names.contains(&name) {
            names.push(name);
        }
    }
}

/// One level of section nesting
struct Frame<'v> {
    value: &'v Value,
    /// Display path, e.g. `alumnos[1]`
    path: String,
}

/// Resolves names against the context and section frames
struct Evaluator<'v> {
    root: &'v RenderContext,
    frames: Vec<Frame<'v>>,
    missing: MissingPolicy,
}

impl<'v> Evaluator<'v> {
    fn new(root: &'v RenderContext, missing: MissingPolicy) -> Self {
        Self {
            root,
            frames: Vec::new(),
            missing,
        }
    }

    fn lookup(&self, name: &str) -> Option<&'v Value> {
        if name == "." {
            return self.frames.last().map(|frame| frame.value);
        }

        let mut segments = name.split('.');
        let first = segments.next()?;

        let head = self
            .frames
            .iter()
            .rev()
            .find_map(|frame| frame.value.as_object().and_then(|map| map.get(first)))
            .or_else(|| self.root.get(first))?;

        segments.try_fold(head, |value, segment| value.as_object()?.get(segment))
    }

    fn display_path(&self, name: &str) -> String {
        match self.frames.last() {
            Some(frame) if name == "." => frame.path.clone(),
            Some(frame) => format!("{}.{}", frame.path, name),
            None => name.to_string(),
        }
    }

    fn missing(&self, name: &str) -> Result<(), RenderError> {
        match self.missing {
            MissingPolicy::Fail => Err(RenderError::MissingDataField {
                path: self.display_path(name),
            }),
            MissingPolicy::Blank => Ok(()),
        }
    }

    fn render(&mut self, nodes: &[Node], out: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Markup(markup) => out.push_str(markup),
                Node::Value { name } => match self.lookup(name) {
                    Some(value) => {
                        let text = scalar_text(value).ok_or_else(|| RenderError::InvalidValue {
                            path: self.display_path(name),
                            found: kind_of(value),
                        })?;
                        push_value(out, &text);
                    }
                    None => self.missing(name)?,
                },
                Node::Section {
                    name,
                    inverted,
                    body,
                } => self.render_section(name, *inverted, body, out)?,
            }
        }
        Ok(())
    }

    fn render_section(
        &mut self,
        name: &str,
        inverted: bool,
        body: &[Node],
        out: &mut String,
    ) -> Result<(), RenderError> {
        let Some(value) = self.lookup(name) else {
            return if inverted {
                self.render(body, out)
            } else {
                self.missing(name)
            };
        };

        match value {
            Value::Array(items) if !inverted => {
                let base = self.display_path(name);
                for (index, item) in items.iter().enumerate() {
                    self.frames.push(Frame {
                        value: item,
                        path: format!("{base}[{index}]"),
                    });
                    let result = self.render(body, out);
                    self.frames.pop();
                    result?;
                }
                Ok(())
            }
            _ if inverted => {
                if is_truthy(value) {
                    Ok(())
                } else {
                    self.render(body, out)
                }
            }
            _ if is_truthy(value) => {
                self.frames.push(Frame {
                    value,
                    path: self.display_path(name),
                });
                let result = self.render(body, out);
                self.frames.pop();
                result
            }
            _ => Ok(()),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Escape a value and turn its line breaks into `<w:br/>`
fn push_value(out: &mut String, text: &str) {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    for (index, line) in normalized.split('\n').enumerate() {
        if index > 0 {
            out.push_str(LINE_BREAK);
        }
        out.push_str(&quick_xml::escape::escape(line));
    }
}
