//! # docfill-ooxml
//!
//! DOCX template handling for docfill.
//!
//! This crate provides functionality to:
//! - Resolve and load the single DOCX template of a deployment
//! - Fill `{placeholder}` tags with JSON data, including repeated sections
//! - Simplify a filled DOCX into printable HTML
//!
//! ## Example: Filling a Template
//!
//! ```no_run
//! use docfill_ooxml::{RenderContext, Renderer, TemplateStore};
//!
//! let template = TemplateStore::new("templates", "plantilla").load()?;
//! let context: RenderContext = serde_json::from_str(r#"{"nombre": "Ana", "fecha": "2024-01-01"}"#)?;
//! let rendered = Renderer::default().render(&template, &context)?;
//! std::fs::write("certificado.docx", &rendered.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod document;
pub mod error;
pub mod html;
pub mod render;
pub mod template;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use archive::OoxmlArchive;
pub use document::{Alignment, Block, Document, Paragraph, ParagraphChild, Run, Table};
pub use error::{OoxmlError, RenderError, Result};
pub use html::{docx_to_html, HtmlOptions};
pub use render::{
    MissingPolicy, RenderContext, RenderOptions, RenderedDocument, Renderer, DOCX_CONTENT_TYPE,
};
pub use template::{candidate_names, Template, TemplateStore, DEFAULT_TEMPLATE_NAME};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
