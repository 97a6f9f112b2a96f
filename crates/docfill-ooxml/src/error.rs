//! Error types for template and rendering operations

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing DOCX containers
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// No template candidate exists at the configured location
    #[error("Template not found in {}: tried {}", .base_dir.display(), .candidates.join(", "))]
    TemplateNotFound {
        /// Directory that was searched
        base_dir: PathBuf,
        /// Every file name that was tried, in search order
        candidates: Vec<String>,
    },

    /// Required file not found in archive
    #[error("Required file not found: {0}")]
    MissingFile(String),

    /// Invalid document structure
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Errors raised while substituting a context into a template
#[derive(Error, Debug)]
pub enum RenderError {
    /// A placeholder has no matching entry in the context
    #[error("Missing data for placeholder '{path}'")]
    MissingDataField {
        /// Dotted path of the placeholder, with loop indices (e.g. `alumnos[1].nota`)
        path: String,
    },

    /// Malformed tag structure in a template part
    #[error("Template syntax error in {part}: {message}")]
    Syntax {
        /// Archive path of the part holding the tag
        part: String,
        /// What went wrong
        message: String,
    },

    /// A context value cannot be printed where it is used
    #[error("Placeholder '{path}' resolved to {found}, expected a scalar")]
    InvalidValue {
        /// Placeholder path
        path: String,
        /// JSON kind that was found
        found: &'static str,
    },

    /// The template container itself could not be processed
    #[error(transparent)]
    Container(#[from] OoxmlError),
}

impl RenderError {
    pub(crate) fn syntax(part: &str, message: impl Into<String>) -> Self {
        RenderError::Syntax {
            part: part.to_string(),
            message: message.into(),
        }
    }
}
