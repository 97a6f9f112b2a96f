//! Pipeline error taxonomy
//!
//! Every failure of [`crate::Orchestrator::generate`] is one of a small set
//! of kinds. The boundary layer uses [`DocfillError::is_caller_error`] to
//! decide whether the request data or the deployment is at fault.

use std::fmt;
use std::path::PathBuf;

use docfill_convert::ConversionError;
use docfill_ooxml::{OoxmlError, RenderError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced by the generation pipeline
#[derive(Error, Debug)]
pub enum DocfillError {
    /// No template candidate exists
    #[error("Template not found in {}: tried {}", .base_dir.display(), .candidates.join(", "))]
    TemplateNotFound {
        base_dir: PathBuf,
        candidates: Vec<String>,
    },

    /// The template exists but cannot be used
    #[error("Invalid template: {0}")]
    Template(#[source] OoxmlError),

    /// The data has no value for a placeholder
    #[error("Missing data for placeholder '{path}'")]
    MissingDataField { path: String },

    /// Rendering failed for another reason (template syntax, unprintable value)
    #[error("Render failed: {0}")]
    Render(#[source] RenderError),

    /// The conversion backend failed
    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification of [`DocfillError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TemplateNotFound,
    Template,
    MissingDataField,
    Render,
    Conversion,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TemplateNotFound => "template_not_found",
            ErrorKind::Template => "invalid_template",
            ErrorKind::MissingDataField => "missing_data_field",
            ErrorKind::Render => "render",
            ErrorKind::Conversion => "conversion",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

impl DocfillError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocfillError::TemplateNotFound { .. } => ErrorKind::TemplateNotFound,
            DocfillError::Template(_) => ErrorKind::Template,
            DocfillError::MissingDataField { .. } => ErrorKind::MissingDataField,
            DocfillError::Render(_) => ErrorKind::Render,
            DocfillError::Conversion(_) => ErrorKind::Conversion,
            DocfillError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the request data caused the failure
    ///
    /// Missing fields and values that cannot be printed are the caller's;
    /// template syntax errors are the deployment's.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DocfillError::MissingDataField { .. }
                | DocfillError::Render(RenderError::InvalidValue { .. })
        )
    }
}

impl From<OoxmlError> for DocfillError {
    fn from(err: OoxmlError) -> Self {
        match err {
            OoxmlError::TemplateNotFound {
                base_dir,
                candidates,
            } => DocfillError::TemplateNotFound {
                base_dir,
                candidates,
            },
            other => DocfillError::Template(other),
        }
    }
}

impl From<RenderError> for DocfillError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::MissingDataField { path } => DocfillError::MissingDataField { path },
            RenderError::Container(inner) => DocfillError::from(inner),
            other => DocfillError::Render(other),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, DocfillError>;
