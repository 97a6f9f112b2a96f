//! Conversion backend trait and target formats
//!
//! A backend turns filled DOCX bytes into another format by driving an
//! external renderer. Backends are interchangeable behind
//! [`ConversionBackend`]; the caller picks one at startup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Output format requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// The filled DOCX itself
    Docx,
    /// Portable paginated output
    Pdf,
}

impl TargetFormat {
    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Docx => "docx",
            TargetFormat::Pdf => "pdf",
        }
    }

    /// MIME type of the format
    pub fn content_type(self) -> &'static str {
        match self {
            TargetFormat::Docx => docfill_ooxml::DOCX_CONTENT_TYPE,
            TargetFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docx" | "native" => Ok(TargetFormat::Docx),
            "pdf" => Ok(TargetFormat::Pdf),
            other => Err(format!("unknown format '{other}' (expected docx or pdf)")),
        }
    }
}

/// Trait for conversion backends
///
/// # Thread Safety
///
/// Backends must be `Send + Sync`; one instance serves concurrent requests,
/// so every call has to keep its state (files, processes) to itself.
pub trait ConversionBackend: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Whether the external program can be found
    fn is_available(&self) -> bool;

    /// Convert DOCX bytes into `target`
    fn convert(&self, docx: &[u8], target: TargetFormat) -> Result<Vec<u8>>;
}
