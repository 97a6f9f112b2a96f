//! Conversion error types

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::backend::TargetFormat;

/// Errors that can occur while converting a document
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The external program could not be found or started
    #[error("Conversion program '{program}' is unavailable: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program exited unsuccessfully
    #[error("Conversion program '{program}' failed (exit {exit_code:?}): {stderr}")]
    ProcessFailed {
        program: String,
        /// Exit code, `None` when killed by a signal
        exit_code: Option<i32>,
        /// Tail of the captured standard error
        stderr: String,
    },

    /// The external program did not finish in time and was killed
    #[error("Conversion program '{program}' timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    /// The program succeeded but left no output file
    #[error("Conversion produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    /// The backend cannot produce the requested format
    #[error("Backend '{backend}' cannot produce {target}")]
    Unsupported {
        backend: &'static str,
        target: TargetFormat,
    },

    /// The document could not be prepared for conversion
    #[error("Document preparation failed: {0}")]
    Document(#[from] docfill_ooxml::OoxmlError),

    /// Scratch file handling failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConversionError>;
