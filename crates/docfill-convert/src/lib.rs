//! # docfill-convert
//!
//! Conversion of filled DOCX documents into PDF through external renderers.
//!
//! Two backends implement [`ConversionBackend`]:
//!
//! - [`OfficeBackend`] drives a LibreOffice subprocess (`soffice --convert-to pdf`)
//! - [`BrowserBackend`] prints a simplified HTML rendering in headless Chromium
//!
//! Both work in per-conversion scratch files from a [`ScratchManager`] and
//! remove them on every exit path.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use docfill_convert::{ConversionBackend, OfficeBackend, Program, ScratchManager, TargetFormat};
//!
//! let backend = OfficeBackend::new(
//!     Program::new("soffice"),
//!     ScratchManager::system(),
//!     Duration::from_secs(60),
//! );
//! let docx = std::fs::read("certificado.docx")?;
//! let pdf = backend.convert(&docx, TargetFormat::Pdf)?;
//! std::fs::write("certificado.pdf", pdf)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
pub mod browser;
pub mod error;
pub mod office;
pub mod process;
pub mod scratch;

pub use backend::{ConversionBackend, TargetFormat};
pub use browser::{BrowserBackend, DEFAULT_BROWSER_PROGRAM};
pub use error::{ConversionError, Result};
pub use office::{OfficeBackend, DEFAULT_OFFICE_PROGRAM};
pub use process::Program;
pub use scratch::{CleanupWarning, ScratchManager, ScratchResource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
