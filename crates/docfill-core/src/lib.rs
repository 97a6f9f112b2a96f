//! # docfill-core
//!
//! The document generation pipeline: resolve the deployment's template,
//! fill it with request data and, when asked for PDF, hand the result to the
//! configured conversion backend.
//!
//! ## Example
//!
//! ```no_run
//! use docfill_core::{Orchestrator, Settings, TargetFormat};
//!
//! let mut settings = Settings::load("docfill.toml".as_ref())?;
//! settings.apply_env()?;
//! let orchestrator = Orchestrator::from_settings(&settings);
//!
//! let context = serde_json::from_str(r#"{"nombre": "Ana", "fecha": "2024-01-01"}"#)?;
//! let document = orchestrator.generate(&context, TargetFormat::Pdf)?;
//! std::fs::write(&document.filename, &document.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;

pub use config::{BackendKind, ConfigError, Settings};
pub use docfill_convert::{ConversionBackend, TargetFormat};
pub use docfill_ooxml::{MissingPolicy, RenderContext, RenderOptions};
pub use error::{DocfillError, ErrorKind, Result};
pub use orchestrator::{GeneratedDocument, HealthReport, Orchestrator, DEFAULT_FILENAME};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
