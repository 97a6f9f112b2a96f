//! # docfill-cli
//!
//! Command-line interface for docfill.
//!
//! ## Usage
//!
//! ```bash
//! # Fill the configured template and write certificado_generado.docx
//! docfill generate --data datos.json
//!
//! # Produce a PDF through the configured converter
//! docfill generate --data datos.json --format pdf --output certificado.pdf
//!
//! # Read the payload from stdin
//! cat datos.json | docfill generate --data - --format pdf
//!
//! # Show the resolved template and converter status
//! docfill check --config docfill.toml
//! ```

pub mod app;

pub use app::{check_command, generate_command, load_settings, parse_context, run_cli, Format};
