//! Configuration
//!
//! Settings are loaded from `docfill.toml`; every section and key is
//! optional:
//!
//! ```toml
//! [template]
//! dir = "templates"
//! name = "plantilla"
//!
//! [render]
//! missing = "fail"        # or "blank"
//!
//! [conversion]
//! backend = "office"      # or "browser"
//! timeout_secs = 60
//! scratch_dir = "/var/tmp/docfill"
//!
//! [conversion.office]
//! program = "soffice"
//! args = []
//!
//! [conversion.browser]
//! program = "chromium"
//! no_sandbox = true
//!
//! [output]
//! filename = "certificado_generado"
//! ```
//!
//! `DOCFILL_TEMPLATE_DIR` and `DOCFILL_BACKEND` override the file.

mod settings;


pub use settings::{
    BackendKind, BrowserSettings, ConfigError, ConversionSettings, OutputSettings,
    ProgramSettings, Settings, TemplateSettings, ENV_BACKEND, ENV_TEMPLATE_DIR,
};
