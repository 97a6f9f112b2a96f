//! Configuration settings
//!
//! Defines the configuration structures of a docfill deployment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use docfill_convert::{
    BrowserBackend, ConversionBackend, OfficeBackend, Program, ScratchManager,
    DEFAULT_BROWSER_PROGRAM, DEFAULT_OFFICE_PROGRAM,
};
use docfill_ooxml::{RenderOptions, TemplateStore, DEFAULT_TEMPLATE_NAME};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orchestrator::DEFAULT_FILENAME;

/// Environment variable overriding `template.dir`
pub const ENV_TEMPLATE_DIR: &str = "DOCFILL_TEMPLATE_DIR";

/// Environment variable overriding `conversion.backend`
pub const ENV_BACKEND: &str = "DOCFILL_BACKEND";

/// Errors reading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which conversion backend produces PDF output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// LibreOffice subprocess
    #[default]
    Office,
    /// Headless Chromium printing simplified HTML
    Browser,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "office" | "libreoffice" | "soffice" => Ok(BackendKind::Office),
            "browser" | "chromium" | "chrome" => Ok(BackendKind::Browser),
            other => Err(other.to_string()),
        }
    }
}

/// Top-level settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Template location
    pub template: TemplateSettings,
    /// Placeholder rendering
    pub render: RenderOptions,
    /// PDF conversion
    pub conversion: ConversionSettings,
    /// Generated file naming
    pub output: OutputSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_toml_str(&contents)?)
    }

    /// Apply overrides from a variable lookup
    ///
    /// `lookup` is normally `std::env::var`; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_TEMPLATE_DIR).filter(|d| !d.is_empty()) {
            self.template.dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(ENV_BACKEND).filter(|v| !v.is_empty()) {
            self.conversion.backend = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BACKEND,
                value,
            })?;
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }
}

/// Template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory holding the template
    pub dir: PathBuf,
    /// File name stem; case variants with `.docx`/`.DOCX` are tried
    pub name: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("templates"),
            name: DEFAULT_TEMPLATE_NAME.to_string(),
        }
    }
}

impl TemplateSettings {
    pub fn store(&self) -> TemplateStore {
        TemplateStore::new(&self.dir, &self.name)
    }
}

/// Conversion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    pub backend: BackendKind,
    /// Upper bound for one external conversion
    pub timeout_secs: u64,
    /// Scratch directory, the system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    pub office: ProgramSettings,
    pub browser: BrowserSettings,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            timeout_secs: 60,
            scratch_dir: None,
            office: ProgramSettings {
                program: DEFAULT_OFFICE_PROGRAM.to_string(),
                args: Vec::new(),
            },
            browser: BrowserSettings::default(),
        }
    }
}

impl ConversionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scratch(&self) -> ScratchManager {
        match &self.scratch_dir {
            Some(dir) => ScratchManager::new(dir),
            None => ScratchManager::system(),
        }
    }

    /// Build the configured backend
    pub fn backend(&self) -> Box<dyn ConversionBackend> {
        match self.backend {
            BackendKind::Office => Box::new(OfficeBackend::new(
                self.office.program(),
                self.scratch(),
                self.timeout(),
            )),
            BackendKind::Browser => Box::new(
                BrowserBackend::new(self.browser.program(), self.scratch(), self.timeout())
                    .with_no_sandbox(self.browser.no_sandbox),
            ),
        }
    }
}

/// External program with leading arguments
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProgramSettings {
    pub program: String,
    pub args: Vec<String>,
}

impl ProgramSettings {
    pub fn program(&self) -> Program {
        Program::new(&self.program).with_args(self.args.iter().cloned())
    }
}

/// Browser backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub program: String,
    pub args: Vec<String>,
    /// Pass `--no-sandbox`; containers running as root need it
    pub no_sandbox: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_BROWSER_PROGRAM.to_string(),
            args: Vec::new(),
            no_sandbox: true,
        }
    }
}

impl BrowserSettings {
    pub fn program(&self) -> Program {
        Program::new(&self.program).with_args(self.args.iter().cloned())
    }
}

/// Output naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// File name stem of generated documents
    pub filename: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}
