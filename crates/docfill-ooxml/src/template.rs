//! Template loading
//!
//! A deployment carries exactly one DOCX template. The [`TemplateStore`]
//! resolves it by probing a short list of case variants of a fixed name in a
//! fixed directory, and [`Template`] holds the loaded, validated container.
//!
//! # Example
//!
//! ```no_run
//! use docfill_ooxml::TemplateStore;
//!
//! let store = TemplateStore::new("templates", "plantilla");
//! let template = store.load()?;
//! println!("loaded {} bytes from {}", template.bytes().len(), template.origin().display());
//! # Ok::<(), docfill_ooxml::OoxmlError>(())
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive::OoxmlArchive;
use crate::error::{OoxmlError, Result};

/// Default template name stem
pub const DEFAULT_TEMPLATE_NAME: &str = "plantilla";

/// A loaded DOCX template
///
/// The bytes never change after loading; rendering works on a copy of the
/// unpacked archive.
#[derive(Debug, Clone)]
pub struct Template {
    origin: PathBuf,
    bytes: Vec<u8>,
    archive: OoxmlArchive,
}

impl Template {
    /// Validate and wrap template bytes
    ///
    /// Fails when the bytes are not a ZIP container or have no
    /// `word/document.xml`.
    pub fn from_bytes(bytes: Vec<u8>, origin: impl Into<PathBuf>) -> Result<Self> {
        let archive = OoxmlArchive::from_bytes(&bytes)?;
        archive.document_xml()?;
        Ok(Self {
            origin: origin.into(),
            bytes,
            archive,
        })
    }

    /// Where the template was loaded from
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// The raw template bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The unpacked container
    pub fn archive(&self) -> &OoxmlArchive {
        &self.archive
    }
}

/// Resolves the single template resource of a deployment
#[derive(Debug, Clone)]
pub struct TemplateStore {
    base_dir: PathBuf,
    candidates: Vec<String>,
}

impl TemplateStore {
    /// Create a store probing case variants of `name` inside `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>, name: &str) -> Self {
        Self::with_candidates(base_dir, candidate_names(name))
    }

    /// Create a store with an explicit, ordered candidate list
    pub fn with_candidates(base_dir: impl Into<PathBuf>, candidates: Vec<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            candidates,
        }
    }

    /// Directory that is searched
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File names tried, in order
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Path of the first existing candidate
    pub fn resolve(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .map(|name| self.base_dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load the template
    ///
    /// Returns [`OoxmlError::TemplateNotFound`] when no candidate exists.
    /// A candidate that exists but cannot be read or is not a DOCX container
    /// is reported as such, not as missing.
    pub fn load(&self) -> Result<Template> {
        let path = self.resolve().ok_or_else(|| OoxmlError::TemplateNotFound {
            base_dir: self.base_dir.clone(),
            candidates: self.candidates.clone(),
        })?;

        let bytes = std::fs::read(&path)?;
        debug!(path = %path.display(), size = bytes.len(), "template loaded");
        Template::from_bytes(bytes, path)
    }
}

/// Case variants of a template name stem
///
/// `plantilla` yields `plantilla.docx`, `Plantilla.docx`, `PLANTILLA.docx`,
/// `plantilla.DOCX`, `PLANTILLA.DOCX`. A stem given with other casing is
/// tried first as written.
pub fn candidate_names(name: &str) -> Vec<String> {
    let stem = name
        .strip_suffix(".docx")
        .or_else(|| name.strip_suffix(".DOCX"))
        .unwrap_or(name);
    let lower = stem.to_lowercase();
    let upper = stem.to_uppercase();
    let capitalized = capitalize(&lower);

    let ordered = [
        format!("{stem}.docx"),
        format!("{lower}.docx"),
        format!("{capitalized}.docx"),
        format!("{upper}.docx"),
        format!("{lower}.DOCX"),
        format!("{upper}.DOCX"),
    ];

    let mut names: Vec<String> = Vec::new();
    for candidate in ordered {
        if !names.contains(&candidate) {
            names.push(candidate);
        }
    }
    names
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
