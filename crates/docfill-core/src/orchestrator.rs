//! Generation pipeline
//!
//! One call of [`Orchestrator::generate`] walks a request through
//!
//! ```text
//! RECEIVED -> TEMPLATE_LOADED -> RENDERED -> DONE                 (docx)
//!                                        -> CONVERTING -> DONE    (pdf)
//! ```
//!
//! Any stage may end in FAILED; there are no retries and nothing is returned
//! on failure. Transitions are logged at `debug` under a per-request id.

use std::fmt;
use std::path::PathBuf;

use docfill_convert::{ConversionBackend, TargetFormat};
use docfill_ooxml::{RenderContext, RenderOptions, Renderer, TemplateStore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::Result;

/// Default file name stem of generated documents
pub const DEFAULT_FILENAME: &str = "certificado_generado";

/// A finished document
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// Suggested download name, e.g. `certificado_generado.pdf`
    pub filename: String,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Received,
    TemplateLoaded,
    Rendered,
    Converting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Received => "RECEIVED",
            Stage::TemplateLoaded => "TEMPLATE_LOADED",
            Stage::Rendered => "RENDERED",
            Stage::Converting => "CONVERTING",
            Stage::Done => "DONE",
            Stage::Failed => "FAILED",
        })
    }
}

/// Readiness of a deployment, as reported by [`Orchestrator::check`]
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Directory searched for the template
    pub template_dir: PathBuf,
    /// Resolved template path
    pub template: Option<PathBuf>,
    /// Placeholders found in the template
    pub placeholders: Vec<String>,
    /// Why the template cannot be used, if it cannot
    pub template_error: Option<String>,
    pub backend: &'static str,
    pub backend_available: bool,
}

impl HealthReport {
    /// DOCX generation works
    pub fn template_ready(&self) -> bool {
        self.template.is_some() && self.template_error.is_none()
    }

    /// PDF generation should work too
    pub fn is_ready(&self) -> bool {
        self.template_ready() && self.backend_available
    }
}

/// Sequences template loading, rendering and conversion
///
/// Holds no per-request state; share it behind an `Arc` to serve
/// concurrent requests.
pub struct Orchestrator {
    store: TemplateStore,
    renderer: Renderer,
    backend: Box<dyn ConversionBackend>,
    filename: String,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store)
            .field("renderer", &self.renderer)
            .field("backend", &self.backend.name())
            .field("filename", &self.filename)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        store: TemplateStore,
        options: RenderOptions,
        backend: Box<dyn ConversionBackend>,
    ) -> Self {
        Self {
            store,
            renderer: Renderer::new(options),
            backend,
            filename: DEFAULT_FILENAME.to_string(),
        }
    }

    /// Build the pipeline a configuration describes
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.template.store(),
            settings.render.clone(),
            settings.conversion.backend(),
        )
        .with_filename(&settings.output.filename)
    }

    /// Set the file name stem of generated documents
    pub fn with_filename(mut self, stem: impl Into<String>) -> Self {
        self.filename = stem.into();
        self
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn backend(&self) -> &dyn ConversionBackend {
        self.backend.as_ref()
    }

    /// Fill the template with `context` and produce `target`
    pub fn generate(
        &self,
        context: &RenderContext,
        target: TargetFormat,
    ) -> Result<GeneratedDocument> {
        let request_id = Uuid::new_v4();
        debug!(%request_id, state = %Stage::Received, %target, fields = context.len());

        let result = self.run(request_id, context, target);
        match &result {
            Ok(document) => debug!(
                %request_id,
                state = %Stage::Done,
                bytes = document.bytes.len(),
                filename = %document.filename
            ),
            Err(e) => warn!(
                %request_id,
                state = %Stage::Failed,
                kind = %e.kind(),
                error = %e,
                "document generation failed"
            ),
        }
        result
    }

    fn run(
        &self,
        request_id: Uuid,
        context: &RenderContext,
        target: TargetFormat,
    ) -> Result<GeneratedDocument> {
        let template = self.store.load()?;
        debug!(%request_id, state = %Stage::TemplateLoaded, template = %template.origin().display());

        let rendered = self.renderer.render(&template, context)?;
        debug!(%request_id, state = %Stage::Rendered, bytes = rendered.bytes.len());

        let bytes = match target {
            TargetFormat::Docx => rendered.bytes,
            TargetFormat::Pdf => {
                debug!(%request_id, state = %Stage::Converting, backend = self.backend.name());
                self.backend.convert(&rendered.bytes, target)?
            }
        };

        Ok(GeneratedDocument {
            bytes,
            content_type: target.content_type(),
            filename: format!("{}.{}", self.filename, target.extension()),
        })
    }

    /// Report template resolution and backend availability
    pub fn check(&self) -> HealthReport {
        let mut report = HealthReport {
            template_dir: self.store.base_dir().to_path_buf(),
            template: self.store.resolve(),
            placeholders: Vec::new(),
            template_error: None,
            backend: self.backend.name(),
            backend_available: self.backend.is_available(),
        };

        match self.store.load() {
            Ok(template) => match self.renderer.placeholders(&template) {
                Ok(names) => report.placeholders = names,
                Err(e) => report.template_error = Some(e.to_string()),
            },
            Err(e) => report.template_error = Some(e.to_string()),
        }
        report
    }
}
