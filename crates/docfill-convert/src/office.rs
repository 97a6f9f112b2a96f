//! LibreOffice conversion backend
//!
//! Runs `soffice --headless --convert-to pdf` once per conversion. Every run
//! gets its own `-env:UserInstallation` profile directory: LibreOffice locks
//! its profile, so concurrent conversions sharing one would block or fail.

use std::ffi::OsString;
use std::time::Duration;

use tracing::debug;

use crate::backend::{ConversionBackend, TargetFormat};
use crate::error::{ConversionError, Result};
use crate::process::{self, file_url, Program};
use crate::scratch::{ScratchManager, ScratchResource};

/// Default program name
pub const DEFAULT_OFFICE_PROGRAM: &str = "soffice";

/// Converts DOCX to PDF through a LibreOffice subprocess
#[derive(Debug, Clone)]
pub struct OfficeBackend {
    program: Program,
    scratch: ScratchManager,
    timeout: Duration,
}

impl OfficeBackend {
    pub fn new(program: Program, scratch: ScratchManager, timeout: Duration) -> Self {
        Self {
            program,
            scratch,
            timeout,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    fn arguments(scratch: &ScratchResource) -> Result<Vec<OsString>> {
        let profile = file_url(scratch.profile_dir())?;
        Ok(vec![
            "--headless".into(),
            "--norestore".into(),
            "--nologo".into(),
            format!("-env:UserInstallation={profile}").into(),
            "--convert-to".into(),
            "pdf".into(),
            "--outdir".into(),
            scratch.dir().into(),
            scratch.input().into(),
        ])
    }

    fn convert_in(&self, scratch: &ScratchResource, docx: &[u8]) -> Result<Vec<u8>> {
        scratch.write_input(docx)?;
        process::run(&self.program, &Self::arguments(scratch)?, self.timeout)?;

        if !scratch.output().is_file() {
            return Err(ConversionError::MissingOutput(scratch.output().to_path_buf()));
        }
        Ok(scratch.read_output()?)
    }
}

impl ConversionBackend for OfficeBackend {
    fn name(&self) -> &'static str {
        "office"
    }

    fn is_available(&self) -> bool {
        self.program.is_available()
    }

    fn convert(&self, docx: &[u8], target: TargetFormat) -> Result<Vec<u8>> {
        if target != TargetFormat::Pdf {
            return Err(ConversionError::Unsupported {
                backend: self.name(),
                target,
            });
        }

        let mut scratch = self.scratch.acquire("docfill", "docx", "pdf")?;
        debug!(backend = self.name(), stem = scratch.stem(), "converting");
        let result = self.convert_in(&scratch, docx);
        scratch.release();
        result
    }
}
