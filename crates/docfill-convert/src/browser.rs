//! Headless Chromium conversion backend
//!
//! Simplifies the DOCX into a printable HTML page and prints it with one
//! headless browser process per conversion. Layout fidelity is limited to
//! what [`docfill_ooxml::html`] keeps.

use std::ffi::OsString;
use std::time::Duration;

use docfill_ooxml::{docx_to_html, HtmlOptions};
use tracing::debug;

use crate::backend::{ConversionBackend, TargetFormat};
use crate::error::{ConversionError, Result};
use crate::process::{self, file_url, Program};
use crate::scratch::{ScratchManager, ScratchResource};

/// Default program name
pub const DEFAULT_BROWSER_PROGRAM: &str = "chromium";

/// Converts DOCX to PDF by printing simplified HTML in a headless browser
#[derive(Debug, Clone)]
pub struct BrowserBackend {
    program: Program,
    scratch: ScratchManager,
    timeout: Duration,
    no_sandbox: bool,
    html: HtmlOptions,
}

impl BrowserBackend {
    pub fn new(program: Program, scratch: ScratchManager, timeout: Duration) -> Self {
        Self {
            program,
            scratch,
            timeout,
            no_sandbox: false,
            html: HtmlOptions::default(),
        }
    }

    /// Pass `--no-sandbox`, needed when running as root in containers
    pub fn with_no_sandbox(mut self, no_sandbox: bool) -> Self {
        self.no_sandbox = no_sandbox;
        self
    }

    pub fn with_html_options(mut self, html: HtmlOptions) -> Self {
        self.html = html;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    fn arguments(&self, scratch: &ScratchResource) -> Result<Vec<OsString>> {
        let mut user_data = OsString::from("--user-data-dir=");
        user_data.push(scratch.profile_dir());
        let mut print_to = OsString::from("--print-to-pdf=");
        print_to.push(scratch.output());

        let mut args: Vec<OsString> = vec![
            "--headless".into(),
            "--disable-gpu".into(),
            "--no-pdf-header-footer".into(),
            user_data,
            print_to,
        ];
        if self.no_sandbox {
            args.push("--no-sandbox".into());
        }
        args.push(file_url(scratch.input())?.into());
        Ok(args)
    }

    fn convert_in(&self, scratch: &ScratchResource, html: &str) -> Result<Vec<u8>> {
        scratch.write_input(html.as_bytes())?;
        process::run(&self.program, &self.arguments(scratch)?, self.timeout)?;

        if !scratch.output().is_file() {
            return Err(ConversionError::MissingOutput(scratch.output().to_path_buf()));
        }
        Ok(scratch.read_output()?)
    }
}

impl ConversionBackend for BrowserBackend {
    fn name(&self) -> &'static str {
        "browser"
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

        let html = docx_to_html(docx, &self.html)?;
        let mut scratch = self.scratch.acquire("docfill", "html", "pdf")?;
        debug!(backend = self.name(), stem = scratch.stem(), html_bytes = html.len(), "converting");
        let result = self.convert_in(&scratch, &html);
        scratch.release();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> BrowserBackend {
        BrowserBackend::new(
            Program::new(DEFAULT_BROWSER_PROGRAM),
            ScratchManager::new(dir.path()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_arguments() {
        let dir = TempDir::new().unwrap();
        let scratch = ScratchManager::new(dir.path())
            .acquire("docfill", "html", "pdf")
            .unwrap();

        let args = backend(&dir).with_no_sandbox(true).arguments(&scratch).unwrap();
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(&args[..3], ["--headless", "--disable-gpu", "--no-pdf-header-footer"]);
        assert!(args[3].starts_with("--user-data-dir=") && args[3].ends_with("/profile"));
        assert!(args[4].starts_with("--print-to-pdf=") && args[4].ends_with(".pdf"));
        assert_eq!(args[5], "--no-sandbox");
        assert!(args[6].starts_with("file:///") && args[6].ends_with(".html"));
    }

    #[test]
    fn test_sandbox_flag_is_optional() {
        let dir = TempDir::new().unwrap();
        let scratch = ScratchManager::new(dir.path())
            .acquire("docfill", "html", "pdf")
            .unwrap();
        let args = backend(&dir).arguments(&scratch).unwrap();
        assert!(!args.iter().any(|a| a == "--no-sandbox"));
    }

    #[test]
    fn test_invalid_docx_is_rejected_before_launch() {
        let dir = TempDir::new().unwrap();
        let err = backend(&dir).convert(b"not a zip", TargetFormat::Pdf).unwrap_err();
        assert!(matches!(err, ConversionError::Document(_)));
    }
}
