//! Backend behaviour against shell-script stand-ins for soffice and chromium
//!
//! The scripts mimic the command-line contract of the real programs: they
//! parse the arguments the backends pass, write the output where the real
//! program would and create the profile directory. Each test checks that the
//! scratch directory is empty afterwards, whatever the outcome.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use docfill_convert::{
    BrowserBackend, ConversionBackend, ConversionError, OfficeBackend, Program, ScratchManager,
    TargetFormat,
};
use docfill_ooxml::test_utils::docx_with_body;
use tempfile::TempDir;

const FAKE_SOFFICE: &str = r#"
outdir=""
input=""
profile=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    -env:UserInstallation=*) profile="${1#-env:UserInstallation=file://}"; shift ;;
    --*) shift ;;
    *) input="$1"; shift ;;
  esac
done
mkdir -p "$profile/user"
name=$(basename "$input" .docx)
{ printf '%%PDF-1.4 fake\n'; cat "$input"; } > "$outdir/$name.pdf"
"#;

const FAKE_CHROMIUM: &str = r#"
out=""
input=""
for arg in "$@"; do
  case "$arg" in
    --print-to-pdf=*) out="${arg#--print-to-pdf=}" ;;
    --user-data-dir=*) mkdir -p "${arg#--user-data-dir=}/Default" ;;
    file://*) input="${arg#file://}" ;;
  esac
done
{ printf '%%PDF-1.4 fake\n'; echo "$*"; cat "$input"; } > "$out"
"#;

/// Scripts live outside the scratch directory so it can be checked for leftovers
struct Fixture {
    scripts: TempDir,
    scratch: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            scripts: TempDir::new().unwrap(),
            scratch: TempDir::new().unwrap(),
        }
    }

    fn program(&self, name: &str, body: &str) -> Program {
        let path = self.scripts.path().join(name);
        std::fs::write(&path, body).unwrap();
        Program::new("/bin/sh").with_args([path.to_string_lossy().into_owned()])
    }

    fn office(&self, body: &str, timeout: Duration) -> OfficeBackend {
        OfficeBackend::new(
            self.program("soffice.sh", body),
            ScratchManager::new(self.scratch.path()),
            timeout,
        )
    }

    fn browser(&self, body: &str) -> BrowserBackend {
        BrowserBackend::new(
            self.program("chromium.sh", body),
            ScratchManager::new(self.scratch.path()),
            Duration::from_secs(10),
        )
        .with_no_sandbox(true)
    }

    fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    fn leftovers(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

// =============================================================================
// Office backend
// =============================================================================

mod office {
    use super::*;

    #[test]
    fn test_success_returns_output_and_cleans_up() {
        let fixture = Fixture::new();
        let backend = fixture.office(FAKE_SOFFICE, Duration::from_secs(10));

        let pdf = backend.convert(b"document", TargetFormat::Pdf).unwrap();

        assert_eq!(pdf, b"%PDF-1.4 fake\ndocument");
        assert!(fixture.leftovers().is_empty(), "left {:?}", fixture.leftovers());
    }

    #[test]
    fn test_process_failure_cleans_up() {
        let fixture = Fixture::new();
        let backend = fixture.office(
            "echo 'Error: source file could not be loaded' >&2; exit 1",
            Duration::from_secs(10),
        );

        match backend.convert(b"document", TargetFormat::Pdf) {
            Err(ConversionError::ProcessFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("could not be loaded"));
            }
            other => panic!("expected ProcessFailed, got {:?}", other),
        }
        assert!(fixture.leftovers().is_empty());
    }

    #[test]
    fn test_missing_output_cleans_up() {
        let fixture = Fixture::new();
        let backend = fixture.office("exit 0", Duration::from_secs(10));

        let err = backend.convert(b"document", TargetFormat::Pdf).unwrap_err();
        match err {
            ConversionError::MissingOutput(path) => {
                assert!(path.starts_with(fixture.scratch_path()));
            }
            other => panic!("expected MissingOutput, got {:?}", other),
        }
        assert!(fixture.leftovers().is_empty());
    }

    #[test]
    fn test_timeout_cleans_up() {
        let fixture = Fixture::new();
        let backend = fixture.office("exec sleep 30", Duration::from_millis(300));

        let err = backend.convert(b"document", TargetFormat::Pdf).unwrap_err();
        assert!(matches!(err, ConversionError::Timeout { .. }));
        assert!(fixture.leftovers().is_empty());
    }

    #[test]
    fn test_timeout_stops_forked_converter() {
        let fixture = Fixture::new();
        let late = fixture.scripts.path().join("late-writes");
        // Like soffice: the launched wrapper forks the process doing the work
        let script = format!(
            r#"
outdir=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    *) shift ;;
  esac
done
( sleep 1; echo "$outdir" >> '{}'; printf late > "$outdir/late.pdf" ) &
wait
"#,
            late.display()
        );
        let backend = fixture.office(&script, Duration::from_millis(300));

        let err = backend.convert(b"document", TargetFormat::Pdf).unwrap_err();
        assert!(matches!(err, ConversionError::Timeout { .. }));

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!late.exists(), "forked converter kept running");
        assert!(fixture.leftovers().is_empty(), "left {:?}", fixture.leftovers());
    }

    #[test]
    fn test_unavailable_program() {
        let fixture = Fixture::new();
        let backend = OfficeBackend::new(
            Program::new("/nonexistent/soffice"),
            ScratchManager::new(fixture.scratch_path()),
            Duration::from_secs(1),
        );

        assert!(!backend.is_available());
        let err = backend.convert(b"document", TargetFormat::Pdf).unwrap_err();
        assert!(matches!(err, ConversionError::Unavailable { .. }));
        assert!(fixture.leftovers().is_empty());
    }

    #[test]
    fn test_concurrent_conversions_keep_their_output() {
        let fixture = Fixture::new();
        let backend = Arc::new(fixture.office(FAKE_SOFFICE, Duration::from_secs(30)));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let backend = Arc::clone(&backend);
                std::thread::spawn(move || {
                    let input = format!("document-{i}");
                    let pdf = backend.convert(input.as_bytes(), TargetFormat::Pdf).unwrap();
                    (input, pdf)
                })
            })
            .collect();

        for handle in handles {
            let (input, pdf) = handle.join().unwrap();
            assert_eq!(pdf, format!("%PDF-1.4 fake\n{input}").into_bytes());
        }
        assert!(fixture.leftovers().is_empty());
    }
}

// =============================================================================
// Browser backend
// =============================================================================

mod browser {
    use super::*;

    #[test]
    fn test_prints_simplified_html() {
        let fixture = Fixture::new();
        let backend = fixture.browser(FAKE_CHROMIUM);
        let docx = docx_with_body("<w:p><w:r><w:t>Se certifica que Ana</w:t></w:r></w:p>");

        let pdf = backend.convert(&docx, TargetFormat::Pdf).unwrap();
        let text = String::from_utf8_lossy(&pdf);

        assert!(text.starts_with("%PDF-1.4 fake"));
        assert!(text.contains("--headless"));
        assert!(text.contains("--no-pdf-header-footer"));
        assert!(text.contains("--no-sandbox"));
        assert!(text.contains("<p>Se certifica que Ana</p>"));
        assert!(fixture.leftovers().is_empty());
    }

    #[test]
    fn test_browser_failure_cleans_up() {
        let fixture = Fixture::new();
        let backend = fixture.browser("echo 'crashed' >&2; exit 133");
        let docx = docx_with_body("<w:p/>");

        let err = backend.convert(&docx, TargetFormat::Pdf).unwrap_err();
        assert!(matches!(err, ConversionError::ProcessFailed { .. }));
        assert!(err.to_string().contains("crashed"));
        assert!(fixture.leftovers().is_empty());
    }
}
