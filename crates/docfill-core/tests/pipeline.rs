//! Pipeline built from configuration, with a scripted LibreOffice stand-in

#![cfg(unix)]

use std::path::Path;

use docfill_core::{ErrorKind, Orchestrator, RenderContext, Settings, TargetFormat};
use docfill_ooxml::test_utils::{docx_with_body, extract_document_xml};
use serde_json::json;
use tempfile::TempDir;

/// Writes "%PDF-1.4 fake" followed by the input where soffice would
const FAKE_SOFFICE: &str = r#"
outdir=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    -*) shift ;;
    *) input="$1"; shift ;;
  esac
done
name=$(basename "$input" .docx)
{ printf '%%PDF-1.4 fake\n'; cat "$input"; } > "$outdir/$name.pdf"
"#;

const BODY: &str = "<w:p><w:r><w:t>Se certifica que {nombre}</w:t></w:r></w:p><w:p><w:r><w:t>Fecha: {fecha}</w:t></w:r></w:p>";

struct Deployment {
    root: TempDir,
}

impl Deployment {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["templates", "scratch", "bin"] {
            std::fs::create_dir(root.path().join(dir)).unwrap();
        }
        std::fs::write(root.path().join("bin/soffice.sh"), FAKE_SOFFICE).unwrap();
        Self { root }
    }

    fn path(&self, rel: &str) -> String {
        self.root.path().join(rel).to_string_lossy().into_owned()
    }

    fn settings(&self) -> Settings {
        let toml = format!(
            r#"
[template]
dir = "{templates}"

[conversion]
backend = "office"
timeout_secs = 20
scratch_dir = "{scratch}"

[conversion.office]
program = "/bin/sh"
args = ["{script}"]
"#,
            templates = self.path("templates"),
            scratch = self.path("scratch"),
            script = self.path("bin/soffice.sh"),
        );
        Settings::from_toml_str(&toml).unwrap()
    }

    fn install_template(&self, name: &str) {
        std::fs::write(
            self.root.path().join("templates").join(name),
            docx_with_body(BODY),
        )
        .unwrap();
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(Path::new(&self.path("scratch")))
            .unwrap()
            .next()
            .is_none()
    }
}

fn context() -> RenderContext {
    json!({"nombre": "Ana", "fecha": "2024-01-01"})
        .as_object()
        .cloned()
        .unwrap()
}

#[test]
fn test_native_scenario() {
    let deployment = Deployment::new();
    deployment.install_template("Plantilla.docx");
    let orchestrator = Orchestrator::from_settings(&deployment.settings());

    let doc = orchestrator.generate(&context(), TargetFormat::Docx).unwrap();

    assert_eq!(doc.filename, "certificado_generado.docx");
    let xml = extract_document_xml(&doc.bytes);
    assert!(xml.contains("Se certifica que Ana"));
    assert!(xml.contains("Fecha: 2024-01-01"));
}

#[test]
fn test_portable_scenario() {
    let deployment = Deployment::new();
    deployment.install_template("plantilla.docx");
    let orchestrator = Orchestrator::from_settings(&deployment.settings());

    let doc = orchestrator.generate(&context(), TargetFormat::Pdf).unwrap();

    assert_eq!(doc.filename, "certificado_generado.pdf");
    assert_eq!(doc.content_type, "application/pdf");
    assert!(doc.bytes.starts_with(b"%PDF-1.4 fake\n"));
    // The fake converter embeds its input, which must be the filled DOCX
    let docx = &doc.bytes[b"%PDF-1.4 fake\n".len()..];
    assert!(extract_document_xml(docx).contains("Se certifica que Ana"));
    assert!(deployment.scratch_is_empty());
}

#[test]
fn test_conversion_is_repeatable() {
    let deployment = Deployment::new();
    deployment.install_template("plantilla.docx");
    let orchestrator = Orchestrator::from_settings(&deployment.settings());

    let first = orchestrator.generate(&context(), TargetFormat::Pdf).unwrap();
    let second = orchestrator.generate(&context(), TargetFormat::Pdf).unwrap();

    assert_eq!(first.bytes, second.bytes);
}

#[test]
fn test_no_template_produces_nothing() {
    let deployment = Deployment::new();
    deployment.install_template("certificado.docx");
    let orchestrator = Orchestrator::from_settings(&deployment.settings());

    let err = orchestrator.generate(&context(), TargetFormat::Pdf).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
    assert!(deployment.scratch_is_empty());
}

#[test]
fn test_unavailable_converter() {
    let deployment = Deployment::new();
    deployment.install_template("plantilla.docx");
    let mut settings = deployment.settings();
    settings.conversion.office.program = "/nonexistent/soffice".to_string();
    settings.conversion.office.args.clear();
    let orchestrator = Orchestrator::from_settings(&settings);

    assert!(!orchestrator.check().backend_available);
    let err = orchestrator.generate(&context(), TargetFormat::Pdf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);
    assert!(err.to_string().contains("unavailable"));
    assert!(deployment.scratch_is_empty());

    // DOCX output does not need the converter
    assert!(orchestrator.generate(&context(), TargetFormat::Docx).is_ok());
}
