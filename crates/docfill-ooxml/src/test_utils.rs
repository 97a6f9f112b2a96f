//! Shared test utilities for docfill crates
//!
//! Builds small but valid DOCX containers around a given body so tests do
//! not depend on binary fixtures.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

use crate::archive::OoxmlArchive;

/// WordprocessingML main namespace
pub const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

/// Wrap body content in a complete `word/document.xml`
pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WORD_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

/// Create a minimal DOCX whose body is `body`
///
/// # Example
/// ```
/// use docfill_ooxml::test_utils::docx_with_body;
/// let docx = docx_with_body("<w:p><w:r><w:t>{nombre}</w:t></w:r></w:p>");
/// assert!(!docx.is_empty());
/// ```
pub fn docx_with_body(body: &str) -> Vec<u8> {
    docx_with_parts(body, &[])
}

/// Create a minimal DOCX with a body plus extra parts (headers, footers, ...)
pub fn docx_with_parts(body: &str, extra: &[(&str, &str)]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let mut parts: Vec<(&str, String)> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("word/document.xml", document_xml(body)),
    ];
    parts.extend(extra.iter().map(|(path, xml)| (*path, xml.to_string())));

    for (path, contents) in parts {
        zip.start_file(path, options)
            .expect("start zip entry in memory");
        zip.write_all(contents.as_bytes())
            .expect("write zip entry in memory");
    }

    zip.finish().expect("finish in-memory zip");
    buffer.into_inner()
}

/// Extract any file content from a DOCX byte array
pub fn extract_file(docx: &[u8], path: &str) -> Option<String> {
    let archive = OoxmlArchive::from_bytes(docx).expect("valid DOCX container");
    archive.get_string(path).expect("UTF-8 part")
}

/// Extract `word/document.xml` from a DOCX byte array
pub fn extract_document_xml(docx: &[u8]) -> String {
    extract_file(docx, "word/document.xml").expect("document part present")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docx_with_body_is_valid_container() {
        let docx = docx_with_body("<w:p><w:r><w:t>Template</w:t></w:r></w:p>");
        let archive = OoxmlArchive::from_bytes(&docx).unwrap();

        assert!(archive.contains("[Content_Types].xml"));
        assert!(archive.contains("_rels/.rels"));
        assert!(extract_document_xml(&docx).contains("<w:t>Template</w:t>"));
    }

    #[test]
    fn test_extra_parts() {
        let docx = docx_with_parts("", &[("word/header1.xml", "<w:hdr/>")]);
        assert_eq!(extract_file(&docx, "word/header1.xml").unwrap(), "<w:hdr/>");
        assert!(extract_file(&docx, "word/footer1.xml").is_none());
    }
}
