//! Archive handling for DOCX files
//!
//! DOCX files are ZIP archives containing XML parts and resources. Entries
//! keep their original order so a repackaged document lists its parts the
//! same way the template did.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};

use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::error::{OoxmlError, Result};

/// Path of the main document part
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Represents an unpacked DOCX container
#[derive(Debug, Clone, Default)]
pub struct OoxmlArchive {
    /// All files in the archive, keyed by path
    files: HashMap<String, Vec<u8>>,
    /// Entry paths in archive order
    order: Vec<String>,
}

impl OoxmlArchive {
    /// Create from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut zip = ZipArchive::new(reader)?;
        let mut archive = Self::default();

        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            archive.set(name, contents);
        }

        Ok(archive)
    }

    /// Unpack an in-memory container
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Get a file's contents by path
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    /// Get a file's contents as a UTF-8 string
    pub fn get_string(&self, path: &str) -> Result<Option<String>> {
        match self.files.get(path) {
            Some(bytes) => {
                let s = String::from_utf8(bytes.clone()).map_err(|_| {
                    OoxmlError::InvalidStructure(format!("{} is not valid UTF-8", path))
                })?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    /// Get the main document content (word/document.xml)
    pub fn document_xml(&self) -> Result<&[u8]> {
        self.get(DOCUMENT_PART)
            .ok_or_else(|| OoxmlError::MissingFile(DOCUMENT_PART.to_string()))
    }

    /// Check if a file exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// List all files in the archive, in archive order
    pub fn file_list(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Parts that carry visible text and may hold placeholders
    ///
    /// The main document first, then headers, footers, footnotes and endnotes
    /// in archive order.
    pub fn text_parts(&self) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();
        if self.contains(DOCUMENT_PART) {
            parts.push(DOCUMENT_PART.to_string());
        }
        parts.extend(
            self.order
                .iter()
                .filter(|path| is_secondary_text_part(path))
                .cloned(),
        );
        parts
    }

    /// Set or update a file's contents
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        let path = path.into();
        if !self.files.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.files.insert(path, contents);
    }

    /// Set a file's contents from a string
    pub fn set_string(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.set(path, contents.into().into_bytes());
    }

    /// Write the archive to any writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        // Fixed timestamps: the same input always yields the same bytes
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for path in &self.order {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(&self.files[path])?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Repackage the archive into bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }
}

fn is_secondary_text_part(path: &str) -> bool {
    let Some(name) = path.strip_prefix("word/") else {
        return false;
    };
    if name.contains('/') || !name.ends_with(".xml") {
        return false;
    }
    name.starts_with("header")
        || name.starts_with("footer")
        || name == "footnotes.xml"
        || name == "endnotes.xml"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_operations() {
        let mut archive = OoxmlArchive::default();

        archive.set_string("test.xml", "<root/>");
        assert!(archive.contains("test.xml"));
        assert_eq!(
            archive.get_string("test.xml").unwrap(),
            Some("<root/>".to_string())
        );
        assert!(!archive.contains("other.xml"));
        assert_eq!(archive.file_list().count(), 1);
    }

    #[test]
    fn test_set_existing_keeps_position() {
        let mut archive = OoxmlArchive::default();
        archive.set_string("a.xml", "1");
        archive.set_string("b.xml", "2");
        archive.set_string("a.xml", "3");

        let order: Vec<_> = archive.file_list().collect();
        assert_eq!(order, vec!["a.xml", "b.xml"]);
        assert_eq!(archive.get("a.xml"), Some(&b"3"[..]));
    }

    #[test]
    fn test_text_parts_selection() {
        let mut archive = OoxmlArchive::default();
        archive.set_string("[Content_Types].xml", "");
        archive.set_string("word/footer1.xml", "");
        archive.set_string("word/styles.xml", "");
        archive.set_string(DOCUMENT_PART, "");
        archive.set_string("word/header2.xml", "");
        archive.set_string("word/_rels/header2.xml.rels", "");
        archive.set_string("word/footnotes.xml", "");

        assert_eq!(
            archive.text_parts(),
            vec![
                "word/document.xml",
                "word/footer1.xml",
                "word/header2.xml",
                "word/footnotes.xml"
            ]
        );
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let mut archive = OoxmlArchive::default();
        archive.set_string("[Content_Types].xml", "<Types/>");
        archive.set_string("word/document.xml", "<w:document/>");
        archive.set_string("_rels/.rels", "<Relationships/>");

        let bytes = archive.to_bytes().unwrap();
        let restored = OoxmlArchive::from_bytes(&bytes).unwrap();

        let order: Vec<_> = restored.file_list().collect();
        assert_eq!(
            order,
            vec!["[Content_Types].xml", "word/document.xml", "_rels/.rels"]
        );
        assert_eq!(restored.document_xml().unwrap(), b"<w:document/>");
    }

    #[test]
    fn test_missing_document_part() {
        let archive = OoxmlArchive::default();
        assert!(matches!(
            archive.document_xml(),
            Err(OoxmlError::MissingFile(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_part() {
        let mut archive = OoxmlArchive::default();
        archive.set("word/document.xml", vec![0xff, 0xfe, 0x00]);
        assert!(archive.get_string("word/document.xml").is_err());
    }
}
