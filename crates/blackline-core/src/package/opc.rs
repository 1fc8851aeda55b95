//! Minimal OPC (ZIP) container handling.
//!
//! Parts are kept as an ordered sequence and written back in that order, so
//! re-saving an unchanged package is byte-stable.

use crate::error::{Error, Result};
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::{CP, DC, DCTERMS};
use std::io::{Cursor, Read, Write};
use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

/// Properties read from `docProps/core.xml`, used as revision-metadata
/// fallbacks.
#[derive(Debug, Clone, Default)]
pub struct CoreProperties {
    pub last_modified_by: Option<String>,
    pub creator: Option<String>,
    pub modified: Option<String>,
}

pub struct OpcPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl OpcPackage {
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            Error::InvalidPackage {
                message: e.to_string(),
            }
        })?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| Error::InvalidPackage {
                message: e.to_string(),
            })?;
            let name = file.name().to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            parts.push((name, content));
        }
        Ok(Self { parts })
    }

    /// An empty package; parts are added with [`set_part`](Self::set_part).
    pub fn empty() -> Self {
        Self { parts: Vec::new() }
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut buffer);
        for (path, content) in &self.parts {
            let options: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default()
                .compression_method(CompressionMethod::Deflated);
            writer.start_file(path.as_str(), options)?;
            writer.write_all(content)?;
        }
        writer.finish()?;
        Ok(buffer.into_inner())
    }

    pub fn part(&self, path: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(name, _)| name == path)
            .map(|(_, content)| content.as_slice())
    }

    pub fn has_part(&self, path: &str) -> bool {
        self.part(path).is_some()
    }

    pub fn xml_part(&self, path: &str) -> Result<XmlTree> {
        let bytes = self.part(path).ok_or_else(|| Error::MissingPart {
            part_path: path.to_string(),
        })?;
        crate::xml::parser::parse_bytes(bytes)
    }

    /// Replaces an existing part in place or appends a new one.
    pub fn set_part(&mut self, path: &str, content: Vec<u8>) {
        if let Some((_, existing)) = self.parts.iter_mut().find(|(name, _)| name == path) {
            *existing = content;
        } else {
            self.parts.push((path.to_string(), content));
        }
    }

    pub fn set_xml_part(&mut self, path: &str, tree: &XmlTree) -> Result<()> {
        let bytes = crate::xml::writer::serialize_bytes(tree)?;
        self.set_part(path, bytes);
        Ok(())
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    pub fn core_properties(&self) -> CoreProperties {
        let mut props = CoreProperties::default();
        let Ok(core) = self.xml_part("docProps/core.xml") else {
            return props;
        };
        let Some(root) = core.root() else {
            return props;
        };
        for node in core.descendants(root) {
            let Some(name) = core.name(node) else { continue };
            let value = || {
                let text = core.inner_text(node);
                let trimmed = text.trim().to_string();
                (!trimmed.is_empty()).then_some(trimmed)
            };
            if name.is(CP::NS, "lastModifiedBy") {
                props.last_modified_by = value();
            } else if name.is(DC::NS, "creator") {
                props.creator = value();
            } else if name.is(DCTERMS::NS, "modified") {
                props.modified = value();
            }
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_parts() {
        let mut pkg = OpcPackage::empty();
        pkg.set_part("word/document.xml", b"<w:document/>".to_vec());
        pkg.set_part("[Content_Types].xml", b"<Types/>".to_vec());

        let bytes = pkg.save().unwrap();
        let reopened = OpcPackage::open(&bytes).unwrap();
        assert_eq!(reopened.part("word/document.xml"), Some(&b"<w:document/>"[..]));
        assert_eq!(reopened.part_names().count(), 2);
    }

    #[test]
    fn save_is_byte_stable() {
        let mut pkg = OpcPackage::empty();
        pkg.set_part("a.xml", b"<a/>".to_vec());
        pkg.set_part("b.xml", b"<b/>".to_vec());
        assert_eq!(pkg.save().unwrap(), pkg.save().unwrap());
    }

    #[test]
    fn set_part_replaces_in_place() {
        let mut pkg = OpcPackage::empty();
        pkg.set_part("a.xml", b"<a/>".to_vec());
        pkg.set_part("b.xml", b"<b/>".to_vec());
        pkg.set_part("a.xml", b"<a2/>".to_vec());
        let names: Vec<&str> = pkg.part_names().collect();
        assert_eq!(names, ["a.xml", "b.xml"]);
        assert_eq!(pkg.part("a.xml"), Some(&b"<a2/>"[..]));
    }

    #[test]
    fn garbage_is_invalid_package() {
        assert!(matches!(
            OpcPackage::open(b"not a zip"),
            Err(Error::InvalidPackage { .. })
        ));
    }

    #[test]
    fn missing_xml_part_is_missing_part() {
        let pkg = OpcPackage::empty();
        assert!(matches!(
            pkg.xml_part("word/document.xml"),
            Err(Error::MissingPart { .. })
        ));
    }

    #[test]
    fn core_properties_read_from_core_xml() {
        let core = concat!(
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">"#,
            r#"<dc:creator>Ann</dc:creator><cp:lastModifiedBy>Bob</cp:lastModifiedBy>"#,
            r#"<dcterms:modified>2024-05-01T09:30:00Z</dcterms:modified></cp:coreProperties>"#
        );
        let mut pkg = OpcPackage::empty();
        pkg.set_part("docProps/core.xml", core.as_bytes().to_vec());
        let props = pkg.core_properties();
        assert_eq!(props.creator.as_deref(), Some("Ann"));
        assert_eq!(props.last_modified_by.as_deref(), Some("Bob"));
        assert_eq!(props.modified.as_deref(), Some("2024-05-01T09:30:00Z"));
    }
}
