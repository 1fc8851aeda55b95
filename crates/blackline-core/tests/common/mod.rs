//! In-memory `.docx` fixtures for integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use blackline_core::package::OpcPackage;
use blackline_core::WmlDocument;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

pub fn document_xml(body_children: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body_children}</w:body></w:document>"#
    )
}

pub fn docx_from_body(body_children: &str) -> WmlDocument {
    let mut package = OpcPackage::empty();
    package.set_part("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec());
    package.set_part("_rels/.rels", ROOT_RELS.as_bytes().to_vec());
    package.set_part(
        "word/document.xml",
        document_xml(body_children).into_bytes(),
    );
    let bytes = package.save().expect("fixture package must save");
    WmlDocument::from_bytes(&bytes).expect("fixture package must open")
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn paragraph(text: &str) -> String {
    if text.is_empty() {
        "<w:p/>".to_string()
    } else {
        format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape_text(text)
        )
    }
}

pub fn docx_with_paragraphs(paragraphs: &[&str]) -> WmlDocument {
    let body: String = paragraphs.iter().map(|p| paragraph(p)).collect();
    docx_from_body(&body)
}

pub fn table_row(cells: &[&str]) -> String {
    let cells: String = cells
        .iter()
        .map(|text| {
            format!(
                r#"<w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr>{}</w:tc>"#,
                paragraph(text)
            )
        })
        .collect();
    format!("<w:tr>{cells}</w:tr>")
}

pub fn table(rows: &[Vec<&str>]) -> String {
    let rows: String = rows.iter().map(|cells| table_row(cells)).collect();
    format!(
        r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid><w:gridCol w:w="2000"/></w:tblGrid>{rows}</w:tbl>"#
    )
}

/// Main-part XML of a document, for assertions.
pub fn main_xml(document: &WmlDocument) -> String {
    let bytes = document
        .package()
        .part("word/document.xml")
        .expect("main part present")
        .to_vec();
    String::from_utf8(bytes).expect("main part is UTF-8")
}

/// Visible text of the main part, paragraph by paragraph. Deleted text
/// (`w:delText`) is not visible.
pub fn visible_paragraph_texts(document: &WmlDocument) -> Vec<String> {
    let tree = document.main_part().expect("main part parses");
    let root = tree.root().expect("main part has a root");
    let mut paragraphs = Vec::new();
    collect_paragraph_texts(&tree, root, &mut paragraphs);
    paragraphs
}

fn collect_paragraph_texts(
    tree: &blackline_core::xml::XmlTree,
    node: blackline_core::xml::NodeId,
    out: &mut Vec<String>,
) {
    use blackline_core::xml::namespaces::W;
    if tree.is_named(node, &W::p()) {
        let mut text = String::new();
        for desc in tree.descendants(node) {
            if tree.is_named(desc, &W::t()) {
                text.push_str(&tree.inner_text(desc));
            }
        }
        out.push(text);
        return;
    }
    let children: Vec<_> = tree.children(node).collect();
    for child in children {
        collect_paragraph_texts(tree, child, out);
    }
}
