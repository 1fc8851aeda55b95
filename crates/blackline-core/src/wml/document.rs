use crate::error::{Error, Result};
use crate::package::OpcPackage;
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::W;
use indextree::NodeId;

pub const MAIN_PART: &str = "word/document.xml";
pub const FOOTNOTES_PART: &str = "word/footnotes.xml";
pub const ENDNOTES_PART: &str = "word/endnotes.xml";

/// A WordprocessingML document held as an OPC package.
pub struct WmlDocument {
    package: OpcPackage,
}

impl WmlDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = OpcPackage::open(bytes)?;
        if package.part(MAIN_PART).is_none() {
            return Err(Error::MissingPart {
                part_path: MAIN_PART.to_string(),
            });
        }
        Ok(Self { package })
    }

    pub fn from_package(package: OpcPackage) -> Self {
        Self { package }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.package.save()
    }

    pub fn package(&self) -> &OpcPackage {
        &self.package
    }

    pub fn package_mut(&mut self) -> &mut OpcPackage {
        &mut self.package
    }

    pub fn main_part(&self) -> Result<XmlTree> {
        self.package.xml_part(MAIN_PART)
    }

    pub fn footnotes_part(&self) -> Result<Option<XmlTree>> {
        if self.package.has_part(FOOTNOTES_PART) {
            Ok(Some(self.package.xml_part(FOOTNOTES_PART)?))
        } else {
            Ok(None)
        }
    }

    pub fn endnotes_part(&self) -> Result<Option<XmlTree>> {
        if self.package.has_part(ENDNOTES_PART) {
            Ok(Some(self.package.xml_part(ENDNOTES_PART)?))
        } else {
            Ok(None)
        }
    }
}

/// The `w:body` of a main-document part.
pub fn find_body(tree: &XmlTree) -> Option<NodeId> {
    let root = tree.root()?;
    tree.descendants(root)
        .find(|&node| tree.is_named(node, &W::body()))
}

pub fn require_body(tree: &XmlTree) -> Result<NodeId> {
    find_body(tree).ok_or_else(|| Error::MissingPart {
        part_path: "word/document.xml#w:body".to_string(),
    })
}

/// The footnote or endnote element with the given `w:id` under a
/// footnotes/endnotes root.
pub fn find_note_by_id(tree: &XmlTree, root: NodeId, id: &str) -> Option<NodeId> {
    tree.children(root).find(|&child| {
        let name_ok = tree.is_named(child, &W::footnote()) || tree.is_named(child, &W::endnote());
        name_ok && tree.attribute(child, &W::id()) == Some(id)
    })
}
