//! Markup simplification.
//!
//! Strips markup variants the correlation engine does not model so both
//! inputs reach atomization in a predictable shape. Comment range markers
//! are deliberately kept: they ride through correlation as structural atoms.

use crate::error::{Error, Result};
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::W;
use indextree::NodeId;
use once_cell::sync::Lazy;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SimplifySettings {
    pub remove_proof_errors: bool,
    pub remove_bookmarks: bool,
    pub remove_go_back_bookmark: bool,
    pub remove_smart_tags: bool,
    pub remove_content_controls: bool,
    pub remove_last_rendered_page_breaks: bool,
    pub remove_permissions: bool,
    pub remove_soft_hyphens: bool,
    pub remove_rsid_attributes: bool,
}

impl Default for SimplifySettings {
    fn default() -> Self {
        Self {
            remove_proof_errors: true,
            remove_bookmarks: true,
            remove_go_back_bookmark: true,
            remove_smart_tags: true,
            remove_content_controls: true,
            remove_last_rendered_page_breaks: true,
            remove_permissions: true,
            remove_soft_hyphens: true,
            remove_rsid_attributes: true,
        }
    }
}

/// Constructs the comparer does not understand and cannot strip without
/// changing document meaning.
static UNSIMPLIFIABLE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["altChunk", "subDoc", "contentPart"].into_iter().collect()
});

pub fn simplify_markup(
    tree: &mut XmlTree,
    root: NodeId,
    settings: &SimplifySettings,
) -> Result<()> {
    reject_unsimplifiable(tree, root)?;

    let mut removals: Vec<NodeId> = Vec::new();
    let mut unwraps: Vec<NodeId> = Vec::new();

    for node in tree.descendants(root) {
        let Some(name) = tree.name(node) else { continue };
        if name.namespace.as_deref() != Some(W::NS) {
            continue;
        }
        match name.local.as_str() {
            "proofErr" if settings.remove_proof_errors => removals.push(node),
            "lastRenderedPageBreak" if settings.remove_last_rendered_page_breaks => {
                removals.push(node)
            }
            "permStart" | "permEnd" if settings.remove_permissions => removals.push(node),
            "softHyphen" if settings.remove_soft_hyphens => removals.push(node),
            "bookmarkStart" | "bookmarkEnd" => {
                let go_back = tree.attribute(node, &W::name()) == Some("_GoBack");
                if settings.remove_bookmarks || (settings.remove_go_back_bookmark && go_back) {
                    removals.push(node);
                }
            }
            "smartTag" if settings.remove_smart_tags => unwraps.push(node),
            "sdt" if settings.remove_content_controls => unwraps.push(node),
            _ => {}
        }
    }

    for node in removals {
        tree.remove(node);
    }
    for node in unwraps {
        unwrap_element(tree, node);
    }

    if settings.remove_rsid_attributes {
        strip_rsid_attributes(tree, root);
    }
    Ok(())
}

fn reject_unsimplifiable(tree: &XmlTree, root: NodeId) -> Result<()> {
    for node in tree.descendants(root) {
        if let Some(name) = tree.name(node) {
            if name.namespace.as_deref() == Some(W::NS)
                && UNSIMPLIFIABLE.contains(name.local.as_str())
            {
                return Err(Error::UnsupportedFeature {
                    feature: format!("w:{}", name.local),
                });
            }
        }
    }
    Ok(())
}

/// Replaces an element with its content. `w:sdt` contributes the children
/// of its `w:sdtContent`; everything else contributes its own children.
fn unwrap_element(tree: &mut XmlTree, node: NodeId) {
    let content = if tree.is_named(node, &W::sdt()) {
        tree.child_named(node, &W::sdtContent())
    } else {
        Some(node)
    };
    if let Some(content) = content {
        let children: Vec<NodeId> = tree.children(content).collect();
        for child in children {
            tree.detach(child);
            tree.insert_before(node, child);
        }
    }
    tree.remove(node);
}

fn strip_rsid_attributes(tree: &mut XmlTree, root: NodeId) {
    let nodes: Vec<NodeId> = tree.descendants(root).collect();
    for node in nodes {
        if let Some(attrs) = tree.get_mut(node).and_then(|n| n.attributes_mut()) {
            attrs.retain(|attr| {
                !(attr.name.namespace.as_deref() == Some(W::NS)
                    && attr.name.local.starts_with("rsid"))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parser::parse;
    use crate::xml::writer::serialize;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn simplify(xml: &str) -> String {
        let mut tree = parse(xml).unwrap();
        let root = tree.root().unwrap();
        simplify_markup(&mut tree, root, &SimplifySettings::default()).unwrap();
        serialize(&tree).unwrap()
    }

    #[test]
    fn proof_errors_are_removed() {
        let out = simplify(&format!(
            r#"<w:p xmlns:w="{W_NS}"><w:proofErr w:type="spellStart"/><w:r><w:t>x</w:t></w:r><w:proofErr w:type="spellEnd"/></w:p>"#
        ));
        assert!(!out.contains("proofErr"));
        assert!(out.contains("<w:t>x</w:t>"));
    }

    #[test]
    fn content_controls_are_unwrapped_in_place() {
        let out = simplify(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p/><w:sdt><w:sdtPr/><w:sdtContent><w:p><w:r><w:t>kept</w:t></w:r></w:p></w:sdtContent></w:sdt><w:p/></w:body>"#
        ));
        assert!(!out.contains("sdt"));
        assert!(out.contains("kept"));
        let kept_pos = out.find("kept").unwrap();
        let last_p = out.rfind("<w:p/>").unwrap();
        assert!(kept_pos < last_p);
    }

    #[test]
    fn comment_ranges_survive() {
        let out = simplify(&format!(
            r#"<w:p xmlns:w="{W_NS}"><w:commentRangeStart w:id="1"/><w:r><w:t>x</w:t></w:r><w:commentRangeEnd w:id="1"/></w:p>"#
        ));
        assert!(out.contains("commentRangeStart"));
        assert!(out.contains("commentRangeEnd"));
    }

    #[test]
    fn rsid_attributes_are_stripped() {
        let out = simplify(&format!(
            r#"<w:p xmlns:w="{W_NS}" w:rsidR="00AB12CD"><w:r><w:t>x</w:t></w:r></w:p>"#
        ));
        assert!(!out.contains("rsidR"));
    }

    #[test]
    fn alt_chunk_is_unsupported() {
        let mut tree = parse(&format!(
            r#"<w:body xmlns:w="{W_NS}"><w:altChunk/></w:body>"#
        ))
        .unwrap();
        let root = tree.root().unwrap();
        let err = simplify_markup(&mut tree, root, &SimplifySettings::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
    }

    #[test]
    fn simplification_is_idempotent() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:bookmarkStart w:id="0" w:name="_GoBack"/><w:r><w:t>x</w:t></w:r><w:bookmarkEnd w:id="0"/></w:p></w:body>"#
        );
        let once = simplify(&xml);
        assert_eq!(simplify(&once), once);
    }
}
