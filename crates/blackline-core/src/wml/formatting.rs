//! Run-formatting signatures.
//!
//! A signature is a digest over the subset of run properties that count as
//! "formatting" for change tracking. Two Equal atoms whose signatures
//! differ become a `FormatChanged` pair and later an `rPrChange`.

use crate::hash::sha1_hex;
use crate::wml::atoms::{ComparisonUnitAtom, ContentKind, CorrelationStatus};
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::W;
use indextree::NodeId;
use once_cell::sync::Lazy;
use std::collections::HashSet;

static ALLOWED_RUN_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "b", "bCs", "i", "iCs", "u", "sz", "szCs", "color", "rFonts", "highlight", "strike",
        "dstrike", "caps", "smallCaps", "vertAlign",
    ]
    .into_iter()
    .collect()
});

/// Properties whose attribute values are semantically significant.
static VALUED_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["u", "color", "sz", "szCs", "rFonts", "highlight", "vertAlign"]
        .into_iter()
        .collect()
});

static FONT_ATTRIBUTES: &[&str] = &["ascii", "hAnsi", "cs", "eastAsia"];

/// Signature of the run's formatting, or `None` when the run carries no
/// tracked formatting at all. Children are normalized (filtered and
/// name-sorted) so schema-order differences never register as changes.
pub fn run_signature(tree: &XmlTree, run: NodeId) -> Option<String> {
    let rpr = tree.child_named(run, &W::rPr())?;
    let text = normalized_rpr_text(tree, rpr);
    if text.is_empty() {
        None
    } else {
        Some(sha1_hex(&text))
    }
}

/// Canonical text of the formatting-relevant subset of an `rPr`.
pub fn normalized_rpr_text(tree: &XmlTree, rpr: NodeId) -> String {
    let mut entries: Vec<String> = Vec::new();
    for child in tree.children(rpr) {
        let Some(name) = tree.name(child) else { continue };
        if name.namespace.as_deref() != Some(W::NS)
            || !ALLOWED_RUN_PROPERTIES.contains(name.local.as_str())
        {
            continue;
        }
        let mut entry = name.local.clone();
        if VALUED_PROPERTIES.contains(name.local.as_str()) {
            let mut kept: Vec<(String, String)> = Vec::new();
            if let Some(attrs) = tree.get(child).and_then(|n| n.attributes()) {
                for attr in attrs {
                    if attr.name.namespace.as_deref() != Some(W::NS) {
                        continue;
                    }
                    let keep = if name.local == "rFonts" {
                        FONT_ATTRIBUTES.contains(&attr.name.local.as_str())
                    } else {
                        attr.name.local == "val"
                    };
                    if keep {
                        kept.push((attr.name.local.clone(), attr.value.clone()));
                    }
                }
            }
            kept.sort();
            for (attr_name, value) in kept {
                entry.push_str(&format!(" {}={}", attr_name, value));
            }
        } else if let Some(val) = tree.attribute(child, &W::val()) {
            // Toggle properties: an explicit w:val still matters
            // ("false" switches the toggle off).
            entry.push_str(&format!(" val={}", val));
        }
        entries.push(entry);
    }
    entries.sort();
    entries.join(";")
}

/// Promotes formatting-only differences to `FormatChanged` after
/// correlation: Equal text whose run signature moved, and a paragraph
/// mark replaced by one that differs only in properties.
pub fn detect_format_changes(atoms: &mut Vec<ComparisonUnitAtom>) {
    for atom in atoms.iter_mut() {
        if atom.status != CorrelationStatus::Equal {
            continue;
        }
        if !matches!(atom.content, ContentKind::Text(_)) {
            continue;
        }
        if let Some(before) = atom.before.as_deref() {
            if atom.run_signature != before.run_signature {
                atom.status = CorrelationStatus::FormatChanged;
            }
        }
    }

    // A restyled paragraph correlates as a deleted mark immediately
    // followed by an inserted one; fuse the pair so it reads as a
    // property change rather than a paragraph split.
    let mut index = 0;
    while index + 1 < atoms.len() {
        let fuse = atoms[index].status == CorrelationStatus::Deleted
            && atoms[index].content.is_paragraph_mark()
            && atoms[index + 1].status == CorrelationStatus::Inserted
            && atoms[index + 1].content.is_paragraph_mark();
        if fuse {
            let old_mark = atoms.remove(index);
            atoms[index].status = CorrelationStatus::FormatChanged;
            atoms[index].before = Some(Box::new(old_mark));
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parser::parse;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn signature_of(run_xml: &str) -> Option<String> {
        let tree = parse(run_xml).unwrap();
        run_signature(&tree, tree.root().unwrap())
    }

    #[test]
    fn no_rpr_means_no_signature() {
        assert_eq!(signature_of(&format!(r#"<w:r xmlns:w="{W_NS}"><w:t>x</w:t></w:r>"#)), None);
    }

    #[test]
    fn bold_and_italic_differ() {
        let bold = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:b/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        let italic = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:i/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        assert!(bold.is_some());
        assert_ne!(bold, italic);
    }

    #[test]
    fn property_order_does_not_matter() {
        let a = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:b/><w:i/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        let b = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:i/><w:b/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        assert_eq!(a, b);
    }

    #[test]
    fn untracked_properties_are_ignored() {
        let plain = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:b/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        let with_lang = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:b/><w:lang w:val="en-US"/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        assert_eq!(plain, with_lang);
    }

    #[test]
    fn color_value_is_significant() {
        let red = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:color w:val="FF0000"/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        let blue = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:color w:val="0000FF"/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        assert_ne!(red, blue);
    }

    #[test]
    fn toggle_set_to_false_differs_from_set() {
        let on = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:b/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        let off = signature_of(&format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:b w:val="false"/></w:rPr><w:t>x</w:t></w:r>"#
        ));
        assert_ne!(on, off);
    }
}
