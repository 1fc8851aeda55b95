//! Tree reconstruction: rebuilds an XML body from correlated atoms.
//!
//! Atoms are regrouped level by level along their `ancestor_unids`; each
//! group re-creates its container element, preserving the container's
//! property children verbatim, until the leaf level concatenates character
//! atoms back into text elements. Deletion/insertion state travels on
//! internal status attributes consumed by the revision-marking pass.

use crate::wml::atoms::{AncestorInfo, ComparisonUnitAtom, ContentKind, CorrelationStatus};
use crate::wml::context::ComparisonContext;
use crate::wml::settings::CompareSettings;
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::{BL, W, XML, XMLNS};
use crate::xml::node::XmlNode;
use crate::xml::parser::parse_fragment;
use crate::xml::xname::{XAttribute, XName};
use crate::util::{group_adjacent, make_valid_xml, needs_space_preserve};
use indextree::NodeId;
use std::collections::HashMap;

pub struct CoalesceResult {
    pub tree: XmlTree,
    pub root: NodeId,
}

pub const STATUS_DELETED: &str = "Deleted";
pub const STATUS_INSERTED: &str = "Inserted";
pub const STATUS_FORMAT_CHANGED: &str = "FormatChanged";

/// Rebuilds a document part from the fully-resolved atom stream.
pub fn coalesce(
    atoms: &[ComparisonUnitAtom],
    root_name: XName,
    root_attrs: Vec<XAttribute>,
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) -> CoalesceResult {
    let mut tree = XmlTree::new();
    let mut attrs = root_attrs;
    ensure_namespace_declarations(&mut attrs);
    let root = tree.add_root(XmlNode::element_with_attrs(root_name.clone(), attrs));

    let content_parent = if root_name == W::document() {
        tree.add_child(root, XmlNode::element(W::body()))
    } else {
        root
    };
    coalesce_level(&mut tree, content_parent, atoms, 0, ctx, settings);

    CoalesceResult { tree, root }
}

fn ensure_namespace_declarations(attrs: &mut Vec<XAttribute>) {
    let standard = [
        ("w", W::NS),
        ("r", crate::xml::namespaces::R::NS),
        ("m", crate::xml::namespaces::M::NS),
        ("v", crate::xml::namespaces::V::NS),
        ("o", crate::xml::namespaces::O::NS),
        ("w10", crate::xml::namespaces::W10::NS),
        ("mc", crate::xml::namespaces::MC::NS),
        ("wp", "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"),
        ("a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
        ("pic", "http://schemas.openxmlformats.org/drawingml/2006/picture"),
    ];
    for (prefix, uri) in standard {
        let declared = attrs.iter().any(|a| {
            a.name.namespace.as_deref() == Some(XMLNS::NS) && a.name.local == prefix
        });
        if !declared {
            attrs.push(XAttribute::new(XName::new(XMLNS::NS, prefix), uri));
        }
    }
}

/// Order-preserving grouping by the UNID at `level`. Atoms whose chain is
/// exhausted at this level group under the empty key and re-create their
/// content element directly.
fn group_by_unid(
    atoms: &[ComparisonUnitAtom],
    level: usize,
) -> Vec<(String, Vec<ComparisonUnitAtom>)> {
    let mut order: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<ComparisonUnitAtom>> = Vec::new();
    for atom in atoms {
        let key = atom.unid_at(level).unwrap_or("").to_string();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(atom.clone());
    }
    order.into_iter().zip(groups).collect()
}

fn coalesce_level(
    tree: &mut XmlTree,
    parent: NodeId,
    atoms: &[ComparisonUnitAtom],
    level: usize,
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) {
    for (unid, group) in group_by_unid(atoms, level) {
        if unid.is_empty() {
            for atom in &group {
                emit_content_element(tree, parent, atom, ctx, settings);
            }
        } else {
            build_container(tree, parent, &group, level, ctx, settings);
        }
    }
}

/// Splits a paragraph's or run's child atoms into adjacent runs that must
/// land in distinct child elements: by next-level UNID, by correlation
/// status, and (for Equal text under formatting tracking) by run
/// signature. A child that is a textbox shell is held together; its
/// statuses resolve on the paragraphs and runs inside it.
fn child_runs(
    atoms: &[ComparisonUnitAtom],
    level: usize,
    settings: &CompareSettings,
) -> Vec<(String, Vec<ComparisonUnitAtom>)> {
    group_adjacent(atoms.iter().cloned(), |atom| {
        child_run_key(atom, level, settings)
    })
}

fn child_run_key(atom: &ComparisonUnitAtom, level: usize, settings: &CompareSettings) -> String {
    let textbox_shell = atom
        .ancestors
        .iter()
        .position(|a| a.name == W::txbxContent())
        .map(|pos| pos >= level)
        .unwrap_or(false);
    let unid = atom.unid_at(level).unwrap_or("");
    if textbox_shell {
        return format!("{}|textbox", unid);
    }
    if !settings.track_formatting_changes {
        return format!("{}|{}", unid, atom.status);
    }
    match atom.status {
        CorrelationStatus::FormatChanged => format!(
            "{}|fmt|{}|{}",
            unid,
            before_signature(atom).unwrap_or_default(),
            atom.run_signature.clone().unwrap_or_default()
        ),
        CorrelationStatus::Equal => format!(
            "{}|{}|sig:{}",
            unid,
            atom.status,
            atom.run_signature.clone().unwrap_or_default()
        ),
        status => format!("{}|{}", unid, status),
    }
}

fn before_signature(atom: &ComparisonUnitAtom) -> Option<String> {
    atom.before.as_ref().and_then(|b| b.run_signature.clone())
}

fn build_container(
    tree: &mut XmlTree,
    parent: NodeId,
    atoms: &[ComparisonUnitAtom],
    level: usize,
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) {
    let ancestor = ancestor_for_level(&atoms[0], level);
    let Some(ancestor) = ancestor else { return };
    let local = ancestor.name.local.as_str();
    let ns = ancestor.name.namespace.as_deref();

    if ns == Some(W::NS) && (local == "t" || local == "delText") {
        emit_text_element(tree, parent, atoms, &W::t(), &W::delText());
        return;
    }
    if ns == Some(W::NS) && (local == "instrText" || local == "delInstrText") {
        emit_instr_text(tree, parent, atoms);
        return;
    }
    if is_opaque_leaf(&atoms[0].content) {
        for atom in atoms {
            emit_opaque_leaf(tree, parent, atom);
        }
        return;
    }

    let element = create_ancestor_element(tree, parent, &ancestor);

    // Wholly-revised rows and cells surface their status on the element;
    // the marking pass turns it into a property-based revision.
    if ns == Some(W::NS) && (local == "tr" || local == "tc") {
        if let Some(status) = uniform_status(atoms) {
            tree.set_attribute(element, &BL::status(), status);
        }
    }

    // Only paragraphs and runs split their children by status; every
    // other container keeps its children whole and lets the paragraphs
    // and runs inside it carry the revision state.
    let splits_children = ns == Some(W::NS) && (local == "p" || local == "r");
    if splits_children {
        let mut format_changed: Option<ComparisonUnitAtom> = None;
        for (key, run_atoms) in child_runs(atoms, level + 1, settings) {
            if key.starts_with('|') {
                // Chain exhausted: content elements of this container.
                for atom in &run_atoms {
                    emit_content_element(tree, element, atom, ctx, settings);
                }
            } else {
                if run_atoms
                    .iter()
                    .any(|a| a.status == CorrelationStatus::FormatChanged)
                {
                    format_changed.get_or_insert_with(|| run_atoms[0].clone());
                }
                coalesce_level(tree, element, &run_atoms, level + 1, ctx, settings);
            }
        }
        if ns == Some(W::NS) && local == "r" && settings.track_formatting_changes {
            if let Some(changed) = format_changed {
                emit_rpr_change(tree, element, &changed, ctx);
            }
        }
    } else {
        coalesce_level(tree, element, atoms, level + 1, ctx, settings);
    }
}

fn ancestor_for_level(atom: &ComparisonUnitAtom, level: usize) -> Option<AncestorInfo> {
    atom.ancestors.get(level).cloned()
}

fn uniform_status(atoms: &[ComparisonUnitAtom]) -> Option<&'static str> {
    let first = atoms.first()?.status;
    if !atoms.iter().all(|a| a.status == first) {
        return None;
    }
    match first {
        CorrelationStatus::Deleted => Some(STATUS_DELETED),
        CorrelationStatus::Inserted => Some(STATUS_INSERTED),
        _ => None,
    }
}

fn create_ancestor_element(
    tree: &mut XmlTree,
    parent: NodeId,
    ancestor: &AncestorInfo,
) -> NodeId {
    let element = tree.add_child(
        parent,
        XmlNode::element_with_attrs(ancestor.name.clone(), ancestor.attributes.as_ref().clone()),
    );
    for prop_xml in ancestor.props.iter() {
        if let Ok(fragment) = parse_fragment(prop_xml) {
            if let Some(frag_root) = fragment.root() {
                let imported = tree.import_subtree(&fragment, frag_root);
                tree.reparent(element, imported);
            }
        }
    }
    element
}

/// Leaf step: the literal concatenation of each atom's character becomes
/// the text element's content. Deleted text serializes as `w:delText`.
fn emit_text_element(
    tree: &mut XmlTree,
    parent: NodeId,
    atoms: &[ComparisonUnitAtom],
    plain_name: &XName,
    deleted_name: &XName,
) {
    let text: String = atoms
        .iter()
        .filter_map(|a| match a.content {
            ContentKind::Text(c) => Some(c),
            _ => None,
        })
        .collect();
    if text.is_empty() {
        return;
    }
    let text = make_valid_xml(&text);
    let status = atoms[0].status;
    let name = if status == CorrelationStatus::Deleted {
        deleted_name.clone()
    } else {
        plain_name.clone()
    };
    let mut attrs = Vec::new();
    if needs_space_preserve(&text) {
        attrs.push(XAttribute::new(XML::space(), "preserve"));
    }
    match status {
        CorrelationStatus::Deleted => {
            attrs.push(XAttribute::new(BL::status(), STATUS_DELETED));
        }
        CorrelationStatus::Inserted => {
            attrs.push(XAttribute::new(BL::status(), STATUS_INSERTED));
        }
        _ => {}
    }
    let element = tree.add_child(parent, XmlNode::element_with_attrs(name, attrs));
    tree.add_child(element, XmlNode::Text(text));
}

fn emit_instr_text(tree: &mut XmlTree, parent: NodeId, atoms: &[ComparisonUnitAtom]) {
    let text: String = atoms
        .iter()
        .filter_map(|a| match &a.content {
            ContentKind::FieldInstruction { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let status = atoms[0].status;
    let name = if status == CorrelationStatus::Deleted {
        XName::new(W::NS, "delInstrText")
    } else {
        W::instrText()
    };
    let mut attrs = Vec::new();
    if needs_space_preserve(&text) {
        attrs.push(XAttribute::new(XML::space(), "preserve"));
    }
    match status {
        CorrelationStatus::Deleted => attrs.push(XAttribute::new(BL::status(), STATUS_DELETED)),
        CorrelationStatus::Inserted => attrs.push(XAttribute::new(BL::status(), STATUS_INSERTED)),
        _ => {}
    }
    let element = tree.add_child(parent, XmlNode::element_with_attrs(name, attrs));
    tree.add_child(element, XmlNode::Text(text));
}

fn is_opaque_leaf(content: &ContentKind) -> bool {
    matches!(
        content,
        ContentKind::Drawing { .. }
            | ContentKind::Picture { .. }
            | ContentKind::Math { .. }
            | ContentKind::EmbeddedObject { .. }
    )
}

fn emit_opaque_leaf(tree: &mut XmlTree, parent: NodeId, atom: &ComparisonUnitAtom) {
    let xml = match &atom.content {
        ContentKind::Drawing { xml, .. }
        | ContentKind::Picture { xml, .. }
        | ContentKind::Math { xml, .. }
        | ContentKind::EmbeddedObject { xml, .. } => xml,
        _ => return,
    };
    let Ok(fragment) = parse_fragment(xml) else { return };
    let Some(frag_root) = fragment.root() else { return };
    let imported = tree.import_subtree(&fragment, frag_root);
    tree.reparent(parent, imported);
    match atom.status {
        CorrelationStatus::Deleted => tree.set_attribute(imported, &BL::status(), STATUS_DELETED),
        CorrelationStatus::Inserted => {
            tree.set_attribute(imported, &BL::status(), STATUS_INSERTED)
        }
        _ => {}
    }
}

/// Content whose chain ends at the current container: today that is the
/// paragraph mark, rebuilt from the paragraph's preserved properties.
fn emit_content_element(
    tree: &mut XmlTree,
    parent: NodeId,
    atom: &ComparisonUnitAtom,
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) {
    let ContentKind::ParagraphMark { props_xml, .. } = &atom.content else {
        return;
    };
    // An untouched mark with no properties needs no pPr; a revised or
    // restyled mark needs one to carry the revision element.
    if props_xml.is_none() && atom.status == CorrelationStatus::Equal {
        return;
    }
    let ppr = match props_xml {
        Some(xml) => parse_fragment(xml)
            .ok()
            .and_then(|fragment| {
                fragment.root().map(|r| {
                    let imported = tree.import_subtree(&fragment, r);
                    tree.reparent(parent, imported);
                    imported
                })
            })
            .unwrap_or_else(|| tree.add_child(parent, XmlNode::element(W::pPr()))),
        None => tree.add_child(parent, XmlNode::element(W::pPr())),
    };
    match atom.status {
        CorrelationStatus::Deleted => tree.set_attribute(ppr, &BL::status(), STATUS_DELETED),
        CorrelationStatus::Inserted => tree.set_attribute(ppr, &BL::status(), STATUS_INSERTED),
        CorrelationStatus::FormatChanged if settings.track_formatting_changes => {
            emit_ppr_change(tree, ppr, atom, ctx);
        }
        _ => {}
    }
}

/// `w:pPrChange` carrying the old paragraph properties.
fn emit_ppr_change(
    tree: &mut XmlTree,
    ppr: NodeId,
    atom: &ComparisonUnitAtom,
    ctx: &mut ComparisonContext,
) {
    let change = tree.add_child(
        ppr,
        XmlNode::element_with_attrs(W::pPrChange(), revision_attrs(ctx)),
    );
    let old_xml = atom.before.as_ref().and_then(|b| match &b.content {
        ContentKind::ParagraphMark { props_xml, .. } => props_xml.clone(),
        _ => None,
    });
    match old_xml.and_then(|xml| parse_fragment(&xml).ok()) {
        Some(fragment) => {
            if let Some(r) = fragment.root() {
                let imported = tree.import_subtree(&fragment, r);
                tree.reparent(change, imported);
            }
        }
        None => {
            tree.add_child(change, XmlNode::element(W::pPr()));
        }
    }
}

/// `w:rPrChange` inside the run's `rPr`, carrying the old run properties.
fn emit_rpr_change(
    tree: &mut XmlTree,
    run: NodeId,
    changed: &ComparisonUnitAtom,
    ctx: &mut ComparisonContext,
) {
    let rpr = tree
        .child_named(run, &W::rPr())
        .unwrap_or_else(|| {
            let rpr = tree.new_node(XmlNode::element(W::rPr()));
            tree.reparent_first(run, rpr);
            rpr
        });
    let change = tree.add_child(
        rpr,
        XmlNode::element_with_attrs(W::rPrChange(), revision_attrs(ctx)),
    );
    let old_rpr_xml = changed
        .before
        .as_ref()
        .and_then(|b| b.ancestors.iter().rev().find(|a| a.name == W::r()).cloned())
        .and_then(|run_info| run_info.props.first().cloned());
    match old_rpr_xml.and_then(|xml| parse_fragment(&xml).ok()) {
        Some(fragment) => {
            if let Some(r) = fragment.root() {
                let imported = tree.import_subtree(&fragment, r);
                tree.reparent(change, imported);
            }
        }
        None => {
            tree.add_child(change, XmlNode::element(W::rPr()));
        }
    }
}

/// `w:id` first, then author, then date.
fn revision_attrs(ctx: &mut ComparisonContext) -> Vec<XAttribute> {
    let id = ctx.next_revision_id().to_string();
    vec![
        XAttribute::new(W::id(), &id),
        XAttribute::new(W::author(), &ctx.author),
        XAttribute::new(W::date(), &ctx.date),
    ]
}

/// Rewrites `ancestor_unids` so both sides agree on surviving containers:
/// Equal paragraph marks adopt the original's identity, then each mark's
/// chain propagates backward over the content of its paragraph.
pub fn assemble_ancestor_unids(atoms: &mut [ComparisonUnitAtom]) {
    // Phase 1: Equal paragraph marks (and all Equal atoms inside
    // textboxes) take the container identity of their counterpart.
    for atom in atoms.iter_mut() {
        let in_textbox = atom.is_in_textbox();
        let adopt = if atom.content.is_paragraph_mark() {
            in_textbox || atom.status == CorrelationStatus::Equal
        } else {
            in_textbox && atom.status == CorrelationStatus::Equal
        };
        if adopt {
            if let Some(before) = atom.before.as_deref() {
                if before.ancestors.len() == atom.ancestors.len() {
                    for (mine, theirs) in
                        atom.ancestors.iter_mut().zip(before.ancestors.iter())
                    {
                        mine.unid = theirs.unid.clone();
                    }
                }
            }
        }
    }

    // Phase 2: walk backward; every paragraph mark re-anchors the chain
    // for the atoms that precede it (the content of its paragraph).
    let mut current_chain: Vec<String> = Vec::new();
    for atom in atoms.iter_mut().rev() {
        if atom.content.is_paragraph_mark() && !atom.is_in_textbox() {
            current_chain = atom.ancestors.iter().map(|a| a.unid.clone()).collect();
            atom.ancestor_unids = current_chain.clone();
            continue;
        }
        let own_tail: Vec<String> = atom
            .ancestors
            .iter()
            .skip(current_chain.len())
            .map(|a| a.unid.clone())
            .collect();
        let mut unids = current_chain.clone();
        unids.extend(own_tail);
        atom.ancestor_unids = unids;
    }

    // Phase 2b: the same backward anchoring, restricted to textbox
    // paragraphs, which the pass above skipped.
    let mut chain: Vec<String> = Vec::new();
    let mut skipping = true;
    for atom in atoms.iter_mut().rev() {
        if atom.content.is_paragraph_mark() {
            if atom.is_in_textbox() {
                skipping = false;
                chain = atom.ancestors.iter().map(|a| a.unid.clone()).collect();
                atom.ancestor_unids = chain.clone();
            } else {
                skipping = true;
                chain.clear();
            }
            continue;
        }
        if skipping || !atom.is_in_textbox() {
            continue;
        }
        if atom.ancestors.len() < chain.len() {
            skipping = true;
            chain.clear();
            continue;
        }
        let own_tail: Vec<String> = atom
            .ancestors
            .iter()
            .skip(chain.len())
            .map(|a| a.unid.clone())
            .collect();
        let mut unids = chain.clone();
        unids.extend(own_tail);
        atom.ancestor_unids = unids;
    }
}

/// Cross-input textbox normalization: content that survives inside the
/// same textbox must agree on every container UNID up to (and including)
/// the textbox, or reconstruction splits the textbox apart.
pub fn normalize_textbox_unids(atoms: &mut [ComparisonUnitAtom]) {
    // Contiguous runs of atoms sharing a textbox depth.
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for (idx, atom) in atoms.iter().enumerate() {
        let depth = atom
            .ancestors
            .iter()
            .position(|a| a.name == W::txbxContent());
        match depth {
            Some(d) => match groups.last_mut() {
                Some((gd, indices))
                    if *gd == d && *indices.last().unwrap() + 1 == idx =>
                {
                    indices.push(idx)
                }
                _ => groups.push((d, vec![idx])),
            },
            None => {}
        }
    }

    for (textbox_depth, indices) in groups {
        let outer_ref = pick_reference(atoms, &indices, CorrelationStatus::Equal)
            .or_else(|| pick_reference(atoms, &indices, CorrelationStatus::Deleted))
            .or_else(|| indices.first().copied());
        let Some(outer_ref) = outer_ref else { continue };
        let outer_unids = atoms[outer_ref].ancestor_unids.clone();

        // Subdivide by paragraph: a paragraph mark closes each sub-group.
        let mut paragraphs: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        for &idx in &indices {
            current.push(idx);
            if atoms[idx].content.is_paragraph_mark() {
                paragraphs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }

        for para in paragraphs {
            let has_equal = para
                .iter()
                .any(|&i| atoms[i].status == CorrelationStatus::Equal);
            let has_revised = para.iter().any(|&i| {
                matches!(
                    atoms[i].status,
                    CorrelationStatus::Deleted | CorrelationStatus::Inserted
                )
            });
            let mixed = has_equal && has_revised;

            let para_ref = pick_reference(atoms, &para, CorrelationStatus::Equal)
                .or_else(|| pick_reference(atoms, &para, CorrelationStatus::Deleted))
                .or_else(|| para.first().copied());
            let Some(para_ref) = para_ref else { continue };
            let para_unids = atoms[para_ref].ancestor_unids.clone();

            let paragraph_level = textbox_depth + 1;
            let run_level = textbox_depth + 2;
            for &idx in &para {
                let limit = if mixed {
                    run_level + 1
                } else {
                    paragraph_level + 1
                };
                let levels = limit.min(atoms[idx].ancestor_unids.len());
                for level in 0..levels {
                    let replacement = if level <= textbox_depth {
                        outer_unids.get(level)
                    } else {
                        para_unids.get(level)
                    };
                    if let Some(replacement) = replacement {
                        atoms[idx].ancestor_unids[level] = replacement.clone();
                        if let Some(a) = atoms[idx].ancestors.get_mut(level) {
                            a.unid = replacement.clone();
                        }
                    }
                }
            }
        }
    }
}

fn pick_reference(
    atoms: &[ComparisonUnitAtom],
    candidates: &[usize],
    want: CorrelationStatus,
) -> Option<usize> {
    candidates.iter().copied().find(|&i| atoms[i].status == want)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::CanonicalOptions;
    use crate::wml::atoms::{atomize, PartKind};
    use crate::wml::context::UnidAllocator;
    use crate::wml::preprocess::assign_unids;
    use crate::xml::parser::parse;
    use crate::xml::writer::serialize;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn atoms_with_status(body: &str, status: CorrelationStatus) -> Vec<ComparisonUnitAtom> {
        let mut tree = parse(body).unwrap();
        let root = tree.root().unwrap();
        let mut unids = UnidAllocator::new();
        assign_unids(&mut tree, root, &mut unids);
        let mut atoms = atomize(
            &tree,
            root,
            PartKind::MainDocument,
            &CanonicalOptions::default(),
            None,
        );
        for atom in &mut atoms {
            atom.status = status;
        }
        atoms
    }

    fn rebuild(atoms: &[ComparisonUnitAtom]) -> String {
        let mut ctx = ComparisonContext::new("T".into(), "2024-01-01T00:00:00Z".into(), 1);
        let result = coalesce(
            atoms,
            W::body(),
            Vec::new(),
            &mut ctx,
            &CompareSettings::default(),
        );
        serialize(&result.tree).unwrap()
    }

    #[test]
    fn leaf_text_is_concatenated_characters() {
        let mut atoms = atoms_with_status(
            &format!(r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>abc</w:t></w:r></w:p></w:body>"#),
            CorrelationStatus::Equal,
        );
        assemble_ancestor_unids(&mut atoms);
        let xml = rebuild(&atoms);
        assert!(xml.contains("<w:t>abc</w:t>"), "got: {xml}");
    }

    #[test]
    fn deleted_text_becomes_del_text() {
        let mut atoms = atoms_with_status(
            &format!(r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>gone</w:t></w:r></w:p></w:body>"#),
            CorrelationStatus::Deleted,
        );
        assemble_ancestor_unids(&mut atoms);
        let xml = rebuild(&atoms);
        assert!(xml.contains("delText"));
        assert!(xml.contains("gone"));
    }

    #[test]
    fn leading_whitespace_gets_space_preserve() {
        let mut atoms = atoms_with_status(
            &format!(
                r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t xml:space="preserve"> x</w:t></w:r></w:p></w:body>"#
            ),
            CorrelationStatus::Equal,
        );
        assemble_ancestor_unids(&mut atoms);
        let xml = rebuild(&atoms);
        assert!(xml.contains(r#"xml:space="preserve""#));
    }

    #[test]
    fn run_properties_are_preserved() {
        let mut atoms = atoms_with_status(
            &format!(
                r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:rPr><w:b/></w:rPr><w:t>x</w:t></w:r></w:p></w:body>"#
            ),
            CorrelationStatus::Equal,
        );
        assemble_ancestor_unids(&mut atoms);
        let xml = rebuild(&atoms);
        assert!(xml.contains("<w:rPr><w:b/></w:rPr>"), "got: {xml}");
    }

    #[test]
    fn table_structure_is_rebuilt_with_properties() {
        let mut atoms = atoms_with_status(
            &format!(
                r#"<w:body xmlns:w="{W_NS}"><w:tbl><w:tblPr><w:tblW w:w="0"/></w:tblPr><w:tr><w:tc><w:tcPr><w:tcW w:w="100"/></w:tcPr><w:p><w:r><w:t>c</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body>"#
            ),
            CorrelationStatus::Equal,
        );
        assemble_ancestor_unids(&mut atoms);
        let xml = rebuild(&atoms);
        assert!(xml.contains("<w:tbl>"));
        assert!(xml.contains("<w:tblW w:w=\"0\"/>"));
        assert!(xml.contains("<w:tcW w:w=\"100\"/>"));
        assert!(xml.contains("<w:t>c</w:t>"));
    }

    #[test]
    fn mixed_statuses_split_into_separate_runs() {
        let body = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>abcd</w:t></w:r></w:p></w:body>"#
        );
        let mut atoms = atoms_with_status(&body, CorrelationStatus::Equal);
        // Last two characters inserted, first two equal.
        for atom in atoms.iter_mut() {
            if matches!(atom.content, ContentKind::Text(c) if c == 'c' || c == 'd') {
                atom.status = CorrelationStatus::Inserted;
            }
        }
        assemble_ancestor_unids(&mut atoms);
        let xml = rebuild(&atoms);
        assert!(xml.contains("<w:t>ab</w:t>"), "got: {xml}");
        assert!(xml.contains(">cd</w:t>"), "got: {xml}");
    }

    #[test]
    fn wholly_inserted_row_is_status_tagged() {
        let mut atoms = atoms_with_status(
            &format!(
                r#"<w:body xmlns:w="{W_NS}"><w:tbl><w:tr><w:tc><w:p><w:r><w:t>n</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body>"#
            ),
            CorrelationStatus::Inserted,
        );
        assemble_ancestor_unids(&mut atoms);
        let xml = rebuild(&atoms);
        assert!(xml.contains("bl:status=\"Inserted\""), "got: {xml}");
    }
}
