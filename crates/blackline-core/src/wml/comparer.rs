//! Comparison orchestration.
//!
//! Pipeline per part: preprocess both inputs, atomize, group into units,
//! correlate, flatten, reconstruct, mark revisions, merge adjacent
//! markup, re-order to schema, renumber ids. Footnotes and endnotes run
//! the same pipeline per surviving reference. The revision-id counter and
//! the UNID allocator live in a per-call context, so concurrent
//! comparisons never share state and identical inputs produce identical
//! output.

use crate::error::Result;
use crate::package::OpcPackage;
use crate::wml::accept;
use crate::wml::atoms::{atomize, ComparisonUnitAtom, PartKind};
use crate::wml::coalesce::{assemble_ancestor_unids, coalesce, normalize_textbox_unids};
use crate::wml::context::ComparisonContext;
use crate::wml::correlate::{correlate, flatten_to_atoms};
use crate::wml::document::{
    find_body, require_body, WmlDocument, ENDNOTES_PART, FOOTNOTES_PART, MAIN_PART,
};
use crate::wml::formatting::detect_format_changes;
use crate::wml::notes::{collect_note_references, process_note_part, NoteKind};
use crate::wml::order::order_elements_per_schema;
use crate::wml::preprocess::preprocess;
use crate::wml::revisions::{
    extract_revisions, fix_up_ids, mark_revisions, merge_adjacent_revisions, strip_bookkeeping,
    Revision,
};
use crate::wml::settings::CompareSettings;
use crate::wml::units::build_units;
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::{R, W};
use crate::xml::node::XmlNode;
use chrono::Utc;
use indextree::NodeId;

/// Compares two documents and produces a third whose body carries the
/// tracked changes that turn `original` into `modified`.
pub fn compare(
    original: &WmlDocument,
    modified: &WmlDocument,
    settings: &CompareSettings,
) -> Result<WmlDocument> {
    let (author, date) = resolve_revision_metadata(settings, modified);
    let mut ctx = ComparisonContext::new(author, date, 1);
    let canonical = settings.canonical_options();

    let mut doc1 = original.main_part()?;
    let mut doc2 = modified.main_part()?;
    let body1 = require_body(&doc1)?;
    let body2 = require_body(&doc2)?;

    // Section properties come from the original and are re-installed
    // after reconstruction; they never participate in correlation.
    let saved_body_sect_pr = extract_body_sect_pr(&doc1, body1);
    let saved_ppr_sect_pr = extract_last_paragraph_sect_pr(&doc1, body1);
    strip_section_properties(&mut doc1, body1);
    strip_section_properties(&mut doc2, body2);

    preprocess(&mut doc1, body1, &mut ctx.unids, &canonical)?;
    preprocess(&mut doc2, body2, &mut ctx.unids, &canonical)?;

    let atoms1 = atomize(
        &doc1,
        body1,
        PartKind::MainDocument,
        &canonical,
        Some(original.package()),
    );
    let atoms2 = atomize(
        &doc2,
        body2,
        PartKind::MainDocument,
        &canonical,
        Some(modified.package()),
    );

    let units1 = build_units(atoms1, settings);
    let units2 = build_units(atoms2, settings);
    let sequences = correlate(units1, units2, settings);
    let mut atoms = flatten_to_atoms(&sequences)?;
    if settings.track_formatting_changes {
        detect_format_changes(&mut atoms);
    }
    assemble_ancestor_unids(&mut atoms);
    normalize_textbox_unids(&mut atoms);

    let root_name = doc2
        .root()
        .and_then(|r| doc2.name(r).cloned())
        .unwrap_or_else(W::document);
    let root_attrs = doc2
        .root()
        .and_then(|r| doc2.get(r))
        .and_then(|n| n.attributes())
        .map(|a| a.to_vec())
        .unwrap_or_default();

    let mut rebuilt = coalesce(&atoms, root_name, root_attrs, &mut ctx, settings);
    mark_revisions(&mut rebuilt.tree, rebuilt.root, &mut ctx)?;
    merge_adjacent_revisions(&mut rebuilt.tree, rebuilt.root);

    // Assemble the result package on top of the modified input.
    let mut result_package = OpcPackage::open(&modified.to_bytes()?)?;

    restore_section_properties(
        &mut rebuilt.tree,
        saved_body_sect_pr.as_ref(),
        saved_ppr_sect_pr.as_ref(),
    );
    fix_header_footer_references(&mut rebuilt.tree, &result_package);
    order_elements_per_schema(&mut rebuilt.tree, rebuilt.root);
    fix_up_ids(&mut rebuilt.tree, rebuilt.root, &mut ctx);
    strip_bookkeeping(&mut rebuilt.tree, rebuilt.root);
    result_package.set_xml_part(MAIN_PART, &rebuilt.tree)?;

    // Auxiliary parts, one comparison per surviving reference.
    ctx.ensure_revision_id_at_least(settings.starting_id_for_footnotes_endnotes);
    process_notes(
        original,
        modified,
        &atoms,
        &mut result_package,
        &mut ctx,
        settings,
    )?;

    Ok(WmlDocument::from_package(result_package))
}

/// Reads the revisions present in a compared document: the main part,
/// then footnotes, then endnotes.
pub fn get_revisions(
    compared: &WmlDocument,
    _settings: &CompareSettings,
) -> Result<Vec<Revision>> {
    let main = compared.main_part()?;
    let body = require_body(&main)?;
    let mut revisions = extract_revisions(&main, body);

    for part in [compared.footnotes_part()?, compared.endnotes_part()?]
        .into_iter()
        .flatten()
    {
        if let Some(root) = part.root() {
            revisions.extend(extract_revisions(&part, root));
        }
    }
    Ok(revisions)
}

/// Accepts every revision in the document, yielding its "modified" state.
pub fn accept_revisions(document: &WmlDocument) -> Result<WmlDocument> {
    resolve_document(document, accept::accept_revisions)
}

/// Rejects every revision in the document, yielding its "original" state.
pub fn reject_revisions(document: &WmlDocument) -> Result<WmlDocument> {
    resolve_document(document, accept::reject_revisions)
}

fn resolve_document(
    document: &WmlDocument,
    resolve: fn(&mut XmlTree, NodeId),
) -> Result<WmlDocument> {
    let mut package = OpcPackage::open(&document.to_bytes()?)?;
    for part in [MAIN_PART, FOOTNOTES_PART, ENDNOTES_PART] {
        if !package.has_part(part) {
            continue;
        }
        let mut tree = package.xml_part(part)?;
        if let Some(root) = tree.root() {
            resolve(&mut tree, root);
        }
        package.set_xml_part(part, &tree)?;
    }
    Ok(WmlDocument::from_package(package))
}

/// Author and date for every revision element: explicit settings first,
/// then the modified document's core properties, then fixed fallbacks.
fn resolve_revision_metadata(
    settings: &CompareSettings,
    modified: &WmlDocument,
) -> (String, String) {
    let props = modified.package().core_properties();
    let author = settings
        .author_for_revisions
        .clone()
        .or(props.last_modified_by)
        .or(props.creator)
        .unwrap_or_else(|| "Redline".to_string());
    let date = settings
        .date_time_for_revisions
        .map(|d| d.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .or(props.modified)
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
    (author, date)
}

fn clone_subtree_as_tree(source: &XmlTree, node: NodeId) -> XmlTree {
    let mut tree = XmlTree::new();
    let imported = tree.import_subtree(source, node);
    tree.set_root(Some(imported));
    tree
}

fn extract_body_sect_pr(tree: &XmlTree, body: NodeId) -> Option<XmlTree> {
    tree.child_named(body, &W::sectPr())
        .map(|sect_pr| clone_subtree_as_tree(tree, sect_pr))
}

/// The last paragraph's `pPr/sectPr` carries the main section's header
/// and footer references.
fn extract_last_paragraph_sect_pr(tree: &XmlTree, body: NodeId) -> Option<XmlTree> {
    let mut found = None;
    for p in tree.children_named(body, &W::p()) {
        if let Some(ppr) = tree.child_named(p, &W::pPr()) {
            if let Some(sect_pr) = tree.child_named(ppr, &W::sectPr()) {
                found = Some(sect_pr);
            }
        }
    }
    found.map(|sect_pr| clone_subtree_as_tree(tree, sect_pr))
}

fn strip_section_properties(tree: &mut XmlTree, body: NodeId) {
    let sect_prs: Vec<NodeId> = tree
        .descendants(body)
        .filter(|&n| tree.is_named(n, &W::sectPr()))
        .collect();
    for sect_pr in sect_prs {
        tree.remove(sect_pr);
    }
}

fn restore_section_properties(
    tree: &mut XmlTree,
    body_sect_pr: Option<&XmlTree>,
    ppr_sect_pr: Option<&XmlTree>,
) {
    let Some(body) = find_body(tree) else { return };

    if let Some(saved) = body_sect_pr {
        if let Some(saved_root) = saved.root() {
            let imported = tree.import_subtree(saved, saved_root);
            tree.reparent(body, imported);
        }
    }

    if let Some(saved) = ppr_sect_pr {
        let last_p = tree.children_named(body, &W::p()).last();
        let Some(last_p) = last_p else { return };
        let ppr = tree.child_named(last_p, &W::pPr()).unwrap_or_else(|| {
            let ppr = tree.new_node(XmlNode::element(W::pPr()));
            tree.reparent_first(last_p, ppr);
            ppr
        });
        if let Some(saved_root) = saved.root() {
            let imported = tree.import_subtree(saved, saved_root);
            tree.reparent(ppr, imported);
        }
    }
}

/// The restored section properties reference header/footer parts by the
/// original package's relationship ids; point them at the result
/// package's relationships instead.
fn fix_header_footer_references(tree: &mut XmlTree, package: &OpcPackage) {
    let Ok(rels) = package.xml_part("word/_rels/document.xml.rels") else {
        return;
    };
    let Some(rels_root) = rels.root() else { return };

    let find_rel_for = |prefix: &str| -> Option<String> {
        for node in rels.descendants(rels_root) {
            let Some(data) = rels.get(node) else { continue };
            if data.name().map(|n| n.local.as_str()) != Some("Relationship") {
                continue;
            }
            let target = data.attribute(&crate::xml::xname::XName::local("Target"));
            if target.map(|t| t.starts_with(prefix)).unwrap_or(false) {
                return data
                    .attribute(&crate::xml::xname::XName::local("Id"))
                    .map(|s| s.to_string());
            }
        }
        None
    };
    let header_rel = find_rel_for("header");
    let footer_rel = find_rel_for("footer");

    let Some(root) = tree.root() else { return };
    let targets: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&n| {
            tree.name(n)
                .map(|x| x.local == "headerReference" || x.local == "footerReference")
                .unwrap_or(false)
        })
        .collect();
    for node in targets {
        let is_header = tree
            .name(node)
            .map(|x| x.local == "headerReference")
            .unwrap_or(false);
        let replacement = if is_header { &header_rel } else { &footer_rel };
        if let Some(rel_id) = replacement {
            tree.set_attribute(node, &R::id(), rel_id);
        }
    }
}

fn process_notes(
    original: &WmlDocument,
    modified: &WmlDocument,
    atoms: &[ComparisonUnitAtom],
    result_package: &mut OpcPackage,
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) -> Result<()> {
    let footnotes1 = original.footnotes_part()?;
    let footnotes2 = modified.footnotes_part()?;
    let footnote_refs = collect_note_references(atoms, NoteKind::Footnote);
    if let Some(result) = process_note_part(
        NoteKind::Footnote,
        footnotes1.as_ref(),
        footnotes2.as_ref(),
        &footnote_refs,
        ctx,
        settings,
    )? {
        result_package.set_xml_part(FOOTNOTES_PART, &result)?;
    }

    let endnotes1 = original.endnotes_part()?;
    let endnotes2 = modified.endnotes_part()?;
    let endnote_refs = collect_note_references(atoms, NoteKind::Endnote);
    if let Some(result) = process_note_part(
        NoteKind::Endnote,
        endnotes1.as_ref(),
        endnotes2.as_ref(),
        &endnote_refs,
        ctx,
        settings,
    )? {
        result_package.set_xml_part(ENDNOTES_PART, &result)?;
    }
    Ok(())
}
