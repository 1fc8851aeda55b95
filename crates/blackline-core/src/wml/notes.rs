//! Per-reference footnote and endnote comparison.
//!
//! Notes are not compared part-against-part: two unrelated notes can share
//! surrounding text and a whole-part diff conflates them. Instead, every
//! reference that survives in the main document drives a full comparison
//! of exactly the note it points to; references only in the original
//! delete their note, references only in the modified insert theirs.

use crate::error::Result;
use crate::wml::atoms::{atomize, ComparisonUnitAtom, ContentKind, CorrelationStatus, PartKind};
use crate::wml::coalesce::{assemble_ancestor_unids, coalesce, normalize_textbox_unids};
use crate::wml::context::ComparisonContext;
use crate::wml::correlate::{correlate, flatten_to_atoms};
use crate::wml::document::find_note_by_id;
use crate::wml::formatting::detect_format_changes;
use crate::wml::order::order_elements_per_schema;
use crate::wml::preprocess::preprocess;
use crate::wml::revisions::{mark_revisions, merge_adjacent_revisions, strip_bookkeeping};
use crate::wml::settings::CompareSettings;
use crate::wml::units::build_units;
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::W;
use crate::xml::node::XmlNode;
use crate::xml::xname::{XAttribute, XName};
use indextree::NodeId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    pub fn part_kind(self) -> PartKind {
        match self {
            Self::Footnote => PartKind::Footnotes,
            Self::Endnote => PartKind::Endnotes,
        }
    }

    fn reference_mark(self) -> XName {
        match self {
            Self::Footnote => W::footnoteRef(),
            Self::Endnote => W::endnoteRef(),
        }
    }

    fn reference_style(self) -> &'static str {
        match self {
            Self::Footnote => "FootnoteReference",
            Self::Endnote => "EndnoteReference",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NoteReference {
    pub before_id: Option<String>,
    pub after_id: Option<String>,
    pub status: CorrelationStatus,
}

/// Collects note references from the correlated main-document atoms.
pub fn collect_note_references(
    atoms: &[ComparisonUnitAtom],
    kind: NoteKind,
) -> Vec<NoteReference> {
    let id_of = |content: &ContentKind| match (kind, content) {
        (NoteKind::Footnote, ContentKind::FootnoteReference { id }) => Some(id.clone()),
        (NoteKind::Endnote, ContentKind::EndnoteReference { id }) => Some(id.clone()),
        _ => None,
    };

    let mut references = Vec::new();
    for atom in atoms {
        let Some(id) = id_of(&atom.content) else { continue };
        let reference = match atom.status {
            CorrelationStatus::Deleted => NoteReference {
                before_id: Some(id),
                after_id: None,
                status: CorrelationStatus::Deleted,
            },
            CorrelationStatus::Inserted => NoteReference {
                before_id: None,
                after_id: Some(id),
                status: CorrelationStatus::Inserted,
            },
            _ => NoteReference {
                before_id: atom
                    .before
                    .as_ref()
                    .and_then(|b| id_of(&b.content))
                    .or_else(|| Some(id.clone())),
                after_id: Some(id),
                status: CorrelationStatus::Equal,
            },
        };
        references.push(reference);
    }

    // One comparison per note pair; a repeated reference keeps its
    // strongest status (Equal over Inserted over Deleted).
    let rank = |status: CorrelationStatus| match status {
        CorrelationStatus::Equal => 3,
        CorrelationStatus::Inserted => 2,
        CorrelationStatus::Deleted => 1,
        _ => 0,
    };
    let mut seen: HashMap<(Option<String>, Option<String>), NoteReference> = HashMap::new();
    let mut order: Vec<(Option<String>, Option<String>)> = Vec::new();
    for reference in references {
        let key = (reference.before_id.clone(), reference.after_id.clone());
        match seen.get_mut(&key) {
            Some(existing) => {
                if rank(reference.status) > rank(existing.status) {
                    *existing = reference;
                }
            }
            None => {
                order.push(key.clone());
                seen.insert(key, reference);
            }
        }
    }
    order.into_iter().filter_map(|key| seen.remove(&key)).collect()
}

/// Compares the referenced notes and produces the output notes part.
/// Returns `None` when there is nothing to write.
pub fn process_note_part(
    kind: NoteKind,
    original: Option<&XmlTree>,
    modified: Option<&XmlTree>,
    references: &[NoteReference],
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) -> Result<Option<XmlTree>> {
    if references.is_empty() || (original.is_none() && modified.is_none()) {
        return Ok(None);
    }

    // The modified part is the base for the output; deleted notes are
    // grafted back in from the original.
    let mut result = match modified.or(original) {
        Some(tree) => clone_tree(tree),
        None => return Ok(None),
    };
    let Some(result_root) = result.root() else {
        return Ok(None);
    };

    for reference in references {
        // Separator and continuation notes are boilerplate.
        let skip = |id: &Option<String>| {
            matches!(id.as_deref(), Some("0") | Some("-1") | None)
        };
        match reference.status {
            CorrelationStatus::Equal => {
                if skip(&reference.before_id) || skip(&reference.after_id) {
                    continue;
                }
                let (Some(doc1), Some(doc2)) = (original, modified) else { continue };
                let before_id = reference.before_id.as_deref().unwrap();
                let after_id = reference.after_id.as_deref().unwrap();
                let rebuilt =
                    compare_single_note(kind, doc1, before_id, doc2, after_id, ctx, settings)?;
                if let Some(rebuilt) = rebuilt {
                    install_note(&mut result, result_root, after_id, &rebuilt, kind);
                }
            }
            CorrelationStatus::Inserted => {
                if skip(&reference.after_id) {
                    continue;
                }
                let Some(doc2) = modified else { continue };
                let after_id = reference.after_id.as_deref().unwrap();
                let rebuilt = rebuild_single_status_note(
                    kind,
                    doc2,
                    after_id,
                    CorrelationStatus::Inserted,
                    ctx,
                    settings,
                )?;
                if let Some(rebuilt) = rebuilt {
                    install_note(&mut result, result_root, after_id, &rebuilt, kind);
                }
            }
            CorrelationStatus::Deleted => {
                if skip(&reference.before_id) {
                    continue;
                }
                let Some(doc1) = original else { continue };
                let before_id = reference.before_id.as_deref().unwrap();
                let rebuilt = rebuild_single_status_note(
                    kind,
                    doc1,
                    before_id,
                    CorrelationStatus::Deleted,
                    ctx,
                    settings,
                )?;
                if let Some(rebuilt) = rebuilt {
                    install_note(&mut result, result_root, before_id, &rebuilt, kind);
                }
            }
            _ => {}
        }
    }

    strip_bookkeeping(&mut result, result_root);
    Ok(Some(result))
}

fn clone_tree(tree: &XmlTree) -> XmlTree {
    let mut cloned = XmlTree::new();
    if let Some(root) = tree.root() {
        let imported = cloned.import_subtree(tree, root);
        cloned.set_root(Some(imported));
    }
    cloned
}

/// Runs the whole pipeline on one note present in both inputs.
fn compare_single_note(
    kind: NoteKind,
    doc1: &XmlTree,
    before_id: &str,
    doc2: &XmlTree,
    after_id: &str,
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) -> Result<Option<XmlTree>> {
    let Some((mut tree1, note1)) = extract_note(doc1, before_id) else {
        return Ok(None);
    };
    let Some((mut tree2, note2)) = extract_note(doc2, after_id) else {
        return Ok(None);
    };

    let canonical = settings.canonical_options();
    preprocess(&mut tree1, note1, &mut ctx.unids, &canonical)?;
    preprocess(&mut tree2, note2, &mut ctx.unids, &canonical)?;

    let atoms1 = atomize(&tree1, note1, kind.part_kind(), &canonical, None);
    let atoms2 = atomize(&tree2, note2, kind.part_kind(), &canonical, None);
    let units1 = build_units(atoms1, settings);
    let units2 = build_units(atoms2, settings);
    let sequences = correlate(units1, units2, settings);
    let mut atoms = flatten_to_atoms(&sequences)?;
    if settings.track_formatting_changes {
        detect_format_changes(&mut atoms);
    }
    assemble_ancestor_unids(&mut atoms);
    normalize_textbox_unids(&mut atoms);

    finish_note(&tree2, note2, &atoms, kind, ctx, settings).map(Some)
}

/// Rebuilds one note with every atom carrying the same status.
fn rebuild_single_status_note(
    kind: NoteKind,
    doc: &XmlTree,
    id: &str,
    status: CorrelationStatus,
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) -> Result<Option<XmlTree>> {
    let Some((mut tree, note)) = extract_note(doc, id) else {
        return Ok(None);
    };
    let canonical = settings.canonical_options();
    preprocess(&mut tree, note, &mut ctx.unids, &canonical)?;
    let mut atoms = atomize(&tree, note, kind.part_kind(), &canonical, None);
    for atom in &mut atoms {
        atom.status = status;
    }
    assemble_ancestor_unids(&mut atoms);
    normalize_textbox_unids(&mut atoms);

    finish_note(&tree, note, &atoms, kind, ctx, settings).map(Some)
}

fn finish_note(
    source: &XmlTree,
    note: NodeId,
    atoms: &[ComparisonUnitAtom],
    kind: NoteKind,
    ctx: &mut ComparisonContext,
    settings: &CompareSettings,
) -> Result<XmlTree> {
    let name = source.name(note).cloned().unwrap_or_else(|| W::footnote());
    let attrs: Vec<XAttribute> = source
        .get(note)
        .and_then(|n| n.attributes())
        .map(|a| a.to_vec())
        .unwrap_or_default();
    let mut rebuilt = coalesce(atoms, name, attrs, ctx, settings);
    mark_revisions(&mut rebuilt.tree, rebuilt.root, ctx)?;
    merge_adjacent_revisions(&mut rebuilt.tree, rebuilt.root);
    ensure_reference_mark_run(&mut rebuilt.tree, rebuilt.root, kind);
    order_elements_per_schema(&mut rebuilt.tree, rebuilt.root);
    strip_bookkeeping(&mut rebuilt.tree, rebuilt.root);
    Ok(rebuilt.tree)
}

/// Clones the part and locates the note with the given id.
fn extract_note(doc: &XmlTree, id: &str) -> Option<(XmlTree, NodeId)> {
    let cloned = clone_tree(doc);
    let root = cloned.root()?;
    let note = find_note_by_id(&cloned, root, id)?;
    Some((cloned, note))
}

/// Replaces the note's children in the result part, appending the note
/// element itself when the base part does not carry it (deleted notes).
fn install_note(
    result: &mut XmlTree,
    result_root: NodeId,
    id: &str,
    rebuilt: &XmlTree,
    _kind: NoteKind,
) {
    let Some(rebuilt_root) = rebuilt.root() else { return };
    let target = match find_note_by_id(result, result_root, id) {
        Some(existing) => existing,
        None => {
            let imported = result.import_subtree(rebuilt, rebuilt_root);
            result.reparent(result_root, imported);
            return;
        }
    };
    let old_children: Vec<NodeId> = result.children(target).collect();
    for child in old_children {
        result.remove(child);
    }
    let new_children: Vec<NodeId> = rebuilt.children(rebuilt_root).collect();
    for child in new_children {
        let imported = result.import_subtree(rebuilt, child);
        result.reparent(target, imported);
    }
}

/// Atomization drops the note's reference-mark run (it is boilerplate,
/// not content); Word expects it back at the head of the first paragraph.
fn ensure_reference_mark_run(tree: &mut XmlTree, root: NodeId, kind: NoteKind) {
    let mark = kind.reference_mark();
    let already_present = tree.descendants(root).any(|n| tree.is_named(n, &mark));
    if already_present {
        return;
    }
    let Some(first_para) = tree.descendants(root).find(|&n| tree.is_named(n, &W::p())) else {
        return;
    };
    let run = tree.new_node(XmlNode::element(W::r()));
    let rpr = tree.add_child(run, XmlNode::element(W::rPr()));
    tree.add_child(
        rpr,
        XmlNode::element_with_attrs(
            W::rStyle(),
            vec![XAttribute::new(W::val(), kind.reference_style())],
        ),
    );
    tree.add_child(run, XmlNode::element(mark));
    // After the pPr when present, otherwise first.
    match tree.child_named(first_para, &W::pPr()) {
        Some(ppr) => tree.insert_after(ppr, run),
        None => tree.reparent_first(first_para, run),
    }
}
