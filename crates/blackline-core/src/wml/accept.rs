//! Revision resolution: accept or reject tracked changes in place.
//!
//! Acceptance turns a document into its "current text" state and is the
//! first preprocessing step of a comparison. Both directions also back the
//! round-trip laws: accepting everything in a comparison result yields the
//! modified input, rejecting everything yields the original.

use crate::xml::arena::XmlTree;
use crate::xml::namespaces::{W, W14};
use crate::xml::node::XmlNode;
use indextree::NodeId;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Property-change markers dropped when the new state wins (accept) and
/// restored from when the old state wins (reject).
static PROPERTY_CHANGE_MARKERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "pPrChange",
        "rPrChange",
        "sectPrChange",
        "tblPrChange",
        "tblGridChange",
        "tcPrChange",
        "trPrChange",
        "tblPrExChange",
        "numberingChange",
    ]
    .into_iter()
    .collect()
});

static RANGE_MARKERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "moveFromRangeStart",
        "moveFromRangeEnd",
        "moveToRangeStart",
        "moveToRangeEnd",
        "customXmlInsRangeStart",
        "customXmlInsRangeEnd",
        "customXmlDelRangeStart",
        "customXmlDelRangeEnd",
        "customXmlMoveFromRangeStart",
        "customXmlMoveFromRangeEnd",
        "customXmlMoveToRangeStart",
        "customXmlMoveToRangeEnd",
    ]
    .into_iter()
    .collect()
});

/// Accepts every tracked change under `root`.
pub fn accept_revisions(tree: &mut XmlTree, root: NodeId) {
    resolve_revisions(tree, root, Direction::Accept);
}

/// Rejects every tracked change under `root`.
pub fn reject_revisions(tree: &mut XmlTree, root: NodeId) {
    resolve_revisions(tree, root, Direction::Reject);
}

#[derive(Clone, Copy, PartialEq)]
enum Direction {
    Accept,
    Reject,
}

fn resolve_revisions(tree: &mut XmlTree, root: NodeId, direction: Direction) {
    let unmerged_paragraphs = resolve_paragraph_marks(tree, root, direction);
    resolve_rows_and_cells(tree, root, direction);

    // Loser wrappers disappear with their content, winner wrappers unwrap.
    let (losers, winners): (&[&str], &[&str]) = match direction {
        Direction::Accept => (&["del", "moveFrom"], &["ins", "moveTo"]),
        Direction::Reject => (&["ins", "moveTo"], &["del", "moveFrom"]),
    };

    let mut to_remove: Vec<NodeId> = Vec::new();
    let mut to_unwrap: Vec<NodeId> = Vec::new();
    let mut change_markers: Vec<NodeId> = Vec::new();

    for node in tree.descendants(root) {
        let Some(name) = tree.name(node) else { continue };
        if name.namespace.as_deref() != Some(W::NS) {
            continue;
        }
        let local = name.local.as_str();
        if losers.contains(&local) {
            to_remove.push(node);
        } else if winners.contains(&local) {
            to_unwrap.push(node);
        } else if RANGE_MARKERS.contains(local) {
            to_remove.push(node);
        } else if PROPERTY_CHANGE_MARKERS.contains(local) {
            change_markers.push(node);
        }
    }

    // A wrapper inside a removed wrapper is already gone; re-check liveness.
    for node in to_remove {
        if tree.get(node).is_some() {
            tree.remove(node);
        }
    }
    for node in to_unwrap {
        if tree.get(node).is_some() {
            unwrap_in_place(tree, node);
        }
    }
    for node in change_markers {
        if tree.get(node).is_none() {
            continue;
        }
        match direction {
            Direction::Accept => tree.remove(node),
            Direction::Reject => restore_property_change(tree, node),
        }
    }

    if direction == Direction::Reject {
        rename_deleted_text(tree, root);
    }

    // A paragraph whose mark lost with no paragraph to merge into (end of
    // body or cell) disappears once resolving emptied it.
    for p in unmerged_paragraphs {
        if tree.get(p).is_none() {
            continue;
        }
        let empty = tree
            .children(p)
            .all(|c| tree.is_named(c, &W::pPr()));
        if empty {
            tree.remove(p);
        }
    }

    strip_revision_save_ids(tree, root);
}

/// Handles `pPr/rPr/ins|del` paragraph-mark revisions. A resolved-away
/// paragraph mark joins the paragraph with the following one; paragraphs
/// with nowhere to merge are returned for end-of-pass cleanup.
fn resolve_paragraph_marks(
    tree: &mut XmlTree,
    root: NodeId,
    direction: Direction,
) -> Vec<NodeId> {
    let loser = match direction {
        Direction::Accept => "del",
        Direction::Reject => "ins",
    };
    let mut unmerged = Vec::new();
    let paragraphs: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&n| tree.is_named(n, &W::p()))
        .collect();

    for p in paragraphs {
        if tree.get(p).is_none() {
            continue;
        }
        let Some(ppr) = tree.child_named(p, &W::pPr()) else { continue };
        let Some(rpr) = tree.child_named(ppr, &W::rPr()) else { continue };
        let marker = tree
            .children(rpr)
            .find(|&c| tree.is_named(c, &W::ins()) || tree.is_named(c, &W::del()));
        let Some(marker) = marker else { continue };
        let marker_local = tree.name(marker).map(|n| n.local.clone()).unwrap_or_default();

        tree.remove(marker);
        if marker_local != loser {
            continue;
        }

        // The mark loses: merge this paragraph into the immediately
        // following paragraph. No merge across tables or at the body end.
        let next_p = tree
            .next_sibling(p)
            .filter(|&s| tree.is_named(s, &W::p()));
        let Some(next_p) = next_p else {
            unmerged.push(p);
            continue;
        };

        let moved: Vec<NodeId> = tree
            .children(p)
            .filter(|&c| !tree.is_named(c, &W::pPr()))
            .collect();
        let anchor = tree.child_named(next_p, &W::pPr());
        let mut previous: Option<NodeId> = anchor;
        for child in moved {
            tree.detach(child);
            match previous {
                Some(prev) => tree.insert_after(prev, child),
                None => tree.reparent_first(next_p, child),
            }
            previous = Some(child);
        }
        tree.remove(p);
    }
    unmerged
}

/// Handles `trPr/ins|del` and `tcPr/cellIns|cellDel` property revisions.
fn resolve_rows_and_cells(tree: &mut XmlTree, root: NodeId, direction: Direction) {
    let mut containers_to_remove: Vec<NodeId> = Vec::new();
    let mut markers_to_remove: Vec<NodeId> = Vec::new();

    for node in tree.descendants(root) {
        if tree.is_named(node, &W::tr()) {
            if let Some(marker) = row_marker(tree, node) {
                let local = tree.name(marker).map(|n| n.local.clone()).unwrap_or_default();
                let loses = match direction {
                    Direction::Accept => local == "del",
                    Direction::Reject => local == "ins",
                };
                if loses {
                    containers_to_remove.push(node);
                } else {
                    markers_to_remove.push(marker);
                }
            }
        } else if tree.is_named(node, &W::tc()) {
            if let Some(marker) = cell_marker(tree, node) {
                let local = tree.name(marker).map(|n| n.local.clone()).unwrap_or_default();
                let loses = match direction {
                    Direction::Accept => local == "cellDel",
                    Direction::Reject => local == "cellIns",
                };
                if loses {
                    containers_to_remove.push(node);
                } else {
                    markers_to_remove.push(marker);
                }
            }
        }
    }

    for marker in markers_to_remove {
        if tree.get(marker).is_some() {
            tree.remove(marker);
        }
    }
    for container in containers_to_remove {
        if tree.get(container).is_some() {
            tree.remove(container);
        }
    }
}

fn row_marker(tree: &XmlTree, tr: NodeId) -> Option<NodeId> {
    let trpr = tree.child_named(tr, &W::trPr())?;
    tree.children(trpr)
        .find(|&c| tree.is_named(c, &W::ins()) || tree.is_named(c, &W::del()))
}

fn cell_marker(tree: &XmlTree, tc: NodeId) -> Option<NodeId> {
    let tcpr = tree.child_named(tc, &W::tcPr())?;
    tree.children(tcpr)
        .find(|&c| tree.is_named(c, &W::cellIns()) || tree.is_named(c, &W::cellDel()))
}

fn unwrap_in_place(tree: &mut XmlTree, node: NodeId) {
    let children: Vec<NodeId> = tree.children(node).collect();
    for child in children {
        tree.detach(child);
        tree.insert_before(node, child);
    }
    tree.remove(node);
}

/// Restores the old properties stored inside a `*PrChange` marker onto the
/// marker's parent properties element.
fn restore_property_change(tree: &mut XmlTree, marker: NodeId) {
    let Some(parent) = tree.parent(marker) else {
        return;
    };
    // The marker holds a single child: the old properties element.
    let old_props = tree.children(marker).next();
    let Some(old_props) = old_props else {
        tree.remove(marker);
        return;
    };

    let keep: Vec<NodeId> = tree.children(old_props).collect();
    let existing: Vec<NodeId> = tree
        .children(parent)
        .filter(|&c| c != marker)
        .collect();
    for child in existing {
        tree.remove(child);
    }
    for child in keep {
        tree.detach(child);
        tree.reparent(parent, child);
    }
    tree.remove(marker);
}

fn rename_deleted_text(tree: &mut XmlTree, root: NodeId) {
    let nodes: Vec<NodeId> = tree.descendants(root).collect();
    for node in nodes {
        let Some(name) = tree.name(node).cloned() else { continue };
        if name == W::delText() || name.is(W::NS, "delInstrText") {
            let replacement = if name == W::delText() {
                W::t()
            } else {
                W::instrText()
            };
            let attrs = tree
                .get(node)
                .and_then(|n| n.attributes())
                .map(|a| a.to_vec())
                .unwrap_or_default();
            tree.replace(node, XmlNode::element_with_attrs(replacement, attrs));
        }
    }
}

fn strip_revision_save_ids(tree: &mut XmlTree, root: NodeId) {
    let nodes: Vec<NodeId> = tree.descendants(root).collect();
    for node in nodes {
        if let Some(attrs) = tree.get_mut(node).and_then(|n| n.attributes_mut()) {
            attrs.retain(|attr| {
                let ns = attr.name.namespace.as_deref();
                if ns == Some(W::NS) && attr.name.local.starts_with("rsid") {
                    return false;
                }
                if ns == Some(W14::NS)
                    && (attr.name.local == "paraId" || attr.name.local == "textId")
                {
                    return false;
                }
                true
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

    fn run(xml: &str, direction: Direction) -> String {
        let mut tree = parse(xml).unwrap();
        let root = tree.root().unwrap();
        resolve_revisions(&mut tree, root, direction);
        serialize(&tree).unwrap()
    }

    #[test]
    fn accept_drops_deletions_and_unwraps_insertions() {
        let xml = format!(
            r#"<w:p xmlns:w="{W_NS}"><w:del w:id="1"><w:r><w:delText>old</w:delText></w:r></w:del><w:ins w:id="2"><w:r><w:t>new</w:t></w:r></w:ins></w:p>"#
        );
        let out = run(&xml, Direction::Accept);
        assert!(!out.contains("old"));
        assert!(out.contains("<w:t>new</w:t>"));
        assert!(!out.contains("<w:ins"));
        assert!(!out.contains("<w:del"));
    }

    #[test]
    fn reject_restores_deletions_and_drops_insertions() {
        let xml = format!(
            r#"<w:p xmlns:w="{W_NS}"><w:del w:id="1"><w:r><w:delText>old</w:delText></w:r></w:del><w:ins w:id="2"><w:r><w:t>new</w:t></w:r></w:ins></w:p>"#
        );
        let out = run(&xml, Direction::Reject);
        assert!(out.contains("<w:t>old</w:t>"));
        assert!(!out.contains("new"));
        assert!(!out.contains("delText"));
    }

    #[test]
    fn accept_removes_deleted_row_and_keeps_inserted_row() {
        let xml = format!(
            r#"<w:tbl xmlns:w="{W_NS}"><w:tr><w:trPr><w:del w:id="1"/></w:trPr><w:tc><w:p/></w:tc></w:tr><w:tr><w:trPr><w:ins w:id="2"/></w:trPr><w:tc><w:p/></w:tc></w:tr></w:tbl>"#
        );
        let out = run(&xml, Direction::Accept);
        assert_eq!(out.matches("<w:tr>").count(), 1);
        assert!(!out.contains("<w:ins"));
        assert!(!out.contains("<w:del"));
    }

    #[test]
    fn reject_removes_inserted_row() {
        let xml = format!(
            r#"<w:tbl xmlns:w="{W_NS}"><w:tr><w:trPr><w:ins w:id="2"/></w:trPr><w:tc><w:p/></w:tc></w:tr><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>"#
        );
        let out = run(&xml, Direction::Reject);
        assert_eq!(out.matches("<w:tr>").count(), 1);
    }

    #[test]
    fn accept_merges_paragraph_with_deleted_mark() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:pPr><w:rPr><w:del w:id="1"/></w:rPr></w:pPr><w:r><w:t>a</w:t></w:r></w:p><w:p><w:r><w:t>b</w:t></w:r></w:p></w:body>"#
        );
        let out = run(&xml, Direction::Accept);
        assert_eq!(out.matches("<w:p>").count(), 1);
        let a = out.find("<w:t>a</w:t>").unwrap();
        let b = out.find("<w:t>b</w:t>").unwrap();
        assert!(a < b);
    }

    #[test]
    fn reject_restores_old_run_properties() {
        let xml = format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:b/><w:rPrChange w:id="5" w:author="x" w:date="d"><w:rPr><w:i/></w:rPr></w:rPrChange></w:rPr><w:t>t</w:t></w:r>"#
        );
        let out = run(&xml, Direction::Reject);
        assert!(out.contains("<w:i/>"));
        assert!(!out.contains("<w:b/>"));
        assert!(!out.contains("rPrChange"));
    }

    #[test]
    fn accept_keeps_new_run_properties() {
        let xml = format!(
            r#"<w:r xmlns:w="{W_NS}"><w:rPr><w:b/><w:rPrChange w:id="5" w:author="x" w:date="d"><w:rPr><w:i/></w:rPr></w:rPrChange></w:rPr><w:t>t</w:t></w:r>"#
        );
        let out = run(&xml, Direction::Accept);
        assert!(out.contains("<w:b/>"));
        assert!(!out.contains("rPrChange"));
        assert!(!out.contains("<w:i/>"));
    }

    #[test]
    fn accept_then_accept_is_stable() {
        let xml = format!(
            r#"<w:p xmlns:w="{W_NS}"><w:ins w:id="2"><w:r><w:t>new</w:t></w:r></w:ins></w:p>"#
        );
        let once = run(&xml, Direction::Accept);
        assert_eq!(run(&once, Direction::Accept), once);
    }
}
