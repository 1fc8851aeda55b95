//! Revision emission and consolidation.
//!
//! Two emission strategies, dispatched by container type: runs, paragraph
//! marks, and math wrap in `w:ins`/`w:del`; table rows and cells carry the
//! revision as a property child (`trPr/ins|del`, `tcPr/cellIns|cellDel`).
//! Wrapping a `w:tr` in `w:ins` parses but Word rejects the file, so the
//! property form is a schema requirement, not a preference.
//!
//! After the tree is marked, adjacent same-kind revisions with matching
//! author, date, and formatting merge into one element. Insertion ids are
//! part of the merge identity; deletion ids are not.

use crate::error::{Error, Result};
use crate::hash::canonical::{canonical_text, CanonicalOptions};
use crate::util::needs_space_preserve;
use crate::wml::coalesce::{STATUS_DELETED, STATUS_FORMAT_CHANGED, STATUS_INSERTED};
use crate::wml::context::ComparisonContext;
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::{BL, M, W, XML};
use crate::xml::node::XmlNode;
use crate::xml::xname::{XAttribute, XName};
use indextree::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionKind {
    Inserted,
    Deleted,
    FormatChanged,
    RowInserted,
    RowDeleted,
    CellInserted,
    CellDeleted,
}

/// One tracked change, as reported by [`get_revisions`](crate::wml::get_revisions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub kind: RevisionKind,
    pub text: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
}

/// Turns the status attributes left by reconstruction into revision
/// markup.
pub fn mark_revisions(tree: &mut XmlTree, root: NodeId, ctx: &mut ComparisonContext) -> Result<()> {
    mark_runs(tree, root, ctx)?;
    mark_paragraph_marks(tree, root, ctx);
    mark_math(tree, root, ctx);
    mark_rows_and_cells(tree, root, ctx);
    Ok(())
}

/// Elements whose status marks the owning run as revised.
fn is_run_content(tree: &XmlTree, node: NodeId) -> bool {
    let Some(name) = tree.name(node) else { return false };
    let ns = name.namespace.as_deref();
    if ns == Some(W::NS) {
        !matches!(name.local.as_str(), "rPr")
    } else {
        ns == Some(M::NS)
    }
}

fn mark_runs(tree: &mut XmlTree, root: NodeId, ctx: &mut ComparisonContext) -> Result<()> {
    let runs: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&n| tree.is_named(n, &W::r()))
        .collect();

    for run in runs {
        if tree.get(run).is_none() {
            continue;
        }
        // Statuses of this run's own content; textbox interiors carry
        // their own runs and resolve independently.
        let mut statuses: Vec<String> = Vec::new();
        for node in tree.descendants_trimmed(run, |n| {
            n.name().map(|x| x == &W::txbxContent()).unwrap_or(false)
        }) {
            if node == run || !is_run_content(tree, node) {
                continue;
            }
            if let Some(status) = tree.attribute(node, &BL::status()) {
                if status != STATUS_FORMAT_CHANGED {
                    statuses.push(status.to_string());
                }
            }
        }
        statuses.sort();
        statuses.dedup();

        if statuses.len() > 1 {
            return Err(Error::Internal(
                "run carries both deleted and inserted content".to_string(),
            ));
        }
        let Some(status) = statuses.pop() else { continue };

        let wrapper_name = match status.as_str() {
            STATUS_DELETED => W::del(),
            STATUS_INSERTED => W::ins(),
            _ => continue,
        };
        let wrapper = tree.new_node(XmlNode::element_with_attrs(
            wrapper_name,
            revision_attrs(ctx),
        ));
        tree.insert_before(run, wrapper);
        tree.detach(run);
        tree.reparent(wrapper, run);
    }
    Ok(())
}

/// A paragraph-mark revision lives inside `pPr/rPr`, not around the
/// paragraph.
fn mark_paragraph_marks(tree: &mut XmlTree, root: NodeId, ctx: &mut ComparisonContext) {
    let pprs: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&n| tree.is_named(n, &W::pPr()))
        .collect();
    for ppr in pprs {
        let Some(status) = tree.attribute(ppr, &BL::status()).map(|s| s.to_string()) else {
            continue;
        };
        tree.remove_attribute(ppr, &BL::status());
        let marker = match status.as_str() {
            STATUS_DELETED => W::del(),
            STATUS_INSERTED => W::ins(),
            _ => continue,
        };
        let rpr = tree.child_named(ppr, &W::rPr()).unwrap_or_else(|| {
            let rpr = tree.new_node(XmlNode::element(W::rPr()));
            tree.reparent_first(ppr, rpr);
            rpr
        });
        let attrs = revision_attrs(ctx);
        let marker_node = tree.new_node(XmlNode::element_with_attrs(marker, attrs));
        tree.reparent_first(rpr, marker_node);
    }
}

fn mark_math(tree: &mut XmlTree, root: NodeId, ctx: &mut ComparisonContext) {
    let math: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&n| {
            tree.name(n)
                .map(|x| x == &M::oMath() || x == &M::oMathPara())
                .unwrap_or(false)
        })
        .collect();
    for node in math {
        let Some(status) = tree.attribute(node, &BL::status()).map(|s| s.to_string()) else {
            continue;
        };
        tree.remove_attribute(node, &BL::status());
        // Math inside a run is covered by the run's wrapper.
        if tree
            .parent(node)
            .map(|p| tree.is_named(p, &W::r()))
            .unwrap_or(false)
        {
            continue;
        }
        let wrapper_name = match status.as_str() {
            STATUS_DELETED => W::del(),
            STATUS_INSERTED => W::ins(),
            _ => continue,
        };
        let wrapper = tree.new_node(XmlNode::element_with_attrs(
            wrapper_name,
            revision_attrs(ctx),
        ));
        tree.insert_before(node, wrapper);
        tree.detach(node);
        tree.reparent(wrapper, node);
    }
}

fn mark_rows_and_cells(tree: &mut XmlTree, root: NodeId, ctx: &mut ComparisonContext) {
    let targets: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&n| tree.is_named(n, &W::tr()) || tree.is_named(n, &W::tc()))
        .collect();
    for node in targets {
        let Some(status) = tree.attribute(node, &BL::status()).map(|s| s.to_string()) else {
            continue;
        };
        tree.remove_attribute(node, &BL::status());
        let is_row = tree.is_named(node, &W::tr());
        let marker = match (is_row, status.as_str()) {
            (true, STATUS_INSERTED) => W::ins(),
            (true, STATUS_DELETED) => W::del(),
            (false, STATUS_INSERTED) => W::cellIns(),
            (false, STATUS_DELETED) => W::cellDel(),
            _ => continue,
        };
        let props_name = if is_row { W::trPr() } else { W::tcPr() };
        let props = tree.child_named(node, &props_name).unwrap_or_else(|| {
            let props = tree.new_node(XmlNode::element(props_name.clone()));
            tree.reparent_first(node, props);
            props
        });
        let marker_node = tree.new_node(XmlNode::element_with_attrs(marker, revision_attrs(ctx)));
        tree.reparent_first(props, marker_node);
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

/// Merges adjacent same-kind revisions (and adjacent plain runs) inside
/// every paragraph, including paragraphs inside textbox content.
pub fn merge_adjacent_revisions(tree: &mut XmlTree, root: NodeId) {
    let parents: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&n| tree.is_named(n, &W::p()) || tree.is_named(n, &W::hyperlink()))
        .collect();
    for parent in parents {
        if tree.get(parent).is_some() {
            merge_children(tree, parent);
        }
    }
}

fn merge_children(tree: &mut XmlTree, parent: NodeId) {
    let children: Vec<NodeId> = tree.children(parent).collect();
    let mut i = 0;
    while i < children.len() {
        let key = merge_key(tree, children[i]);
        let Some(key) = key else {
            i += 1;
            continue;
        };
        let mut group = vec![children[i]];
        let mut j = i + 1;
        while j < children.len() {
            match merge_key(tree, children[j]) {
                Some(other) if other == key => {
                    group.push(children[j]);
                    j += 1;
                }
                _ => break,
            }
        }
        if group.len() > 1 {
            merge_group(tree, &group);
        }
        i = j;
    }
}

/// Composite merge key, or `None` for never-mergeable shapes. The
/// insertion id participates in the key (distinct insertions never merge);
/// the deletion id does not (distinct deletions do merge).
fn merge_key(tree: &XmlTree, node: NodeId) -> Option<String> {
    let name = tree.name(node)?;
    if name.namespace.as_deref() != Some(W::NS) {
        return None;
    }
    if carries_numbering_metadata(tree, node) {
        return None;
    }
    match name.local.as_str() {
        "r" => {
            let text_child = single_non_rpr_child(tree, node)?;
            if tree.is_named(text_child, &W::t()) {
                Some(format!("Wt|{}", rpr_text(tree, node)))
            } else if tree.is_named(text_child, &W::instrText()) {
                Some(format!("WinstrText|{}", rpr_text(tree, node)))
            } else {
                None
            }
        }
        "ins" => {
            let run = only_child_named(tree, node, &W::r())?;
            let text_child = single_non_rpr_child(tree, run)?;
            if !tree.is_named(text_child, &W::t()) {
                return None;
            }
            Some(format!(
                "Wins2|{}|{}|{}|{}",
                tree.attribute(node, &W::author()).unwrap_or(""),
                tree.attribute(node, &W::date()).unwrap_or(""),
                tree.attribute(node, &W::id()).unwrap_or(""),
                rpr_text(tree, run)
            ))
        }
        "del" => {
            let run = only_child_named(tree, node, &W::r())?;
            let text_child = single_non_rpr_child(tree, run)?;
            if !tree.is_named(text_child, &W::delText()) {
                return None;
            }
            Some(format!(
                "Wdel|{}|{}|{}",
                tree.attribute(node, &W::author()).unwrap_or(""),
                tree.attribute(node, &W::date()).unwrap_or(""),
                rpr_text(tree, run)
            ))
        }
        _ => None,
    }
}

fn carries_numbering_metadata(tree: &XmlTree, node: NodeId) -> bool {
    let has_attr = |id: NodeId| {
        tree.get(id)
            .and_then(|n| n.attributes())
            .map(|attrs| attrs.iter().any(|a| a.name.local == "abstractNumId"))
            .unwrap_or(false)
    };
    has_attr(node) || tree.children(node).any(has_attr)
}

fn single_non_rpr_child(tree: &XmlTree, run: NodeId) -> Option<NodeId> {
    let mut non_rpr = tree
        .children(run)
        .filter(|&c| !tree.is_named(c, &W::rPr()));
    let first = non_rpr.next()?;
    if non_rpr.next().is_some() {
        return None;
    }
    Some(first)
}

fn only_child_named(tree: &XmlTree, node: NodeId, name: &XName) -> Option<NodeId> {
    let mut children = tree.children(node);
    let first = children.next()?;
    if children.next().is_some() || !tree.is_named(first, name) {
        return None;
    }
    Some(first)
}

fn rpr_text(tree: &XmlTree, run: NodeId) -> String {
    tree.child_named(run, &W::rPr())
        .map(|rpr| canonical_text(tree, rpr, &CanonicalOptions::default()))
        .unwrap_or_default()
}

fn merge_group(tree: &mut XmlTree, group: &[NodeId]) {
    let first = group[0];
    let mut combined = String::new();
    for &node in group {
        combined.push_str(&group_text(tree, node));
    }
    set_group_text(tree, first, &combined);
    for &node in &group[1..] {
        tree.remove(node);
    }
}

fn text_element_of(tree: &XmlTree, node: NodeId) -> Option<NodeId> {
    let run = if tree.is_named(node, &W::r()) {
        node
    } else {
        tree.child_named(node, &W::r())?
    };
    tree.children(run).find(|&c| {
        tree.is_named(c, &W::t())
            || tree.is_named(c, &W::delText())
            || tree.is_named(c, &W::instrText())
    })
}

fn group_text(tree: &XmlTree, node: NodeId) -> String {
    text_element_of(tree, node)
        .map(|t| tree.inner_text(t))
        .unwrap_or_default()
}

fn set_group_text(tree: &mut XmlTree, node: NodeId, text: &str) {
    let Some(t) = text_element_of(tree, node) else { return };
    let children: Vec<NodeId> = tree.children(t).collect();
    for child in children {
        tree.remove(child);
    }
    tree.add_child(t, XmlNode::Text(text.to_string()));
    if needs_space_preserve(text) {
        tree.set_attribute(t, &XML::space(), "preserve");
    } else {
        tree.remove_attribute(t, &XML::space());
    }
}

/// Renumbers revision ids (one monotone pass, uniqueness per document) and
/// drawing object ids.
pub fn fix_up_ids(tree: &mut XmlTree, root: NodeId, ctx: &mut ComparisonContext) {
    let revision_names = [
        "ins", "del", "rPrChange", "pPrChange", "cellIns", "cellDel", "cellMerge",
        "tblPrChange", "tblGridChange", "trPrChange", "tcPrChange", "sectPrChange",
        "numberingChange", "moveFrom", "moveTo",
    ];
    let nodes: Vec<NodeId> = tree.descendants(root).collect();
    for node in nodes.iter().copied() {
        let Some(name) = tree.name(node) else { continue };
        if name.namespace.as_deref() == Some(W::NS)
            && revision_names.contains(&name.local.as_str())
            && tree.attribute(node, &W::id()).is_some()
        {
            let id = ctx.next_revision_id().to_string();
            tree.set_attribute(node, &W::id(), &id);
        }
    }

    // Drawing object ids must be unique within the document.
    let mut doc_pr_id = 1i64;
    for node in nodes {
        let Some(name) = tree.name(node) else { continue };
        if name.local == "docPr" {
            let id = doc_pr_id.to_string();
            tree.set_attribute(node, &XName::local("id"), &id);
            doc_pr_id += 1;
        }
    }
}

/// Removes every internal bookkeeping attribute.
pub fn strip_bookkeeping(tree: &mut XmlTree, root: NodeId) {
    let nodes: Vec<NodeId> = tree.descendants(root).collect();
    for node in nodes {
        if let Some(attrs) = tree.get_mut(node).and_then(|n| n.attributes_mut()) {
            attrs.retain(|a| a.name.namespace.as_deref() != Some(BL::NS));
        }
    }
}

/// Collects the revisions present in a compared document, in reading
/// order.
pub fn extract_revisions(tree: &XmlTree, root: NodeId) -> Vec<Revision> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = vec![root];
    while let Some(node) = stack.pop() {
        let children: Vec<NodeId> = tree.children(node).collect();
        let Some(name) = tree.name(node) else {
            for child in children.into_iter().rev() {
                stack.push(child);
            }
            continue;
        };
        let ns = name.namespace.as_deref();
        if ns == Some(W::NS) {
            let kind = match name.local.as_str() {
                "ins" if in_row_properties(tree, node) => Some(RevisionKind::RowInserted),
                "del" if in_row_properties(tree, node) => Some(RevisionKind::RowDeleted),
                "ins" if in_paragraph_mark(tree, node) => Some(RevisionKind::Inserted),
                "del" if in_paragraph_mark(tree, node) => Some(RevisionKind::Deleted),
                "ins" => Some(RevisionKind::Inserted),
                "del" => Some(RevisionKind::Deleted),
                "cellIns" => Some(RevisionKind::CellInserted),
                "cellDel" => Some(RevisionKind::CellDeleted),
                "rPrChange" | "pPrChange" => Some(RevisionKind::FormatChanged),
                _ => None,
            };
            if let Some(kind) = kind {
                let text = revision_text(tree, node);
                out.push(Revision {
                    kind,
                    text: if text.is_empty() { None } else { Some(text) },
                    author: tree.attribute(node, &W::author()).map(|s| s.to_string()),
                    date: tree.attribute(node, &W::date()).map(|s| s.to_string()),
                });
                continue;
            }
        }
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

fn in_row_properties(tree: &XmlTree, node: NodeId) -> bool {
    tree.parent(node)
        .map(|p| tree.is_named(p, &W::trPr()))
        .unwrap_or(false)
}

fn in_paragraph_mark(tree: &XmlTree, node: NodeId) -> bool {
    tree.parent(node)
        .and_then(|p| tree.parent(p))
        .map(|gp| tree.is_named(gp, &W::pPr()))
        .unwrap_or(false)
}

fn revision_text(tree: &XmlTree, node: NodeId) -> String {
    let mut out = String::new();
    for desc in tree.descendants(node) {
        let Some(name) = tree.name(desc) else { continue };
        if name == &W::t() || name == &W::delText() || name == &W::instrText() {
            out.push_str(&tree.inner_text(desc));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parser::parse;
    use crate::xml::writer::serialize;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
    const BL_NS: &str = "urn:blackline:bookkeeping";

    fn ctx() -> ComparisonContext {
        ComparisonContext::new("Reviewer".into(), "2024-03-01T10:00:00Z".into(), 1)
    }

    fn marked(xml: &str) -> String {
        let mut tree = parse(xml).unwrap();
        let root = tree.root().unwrap();
        let mut ctx = ctx();
        mark_revisions(&mut tree, root, &mut ctx).unwrap();
        strip_bookkeeping(&mut tree, root);
        serialize(&tree).unwrap()
    }

    #[test]
    fn inserted_run_is_wrapped_with_id_author_date() {
        let out = marked(&format!(
            r#"<w:body xmlns:w="{W_NS}" xmlns:bl="{BL_NS}"><w:p><w:r><w:t bl:status="Inserted">new</w:t></w:r></w:p></w:body>"#
        ));
        assert!(out.contains(r#"<w:ins w:id="1" w:author="Reviewer" w:date="2024-03-01T10:00:00Z"><w:r><w:t>new</w:t></w:r></w:ins>"#), "got: {out}");
    }

    #[test]
    fn deleted_paragraph_mark_goes_into_ppr_rpr() {
        let out = marked(&format!(
            r#"<w:body xmlns:w="{W_NS}" xmlns:bl="{BL_NS}"><w:p><w:pPr bl:status="Deleted"/><w:r><w:t>x</w:t></w:r></w:p></w:body>"#
        ));
        assert!(out.contains("<w:pPr><w:rPr><w:del"), "got: {out}");
    }

    #[test]
    fn inserted_row_marker_lives_inside_trpr() {
        let out = marked(&format!(
            r#"<w:body xmlns:w="{W_NS}" xmlns:bl="{BL_NS}"><w:tbl><w:tr bl:status="Inserted"><w:tc><w:p/></w:tc></w:tr></w:tbl></w:body>"#
        ));
        assert!(out.contains("<w:trPr><w:ins"), "got: {out}");
        assert!(!out.contains("<w:ins><w:tr"), "got: {out}");
        let id_pos = out.find("w:id=").unwrap();
        let author_pos = out.find("w:author=").unwrap();
        assert!(id_pos < author_pos);
    }

    #[test]
    fn deleted_cell_marker_is_cell_del() {
        let out = marked(&format!(
            r#"<w:body xmlns:w="{W_NS}" xmlns:bl="{BL_NS}"><w:tbl><w:tr><w:tc bl:status="Deleted"><w:tcPr><w:tcW w:w="5"/></w:tcPr><w:p/></w:tc></w:tr></w:tbl></w:body>"#
        ));
        assert!(out.contains("<w:tcPr><w:cellDel"), "got: {out}");
    }

    #[test]
    fn mixed_statuses_in_one_run_abort() {
        let mut tree = parse(&format!(
            r#"<w:body xmlns:w="{W_NS}" xmlns:bl="{BL_NS}"><w:p><w:r><w:t bl:status="Inserted">a</w:t><w:t bl:status="Deleted">b</w:t></w:r></w:p></w:body>"#
        ))
        .unwrap();
        let root = tree.root().unwrap();
        let mut ctx = ctx();
        assert!(matches!(
            mark_revisions(&mut tree, root, &mut ctx),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn adjacent_deletions_merge_regardless_of_id() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:del w:id="1" w:author="A" w:date="d"><w:r><w:delText xml:space="preserve">alpha </w:delText></w:r></w:del><w:del w:id="2" w:author="A" w:date="d"><w:r><w:delText>beta</w:delText></w:r></w:del></w:p></w:body>"#
        );
        let mut tree = parse(&xml).unwrap();
        let root = tree.root().unwrap();
        merge_adjacent_revisions(&mut tree, root);
        let out = serialize(&tree).unwrap();
        assert_eq!(out.matches("<w:del ").count(), 1, "got: {out}");
        assert!(out.contains("alpha beta"), "got: {out}");
    }

    #[test]
    fn adjacent_insertions_with_distinct_ids_do_not_merge() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:ins w:id="1" w:author="A" w:date="d"><w:r><w:t>cat</w:t></w:r></w:ins><w:ins w:id="2" w:author="A" w:date="d"><w:r><w:t> and dog</w:t></w:r></w:ins></w:p></w:body>"#
        );
        let mut tree = parse(&xml).unwrap();
        let root = tree.root().unwrap();
        merge_adjacent_revisions(&mut tree, root);
        let out = serialize(&tree).unwrap();
        assert_eq!(out.matches("<w:ins ").count(), 2, "got: {out}");
    }

    #[test]
    fn adjacent_insertions_with_same_id_merge() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:ins w:id="7" w:author="A" w:date="d"><w:r><w:t>fo</w:t></w:r></w:ins><w:ins w:id="7" w:author="A" w:date="d"><w:r><w:t>od</w:t></w:r></w:ins></w:p></w:body>"#
        );
        let mut tree = parse(&xml).unwrap();
        let root = tree.root().unwrap();
        merge_adjacent_revisions(&mut tree, root);
        let out = serialize(&tree).unwrap();
        assert_eq!(out.matches("<w:ins ").count(), 1);
        assert!(out.contains("<w:t>food</w:t>"));
    }

    #[test]
    fn plain_runs_with_same_formatting_merge() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>hel</w:t></w:r><w:r><w:t>lo</w:t></w:r></w:p></w:body>"#
        );
        let mut tree = parse(&xml).unwrap();
        let root = tree.root().unwrap();
        merge_adjacent_revisions(&mut tree, root);
        let out = serialize(&tree).unwrap();
        assert!(out.contains("<w:t>hello</w:t>"), "got: {out}");
    }

    #[test]
    fn runs_with_different_formatting_do_not_merge() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:rPr><w:b/></w:rPr><w:t>a</w:t></w:r><w:r><w:t>b</w:t></w:r></w:p></w:body>"#
        );
        let mut tree = parse(&xml).unwrap();
        let root = tree.root().unwrap();
        merge_adjacent_revisions(&mut tree, root);
        let out = serialize(&tree).unwrap();
        assert_eq!(out.matches("<w:r>").count(), 2);
    }

    #[test]
    fn merge_never_crosses_a_field_boundary() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:r><w:t>a</w:t></w:r><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:t>b</w:t></w:r></w:p></w:body>"#
        );
        let mut tree = parse(&xml).unwrap();
        let root = tree.root().unwrap();
        merge_adjacent_revisions(&mut tree, root);
        let out = serialize(&tree).unwrap();
        assert!(out.contains("<w:t>a</w:t>"));
        assert!(out.contains("<w:t>b</w:t>"));
    }

    #[test]
    fn extract_revisions_reads_wrappers_and_row_markers() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:ins w:id="1" w:author="A" w:date="d"><w:r><w:t>add</w:t></w:r></w:ins></w:p><w:tbl><w:tr><w:trPr><w:del w:id="2" w:author="A" w:date="d"/></w:trPr><w:tc><w:p/></w:tc></w:tr></w:tbl></w:body>"#
        );
        let tree = parse(&xml).unwrap();
        let revisions = extract_revisions(&tree, tree.root().unwrap());
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].kind, RevisionKind::Inserted);
        assert_eq!(revisions[0].text.as_deref(), Some("add"));
        assert_eq!(revisions[1].kind, RevisionKind::RowDeleted);
    }

    #[test]
    fn revision_ids_renumber_uniquely() {
        let xml = format!(
            r#"<w:body xmlns:w="{W_NS}"><w:p><w:ins w:id="9" w:author="A" w:date="d"><w:r><w:t>a</w:t></w:r></w:ins><w:del w:id="9" w:author="A" w:date="d"><w:r><w:delText>b</w:delText></w:r></w:del></w:p></w:body>"#
        );
        let mut tree = parse(&xml).unwrap();
        let root = tree.root().unwrap();
        let mut ctx = ctx();
        fix_up_ids(&mut tree, root, &mut ctx);
        let out = serialize(&tree).unwrap();
        assert!(out.contains(r#"w:id="1""#));
        assert!(out.contains(r#"w:id="2""#));
    }
}
