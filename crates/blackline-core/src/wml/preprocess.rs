//! Preprocessing pipeline.
//!
//! Runs on each input independently before atomization:
//! 1. simplify markup variants the correlation engine does not model;
//! 2. accept pre-existing revisions so both inputs carry current text;
//! 3. assign hierarchy ids (UNIDs) to every element;
//! 4. annotate block-level content with its canonical hash for LCS
//!    short-circuiting.

use crate::error::Result;
use crate::hash::{canonical_sha1, CanonicalOptions};
use crate::wml::accept::accept_revisions;
use crate::wml::context::UnidAllocator;
use crate::wml::simplify::{simplify_markup, SimplifySettings};
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::{BL, W};
use indextree::NodeId;

pub fn preprocess(
    tree: &mut XmlTree,
    root: NodeId,
    unids: &mut UnidAllocator,
    canonical: &CanonicalOptions,
) -> Result<()> {
    simplify_markup(tree, root, &SimplifySettings::default())?;
    accept_revisions(tree, root);
    assign_unids(tree, root, unids);
    annotate_block_hashes(tree, root, canonical);
    Ok(())
}

/// Gives every element a UNID, keeping any it already carries so repeated
/// preprocessing is a no-op.
pub fn assign_unids(tree: &mut XmlTree, root: NodeId, unids: &mut UnidAllocator) {
    let unid_name = BL::unid();
    let nodes: Vec<NodeId> = tree.descendants(root).collect();
    for node in nodes {
        let Some(data) = tree.get(node) else { continue };
        if !data.is_element() || data.attribute(&unid_name).is_some() {
            continue;
        }
        let unid = unids.next();
        tree.set_attribute(node, &unid_name, &unid);
    }
}

/// Annotates paragraphs, tables, and rows with their canonical content
/// hash. Bookkeeping attributes are excluded from hashing, so annotating a
/// child never disturbs its parent's hash.
pub fn annotate_block_hashes(tree: &mut XmlTree, root: NodeId, canonical: &CanonicalOptions) {
    let hash_name = BL::contentHash();
    let blocks: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&node| {
            tree.is_named(node, &W::p())
                || tree.is_named(node, &W::tbl())
                || tree.is_named(node, &W::tr())
        })
        .collect();
    for block in blocks {
        let digest = canonical_sha1(tree, block, canonical);
        tree.set_attribute(block, &hash_name, &digest);
    }
}
