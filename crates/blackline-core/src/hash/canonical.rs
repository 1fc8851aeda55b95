//! Canonical serialization for hashing.
//!
//! Two fragments that differ only in prefix choice for well-known
//! namespaces, RSID-family attributes, or conflated whitespace (when
//! enabled) canonicalize to the same text and therefore the same digest.

use super::sha1::sha1_hex;
use crate::util::culture::to_upper_invariant;
use crate::xml::arena::XmlTree;
use crate::xml::namespaces::{canonical_prefix, BL, W, W14, XMLNS};
use crate::xml::node::XmlNode;
use crate::xml::xname::XAttribute;
use indextree::NodeId;

#[derive(Debug, Clone, Copy)]
pub struct CanonicalOptions {
    /// Uppercase text under a locale-invariant mapping before hashing.
    pub case_insensitive: bool,
    /// Treat U+00A0 as an ordinary space.
    pub conflate_spaces: bool,
}

impl Default for CanonicalOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            conflate_spaces: true,
        }
    }
}

/// Canonical text of the subtree at `node`. Iterative walk.
pub fn canonical_text(tree: &XmlTree, node: NodeId, opts: &CanonicalOptions) -> String {
    enum Step {
        Enter(NodeId),
        Leave(String),
    }

    let mut out = String::new();
    let mut stack = vec![Step::Enter(node)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Leave(tag) => {
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
            Step::Enter(id) => {
                let Some(data) = tree.get(id) else { continue };
                match data {
                    XmlNode::Element { name, attributes } => {
                        let tag = match name.namespace.as_deref() {
                            Some(ns) => format!("{}:{}", canonical_prefix(ns), name.local),
                            None => name.local.clone(),
                        };
                        out.push('<');
                        out.push_str(&tag);
                        for attr in attributes {
                            if skip_attribute(attr) {
                                continue;
                            }
                            out.push(' ');
                            match attr.name.namespace.as_deref() {
                                Some(ns) => {
                                    out.push_str(canonical_prefix(ns));
                                    out.push(':');
                                }
                                None => {}
                            }
                            out.push_str(&attr.name.local);
                            out.push_str("=\"");
                            out.push_str(&attr.value);
                            out.push('"');
                        }
                        out.push('>');
                        stack.push(Step::Leave(tag));
                        let children: Vec<NodeId> = tree.children(id).collect();
                        for child in children.into_iter().rev() {
                            stack.push(Step::Enter(child));
                        }
                    }
                    XmlNode::Text(text) | XmlNode::CData(text) => {
                        out.push_str(&fold_text(text, opts));
                    }
                    XmlNode::Comment(_) | XmlNode::ProcessingInstruction { .. } => {}
                }
            }
        }
    }
    out
}

/// Lowercase hex SHA-1 of the canonical text.
pub fn canonical_sha1(tree: &XmlTree, node: NodeId, opts: &CanonicalOptions) -> String {
    sha1_hex(&canonical_text(tree, node, opts))
}

pub fn fold_text(text: &str, opts: &CanonicalOptions) -> String {
    let mut folded = if opts.conflate_spaces {
        text.replace('\u{00A0}', " ")
    } else {
        text.to_string()
    };
    if opts.case_insensitive {
        folded = to_upper_invariant(&folded);
    }
    folded
}

/// Fold a single character under the hashing options.
pub fn fold_char(ch: char, opts: &CanonicalOptions) -> String {
    if opts.conflate_spaces && ch == '\u{00A0}' {
        return " ".to_string();
    }
    if opts.case_insensitive {
        to_upper_invariant(&ch.to_string())
    } else {
        ch.to_string()
    }
}

fn skip_attribute(attr: &XAttribute) -> bool {
    let ns = attr.name.namespace.as_deref();
    // Prefix declarations never influence identity.
    if ns == Some(XMLNS::NS) || (ns.is_none() && attr.name.local == "xmlns") {
        return true;
    }
    // Internal bookkeeping attributes.
    if ns == Some(BL::NS) {
        return true;
    }
    // Revision-save-ID family: nondeterministic per save session.
    if ns == Some(W::NS) && attr.name.local.starts_with("rsid") {
        return true;
    }
    if ns == Some(W14::NS) && (attr.name.local == "paraId" || attr.name.local == "textId") {
        return true;
    }
    false
}
