//! Deterministic XML serialization.
//!
//! Attributes are written in storage order and namespace prefixes resolve
//! from in-scope `xmlns` declarations first, falling back to the canonical
//! well-known-prefix table. The walk is driven by an explicit stack so
//! pathological nesting depth cannot overflow the call stack.

use super::arena::XmlTree;
use super::namespaces::{canonical_prefix, XMLNS};
use super::node::XmlNode;
use super::xname::XAttribute;
use crate::error::{Error, Result};
use indextree::NodeId;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::Cursor;

/// Maps a namespace URI to its declared prefix ("" = default namespace).
type Scope = HashMap<String, String>;

pub fn serialize(tree: &XmlTree) -> Result<String> {
    let bytes = serialize_bytes(tree)?;
    String::from_utf8(bytes).map_err(|e| Error::XmlWrite(e.to_string()))
}

pub fn serialize_bytes(tree: &XmlTree) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(|e| Error::XmlWrite(e.to_string()))?;

    if let Some(root) = tree.root() {
        write_subtree(tree, root, &mut writer)?;
    }
    Ok(writer.into_inner().into_inner())
}

/// Serializes one subtree without an XML declaration.
pub fn serialize_subtree(tree: &XmlTree, node: NodeId) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_subtree(tree, node, &mut writer)?;
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| Error::XmlWrite(e.to_string()))
}

enum Step {
    Enter(NodeId, usize),
    Leave(String),
}

fn write_subtree<W: std::io::Write>(
    tree: &XmlTree,
    root: NodeId,
    writer: &mut Writer<W>,
) -> Result<()> {
    let mut scopes: Vec<Scope> = vec![Scope::new()];
    let mut stack: Vec<Step> = vec![Step::Enter(root, 0)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Leave(tag) => {
                writer
                    .write_event(Event::End(BytesEnd::new(&tag)))
                    .map_err(|e| Error::XmlWrite(e.to_string()))?;
            }
            Step::Enter(id, scope_idx) => {
                let Some(data) = tree.get(id) else { continue };
                match data {
                    XmlNode::Element { name, attributes } => {
                        let scope_idx = if declares_namespaces(attributes) {
                            let mut scope = scopes[scope_idx].clone();
                            extend_scope(&mut scope, attributes);
                            scopes.push(scope);
                            scopes.len() - 1
                        } else {
                            scope_idx
                        };
                        let scope = &scopes[scope_idx];

                        let tag = qualified(name.namespace.as_deref(), &name.local, scope, false);
                        let mut start = BytesStart::new(&tag);
                        for attr in attributes {
                            let attr_name = qualified(
                                attr.name.namespace.as_deref(),
                                &attr.name.local,
                                scope,
                                true,
                            );
                            start.push_attribute((attr_name.as_str(), attr.value.as_str()));
                        }

                        if tree.first_child(id).is_none() {
                            writer
                                .write_event(Event::Empty(start))
                                .map_err(|e| Error::XmlWrite(e.to_string()))?;
                        } else {
                            writer
                                .write_event(Event::Start(start))
                                .map_err(|e| Error::XmlWrite(e.to_string()))?;
                            stack.push(Step::Leave(tag));
                            let children: Vec<NodeId> = tree.children(id).collect();
                            for child in children.into_iter().rev() {
                                stack.push(Step::Enter(child, scope_idx));
                            }
                        }
                    }
                    XmlNode::Text(text) => {
                        writer
                            .write_event(Event::Text(BytesText::new(text)))
                            .map_err(|e| Error::XmlWrite(e.to_string()))?;
                    }
                    XmlNode::CData(text) => {
                        writer
                            .write_event(Event::CData(BytesCData::new(text)))
                            .map_err(|e| Error::XmlWrite(e.to_string()))?;
                    }
                    XmlNode::Comment(text) => {
                        writer
                            .write_event(Event::Comment(BytesText::new(text)))
                            .map_err(|e| Error::XmlWrite(e.to_string()))?;
                    }
                    XmlNode::ProcessingInstruction { target, data } => {
                        let content = if data.is_empty() {
                            target.clone()
                        } else {
                            format!("{} {}", target, data)
                        };
                        writer
                            .write_event(Event::PI(BytesPI::new(&content)))
                            .map_err(|e| Error::XmlWrite(e.to_string()))?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn declares_namespaces(attributes: &[XAttribute]) -> bool {
    attributes.iter().any(|a| {
        a.name.namespace.as_deref() == Some(XMLNS::NS)
            || (a.name.namespace.is_none() && a.name.local == "xmlns")
    })
}

fn extend_scope(scope: &mut Scope, attributes: &[XAttribute]) {
    for attr in attributes {
        if attr.name.namespace.as_deref() == Some(XMLNS::NS) {
            scope.insert(attr.value.clone(), attr.name.local.clone());
        } else if attr.name.namespace.is_none() && attr.name.local == "xmlns" {
            scope.insert(attr.value.clone(), String::new());
        }
    }
}

fn qualified(namespace: Option<&str>, local: &str, scope: &Scope, is_attribute: bool) -> String {
    let Some(ns) = namespace else {
        return local.to_string();
    };
    if ns == XMLNS::NS {
        return format!("xmlns:{}", local);
    }
    let prefix = match scope.get(ns) {
        // A default-namespace declaration cannot qualify an attribute.
        Some(p) if !(is_attribute && p.is_empty()) => p.as_str(),
        _ => canonical_prefix(ns),
    };
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}
