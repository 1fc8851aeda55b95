use super::arena::XmlTree;
use super::node::XmlNode;
use super::xname::{XAttribute, XName};
use crate::error::{Error, Result};

pub fn parse(xml: &str) -> Result<XmlTree> {
    parse_bytes(xml.as_bytes())
}

pub fn parse_bytes(bytes: &[u8]) -> Result<XmlTree> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::XmlParse {
        message: e.to_string(),
        location: "input".to_string(),
    })?;
    let doc = roxmltree::Document::parse_with_options(
        text,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )
    .map_err(|e| Error::XmlParse {
        message: e.to_string(),
        location: format!("line {}", e.pos().row),
    })?;

    let mut tree = XmlTree::new();
    let root = doc.root_element();
    let root_id = tree.add_root(convert(root).expect("root is an element"));
    build(&mut tree, root, root_id);
    Ok(tree)
}

/// Parses a serialized fragment that uses the canonical well-known
/// prefixes but carries no namespace declarations of its own (the shape
/// `serialize_subtree` produces for preserved property elements). The
/// fragment is parsed inside a shell that declares those prefixes; the
/// returned tree's root is the fragment's root element.
pub fn parse_fragment(xml: &str) -> Result<XmlTree> {
    use super::namespaces::{canonical_prefix, M, MC, O, R, V, W, W10, W14, BL};
    let known = [
        (canonical_prefix(W::NS), W::NS),
        (canonical_prefix(M::NS), M::NS),
        (canonical_prefix(V::NS), V::NS),
        (canonical_prefix(O::NS), O::NS),
        (canonical_prefix(W10::NS), W10::NS),
        (canonical_prefix(W14::NS), W14::NS),
        (canonical_prefix(MC::NS), MC::NS),
        (canonical_prefix(R::NS), R::NS),
        (canonical_prefix(BL::NS), BL::NS),
        ("a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
        ("wp", "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"),
        ("pic", "http://schemas.openxmlformats.org/drawingml/2006/picture"),
        ("wps", "http://schemas.microsoft.com/office/word/2010/wordprocessingShape"),
        ("wpg", "http://schemas.microsoft.com/office/word/2010/wordprocessingGroup"),
    ];
    let mut shell = String::from("<shell");
    for (prefix, uri) in known {
        shell.push_str(&format!(" xmlns:{}=\"{}\"", prefix, uri));
    }
    shell.push('>');
    shell.push_str(xml);
    shell.push_str("</shell>");

    let parsed = parse(&shell)?;
    let shell_root = parsed.root().ok_or_else(|| Error::XmlParse {
        message: "empty fragment".to_string(),
        location: "fragment".to_string(),
    })?;
    let fragment_root = parsed
        .children(shell_root)
        .find(|&c| parsed.get(c).map(|n| n.is_element()).unwrap_or(false))
        .ok_or_else(|| Error::XmlParse {
            message: "fragment has no element".to_string(),
            location: "fragment".to_string(),
        })?;

    let mut tree = XmlTree::new();
    let imported = tree.import_subtree(&parsed, fragment_root);
    tree.set_root(Some(imported));
    Ok(tree)
}

/// Breadth-independent, stack-driven build of the arena tree.
fn build(tree: &mut XmlTree, source_root: roxmltree::Node, dest_root: indextree::NodeId) {
    let mut stack: Vec<(roxmltree::Node, indextree::NodeId)> = vec![(source_root, dest_root)];
    while let Some((src, dst)) = stack.pop() {
        for child in src.children() {
            let Some(data) = convert(child) else { continue };
            let child_id = tree.add_child(dst, data);
            if child.is_element() {
                stack.push((child, child_id));
            }
        }
    }
}

fn convert(node: roxmltree::Node) -> Option<XmlNode> {
    match node.node_type() {
        roxmltree::NodeType::Element => {
            let name = XName::new(
                node.tag_name().namespace().unwrap_or(""),
                node.tag_name().name(),
            );
            let mut attributes: Vec<XAttribute> = node
                .attributes()
                .map(|attr| {
                    XAttribute::new(
                        XName::new(attr.namespace().unwrap_or(""), attr.name()),
                        attr.value(),
                    )
                })
                .collect();
            // roxmltree splits namespace declarations off from ordinary
            // attributes; fold them back in so serialization can re-declare
            // prefixes where the input did.
            for ns in node.namespaces() {
                if let Some(prefix) = ns.name() {
                    attributes.push(XAttribute::new(
                        XName::new(super::namespaces::XMLNS::NS, prefix),
                        ns.uri(),
                    ));
                } else {
                    attributes.push(XAttribute::new(XName::local("xmlns"), ns.uri()));
                }
            }
            Some(XmlNode::Element { name, attributes })
        }
        roxmltree::NodeType::Text => node.text().map(|t| XmlNode::Text(t.to_string())),
        roxmltree::NodeType::Comment => node.text().map(|t| XmlNode::Comment(t.to_string())),
        roxmltree::NodeType::PI => Some(XmlNode::ProcessingInstruction {
            target: node.pi().map(|pi| pi.target.to_string()).unwrap_or_default(),
            data: node
                .pi()
                .and_then(|pi| pi.value.map(|s| s.to_string()))
                .unwrap_or_default(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::namespaces::W;

    #[test]
    fn parses_namespaced_document() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p/></w:body></w:document>"#;
        let tree = parse(xml).unwrap();
        let root = tree.root().unwrap();
        assert!(tree.is_named(root, &W::document()));
        let body = tree.children(root).next().unwrap();
        assert!(tree.is_named(body, &W::body()));
    }

    #[test]
    fn preserves_attribute_order() {
        let tree = parse(r#"<e c="3" a="1" b="2"/>"#).unwrap();
        let root = tree.root().unwrap();
        let names: Vec<String> = tree
            .get(root)
            .unwrap()
            .attributes()
            .unwrap()
            .iter()
            .map(|a| a.name.local.clone())
            .collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn fragment_with_canonical_prefixes_parses() {
        let tree = parse_fragment("<w:rPr><w:b/></w:rPr>").unwrap();
        let root = tree.root().unwrap();
        assert!(tree.is_named(root, &W::rPr()));
        assert_eq!(tree.children(root).count(), 1);
    }

    #[test]
    fn malformed_input_is_xml_parse() {
        assert!(matches!(
            parse("<unclosed"),
            Err(Error::XmlParse { .. })
        ));
    }

    #[test]
    fn nesting_at_tokenizer_depth_limit_builds() {
        // roxmltree caps element depth at 1024; stay just under it.
        let depth = 1000;
        let mut xml = String::new();
        for _ in 0..depth {
            xml.push_str("<d>");
        }
        for _ in 0..depth {
            xml.push_str("</d>");
        }
        let tree = parse(&xml).unwrap();
        let count = tree.descendants(tree.root().unwrap()).count();
        assert_eq!(count, depth);
    }
}
