use super::node::XmlNode;
use super::xname::{XAttribute, XName};
use crate::error::{Error, Result};
use indextree::{Arena, NodeId};

/// Arena-backed mutable XML tree. Node identifiers are stable indices;
/// mutations never invalidate identifiers of unrelated nodes.
pub struct XmlTree {
    arena: Arena<XmlNode>,
    root: Option<NodeId>,
}

impl XmlTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub fn get(&self, id: NodeId) -> Option<&XmlNode> {
        self.arena.get(id).map(|node| node.get())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut XmlNode> {
        self.arena.get_mut(id).map(|node| node.get_mut())
    }

    /// Like [`get`](Self::get) but maps a stale identifier to `InvalidRef`.
    pub fn node(&self, id: NodeId) -> Result<&XmlNode> {
        self.get(id).ok_or(Error::InvalidRef)
    }

    /// Creates a detached node; attach it with `reparent` or `insert_*`.
    pub fn new_node(&mut self, data: XmlNode) -> NodeId {
        self.arena.new_node(data)
    }

    pub fn add_root(&mut self, data: XmlNode) -> NodeId {
        let id = self.arena.new_node(data);
        self.root = Some(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, data: XmlNode) -> NodeId {
        let child = self.arena.new_node(data);
        parent.append(child, &mut self.arena);
        child
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        sibling.insert_before(node, &mut self.arena);
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        sibling.insert_after(node, &mut self.arena);
    }

    /// Replaces the payload of `id` in place, keeping its children.
    pub fn replace(&mut self, id: NodeId, data: XmlNode) {
        if let Some(node) = self.arena.get_mut(id) {
            *node.get_mut() = data;
        }
    }

    /// Detaches `id` from its parent without destroying the subtree.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Detaches and destroys the whole subtree rooted at `id`.
    pub fn remove(&mut self, id: NodeId) {
        id.remove_subtree(&mut self.arena);
    }

    /// Appends `child` (and its subtree) as the last child of `parent`.
    pub fn reparent(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.arena);
    }

    /// Prepends `child` as the first child of `parent`.
    pub fn reparent_first(&mut self, parent: NodeId, child: NodeId) {
        parent.prepend(child, &mut self.arena);
    }

    /// Sets an attribute, preserving the position of an existing name and
    /// appending otherwise. Storage order is serialization order.
    pub fn set_attribute(&mut self, id: NodeId, name: &XName, value: &str) {
        if let Some(attrs) = self.get_mut(id).and_then(|n| n.attributes_mut()) {
            if let Some(attr) = attrs.iter_mut().find(|a| &a.name == name) {
                attr.value = value.to_string();
            } else {
                attrs.push(XAttribute::new(name.clone(), value));
            }
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &XName) {
        if let Some(attrs) = self.get_mut(id).and_then(|n| n.attributes_mut()) {
            attrs.retain(|a| &a.name != name);
        }
    }

    pub fn attribute(&self, id: NodeId, name: &XName) -> Option<&str> {
        self.get(id)?.attribute(name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.parent()
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        parent.children(&self.arena)
    }

    pub fn first_child(&self, parent: NodeId) -> Option<NodeId> {
        self.arena.get(parent)?.first_child()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.next_sibling()
    }

    /// Ancestors from `id`'s parent upward to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena).skip(1)
    }

    /// Depth-first over `id` and its subtree.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Depth-first over `id` and its subtree, but does not descend into
    /// nodes matched by `stop`: the matched node itself is yielded, then
    /// iteration continues at its next sibling.
    pub fn descendants_trimmed<'a, F>(
        &'a self,
        id: NodeId,
        stop: F,
    ) -> impl Iterator<Item = NodeId> + 'a
    where
        F: Fn(&XmlNode) -> bool + 'a,
    {
        DescendantsTrimmed {
            tree: self,
            stack: vec![id],
            stop,
        }
    }

    pub fn name(&self, id: NodeId) -> Option<&XName> {
        self.get(id)?.name()
    }

    pub fn is_named(&self, id: NodeId, name: &XName) -> bool {
        self.name(id) == Some(name)
    }

    /// Direct children that are elements with the given name.
    pub fn children_named<'a>(
        &'a self,
        parent: NodeId,
        name: &'a XName,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent)
            .filter(move |&child| self.is_named(child, name))
    }

    pub fn child_named(&self, parent: NodeId, name: &XName) -> Option<NodeId> {
        self.children(parent).find(|&child| self.is_named(child, name))
    }

    /// Concatenated text of direct text/CDATA children.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            if let Some(text) = self.get(child).and_then(|n| n.text_content()) {
                out.push_str(text);
            }
        }
        out
    }

    /// Deep-copies a subtree from another tree into this one, detached.
    /// Attach the returned node afterwards. Iterative; safe on deep trees.
    pub fn import_subtree(&mut self, source: &XmlTree, source_root: NodeId) -> NodeId {
        let data = source
            .get(source_root)
            .expect("source node must exist")
            .clone();
        let new_root = self.new_node(data);
        let mut stack: Vec<(NodeId, NodeId)> = vec![(source_root, new_root)];
        while let Some((src, dst)) = stack.pop() {
            let children: Vec<NodeId> = source.children(src).collect();
            for child in children {
                let child_data = source.get(child).expect("source child must exist").clone();
                let new_child = self.add_child(dst, child_data);
                stack.push((child, new_child));
            }
        }
        new_root
    }
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

struct DescendantsTrimmed<'a, F>
where
    F: Fn(&XmlNode) -> bool,
{
    tree: &'a XmlTree,
    stack: Vec<NodeId>,
    stop: F,
}

impl<'a, F> Iterator for DescendantsTrimmed<'a, F>
where
    F: Fn(&XmlNode) -> bool,
{
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(data) = self.tree.get(current) {
            if !(self.stop)(data) {
                let children: Vec<NodeId> = self.tree.children(current).collect();
                for child in children.into_iter().rev() {
                    self.stack.push(child);
                }
            }
        }
        Some(current)
    }
}
