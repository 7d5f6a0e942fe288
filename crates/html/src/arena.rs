//! Node arena backing a [`Document`](crate::Document).
//!
//! Nodes are never freed: removal only detaches a subtree, so a `NodeKey` stays valid
//! (and keeps its identity for attribution) for the arena's whole lifetime.

use crate::error::DomError;
use crate::tokenizer::is_void_element;
use core_types::NodeKey;
use frames::TreeView;

pub type Attributes = Vec<(String, Option<String>)>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document { doctype: Option<String> },
    Element { name: String, attributes: Attributes },
    Text { text: String },
    Comment { text: String },
}

#[derive(Debug)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl NodeRecord {
    fn allows_children(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Document { .. } | NodeKind::Element { .. }
        )
    }
}

#[derive(Debug)]
pub struct NodeArena {
    nodes: Vec<NodeRecord>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    /// A fresh arena holding only the document node.
    pub fn new() -> Self {
        let mut arena = Self { nodes: Vec::new() };
        arena.push(NodeKind::Document { doctype: None });
        arena
    }

    pub fn document(&self) -> NodeKey {
        NodeKey(1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, kind: NodeKind) -> NodeKey {
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeKey(self.nodes.len() as u32)
    }

    fn record(&self, key: NodeKey) -> Option<&NodeRecord> {
        if !key.is_valid() {
            return None;
        }
        self.nodes.get(key.0 as usize - 1)
    }

    fn record_mut(&mut self, key: NodeKey) -> Result<&mut NodeRecord, DomError> {
        if !key.is_valid() {
            return Err(DomError::UnknownNode(key));
        }
        self.nodes
            .get_mut(key.0 as usize - 1)
            .ok_or(DomError::UnknownNode(key))
    }

    fn live(&self, key: NodeKey) -> Result<&NodeRecord, DomError> {
        self.record(key).ok_or(DomError::UnknownNode(key))
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.record(key).is_some()
    }

    pub fn create_element(&mut self, name: &str, attributes: Attributes) -> NodeKey {
        self.push(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes,
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeKey {
        self.push(NodeKind::Text { text: text.into() })
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeKey {
        self.push(NodeKind::Comment { text: text.into() })
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.record(key).map(|r| &r.kind)
    }

    pub fn element_name(&self, key: NodeKey) -> Option<&str> {
        match self.kind(key)? {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        let NodeKind::Element { attributes, .. } = self.kind(key)? else {
            return None;
        };
        attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn set_attribute(
        &mut self,
        key: NodeKey,
        name: &str,
        value: Option<String>,
    ) -> Result<(), DomError> {
        let NodeKind::Element { attributes, .. } = &mut self.record_mut(key)?.kind else {
            return Err(DomError::WrongNodeKind(key));
        };
        let name = name.to_ascii_lowercase();
        match attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => attributes.push((name, value)),
        }
        Ok(())
    }

    pub fn set_doctype(&mut self, value: String) {
        let document = self.document();
        if let Ok(NodeRecord {
            kind: NodeKind::Document { doctype },
            ..
        }) = self.record_mut(document)
        {
            *doctype = Some(value);
        }
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.record(key).map_or(&[], |r| r.children.as_slice())
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Moves `child` under `parent`, before `reference` (or last). A child that already
    /// has a parent is detached first.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<(), DomError> {
        if !self.live(parent)?.allows_children()
            || matches!(self.live(child)?.kind, NodeKind::Document { .. })
            || self.is_inclusive_ancestor(child, parent)
        {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        let mut reference = reference;
        if let Some(r) = reference {
            if self.live(r)?.parent != Some(parent) {
                return Err(DomError::NotAChild { parent, child: r });
            }
            if r == child {
                reference = self.next_sibling(child);
            }
        }
        self.detach(child)?;
        let siblings = &mut self.record_mut(parent)?.children;
        let index = reference
            .and_then(|r| siblings.iter().position(|k| *k == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.record_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detaches `node` from its parent. Removing a parentless node is a no-op.
    pub fn remove(&mut self, node: NodeKey) -> Result<(), DomError> {
        self.live(node)?;
        self.detach(node)
    }

    pub fn clear_children(&mut self, parent: NodeKey) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.record_mut(parent)?.children);
        for child in children {
            self.record_mut(child)?.parent = None;
        }
        Ok(())
    }

    fn detach(&mut self, node: NodeKey) -> Result<(), DomError> {
        let Some(parent) = self.record_mut(node)?.parent.take() else {
            return Ok(());
        };
        self.record_mut(parent)?.children.retain(|k| *k != node);
        Ok(())
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.record(current).and_then(|r| r.parent);
        }
        false
    }

    /// Copies `node` (and, when `deep`, its whole subtree) into a new detached tree.
    pub fn deep_clone(&mut self, node: NodeKey, deep: bool) -> Result<NodeKey, DomError> {
        let root_kind = self.live(node)?.kind.clone();
        let root = self.push(root_kind);
        if !deep {
            return Ok(root);
        }
        let mut stack: Vec<(NodeKey, NodeKey)> = vec![(node, root)];
        while let Some((source, copy)) = stack.pop() {
            let children = self.live(source)?.children.clone();
            for child in children {
                let kind = self.live(child)?.kind.clone();
                let child_copy = self.push(kind);
                self.record_mut(copy)?.children.push(child_copy);
                self.record_mut(child_copy)?.parent = Some(copy);
                stack.push((child, child_copy));
            }
        }
        Ok(root)
    }

    /// Outer markup of `node`; the document serializes as its children.
    pub fn serialize(&self, node: NodeKey) -> String {
        enum Step {
            Open(NodeKey),
            Close(NodeKey),
        }
        let mut out = String::new();
        let mut stack = vec![Step::Open(node)];
        while let Some(step) = stack.pop() {
            let (key, record) = match step {
                Step::Close(key) => {
                    if let Some(name) = self.element_name(key) {
                        out.push_str("</");
                        out.push_str(name);
                        out.push('>');
                    }
                    continue;
                }
                Step::Open(key) => match self.record(key) {
                    Some(record) => (key, record),
                    None => continue,
                },
            };
            match &record.kind {
                NodeKind::Document { .. } => {}
                NodeKind::Element { name, attributes } => {
                    out.push('<');
                    out.push_str(name);
                    for (k, v) in attributes {
                        out.push(' ');
                        out.push_str(k);
                        if let Some(v) = v {
                            out.push_str("=\"");
                            out.push_str(&v.replace('"', "&quot;"));
                            out.push('"');
                        }
                    }
                    out.push('>');
                    if is_void_element(name) {
                        continue;
                    }
                    stack.push(Step::Close(key));
                }
                NodeKind::Text { text } => {
                    out.push_str(text);
                    continue;
                }
                NodeKind::Comment { text } => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                    continue;
                }
            }
            for child in record.children.iter().rev() {
                stack.push(Step::Open(*child));
            }
        }
        out
    }

    fn sibling(&self, node: NodeKey, offset: isize) -> Option<NodeKey> {
        let parent = self.record(node)?.parent?;
        let siblings = &self.record(parent)?.children;
        let index = siblings.iter().position(|k| *k == node)?;
        let target = index.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }
}

impl TreeView for NodeArena {
    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.record(node)?.parent
    }

    fn first_child(&self, node: NodeKey) -> Option<NodeKey> {
        self.record(node)?.children.first().copied()
    }

    fn last_child(&self, node: NodeKey) -> Option<NodeKey> {
        self.record(node)?.children.last().copied()
    }

    fn previous_sibling(&self, node: NodeKey) -> Option<NodeKey> {
        self.sibling(node, -1)
    }

    fn next_sibling(&self, node: NodeKey) -> Option<NodeKey> {
        self.sibling(node, 1)
    }

    fn is_element(&self, node: NodeKey) -> bool {
        matches!(self.kind(node), Some(NodeKind::Element { .. }))
    }

    fn is_connected(&self, node: NodeKey) -> bool {
        self.is_inclusive_ancestor(self.document(), node)
    }
}
