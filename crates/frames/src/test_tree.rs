//! Minimal in-memory tree for unit tests.

use crate::tree::TreeView;
use core_types::NodeKey;

struct Record {
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    element: bool,
}

pub(crate) struct TestTree {
    nodes: Vec<Record>,
}

impl TestTree {
    pub(crate) fn new() -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.push(false);
        tree
    }

    pub(crate) fn root(&self) -> NodeKey {
        NodeKey(1)
    }

    fn push(&mut self, element: bool) -> NodeKey {
        self.nodes.push(Record {
            parent: None,
            children: Vec::new(),
            element,
        });
        NodeKey(self.nodes.len() as u32)
    }

    fn rec(&self, key: NodeKey) -> &Record {
        &self.nodes[key.0 as usize - 1]
    }

    fn rec_mut(&mut self, key: NodeKey) -> &mut Record {
        &mut self.nodes[key.0 as usize - 1]
    }

    pub(crate) fn element(&mut self, parent: NodeKey) -> NodeKey {
        let index = self.rec(parent).children.len();
        self.insert(parent, index, true)
    }

    pub(crate) fn text(&mut self, parent: NodeKey) -> NodeKey {
        let index = self.rec(parent).children.len();
        self.insert(parent, index, false)
    }

    pub(crate) fn insert(&mut self, parent: NodeKey, index: usize, element: bool) -> NodeKey {
        let key = self.push(element);
        self.rec_mut(parent).children.insert(index, key);
        self.rec_mut(key).parent = Some(parent);
        key
    }

    pub(crate) fn detached(&mut self) -> NodeKey {
        self.push(true)
    }

    fn siblings(&self, node: NodeKey) -> Option<(&[NodeKey], usize)> {
        let parent = self.rec(node).parent?;
        let children = &self.rec(parent).children;
        let index = children.iter().position(|c| *c == node)?;
        Some((children, index))
    }
}

impl TreeView for TestTree {
    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.rec(node).parent
    }

    fn first_child(&self, node: NodeKey) -> Option<NodeKey> {
        self.rec(node).children.first().copied()
    }

    fn last_child(&self, node: NodeKey) -> Option<NodeKey> {
        self.rec(node).children.last().copied()
    }

    fn previous_sibling(&self, node: NodeKey) -> Option<NodeKey> {
        let (children, index) = self.siblings(node)?;
        index.checked_sub(1).map(|i| children[i])
    }

    fn next_sibling(&self, node: NodeKey) -> Option<NodeKey> {
        let (children, index) = self.siblings(node)?;
        children.get(index + 1).copied()
    }

    fn is_element(&self, node: NodeKey) -> bool {
        self.rec(node).element
    }

    fn is_connected(&self, node: NodeKey) -> bool {
        let mut current = node;
        while let Some(parent) = self.rec(current).parent {
            current = parent;
        }
        current == self.root()
    }
}
