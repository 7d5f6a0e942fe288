//! Read-only view of the host tree.
//!
//! The engine never mutates the tree. Adapters snapshot it before a primitive runs
//! and read it again afterwards; everything else (document order, containment,
//! subtree walks) is derived from these links in `traverse`.

use core_types::NodeKey;

pub trait TreeView {
    fn parent(&self, node: NodeKey) -> Option<NodeKey>;
    fn first_child(&self, node: NodeKey) -> Option<NodeKey>;
    fn last_child(&self, node: NodeKey) -> Option<NodeKey>;
    fn previous_sibling(&self, node: NodeKey) -> Option<NodeKey>;
    fn next_sibling(&self, node: NodeKey) -> Option<NodeKey>;
    fn is_element(&self, node: NodeKey) -> bool;

    /// Whether `node` is reachable from the document root.
    fn is_connected(&self, node: NodeKey) -> bool;
}
