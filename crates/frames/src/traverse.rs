//! Iterative tree walks over a [`TreeView`].
//!
//! Every walk runs to completion and returns an owned `Vec`, so results stay valid
//! while the caller goes on to mutate frame state.

use crate::tree::TreeView;
use core_types::NodeKey;
use std::collections::HashSet;

/// Position of `b` relative to `a`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Same,
    /// `b` is an ancestor of `a`.
    Contains,
    /// `b` is a descendant of `a`.
    ContainedBy,
    Preceding,
    Following,
    /// `a` and `b` do not share a root.
    Disconnected,
}

/// Which nodes a walk yields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Yield {
    Elements,
    Nodes,
}

/// `root` (when it is an element) followed by its descendant elements, pre-order.
pub fn subtree_elements<T: TreeView + ?Sized>(tree: &T, root: NodeKey) -> Vec<NodeKey> {
    let mut out = Vec::new();
    walk(tree, root, Yield::Elements, |_| false, &mut out);
    out
}

/// `root` followed by every descendant node (text and comments included), pre-order.
pub fn subtree_nodes<T: TreeView + ?Sized>(tree: &T, root: NodeKey) -> Vec<NodeKey> {
    let mut out = Vec::new();
    walk(tree, root, Yield::Nodes, |_| false, &mut out);
    out
}

/// Descendant elements of `root`, pre-order, excluding `root`.
pub fn descendant_elements<T: TreeView + ?Sized>(tree: &T, root: NodeKey) -> Vec<NodeKey> {
    descendants(tree, root, Yield::Elements)
}

/// Descendant nodes of `root`, pre-order, excluding `root`.
pub fn descendant_nodes<T: TreeView + ?Sized>(tree: &T, root: NodeKey) -> Vec<NodeKey> {
    descendants(tree, root, Yield::Nodes)
}

fn descendants<T: TreeView + ?Sized>(tree: &T, root: NodeKey, what: Yield) -> Vec<NodeKey> {
    let mut out = Vec::new();
    let mut child = tree.first_child(root);
    while let Some(node) = child {
        walk(tree, node, what, |_| false, &mut out);
        child = tree.next_sibling(node);
    }
    out
}

/// Like [`subtree_elements`], but never enters a child listed in `skip`.
///
/// `root` itself is always yielded, even when it is part of `skip`.
pub fn subtree_elements_with_skips<T: TreeView + ?Sized>(
    tree: &T,
    root: NodeKey,
    skip: &HashSet<NodeKey>,
) -> Vec<NodeKey> {
    let mut out = Vec::new();
    walk(tree, root, Yield::Elements, |node| skip.contains(&node), &mut out);
    out
}

/// Node counterpart of [`subtree_elements_with_skips`].
pub fn subtree_nodes_with_skips<T: TreeView + ?Sized>(
    tree: &T,
    root: NodeKey,
    skip: &HashSet<NodeKey>,
) -> Vec<NodeKey> {
    let mut out = Vec::new();
    walk(tree, root, Yield::Nodes, |node| skip.contains(&node), &mut out);
    out
}

/// Subtree elements of each sibling from `first` up to (not including) `stop`.
///
/// With `stop == None` the span runs to the last sibling.
pub fn sibling_span_elements<T: TreeView + ?Sized>(
    tree: &T,
    first: Option<NodeKey>,
    stop: Option<NodeKey>,
) -> Vec<NodeKey> {
    sibling_span(tree, first, stop, Yield::Elements)
}

/// Every node of each sibling's subtree from `first` up to (not including) `stop`.
pub fn sibling_span_nodes<T: TreeView + ?Sized>(
    tree: &T,
    first: Option<NodeKey>,
    stop: Option<NodeKey>,
) -> Vec<NodeKey> {
    sibling_span(tree, first, stop, Yield::Nodes)
}

fn sibling_span<T: TreeView + ?Sized>(
    tree: &T,
    first: Option<NodeKey>,
    stop: Option<NodeKey>,
    what: Yield,
) -> Vec<NodeKey> {
    let mut out = Vec::new();
    let mut cursor = first;
    while let Some(node) = cursor {
        if Some(node) == stop {
            break;
        }
        if what == Yield::Nodes || tree.is_element(node) {
            walk(tree, node, what, |_| false, &mut out);
        }
        cursor = tree.next_sibling(node);
    }
    out
}

fn walk<T, F>(tree: &T, root: NodeKey, what: Yield, mut skip: F, out: &mut Vec<NodeKey>)
where
    T: TreeView + ?Sized,
    F: FnMut(NodeKey) -> bool,
{
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if what == Yield::Nodes || tree.is_element(node) {
            out.push(node);
        }
        // Children go on in reverse so the first child is visited next.
        let mut child = tree.last_child(node);
        while let Some(c) = child {
            if !skip(c) {
                stack.push(c);
            }
            child = tree.previous_sibling(c);
        }
    }
}

/// Strict ancestry: `ancestor != node` and `ancestor` lies on `node`'s parent chain.
pub fn is_ancestor<T: TreeView + ?Sized>(tree: &T, ancestor: NodeKey, node: NodeKey) -> bool {
    let mut cursor = tree.parent(node);
    while let Some(p) = cursor {
        if p == ancestor {
            return true;
        }
        cursor = tree.parent(p);
    }
    false
}

/// Inclusive ancestors of `node`, root first.
fn ancestry<T: TreeView + ?Sized>(tree: &T, node: NodeKey) -> Vec<NodeKey> {
    let mut path = vec![node];
    let mut cursor = tree.parent(node);
    while let Some(p) = cursor {
        path.push(p);
        cursor = tree.parent(p);
    }
    path.reverse();
    path
}

pub fn compare<T: TreeView + ?Sized>(tree: &T, a: NodeKey, b: NodeKey) -> Relation {
    if a == b {
        return Relation::Same;
    }
    let path_a = ancestry(tree, a);
    let path_b = ancestry(tree, b);
    if path_a[0] != path_b[0] {
        return Relation::Disconnected;
    }
    let shared = path_a
        .iter()
        .zip(path_b.iter())
        .take_while(|(x, y)| x == y)
        .count();
    if shared == path_a.len() {
        return Relation::ContainedBy;
    }
    if shared == path_b.len() {
        return Relation::Contains;
    }
    // Diverging children of the same parent: scan forward from a's branch.
    let branch_a = path_a[shared];
    let branch_b = path_b[shared];
    let mut cursor = tree.next_sibling(branch_a);
    while let Some(n) = cursor {
        if n == branch_b {
            return Relation::Following;
        }
        cursor = tree.next_sibling(n);
    }
    Relation::Preceding
}

/// Stable sort into document order. Nodes under different roots are grouped by root.
pub fn sort_document_order<T: TreeView + ?Sized>(tree: &T, nodes: &mut Vec<NodeKey>) {
    let mut keyed: Vec<((NodeKey, Vec<u32>), NodeKey)> = nodes
        .iter()
        .map(|&n| (position_key(tree, n), n))
        .collect();
    keyed.sort_by(|x, y| x.0.cmp(&y.0));
    nodes.clear();
    nodes.extend(keyed.into_iter().map(|(_, n)| n));
}

fn position_key<T: TreeView + ?Sized>(tree: &T, node: NodeKey) -> (NodeKey, Vec<u32>) {
    let mut indices = Vec::new();
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        let mut index = 0u32;
        let mut sibling = tree.previous_sibling(current);
        while let Some(s) = sibling {
            index += 1;
            sibling = tree.previous_sibling(s);
        }
        indices.push(index);
        current = parent;
    }
    indices.reverse();
    (current, indices)
}
