//! Operation adapters: the before/after halves of every intercepted primitive.
//!
//! `ConstructionTracker::intercept` captures the boundary a primitive is about to
//! disturb and opens the frame; the host then runs the real primitive (which may
//! re-enter the tracker any number of times); `ConstructionTracker::settle` diffs the
//! tree against the captured boundary and attributes what the primitive produced.

use crate::frame::FrameKind;
use crate::traverse::{descendant_nodes, sibling_span_nodes, subtree_nodes};
use crate::tree::TreeView;
use core_types::{FrameId, NodeKey};

/// Where `insert_adjacent_html`-style markup lands relative to its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPosition {
    BeforeBegin,
    AfterBegin,
    BeforeEnd,
    AfterEnd,
}

impl InsertPosition {
    /// Parses the DOM position keywords, ignoring ASCII case.
    pub fn parse(value: &str) -> Option<Self> {
        const POSITIONS: [(&str, InsertPosition); 4] = [
            ("beforebegin", InsertPosition::BeforeBegin),
            ("afterbegin", InsertPosition::AfterBegin),
            ("beforeend", InsertPosition::BeforeEnd),
            ("afterend", InsertPosition::AfterEnd),
        ];
        POSITIONS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(value))
            .map(|(_, position)| *position)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InsertPosition::BeforeBegin => "beforebegin",
            InsertPosition::AfterBegin => "afterbegin",
            InsertPosition::BeforeEnd => "beforeend",
            InsertPosition::AfterEnd => "afterend",
        }
    }

    /// Whether the markup becomes a sibling of the anchor rather than a child.
    pub fn is_outside(self) -> bool {
        matches!(self, InsertPosition::BeforeBegin | InsertPosition::AfterEnd)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Clone { deep: bool },
    ReplaceContents { container: NodeKey },
    InsertMarkup {
        anchor: NodeKey,
        position: InsertPosition,
    },
}

impl Operation {
    pub fn kind(&self) -> FrameKind {
        match self {
            Operation::Create => FrameKind::Creation,
            Operation::Clone { .. } => FrameKind::Clone,
            Operation::ReplaceContents { .. } => FrameKind::ReplaceContents,
            Operation::InsertMarkup { .. } => FrameKind::InsertMarkup,
        }
    }
}

/// What the real primitive did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The primitive returned a new node (creation, cloning).
    Produced(NodeKey),
    /// The primitive mutated the tree in place (markup insertion or replacement).
    Applied,
    /// The primitive failed; the frame ends with no elements.
    Failed,
}

/// Anchor neighbours captured before the primitive runs; insertion invalidates them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Boundary {
    previous_sibling: Option<NodeKey>,
    next_sibling: Option<NodeKey>,
    first_child: Option<NodeKey>,
    last_child: Option<NodeKey>,
}

/// An open adapter frame. Hand it back to `settle` exactly once.
#[must_use = "an interception must be settled or its frame stays open"]
#[derive(Debug)]
pub struct Interception {
    pub(crate) frame: FrameId,
    op: Operation,
    boundary: Boundary,
}

impl Interception {
    pub(crate) fn capture<T: TreeView + ?Sized>(frame: FrameId, op: Operation, tree: &T) -> Self {
        let boundary = match op {
            Operation::InsertMarkup { anchor, .. } => Boundary {
                previous_sibling: tree.previous_sibling(anchor),
                next_sibling: tree.next_sibling(anchor),
                first_child: tree.first_child(anchor),
                last_child: tree.last_child(anchor),
            },
            _ => Boundary::default(),
        };
        Self {
            frame,
            op,
            boundary,
        }
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn operation(&self) -> Operation {
        self.op
    }

    /// Elements the primitive produced, in document order.
    #[cfg(test)]
    pub(crate) fn produced<T: TreeView + ?Sized>(&self, tree: &T, outcome: Outcome) -> Vec<NodeKey> {
        self.produced_nodes(tree, outcome)
            .into_iter()
            .filter(|node| tree.is_element(*node))
            .collect()
    }

    /// Every node the primitive produced (text and comments included), in document
    /// order.
    pub(crate) fn produced_nodes<T: TreeView + ?Sized>(
        &self,
        tree: &T,
        outcome: Outcome,
    ) -> Vec<NodeKey> {
        match (self.op, outcome) {
            (_, Outcome::Failed) => Vec::new(),
            (Operation::Create, Outcome::Produced(node))
            | (Operation::Clone { deep: false }, Outcome::Produced(node)) => vec![node],
            (Operation::Clone { deep: true }, Outcome::Produced(node)) => subtree_nodes(tree, node),
            (Operation::ReplaceContents { container }, Outcome::Applied) => {
                descendant_nodes(tree, container)
            }
            (Operation::InsertMarkup { anchor, position }, Outcome::Applied) => {
                let (first, stop) = self.inserted_span(tree, anchor, position);
                sibling_span_nodes(tree, first, stop)
            }
            (op, outcome) => {
                log::warn!(target: "frames.adapter", "{op:?} settled with unexpected {outcome:?}");
                Vec::new()
            }
        }
    }

    /// First inserted sibling and the node the span stops at.
    fn inserted_span<T: TreeView + ?Sized>(
        &self,
        tree: &T,
        anchor: NodeKey,
        position: InsertPosition,
    ) -> (Option<NodeKey>, Option<NodeKey>) {
        let b = &self.boundary;
        match position {
            InsertPosition::BeforeBegin => {
                let first = b
                    .previous_sibling
                    .and_then(|p| tree.next_sibling(p))
                    .or_else(|| tree.parent(anchor).and_then(|p| tree.first_child(p)));
                (first, Some(anchor))
            }
            InsertPosition::AfterEnd => (tree.next_sibling(anchor), b.next_sibling),
            InsertPosition::AfterBegin => (tree.first_child(anchor), b.first_child),
            InsertPosition::BeforeEnd => {
                let first = b
                    .last_child
                    .and_then(|l| tree.next_sibling(l))
                    .or_else(|| match b.last_child {
                        Some(_) => None,
                        None => tree.first_child(anchor),
                    });
                (first, None)
            }
        }
    }
}
