//! Construction frames and the forest that owns them.
//!
//! Invariants:
//! - A frame's `parent` is the frame that was current when it opened; roots have none.
//! - `children` is in open order and never grows after the frame ended.
//! - `elements` is append-only while the frame is open.
//! - `nodes` holds every attributed node (elements, text, comments) in attribution
//!   order; `elements` is its element subsequence.
//! - `state` only moves forward: open -> ended -> completed.

use core_types::{FrameId, NodeKey};
use std::collections::HashMap;
use std::fmt;

/// Which intercepted operation a frame tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Creation,
    Clone,
    ReplaceContents,
    InsertMarkup,
    Upgrade,
    Parser,
    Predictive,
}

impl FrameKind {
    pub fn label(self) -> &'static str {
        match self {
            FrameKind::Creation => "Creation",
            FrameKind::Clone => "Clone",
            FrameKind::ReplaceContents => "InnerHTML",
            FrameKind::InsertMarkup => "InsertAdjacentHTML",
            FrameKind::Upgrade => "Upgrade",
            FrameKind::Parser => "Parser",
            FrameKind::Predictive => "Predictive",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameState {
    Open,
    Ended,
    Completed,
}

impl FrameState {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameState::Open => "open",
            FrameState::Ended => "ended",
            FrameState::Completed => "completed",
        }
    }
}

#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) id: FrameId,
    pub(crate) kind: FrameKind,
    pub(crate) parent: Option<FrameId>,
    pub(crate) children: Vec<FrameId>,
    pub(crate) elements: Vec<NodeKey>,
    pub(crate) nodes: Vec<NodeKey>,
    pub(crate) state: FrameState,
}

impl Frame {
    /// Moves the state forward. Returns `false` (and changes nothing) on a backward or
    /// repeated transition.
    pub(crate) fn advance(&mut self, next: FrameState) -> bool {
        if next <= self.state {
            return false;
        }
        self.state = next;
        true
    }
}

#[derive(Debug, Default)]
pub(crate) struct FrameForest {
    frames: HashMap<FrameId, Frame>,
    next_id: u32,
}

impl FrameForest {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, kind: FrameKind, parent: Option<FrameId>) -> FrameId {
        self.next_id += 1;
        let id = FrameId(self.next_id);
        self.frames.insert(
            id,
            Frame {
                id,
                kind,
                parent,
                children: Vec::new(),
                elements: Vec::new(),
                nodes: Vec::new(),
                state: FrameState::Open,
            },
        );
        if let Some(parent) = parent.and_then(|p| self.frames.get_mut(&p)) {
            parent.children.push(id);
        }
        id
    }

    pub(crate) fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.frames.get_mut(&id)
    }

    pub(crate) fn view(&self, id: FrameId) -> Option<FrameRef<'_>> {
        self.frames.get(&id).map(|frame| FrameRef {
            forest: self,
            frame,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    /// `id` and all of its descendants, depth-first pre-order.
    pub(crate) fn preorder(&self, id: FrameId) -> Vec<FrameId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(frame) = self.frames.get(&current) else {
                continue;
            };
            out.push(current);
            stack.extend(frame.children.iter().rev().copied());
        }
        out
    }

    /// Drops `id` and its subtree, unlinking it from its parent.
    pub(crate) fn remove_subtree(&mut self, id: FrameId) -> Vec<Frame> {
        let parent = self.frames.get(&id).and_then(|f| f.parent);
        if let Some(parent) = parent.and_then(|p| self.frames.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        self.preorder(id)
            .into_iter()
            .filter_map(|f| self.frames.remove(&f))
            .collect()
    }
}

/// Borrowed, read-only view of a frame.
#[derive(Clone, Copy)]
pub struct FrameRef<'a> {
    forest: &'a FrameForest,
    frame: &'a Frame,
}

impl<'a> FrameRef<'a> {
    pub fn id(&self) -> FrameId {
        self.frame.id
    }

    pub fn kind(&self) -> FrameKind {
        self.frame.kind
    }

    pub fn label(&self) -> &'static str {
        self.frame.kind.label()
    }

    pub fn state(&self) -> FrameState {
        self.frame.state
    }

    pub fn is_root(&self) -> bool {
        self.frame.parent.is_none()
    }

    pub fn parent(&self) -> Option<FrameRef<'a>> {
        self.frame.parent.and_then(|p| self.forest.view(p))
    }

    pub fn children(&self) -> impl Iterator<Item = FrameRef<'a>> + 'a {
        let forest = self.forest;
        let frame: &'a Frame = self.frame;
        frame.children.iter().filter_map(move |c| forest.view(*c))
    }

    pub fn elements(&self) -> &'a [NodeKey] {
        let frame: &'a Frame = self.frame;
        &frame.elements
    }

    /// Every node the frame produced, elements included, in document order.
    pub fn nodes(&self) -> &'a [NodeKey] {
        let frame: &'a Frame = self.frame;
        &frame.nodes
    }

    pub fn root(&self) -> FrameRef<'a> {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
}

impl fmt::Display for FrameRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent() {
            write!(f, "{parent}, ")?;
        }
        write!(f, "{}#{}", self.label(), self.state().as_str())
    }
}

impl fmt::Debug for FrameRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRef")
            .field("id", &self.frame.id)
            .field("kind", &self.frame.kind)
            .field("state", &self.frame.state)
            .field("elements", &self.frame.elements)
            .field("nodes", &self.frame.nodes.len())
            .finish()
    }
}
