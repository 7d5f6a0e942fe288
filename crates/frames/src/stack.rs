//! The frame stack: one "current" pointer, push/pop discipline, and the completion
//! cascade that runs when a root frame ends.

use crate::error::FrameError;
use crate::frame::{Frame, FrameForest, FrameKind, FrameRef, FrameState};
use crate::observer::{Lifecycle, ObserverId, ObserverRegistry};
use core_types::{FrameId, NodeKey};
use std::collections::{HashMap, HashSet};

pub(crate) struct FrameStack {
    forest: FrameForest,
    current: Option<FrameId>,
    observers: ObserverRegistry,
    retain_completed: bool,
    owners: HashMap<NodeKey, FrameId>,
    /// Every element attributed while claim tracking is on, even after its frame was
    /// evicted.
    claims: Option<HashSet<NodeKey>>,
}

impl FrameStack {
    pub(crate) fn new(retain_completed: bool) -> Self {
        Self {
            forest: FrameForest::new(),
            current: None,
            observers: ObserverRegistry::new(),
            retain_completed,
            owners: HashMap::new(),
            claims: None,
        }
    }

    pub(crate) fn current(&self) -> Option<FrameId> {
        self.current
    }

    pub(crate) fn view(&self, id: FrameId) -> Option<FrameRef<'_>> {
        self.forest.view(id)
    }

    pub(crate) fn live_frames(&self) -> usize {
        self.forest.len()
    }

    pub(crate) fn owner_of(&self, node: NodeKey) -> Option<FrameId> {
        self.owners.get(&node).copied()
    }

    pub(crate) fn has_children(&self, id: FrameId) -> bool {
        self.forest
            .get(id)
            .is_some_and(|frame| !frame.children.is_empty())
    }

    pub(crate) fn observe<F>(&mut self, lifecycle: Lifecycle, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>, NodeKey) + 'static,
    {
        self.observers.observe(lifecycle, callback)
    }

    pub(crate) fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.disconnect(id)
    }

    pub(crate) fn set_claim_tracking(&mut self, enabled: bool) {
        match (enabled, self.claims.is_some()) {
            (true, false) => self.claims = Some(HashSet::new()),
            (false, true) => self.claims = None,
            _ => {}
        }
    }

    pub(crate) fn is_claimed(&self, node: NodeKey) -> bool {
        self.owners.contains_key(&node)
            || self.claims.as_ref().is_some_and(|c| c.contains(&node))
    }

    /// Opens a frame under the current one, makes it current and notifies "start"
    /// observers.
    pub(crate) fn open(&mut self, kind: FrameKind) -> FrameId {
        let parent = self.current;
        let id = self.forest.insert(kind, parent);
        self.current = Some(id);
        log::trace!(target: "frames.stack", "open {id} {} (parent {parent:?})", kind.label());
        if !self.observers.is_empty(Lifecycle::Start) {
            if let Some(view) = self.forest.view(id) {
                self.observers.notify(Lifecycle::Start, view, NodeKey::INVALID);
            }
        }
        id
    }

    /// Appends `element` to an open frame and notifies "end" observers right away.
    pub(crate) fn attribute(&mut self, id: FrameId, element: NodeKey) -> Result<(), FrameError> {
        let frame = self
            .forest
            .get_mut(id)
            .ok_or(FrameError::UnknownFrame(id))?;
        if frame.state != FrameState::Open {
            return Err(FrameError::AlreadyEnded(id));
        }
        frame.elements.push(element);
        frame.nodes.push(element);
        self.owners.insert(element, id);
        if let Some(claims) = self.claims.as_mut() {
            claims.insert(element);
        }
        if let Some(view) = self.forest.view(id) {
            self.observers.notify(Lifecycle::End, view, element);
        }
        Ok(())
    }

    /// Records a non-element node (text, comment) on an open frame. No observer fires.
    pub(crate) fn attribute_node(&mut self, id: FrameId, node: NodeKey) -> Result<(), FrameError> {
        let frame = self
            .forest
            .get_mut(id)
            .ok_or(FrameError::UnknownFrame(id))?;
        if frame.state != FrameState::Open {
            return Err(FrameError::AlreadyEnded(id));
        }
        frame.nodes.push(node);
        self.owners.insert(node, id);
        if let Some(claims) = self.claims.as_mut() {
            claims.insert(node);
        }
        Ok(())
    }

    /// Ends the current frame and pops back to its parent.
    pub(crate) fn end(&mut self, id: FrameId) -> Result<(), FrameError> {
        self.check_open(id)?;
        if self.current != Some(id) {
            return Err(FrameError::NotCurrent {
                frame: id,
                current: self.current,
            });
        }
        self.finish(id);
        Ok(())
    }

    /// Ends a frame that may no longer be current (a speculative frame whose current
    /// status was already abandoned).
    pub(crate) fn end_detached(&mut self, id: FrameId) -> Result<(), FrameError> {
        self.check_open(id)?;
        self.finish(id);
        Ok(())
    }

    fn check_open(&self, id: FrameId) -> Result<(), FrameError> {
        let frame = self.forest.get(id).ok_or(FrameError::UnknownFrame(id))?;
        if frame.state != FrameState::Open {
            return Err(FrameError::AlreadyEnded(id));
        }
        Ok(())
    }

    fn finish(&mut self, id: FrameId) {
        let Some(frame) = self.forest.get_mut(id) else {
            return;
        };
        frame.advance(FrameState::Ended);
        let parent = frame.parent;
        if self.current == Some(id) {
            self.current = parent;
        }
        log::trace!(
            target: "frames.stack",
            "end {id} with {} element(s)",
            frame.elements.len()
        );
        if parent.is_none() {
            self.complete(id);
        }
    }

    /// Marks `root` and every descendant completed, notifying "complete" observers
    /// with each attributed element, pre-order.
    fn complete(&mut self, root: FrameId) {
        let order = self.forest.preorder(root);
        for id in &order {
            let Some(frame) = self.forest.get_mut(*id) else {
                continue;
            };
            if frame.state == FrameState::Open {
                log::warn!(target: "frames.stack", "completing {id} before it ended");
            }
            frame.advance(FrameState::Completed);
            if self.observers.is_empty(Lifecycle::Complete) {
                continue;
            }
            let Some(view) = self.forest.view(*id) else {
                continue;
            };
            for element in view.elements() {
                self.observers.notify(Lifecycle::Complete, view, *element);
            }
        }
        log::debug!(target: "frames.stack", "completed {root} ({} frame(s))", order.len());
        if !self.retain_completed {
            self.evict(root);
        }
    }

    /// Clears "current" without ending the frame it pointed at.
    pub(crate) fn abandon_current(&mut self) {
        if let Some(id) = self.current.take() {
            log::trace!(target: "frames.stack", "abandon {id}");
        }
    }

    /// Drops a frame and its subtree without any notification.
    pub(crate) fn discard(&mut self, id: FrameId) {
        let parent = self.forest.get(id).and_then(|f| f.parent);
        let removed = self.forest.remove_subtree(id);
        if self
            .current
            .is_some_and(|current| removed.iter().any(|f| f.id == current))
        {
            self.current = parent;
        }
        for frame in &removed {
            self.release_owners(frame);
        }
        log::trace!(target: "frames.stack", "discard {id} ({} frame(s))", removed.len());
    }

    fn evict(&mut self, root: FrameId) {
        for frame in self.forest.remove_subtree(root) {
            self.release_owners(&frame);
        }
    }

    fn release_owners(&mut self, frame: &Frame) {
        for node in &frame.nodes {
            if self.owners.get(node) == Some(&frame.id) {
                self.owners.remove(node);
            }
        }
    }
}
