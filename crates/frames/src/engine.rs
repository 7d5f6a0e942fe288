//! The construction tracker: the single owner of all frame state.
//!
//! Hosts keep one tracker per document and route every intercepted primitive,
//! element initializer and parser boundary through it. Contract violations (ending the
//! wrong frame, attributing to an ended one) are refused and logged; they never reach
//! the caller of the wrapped primitive.

use crate::adapter::{Interception, Operation, Outcome};
use crate::error::FrameError;
use crate::frame::FrameRef;
use crate::observer::{Lifecycle, ObserverId};
use crate::predictive::{BoundarySignal, PredictiveReconciler};
use crate::stack::FrameStack;
use crate::tree::TreeView;
use crate::upgrade::UpgradeChainer;
use core_types::{FrameId, NodeKey};
use std::collections::HashSet;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Open speculative frames for parser-inserted elements while streaming.
    pub predictive: bool,
    /// Keep completed frame trees in memory for inspection instead of evicting them.
    pub retain_completed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            predictive: true,
            retain_completed: false,
        }
    }
}

/// Who took responsibility for a running initializer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitializerClaim {
    Upgrade,
    Speculative,
    /// Already covered by an open frame (or nothing to track).
    Untracked,
}

pub struct ConstructionTracker {
    stack: FrameStack,
    upgrades: UpgradeChainer,
    predictive: PredictiveReconciler,
    failed: HashSet<NodeKey>,
}

impl Default for ConstructionTracker {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn report(result: Result<(), FrameError>) {
    if let Err(err) = result {
        log::error!(target: "frames", "frame contract violation: {err}");
    }
}

impl ConstructionTracker {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            stack: FrameStack::new(config.retain_completed),
            upgrades: UpgradeChainer::new(),
            predictive: PredictiveReconciler::new(config.predictive),
            failed: HashSet::new(),
        }
    }

    /// Opens the frame for `op` and snapshots what the diff will need.
    pub fn intercept<T: TreeView + ?Sized>(&mut self, op: Operation, tree: &T) -> Interception {
        let frame = self.stack.open(op.kind());
        Interception::capture(frame, op, tree)
    }

    /// Attributes what the primitive produced and ends its frame. Elements a nested
    /// operation already claimed stay with that operation.
    pub fn settle<T: TreeView + ?Sized>(
        &mut self,
        interception: Interception,
        tree: &T,
        outcome: Outcome,
    ) -> FrameId {
        let frame = interception.frame;
        let nodes: Vec<NodeKey> = interception
            .produced_nodes(tree, outcome)
            .into_iter()
            .filter(|n| !self.failed.contains(n) && !self.stack.is_claimed(*n))
            .collect();
        log::debug!(
            target: "frames.adapter",
            "{:?} -> {outcome:?}, {} node(s)",
            interception.operation(),
            nodes.len()
        );
        for node in nodes {
            if tree.is_element(node) {
                report(self.stack.attribute(frame, node));
            } else {
                report(self.stack.attribute_node(frame, node));
            }
        }
        report(self.stack.end(frame));
        self.evict_failed();
        frame
    }

    /// Failed elements only matter until the operation that saw them fail has settled:
    /// the outermost frame, the define call or the stream.
    fn evict_failed(&mut self) {
        if self.failed.is_empty()
            || self.stack.current().is_some()
            || self.upgrades.is_defining()
            || self.predictive.is_active()
        {
            return;
        }
        log::trace!(target: "frames", "evicting {} failed element(s)", self.failed.len());
        self.failed.clear();
    }

    /// Starts tracking a define call for element type `name`.
    pub fn begin_define(&mut self, name: &str) -> FrameId {
        self.upgrades.begin(&mut self.stack, name)
    }

    pub fn end_define(&mut self, succeeded: bool) {
        if !succeeded {
            log::debug!(target: "frames.upgrade", "define failed; closing its chain");
        }
        report(self.upgrades.end(&mut self.stack, &self.failed));
        self.evict_failed();
    }

    /// Must run before the initializer body of every element of a defined type.
    pub fn element_initializing(&mut self, element: NodeKey) -> InitializerClaim {
        match self
            .upgrades
            .on_initializer(&mut self.stack, &self.failed, element)
        {
            Ok(true) => return InitializerClaim::Upgrade,
            Ok(false) => {}
            Err(err) => {
                report(Err(err));
                return InitializerClaim::Upgrade;
            }
        }
        if self.predictive.on_initializer(&mut self.stack, element) {
            return InitializerClaim::Speculative;
        }
        InitializerClaim::Untracked
    }

    /// The initializer of `element` failed; it is never attributed afterwards.
    pub fn initializer_failed(&mut self, element: NodeKey) {
        log::debug!(target: "frames", "initializer of {element} failed");
        self.failed.insert(element);
        self.predictive.on_failed(&mut self.stack, element);
    }

    /// Clears "current" when it is a speculative frame, leaving that frame open for its
    /// boundary. Any other current frame is kept. Returns whether one was released.
    pub fn drop_current(&mut self) -> bool {
        self.predictive.release_current(&mut self.stack)
    }

    pub fn stream_started(&mut self) {
        log::debug!(target: "frames.predictive", "stream started");
        self.predictive.start(&mut self.stack);
    }

    pub fn is_streaming(&self) -> bool {
        self.predictive.is_active()
    }

    /// Reconciles speculative frames with a parser boundary. Returns the catch-all
    /// parser frame, if one was opened.
    pub fn parser_boundary<T: TreeView + ?Sized>(
        &mut self,
        tree: &T,
        signal: &BoundarySignal,
    ) -> Option<FrameId> {
        match self
            .predictive
            .boundary(&mut self.stack, tree, &self.failed, signal)
        {
            Ok(frame) => frame,
            Err(err) => {
                report(Err(err));
                None
            }
        }
    }

    pub fn stream_finished<T: TreeView + ?Sized>(&mut self, tree: &T) {
        report(self.predictive.finish(&mut self.stack, tree, &self.failed));
        self.evict_failed();
        log::debug!(target: "frames.predictive", "stream finished");
    }

    pub fn observe<F>(&mut self, lifecycle: Lifecycle, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>, NodeKey) + 'static,
    {
        self.stack.observe(lifecycle, callback)
    }

    /// Subscribes to frame openings.
    pub fn on_start<F>(&mut self, mut callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>) + 'static,
    {
        self.observe(Lifecycle::Start, move |frame, _| callback(frame))
    }

    pub fn on_end<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>, NodeKey) + 'static,
    {
        self.observe(Lifecycle::End, callback)
    }

    pub fn on_complete<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>, NodeKey) + 'static,
    {
        self.observe(Lifecycle::Complete, callback)
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.stack.disconnect(id)
    }

    pub fn current(&self) -> Option<FrameRef<'_>> {
        self.stack.current().and_then(|id| self.stack.view(id))
    }

    pub fn frame(&self, id: FrameId) -> Option<FrameRef<'_>> {
        self.stack.view(id)
    }

    /// The live frame `node` was attributed to.
    pub fn owner_of(&self, node: NodeKey) -> Option<FrameRef<'_>> {
        self.stack
            .owner_of(node)
            .and_then(|id| self.stack.view(id))
    }

    /// Frames still held in memory (open, or completed and retained).
    pub fn live_frames(&self) -> usize {
        self.stack.live_frames()
    }

    pub fn is_defining(&self) -> bool {
        self.upgrades.is_defining()
    }

    #[cfg(test)]
    pub(crate) fn failed_len(&self) -> usize {
        self.failed.len()
    }
}
