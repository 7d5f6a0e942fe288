//! Upgrade chaining for element type definitions.
//!
//! One define call may synchronously run the initializer of every existing element of
//! that type. The chainer opens an `Upgrade` frame when the call starts, binds it to the
//! first initialized element, and splits it for each further element, so N upgrades
//! leave N ended frames in document order.

use crate::error::FrameError;
use crate::frame::FrameKind;
use crate::stack::FrameStack;
use core_types::{FrameId, NodeKey};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
struct DefineScope {
    name: String,
    /// The chain frame currently collecting for this define call.
    frame: FrameId,
    /// Set until the first initializer of this call runs.
    awaiting_first: bool,
}

#[derive(Debug, Default)]
pub(crate) struct UpgradeChainer {
    scopes: Vec<DefineScope>,
    /// Chain frame -> the element it was opened for. Entries leave when the frame ends
    /// or is discarded.
    pending: HashMap<FrameId, NodeKey>,
}

impl UpgradeChainer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_defining(&self) -> bool {
        !self.scopes.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn begin(&mut self, stack: &mut FrameStack, name: &str) -> FrameId {
        let frame = stack.open(FrameKind::Upgrade);
        log::trace!(target: "frames.upgrade", "define {name} opened {frame}");
        self.scopes.push(DefineScope {
            name: name.to_string(),
            frame,
            awaiting_first: true,
        });
        frame
    }

    /// Claims an initializer for the chain if one is collecting. Returns `false` when
    /// the initializer does not belong to an upgrade.
    pub(crate) fn on_initializer(
        &mut self,
        stack: &mut FrameStack,
        failed: &HashSet<NodeKey>,
        element: NodeKey,
    ) -> Result<bool, FrameError> {
        let current = stack.current();
        if let Some(scope) = self.scopes.last_mut() {
            if scope.awaiting_first && current == Some(scope.frame) {
                scope.awaiting_first = false;
                self.pending.insert(scope.frame, element);
                return Ok(true);
            }
        }
        let Some(current) = current else {
            return Ok(false);
        };
        let Some(previous) = self.pending.remove(&current) else {
            return Ok(false);
        };
        close(stack, failed, current, previous)?;
        let next = stack.open(FrameKind::Upgrade);
        self.pending.insert(next, element);
        if let Some(scope) = self.scopes.iter_mut().rev().find(|s| s.frame == current) {
            log::trace!(
                target: "frames.upgrade",
                "define {} split {current} -> {next}",
                scope.name
            );
            scope.frame = next;
        }
        Ok(true)
    }

    /// Closes the innermost define call. A call that upgraded nothing leaves no frame.
    pub(crate) fn end(
        &mut self,
        stack: &mut FrameStack,
        failed: &HashSet<NodeKey>,
    ) -> Result<(), FrameError> {
        let Some(scope) = self.scopes.pop() else {
            log::warn!(target: "frames.upgrade", "define ended without a matching begin");
            return Ok(());
        };
        if scope.awaiting_first {
            log::trace!(
                target: "frames.upgrade",
                "define {} upgraded nothing; dropping {}",
                scope.name,
                scope.frame
            );
            stack.discard(scope.frame);
            return Ok(());
        }
        match self.pending.remove(&scope.frame) {
            Some(element) => close(stack, failed, scope.frame, element),
            None => stack.end(scope.frame),
        }
    }
}

/// Ends a chain frame with its element, or drops it when the element's initializer
/// failed.
fn close(
    stack: &mut FrameStack,
    failed: &HashSet<NodeKey>,
    frame: FrameId,
    element: NodeKey,
) -> Result<(), FrameError> {
    if !failed.contains(&element) {
        stack.attribute(frame, element)?;
        return stack.end(frame);
    }
    if stack.has_children(frame) {
        stack.end(frame)
    } else {
        stack.discard(frame);
        Ok(())
    }
}
