//! Reconciles speculative frames with the streaming parser's boundary signals.
//!
//! While a document streams in, an initializer may run with no frame open because the
//! parser itself inserted the element. The reconciler opens a speculative frame for
//! such an element right away, leaves it open until the parser reports that the
//! element's end tag was read, and only then walks its subtree. Everything the parser
//! finished that no speculative root covers is grouped into one catch-all frame per
//! signal.
//!
//! Invariants:
//! - `queue` is oldest-first, which is the order the parser opened the roots.
//! - A root stays in `roots` until the stream finishes, so an ancestor finalized later
//!   still skips the subtrees of its nested roots.

use crate::error::FrameError;
use crate::frame::FrameKind;
use crate::stack::FrameStack;
use crate::traverse::{is_ancestor, sort_document_order, subtree_nodes_with_skips};
use crate::tree::TreeView;
use core_types::{FrameId, NodeKey};
use std::collections::{HashSet, VecDeque};

/// Delivered by the streaming parser each time it yields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundarySignal {
    /// The node the parser appends to next. Every element that is neither this node
    /// nor one of its ancestors has had its end tag read.
    pub insertion_point: NodeKey,
    /// Nodes the parser finished since the previous signal, in any order.
    pub ended: Vec<NodeKey>,
}

#[derive(Debug, Default)]
pub(crate) struct PredictiveReconciler {
    active: bool,
    speculate: bool,
    queue: VecDeque<(FrameId, NodeKey)>,
    roots: HashSet<NodeKey>,
}

fn end_tag_read<T: TreeView + ?Sized>(tree: &T, element: NodeKey, insertion_point: NodeKey) -> bool {
    element != insertion_point && !is_ancestor(tree, element, insertion_point)
}

impl PredictiveReconciler {
    pub(crate) fn new(speculate: bool) -> Self {
        Self {
            speculate,
            ..Self::default()
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn start(&mut self, stack: &mut FrameStack) {
        self.active = true;
        stack.set_claim_tracking(true);
    }

    /// Opens a speculative frame for `element` if nothing else is tracking it.
    pub(crate) fn on_initializer(&mut self, stack: &mut FrameStack, element: NodeKey) -> bool {
        if !self.active || !self.speculate || stack.current().is_some() {
            return false;
        }
        let frame = stack.open(FrameKind::Predictive);
        log::trace!(target: "frames.predictive", "speculate {frame} for {element}");
        self.queue.push_back((frame, element));
        self.roots.insert(element);
        true
    }

    /// The initializer of `element` failed. If `element` owns the current speculative
    /// frame, that frame stops being current so later parser-created elements do not
    /// nest under it.
    pub(crate) fn on_failed(&mut self, stack: &mut FrameStack, element: NodeKey) {
        let Some(&(frame, root)) = self.queue.back() else {
            return;
        };
        if root == element && stack.current() == Some(frame) {
            log::trace!(target: "frames.predictive", "{element} failed; releasing {frame}");
            stack.abandon_current();
        }
    }

    /// Handles one parser boundary. Returns the catch-all frame, if one was needed.
    pub(crate) fn boundary<T: TreeView + ?Sized>(
        &mut self,
        stack: &mut FrameStack,
        tree: &T,
        failed: &HashSet<NodeKey>,
        signal: &BoundarySignal,
    ) -> Result<Option<FrameId>, FrameError> {
        if !self.active {
            log::warn!(target: "frames.predictive", "boundary signal outside a stream ignored");
            return Ok(None);
        }
        while let Some(&(frame, root)) = self.queue.front() {
            if !end_tag_read(tree, root, signal.insertion_point) {
                break;
            }
            self.queue.pop_front();
            self.finalize(stack, tree, failed, frame, root)?;
        }
        self.release_current(stack);

        let mut leftovers: Vec<NodeKey> = signal
            .ended
            .iter()
            .copied()
            .filter(|n| !failed.contains(n))
            .filter(|n| !self.is_covered(tree, *n) && !stack.is_claimed(*n))
            .collect();
        if leftovers.is_empty() {
            return Ok(None);
        }
        sort_document_order(tree, &mut leftovers);
        leftovers.dedup();
        let frame = stack.open(FrameKind::Parser);
        attribute_all(stack, tree, frame, leftovers)?;
        stack.end(frame)?;
        Ok(Some(frame))
    }

    /// Finalizes whatever is still queued (end of input closes every element) and
    /// deactivates.
    pub(crate) fn finish<T: TreeView + ?Sized>(
        &mut self,
        stack: &mut FrameStack,
        tree: &T,
        failed: &HashSet<NodeKey>,
    ) -> Result<(), FrameError> {
        let mut result = Ok(());
        while let Some((frame, root)) = self.queue.pop_front() {
            if let Err(err) = self.finalize(stack, tree, failed, frame, root) {
                result = Err(err);
            }
        }
        self.release_current(stack);
        self.roots.clear();
        self.active = false;
        stack.set_claim_tracking(false);
        result
    }

    fn finalize<T: TreeView + ?Sized>(
        &mut self,
        stack: &mut FrameStack,
        tree: &T,
        failed: &HashSet<NodeKey>,
        frame: FrameId,
        root: NodeKey,
    ) -> Result<(), FrameError> {
        if !tree.is_connected(root) {
            // Work nested under the frame already ended; it still completes.
            if stack.has_children(frame) {
                log::debug!(
                    target: "frames.predictive",
                    "{root} never connected; ending speculative {frame} empty"
                );
                return stack.end_detached(frame);
            }
            log::debug!(
                target: "frames.predictive",
                "{root} never connected; dropping speculative {frame}"
            );
            stack.discard(frame);
            return Ok(());
        }
        let nodes: Vec<NodeKey> = subtree_nodes_with_skips(tree, root, &self.roots)
            .into_iter()
            .filter(|n| !failed.contains(n) && !stack.is_claimed(*n))
            .collect();
        log::trace!(
            target: "frames.predictive",
            "finalize {frame} for {root} with {} node(s)",
            nodes.len()
        );
        attribute_all(stack, tree, frame, nodes)?;
        stack.end_detached(frame)
    }

    /// Speculative frames may be lost without consequence; anything else left current
    /// here is a host bug and is kept. Returns whether a frame was released.
    pub(crate) fn release_current(&self, stack: &mut FrameStack) -> bool {
        let Some(current) = stack.current() else {
            return false;
        };
        match stack.view(current).map(|f| f.kind()) {
            Some(FrameKind::Predictive) => {
                stack.abandon_current();
                true
            }
            kind => {
                log::warn!(
                    target: "frames.predictive",
                    "release while {current} ({kind:?}) is open; keeping it current"
                );
                false
            }
        }
    }

    fn is_covered<T: TreeView + ?Sized>(&self, tree: &T, node: NodeKey) -> bool {
        if self.roots.is_empty() {
            return false;
        }
        let mut cursor = Some(node);
        while let Some(n) = cursor {
            if self.roots.contains(&n) {
                return true;
            }
            cursor = tree.parent(n);
        }
        false
    }
}

/// Attributes `nodes` to `frame` in order: elements notify, other nodes are recorded.
fn attribute_all<T: TreeView + ?Sized>(
    stack: &mut FrameStack,
    tree: &T,
    frame: FrameId,
    nodes: Vec<NodeKey>,
) -> Result<(), FrameError> {
    for node in nodes {
        if tree.is_element(node) {
            stack.attribute(frame, node)?;
        } else {
            stack.attribute_node(frame, node)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameState;
    use crate::test_tree::TestTree;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (FrameStack, PredictiveReconciler) {
        let mut stack = FrameStack::new(true);
        let mut reconciler = PredictiveReconciler::new(true);
        reconciler.start(&mut stack);
        (stack, reconciler)
    }

    #[test]
    fn speculative_frame_waits_for_end_tag() {
        let (mut stack, mut rec) = setup();
        let failed = HashSet::new();
        let mut t = TestTree::new();
        let doc = t.root();
        let p = t.element(doc);
        assert!(rec.on_initializer(&mut stack, p));
        let frame = stack.current().unwrap();
        let b = t.element(p);

        // Still inside <p>: nothing finalizes, the speculative frame is released.
        let signal = BoundarySignal {
            insertion_point: p,
            ended: vec![b],
        };
        assert_eq!(rec.boundary(&mut stack, &t, &failed, &signal).unwrap(), None);
        assert_eq!(stack.current(), None);
        assert_eq!(stack.view(frame).unwrap().state(), FrameState::Open);

        let signal = BoundarySignal {
            insertion_point: doc,
            ended: vec![p],
        };
        assert_eq!(rec.boundary(&mut stack, &t, &failed, &signal).unwrap(), None);
        assert_eq!(stack.view(frame).unwrap().elements(), &[p, b]);
        assert_eq!(stack.view(frame).unwrap().state(), FrameState::Completed);
        assert_eq!(rec.queued(), 0);
    }

    #[test]
    fn uncovered_ended_nodes_form_a_parser_frame() {
        let (mut stack, mut rec) = setup();
        let failed = HashSet::new();
        let mut t = TestTree::new();
        let doc = t.root();
        let i = t.element(doc);
        let text = t.text(i);
        let j = t.element(doc);
        let signal = BoundarySignal {
            insertion_point: doc,
            ended: vec![j, text, i],
        };
        let frame = rec
            .boundary(&mut stack, &t, &failed, &signal)
            .unwrap()
            .unwrap();
        let view = stack.view(frame).unwrap();
        assert_eq!(view.kind(), FrameKind::Parser);
        assert_eq!(view.elements(), &[i, j]);
        assert_eq!(view.nodes(), &[i, text, j]);
    }

    #[test]
    fn failed_root_stops_being_current() {
        let (mut stack, mut rec) = setup();
        let mut t = TestTree::new();
        let doc = t.root();
        let bad = t.detached();
        rec.on_initializer(&mut stack, bad);
        let bad_frame = stack.current().unwrap();
        rec.on_failed(&mut stack, bad);
        assert_eq!(stack.current(), None);

        // A sibling created later in the same pump gets its own root frame.
        let ok = t.element(doc);
        assert!(rec.on_initializer(&mut stack, ok));
        let ok_frame = stack.current().unwrap();
        assert!(stack.view(ok_frame).unwrap().is_root());
        assert_eq!(stack.view(bad_frame).unwrap().children().count(), 0);
    }

    #[test]
    fn unrelated_failure_keeps_current() {
        let (mut stack, mut rec) = setup();
        let mut t = TestTree::new();
        let doc = t.root();
        let host = t.element(doc);
        rec.on_initializer(&mut stack, host);
        let frame = stack.current().unwrap();
        rec.on_failed(&mut stack, NodeKey(99));
        assert_eq!(stack.current(), Some(frame));
    }

    #[test]
    fn disconnected_root_with_nested_work_ends_empty() {
        let (mut stack, mut rec) = setup();
        let failed = HashSet::new();
        let completed = Rc::new(RefCell::new(Vec::new()));
        {
            let completed = Rc::clone(&completed);
            stack.observe(crate::observer::Lifecycle::Complete, move |frame, el| {
                completed.borrow_mut().push((frame.kind(), el))
            });
        }
        let mut t = TestTree::new();
        let doc = t.root();
        let ghost = t.detached();
        rec.on_initializer(&mut stack, ghost);
        let frame = stack.current().unwrap();
        let nested = stack.open(FrameKind::InsertMarkup);
        let inner = t.element(ghost);
        stack.attribute(nested, inner).unwrap();
        stack.end(nested).unwrap();
        rec.on_failed(&mut stack, ghost);

        rec.boundary(
            &mut stack,
            &t,
            &failed,
            &BoundarySignal {
                insertion_point: doc,
                ended: Vec::new(),
            },
        )
        .unwrap();
        assert!(stack.view(frame).unwrap().elements().is_empty());
        assert_eq!(stack.view(frame).unwrap().state(), FrameState::Completed);
        assert_eq!(*completed.borrow(), vec![(FrameKind::InsertMarkup, inner)]);
    }

    #[test]
    fn release_only_drops_speculative_frames() {
        let (mut stack, rec) = setup();
        stack.open(FrameKind::Predictive);
        assert!(rec.release_current(&mut stack));
        assert_eq!(stack.current(), None);
        let kept = stack.open(FrameKind::Creation);
        assert!(!rec.release_current(&mut stack));
        assert_eq!(stack.current(), Some(kept));
    }

    #[test]
    fn nested_roots_are_skipped_by_their_ancestor() {
        let (mut stack, mut rec) = setup();
        let failed = HashSet::new();
        let mut t = TestTree::new();
        let doc = t.root();
        let outer = t.element(doc);
        rec.on_initializer(&mut stack, outer);
        let outer_frame = stack.current().unwrap();
        let before = t.element(outer);
        rec.boundary(
            &mut stack,
            &t,
            &failed,
            &BoundarySignal {
                insertion_point: outer,
                ended: vec![before],
            },
        )
        .unwrap();

        let inner = t.element(outer);
        rec.on_initializer(&mut stack, inner);
        let inner_frame = stack.current().unwrap();
        let leaf = t.element(inner);
        rec.boundary(
            &mut stack,
            &t,
            &failed,
            &BoundarySignal {
                insertion_point: doc,
                ended: vec![leaf, inner, outer],
            },
        )
        .unwrap();

        assert_eq!(stack.view(outer_frame).unwrap().elements(), &[outer, before]);
        assert_eq!(stack.view(inner_frame).unwrap().elements(), &[inner, leaf]);
    }

    #[test]
    fn disconnected_root_is_discarded_silently() {
        let (mut stack, mut rec) = setup();
        let failed = HashSet::new();
        let mut t = TestTree::new();
        let doc = t.root();
        let ghost = t.detached();
        rec.on_initializer(&mut stack, ghost);
        let frame = stack.current().unwrap();
        let fallback = t.element(doc);
        let created = rec
            .boundary(
                &mut stack,
                &t,
                &failed,
                &BoundarySignal {
                    insertion_point: doc,
                    ended: vec![fallback],
                },
            )
            .unwrap()
            .unwrap();
        assert!(stack.view(frame).is_none());
        assert_eq!(stack.view(created).unwrap().elements(), &[fallback]);
    }

    #[test]
    fn no_speculation_while_a_frame_is_open_or_disabled() {
        let (mut stack, mut rec) = setup();
        stack.open(FrameKind::Creation);
        assert!(!rec.on_initializer(&mut stack, NodeKey(5)));

        let mut stack = FrameStack::new(true);
        let mut quiet = PredictiveReconciler::new(false);
        quiet.start(&mut stack);
        assert!(!quiet.on_initializer(&mut stack, NodeKey(5)));
        assert!(quiet.is_active());
    }

    #[test]
    fn finish_closes_everything_and_deactivates() {
        let (mut stack, mut rec) = setup();
        let failed = HashSet::new();
        let mut t = TestTree::new();
        let doc = t.root();
        let open = t.element(doc);
        rec.on_initializer(&mut stack, open);
        let frame = stack.current().unwrap();
        rec.finish(&mut stack, &t, &failed).unwrap();
        assert_eq!(stack.view(frame).unwrap().elements(), &[open]);
        assert!(!rec.is_active());
        assert_eq!(stack.current(), None);
    }
}
