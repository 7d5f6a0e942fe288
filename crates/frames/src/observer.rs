//! Lifecycle observer registry.
//!
//! Observers are keyed by [`Lifecycle`] and fire in registration order. Callbacks get a
//! read-only [`FrameRef`], so they can inspect the frame tree but cannot re-enter the
//! engine while it is notifying. "Start" carries no element; its callbacks receive
//! [`NodeKey::INVALID`].

use crate::frame::FrameRef;
use core_types::NodeKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// A frame opened.
    Start,
    /// An element was attributed to a frame.
    End,
    /// A root frame ended; fires once per `(frame, element)` of the whole subtree.
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = Box<dyn FnMut(FrameRef<'_>, NodeKey)>;

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    start: Vec<(ObserverId, ObserverFn)>,
    end: Vec<(ObserverId, ObserverFn)>,
    complete: Vec<(ObserverId, ObserverFn)>,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn observe<F>(&mut self, lifecycle: Lifecycle, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>, NodeKey) + 'static,
    {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.list_mut(lifecycle).push((id, Box::new(callback)));
        id
    }

    /// Removes an observer. Returns `true` if it was registered.
    pub(crate) fn disconnect(&mut self, id: ObserverId) -> bool {
        for lifecycle in [Lifecycle::Start, Lifecycle::End, Lifecycle::Complete] {
            let list = self.list_mut(lifecycle);
            if let Some(pos) = list.iter().position(|(oid, _)| *oid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub(crate) fn is_empty(&self, lifecycle: Lifecycle) -> bool {
        match lifecycle {
            Lifecycle::Start => self.start.is_empty(),
            Lifecycle::End => self.end.is_empty(),
            Lifecycle::Complete => self.complete.is_empty(),
        }
    }

    pub(crate) fn notify(&mut self, lifecycle: Lifecycle, frame: FrameRef<'_>, element: NodeKey) {
        for (_, callback) in self.list_mut(lifecycle).iter_mut() {
            callback(frame, element);
        }
    }

    fn list_mut(&mut self, lifecycle: Lifecycle) -> &mut Vec<(ObserverId, ObserverFn)> {
        match lifecycle {
            Lifecycle::Start => &mut self.start,
            Lifecycle::End => &mut self.end,
            Lifecycle::Complete => &mut self.complete,
        }
    }
}
