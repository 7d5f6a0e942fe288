#![allow(dead_code)]

use frames::TreeView as _;
use frames::{FrameId, FrameKind, Lifecycle, NodeKey};
use html::Document;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub lifecycle: Lifecycle,
    pub frame: FrameId,
    pub kind: FrameKind,
    pub is_root: bool,
    pub trail: String,
    pub element: NodeKey,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// Subscribes to both lifecycles and records every notification in order.
pub fn record(doc: &mut Document) -> Log {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    for lifecycle in [Lifecycle::End, Lifecycle::Complete] {
        let log = Rc::clone(&log);
        let callback = move |frame: frames::FrameRef<'_>, element: NodeKey| {
            log.borrow_mut().push(Event {
                lifecycle,
                frame: frame.id(),
                kind: frame.kind(),
                is_root: frame.is_root(),
                trail: frame.to_string(),
                element,
            });
        };
        doc.observe(lifecycle, callback);
    }
    log
}

/// Elements per frame for one lifecycle, frames in first-notified order.
pub fn groups(log: &Log, lifecycle: Lifecycle) -> Vec<(FrameKind, Vec<NodeKey>)> {
    let mut out: Vec<(FrameId, FrameKind, Vec<NodeKey>)> = Vec::new();
    for event in log.borrow().iter().filter(|e| e.lifecycle == lifecycle) {
        match out.iter_mut().find(|(id, _, _)| *id == event.frame) {
            Some((_, _, elements)) => elements.push(event.element),
            None => out.push((event.frame, event.kind, vec![event.element])),
        }
    }
    out.into_iter().map(|(_, kind, els)| (kind, els)).collect()
}

pub fn elements(log: &Log, lifecycle: Lifecycle) -> Vec<NodeKey> {
    log.borrow()
        .iter()
        .filter(|e| e.lifecycle == lifecycle)
        .map(|e| e.element)
        .collect()
}

/// `Label: name name ...` for each group, for compact assertions.
pub fn describe(doc: &Document, groups: &[(FrameKind, Vec<NodeKey>)]) -> Vec<String> {
    groups
        .iter()
        .map(|(kind, els)| {
            let names: Vec<&str> = els
                .iter()
                .map(|el| doc.element_name(*el).unwrap_or("?"))
                .collect();
            format!("{}: {}", kind.label(), names.join(" "))
        })
        .collect()
}

/// Child-index path from the document, comparable across documents.
pub fn path(doc: &Document, node: NodeKey) -> Vec<usize> {
    let arena = doc.arena();
    let mut out = Vec::new();
    let mut current = node;
    while let Some(parent) = arena.parent(current) {
        let index = doc
            .children(parent)
            .iter()
            .position(|c| *c == current)
            .unwrap_or(usize::MAX);
        out.push(index);
        current = parent;
    }
    out.reverse();
    out
}

/// Defines each type with an initializer that does nothing.
pub fn define_plain(doc: &mut Document, names: &[&str]) {
    for name in names {
        doc.define(name, |_, _| Ok(())).unwrap();
    }
}
