//! Construction frames: attribute every node a document builds to the operation that
//! built it.
//!
//! The engine lives in [`frames`]; [`html`] is a host document whose constructing
//! primitives (element creation, cloning, markup replacement and insertion, type
//! definition, streaming parse) run inside frames.
//!
//! ```
//! use construction_frames::{Document, FrameKind};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let mut doc = Document::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! doc.on_complete(move |frame, el| sink.borrow_mut().push((frame.kind(), el)));
//!
//! let root = doc.root();
//! doc.set_inner_html(root, "<p><b></b></p>").unwrap();
//! assert_eq!(seen.borrow().len(), 2);
//! assert!(seen.borrow().iter().all(|(kind, _)| *kind == FrameKind::ReplaceContents));
//! ```

pub use core_types::{FrameId, NodeKey};
pub use frames::{
    BoundarySignal, ConstructionTracker, EngineConfig, FrameError, FrameKind, FrameRef,
    FrameState, InitializerClaim, InsertPosition, Interception, Lifecycle, ObserverId,
    Operation, Outcome, TreeView, traverse,
};
pub use html::{
    Document, DomError, ElementRegistry, InitError, NodeArena, NodeKind, ParseConfig,
    ParseSession, chunker,
};
