//! Construction frames.
//!
//! Every tree-building operation (element creation, cloning, markup replacement and
//! insertion, upgrades, streaming parse) runs inside a frame. The frame records which
//! elements that operation produced, nests under whatever frame was current when it
//! started, and reports each element to observers once when the frame ends and once
//! more when its whole frame tree completes.
//!
//! The engine never mutates the host tree; it reads it through [`TreeView`].

mod adapter;
mod engine;
mod error;
mod frame;
mod observer;
mod predictive;
mod stack;
mod tree;
mod upgrade;

pub mod traverse;

#[cfg(test)]
mod test_tree;

pub use adapter::{InsertPosition, Interception, Operation, Outcome};
pub use core_types::{FrameId, NodeKey};
pub use engine::{ConstructionTracker, EngineConfig, InitializerClaim};
pub use error::FrameError;
pub use frame::{FrameKind, FrameRef, FrameState};
pub use observer::{Lifecycle, ObserverId};
pub use predictive::BoundarySignal;
pub use tree::TreeView;
