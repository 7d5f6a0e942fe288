//! A small HTML host tree whose constructing primitives run inside construction
//! frames.
//!
//! [`Document`] owns a [`NodeArena`], an [`ElementRegistry`] and a
//! [`frames::ConstructionTracker`]. [`ParseSession`] streams markup into a document
//! and reports parser boundaries to the tracker.

pub mod chunker;

mod arena;
mod document;
mod dom_builder;
mod error;
mod registry;
mod session;
mod tokenizer;

pub use crate::arena::{Attributes, NodeArena, NodeKind};
pub use crate::document::Document;
pub use crate::error::{DomError, InitError};
pub use crate::registry::{ElementRegistry, Initializer, is_valid_type_name};
pub use crate::session::{ParseConfig, ParseSession};
pub use crate::tokenizer::{Token, Tokenizer, tokenize};
