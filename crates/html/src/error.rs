use core_types::NodeKey;
use std::fmt;

/// Failure reported by an element initializer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitError {
    pub message: String,
}

impl InitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for InitError {}

#[derive(Debug)]
pub enum DomError {
    UnknownNode(NodeKey),
    WrongNodeKind(NodeKey),
    /// The insertion would make a node its own ancestor, or give a leaf children.
    HierarchyRequest { parent: NodeKey, child: NodeKey },
    NotAChild { parent: NodeKey, child: NodeKey },
    /// An outside insertion position needs the anchor to have a parent.
    NoParent(NodeKey),
    InvalidPosition(String),
    InvalidName(String),
    AlreadyDefined(String),
    Initializer { name: String, source: InitError },
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::UnknownNode(node) => write!(f, "unknown node {node}"),
            DomError::WrongNodeKind(node) => write!(f, "node {node} has the wrong kind"),
            DomError::HierarchyRequest { parent, child } => {
                write!(f, "cannot insert {child} under {parent}")
            }
            DomError::NotAChild { parent, child } => {
                write!(f, "{child} is not a child of {parent}")
            }
            DomError::NoParent(node) => write!(f, "node {node} has no parent element"),
            DomError::InvalidPosition(position) => {
                write!(f, "invalid insertion position {position:?}")
            }
            DomError::InvalidName(name) => write!(f, "invalid element name {name:?}"),
            DomError::AlreadyDefined(name) => write!(f, "{name:?} is already defined"),
            DomError::Initializer { name, source } => {
                write!(f, "initializer of <{name}> failed: {source}")
            }
        }
    }
}

impl std::error::Error for DomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DomError::Initializer { source, .. } => Some(source),
            _ => None,
        }
    }
}
