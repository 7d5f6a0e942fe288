//! Identities shared by the frame engine and the host tree.

use std::fmt;

/// Opaque identity of a tree node within one document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

impl NodeKey {
    /// Reserved sentinel; hosts never hand it out.
    pub const INVALID: NodeKey = NodeKey(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identity of a construction frame. Never reused within one engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_key_is_not_valid() {
        assert!(!NodeKey::INVALID.is_valid());
        assert!(NodeKey(7).is_valid());
    }

    #[test]
    fn ids_render_compactly() {
        assert_eq!(NodeKey(3).to_string(), "n3");
        assert_eq!(FrameId(12).to_string(), "f12");
    }
}
