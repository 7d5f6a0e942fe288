//! Element type definitions.

use crate::document::Document;
use crate::error::{DomError, InitError};
use core_types::NodeKey;
use std::collections::HashMap;
use std::rc::Rc;

/// Runs once per element of a defined type, right after the element exists. It may
/// call back into the document freely.
pub type Initializer = Rc<dyn Fn(&mut Document, NodeKey) -> Result<(), InitError>>;

const RESERVED_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// A definable type name starts with an ASCII lowercase letter, contains a hyphen, uses
/// only `[a-z0-9._-]` and is not one of the reserved hyphenated names.
pub fn is_valid_type_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.first().is_some_and(u8::is_ascii_lowercase)
        && bytes.contains(&b'-')
        && bytes
            .iter()
            .all(|&c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, b'-' | b'.' | b'_'))
        && !RESERVED_NAMES.contains(&name)
}

#[derive(Default)]
pub struct ElementRegistry {
    definitions: HashMap<String, Initializer>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, initializer: Initializer) -> Result<(), DomError> {
        if !is_valid_type_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        if self.definitions.contains_key(name) {
            return Err(DomError::AlreadyDefined(name.to_string()));
        }
        self.definitions.insert(name.to_string(), initializer);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Initializer> {
        self.definitions.get(name).cloned()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Initializer {
        Rc::new(|_, _| Ok(()))
    }

    #[test]
    fn validates_type_names() {
        for good in ["x-a", "my-card", "a-1.2_b", "x-"] {
            assert!(is_valid_type_name(good), "{good}");
        }
        for bad in ["div", "-x", "X-a", "1-a", "x-A", "font-face", "x a-b", ""] {
            assert!(!is_valid_type_name(bad), "{bad}");
        }
    }

    #[test]
    fn define_rejects_invalid_and_duplicate_names() {
        let mut registry = ElementRegistry::new();
        assert!(matches!(
            registry.define("card", noop()),
            Err(DomError::InvalidName(_))
        ));
        registry.define("x-card", noop()).unwrap();
        assert!(matches!(
            registry.define("x-card", noop()),
            Err(DomError::AlreadyDefined(_))
        ));
        assert!(registry.is_defined("x-card"));
        assert!(registry.get("x-other").is_none());
        assert_eq!(registry.len(), 1);
    }
}
