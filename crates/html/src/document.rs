//! The document: a node arena whose constructing primitives are intercepted.
//!
//! Every public method that builds nodes (`create_element`, `clone_node`,
//! `set_inner_html`, `insert_adjacent_html`, `define`) runs inside a construction
//! frame. The real primitive runs between `intercept` and `settle`, so initializers
//! that call back into the document open nested frames.

use crate::arena::{NodeArena, NodeKind};
use crate::dom_builder::build_fragment;
use crate::error::{DomError, InitError};
use crate::registry::ElementRegistry;
use crate::session::{ParseConfig, ParseSession};
use core_types::{FrameId, NodeKey};
use frames::traverse::subtree_elements;
use frames::{
    ConstructionTracker, EngineConfig, FrameRef, InsertPosition, Lifecycle, ObserverId, Operation,
    Outcome, TreeView,
};
use std::collections::HashSet;
use std::rc::Rc;

fn is_valid_tag_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.first().is_some_and(u8::is_ascii_alphabetic)
        && bytes
            .iter()
            .all(|&c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b':'))
}

pub struct Document {
    pub(crate) arena: NodeArena,
    pub(crate) tracker: ConstructionTracker,
    registry: ElementRegistry,
    /// Elements whose initializer already ran (or must never run).
    initialized: HashSet<NodeKey>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            arena: NodeArena::new(),
            tracker: ConstructionTracker::new(config),
            registry: ElementRegistry::new(),
            initialized: HashSet::new(),
        }
    }

    pub fn root(&self) -> NodeKey {
        self.arena.document()
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn tracker(&self) -> &ConstructionTracker {
        &self.tracker
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn create_element(&mut self, name: &str) -> Result<NodeKey, DomError> {
        let pending = self.tracker.intercept(Operation::Create, &self.arena);
        let result = self.create_element_unframed(name);
        let outcome = match &result {
            Ok(element) => Outcome::Produced(*element),
            Err(_) => Outcome::Failed,
        };
        self.tracker.settle(pending, &self.arena, outcome);
        result
    }

    fn create_element_unframed(&mut self, name: &str) -> Result<NodeKey, DomError> {
        if !is_valid_tag_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        let element = self.arena.create_element(name, Vec::new());
        self.initialize(element)
            .map_err(|source| DomError::Initializer {
                name: name.to_ascii_lowercase(),
                source,
            })?;
        Ok(element)
    }

    pub fn clone_node(&mut self, node: NodeKey, deep: bool) -> Result<NodeKey, DomError> {
        let pending = self.tracker.intercept(Operation::Clone { deep }, &self.arena);
        let result = self.arena.deep_clone(node, deep);
        let outcome = match &result {
            Ok(copy) => {
                let copies = subtree_elements(&self.arena, *copy);
                self.initialize_all(copies);
                Outcome::Produced(*copy)
            }
            Err(_) => Outcome::Failed,
        };
        self.tracker.settle(pending, &self.arena, outcome);
        result
    }

    /// Replaces the children of `container` with the parsed `markup`.
    pub fn set_inner_html(&mut self, container: NodeKey, markup: &str) -> Result<(), DomError> {
        let pending = self
            .tracker
            .intercept(Operation::ReplaceContents { container }, &self.arena);
        let result = self.set_inner_html_unframed(container, markup);
        let outcome = if result.is_ok() {
            Outcome::Applied
        } else {
            Outcome::Failed
        };
        self.tracker.settle(pending, &self.arena, outcome);
        result
    }

    fn set_inner_html_unframed(&mut self, container: NodeKey, markup: &str) -> Result<(), DomError> {
        match self.arena.kind(container) {
            Some(NodeKind::Element { .. } | NodeKind::Document { .. }) => {}
            Some(_) => return Err(DomError::WrongNodeKind(container)),
            None => return Err(DomError::UnknownNode(container)),
        }
        self.arena.clear_children(container)?;
        let created = build_fragment(&mut self.arena, container, None, markup)?;
        self.initialize_all(created);
        Ok(())
    }

    /// Parses `markup` next to `anchor`. `position` is one of `beforebegin`,
    /// `afterbegin`, `beforeend`, `afterend` (any case).
    pub fn insert_adjacent_html(
        &mut self,
        anchor: NodeKey,
        position: &str,
        markup: &str,
    ) -> Result<(), DomError> {
        let position = InsertPosition::parse(position)
            .ok_or_else(|| DomError::InvalidPosition(position.to_string()))?;
        let pending = self
            .tracker
            .intercept(Operation::InsertMarkup { anchor, position }, &self.arena);
        let result = self.insert_adjacent_unframed(anchor, position, markup);
        let outcome = if result.is_ok() {
            Outcome::Applied
        } else {
            Outcome::Failed
        };
        self.tracker.settle(pending, &self.arena, outcome);
        result
    }

    fn insert_adjacent_unframed(
        &mut self,
        anchor: NodeKey,
        position: InsertPosition,
        markup: &str,
    ) -> Result<(), DomError> {
        if !self.arena.is_element(anchor) {
            return Err(if self.arena.contains(anchor) {
                DomError::WrongNodeKind(anchor)
            } else {
                DomError::UnknownNode(anchor)
            });
        }
        let (parent, before) = match position {
            InsertPosition::BeforeBegin => (self.parent_element(anchor)?, Some(anchor)),
            InsertPosition::AfterEnd => {
                (self.parent_element(anchor)?, self.arena.next_sibling(anchor))
            }
            InsertPosition::AfterBegin => (anchor, self.arena.first_child(anchor)),
            InsertPosition::BeforeEnd => (anchor, None),
        };
        let created = build_fragment(&mut self.arena, parent, before, markup)?;
        self.initialize_all(created);
        Ok(())
    }

    fn parent_element(&self, node: NodeKey) -> Result<NodeKey, DomError> {
        self.arena
            .parent(node)
            .filter(|p| self.arena.is_element(*p))
            .ok_or(DomError::NoParent(node))
    }

    /// Defines element type `name` and upgrades every connected element of that type,
    /// in document order.
    pub fn define<F>(&mut self, name: &str, initializer: F) -> Result<(), DomError>
    where
        F: Fn(&mut Document, NodeKey) -> Result<(), InitError> + 'static,
    {
        self.tracker.begin_define(name);
        if let Err(err) = self.registry.define(name, Rc::new(initializer)) {
            self.tracker.end_define(false);
            return Err(err);
        }
        let candidates: Vec<NodeKey> = subtree_elements(&self.arena, self.root())
            .into_iter()
            .filter(|el| self.arena.element_name(*el) == Some(name))
            .filter(|el| !self.initialized.contains(el))
            .collect();
        log::debug!(
            target: "html.document",
            "define <{name}> upgrades {} element(s)",
            candidates.len()
        );
        self.initialize_all(candidates);
        self.tracker.end_define(true);
        Ok(())
    }

    /// Runs the initializer of `element` if its type is defined and it has not run yet.
    pub(crate) fn initialize(&mut self, element: NodeKey) -> Result<(), InitError> {
        let Some(name) = self.arena.element_name(element).map(str::to_string) else {
            return Ok(());
        };
        let Some(initializer) = self.registry.get(&name) else {
            return Ok(());
        };
        if !self.initialized.insert(element) {
            return Ok(());
        }
        let claim = self.tracker.element_initializing(element);
        log::trace!(target: "html.document", "initialize {element} <{name}> ({claim:?})");
        let result = initializer(self, element);
        if let Err(err) = &result {
            log::warn!(target: "html.document", "initializer of {element} <{name}> failed: {err}");
            self.tracker.initializer_failed(element);
        }
        result
    }

    /// Initializes each element in turn; a failure is logged and skipped.
    fn initialize_all(&mut self, elements: Vec<NodeKey>) {
        for element in elements {
            let _ = self.initialize(element);
        }
    }

    /// Keeps `element` from ever being initialized.
    pub(crate) fn mark_initialized(&mut self, element: NodeKey) {
        self.initialized.insert(element);
    }

    /// Parses a complete document body in one streaming session.
    pub fn parse(&mut self, markup: &str) -> Result<(), DomError> {
        let mut session = ParseSession::new(self, ParseConfig::default());
        session.push_str(markup);
        session.finish()
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.arena.append_child(parent, child)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<(), DomError> {
        self.arena.insert_before(parent, child, reference)
    }

    pub fn remove(&mut self, node: NodeKey) -> Result<(), DomError> {
        self.arena.remove(node)
    }

    pub fn set_attribute(&mut self, element: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        self.arena.set_attribute(element, name, Some(value.to_string()))
    }

    pub fn attribute(&self, element: NodeKey, name: &str) -> Option<&str> {
        self.arena.attribute(element, name)
    }

    pub fn element_name(&self, element: NodeKey) -> Option<&str> {
        self.arena.element_name(element)
    }

    pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.arena.parent(node)
    }

    pub fn children(&self, node: NodeKey) -> &[NodeKey] {
        self.arena.children(node)
    }

    pub fn is_connected(&self, node: NodeKey) -> bool {
        self.arena.is_connected(node)
    }

    /// First connected element, in document order, whose `id` attribute is `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeKey> {
        subtree_elements(&self.arena, self.root())
            .into_iter()
            .find(|el| self.arena.attribute(*el, "id") == Some(id))
    }

    /// Connected elements named `name`, in document order.
    pub fn elements_named(&self, name: &str) -> Vec<NodeKey> {
        let name = name.to_ascii_lowercase();
        subtree_elements(&self.arena, self.root())
            .into_iter()
            .filter(|el| self.arena.element_name(*el) == Some(name.as_str()))
            .collect()
    }

    pub fn outer_html(&self, node: NodeKey) -> String {
        self.arena.serialize(node)
    }

    pub fn inner_html(&self, node: NodeKey) -> String {
        self.arena
            .children(node)
            .iter()
            .map(|child| self.arena.serialize(*child))
            .collect()
    }

    pub fn observe<F>(&mut self, lifecycle: Lifecycle, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>, NodeKey) + 'static,
    {
        self.tracker.observe(lifecycle, callback)
    }

    pub fn on_start<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>) + 'static,
    {
        self.tracker.on_start(callback)
    }

    pub fn on_end<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>, NodeKey) + 'static,
    {
        self.tracker.on_end(callback)
    }

    pub fn on_complete<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(FrameRef<'_>, NodeKey) + 'static,
    {
        self.tracker.on_complete(callback)
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.tracker.disconnect(id)
    }

    pub fn current_frame(&self) -> Option<FrameRef<'_>> {
        self.tracker.current()
    }

    pub fn frame(&self, id: FrameId) -> Option<FrameRef<'_>> {
        self.tracker.frame(id)
    }

    pub fn owner_of(&self, node: NodeKey) -> Option<FrameRef<'_>> {
        self.tracker.owner_of(node)
    }
}
