//! Tree construction from tokens into a [`NodeArena`].
//!
//! The builder keeps its own stack of open elements and appends under the innermost
//! one. Nodes landing directly under the fragment root go before the reference node,
//! which is how markup is inserted in the middle of a child list.

use crate::arena::NodeArena;
use crate::error::DomError;
use crate::tokenizer::{Token, tokenize};
use core_types::NodeKey;

#[derive(Debug, Default)]
pub(crate) struct Built {
    /// Element created for a start tag.
    pub(crate) element: Option<NodeKey>,
    /// Nodes finished by this token: closed elements, text and comments.
    pub(crate) ended: Vec<NodeKey>,
}

#[derive(Debug)]
pub(crate) struct FragmentBuilder {
    root: NodeKey,
    before: Option<NodeKey>,
    open: Vec<NodeKey>,
}

impl FragmentBuilder {
    pub(crate) fn new(root: NodeKey, before: Option<NodeKey>) -> Self {
        Self {
            root,
            before,
            open: Vec::new(),
        }
    }

    /// The node the next token is appended to.
    pub(crate) fn insertion_point(&self) -> NodeKey {
        self.open.last().copied().unwrap_or(self.root)
    }

    pub(crate) fn insert(&mut self, arena: &mut NodeArena, node: NodeKey) -> Result<(), DomError> {
        match self.open.last() {
            Some(parent) => arena.append_child(*parent, node),
            None => arena.insert_before(self.root, node, self.before),
        }
    }

    pub(crate) fn open(&mut self, element: NodeKey) {
        self.open.push(element);
    }

    pub(crate) fn push_token(
        &mut self,
        arena: &mut NodeArena,
        token: Token,
    ) -> Result<Built, DomError> {
        let mut built = Built::default();
        match token {
            Token::Doctype(_) => {}
            Token::Comment(text) => {
                let node = arena.create_comment(text);
                self.insert(arena, node)?;
                built.ended.push(node);
            }
            Token::Text(text) => {
                if !text.is_empty() {
                    let node = arena.create_text(text);
                    self.insert(arena, node)?;
                    built.ended.push(node);
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let element = arena.create_element(&name, attributes);
                self.insert(arena, element)?;
                if self_closing {
                    built.ended.push(element);
                } else {
                    self.open(element);
                }
                built.element = Some(element);
            }
            Token::EndTag(name) => built.ended = self.close(arena, &name),
        }
        Ok(built)
    }

    /// Pops open elements up to and including the innermost one named `name`. An end
    /// tag with no matching open element is ignored.
    pub(crate) fn close(&mut self, arena: &NodeArena, name: &str) -> Vec<NodeKey> {
        let Some(index) = self
            .open
            .iter()
            .rposition(|el| arena.element_name(*el) == Some(name))
        else {
            log::trace!(target: "html.builder", "stray end tag </{name}>");
            return Vec::new();
        };
        let mut closed = self.open.split_off(index);
        closed.reverse();
        closed
    }

    /// Closes every open element, innermost first.
    pub(crate) fn close_all(&mut self) -> Vec<NodeKey> {
        let mut closed = std::mem::take(&mut self.open);
        closed.reverse();
        closed
    }
}

/// Parses `markup` under `parent` before `before`. Returns the created elements in
/// creation order, which is document order for a fresh fragment.
pub(crate) fn build_fragment(
    arena: &mut NodeArena,
    parent: NodeKey,
    before: Option<NodeKey>,
    markup: &str,
) -> Result<Vec<NodeKey>, DomError> {
    let mut builder = FragmentBuilder::new(parent, before);
    let mut created = Vec::new();
    for token in tokenize(markup) {
        if let Some(element) = builder.push_token(arena, token)?.element {
            created.push(element);
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_markup_in_place() {
        let mut arena = NodeArena::new();
        let doc = arena.document();
        let host = arena.create_element("div", Vec::new());
        arena.append_child(doc, host).unwrap();
        let tail = arena.create_element("hr", Vec::new());
        arena.append_child(host, tail).unwrap();

        let created = build_fragment(&mut arena, host, Some(tail), "<a><b></b></a>t<c>").unwrap();
        assert_eq!(created.len(), 3);
        assert_eq!(arena.serialize(host), "<div><a><b></b></a>t<c></c><hr></div>");
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        let mut arena = NodeArena::new();
        let doc = arena.document();
        let mut builder = FragmentBuilder::new(doc, None);
        for token in tokenize("<p><b>x</i></b>y</p>") {
            builder.push_token(&mut arena, token).unwrap();
        }
        assert_eq!(arena.serialize(doc), "<p><b>x</b>y</p>");
        assert_eq!(builder.insertion_point(), doc);
    }

    #[test]
    fn close_reports_innermost_first() {
        let mut arena = NodeArena::new();
        let doc = arena.document();
        let mut builder = FragmentBuilder::new(doc, None);
        let mut opened = Vec::new();
        for token in tokenize("<ul><li><span>") {
            opened.extend(builder.push_token(&mut arena, token).unwrap().element);
        }
        assert_eq!(builder.insertion_point(), opened[2]);
        assert_eq!(builder.close(&arena, "li"), vec![opened[2], opened[1]]);
        assert_eq!(builder.close_all(), vec![opened[0]]);
    }

    #[test]
    fn deep_nesting_builds_without_recursion() {
        let depth = 10_000;
        let markup = format!("{}{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let mut arena = NodeArena::new();
        let doc = arena.document();
        let created = build_fragment(&mut arena, doc, None, &markup).unwrap();
        assert_eq!(created.len(), depth);
        assert_eq!(arena.serialize(doc).len(), markup.len());
    }
}
