//! Streaming parse session.
//!
//! Chunks go in through `push_str`; `pump` builds every complete token into the
//! document and then reports one parser boundary to the tracker. Elements of defined
//! types are initialized as soon as the parser creates them, before their children
//! exist, which is what makes their frames speculative.

use crate::arena::Attributes;
use crate::document::Document;
use crate::dom_builder::FragmentBuilder;
use crate::error::DomError;
use crate::tokenizer::{Token, Tokenizer};
use core_types::NodeKey;
use frames::BoundarySignal;
use frames::traverse::sort_document_order;

#[derive(Clone, Debug, Default)]
pub struct ParseConfig {
    /// Deliver a boundary after every token instead of once per pump.
    pub signal_every_token: bool,
}

pub struct ParseSession<'a> {
    doc: &'a mut Document,
    config: ParseConfig,
    tokenizer: Tokenizer,
    builder: FragmentBuilder,
    /// Nodes finished since the last boundary.
    ended: Vec<NodeKey>,
    signals: usize,
}

impl<'a> ParseSession<'a> {
    pub fn new(doc: &'a mut Document, config: ParseConfig) -> Self {
        doc.tracker.stream_started();
        let builder = FragmentBuilder::new(doc.root(), None);
        Self {
            doc,
            config,
            tokenizer: Tokenizer::new(),
            builder,
            ended: Vec::new(),
            signals: 0,
        }
    }

    /// The document being built, for script-driven operations between pumps.
    pub fn document(&mut self) -> &mut Document {
        self.doc
    }

    /// Boundaries delivered so far.
    pub fn signals(&self) -> usize {
        self.signals
    }

    pub fn push_str(&mut self, chunk: &str) {
        self.tokenizer.feed(chunk);
    }

    /// Builds every complete token. Returns how many were built.
    pub fn pump(&mut self) -> Result<usize, DomError> {
        let mut built = 0;
        while let Some(token) = self.tokenizer.next_token() {
            self.build(token)?;
            built += 1;
            if self.config.signal_every_token {
                self.signal();
            }
        }
        if built > 0 && !self.config.signal_every_token {
            self.signal();
        }
        Ok(built)
    }

    /// Flushes the input, closes every open element and ends the stream.
    pub fn finish(mut self) -> Result<(), DomError> {
        self.tokenizer.finish();
        let result = self.pump();
        let closed = self.builder.close_all();
        self.ended.extend(closed);
        self.signal();
        self.doc.tracker.stream_finished(&self.doc.arena);
        log::debug!(target: "html.session", "stream finished after {} boundary signal(s)", self.signals);
        result.map(|_| ())
    }

    fn build(&mut self, token: Token) -> Result<(), DomError> {
        match token {
            Token::Doctype(doctype) => self.doc.arena.set_doctype(doctype),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let element = self.create(&name, attributes);
                self.builder.insert(&mut self.doc.arena, element)?;
                if self_closing {
                    self.ended.push(element);
                } else {
                    self.builder.open(element);
                }
            }
            other => {
                let built = self.builder.push_token(&mut self.doc.arena, other)?;
                self.ended.extend(built.ended);
            }
        }
        Ok(())
    }

    /// Creates the element for a start tag and runs its initializer. A failed element
    /// is replaced by a plain one and never inserted.
    fn create(&mut self, name: &str, attributes: Attributes) -> NodeKey {
        let element = self.doc.arena.create_element(name, attributes.clone());
        if self.doc.initialize(element).is_ok() {
            return element;
        }
        let fallback = self.doc.arena.create_element(name, attributes);
        self.doc.mark_initialized(fallback);
        log::warn!(
            target: "html.session",
            "<{name}> {element} failed to initialize; inserting plain {fallback}"
        );
        fallback
    }

    fn signal(&mut self) {
        let mut ended = std::mem::take(&mut self.ended);
        sort_document_order(&self.doc.arena, &mut ended);
        let signal = BoundarySignal {
            insertion_point: self.builder.insertion_point(),
            ended,
        };
        log::trace!(
            target: "html.session",
            "boundary at {} with {} ended node(s)",
            signal.insertion_point,
            signal.ended.len()
        );
        self.doc.tracker.parser_boundary(&self.doc.arena, &signal);
        self.signals += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_across_chunks() {
        let mut doc = Document::new();
        let mut session = ParseSession::new(&mut doc, ParseConfig::default());
        session.push_str("<!doctype html><ul><li>o");
        assert_eq!(session.pump().unwrap(), 3);
        session.push_str("ne</li><li>two");
        assert_eq!(session.pump().unwrap(), 3);
        assert_eq!(session.signals(), 2);
        session.push_str("</li></u");
        session.finish().unwrap();
        let root = doc.root();
        assert_eq!(doc.inner_html(root), "<ul><li>one</li><li>two</li></ul>");
        assert!(!doc.tracker().is_streaming());
    }

    #[test]
    fn empty_pumps_send_no_boundary() {
        let mut doc = Document::new();
        let mut session = ParseSession::new(&mut doc, ParseConfig::default());
        session.push_str("<p");
        assert_eq!(session.pump().unwrap(), 0);
        assert_eq!(session.signals(), 0);
        session.finish().unwrap();
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn per_token_signals() {
        let mut doc = Document::new();
        let mut session = ParseSession::new(
            &mut doc,
            ParseConfig {
                signal_every_token: true,
            },
        );
        session.push_str("<p>a</p><br>");
        assert_eq!(session.pump().unwrap(), 4);
        assert_eq!(session.signals(), 4);
        session.finish().unwrap();
    }
}
