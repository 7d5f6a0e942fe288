mod common;

use common::{define_plain, describe, elements, groups, record};
use frames::{EngineConfig, FrameKind, Lifecycle};
use html::{Document, DomError, InitError, ParseConfig, ParseSession};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn direct_creation_yields_one_creation_frame() {
    let mut doc = Document::new();
    let log = record(&mut doc);
    let el = doc.create_element("div").unwrap();

    let ended = groups(&log, Lifecycle::End);
    assert_eq!(ended, vec![(FrameKind::Creation, vec![el])]);
    assert_eq!(groups(&log, Lifecycle::Complete), ended);
    assert_eq!(log.borrow()[1].trail, "Creation#completed");
}

#[test]
fn deep_clone_attributes_root_then_descendants() {
    let mut doc = Document::new();
    let root = doc.root();
    doc.set_inner_html(root, "<div id=src><a><b></b></a>text<c></c></div>")
        .unwrap();
    let source = doc.element_by_id("src").unwrap();
    let log = record(&mut doc);

    let copy = doc.clone_node(source, true).unwrap();
    let completed = groups(&log, Lifecycle::Complete);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].0, FrameKind::Clone);
    assert_eq!(completed[0].1[0], copy);
    assert_eq!(describe(&doc, &completed), vec!["Clone: div a b c"]);
}

#[test]
fn shallow_clone_of_text_attributes_nothing() {
    let mut doc = Document::new();
    let root = doc.root();
    doc.set_inner_html(root, "plain").unwrap();
    let text = doc.children(root)[0];
    let log = record(&mut doc);
    doc.clone_node(text, false).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn bulk_replacement_attributes_in_document_order() {
    let mut doc = Document::new();
    let root = doc.root();
    doc.set_inner_html(root, "<section><p>old</p></section>").unwrap();
    let container = doc.elements_named("section")[0];
    let log = record(&mut doc);

    doc.set_inner_html(container, "<a><b></b></a><c></c>").unwrap();
    let completed = groups(&log, Lifecycle::Complete);
    assert_eq!(describe(&doc, &completed), vec!["InnerHTML: a b c"]);
}

#[test]
fn insert_adjacent_attributes_only_the_inserted_span() {
    let mut doc = Document::new();
    let root = doc.root();
    doc.set_inner_html(root, "<ul><li id=first></li><li id=anchor><i></i></li><li></li></ul>")
        .unwrap();
    let anchor = doc.element_by_id("anchor").unwrap();
    let log = record(&mut doc);

    for (position, markup) in [
        ("beforebegin", "<x-one><b></b></x-one>"),
        ("afterbegin", "<x-two></x-two>"),
        ("beforeend", "<x-three></x-three>"),
        ("afterend", "<x-four></x-four><x-five></x-five>"),
    ] {
        doc.insert_adjacent_html(anchor, position, markup).unwrap();
    }
    assert_eq!(
        describe(&doc, &groups(&log, Lifecycle::Complete)),
        vec![
            "InsertAdjacentHTML: x-one b",
            "InsertAdjacentHTML: x-two",
            "InsertAdjacentHTML: x-three",
            "InsertAdjacentHTML: x-four x-five",
        ]
    );
}

#[test]
fn define_splits_the_upgrade_chain_per_element() {
    let mut doc = Document::new();
    let root = doc.root();
    doc.set_inner_html(root, "<x-up id=x></x-up><div><x-up id=y></x-up></div>")
        .unwrap();
    let x = doc.element_by_id("x").unwrap();
    let y = doc.element_by_id("y").unwrap();

    let trace = Rc::new(RefCell::new(Vec::new()));
    {
        let trace = Rc::clone(&trace);
        doc.on_end(move |frame, el| trace.borrow_mut().push(format!("end {} {el}", frame.id())));
    }
    {
        let trace = Rc::clone(&trace);
        doc.define("x-up", move |doc, el| {
            let frame = doc.current_frame().map(|f| f.id().to_string());
            trace
                .borrow_mut()
                .push(format!("init {el} in {}", frame.unwrap_or_default()));
            Ok(())
        })
        .unwrap();
    }

    let trace = trace.borrow();
    assert_eq!(trace.len(), 4);
    assert!(trace[0].starts_with(&format!("init {x} in ")));
    assert!(trace[1].starts_with("end ") && trace[1].ends_with(&x.to_string()));
    assert!(trace[2].starts_with(&format!("init {y} in ")));
    assert!(trace[3].ends_with(&y.to_string()));
    let first_frame = trace[0].rsplit(' ').next().unwrap();
    let second_frame = trace[2].rsplit(' ').next().unwrap();
    assert_ne!(first_frame, second_frame);
    assert!(trace[1].contains(first_frame));
    assert!(trace[3].contains(second_frame));
}

#[test]
fn define_without_matches_leaves_no_frame() {
    let mut doc = Document::new();
    let log = record(&mut doc);
    define_plain(&mut doc, &["x-none"]);
    assert!(log.borrow().is_empty());
    assert!(doc.current_frame().is_none());
    assert_eq!(doc.tracker().live_frames(), 0);
}

#[test]
fn streaming_finalizes_speculative_frame_at_the_boundary() {
    let mut doc = Document::new();
    define_plain(&mut doc, &["x-p", "x-i"]);
    let log = record(&mut doc);

    let mut session = ParseSession::new(&mut doc, ParseConfig::default());
    session.push_str("<x-p><b></b></x-p>");
    session.pump().unwrap();
    assert_eq!(
        describe(session.document(), &groups(&log, Lifecycle::Complete)),
        vec!["Predictive: x-p b"]
    );
    session.push_str("<x-i></x-i>");
    session.pump().unwrap();
    session.finish().unwrap();

    assert_eq!(
        describe(&doc, &groups(&log, Lifecycle::Complete)),
        vec!["Predictive: x-p b", "Predictive: x-i"]
    );
}

#[test]
fn plain_streamed_elements_land_in_parser_frames() {
    let mut doc = Document::new();
    let log = record(&mut doc);
    let mut session = ParseSession::new(&mut doc, ParseConfig::default());
    session.push_str("<p><b></b></p><i>");
    session.pump().unwrap();
    session.push_str("</i>");
    session.finish().unwrap();
    assert_eq!(
        describe(&doc, &groups(&log, Lifecycle::Complete)),
        vec!["Parser: p b", "Parser: i"]
    );
}

#[test]
fn failing_initializer_on_creation_ends_the_frame_empty() {
    let mut doc = Document::new();
    doc.define("x-boom", |_, _| Err(InitError::new("boom")))
        .unwrap();
    let log = record(&mut doc);

    let err = doc.create_element("x-boom").unwrap_err();
    assert!(matches!(err, DomError::Initializer { ref name, .. } if name == "x-boom"));
    assert!(log.borrow().is_empty());
    assert!(doc.current_frame().is_none());
}

#[test]
fn failing_initializer_keeps_nested_work_attributed() {
    let mut doc = Document::new();
    doc.define("x-half", |doc, el| {
        doc.insert_adjacent_html(el, "beforeend", "<span></span>")
            .map_err(|e| InitError::new(e.to_string()))?;
        Err(InitError::new("late failure"))
    })
    .unwrap();
    let log = record(&mut doc);

    assert!(doc.create_element("x-half").is_err());
    let completed = groups(&log, Lifecycle::Complete);
    assert_eq!(describe(&doc, &completed), vec!["InsertAdjacentHTML: span"]);
    assert!(
        log.borrow()
            .iter()
            .all(|e| doc.element_name(e.element) != Some("x-half"))
    );
    assert_eq!(
        log.borrow().last().unwrap().trail,
        "Creation#completed, InsertAdjacentHTML#completed"
    );
}

#[test]
fn nested_operations_complete_with_their_root() {
    let mut doc = Document::new();
    doc.define("x-shell", |doc, el| {
        let inner = doc
            .create_element("x-leaf")
            .map_err(|e| InitError::new(e.to_string()))?;
        doc.append_child(el, inner)
            .map_err(|e| InitError::new(e.to_string()))
    })
    .unwrap();
    let log = record(&mut doc);
    let root = doc.root();
    doc.set_inner_html(root, "<x-shell></x-shell>").unwrap();

    let events = log.borrow();
    let end_kinds: Vec<FrameKind> = events
        .iter()
        .filter(|e| e.lifecycle == Lifecycle::End)
        .map(|e| e.kind)
        .collect();
    assert_eq!(end_kinds, vec![FrameKind::Creation, FrameKind::ReplaceContents]);
    let trails: Vec<&str> = events
        .iter()
        .filter(|e| e.lifecycle == Lifecycle::Complete)
        .map(|e| e.trail.as_str())
        .collect();
    assert_eq!(trails, vec!["InnerHTML#completed", "InnerHTML#completed, Creation#completed"]);
    assert_eq!(elements(&log, Lifecycle::Complete).len(), 2);
}

#[test]
fn failed_upgrade_is_skipped_in_the_chain() {
    let mut doc = Document::new();
    let root = doc.root();
    doc.set_inner_html(root, "<x-maybe id=bad></x-maybe><x-maybe id=good></x-maybe>")
        .unwrap();
    let log = record(&mut doc);
    doc.define("x-maybe", |doc, el| {
        if doc.attribute(el, "id") == Some("bad") {
            return Err(InitError::new("refused"));
        }
        Ok(())
    })
    .unwrap();
    let good = doc.element_by_id("good").unwrap();
    assert_eq!(
        groups(&log, Lifecycle::Complete),
        vec![(FrameKind::Upgrade, vec![good])]
    );
}

#[test]
fn failed_streamed_element_is_replaced_and_never_attributed() {
    let mut doc = Document::new();
    doc.define("x-bad", |_, _| Err(InitError::new("nope"))).unwrap();
    let log = record(&mut doc);
    doc.parse("<x-bad><i></i></x-bad>").unwrap();

    let root = doc.root();
    let fallback = doc.children(root)[0];
    assert_eq!(doc.inner_html(root), "<x-bad><i></i></x-bad>");
    let attributed = elements(&log, Lifecycle::Complete);
    assert_eq!(attributed.len(), 2);
    assert_eq!(attributed[0], fallback);
    assert!(
        groups(&log, Lifecycle::Complete)
            .iter()
            .all(|(kind, _)| *kind == FrameKind::Parser)
    );
}

#[test]
fn failed_streamed_element_does_not_adopt_later_siblings() {
    let mut doc = Document::new();
    doc.define("x-bad", |_, _| Err(InitError::new("nope"))).unwrap();
    doc.define("x-ok", |doc, el| {
        doc.insert_adjacent_html(el, "afterbegin", "<span></span>")
            .map_err(|e| InitError::new(e.to_string()))
    })
    .unwrap();
    let log = record(&mut doc);

    let mut session = ParseSession::new(&mut doc, ParseConfig::default());
    session.push_str("<x-bad></x-bad><x-ok></x-ok>");
    session.pump().unwrap();
    session.finish().unwrap();

    let ended: Vec<_> = elements(&log, Lifecycle::End);
    let completed: Vec<_> = elements(&log, Lifecycle::Complete);
    assert_eq!(ended.len(), 3);
    for element in &ended {
        assert!(completed.contains(element), "{element} ended but never completed");
    }
    assert_eq!(
        describe(&doc, &groups(&log, Lifecycle::Complete)),
        vec![
            "Predictive: x-ok",
            "InsertAdjacentHTML: span",
            "Parser: x-bad",
        ]
    );
}

#[test]
fn frames_list_text_and_comment_nodes() {
    let mut doc = Document::with_config(EngineConfig {
        retain_completed: true,
        ..EngineConfig::default()
    });
    let root = doc.root();
    doc.set_inner_html(root, "<p>a<!--c--></p>t").unwrap();
    let p = doc.elements_named("p")[0];
    let frame = doc.owner_of(p).unwrap();
    assert_eq!(frame.elements(), &[p]);
    let mut expected = vec![p];
    expected.extend(doc.children(p).iter().copied());
    expected.push(doc.children(root)[1]);
    assert_eq!(frame.nodes(), expected.as_slice());
}

#[test]
fn start_observers_see_nested_openings_in_order() {
    let mut doc = Document::new();
    doc.define("x-shell", |doc, el| {
        let inner = doc
            .create_element("b")
            .map_err(|e| InitError::new(e.to_string()))?;
        doc.append_child(el, inner)
            .map_err(|e| InitError::new(e.to_string()))
    })
    .unwrap();
    let started = Rc::new(RefCell::new(Vec::new()));
    {
        let started = Rc::clone(&started);
        doc.on_start(move |frame| started.borrow_mut().push(frame.to_string()));
    }
    let root = doc.root();
    doc.set_inner_html(root, "<x-shell></x-shell>").unwrap();
    assert_eq!(
        *started.borrow(),
        vec!["InnerHTML#open", "InnerHTML#open, Creation#open"]
    );
}
