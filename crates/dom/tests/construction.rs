//! Tree construction, hierarchy checks and printing.

use dom::{Document, NodeKind};
use serde_json::json;

#[test]
fn skeleton_exposes_head_and_body() {
    let doc = Document::with_skeleton();
    let head = doc.head().unwrap();
    let body = doc.body().unwrap();
    assert_eq!(doc.tag_name(head), Some("head"));
    assert_eq!(doc.tag_name(body), Some("body"));
    assert_eq!(doc.child_index(body), Some(1));
    assert!(Document::new().head().is_none());
}

#[test]
fn insert_before_and_replace_keep_order() {
    let mut doc = Document::with_skeleton();
    let head = doc.head().unwrap();
    let first = doc.create_element("style");
    let last = doc.create_element("style");
    doc.append_child(head, first).unwrap();
    doc.append_child(head, last).unwrap();

    let middle = doc.create_element("meta");
    doc.insert_before(head, middle, Some(last)).unwrap();
    assert_eq!(doc.children(head).collect::<Vec<_>>(), vec![first, middle, last]);

    let replacement = doc.create_element("link");
    doc.replace_child(head, replacement, middle).unwrap();
    assert_eq!(
        doc.children(head).collect::<Vec<_>>(),
        vec![first, replacement, last]
    );
    assert_eq!(doc.parent(middle), None);
    assert!(!doc.is_connected(middle));
}

#[test]
fn hierarchy_errors_are_reported() {
    let mut doc = Document::with_skeleton();
    let head = doc.head().unwrap();
    let style = doc.create_element("style");
    let text = doc.create_text("a{}");
    doc.append_child(head, style).unwrap();
    doc.append_child(style, text).unwrap();

    assert!(doc.append_child(style, head).is_err(), "ancestor into descendant");
    assert!(doc.append_child(style, style).is_err(), "node into itself");
    let orphan = doc.create_element("div");
    assert!(doc.append_child(text, orphan).is_err(), "text cannot have children");
    assert!(doc.remove_child(head, text).is_err(), "text is not a child of head");
    assert!(doc.set_attribute(text, "id", "x").is_err());
    assert!(doc.set_text(style, "a{}").is_err());
    let root = doc.root();
    assert!(doc.append_child(style, root).is_err());
}

#[test]
fn attributes_are_case_insensitive_and_removable() {
    let mut doc = Document::new();
    let style = doc.create_element("STYLE");
    assert_eq!(doc.tag_name(style), Some("style"));
    doc.set_attribute(style, "Media", "screen").unwrap();
    assert_eq!(doc.attribute(style, "media"), Some("screen"));
    doc.set_attribute(style, "media", "print").unwrap();
    assert_eq!(doc.attribute(style, "MEDIA"), Some("print"));
    doc.remove_attribute(style, "media").unwrap();
    assert_eq!(doc.attribute(style, "media"), None);
    doc.remove_attribute(style, "media").unwrap();
}

#[test]
fn outermost_elements_skip_nested_matches() {
    let mut doc = Document::with_skeleton();
    let head = doc.head().unwrap();
    let outer = doc.create_element("style");
    let inner = doc.create_element("style");
    let noscript = doc.create_element("noscript");
    let nested = doc.create_element("style");
    doc.append_child(head, outer).unwrap();
    doc.append_child(outer, inner).unwrap();
    doc.append_child(head, noscript).unwrap();
    doc.append_child(noscript, nested).unwrap();

    let tags = vec!["style".to_owned()];
    assert_eq!(doc.outermost_elements_named(head, &tags), vec![outer, nested]);
}

#[test]
fn outer_html_keeps_style_text_raw() {
    let mut doc = Document::with_skeleton();
    let head = doc.head().unwrap();
    let style = doc.create_element("style");
    doc.set_attribute(style, "id", "x").unwrap();
    doc.append_child(head, style).unwrap();
    doc.set_text_content(style, "a > b{color:blue}").unwrap();
    let title = doc.create_element("title");
    doc.append_child(head, title).unwrap();
    doc.set_text_content(title, "a < b").unwrap();

    assert_eq!(
        doc.outer_html(style),
        "<style id=\"x\">a > b{color:blue}</style>"
    );
    assert_eq!(doc.outer_html(title), "<title>a &lt; b</title>");
    assert_eq!(
        doc.inner_html(head),
        "<style id=\"x\">a > b{color:blue}</style><title>a &lt; b</title>"
    );
}

#[test]
fn json_snapshot_is_deterministic() {
    let mut doc = Document::with_skeleton();
    let head = doc.head().unwrap();
    let style = doc.create_element("style");
    doc.set_attribute(style, "media", "screen").unwrap();
    doc.set_attribute(style, "id", "x").unwrap();
    doc.append_child(head, style).unwrap();
    doc.set_text_content(style, ".a{}").unwrap();

    assert_eq!(
        doc.subtree_json(style),
        json!({
            "type": "element",
            "tag": "style",
            "attrs": { "id": "x", "media": "screen" },
            "children": [{ "type": "text", "text": ".a{}" }],
        })
    );
    assert!(doc.to_json_string().contains("\"tag\": \"head\""));
    let printed = format!("{doc:?}");
    assert!(printed.contains("<style id=\"x\" media=\"screen\">"));
    assert!(matches!(doc.kind(doc.root()), Some(NodeKind::Document)));
}

#[test]
fn discarded_subtrees_become_unknown() {
    let mut doc = Document::with_skeleton();
    let head = doc.head().unwrap();
    let style = doc.create_element("style");
    doc.set_text_content(style, ".a{}").unwrap();
    let text = doc.children(style).next().unwrap();
    doc.append_child(head, style).unwrap();

    assert!(doc.discard(style).is_err(), "attached nodes are kept");
    assert!(doc.discard(doc.root()).is_err());

    doc.remove_child(head, style).unwrap();
    doc.discard(style).unwrap();
    assert!(doc.node(style).is_none());
    assert!(doc.node(text).is_none());
    assert_eq!(doc.parent(text), None);
    assert!(doc.append_child(head, style).is_err());

    let fresh = doc.create_element("style");
    assert!(doc.node(fresh).is_some());
    assert!(doc.node(style).is_none(), "a reused slot does not revive old handles");
}
