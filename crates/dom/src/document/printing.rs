use core::fmt;

use super::{DOMNode, Document, NodeKind};
use indextree::NodeId;

use serde_json::{Map, Value, json};

// -----------------------
// Module-scope helpers
// -----------------------

fn escape_debug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_html(text: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '<' if !in_attribute => out.push_str("&lt;"),
            '>' if !in_attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Elements whose text children are serialized verbatim.
fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "style" | "script")
}

fn sorted_attrs(node: &DOMNode) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = node.attrs.iter().cloned().collect();
    pairs.sort_by(|left, right| left.0.cmp(&right.0));
    pairs
}

fn node_to_json(doc: &Document, id: NodeId) -> Value {
    let Some(node) = doc.node(id) else {
        return Value::Null;
    };
    let children: Vec<Value> = doc
        .children(id)
        .map(|child| node_to_json(doc, child))
        .collect();
    match &node.kind {
        NodeKind::Document => json!({ "type": "document", "children": children }),
        NodeKind::Element { tag } => {
            let mut attrs_obj = Map::new();
            for (key, value) in sorted_attrs(node) {
                attrs_obj.insert(key, Value::String(value));
            }
            json!({
                "type": "element",
                "tag": tag,
                "attrs": Value::Object(attrs_obj),
                "children": children,
            })
        }
        NodeKind::Text { text } => json!({ "type": "text", "text": text }),
        NodeKind::Comment { text } => json!({ "type": "comment", "text": text }),
    }
}

fn write_outer_html(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    let Some(node) = doc.node(id) else {
        return;
    };
    match &node.kind {
        NodeKind::Document => {
            for child in doc.children(id) {
                write_outer_html(doc, child, false, out);
            }
        }
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in node.attrs.iter() {
                out.push_str(&format!(" {key}=\"{}\"", escape_html(value, true)));
            }
            out.push('>');
            for child in doc.children(id) {
                write_outer_html(doc, child, is_raw_text(tag), out);
            }
            out.push_str(&format!("</{tag}>"));
        }
        NodeKind::Text { text } => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&escape_html(text, false));
            }
        }
        NodeKind::Comment { text } => out.push_str(&format!("<!--{text}-->")),
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            for _ in 0..depth {
                f.write_str("  ")?;
            }
            Ok(())
        }

        fn fmt_node(
            doc: &Document,
            id: NodeId,
            f: &mut fmt::Formatter<'_>,
            depth: usize,
        ) -> fmt::Result {
            let Some(node) = doc.node(id) else {
                return Ok(());
            };
            write_indent(f, depth)?;
            match &node.kind {
                NodeKind::Document => writeln!(f, "#document")?,
                NodeKind::Element { tag } => {
                    write!(f, "<{tag}")?;
                    for (key, value) in sorted_attrs(node) {
                        write!(f, " {key}=\"{}\"", escape_debug(&value))?;
                    }
                    writeln!(f, ">")?;
                }
                NodeKind::Text { text } => writeln!(f, "\"{}\"", escape_debug(text))?,
                NodeKind::Comment { text } => writeln!(f, "<!-- {} -->", escape_debug(text))?,
            }
            for child in doc.children(id) {
                fmt_node(doc, child, f, depth + 1)?;
            }
            Ok(())
        }

        writeln!(f, "DOM")?;
        fmt_node(self, self.root, f, 0)
    }
}

impl Document {
    /// Build a deterministic JSON representation of the whole document.
    /// Schema:
    /// - Document: { "type":"document", "children":[ ... ] }
    /// - Element: { "type":"element", "tag": "style", "attrs": {..}, "children":[ ... ] }
    /// - Text: { "type":"text", "text":"..." }
    /// - Comment: { "type":"comment", "text":"..." }
    pub fn to_json_value(&self) -> Value {
        node_to_json(self, self.root)
    }

    /// JSON representation of the subtree rooted at `id`.
    pub fn subtree_json(&self, id: NodeId) -> Value {
        node_to_json(self, id)
    }

    /// Pretty JSON string for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        match serde_json::to_string_pretty(&self.to_json_value()) {
            Ok(text) => text,
            Err(_) => String::from("{}"),
        }
    }

    /// HTML serialization of `id` including the node itself.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw_text = self
            .parent(id)
            .and_then(|parent| self.tag_name(parent))
            .is_some_and(is_raw_text);
        write_outer_html(self, id, raw_text, &mut out);
        out
    }

    /// HTML serialization of the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw_text = self.tag_name(id).is_some_and(is_raw_text);
        let mut out = String::new();
        for child in self.children(id) {
            write_outer_html(self, child, raw_text, &mut out);
        }
        out
    }
}
