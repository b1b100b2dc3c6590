//! Owned tree → HTML text.

use std::borrow::Cow;

use crate::dom::{Element, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text children are emitted without entity escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script"];

pub fn serialize_element(element: &Element) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

fn write_node(node: &Node, raw_text: bool, out: &mut String) {
    match node {
        Node::Element(el) => write_element(el, out),
        Node::Text(text) if raw_text => out.push_str(text),
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&element.name.as_str()) {
        return;
    }

    let raw_text = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
    for child in &element.children {
        write_node(child, raw_text, out);
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

pub fn escape_text(text: &str) -> Cow<'_, str> {
    escape(text, false)
}

fn escape_attr(text: &str) -> Cow<'_, str> {
    escape(text, true)
}

fn escape(text: &str, attribute: bool) -> Cow<'_, str> {
    let needs_escape = text
        .chars()
        .any(|c| matches!(c, '&' | '<' | '>') || (attribute && c == '"'));
    if !needs_escape {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}
