//! Chrome Stripper: removes editor-only elements from the cloned preview.
//!
//! Two passes happen in one bottom-up walk:
//! 1. Chrome removal: buttons, download affordances, page-boundary visuals.
//! 2. Empty-node pruning. Only *incidentally* empty nodes go; an empty node that
//!    paints a border/background (inline, or through a decorated class from the
//!    captured CSS) is a visual divider and stays. Keeping incidental empties
//!    produces phantom blank pages in the rendered PDF.

use std::collections::BTreeSet;

use crate::dom::{Element, Node};
use crate::export::style_capture::is_decorating_declaration;

/// Tags eligible for empty-node pruning.
const PRUNABLE_TAGS: &[&str] = &["div", "span", "p", "section"];

/// A descendant with one of these tags makes a node non-empty regardless of text.
const MEDIA_TAGS: &[&str] = &["img", "svg", "hr", "canvas", "picture", "video", "object"];

pub struct ChromeRules<'a> {
    pub chrome_classes: &'a [String],
    pub download_labels: &'a [String],
    pub decorated_classes: &'a BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct StrippedTree {
    pub root: Element,
    /// Elements removed (chrome and empty nodes; descendants not counted).
    pub removed: usize,
}

/// Returns a copy of `root` without editor chrome. The root itself is always kept.
pub fn strip_chrome(root: &Element, rules: &ChromeRules<'_>) -> StrippedTree {
    let mut removed = 0;
    let stripped = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: strip_children(&root.children, rules, &mut removed),
    };
    StrippedTree {
        root: stripped,
        removed,
    }
}

fn strip_children(children: &[Node], rules: &ChromeRules<'_>, removed: &mut usize) -> Vec<Node> {
    children
        .iter()
        .filter_map(|child| match child {
            Node::Element(el) => strip_element(el, rules, removed).map(Node::Element),
            Node::Text(text) => Some(Node::Text(text.clone())),
            // Editor comments never belong in the export.
            Node::Comment(_) => None,
        })
        .collect()
}

fn strip_element(el: &Element, rules: &ChromeRules<'_>, removed: &mut usize) -> Option<Element> {
    if is_chrome(el, rules) {
        *removed += 1;
        return None;
    }

    let stripped = Element {
        name: el.name.clone(),
        attrs: el.attrs.clone(),
        children: strip_children(&el.children, rules, removed),
    };

    if is_incidentally_empty(&stripped, rules.decorated_classes) {
        *removed += 1;
        return None;
    }
    Some(stripped)
}

fn is_chrome(el: &Element, rules: &ChromeRules<'_>) -> bool {
    if el.name == "button" {
        return true;
    }
    if el
        .classes()
        .any(|class| rules.chrome_classes.iter().any(|c| c == class))
    {
        return true;
    }
    is_download_affordance(el, rules.download_labels)
}

/// A container whose entire text is a download label, or that is classed as a
/// download control.
fn is_download_affordance(el: &Element, labels: &[String]) -> bool {
    if el
        .classes()
        .any(|class| class.to_ascii_lowercase().contains("download"))
    {
        return true;
    }
    let text = collapse_whitespace(&el.text_content());
    !text.is_empty() && labels.iter().any(|label| label.eq_ignore_ascii_case(&text))
}

fn is_incidentally_empty(el: &Element, decorated_classes: &BTreeSet<String>) -> bool {
    PRUNABLE_TAGS.contains(&el.name.as_str())
        && el.text_content().trim().is_empty()
        && !el.contains_element(|child| MEDIA_TAGS.contains(&child.name.as_str()))
        && !paints_inline(el)
        && !el.classes().any(|class| decorated_classes.contains(class))
}

fn paints_inline(el: &Element) -> bool {
    el.style()
        .iter()
        .any(|(prop, value)| is_decorating_declaration(prop, value))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
