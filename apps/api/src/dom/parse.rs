//! HTML → owned tree conversion on top of `scraper`.

use scraper::{ElementRef, Html};

use crate::dom::{Element, Node};

/// Parses a full page and returns its `<html>` element.
pub fn parse_document(html: &str) -> Element {
    let document = Html::parse_document(html);
    convert_element(document.root_element())
}

/// Parses a fragment and returns its top-level nodes. Test trees are built this way.
#[cfg(test)]
pub fn parse_fragment(html: &str) -> Vec<Node> {
    let fragment = Html::parse_fragment(html);
    // html5ever wraps fragments in a synthetic <html> element.
    convert_children(fragment.root_element())
}

fn convert_element(element: ElementRef<'_>) -> Element {
    let value = element.value();
    Element {
        name: value.name().to_string(),
        attrs: value
            .attrs()
            .map(|(name, val)| (name.to_string(), val.to_string()))
            .collect(),
        children: convert_children(element),
    }
}

fn convert_children(element: ElementRef<'_>) -> Vec<Node> {
    let mut children = Vec::new();
    for child in element.children() {
        match child.value() {
            scraper::Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    children.push(Node::Element(convert_element(child_element)));
                }
            }
            scraper::Node::Text(text) => {
                let text: &str = text;
                children.push(Node::Text(text.to_string()));
            }
            scraper::Node::Comment(comment) => {
                let comment: &str = comment;
                children.push(Node::Comment(comment.to_string()));
            }
            _ => {}
        }
    }
    children
}
