//! Owned document tree used by the export pipeline.
//!
//! Parsing goes through `scraper` (html5ever) and is converted immediately into
//! plain owned values, so every export stage can take a `&Element` and hand back
//! a new `Element` without touching the tree it was given.

pub mod css;
pub mod inline_style;
pub mod parse;
pub mod serialize;

pub use inline_style::InlineStyle;
pub use parse::parse_document;
#[cfg(test)]
pub use parse::parse_fragment;
pub use serialize::serialize_element;

// ────────────────────────────────────────────────────────────────────────────
// Tree types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lowercase tag name.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.collect_text(out),
            Node::Text(text) => out.push_str(text),
            Node::Comment(_) => {}
        }
    }
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }

    /// Replaces the value in place if present, otherwise appends.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn remove_class(&mut self, class: &str) {
        let remaining: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr("class", joined);
        }
    }

    /// Parsed copy of the `style` attribute.
    pub fn style(&self) -> InlineStyle {
        InlineStyle::parse(self.attr("style").unwrap_or(""))
    }

    /// Writes `style` back, dropping the attribute when no declarations remain.
    pub fn set_style(&mut self, style: &InlineStyle) {
        if style.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", style.to_css());
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// First descendant (pre-order, excluding `self`) matching `predicate`.
    pub fn find<F>(&self, predicate: F) -> Option<&Element>
    where
        F: Fn(&Element) -> bool + Copy,
    {
        for child in self.child_elements() {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find(predicate) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants (pre-order, excluding `self`) matching `predicate`.
    pub fn find_all<F>(&self, predicate: F) -> Vec<&Element>
    where
        F: Fn(&Element) -> bool + Copy,
    {
        let mut found = Vec::new();
        self.collect_matching(predicate, &mut found);
        found
    }

    fn collect_matching<'a, F>(&'a self, predicate: F, out: &mut Vec<&'a Element>)
    where
        F: Fn(&Element) -> bool + Copy,
    {
        for child in self.child_elements() {
            if predicate(child) {
                out.push(child);
            }
            child.collect_matching(predicate, out);
        }
    }

    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        self.find(|el| el.has_class(class))
    }

    pub fn contains_element<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Element) -> bool + Copy,
    {
        self.find(predicate).is_some()
    }
}
