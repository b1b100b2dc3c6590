//! Document Assembler.
//!
//! Produces the self-contained HTML handed to the render service: doctype,
//! head metadata, the three style blocks in cascade order, and the body.
//! The result is minified conservatively and checked against the pipeline
//! invariants before anything leaves the process.

use crate::dom::{serialize_element, Element, Node};
use crate::export::error::ExportError;
use crate::export::models::{LayoutMode, StyleBlockKind, StyleSnapshot};
use crate::export::normalize::has_scale_transform;
use crate::export::overrides::{PRESERVE_NEWLINES_ATTR, PRESERVE_SPACES};
use crate::export::pagination::{count_break_after_markers, PAGE_CLASS};
use crate::export::templates::TemplateProfile;

pub const STYLE_BLOCK_ATTR: &str = "data-style-block";

/// Tags whose content is copied verbatim by the minifier.
const VERBATIM_TAGS: &[&str] = &["pre", "textarea", "style", "script"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Boundaries where a line break in the markup never renders as a space.
const BLOCK_TAGS: &[&str] = &[
    "html", "head", "body", "meta", "link", "title", "style", "script", "div", "p", "section",
    "article", "header", "footer", "main", "nav", "aside", "ul", "ol", "li", "dl", "dt", "dd",
    "table", "thead", "tbody", "tfoot", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6",
    "hr", "br", "pre", "textarea", "blockquote", "figure", "figcaption",
];

/// `white-space` values where runs of spaces are significant.
const SPACE_PRESERVING_WHITE_SPACE: &[&str] = &["pre", "pre-wrap", "break-spaces"];

// ────────────────────────────────────────────────────────────────────────────
// Reset block
// ────────────────────────────────────────────────────────────────────────────

/// First style block: a neutral baseline. Never `!important`.
pub fn reset_css(profile: &TemplateProfile) -> String {
    [
        "html, body { margin: 0; padding: 0; background: #ffffff; }".to_string(),
        format!(
            "body {{ font-family: {}; line-height: {}; color: #000000; }}",
            profile.font_family, profile.line_height
        ),
        "img, svg { max-width: 100%; }".to_string(),
    ]
    .join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Newline preservation
// ────────────────────────────────────────────────────────────────────────────

/// Copy of `root` where every node relying on literal line breaks carries
/// `data-preserve-newlines`. Nodes whose spacing is significant as well
/// (`pre`, `textarea`, `white-space: pre*`) get the value `spaces`.
pub fn flag_preserved_nodes(root: &Element, preserve_classes: &[String]) -> Element {
    let mut copy = Element {
        name: root.name.clone(),
        attrs: root.attrs.clone(),
        children: root
            .children
            .iter()
            .map(|child| match child {
                Node::Element(el) => Node::Element(flag_preserved_nodes(el, preserve_classes)),
                other => other.clone(),
            })
            .collect(),
    };
    if preserves_spaces(&copy) {
        copy.set_attr(PRESERVE_NEWLINES_ATTR, PRESERVE_SPACES);
    } else if !copy.has_attr(PRESERVE_NEWLINES_ATTR) && preserves_lines(&copy, preserve_classes) {
        copy.set_attr(PRESERVE_NEWLINES_ATTR, "true");
    }
    copy
}

fn preserves_spaces(el: &Element) -> bool {
    matches!(el.name.as_str(), "pre" | "textarea")
        || inline_white_space(el)
            .map(|value| SPACE_PRESERVING_WHITE_SPACE.contains(&value.as_str()))
            .unwrap_or(false)
}

fn preserves_lines(el: &Element, preserve_classes: &[String]) -> bool {
    el.classes()
        .any(|class| preserve_classes.iter().any(|c| c == class))
        || inline_white_space(el).as_deref() == Some("pre-line")
}

fn inline_white_space(el: &Element) -> Option<String> {
    el.style().get("white-space").map(|value| {
        value
            .trim_end_matches("!important")
            .trim()
            .to_ascii_lowercase()
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Assembly
// ────────────────────────────────────────────────────────────────────────────

pub struct AssemblyParts<'a> {
    pub title: &'a str,
    pub font_stylesheet_url: &'a str,
    pub styles: &'a StyleSnapshot,
    pub body: &'a Element,
}

/// Serializes the full document (not yet minified).
pub fn assemble_document(parts: &AssemblyParts<'_>) -> Result<String, ExportError> {
    if !parts.styles.is_complete() {
        return Err(ExportError::InvariantViolation(format!(
            "expected 3 style blocks, got {}",
            parts.styles.blocks().len()
        )));
    }

    let title = if parts.title.trim().is_empty() {
        "Resume"
    } else {
        parts.title.trim()
    };

    let mut head = Element::new("head")
        .with_child(Element::new("meta").with_attr("charset", "utf-8"))
        .with_child(
            Element::new("meta")
                .with_attr("name", "viewport")
                .with_attr("content", "width=device-width, initial-scale=1"),
        )
        .with_child(Element::new("title").with_child(Node::text(title)))
        .with_child(
            Element::new("link")
                .with_attr("rel", "stylesheet")
                .with_attr("href", parts.font_stylesheet_url),
        );
    for block in parts.styles.blocks() {
        head = head.with_child(
            Element::new("style")
                .with_attr(STYLE_BLOCK_ATTR, block.kind.as_str())
                .with_child(Node::text(block.css.as_str())),
        );
    }

    let body = Element::new("body").with_child(parts.body.clone());
    let html = Element::new("html")
        .with_attr("lang", "en")
        .with_child(head)
        .with_child(body);

    Ok(format!("<!DOCTYPE html>\n{}", serialize_element(&html)))
}

// ────────────────────────────────────────────────────────────────────────────
// Minification
// ────────────────────────────────────────────────────────────────────────────

/// Whitespace-only minification. A run containing a newline is dropped when
/// block-level tags sit on both sides of it; every other run collapses to one
/// space. Tags, attribute values, comments and the content of preserved or
/// raw-text elements are copied verbatim. Idempotent.
pub fn minify_html(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    let mut out = String::with_capacity(html.len());
    // Open elements inside the outermost preserved element.
    let mut preserved: Vec<String> = Vec::new();
    // Whether the last thing written was a block-level tag (or nothing yet).
    let mut after_block = true;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '<' && starts_markup(&chars, i) {
            let end = markup_end(&chars, i);
            let tag: String = chars[i..end].iter().collect();
            track_preserved(&tag, &mut preserved);
            after_block = is_block_boundary(&tag);
            out.push_str(&tag);
            i = end;
            continue;
        }

        if !preserved.is_empty() || !ch.is_whitespace() {
            out.push(ch);
            after_block = false;
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        let has_newline = chars[start..i].iter().any(|c| *c == '\n' || *c == '\r');
        let before_block = if i >= chars.len() {
            true
        } else if chars[i] == '<' && starts_markup(&chars, i) {
            let next: String = chars[i..markup_end(&chars, i)].iter().collect();
            is_block_boundary(&next)
        } else {
            false
        };
        if !(has_newline && after_block && before_block) {
            out.push(' ');
            after_block = false;
        }
    }
    out
}

fn markup_end(chars: &[char], start: usize) -> usize {
    if chars[start..].starts_with(&['<', '!', '-', '-']) {
        find_comment_end(chars, start)
    } else {
        find_tag_end(chars, start)
    }
}

/// Doctype, comments and block-level tags, opening or closing.
fn is_block_boundary(tag: &str) -> bool {
    if tag.starts_with("<!") {
        return true;
    }
    let (name, _) = tag_name(tag);
    BLOCK_TAGS.contains(&name.as_str())
}

fn starts_markup(chars: &[char], i: usize) -> bool {
    matches!(chars.get(i + 1), Some(c) if c.is_ascii_alphabetic() || *c == '/' || *c == '!')
}

/// Index just past the `>` closing the tag at `start`, honouring quoted values.
fn find_tag_end(chars: &[char], start: usize) -> usize {
    let mut quote: Option<char> = None;
    for (offset, &ch) in chars[start..].iter().enumerate() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '>' => return start + offset + 1,
            None => {}
        }
    }
    chars.len()
}

fn find_comment_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 4;
    while i + 2 < chars.len() {
        if chars[i] == '-' && chars[i + 1] == '-' && chars[i + 2] == '>' {
            return i + 3;
        }
        i += 1;
    }
    chars.len()
}

fn track_preserved(tag: &str, preserved: &mut Vec<String>) {
    if tag.starts_with("<!") {
        return;
    }
    let (name, is_close) = tag_name(tag);
    if is_close {
        if preserved.last().map(|open| *open == name).unwrap_or(false) {
            preserved.pop();
        }
        return;
    }
    if VOID_TAGS.contains(&name.as_str()) || tag.ends_with("/>") {
        return;
    }
    if !preserved.is_empty()
        || VERBATIM_TAGS.contains(&name.as_str())
        || has_attribute(tag, PRESERVE_NEWLINES_ATTR)
    {
        preserved.push(name);
    }
}

fn tag_name(tag: &str) -> (String, bool) {
    let inner = tag.trim_start_matches('<');
    let (inner, is_close) = match inner.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let name = inner
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();
    (name, is_close)
}

/// Attribute-name check that ignores text inside quoted values.
fn has_attribute(tag: &str, attribute: &str) -> bool {
    let mut unquoted = String::with_capacity(tag.len());
    let mut quote: Option<char> = None;
    for ch in tag.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None => unquoted.push(ch),
        }
    }
    unquoted
        .split(|c: char| c.is_whitespace() || matches!(c, '=' | '/' | '>' | '<'))
        .any(|token| token.eq_ignore_ascii_case(attribute))
}

// ────────────────────────────────────────────────────────────────────────────
// Invariants
// ────────────────────────────────────────────────────────────────────────────

/// Checks the assembled document before transmission: style block order,
/// page-break count and leftover scale transforms.
pub fn verify_invariants(
    document: &str,
    body: &Element,
    mode: LayoutMode,
    page_count: usize,
) -> Result<(), ExportError> {
    let offsets = [
        StyleBlockKind::Reset,
        StyleBlockKind::Captured,
        StyleBlockKind::Override,
    ]
    .map(|kind| document.find(&format!("{STYLE_BLOCK_ATTR}=\"{}\"", kind.as_str())));
    match offsets {
        [Some(reset), Some(captured), Some(overrides)] if reset < captured && captured < overrides => {}
        _ => {
            return Err(ExportError::InvariantViolation(format!(
                "style blocks out of order: {offsets:?}"
            )))
        }
    }

    let pages = count_page_containers(body);
    if pages != page_count {
        return Err(ExportError::InvariantViolation(format!(
            "expected {page_count} page containers, found {pages}"
        )));
    }

    let expected_breaks = match mode {
        LayoutMode::SinglePage => 0,
        LayoutMode::MultiPageWrapper => page_count.saturating_sub(1),
    };
    let breaks = count_break_after_markers(body);
    if breaks != expected_breaks {
        return Err(ExportError::InvariantViolation(format!(
            "expected {expected_breaks} page breaks for {page_count} page(s), found {breaks}"
        )));
    }

    if has_scale_transform(body) {
        return Err(ExportError::InvariantViolation(
            "scale transform left in export body".to_string(),
        ));
    }
    Ok(())
}

pub fn count_page_containers(body: &Element) -> usize {
    body.find_all(|el| el.has_class(PAGE_CLASS)).len()
}
