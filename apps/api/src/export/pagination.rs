//! Pagination Normalizer: turns either live layout into one export body.
//!
//! # Branches
//! - SinglePage: the content container goes into a clean root wrapper, inside
//!   exactly one page container with no break marker.
//! - MultiPageWrapper: every `.page-wrapper` becomes a numbered page container;
//!   all but the last carry a break-after marker, the last a suppression marker.
//!
//! # Invariant
//! N page containers ⇒ N−1 `page-break-after: always` markers, none after the
//! final page. A double or missing break is a bug. Break declarations the
//! editor left on content nodes are stripped, so only the markers remain.

use tracing::{debug, warn};

use crate::dom::{Element, InlineStyle, Node};
use crate::export::models::LayoutMode;

pub const SINGLE_PAGE_CLASS: &str = "single-page-container";
pub const PAGE_WRAPPER_CLASS: &str = "page-wrapper";
pub const PAGE_CONTENT_CLASS: &str = "page-content";

/// Class of every page container in the export body.
pub const PAGE_CLASS: &str = "pdf-page";
/// Parent of the page containers in the multi-page branch.
pub const COMBINED_ROOT_CLASS: &str = "multi-page-pdf-container";

pub const BREAK_AFTER_MARKER: &[(&str, &str)] =
    &[("page-break-after", "always"), ("break-after", "page")];
pub const BREAK_SUPPRESS_MARKER: &[(&str, &str)] =
    &[("page-break-after", "avoid"), ("break-after", "avoid")];

const PADDING_SIDES: [&str; 4] = ["padding-top", "padding-right", "padding-bottom", "padding-left"];

const BREAK_PROPERTIES: &[&str] = &[
    "page-break-after",
    "page-break-before",
    "break-after",
    "break-before",
];

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PaginatedBody {
    pub root: Element,
    pub mode: LayoutMode,
    pub page_count: usize,
}

/// Multi-page when the clone holds any page-wrapper element.
pub fn detect_layout_mode(root: &Element) -> LayoutMode {
    if root.find_by_class(PAGE_WRAPPER_CLASS).is_some() {
        LayoutMode::MultiPageWrapper
    } else {
        LayoutMode::SinglePage
    }
}

/// `sheet_content_style` holds the captured stylesheet declarations aimed at
/// `.page-content`; they count toward the measured padding like inline ones.
pub fn paginate(root: &Element, max_padding_px: f32, sheet_content_style: &InlineStyle) -> PaginatedBody {
    let mode = detect_layout_mode(root);
    let body = match mode {
        LayoutMode::SinglePage => paginate_single(root),
        LayoutMode::MultiPageWrapper => paginate_multi(root, max_padding_px, sheet_content_style),
    };
    debug!("Paginated {:?} body into {} page(s)", body.mode, body.page_count);
    body
}

// ────────────────────────────────────────────────────────────────────────────
// Branches
// ────────────────────────────────────────────────────────────────────────────

fn paginate_single(root: &Element) -> PaginatedBody {
    let content: Vec<Node> = match root.find_by_class(SINGLE_PAGE_CLASS) {
        Some(container) => vec![Node::Element(container.clone())],
        // No dedicated container: the preview root's own children are the page.
        None => root.children.clone(),
    };
    let content = content
        .iter()
        .map(|node| match node {
            Node::Element(el) => Node::Element(strip_breaks(el)),
            other => other.clone(),
        })
        .collect();

    let mut page = page_container(1);
    let mut style = InlineStyle::default();
    style.set("box-sizing", "border-box");
    style.set("overflow", "visible");
    page.set_style(&style);
    page.children = content;

    PaginatedBody {
        root: clean_root(root).with_child(page),
        mode: LayoutMode::SinglePage,
        page_count: 1,
    }
}

fn paginate_multi(root: &Element, max_padding_px: f32, sheet_content_style: &InlineStyle) -> PaginatedBody {
    let wrappers = root.find_all(|el| el.has_class(PAGE_WRAPPER_CLASS));
    let total = wrappers.len();
    let mut combined = Element::new("div").with_attr("class", COMBINED_ROOT_CLASS);

    for (idx, wrapper) in wrappers.into_iter().enumerate() {
        let number = idx + 1;
        let content = match wrapper.find_by_class(PAGE_CONTENT_CLASS) {
            Some(content) => content.clone(),
            None => {
                warn!("Page wrapper {number} has no .{PAGE_CONTENT_CLASS}; exporting wrapper body");
                let mut content = wrapper.clone();
                content.remove_class(PAGE_WRAPPER_CLASS);
                content
            }
        };

        let mut content = strip_breaks(&content);
        let mut content_style = content.style();
        let mut measured = sheet_content_style.clone();
        measured.append(&content_style);
        let padding = clamp_padding(measure_padding(&measured), max_padding_px);
        content_style.remove("padding");
        for side in PADDING_SIDES {
            content_style.remove(side);
        }
        content.set_style(&content_style);

        let mut style = InlineStyle::default();
        style.set(
            "padding",
            format!(
                "{}px {}px {}px {}px",
                fmt_px(padding[0]),
                fmt_px(padding[1]),
                fmt_px(padding[2]),
                fmt_px(padding[3])
            ),
        );
        style.set("box-sizing", "border-box");
        style.set("overflow", "visible");
        let marker = if number < total {
            BREAK_AFTER_MARKER
        } else {
            BREAK_SUPPRESS_MARKER
        };
        for (prop, value) in marker {
            style.set(prop, *value);
        }

        let mut page = page_container(number);
        page.set_style(&style);
        page.children.push(Node::Element(content));
        combined.children.push(Node::Element(page));
    }

    PaginatedBody {
        root: clean_root(root).with_child(combined),
        mode: LayoutMode::MultiPageWrapper,
        page_count: total,
    }
}

/// Same tag and classes as the preview root, structural styling reset.
fn clean_root(root: &Element) -> Element {
    let mut clean = Element::new(&root.name);
    if let Some(class) = root.attr("class") {
        clean.set_attr("class", class);
    }
    let mut style = root.style();
    style.set("padding", "0");
    style.set("margin", "0");
    style.set("background", "#ffffff");
    for side in PADDING_SIDES {
        style.remove(side);
    }
    for side in ["margin-top", "margin-right", "margin-bottom", "margin-left", "background-color"] {
        style.remove(side);
    }
    style.remove_where(|prop, _| BREAK_PROPERTIES.contains(&prop));
    clean.set_style(&style);
    clean
}

/// Copy of `el` with every break declaration removed from it and its descendants.
fn strip_breaks(el: &Element) -> Element {
    let mut copy = Element {
        name: el.name.clone(),
        attrs: el.attrs.clone(),
        children: el
            .children
            .iter()
            .map(|child| match child {
                Node::Element(child) => Node::Element(strip_breaks(child)),
                other => other.clone(),
            })
            .collect(),
    };
    let mut style = copy.style();
    if style.remove_where(|prop, _| BREAK_PROPERTIES.contains(&prop)) > 0 {
        debug!("Dropped editor page break on <{}>", copy.name);
        copy.set_style(&style);
    }
    copy
}

fn page_container(number: usize) -> Element {
    Element::new("div")
        .with_attr("class", format!("{PAGE_CLASS} {PAGE_CLASS}-{number}"))
        .with_attr("data-page", number.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Padding measurement
// ────────────────────────────────────────────────────────────────────────────

/// Resolved [top, right, bottom, left] padding in px. Unresolvable lengths
/// (percentages, calc) come back as infinity so clamping caps them.
pub(crate) fn measure_padding(style: &InlineStyle) -> [f32; 4] {
    let mut sides = [0.0f32; 4];
    // Declaration order decides which of shorthand and longhand wins.
    for (prop, value) in style.iter() {
        if prop == "padding" {
            let parts: Vec<f32> = value.split_whitespace().map(parse_length_px).collect();
            sides = match parts.as_slice() {
                [all] => [*all; 4],
                [v, h] => [*v, *h, *v, *h],
                [t, h, b] => [*t, *h, *b, *h],
                [t, r, b, l, ..] => [*t, *r, *b, *l],
                [] => sides,
            };
        } else if let Some(idx) = PADDING_SIDES.iter().position(|side| *side == prop) {
            sides[idx] = parse_length_px(value);
        }
    }
    sides
}

fn clamp_padding(sides: [f32; 4], max_px: f32) -> [f32; 4] {
    let max_px = max_px.max(0.0);
    sides.map(|side| side.max(0.0).min(max_px))
}

pub(crate) fn parse_length_px(raw: &str) -> f32 {
    let value = raw.trim().trim_end_matches("!important").trim().to_ascii_lowercase();
    if value == "0" {
        return 0.0;
    }
    const UNITS: &[(&str, f32)] = &[
        ("px", 1.0),
        ("pt", 96.0 / 72.0),
        ("in", 96.0),
        ("cm", 96.0 / 2.54),
        ("mm", 96.0 / 25.4),
        ("rem", 16.0),
        ("em", 16.0),
    ];
    for (unit, factor) in UNITS {
        if let Some(number) = value.strip_suffix(unit) {
            if let Ok(n) = number.trim().parse::<f32>() {
                return n * factor;
            }
        }
    }
    f32::INFINITY
}

fn fmt_px(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

/// Counts inline `page-break-after: always` markers in a body tree.
pub fn count_break_after_markers(root: &Element) -> usize {
    let own = usize::from(root.style().get("page-break-after") == Some("always"));
    own + root
        .find_all(|el| el.style().get("page-break-after") == Some("always"))
        .len()
}
