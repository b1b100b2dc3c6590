//! The live editing document as seen by the export pipeline.
//!
//! `LiveDocument` owns the page the editor is showing plus its active
//! stylesheets. The pipeline only reads it, with one exception: the temporary
//! force-expand stylesheet, which is appended to the active sheets through a
//! `ForceExpandGuard` and removed again when the guard drops.

use std::ops::Deref;

use serde::Deserialize;
use tracing::debug;

use crate::dom::{parse_document, Element, Node};

/// Classes the force-expand stylesheet targets.
const FORCE_EXPAND_TARGETS: &[&str] = &["page-wrapper", "page-content"];

const FORCE_EXPAND_DECLARATIONS: &[(&str, &str)] = &[
    ("height", "auto"),
    ("max-height", "none"),
    ("overflow", "visible"),
    ("display", "block"),
    ("visibility", "visible"),
    ("opacity", "1"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum SheetOrigin {
    /// A `<style>` element in the page.
    Embedded,
    /// A `<link rel="stylesheet">`, or a sheet the UI layer read on our behalf.
    Linked { href: String },
    /// Temporary sheet appended by the pipeline itself.
    Injected { id: u64 },
}

#[derive(Debug, Clone)]
pub struct StyleSheet {
    pub origin: SheetOrigin,
    /// `None` when the rules cannot be read (cross-origin sheet without text).
    pub css: Option<String>,
}

/// Stylesheet text the UI layer could read for a linked sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalStyleSheet {
    pub href: String,
    #[serde(default)]
    pub css: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LiveDocument {
    root: Element,
    stylesheets: Vec<StyleSheet>,
    next_injected_id: u64,
}

impl LiveDocument {
    /// Parses the live page. Linked sheets take their text from `external`
    /// by href; sheets with no text stay inaccessible.
    pub fn parse(page_html: &str, external: &[ExternalStyleSheet]) -> Self {
        let root = parse_document(page_html);
        let mut stylesheets = Vec::new();
        let mut matched = vec![false; external.len()];

        for el in root.find_all(|el| el.name == "style" || is_stylesheet_link(el)) {
            if el.name == "style" {
                stylesheets.push(StyleSheet {
                    origin: SheetOrigin::Embedded,
                    css: Some(el.text_content()),
                });
                continue;
            }

            let href = el.attr("href").unwrap_or("").to_string();
            let css = external
                .iter()
                .position(|sheet| sheet.href == href)
                .and_then(|idx| {
                    matched[idx] = true;
                    external[idx].css.clone()
                });
            stylesheets.push(StyleSheet {
                origin: SheetOrigin::Linked { href },
                css,
            });
        }

        for (sheet, _) in external.iter().zip(matched).filter(|(_, seen)| !seen) {
            stylesheets.push(StyleSheet {
                origin: SheetOrigin::Linked {
                    href: sheet.href.clone(),
                },
                css: sheet.css.clone(),
            });
        }

        Self {
            root,
            stylesheets,
            next_injected_id: 0,
        }
    }

    #[cfg(test)]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Active stylesheets in cascade order, injected sheets last.
    pub fn stylesheets(&self) -> &[StyleSheet] {
        &self.stylesheets
    }

    pub fn find_preview_root(&self, class: &str) -> Option<&Element> {
        if self.root.has_class(class) {
            return Some(&self.root);
        }
        self.root.find_by_class(class)
    }

    /// Detached copy of the preview root, reflecting any injected sheet.
    pub fn clone_preview(&self, class: &str) -> Option<Element> {
        let preview = self.find_preview_root(class)?;
        if self.is_force_expanded() {
            Some(apply_force_expand(preview))
        } else {
            Some(preview.clone())
        }
    }

    pub fn injected_style_count(&self) -> usize {
        self.stylesheets
            .iter()
            .filter(|sheet| matches!(sheet.origin, SheetOrigin::Injected { .. }))
            .count()
    }

    fn is_force_expanded(&self) -> bool {
        self.injected_style_count() > 0
    }

    /// Appends the force-expand stylesheet; it is removed when the guard drops.
    pub fn inject_force_expand(&mut self) -> ForceExpandGuard<'_> {
        let id = self.next_injected_id;
        self.next_injected_id += 1;
        self.stylesheets.push(StyleSheet {
            origin: SheetOrigin::Injected { id },
            css: Some(force_expand_css()),
        });
        debug!("Injected force-expand stylesheet #{id}");
        ForceExpandGuard { document: self, id }
    }

    fn remove_injected(&mut self, id: u64) {
        self.stylesheets
            .retain(|sheet| sheet.origin != SheetOrigin::Injected { id });
    }
}

/// Holds the force-expand stylesheet in place. Dereferences to the document
/// so the pipeline can keep reading it while the sheet is active.
pub struct ForceExpandGuard<'a> {
    document: &'a mut LiveDocument,
    id: u64,
}

impl Deref for ForceExpandGuard<'_> {
    type Target = LiveDocument;

    fn deref(&self) -> &LiveDocument {
        self.document
    }
}

impl Drop for ForceExpandGuard<'_> {
    fn drop(&mut self) {
        self.document.remove_injected(self.id);
        debug!("Removed force-expand stylesheet #{}", self.id);
    }
}

fn is_stylesheet_link(el: &Element) -> bool {
    el.name == "link"
        && el
            .attr("rel")
            .map(|rel| {
                rel.split_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            })
            .unwrap_or(false)
}

fn force_expand_css() -> String {
    let selectors = FORCE_EXPAND_TARGETS
        .iter()
        .map(|class| format!(".{class}"))
        .collect::<Vec<_>>()
        .join(", ");
    let declarations = FORCE_EXPAND_DECLARATIONS
        .iter()
        .map(|(prop, value)| format!("{prop}: {value} !important;"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{selectors} {{ {declarations} }}")
}

/// Copy of `element` with the force-expand declarations applied inline to
/// every targeted node, as the injected rule would resolve them.
fn apply_force_expand(element: &Element) -> Element {
    let mut copy = Element {
        name: element.name.clone(),
        attrs: element.attrs.clone(),
        children: element
            .children
            .iter()
            .map(|child| match child {
                Node::Element(el) => Node::Element(apply_force_expand(el)),
                other => other.clone(),
            })
            .collect(),
    };

    if FORCE_EXPAND_TARGETS.iter().any(|class| copy.has_class(class)) {
        let mut style = copy.style();
        for (prop, value) in FORCE_EXPAND_DECLARATIONS {
            style.set(prop, *value);
        }
        copy.set_style(&style);
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <style>.live-preview-container { color: #111; }</style>
        <link rel="stylesheet" href="https://cdn.example.com/app.css">
        <link rel="icon" href="/favicon.ico">
        </head><body>
        <div class="live-preview-container">
          <div class="multi-page-container">
            <div class="page-wrapper" style="height: 1056px; overflow: hidden"><div class="page-content">One</div></div>
          </div>
        </div></body></html>"#;

    #[test]
    fn test_parse_collects_stylesheets_in_order() {
        let doc = LiveDocument::parse(PAGE, &[]);
        let sheets = doc.stylesheets();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].origin, SheetOrigin::Embedded);
        assert!(sheets[0].css.as_deref().unwrap_or("").contains(".live-preview-container"));
        assert!(matches!(&sheets[1].origin, SheetOrigin::Linked { href } if href.contains("app.css")));
        assert!(sheets[1].css.is_none());
    }

    #[test]
    fn test_parse_uses_external_text_for_linked_sheet() {
        let external = vec![ExternalStyleSheet {
            href: "https://cdn.example.com/app.css".to_string(),
            css: Some(".page-wrapper { margin: 0; }".to_string()),
        }];
        let doc = LiveDocument::parse(PAGE, &external);
        assert_eq!(doc.stylesheets()[1].css.as_deref(), Some(".page-wrapper { margin: 0; }"));
    }

    #[test]
    fn test_guard_removes_injected_sheet_on_drop() {
        let mut doc = LiveDocument::parse(PAGE, &[]);
        {
            let guard = doc.inject_force_expand();
            assert_eq!(guard.injected_style_count(), 1);
            let clone = guard.clone_preview("live-preview-container").unwrap();
            let wrapper = clone.find_by_class("page-wrapper").unwrap();
            assert_eq!(wrapper.style().get("height"), Some("auto"));
            assert_eq!(wrapper.style().get("overflow"), Some("visible"));
        }
        assert_eq!(doc.injected_style_count(), 0);
    }

    #[test]
    fn test_clone_does_not_touch_live_tree() {
        let mut doc = LiveDocument::parse(PAGE, &[]);
        let before = doc.root().clone();
        {
            let guard = doc.inject_force_expand();
            let _ = guard.clone_preview("live-preview-container");
        }
        assert_eq!(doc.root(), &before);
        let wrapper = doc.root().find_by_class("page-wrapper").unwrap();
        assert_eq!(wrapper.style().get("height"), Some("1056px"));
    }

    #[test]
    fn test_guard_released_during_panic_unwind() {
        let mut doc = LiveDocument::parse(PAGE, &[]);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = doc.inject_force_expand();
            panic!("stage failed");
        }));
        assert!(result.is_err());
        assert_eq!(doc.injected_style_count(), 0);
    }

    #[test]
    fn test_missing_preview_root() {
        let doc = LiveDocument::parse("<html><body><p>nothing</p></body></html>", &[]);
        assert!(doc.clone_preview("live-preview-container").is_none());
    }
}
