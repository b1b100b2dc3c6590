//! Font & Scale Normalizer.
//!
//! The live preview renders at `BASE_EDITOR_ZOOM × font-size multiplier` so the
//! editor stays legible on screen. Print has its own absolute units, so every
//! zoom/transform declaration is stripped, and fixed heights computed for the
//! zoomed viewport are released. Inline `font-size` is authoritative and never
//! touched.

use tracing::debug;

use crate::dom::{Element, InlineStyle, Node};
use crate::export::models::FontSizeSetting;
use crate::export::templates::TemplateProfile;

pub const BASE_EDITOR_ZOOM: f32 = 2.0;

const SCALE_PROPERTIES: &[&str] = &[
    "transform",
    "-webkit-transform",
    "-moz-transform",
    "-ms-transform",
    "-o-transform",
    "transform-origin",
    "-webkit-transform-origin",
    "scale",
    "zoom",
];

const HEIGHT_RESETS: &[(&str, &str)] = &[
    ("height", "auto"),
    ("min-height", "auto"),
    ("max-height", "none"),
];

#[derive(Debug, Clone)]
pub struct NormalizedTree {
    pub root: Element,
    /// Zoom the editor was applying, for the export report.
    pub editor_zoom: f32,
    pub stripped_declarations: usize,
}

pub fn normalize_fonts_and_scale(
    root: &Element,
    profile: &TemplateProfile,
    font_size: FontSizeSetting,
) -> NormalizedTree {
    let editor_zoom = BASE_EDITOR_ZOOM * font_size.multiplier();
    let mut stripped = 0;
    let mut normalized = strip_scale(root, &mut stripped);

    let mut style = normalized.style();
    style.set_if_absent("font-family", profile.font_family);
    style.set_if_absent("line-height", profile.line_height.to_string());
    normalized.set_style(&style);

    debug!(
        "Neutralized editor zoom {editor_zoom}x ({stripped} declarations) with template {}",
        profile.id
    );
    NormalizedTree {
        root: normalized,
        editor_zoom,
        stripped_declarations: stripped,
    }
}

fn strip_scale(el: &Element, stripped: &mut usize) -> Element {
    let mut copy = Element {
        name: el.name.clone(),
        attrs: el.attrs.clone(),
        children: el
            .children
            .iter()
            .map(|child| match child {
                Node::Element(child) => Node::Element(strip_scale(child, stripped)),
                other => other.clone(),
            })
            .collect(),
    };

    if !copy.has_attr("style") {
        return copy;
    }
    let mut style = copy.style();
    *stripped += style.remove_where(|prop, _| SCALE_PROPERTIES.contains(&prop));
    for (prop, value) in HEIGHT_RESETS {
        if style.contains(prop) {
            style.set(prop, *value);
        }
    }
    copy.set_style(&style);
    copy
}

/// True if any node (including `root`) still carries a scale/transform declaration.
pub fn has_scale_transform(root: &Element) -> bool {
    let carries = |el: &Element| -> bool {
        el.has_attr("style") && declares_scale(&el.style())
    };
    carries(root) || root.contains_element(carries)
}

fn declares_scale(style: &InlineStyle) -> bool {
    style
        .iter()
        .any(|(prop, value)| SCALE_PROPERTIES.contains(&prop) && !is_identity(value))
}

fn is_identity(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "none" | "scale(1)" | "1" | "normal"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;
    use crate::export::templates::lookup_profile;

    fn root_from(html: &str) -> Element {
        parse_fragment(html)[0].as_element().expect("root").clone()
    }

    #[test]
    fn test_strips_scale_from_every_node() {
        let root = root_from(
            r#"<div style="transform: scale(2.4); transform-origin: top left"><div style="-webkit-transform: scale(2); zoom: 1.2; color: red"><span style="scale: 2">x</span></div></div>"#,
        );
        assert!(has_scale_transform(&root));
        let result = normalize_fonts_and_scale(&root, lookup_profile(None), FontSizeSetting::Large);
        assert!(!has_scale_transform(&result.root));
        assert_eq!(result.stripped_declarations, 5);
        let inner = result.root.find(|el| el.style().get("color").is_some()).unwrap();
        assert_eq!(inner.style().to_css(), "color: red");
    }

    #[test]
    fn test_inline_font_size_untouched() {
        let root = root_from(r#"<div><div style="font-size: 18px; transform: scale(2)">Name</div></div>"#);
        let result = normalize_fonts_and_scale(&root, lookup_profile(None), FontSizeSetting::Medium);
        let name = result.root.find(|el| el.text_content() == "Name").unwrap();
        assert_eq!(name.style().to_css(), "font-size: 18px");
    }

    #[test]
    fn test_fixed_heights_released() {
        let root = root_from(
            r#"<div><div style="height: 1056px; min-height: 900px; max-height: 1056px; width: 816px">x</div></div>"#,
        );
        let result = normalize_fonts_and_scale(&root, lookup_profile(None), FontSizeSetting::Medium);
        let node = result.root.find(|el| el.text_content() == "x").unwrap();
        assert_eq!(
            node.style().to_css(),
            "height: auto; min-height: auto; max-height: none; width: 816px"
        );
    }

    #[test]
    fn test_template_typography_is_fallback_only() {
        let profile = lookup_profile(Some("executive-serif"));
        let plain = root_from(r#"<div class="live-preview-container">x</div>"#);
        let result = normalize_fonts_and_scale(&plain, profile, FontSizeSetting::Medium);
        assert_eq!(result.root.style().get("font-family"), Some("'Georgia', serif"));
        assert_eq!(result.root.style().get("line-height"), Some("1.3"));

        let styled = root_from(r#"<div class="live-preview-container" style="font-family: Garamond">x</div>"#);
        let result = normalize_fonts_and_scale(&styled, profile, FontSizeSetting::Medium);
        assert_eq!(result.root.style().get("font-family"), Some("Garamond"));
        assert_eq!(result.root.style().get("line-height"), Some("1.3"));
    }

    #[test]
    fn test_editor_zoom_reported() {
        let root = root_from("<div>x</div>");
        let result = normalize_fonts_and_scale(&root, lookup_profile(None), FontSizeSetting::Small);
        assert!((result.editor_zoom - 1.7).abs() < 1e-6);
    }

    #[test]
    fn test_identity_transform_not_flagged() {
        let root = root_from(r#"<div style="transform: none">x</div>"#);
        assert!(!has_scale_transform(&root));
    }
}
