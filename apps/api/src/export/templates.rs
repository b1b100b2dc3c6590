//! Template typography catalog.
//!
//! One immutable profile per template. Legacy ids from older builder versions
//! resolve to their current slug; unknown ids fall back to the default template.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemplateProfile {
    pub id: &'static str,
    pub font_family: &'static str,
    pub line_height: f32,
}

pub const DEFAULT_TEMPLATE_ID: &str = "classic-professional";

const CATALOG: &[TemplateProfile] = &[
    TemplateProfile {
        id: "classic-professional",
        font_family: "'Calibri', 'Arial', sans-serif",
        line_height: 1.2,
    },
    TemplateProfile {
        id: "modern-clean",
        font_family: "'Segoe UI', 'Tahoma', 'Geneva', 'Verdana', sans-serif",
        line_height: 1.4,
    },
    TemplateProfile {
        id: "executive-serif",
        font_family: "'Georgia', serif",
        line_height: 1.3,
    },
];

const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("temp1", "classic-professional"),
    ("modern", "modern-clean"),
    ("industry-manager", "executive-serif"),
];

/// Maps legacy ids to current slugs; blank input yields the default id.
pub fn normalize_template_id(raw: Option<&str>) -> &str {
    let raw = match raw.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => return DEFAULT_TEMPLATE_ID,
    };
    LEGACY_ALIASES
        .iter()
        .find(|(legacy, _)| *legacy == raw)
        .map(|(_, current)| *current)
        .unwrap_or(raw)
}

pub fn lookup_profile(template_id: Option<&str>) -> &'static TemplateProfile {
    let id = normalize_template_id(template_id);
    CATALOG
        .iter()
        .find(|profile| profile.id == id)
        .unwrap_or(&CATALOG[0])
}
