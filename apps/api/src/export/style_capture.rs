//! Style Capture: pulls the document's own rules out of the active stylesheets.
//!
//! Rules are selected by scanning each readable stylesheet's top-level rule list
//! in source order and keeping style rules whose selector mentions one of the
//! namespace class prefixes. Computed styles are never walked.
//!
//! After selection:
//! - interactive selectors (`:hover`, `:focus`, `:active`, `button`) are dropped
//! - `box-shadow` / `border-radius` declarations are removed; flattened print
//!   output shows them as seams around the page

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::dom::css::{parse_rules, split_selector_list, CssRule};
use crate::dom::{Element, InlineStyle};
use crate::export::live::{SheetOrigin, StyleSheet};

static SCREEN_EFFECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:-webkit-|-moz-)?box-shadow\s*:[^;}]*;?|border(?:-(?:top|bottom)-(?:left|right))?-radius\s*:[^;}]*;?",
    )
    .expect("screen effect pattern is valid")
});

static CLASS_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(-?[A-Za-z_][\w-]*)").expect("class name pattern is valid"));

const INTERACTIVE_PSEUDO_CLASSES: &[&str] = &[":hover", ":focus", ":active", ":focus-visible"];

// ────────────────────────────────────────────────────────────────────────────
// Namespace
// ────────────────────────────────────────────────────────────────────────────

/// Allow-list of class prefixes that belong to the exported document.
#[derive(Debug, Clone)]
pub struct ClassNamespace {
    prefixes: Vec<String>,
}

impl ClassNamespace {
    /// Builds the namespace from configured prefixes plus the template class
    /// detected on the preview root, if any.
    pub fn new(prefixes: &[String], template_class: Option<&str>) -> Self {
        let mut all: Vec<String> = prefixes.to_vec();
        if let Some(class) = template_class {
            if !all.iter().any(|p| p == class) {
                all.push(class.to_string());
            }
        }
        Self { prefixes: all }
    }

    pub fn matches_selector(&self, selector: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| selector.contains(&format!(".{prefix}")))
    }
}

/// First class on the preview root that is not the root marker class.
pub fn detect_template_class(preview_root: &Element, root_class: &str) -> Option<String> {
    preview_root
        .classes()
        .find(|class| *class != root_class)
        .map(str::to_string)
}

// ────────────────────────────────────────────────────────────────────────────
// Capture
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CapturedStyles {
    pub css: String,
    pub rule_count: usize,
    pub skipped_sheets: usize,
    /// Classes whose captured rules paint a border, background or shadow.
    /// Empty nodes carrying one of these are visual dividers, not noise.
    pub decorated_classes: BTreeSet<String>,
    /// Kept rules after filtering, in source order.
    pub rules: Vec<CssRule>,
}

impl CapturedStyles {
    /// Declarations of every captured rule whose subject carries `class`,
    /// in source order, so later rules win on lookup.
    pub fn declarations_for_subject(&self, class: &str) -> InlineStyle {
        let blocks: Vec<&str> = self
            .rules
            .iter()
            .filter(|rule| subject_classes(&rule.prelude).iter().any(|c| c == class))
            .map(|rule| rule.block.as_str())
            .collect();
        InlineStyle::parse(&blocks.join(";"))
    }
}

pub fn capture_styles(sheets: &[StyleSheet], namespace: &ClassNamespace) -> CapturedStyles {
    let mut captured = CapturedStyles::default();

    for sheet in sheets {
        if matches!(sheet.origin, SheetOrigin::Injected { .. }) {
            continue;
        }
        let Some(css) = sheet.css.as_deref() else {
            let source = match &sheet.origin {
                SheetOrigin::Linked { href } => href.as_str(),
                _ => "<style>",
            };
            warn!("Skipping inaccessible stylesheet: {source}");
            captured.skipped_sheets += 1;
            continue;
        };

        for rule in parse_rules(css) {
            if rule.is_at_rule() || !namespace.matches_selector(&rule.prelude) {
                continue;
            }
            let Some(selector) = strip_interactive_selectors(&rule.prelude) else {
                continue;
            };

            if paints_decoration(&rule.block) {
                captured
                    .decorated_classes
                    .extend(subject_classes(&selector));
            }

            let block = strip_screen_effects(&rule.block);
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            captured.rules.push(CssRule {
                prelude: selector,
                block: block.to_string(),
            });
        }
    }

    captured.rule_count = captured.rules.len();
    // Captured text lands inside a <style> element; never let it close it early.
    captured.css = captured
        .rules
        .iter()
        .map(|rule| format!("{} {{ {} }}", rule.prelude, rule.block))
        .collect::<Vec<_>>()
        .join("\n")
        .replace("</", "<\\/");
    debug!(
        "Captured {} rules ({} stylesheets skipped)",
        captured.rule_count, captured.skipped_sheets
    );
    captured
}

// ────────────────────────────────────────────────────────────────────────────
// Selector helpers
// ────────────────────────────────────────────────────────────────────────────

/// Drops interactive selectors from a selector list. `None` when nothing remains.
fn strip_interactive_selectors(selector_list: &str) -> Option<String> {
    let kept: Vec<String> = split_selector_list(selector_list)
        .into_iter()
        .filter(|selector| !is_interactive_selector(selector))
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(", "))
    }
}

fn is_interactive_selector(selector: &str) -> bool {
    let lower = selector.to_ascii_lowercase();
    INTERACTIVE_PSEUDO_CLASSES.iter().any(|p| lower.contains(p))
        || lower
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
            .any(|token| token == "button" || token.starts_with("button."))
}

fn strip_screen_effects(block: &str) -> String {
    SCREEN_EFFECT_RE.replace_all(block, "").into_owned()
}

fn paints_decoration(block: &str) -> bool {
    InlineStyle::parse(block)
        .iter()
        .any(|(prop, value)| is_decorating_declaration(prop, value))
}

/// Border, background or shadow declarations that actually paint something.
pub(crate) fn is_decorating_declaration(prop: &str, value: &str) -> bool {
    let value = value
        .trim_end_matches("!important")
        .trim()
        .to_ascii_lowercase();
    let paints = !matches!(value.as_str(), "none" | "0" | "0px" | "transparent" | "initial" | "unset");
    let relevant = (prop.starts_with("border")
        && !matches!(prop, "border-radius" | "border-collapse" | "border-spacing")
        && !prop.ends_with("-radius"))
        || prop.starts_with("background")
        || prop == "box-shadow";
    relevant && paints
}

/// Classes on the rightmost compound selector of each selector in the list.
fn subject_classes(selector_list: &str) -> Vec<String> {
    split_selector_list(selector_list)
        .iter()
        .filter_map(|selector| {
            selector
                .split(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
                .filter(|part| !part.is_empty())
                .last()
                .map(str::to_string)
        })
        .flat_map(|compound| {
            CLASS_NAME_RE
                .captures_iter(&compound)
                .map(|cap| cap[1].to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}
