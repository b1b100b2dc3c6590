//! Override Injector: the final CSS block of the exported document.
//!
//! Everything here must beat whatever the captured styles say, across
//! renderers, so each declaration carries `!important`. `@page` descriptors
//! are the one exception (`!important` is invalid there).

use crate::export::pagination::{COMBINED_ROOT_CLASS, PAGE_CLASS, PAGE_CONTENT_CLASS};

pub const PRESERVE_NEWLINES_ATTR: &str = "data-preserve-newlines";
/// Flag value for nodes whose runs of spaces matter too.
pub const PRESERVE_SPACES: &str = "spaces";

pub struct OverrideOptions<'a> {
    pub page_size: &'a str,
    pub page_margin: &'a str,
    pub preview_root_class: &'a str,
    pub chrome_classes: &'a [String],
}

pub fn build_override_css(options: &OverrideOptions<'_>) -> String {
    let root = format!(".{}", options.preview_root_class);
    let page = format!(".{PAGE_CLASS}");
    let combined = format!(".{COMBINED_ROOT_CLASS}");

    let mut hidden = vec!["button".to_string()];
    hidden.extend(options.chrome_classes.iter().map(|class| format!(".{class}")));

    let mut blocks = vec![format!(
        "@page {{ size: {}; margin: {}; }}",
        options.page_size, options.page_margin
    )];

    blocks.push(rule(&hidden, &[("display", "none"), ("visibility", "hidden")]));

    blocks.push(rule(
        &[
            "html".to_string(),
            "body".to_string(),
            root.clone(),
            combined.clone(),
            page.clone(),
        ],
        &[
            ("background", "#ffffff"),
            ("background-color", "#ffffff"),
            ("color", "#000000"),
            ("-webkit-print-color-adjust", "exact"),
            ("print-color-adjust", "exact"),
        ],
    ));

    blocks.push(rule(
        &[format!("{root} *"), root.clone()],
        &[
            ("overflow-wrap", "anywhere"),
            ("word-wrap", "break-word"),
            ("word-break", "break-word"),
            ("-webkit-hyphens", "auto"),
            ("hyphens", "auto"),
        ],
    ));

    blocks.push(rule(
        &[page.clone()],
        &[
            ("page-break-inside", "avoid"),
            ("break-inside", "avoid"),
            ("box-sizing", "border-box"),
        ],
    ));

    // Content padding was measured and moved onto the page container.
    blocks.push(rule(
        &[format!("{page} > .{PAGE_CONTENT_CLASS}")],
        &[("padding", "0")],
    ));

    blocks.push(rule(
        &[format!("{combined} > {page}:not(:last-child)")],
        &[
            ("page-break-after", "always"),
            ("break-after", "page"),
            ("-webkit-column-break-after", "always"),
        ],
    ));

    blocks.push(rule(
        &[format!("{combined} > {page}:last-child"), format!("{root} > {page}")],
        &[
            ("page-break-after", "avoid"),
            ("break-after", "avoid"),
            ("-webkit-column-break-after", "avoid"),
        ],
    ));

    blocks.push(rule(
        &[root],
        &[
            ("transform", "none"),
            ("-webkit-transform", "none"),
            ("zoom", "1"),
        ],
    ));

    blocks.push(rule(
        &[format!("[{PRESERVE_NEWLINES_ATTR}]")],
        &[("white-space", "pre-line")],
    ));
    blocks.push(rule(
        &[format!("[{PRESERVE_NEWLINES_ATTR}=\"{PRESERVE_SPACES}\"]")],
        &[("white-space", "pre-wrap")],
    ));

    blocks.join("\n")
}

fn rule(selectors: &[String], declarations: &[(&str, &str)]) -> String {
    let body = declarations
        .iter()
        .map(|(prop, value)| format!("{prop}: {value} !important;"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {{ {body} }}", selectors.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::css::parse_rules;

    fn build() -> String {
        let chrome = vec!["page-number".to_string(), "boundary-toggle".to_string()];
        build_override_css(&OverrideOptions {
            page_size: "Letter",
            page_margin: "0.5in",
            preview_root_class: "live-preview-container",
            chrome_classes: &chrome,
        })
    }

    #[test]
    fn test_page_rule_is_fixed_size() {
        let css = build();
        assert!(css.starts_with("@page { size: Letter; margin: 0.5in; }"));
    }

    #[test]
    fn test_every_style_declaration_is_important() {
        let css = build();
        for rule in parse_rules(&css) {
            if rule.prelude.starts_with('@') {
                assert!(!rule.block.contains("!important"));
                continue;
            }
            for decl in rule.block.split(';').map(str::trim).filter(|d| !d.is_empty()) {
                assert!(decl.ends_with("!important"), "missing !important: {decl}");
            }
        }
    }

    #[test]
    fn test_hides_buttons_and_chrome_classes() {
        let css = build();
        assert!(css.contains("button, .page-number, .boundary-toggle { display: none !important;"));
    }

    #[test]
    fn test_page_breaks_reasserted_with_last_page_suppressed() {
        let css = build();
        assert!(css.contains(
            ".multi-page-pdf-container > .pdf-page:not(:last-child) { page-break-after: always !important; break-after: page !important; -webkit-column-break-after: always !important; }"
        ));
        assert!(css.contains(".multi-page-pdf-container > .pdf-page:last-child"));
        assert!(css.contains("page-break-inside: avoid !important"));
    }

    #[test]
    fn test_preserved_nodes_keep_line_breaks() {
        let css = build();
        let lines = css
            .find("[data-preserve-newlines] { white-space: pre-line !important; }")
            .unwrap();
        let spaces = css
            .find("[data-preserve-newlines=\"spaces\"] { white-space: pre-wrap !important; }")
            .unwrap();
        // Same specificity, so the space-preserving rule has to come later.
        assert!(lines < spaces);
    }

    #[test]
    fn test_moved_content_padding_is_reset() {
        let css = build();
        assert!(css.contains(".pdf-page > .page-content { padding: 0 !important; }"));
    }
}
