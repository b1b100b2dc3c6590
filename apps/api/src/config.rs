use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub render_service_url: String,
    pub render_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
    pub export: ExportConfig,
}

/// Knobs for the export pipeline. `Default` matches the live editor's markup.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Class carried by the live preview root element.
    pub preview_root_class: String,
    /// Class prefixes whose rules count as the document's own styling.
    pub class_prefixes: Vec<String>,
    /// Editor-only classes (page numbers, boundary guides, break indicators).
    pub chrome_classes: Vec<String>,
    /// Visible labels of download affordances.
    pub download_labels: Vec<String>,
    /// Classes whose text relies on literal newlines.
    pub preserve_classes: Vec<String>,
    pub page_size: String,
    pub page_margin: String,
    /// Upper bound per side for padding carried over from a page wrapper.
    pub max_page_padding_px: f32,
    /// The single pinned web-font stylesheet referenced by exported documents.
    pub font_stylesheet_url: String,
    /// Default rendering backend hint sent to the render service.
    pub engine_hint: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            preview_root_class: "live-preview-container".to_string(),
            class_prefixes: to_strings(&[
                "live-preview-container",
                "single-page-container",
                "multi-page-container",
                "page-wrapper",
                "page-content",
            ]),
            chrome_classes: to_strings(&[
                "page-number",
                "page-boundary",
                "boundary-guide",
                "boundary-toggle",
                "page-break-indicator",
            ]),
            download_labels: to_strings(&["Download PDF"]),
            preserve_classes: to_strings(&["skills-content"]),
            page_size: "Letter".to_string(),
            page_margin: "0.5in".to_string(),
            max_page_padding_px: 20.0,
            font_stylesheet_url:
                "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&display=swap"
                    .to_string(),
            engine_hint: "chromium".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = ExportConfig::default();
        let export = ExportConfig {
            preview_root_class: env_or("EXPORT_PREVIEW_ROOT_CLASS", defaults.preview_root_class),
            class_prefixes: env_list("EXPORT_CLASS_PREFIXES", defaults.class_prefixes),
            chrome_classes: env_list("EXPORT_CHROME_CLASSES", defaults.chrome_classes),
            download_labels: env_list("EXPORT_DOWNLOAD_LABELS", defaults.download_labels),
            preserve_classes: env_list("EXPORT_PRESERVE_CLASSES", defaults.preserve_classes),
            page_size: env_or("EXPORT_PAGE_SIZE", defaults.page_size),
            page_margin: env_or("EXPORT_PAGE_MARGIN", defaults.page_margin),
            max_page_padding_px: std::env::var("EXPORT_MAX_PAGE_PADDING_PX")
                .ok()
                .map(|v| v.parse::<f32>())
                .transpose()
                .context("EXPORT_MAX_PAGE_PADDING_PX must be a number")?
                .unwrap_or(defaults.max_page_padding_px),
            font_stylesheet_url: env_or("EXPORT_FONT_URL", defaults.font_stylesheet_url),
            engine_hint: env_or("RENDER_ENGINE", defaults.engine_hint),
        };

        Ok(Config {
            render_service_url: require_env("RENDER_SERVICE_URL")?,
            render_timeout_secs: std::env::var("RENDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("RENDER_TIMEOUT_SECS must be a whole number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            export,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_list(key: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => parse_list(&raw),
        Err(_) => default,
    }
}

/// Comma-separated list; blank entries are dropped.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_drops_blanks() {
        assert_eq!(
            parse_list(" page-wrapper, ,page-content ,"),
            vec!["page-wrapper".to_string(), "page-content".to_string()]
        );
    }

    #[test]
    fn test_default_export_config_targets_live_preview() {
        let config = ExportConfig::default();
        assert_eq!(config.preview_root_class, "live-preview-container");
        assert!(config.class_prefixes.iter().any(|p| p == "page-wrapper"));
        assert_eq!(config.max_page_padding_px, 20.0);
    }
}
