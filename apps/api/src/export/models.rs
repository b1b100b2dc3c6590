//! Value types flowing through the export pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::export::error::ExportError;

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

/// Which live layout the preview was using when the export started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One continuous page (`.single-page-container`).
    SinglePage,
    /// Discrete `.page-wrapper` elements, one per printed page.
    MultiPageWrapper,
}

/// Editor font-size setting. The preview multiplies its base zoom by this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSizeSetting {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl FontSizeSetting {
    pub fn multiplier(self) -> f32 {
        match self {
            FontSizeSetting::Small => 0.85,
            FontSizeSetting::Medium => 1.0,
            FontSizeSetting::Large => 1.15,
            FontSizeSetting::ExtraLarge => 1.3,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Style snapshot
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleBlockKind {
    Reset,
    Captured,
    Override,
}

impl StyleBlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleBlockKind::Reset => "reset",
            StyleBlockKind::Captured => "captured",
            StyleBlockKind::Override => "override",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StyleBlock {
    pub kind: StyleBlockKind,
    pub css: String,
}

/// Ordered CSS blocks. Order is always reset → captured → override, one of each.
#[derive(Debug, Clone, Default)]
pub struct StyleSnapshot {
    blocks: Vec<StyleBlock>,
}

impl StyleSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block; fails if `kind` does not come strictly after the last one.
    pub fn push(&mut self, kind: StyleBlockKind, css: impl Into<String>) -> Result<(), ExportError> {
        if let Some(last) = self.blocks.last() {
            if kind <= last.kind {
                return Err(ExportError::InvariantViolation(format!(
                    "style block '{}' pushed after '{}'",
                    kind.as_str(),
                    last.kind.as_str()
                )));
            }
        }
        self.blocks.push(StyleBlock {
            kind,
            css: css.into(),
        });
        Ok(())
    }

    pub fn blocks(&self) -> &[StyleBlock] {
        &self.blocks
    }

    pub fn is_complete(&self) -> bool {
        self.blocks.len() == 3
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Render request / outcome
// ────────────────────────────────────────────────────────────────────────────

/// Contact fields forwarded to the render service for its own bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// The fully assembled payload handed to Transport.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub html_document: String,
    pub contact: ContactFields,
    pub engine_hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Success {
        download_url: String,
    },
    QuotaExceeded {
        plan: String,
        limit: Option<u32>,
        reset_date: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Summary of one export, returned to the caller and logged.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub export_id: Uuid,
    pub template_id: String,
    pub layout_mode: LayoutMode,
    pub page_count: usize,
    pub captured_rules: usize,
    pub skipped_stylesheets: usize,
    pub removed_chrome: usize,
    pub editor_zoom: f32,
    pub document_bytes: usize,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_accepts_canonical_order() {
        let mut snapshot = StyleSnapshot::new();
        snapshot.push(StyleBlockKind::Reset, "a").unwrap();
        snapshot.push(StyleBlockKind::Captured, "b").unwrap();
        snapshot.push(StyleBlockKind::Override, "c").unwrap();
        assert!(snapshot.is_complete());
    }

    #[test]
    fn test_snapshot_rejects_out_of_order_block() {
        let mut snapshot = StyleSnapshot::new();
        snapshot.push(StyleBlockKind::Override, "c").unwrap();
        let err = snapshot.push(StyleBlockKind::Captured, "b").unwrap_err();
        assert!(matches!(err, ExportError::InvariantViolation(_)));
    }

    #[test]
    fn test_snapshot_rejects_duplicate_block() {
        let mut snapshot = StyleSnapshot::new();
        snapshot.push(StyleBlockKind::Reset, "a").unwrap();
        assert!(snapshot.push(StyleBlockKind::Reset, "a").is_err());
    }

    #[test]
    fn test_font_size_setting_deserializes_kebab_case() {
        let setting: FontSizeSetting = serde_json::from_str("\"extra-large\"").unwrap();
        assert_eq!(setting, FontSizeSetting::ExtraLarge);
        assert_eq!(FontSizeSetting::default().multiplier(), 1.0);
    }

    #[test]
    fn test_render_outcome_serializes_with_status_tag() {
        let outcome = RenderOutcome::QuotaExceeded {
            plan: "free".to_string(),
            limit: Some(1),
            reset_date: Some("2025-01-01".to_string()),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "quota_exceeded");
        assert_eq!(value["plan"], "free");
    }
}
