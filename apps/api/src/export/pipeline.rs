//! Export pipeline: live document → self-contained print document → render service.
//!
//! Stages run in a fixed order, each taking the previous stage's tree by
//! reference and returning a new one:
//!
//! 1. Force-expand guard + preview clone
//! 2. Style Capture
//! 3. Chrome Stripper
//! 4. Pagination Normalizer
//! 5. Font & Scale Normalizer
//! 6. Override Injector
//! 7. Document Assembler (assemble, minify, verify)
//! 8. Transport
//!
//! The live document is touched only by the force-expand guard, which is
//! released before anything can fail past the capture step.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::export::assembler::{
    assemble_document, flag_preserved_nodes, minify_html, reset_css, verify_invariants,
    AssemblyParts,
};
use crate::export::chrome::{strip_chrome, ChromeRules};
use crate::export::error::ExportError;
use crate::export::live::LiveDocument;
use crate::export::models::{
    ContactFields, ExportReport, FontSizeSetting, RenderOutcome, RenderRequest, StyleBlockKind,
    StyleSnapshot,
};
use crate::export::normalize::normalize_fonts_and_scale;
use crate::export::overrides::{build_override_css, OverrideOptions};
use crate::export::pagination::{paginate, PAGE_CONTENT_CLASS};
use crate::export::style_capture::{capture_styles, detect_template_class, ClassNamespace};
use crate::export::templates::lookup_profile;
use crate::render_client::RenderBackend;

/// Per-export choices made in the UI.
#[derive(Debug, Clone, Default)]
pub struct ExportInput {
    pub template_id: Option<String>,
    pub font_size: FontSizeSetting,
    pub contact: ContactFields,
    pub engine_hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PreparedExport {
    pub request: RenderRequest,
    pub report: ExportReport,
}

/// Runs every synchronous stage and returns the payload for Transport.
pub fn prepare_export(
    live: &mut LiveDocument,
    input: &ExportInput,
    config: &ExportConfig,
) -> Result<PreparedExport, ExportError> {
    let guard = live.inject_force_expand();
    let preview = guard
        .clone_preview(&config.preview_root_class)
        .ok_or_else(|| ExportError::PreviewMissing {
            class: config.preview_root_class.clone(),
        })?;

    let template_class = detect_template_class(&preview, &config.preview_root_class);
    let namespace = ClassNamespace::new(&config.class_prefixes, template_class.as_deref());
    let captured = capture_styles(guard.stylesheets(), &namespace);
    // Snapshot taken; the live document is back to its pre-export state.
    drop(guard);

    let stripped = strip_chrome(
        &preview,
        &ChromeRules {
            chrome_classes: &config.chrome_classes,
            download_labels: &config.download_labels,
            decorated_classes: &captured.decorated_classes,
        },
    );
    let paginated = paginate(
        &stripped.root,
        config.max_page_padding_px,
        &captured.declarations_for_subject(PAGE_CONTENT_CLASS),
    );

    let profile = lookup_profile(input.template_id.as_deref());
    let normalized = normalize_fonts_and_scale(&paginated.root, profile, input.font_size);
    let body = flag_preserved_nodes(&normalized.root, &config.preserve_classes);
    debug!(
        "Removed {} chrome node(s) and {} scale declaration(s)",
        stripped.removed, normalized.stripped_declarations
    );

    let mut styles = StyleSnapshot::new();
    styles.push(StyleBlockKind::Reset, reset_css(profile))?;
    styles.push(StyleBlockKind::Captured, captured.css.as_str())?;
    styles.push(
        StyleBlockKind::Override,
        build_override_css(&OverrideOptions {
            page_size: &config.page_size,
            page_margin: &config.page_margin,
            preview_root_class: &config.preview_root_class,
            chrome_classes: &config.chrome_classes,
        }),
    )?;

    let document = assemble_document(&AssemblyParts {
        title: &input.contact.name,
        font_stylesheet_url: &config.font_stylesheet_url,
        styles: &styles,
        body: &body,
    })?;
    let document = minify_html(&document);
    verify_invariants(&document, &body, paginated.mode, paginated.page_count)?;

    let report = ExportReport {
        export_id: Uuid::new_v4(),
        template_id: profile.id.to_string(),
        layout_mode: paginated.mode,
        page_count: paginated.page_count,
        captured_rules: captured.rule_count,
        skipped_stylesheets: captured.skipped_sheets,
        removed_chrome: stripped.removed,
        editor_zoom: normalized.editor_zoom,
        document_bytes: document.len(),
        generated_at: Utc::now(),
    };
    info!(
        "Prepared export {}: {:?}, {} page(s), {} captured rules, {} stylesheets skipped, {} bytes",
        report.export_id,
        report.layout_mode,
        report.page_count,
        report.captured_rules,
        report.skipped_stylesheets,
        report.document_bytes
    );

    let engine_hint = input
        .engine_hint
        .as_deref()
        .map(str::trim)
        .filter(|hint| !hint.is_empty())
        .unwrap_or(config.engine_hint.as_str())
        .to_string();

    Ok(PreparedExport {
        request: RenderRequest {
            html_document: document,
            contact: input.contact.clone(),
            engine_hint,
        },
        report,
    })
}

/// Prepares the document and sends it to the render service.
pub async fn run_export(
    live: &mut LiveDocument,
    input: &ExportInput,
    config: &ExportConfig,
    backend: &dyn RenderBackend,
    session_token: Option<&str>,
) -> Result<(RenderOutcome, ExportReport), ExportError> {
    let prepared = prepare_export(live, input, config)?;
    let outcome = backend.render(&prepared.request, session_token).await?;

    match &outcome {
        RenderOutcome::Success { .. } => {
            info!("Export {} rendered", prepared.report.export_id)
        }
        RenderOutcome::QuotaExceeded { plan, .. } => {
            info!("Export {} refused: quota exceeded on plan {plan}", prepared.report.export_id)
        }
        RenderOutcome::Error { message } => {
            info!("Export {} failed: {message}", prepared.report.export_id)
        }
    }
    Ok((outcome, prepared.report))
}
