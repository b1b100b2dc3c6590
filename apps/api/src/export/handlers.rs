use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::live::{ExternalStyleSheet, LiveDocument};
use crate::export::models::{ContactFields, ExportReport, FontSizeSetting, RenderOutcome};
use crate::export::pipeline::{run_export, ExportInput};
use crate::state::AppState;

/// Prefix of the per-request gate key used when there is no bearer token.
/// Nothing ties two anonymous requests to one session, so they never conflict.
const ANONYMOUS_SESSION_PREFIX: &str = "anonymous";

#[derive(Debug, Deserialize)]
pub struct ExportApiRequest {
    /// Full markup of the page the editor is showing.
    pub page_html: String,
    /// Text of linked stylesheets the UI layer could read, keyed by href.
    #[serde(default)]
    pub stylesheets: Vec<ExternalStyleSheet>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub font_size: FontSizeSetting,
    #[serde(default)]
    pub contact: ContactFields,
    #[serde(default)]
    pub engine: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportApiResponse {
    pub download_url: String,
    /// Same URL, shown as a link when the browser blocks opening a new tab.
    pub fallback_link: String,
    pub report: ExportReport,
}

/// POST /api/v1/export
pub async fn handle_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ExportApiRequest>,
) -> Result<Json<ExportApiResponse>, AppError> {
    if req.page_html.trim().is_empty() {
        return Err(AppError::Validation("page_html must not be empty".to_string()));
    }

    let token = bearer_token(&headers);
    let _permit = state.exports.acquire(&session_key(token))?;
    debug!("{} export(s) in flight", state.exports.in_flight());

    let mut live = LiveDocument::parse(&req.page_html, &req.stylesheets);
    let input = ExportInput {
        template_id: req.template_id,
        font_size: req.font_size,
        contact: req.contact,
        engine_hint: req.engine,
    };

    let (outcome, report) = run_export(
        &mut live,
        &input,
        &state.config.export,
        state.renderer.as_ref(),
        token,
    )
    .await?;

    match outcome {
        RenderOutcome::Success { download_url } => {
            info!("Export {} ready at {download_url}", report.export_id);
            Ok(Json(ExportApiResponse {
                fallback_link: download_url.clone(),
                download_url,
                report,
            }))
        }
        RenderOutcome::QuotaExceeded {
            plan,
            limit,
            reset_date,
        } => Err(AppError::QuotaExceeded {
            plan,
            limit,
            reset_date,
        }),
        RenderOutcome::Error { message } => Err(AppError::RenderFailed(message)),
    }
}

fn session_key(token: Option<&str>) -> String {
    match token {
        Some(token) => token.to_string(),
        None => format!("{ANONYMOUS_SESSION_PREFIX}-{}", Uuid::new_v4()),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Config, ExportConfig};
    use crate::export::gate::ExportGate;
    use crate::export::pipeline::tests::{FakeBackend, SINGLE_PAGE};
    use crate::routes::build_router;

    fn state_with(backend: Arc<FakeBackend>) -> AppState {
        AppState {
            config: Config {
                render_service_url: "http://render.invalid/generate-pdf".to_string(),
                render_timeout_secs: 5,
                port: 0,
                rust_log: "info".to_string(),
                export: ExportConfig::default(),
            },
            renderer: backend,
            exports: ExportGate::new(),
        }
    }

    fn export_request(token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/export")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn payload(page_html: &str) -> Value {
        json!({
            "page_html": page_html,
            "template_id": "modern",
            "font_size": "medium",
            "contact": { "name": "Jane Doe", "email": "jane@example.com", "phone": "555-0100" }
        })
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_session_key_is_per_request_without_token() {
        assert_eq!(session_key(Some("tok-1")), "tok-1");
        let first = session_key(None);
        let second = session_key(None);
        assert!(first.starts_with("anonymous-"));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_anonymous_exports_do_not_conflict() {
        let backend = Arc::new(FakeBackend::returning(RenderOutcome::Success {
            download_url: "unused".to_string(),
        }));
        let state = state_with(backend);
        let _running = state.exports.acquire("anonymous").unwrap();

        let (status, _) = send(state.clone(), export_request(None, payload(SINGLE_PAGE))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.exports.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_export_returns_download_and_fallback_link() {
        let backend = Arc::new(FakeBackend::returning(RenderOutcome::Success {
            download_url: "https://cdn.example.com/jane.pdf".to_string(),
        }));
        let state = state_with(backend.clone());

        let (status, body) = send(state.clone(), export_request(Some("tok-1"), payload(SINGLE_PAGE))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["downloadUrl"], "https://cdn.example.com/jane.pdf");
        assert_eq!(body["fallbackLink"], "https://cdn.example.com/jane.pdf");
        assert_eq!(body["report"]["layout_mode"], "single_page");
        assert_eq!(body["report"]["template_id"], "modern-clean");
        assert_eq!(body["report"]["page_count"], 1);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].1.as_deref(), Some("tok-1"));
        assert_eq!(state.exports.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_quota_exceeded_maps_to_forbidden() {
        let backend = Arc::new(FakeBackend::returning(RenderOutcome::QuotaExceeded {
            plan: "free".to_string(),
            limit: Some(1),
            reset_date: Some("2025-01-01".to_string()),
        }));
        let (status, body) = send(state_with(backend), export_request(None, payload(SINGLE_PAGE))).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "QUOTA_EXCEEDED");
        assert_eq!(body["error"]["plan"], "free");
        assert_eq!(body["error"]["resetDate"], "2025-01-01");
    }

    #[tokio::test]
    async fn test_render_error_maps_to_bad_gateway() {
        let backend = Arc::new(FakeBackend::returning(RenderOutcome::Error {
            message: "renderer crashed".to_string(),
        }));
        let (status, body) = send(state_with(backend), export_request(None, payload(SINGLE_PAGE))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["retry"], true);
    }

    #[tokio::test]
    async fn test_missing_preview_is_unprocessable_without_network_call() {
        let backend = Arc::new(FakeBackend::returning(RenderOutcome::Success {
            download_url: "unused".to_string(),
        }));
        let state = state_with(backend.clone());
        let (status, body) = send(
            state,
            export_request(None, payload("<html><body><p>Loading</p></body></html>")),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "PREVIEW_MISSING");
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_export_for_same_session_conflicts() {
        let backend = Arc::new(FakeBackend::returning(RenderOutcome::Success {
            download_url: "unused".to_string(),
        }));
        let state = state_with(backend);
        let _running = state.exports.acquire("tok-1").unwrap();

        let (status, body) = send(state.clone(), export_request(Some("tok-1"), payload(SINGLE_PAGE))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "EXPORT_IN_PROGRESS");

        let (status, _) = send(state, export_request(Some("tok-2"), payload(SINGLE_PAGE))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_page_rejected() {
        let backend = Arc::new(FakeBackend::returning(RenderOutcome::Success {
            download_url: "unused".to_string(),
        }));
        let (status, body) = send(state_with(backend), export_request(None, payload("  "))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
