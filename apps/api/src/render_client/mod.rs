/// Render Client: the only code that talks to the external PDF render service.
///
/// The assembled document goes out as a multipart file upload; the response is
/// classified into a `RenderOutcome`. A 403 is always a quota signal, never a
/// generic failure. No retries: a failed export is re-run by the user.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::export::models::{RenderOutcome, RenderRequest};

const UPLOAD_FIELD: &str = "html";
const UPLOAD_FILE_NAME: &str = "resume.html";
const UPLOAD_MIME: &str = "text/html";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}

/// Seam between the pipeline and the network, so handlers can be tested
/// without a render service.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn render(
        &self,
        request: &RenderRequest,
        session_token: Option<&str>,
    ) -> Result<RenderOutcome, RenderError>;
}

#[derive(Clone)]
pub struct RenderClient {
    client: Client,
    endpoint: String,
}

impl RenderClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, RenderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    fn build_form(request: &RenderRequest) -> Result<Form, RenderError> {
        let document = Part::bytes(request.html_document.clone().into_bytes())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(UPLOAD_MIME)
            .map_err(|e| RenderError::InvalidUpload(e.to_string()))?;

        Ok(Form::new()
            .part(UPLOAD_FIELD, document)
            .text("name", request.contact.name.clone())
            .text("email", request.contact.email.clone())
            .text("phone", request.contact.phone.clone())
            .text("engine", request.engine_hint.clone()))
    }
}

#[async_trait]
impl RenderBackend for RenderClient {
    async fn render(
        &self,
        request: &RenderRequest,
        session_token: Option<&str>,
    ) -> Result<RenderOutcome, RenderError> {
        let form = Self::build_form(request)?;
        let mut builder = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = session_token {
            builder = builder.bearer_auth(token);
        }

        debug!(
            "Uploading {} bytes to render service (engine: {})",
            request.html_document.len(),
            request.engine_hint
        );
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let outcome = classify_response(status, &body);
        if let RenderOutcome::Error { message } = &outcome {
            warn!("Render service returned status {status}: {message}");
        }
        Ok(outcome)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Response classification
// ────────────────────────────────────────────────────────────────────────────

pub fn classify_response(status: u16, body: &str) -> RenderOutcome {
    let json: Option<Value> = serde_json::from_str(body).ok();
    let field = |names: &[&str]| first_field(json.as_ref(), names);

    if status == 403 {
        return RenderOutcome::QuotaExceeded {
            plan: field(&["plan"])
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            limit: field(&["limit"])
                .and_then(Value::as_u64)
                .and_then(|limit| u32::try_from(limit).ok()),
            reset_date: field(&["resetDate", "reset_date"])
                .and_then(Value::as_str)
                .map(str::to_string),
        };
    }

    if (200..300).contains(&status) {
        return match field(&["downloadURL", "downloadUrl", "download_url"]).and_then(Value::as_str) {
            Some(url) if !url.trim().is_empty() => RenderOutcome::Success {
                download_url: url.to_string(),
            },
            _ => RenderOutcome::Error {
                message: "render service response did not include a download URL".to_string(),
            },
        };
    }

    let message = field(&["error", "message"])
        .and_then(|value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Object(obj) => obj.get("message").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_else(|| format!("status {status}"));
    RenderOutcome::Error { message }
}

fn first_field<'a>(json: Option<&'a Value>, names: &[&str]) -> Option<&'a Value> {
    let json = json?;
    names.iter().find_map(|name| json.get(*name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::models::ContactFields;
    use axum::extract::Multipart;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;

    #[test]
    fn test_quota_response_keeps_plan_details() {
        let outcome = classify_response(403, r#"{"plan":"free","limit":1,"resetDate":"2025-01-01"}"#);
        assert_eq!(
            outcome,
            RenderOutcome::QuotaExceeded {
                plan: "free".to_string(),
                limit: Some(1),
                reset_date: Some("2025-01-01".to_string()),
            }
        );
    }

    #[test]
    fn test_quota_response_without_json_body() {
        let outcome = classify_response(403, "Forbidden");
        assert_eq!(
            outcome,
            RenderOutcome::QuotaExceeded {
                plan: "unknown".to_string(),
                limit: None,
                reset_date: None,
            }
        );
    }

    #[test]
    fn test_quota_accepts_snake_case_reset_date() {
        let outcome = classify_response(403, r#"{"plan":"pro","reset_date":"2025-02-01"}"#);
        assert!(matches!(outcome, RenderOutcome::QuotaExceeded { reset_date: Some(d), .. } if d == "2025-02-01"));
    }

    #[test]
    fn test_success_requires_download_url() {
        assert_eq!(
            classify_response(200, r#"{"downloadURL":"https://cdn.example.com/r.pdf"}"#),
            RenderOutcome::Success {
                download_url: "https://cdn.example.com/r.pdf".to_string()
            }
        );
        assert!(matches!(classify_response(200, r#"{"downloadURL":""}"#), RenderOutcome::Error { .. }));
        assert!(matches!(classify_response(200, "ok"), RenderOutcome::Error { .. }));
    }

    #[test]
    fn test_error_message_sources() {
        assert_eq!(
            classify_response(500, r#"{"error":"renderer crashed"}"#),
            RenderOutcome::Error { message: "renderer crashed".to_string() }
        );
        assert_eq!(
            classify_response(400, r#"{"message":"bad html"}"#),
            RenderOutcome::Error { message: "bad html".to_string() }
        );
        assert_eq!(
            classify_response(502, "Bad Gateway"),
            RenderOutcome::Error { message: "Bad Gateway".to_string() }
        );
        assert_eq!(
            classify_response(504, ""),
            RenderOutcome::Error { message: "status 504".to_string() }
        );
    }

    fn sample_request() -> RenderRequest {
        RenderRequest {
            html_document: "<!DOCTYPE html><html><body>Jane</body></html>".to_string(),
            contact: ContactFields {
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: "555-0100".to_string(),
            },
            engine_hint: "chromium".to_string(),
        }
    }

    async fn spawn_render_service(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/generate-pdf")
    }

    #[tokio::test]
    async fn test_uploads_document_as_multipart_file() {
        let app = Router::new().route(
            "/generate-pdf",
            post(|headers: HeaderMap, mut multipart: Multipart| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let mut fields = Vec::new();
                while let Ok(Some(field)) = multipart.next_field().await {
                    let name = field.name().unwrap_or("").to_string();
                    let file_name = field.file_name().map(str::to_string);
                    let mime = field.content_type().map(str::to_string);
                    let text = field.text().await.unwrap_or_default();
                    fields.push((name, file_name, mime, text));
                }
                let has = |wanted: &str, value: &str| {
                    fields.iter().any(|(name, _, _, text)| name == wanted && text == value)
                };
                let document_ok = fields.iter().any(|(name, file_name, mime, text)| {
                    name == "html"
                        && file_name.as_deref() == Some("resume.html")
                        && mime.as_deref() == Some("text/html")
                        && text.contains("<body>Jane</body>")
                });
                let well_formed = auth == "Bearer session-123"
                    && document_ok
                    && has("name", "Jane Doe")
                    && has("email", "jane@example.com")
                    && has("phone", "555-0100")
                    && has("engine", "chromium");
                if well_formed {
                    (StatusCode::OK, r#"{"downloadURL":"https://cdn.example.com/jane.pdf"}"#)
                } else {
                    (StatusCode::BAD_REQUEST, r#"{"error":"malformed upload"}"#)
                }
            }),
        );
        let endpoint = spawn_render_service(app).await;
        let client = RenderClient::new(endpoint, Duration::from_secs(5)).unwrap();

        let outcome = client
            .render(&sample_request(), Some("session-123"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RenderOutcome::Success {
                download_url: "https://cdn.example.com/jane.pdf".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_quota_status_from_live_service() {
        let app = Router::new().route(
            "/generate-pdf",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    r#"{"plan":"free","limit":1,"resetDate":"2025-01-01"}"#,
                )
            }),
        );
        let endpoint = spawn_render_service(app).await;
        let client = RenderClient::new(endpoint, Duration::from_secs(5)).unwrap();

        let outcome = client.render(&sample_request(), None).await.unwrap();
        assert!(matches!(outcome, RenderOutcome::QuotaExceeded { plan, limit: Some(1), .. } if plan == "free"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = RenderClient::new(format!("http://{addr}/generate-pdf"), Duration::from_secs(2)).unwrap();

        let err = client.render(&sample_request(), None).await.unwrap_err();
        assert!(matches!(err, RenderError::Http(_)));
    }
}
