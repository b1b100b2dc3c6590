use std::sync::Arc;

use crate::config::Config;
use crate::export::ExportGate;
use crate::render_client::RenderBackend;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Render service backend. Production uses `RenderClient`; tests swap in a fake.
    pub renderer: Arc<dyn RenderBackend>,
    /// Sessions with an export in flight.
    pub exports: ExportGate,
}
