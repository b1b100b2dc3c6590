mod config;
mod dom;
mod errors;
mod export;
mod render_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::export::ExportGate;
use crate::render_client::RenderClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume export service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize render service client
    let renderer = RenderClient::new(
        config.render_service_url.clone(),
        Duration::from_secs(config.render_timeout_secs),
    )?;
    info!(
        "Render client initialized ({}, engine: {})",
        config.render_service_url, config.export.engine_hint
    );
    info!(
        "Export pages: {} with {} margins, padding capped at {}px",
        config.export.page_size, config.export.page_margin, config.export.max_page_padding_px
    );

    let state = AppState {
        config: config.clone(),
        renderer: Arc::new(renderer),
        exports: ExportGate::new(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
