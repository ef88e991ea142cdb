use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::api::{self, AppState};
use super::auth::TokenService;
use super::db::{DbHandle, TrackerDb};
use crate::config::{AuthSection, TaskboardConfig};

/// Build the full application router: API routes, request tracing, and the
/// SPA bundle when one is configured.
pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let mut app = api::api_router(state.clone()).with_state(state);

    if let Some(dir) = static_dir {
        // Unknown paths fall back to index.html for client-side routing.
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(spa);
    }

    app.layer(TraceLayer::new_for_http())
}

/// Token service for the server. Dev mode tolerates missing secrets by
/// minting throwaway ones, so sessions do not survive a restart.
fn token_service(auth: &AuthSection, dev_mode: bool) -> Result<TokenService> {
    let mut auth = auth.clone();
    if dev_mode {
        for (name, secret) in [
            ("access", &mut auth.access_token_secret),
            ("refresh", &mut auth.refresh_token_secret),
        ] {
            if secret.is_none() {
                tracing::warn!(
                    "No {} token secret configured; using an ephemeral one (dev mode)",
                    name
                );
                *secret = Some(Uuid::new_v4().simple().to_string());
            }
        }
    }
    TokenService::new(&auth)
}

/// Open the database, creating its parent directory first.
pub fn open_database(path: &Path) -> Result<TrackerDb> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }
    TrackerDb::new(path).context("Failed to initialize tracker database")
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start_server(config: TaskboardConfig) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let server = &config.server;
    let db = open_database(&server.db_path)?;
    tracing::info!(path = %server.db_path.display(), "Opened database");

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        tokens: token_service(&config.auth, server.dev_mode)?,
    });

    let mut app = build_router(state, server.static_dir.as_deref());

    if server.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if server.dev_mode { "0.0.0.0" } else { server.host.as_str() };
    let addr = format!("{}:{}", host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, dev_mode = server.dev_mode, "Taskboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("Shutting down...");
}
