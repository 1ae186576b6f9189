//! # HTTP Server for Certificate Generation
//!
//! JSON API around the renderer and batch driver.
//!
//! ## Usage
//!
//! ```bash
//! laurel serve --listen 0.0.0.0:8080
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST | `/api/generate` | `{ templateUrl, name, ... }` | `{ certificateUrl }` |
//! | POST | `/api/generate/archive` | `{ templateUrl, names, ... }` | ZIP |
//! | POST | `/api/templates` | multipart `template` | `{ id, width, height }` |
//! | POST | `/api/templates/:id/preview` | `{ name?, layers? }` | PNG |
//! | POST | `/api/templates/:id/archive` | `{ names, layers? }` | ZIP |
//! | DELETE | `/api/templates/:id` | | 204 |
//! | GET | `/api/fonts` | | `{ families }` |
//!
//! Errors are `{ "error": message }`: 400 for rejected input, 404 for unknown
//! template ids, 500 for everything else.

mod handlers;
mod state;

pub use handlers::ApiError;
pub use state::{AppState, TemplateSession};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::LaurelError;
use crate::render::FontBook;

/// Sweep interval for expired template sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Largest JSON body: a base64 template (4/3 of the raw limit) plus room for layers.
fn json_body_limit(config: &Config) -> usize {
    config.max_template_bytes / 3 * 4 + 1024 * 1024
}

/// Build the API router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let json_limit = json_body_limit(&state.config);
    let upload_limit = state.config.max_template_bytes + 64 * 1024;

    Router::new()
        .route("/api/generate", post(handlers::generate::generate))
        .route("/api/generate/archive", post(handlers::generate::archive))
        .route(
            "/api/templates",
            post(handlers::templates::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/templates/:id/preview",
            post(handlers::templates::preview),
        )
        .route(
            "/api/templates/:id/archive",
            post(handlers::templates::archive),
        )
        .route("/api/templates/:id", delete(handlers::templates::delete))
        .route("/api/fonts", get(handlers::fonts::list))
        .layer(DefaultBodyLimit::max(json_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use laurel::config::Config;
/// use laurel::render::FontBook;
/// use laurel::server::serve;
///
/// # async fn example() -> Result<(), laurel::LaurelError> {
/// let config = Config::from_env()?;
/// let fonts = FontBook::new(&config.font_dirs, true);
/// serve(config, fonts).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: Config, fonts: FontBook) -> Result<(), LaurelError> {
    let listen_addr = config.listen_addr.clone();
    let face_count = fonts.face_count();
    let state = Arc::new(AppState::new(config, fonts)?);

    if face_count == 0 {
        tracing::warn!("no font faces found; text layers will fail to render");
    }

    tokio::spawn(cleanup_sessions(state.clone()));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| {
            LaurelError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", listen_addr, e),
            ))
        })?;

    tracing::info!(addr = %listen_addr, fonts = face_count, "laurel HTTP server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Background task that drops template sessions past their idle TTL.
async fn cleanup_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        interval.tick().await;
        let removed = state.sweep_expired(Instant::now()).await;
        if removed > 0 {
            let remaining = state.templates.read().await.len();
            tracing::info!(removed, remaining, "cleaned up expired template sessions");
        }
    }
}
