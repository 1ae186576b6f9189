//! Font listing API.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use super::super::state::AppState;

#[derive(Debug, Serialize)]
pub struct FontsResponse {
    pub families: Vec<String>,
}

/// GET /api/fonts - Families available for layers.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<FontsResponse> {
    Json(FontsResponse {
        families: state.fonts.families(),
    })
}
