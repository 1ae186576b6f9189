//! Uploaded-template API: upload once, then preview and archive by id.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{EncodeOptions, OutputFormat};
use crate::layer::{Layer, LayerKind};
use crate::render::{RenderOptions, Renderer};
use crate::session::PREVIEW_NAME;
use crate::template::Template;

use super::super::state::{AppState, TemplateSession};
use super::generate::{ArchiveJob, render_archive};
use super::{ApiError, ApiResult};

/// Response from the upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

/// Request body for the preview endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewRequest {
    pub name: Option<String>,
    pub layers: Option<Vec<Layer>>,
    pub brightness: i32,
    pub contrast: i32,
}

/// Request body for the archive endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionArchiveRequest {
    pub names: Vec<String>,
    pub layers: Option<Vec<Layer>>,
    pub brightness: i32,
    pub contrast: i32,
    pub format: Option<OutputFormat>,
}

/// POST /api/templates - Upload a template image (multipart field `template`).
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("template") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read template: {}", e)))?;
            data = Some(bytes.to_vec());
            break;
        }
    }

    let bytes = data.ok_or_else(|| ApiError::bad_request("No template field found"))?;
    let max_bytes = state.config.max_template_bytes;
    let template =
        tokio::task::spawn_blocking(move || Template::from_bytes_limited(&bytes, max_bytes))
            .await??;
    let (width, height) = template.dimensions();

    let id = Uuid::new_v4();
    state
        .templates
        .write()
        .await
        .insert(id, TemplateSession::new(template));
    tracing::info!(%id, width, height, "template uploaded");

    Ok(Json(UploadResponse {
        id: id.to_string(),
        width,
        height,
    }))
}

/// POST /api/templates/:id/preview - Render one preview PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    let template = session_template(&state, &id).await?;

    let name = req
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| PREVIEW_NAME.to_string());
    let layers = req
        .layers
        .unwrap_or_else(|| vec![Layer::editor_default(LayerKind::Recipient)]);
    let options = RenderOptions {
        brightness: req.brightness,
        contrast: req.contrast,
    };

    let fonts = state.fonts.clone();
    let png = tokio::task::spawn_blocking(move || {
        Renderer::with_options(&fonts, options).render_encoded(
            &template,
            &layers,
            &name,
            &EncodeOptions::preview(),
        )
    })
    .await??;

    Ok(([(header::CONTENT_TYPE, OutputFormat::Png.mime_type())], png).into_response())
}

/// POST /api/templates/:id/archive - Render every name against an uploaded template.
pub async fn archive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SessionArchiveRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    let template = session_template(&state, &id).await?;

    let job = ArchiveJob {
        names: req.names,
        layers: req.layers,
        options: RenderOptions {
            brightness: req.brightness,
            contrast: req.contrast,
        },
        format: req.format.unwrap_or_default(),
    };
    render_archive(&state, template, job).await
}

/// DELETE /api/templates/:id - Drop an uploaded template.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    match state.templates.write().await.remove(&id) {
        Some(_) => {
            tracing::info!(%id, "template deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::not_found("Template not found or expired")),
    }
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::bad_request("Invalid template ID"))
}

async fn session_template(state: &AppState, id: &str) -> ApiResult<Template> {
    let id = parse_id(id)?;
    state
        .template(id)
        .await
        .ok_or_else(|| ApiError::not_found("Template not found or expired"))
}
