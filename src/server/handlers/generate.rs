//! Stateless generation API: the template travels with every request.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::batch::BatchRenderer;
use crate::codec::{EncodeOptions, OutputFormat};
use crate::error::LaurelError;
use crate::export;
use crate::layer::{
    self, Alignment, Color, FontWeight, Layer, LayerKind, RECIPIENT_FONT_SIZE,
};
use crate::recipients::RecipientList;
use crate::render::{RenderOptions, Renderer};
use crate::template::{self, Template};

use super::super::state::AppState;
use super::{ApiError, ApiResult, zip_response};

/// Request body for `POST /api/generate`.
///
/// Without `layers`, a single recipient layer is used and the flat style
/// fields (`x`, `y`, `fontSize`...) adjust it. Without `fontSize` either, the
/// name is sized to fit the template width.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateRequest {
    pub template_url: Option<String>,
    pub name: Option<String>,
    pub is_preview: bool,
    pub layers: Option<Vec<Layer>>,
    pub brightness: i32,
    pub contrast: i32,
    pub format: Option<OutputFormat>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub font_size: Option<f32>,
    pub font_color: Option<Color>,
    pub font_weight: Option<FontWeight>,
    pub font_family: Option<String>,
    pub text_align: Option<Alignment>,
}

impl GenerateRequest {
    /// Editor-default recipient layer with the request's style overrides applied.
    pub fn recipient_layer(&self) -> Layer {
        let mut layer = Layer::editor_default(LayerKind::Recipient);
        let x = self.x.unwrap_or(layer.position.x);
        let y = self.y.unwrap_or(layer.position.y);
        layer.set_position(x, y);
        if let Some(size) = self.font_size {
            layer.font_size = size;
        }
        if let Some(color) = self.font_color {
            layer.color = color;
        }
        if let Some(weight) = self.font_weight {
            layer.weight = weight;
        }
        if let Some(family) = &self.font_family {
            layer.family = family.clone();
        }
        if let Some(align) = self.text_align {
            layer.align = align;
        }
        layer
    }

    /// Layers to render `name` onto a canvas `canvas_width` pixels wide.
    fn layers_for(&self, name: &str, canvas_width: u32) -> Vec<Layer> {
        if let Some(layers) = &self.layers {
            return layers.clone();
        }
        let mut layer = self.recipient_layer();
        if self.font_size.is_none() {
            layer.font_size = layer::name_font_size(name, canvas_width, RECIPIENT_FONT_SIZE);
        }
        vec![layer]
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// `data:` URL of the encoded certificate.
    pub certificate_url: String,
}

/// Request body for `POST /api/generate/archive`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchiveRequest {
    pub template_url: Option<String>,
    pub names: Vec<String>,
    pub layers: Option<Vec<Layer>>,
    pub brightness: i32,
    pub contrast: i32,
    pub format: Option<OutputFormat>,
}

/// POST /api/generate - Render one certificate and return it as a data URL.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let Json(req) = payload?;

    let template_url = required(req.template_url.as_deref(), "Template URL is required")?;
    let name = required(req.name.as_deref(), "Name is required")?.to_string();

    let template = load_template(&state, template_url).await?;
    let layers = req.layers_for(&name, template.width());
    let options = RenderOptions {
        brightness: req.brightness,
        contrast: req.contrast,
    };
    let is_preview = req.is_preview;
    let encode = if is_preview {
        EncodeOptions::preview()
    } else {
        EncodeOptions::new(req.format.unwrap_or_default())
    };

    let fonts = state.fonts.clone();
    let certificate_url = tokio::task::spawn_blocking(move || {
        let bytes = Renderer::with_options(&fonts, options)
            .render_encoded(&template, &layers, &name, &encode)?;
        tracing::debug!(recipient = %name, bytes = bytes.len(), preview = is_preview, "rendered certificate");
        Ok::<_, LaurelError>(crate::codec::to_data_url(&bytes, encode.format))
    })
    .await??;

    Ok(Json(GenerateResponse { certificate_url }))
}

/// POST /api/generate/archive - Render every name and return a ZIP.
pub async fn archive(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ArchiveRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;

    let template_url = required(req.template_url.as_deref(), "Template URL is required")?;
    let template = load_template(&state, template_url).await?;

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

/// Batch parameters shared by both archive endpoints.
pub(crate) struct ArchiveJob {
    pub names: Vec<String>,
    pub layers: Option<Vec<Layer>>,
    pub options: RenderOptions,
    pub format: OutputFormat,
}

/// Validate the names, run the batch on the blocking pool, package as ZIP.
pub(crate) async fn render_archive(
    state: &AppState,
    template: Template,
    job: ArchiveJob,
) -> ApiResult<Response> {
    if job.names.is_empty() {
        return Err(ApiError::bad_request("Names are required"));
    }
    let recipients = RecipientList::from_names(&job.names, state.config.max_recipients)?;
    let layers = job
        .layers
        .unwrap_or_else(|| vec![Layer::editor_default(LayerKind::Recipient)]);

    // Batch failures are reported per recipient; bad input is caught here as a 400.
    job.options.validate()?;
    for layer in &layers {
        layer.validate()?;
    }
    layer::ensure_single_recipient_layer(&layers)?;

    let fonts = state.fonts.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        let certificates = BatchRenderer::new(
            Renderer::with_options(&fonts, job.options),
            &template,
            &layers,
        )
        .encode_options(EncodeOptions::new(job.format))
        .run(&recipients)?;
        export::archive(&certificates)
    })
    .await??;

    Ok(zip_response(bytes))
}

/// Fetch and decode a template from a `data:` or `http(s)` URL.
pub(crate) async fn load_template(state: &AppState, url: &str) -> ApiResult<Template> {
    let max_bytes = state.config.max_template_bytes;

    if url.starts_with("data:") {
        let url = url.to_string();
        let template =
            tokio::task::spawn_blocking(move || Template::from_data_url(&url, max_bytes)).await??;
        return Ok(template);
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        let bytes = fetch(state, url, max_bytes).await?;
        let template =
            tokio::task::spawn_blocking(move || Template::from_bytes_limited(&bytes, max_bytes))
                .await??;
        return Ok(template);
    }

    Err(ApiError::bad_request(
        "Template URL must be a data: or http(s) URL",
    ))
}

/// Download `url`, giving up as soon as the body is known to exceed `max_bytes`.
async fn fetch(state: &AppState, url: &str, max_bytes: usize) -> Result<Vec<u8>, LaurelError> {
    let mut response = state
        .http_client
        .get(url)
        .send()
        .await
        .map_err(|e| LaurelError::Fetch(format!("Failed to download {}: {}", url, e)))?;
    if !response.status().is_success() {
        return Err(LaurelError::Fetch(format!(
            "Failed to download {}: HTTP {}",
            url,
            response.status()
        )));
    }
    if response
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err(template::too_large(max_bytes));
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| LaurelError::Fetch(format!("Failed to read template data: {}", e)))?
    {
        if bytes.len() + chunk.len() > max_bytes {
            tracing::warn!(url, max_bytes, "template download over size limit");
            return Err(template::too_large(max_bytes));
        }
        bytes.extend_from_slice(&chunk);
    }
    tracing::debug!(url, bytes = bytes.len(), "downloaded template");
    Ok(bytes)
}

/// Trimmed, non-empty field or a 400 with `message`.
fn required<'a>(value: Option<&'a str>, message: &str) -> ApiResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(message)),
    }
}
