//! # HTTP API Tests
//!
//! Drive the router in-process with `tower::ServiceExt::oneshot`.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

use laurel::codec::{self, EncodeOptions, OutputFormat};
use laurel::config::Config;
use laurel::render::FontBook;
use laurel::server::{AppState, router};

fn state_with(fonts: FontBook) -> Arc<AppState> {
    Arc::new(AppState::new(Config::default(), fonts).unwrap())
}

fn state_with_limit(max_template_bytes: usize) -> Arc<AppState> {
    let config = Config {
        max_template_bytes,
        ..Config::default()
    };
    Arc::new(AppState::new(config, FontBook::empty()).unwrap())
}

fn state() -> Arc<AppState> {
    state_with(FontBook::empty())
}

fn system_state() -> Option<Arc<AppState>> {
    let fonts = FontBook::system();
    if fonts.is_empty() {
        eprintln!("no system fonts installed; skipping");
        return None;
    }
    Some(state_with(fonts))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([250, 250, 250, 255]));
    codec::encode(&img, &EncodeOptions::default()).unwrap()
}

fn template_url(width: u32, height: u32) -> String {
    codec::to_data_url(&png_bytes(width, height), OutputFormat::Png)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(state, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn decode_data_url(url: &str) -> image::DynamicImage {
    let (_, payload) = url.split_once(',').unwrap();
    let bytes = BASE64.decode(payload).unwrap();
    image::load_from_memory(&bytes).unwrap()
}

#[tokio::test]
async fn test_generate_requires_template_url() {
    let (status, body) = send_json(&state(), post_json("/api/generate", json!({ "name": "Ada" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Template URL is required" }));
}

#[tokio::test]
async fn test_generate_requires_name() {
    let request = post_json(
        "/api/generate",
        json!({ "templateUrl": template_url(10, 10), "name": "   " }),
    );
    let (status, body) = send_json(&state(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Name is required" }));
}

#[tokio::test]
async fn test_generate_rejects_malformed_json() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send_json(&state(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_generate_undecodable_template_is_server_error() {
    let request = post_json(
        "/api/generate",
        json!({ "templateUrl": "data:image/png;base64,AAAA", "name": "Ada" }),
    );
    let (status, body) = send_json(&state(), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Decode"));
}

#[tokio::test]
async fn test_generate_without_text_returns_template_sized_image() {
    // An empty layer list needs no fonts.
    let request = post_json(
        "/api/generate",
        json!({ "templateUrl": template_url(120, 80), "name": "Ada", "layers": [] }),
    );
    let (status, body) = send_json(&state(), request).await;
    assert_eq!(status, StatusCode::OK);

    let url = body["certificateUrl"].as_str().unwrap();
    assert!(url.starts_with("data:image/png;base64,"));
    let decoded = decode_data_url(url);
    assert_eq!((decoded.width(), decoded.height()), (120, 80));
}

#[tokio::test]
async fn test_generate_with_name() {
    let Some(state) = system_state() else { return };
    let request = post_json(
        "/api/generate",
        json!({
            "templateUrl": template_url(800, 600),
            "name": "Ada Lovelace",
            "fontSize": 48,
            "fontColor": "#1a2b3c",
            "format": "jpeg"
        }),
    );
    let (status, body) = send_json(&state, request).await;
    assert_eq!(status, StatusCode::OK);

    let url = body["certificateUrl"].as_str().unwrap();
    assert!(url.starts_with("data:image/jpeg;base64,"));
    let decoded = decode_data_url(url);
    assert_eq!((decoded.width(), decoded.height()), (800, 600));
}

#[tokio::test]
async fn test_generate_without_fonts_is_server_error() {
    let request = post_json(
        "/api/generate",
        json!({ "templateUrl": template_url(50, 50), "name": "Ada" }),
    );
    let (status, body) = send_json(&state(), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_archive_validation() {
    let state = state();

    let (status, body) = send_json(
        &state,
        post_json(
            "/api/generate/archive",
            json!({ "templateUrl": template_url(10, 10), "names": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Names are required" }));

    let names: Vec<String> = (0..11).map(|i| format!("Name {}", i)).collect();
    let (status, body) = send_json(
        &state,
        post_json(
            "/api/generate/archive",
            json!({ "templateUrl": template_url(10, 10), "names": names }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Maximum 10 names allowed" }));

    // No recipient layer to substitute names into.
    let (status, _) = send_json(
        &state,
        post_json(
            "/api/generate/archive",
            json!({ "templateUrl": template_url(10, 10), "names": ["Ada"], "layers": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_rejects_oversized_font() {
    let request = post_json(
        "/api/generate",
        json!({
            "templateUrl": template_url(40, 40),
            "name": "Ada",
            "layers": [{ "kind": "static", "text": "Big", "fontSize": 1e7 }]
        }),
    );
    let (status, body) = send_json(&state(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("font size"));
}

#[tokio::test]
async fn test_archive_rejects_invalid_layer_before_rendering() {
    let request = post_json(
        "/api/generate/archive",
        json!({
            "templateUrl": template_url(40, 40),
            "names": ["Ada"],
            "layers": [{ "kind": "recipient", "position": { "x": 1.5, "y": 0.5 } }]
        }),
    );
    let (status, body) = send_json(&state(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("position"));
}

#[tokio::test]
async fn test_archive_download() {
    let Some(state) = system_state() else { return };
    let request = post_json(
        "/api/generate/archive",
        json!({
            "templateUrl": template_url(300, 200),
            "names": ["Ada Lovelace", "Grace Hopper"]
        }),
    );
    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "application/zip"
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("certificates.zip")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut names: Vec<&str> = zip.file_names().collect();
    names.sort();
    assert_eq!(
        names,
        vec!["certificate_Ada_Lovelace.png", "certificate_Grace_Hopper.png"]
    );
}

fn multipart_upload(field: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "laurel-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"template.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/templates")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_template_session_lifecycle() {
    let state = state();

    let (status, body) = send_json(&state, multipart_upload("template", &png_bytes(90, 60))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["width"], 90);
    assert_eq!(body["height"], 60);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, png) = send(
        &state,
        post_json(
            &format!("/api/templates/{}/preview", id),
            json!({ "layers": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (90, 60));

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/templates/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&state, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(
        &state,
        post_json(&format!("/api/templates/{}/preview", id), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Template not found or expired" }));
}

#[tokio::test]
async fn test_upload_requires_template_field() {
    let (status, body) = send_json(&state(), multipart_upload("image", &png_bytes(4, 4))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No template field found" }));
}

#[tokio::test]
async fn test_invalid_template_id() {
    let (status, body) = send_json(
        &state(),
        post_json("/api/templates/not-a-uuid/archive", json!({ "names": ["Ada"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid template ID" }));
}

#[tokio::test]
async fn test_font_listing() {
    let (status, body) = send_json(
        &state(),
        Request::builder()
            .uri("/api/fonts")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "families": [] }));
}

/// Serve `/small.png` (a real template) and `/big.png` (4 KiB of zeros) on a
/// local port. Returns the base URL.
async fn serve_templates() -> String {
    let small = png_bytes(10, 10);
    let app = axum::Router::new()
        .route("/small.png", axum::routing::get(move || async move { small }))
        .route("/big.png", axum::routing::get(|| async { vec![0u8; 4096] }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

/// Answer one request with `body` and no Content-Length, closing to end it.
async fn serve_unsized_once(body: Vec<u8>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 2048];
        let _ = socket.read(&mut request).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n")
            .await;
        let _ = socket.write_all(&body).await;
        let _ = socket.shutdown().await;
    });
    format!("http://{}/template.png", addr)
}

#[tokio::test]
async fn test_http_template_within_limit() {
    let base = serve_templates().await;
    let request = post_json(
        "/api/generate",
        json!({ "templateUrl": format!("{}/small.png", base), "name": "Ada", "layers": [] }),
    );
    let (status, body) = send_json(&state_with_limit(1024), request).await;
    assert_eq!(status, StatusCode::OK);
    let decoded = decode_data_url(body["certificateUrl"].as_str().unwrap());
    assert_eq!((decoded.width(), decoded.height()), (10, 10));
}

#[tokio::test]
async fn test_http_template_over_declared_limit() {
    let base = serve_templates().await;
    let request = post_json(
        "/api/generate",
        json!({ "templateUrl": format!("{}/big.png", base), "name": "Ada" }),
    );
    let (status, body) = send_json(&state_with_limit(1024), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "File size too large. Maximum size is 1024 bytes." })
    );
}

#[tokio::test]
async fn test_http_template_over_limit_without_length() {
    let url = serve_unsized_once(vec![0u8; 64 * 1024]).await;
    let request = post_json(
        "/api/generate",
        json!({ "templateUrl": url, "name": "Ada" }),
    );
    let (status, body) = send_json(&state_with_limit(1024), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "File size too large. Maximum size is 1024 bytes." })
    );
}
