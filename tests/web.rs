//! Router tests driven through `tower::ServiceExt::oneshot`; no socket is
//! bound and the model backend is scripted.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{service, service_with, Reply, ScriptedBackend, PARIS_CARDS, PARIS_TEXT};
use http_body_util::BodyExt;
use std::sync::Arc;
use studydeck::web::{router, AppState};
use studydeck::{read_deck, ServerConfig};
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────

const BOUNDARY: &str = "studydeck-test-boundary";

fn app_with(backend: Arc<ScriptedBackend>, server: ServerConfig) -> Router {
    let state = AppState::new(service(backend), server).unwrap();
    router(Arc::new(state))
}

/// Router plus a handle on its state, for tests that inspect the store.
fn app_and_state(service: studydeck::StudyDeckService) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(service, ServerConfig::default()).unwrap());
    (router(state.clone()), state)
}

fn app(backend: Arc<ScriptedBackend>) -> Router {
    app_with(backend, ServerConfig::default())
}

fn paris_backend() -> Arc<ScriptedBackend> {
    ScriptedBackend::new(Reply::text(PARIS_TEXT), Reply::text(PARIS_CARDS))
}

/// Build a `multipart/form-data` body from text fields and `(field, file
/// name, bytes)` file parts.
fn multipart(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn post_generate(body: Vec<u8>) -> Request<Body> {
    post_multipart("/generate", body)
}

fn post_multipart(path: &str, body: Vec<u8>) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_text(response: axum::response::Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

fn download_path(html: &str) -> String {
    let start = html.find("/download/").expect("result page has a download link");
    html[start..start + "/download/".len() + 36].to_string()
}

fn rebuild_path(html: &str) -> String {
    download_path(html).replace("/download/", "/rebuild/")
}

async fn get(app: &Router, path: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

const PDF: &[u8] = b"%PDF-1.4\n% test\n";

// ── Health and form ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_open_even_with_auth() {
    let server = ServerConfig::default().with_credentials(Some("ann".into()), Some("secret".into()));
    let response = app_with(paris_backend(), server)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn index_renders_form() {
    let response = app(paris_backend())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("enctype=\"multipart/form-data\""));
    assert!(html.contains("name=\"files\""));
}

// ── Authentication ───────────────────────────────────────────────────────

#[tokio::test]
async fn form_requires_credentials_when_configured() {
    let server = ServerConfig::default().with_credentials(Some("ann".into()), Some("secret".into()));
    let app = app_with(paris_backend(), server);

    let missing = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert!(missing.headers().contains_key(header::WWW_AUTHENTICATE));

    let wrong = app
        .clone()
        .oneshot(
            Request::get("/")
                .header(header::AUTHORIZATION, format!("Basic {}", STANDARD.encode("ann:guess")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = app
        .oneshot(
            Request::get("/")
                .header(header::AUTHORIZATION, format!("Basic {}", STANDARD.encode("ann:secret")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
}

// ── Generate and download ────────────────────────────────────────────────

#[tokio::test]
async fn generate_then_download() {
    let app = app(paris_backend());
    let body = multipart(
        &[("goal", "European capitals"), ("num_cards", "2"), ("deck_name", "Capitals")],
        &[("files", "geo.pdf", PDF)],
    );

    let response = app.clone().oneshot(post_generate(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("What is the capital of France?"));

    let download = app
        .oneshot(Request::get(download_path(&html)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(download.status(), StatusCode::OK);
    let disposition = download.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"Capitals_"));
    assert!(disposition.contains(".apkg"));

    let bytes = body_bytes(download).await;
    assert_eq!(&bytes[..2], b"PK");
    let deck = read_deck(&bytes).unwrap();
    assert_eq!(deck.name, "Capitals");
    assert_eq!(deck.cards.len(), 2);
}

#[tokio::test]
async fn generate_json_download() {
    let app = app(paris_backend());
    let body = multipart(&[("goal", "capitals"), ("format", "json")], &[("files", "geo.pdf", PDF)]);

    let html = body_text(app.clone().oneshot(post_generate(body)).await.unwrap()).await;
    let download = app
        .oneshot(Request::get(download_path(&html)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(download.headers()[header::CONTENT_TYPE], "application/json");
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(download).await).unwrap();
    assert_eq!(json["cards"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_file_is_unprocessable() {
    let backend = paris_backend();
    let body = multipart(&[("goal", "capitals")], &[("files", "", &b""[..])]);
    let response = app(backend.clone()).oneshot(post_generate(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Please upload at least one image or PDF file."));
    // The goal the user typed is kept in the re-rendered form.
    assert!(html.contains(">capitals</textarea>"));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn unsupported_upload_is_unprocessable() {
    let body = multipart(&[("goal", "capitals")], &[("files", "notes.docx", &b"PK\x03\x04 not really"[..])]);
    let response = app(paris_backend()).oneshot(post_generate(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let backend = ScriptedBackend::new(Reply::text(PARIS_TEXT), Reply::Fail("quota exceeded".into()));
    let body = multipart(&[("goal", "capitals")], &[("files", "geo.pdf", PDF)]);
    let response = app(backend).oneshot(post_generate(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_text(response).await.contains("quota exceeded"));
}

#[tokio::test(start_paused = true)]
async fn generation_timeout_shows_error_and_stores_nothing() {
    let backend = ScriptedBackend::new(Reply::text(PARIS_TEXT), Reply::Hang);
    let (app, state) = app_and_state(service_with(backend, |b| b.api_timeout_secs(1)));
    let body = multipart(&[("goal", "capitals")], &[("files", "geo.pdf", PDF)]);
    let response = app.oneshot(post_generate(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let html = body_text(response).await;
    assert!(html.contains("Error generating cards"), "{html}");
    assert!(!html.contains("/download/"));
    assert_eq!(state.artifacts.len().await, 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let server = ServerConfig {
        max_upload_bytes: 1024,
        ..ServerConfig::default()
    };
    let big = vec![b'x'; 4096];
    let body = multipart(&[("goal", "capitals")], &[("files", "geo.pdf", &big[..])]);
    let backend = paris_backend();
    let response = app_with(backend.clone(), server).oneshot(post_generate(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn download_works_once() {
    let (app, state) = app_and_state(service(paris_backend()));
    let body = multipart(&[("goal", "capitals")], &[("files", "geo.pdf", PDF)]);
    let html = body_text(app.clone().oneshot(post_generate(body)).await.unwrap()).await;
    let path = download_path(&html);
    assert_eq!(state.artifacts.len().await, 1);

    assert_eq!(get(&app, &path).await.status(), StatusCode::OK);
    assert_eq!(get(&app, &path).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.artifacts.len().await, 0);
}

// ── Card selection ───────────────────────────────────────────────────────

#[tokio::test]
async fn result_page_offers_every_card() {
    let body = multipart(&[("goal", "capitals")], &[("files", "geo.pdf", PDF)]);
    let html = body_text(app(paris_backend()).oneshot(post_generate(body)).await.unwrap()).await;

    assert!(html.contains(&format!("action=\"{}\"", rebuild_path(&html))));
    assert!(html.contains("name=\"card\" value=\"0\" checked"));
    assert!(html.contains("name=\"card\" value=\"1\" checked"));
}

#[tokio::test]
async fn rebuild_keeps_only_ticked_cards() {
    let (app, state) = app_and_state(service(paris_backend()));
    let body = multipart(&[("goal", "capitals"), ("deck_name", "Capitals")], &[("files", "geo.pdf", PDF)]);
    let first = body_text(app.clone().oneshot(post_generate(body)).await.unwrap()).await;

    let response = app
        .clone()
        .oneshot(post_multipart(&rebuild_path(&first), multipart(&[("card", "1")], &[])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_text(response).await;
    assert!(second.contains("1 of 2 cards selected"), "{second}");
    assert!(second.contains("name=\"card\" value=\"0\">"));
    assert!(second.contains("name=\"card\" value=\"1\" checked"));

    // The first link is retired; only the rebuilt deck remains.
    assert_eq!(get(&app, &download_path(&first)).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.artifacts.len().await, 1);

    let download = get(&app, &download_path(&second)).await;
    assert_eq!(download.status(), StatusCode::OK);
    let deck = read_deck(&body_bytes(download).await).unwrap();
    assert_eq!(deck.name, "Capitals");
    assert_eq!(deck.cards.len(), 1);
    assert_eq!(deck.cards[0].back, "France");
}

#[tokio::test]
async fn rebuild_with_nothing_ticked_keeps_all_cards() {
    let app = app(paris_backend());
    let body = multipart(&[("goal", "capitals"), ("format", "json")], &[("files", "geo.pdf", PDF)]);
    let first = body_text(app.clone().oneshot(post_generate(body)).await.unwrap()).await;

    let response = app
        .clone()
        .oneshot(post_multipart(&rebuild_path(&first), multipart(&[], &[])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_text(response).await;
    assert!(second.contains("none were selected"), "{second}");

    let download = get(&app, &download_path(&second)).await;
    assert_eq!(download.headers()[header::CONTENT_TYPE], "application/json");
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(download).await).unwrap();
    assert_eq!(json["cards"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rebuild_of_downloaded_deck_is_not_found() {
    let app = app(paris_backend());
    let body = multipart(&[("goal", "capitals")], &[("files", "geo.pdf", PDF)]);
    let html = body_text(app.clone().oneshot(post_generate(body)).await.unwrap()).await;
    assert_eq!(get(&app, &download_path(&html)).await.status(), StatusCode::OK);

    let response = app
        .oneshot(post_multipart(&rebuild_path(&html), multipart(&[("card", "0")], &[])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_download_is_not_found() {
    let app = app(paris_backend());
    for path in ["/download/not-a-uuid", "/download/4f7e0a52-94e4-4b4c-9a3c-6a5f7c0b9b11"] {
        let response = app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
}
