//! Test helper utilities for router and end-to-end tests

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tower::ServiceExt;
use tryon_service::app_state::AppState;
use tryon_service::config::AppConfig;
use tryon_service::models::tryon::JobStatusResponse;
use tryon_service::routes;
use tryon_service::services::catalog;

use crate::fixtures::TEST_PRODUCTS;

pub const BOUNDARY: &str = "tryon-test-boundary";

/// Simulated mode with a short processing window so tests finish fast.
pub fn test_config() -> AppConfig {
    AppConfig {
        simulated_delay_min_ms: 20,
        simulated_delay_max_ms: 40,
        ..Default::default()
    }
}

/// Build the full router with the fixture catalog loaded.
pub async fn build_test_app(config: AppConfig) -> (Router, AppState) {
    let state = AppState::new(config).expect("Failed to build app state");
    let items = TEST_PRODUCTS.iter().map(|p| p.to_item()).collect();
    catalog::seed(&state.store, items).await;
    (routes::router(state.clone()), state)
}

/// Router with an empty catalog.
pub fn build_empty_app(config: AppConfig) -> Router {
    let state = AppState::new(config).expect("Failed to build app state");
    routes::router(state)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("Request failed")
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_with_session(app: &Router, uri: &str, session: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(routes::SESSION_HEADER, session)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json<T: Serialize>(
    app: &Router,
    uri: &str,
    body: &T,
    session: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(session) = session {
        builder = builder.header(routes::SESSION_HEADER, session);
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Encode a single-file multipart/form-data body.
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn upload(app: &Router, filename: &str, content_type: &str, data: &[u8]) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/uploads")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body("photo", filename, content_type, data)))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}

/// Poll job status until it is terminal or `timeout` elapses.
pub async fn poll_until_terminal(app: &Router, job_id: &str, timeout: Duration) -> JobStatusResponse {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let response = get(app, &format!("/api/v1/jobs/{job_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let status: JobStatusResponse =
            serde_json::from_slice(&body_bytes(response).await).unwrap();

        if status.status.is_terminal() || tokio::time::Instant::now() >= deadline {
            return status;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

/// Fake compositor that accepts every dispatch and never calls back.
pub async fn spawn_silent_compositor() -> String {
    let app = Router::new().route(
        "/jobs",
        axum::routing::post(|| async { StatusCode::ACCEPTED }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/jobs")
}
