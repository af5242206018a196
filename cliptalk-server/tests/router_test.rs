//! HTTP surface tests driven through the router

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use cliptalk_core::AudioBuffer;
use cliptalk_server::config::{ClipTalkConfig, TextFilterConfig};
use cliptalk_server::http::{HealthResponse, SubmitResponse};
use cliptalk_server::{create_router, AppState, Pipeline};
use cliptalk_spk::engines::custom::CustomTtsEngine;
use cliptalk_spk::BackendTable;
use std::sync::Arc;
use tower::ServiceExt;

fn pipeline() -> Pipeline {
    let mut config = ClipTalkConfig::default();
    config.text = TextFilterConfig {
        debounce_ms: 0,
        ..TextFilterConfig::default()
    };
    let backend = CustomTtsEngine::new("silent", "audio/wav", |_, _, _| Ok(()));
    Pipeline::build(&config, BackendTable::new(Arc::new(backend)))
}

fn app(state: &AppState) -> Router {
    create_router(state.clone())
}

async fn body_bytes(response: axum::response::Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

#[tokio::test]
async fn test_health_reports_queues() {
    let pipeline = pipeline();
    let response = app(&pipeline.state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert!(!health.listener_connected);
    assert!(health.monitoring);
    assert_eq!(health.queues.len(), 2);
    assert_eq!(health.queues[0].queue, "input-queue");
    assert_eq!(health.queues[0].capacity, 50);
    assert_eq!(health.queues[1].queue, "output-queue");
    assert_eq!(health.queues[1].capacity, 5);
}

#[tokio::test]
async fn test_audio_without_selection_is_not_found() {
    let pipeline = pipeline();
    let response = app(&pipeline.state)
        .oneshot(Request::get("/audio").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_audio_streams_current_buffer() {
    let pipeline = pipeline();
    let session = pipeline.state.session.clone();
    let buffer = AudioBuffer::new("audio/mpeg");
    let mut advance = session.subscribe_advance();
    session.select_buffer(buffer.clone(), &mut advance);

    let writer = tokio::spawn({
        let buffer = buffer.clone();
        async move {
            for chunk in [&b"ID3"[..], &b"frame"[..]] {
                assert!(!buffer.write(Bytes::copy_from_slice(chunk)).await.is_closed());
            }
            buffer.shutdown(false);
        }
    });

    let response = app(&pipeline.state)
        .oneshot(Request::get("/audio").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(&body_bytes(response).await[..], b"ID3frame");
    writer.await.unwrap();
}

#[tokio::test]
async fn test_next_cancels_current_buffer() {
    let pipeline = pipeline();
    let session = pipeline.state.session.clone();
    let buffer = AudioBuffer::new("audio/wav");
    let mut advance = session.subscribe_advance();
    session.select_buffer(buffer.clone(), &mut advance);

    let response = app(&pipeline.state)
        .oneshot(Request::get("/next").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(buffer.is_cancelled());
    assert!(advance.has_changed().unwrap());
}

#[tokio::test]
async fn test_monitoring_toggle() {
    let pipeline = pipeline();

    let response = app(&pipeline.state)
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/monitoring")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("false"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&pipeline.state)
        .oneshot(Request::get("/monitoring").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(&body_bytes(response).await[..], b"false");
}

#[tokio::test]
async fn test_post_text_queues_cleaned_text() {
    let pipeline = pipeline();
    let response = app(&pipeline.state)
        .oneshot(
            Request::post("/text")
                .body(Body::from("  **Hello** there https://example.com "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let submitted: SubmitResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(submitted.accepted);
    assert_eq!(submitted.text.as_deref(), Some("Hello there"));
    assert_eq!(pipeline.state.input.unfinished(), 1);
}

#[tokio::test]
async fn test_post_text_rejected_while_paused() {
    let pipeline = pipeline();
    pipeline.state.session.set_monitoring(false);

    let response = app(&pipeline.state)
        .oneshot(Request::post("/text").body(Body::from("some words")).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let submitted: SubmitResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(!submitted.accepted);
    assert_eq!(submitted.reason.as_deref(), Some("monitoring paused"));
    assert!(pipeline.state.input.is_empty());
}

#[tokio::test]
async fn test_post_text_skips_code() {
    let pipeline = pipeline();
    let response = app(&pipeline.state)
        .oneshot(
            Request::post("/text")
                .body(Body::from("let_x=compute_something_long();"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let submitted: SubmitResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(!submitted.accepted);
    assert_eq!(pipeline.state.input.unfinished(), 0);
}
