// HTTP API for the listener page and text producers

use crate::audio_stream::audio_handler;
use crate::intake::{SkipReason, TextIntake};
use crate::session::Session;
use crate::websocket::websocket_handler;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use cliptalk_core::{InstrumentedQueue, PendingDelivery, QueueDepthReport, TextItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub input: InstrumentedQueue<TextItem>,
    pub output: InstrumentedQueue<PendingDelivery>,
    pub intake: Arc<TextIntake>,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub queues: Vec<QueueDepthReport>,
    pub listener_connected: bool,
    pub monitoring: bool,
}

/// Outcome of `POST /text`
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/audio", get(audio_handler))
        .route("/next", get(next_handler))
        .route("/monitoring", get(get_monitoring).put(put_monitoring))
        .route("/text", post(submit_text))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Skip the current utterance
async fn next_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.session.advance();
    StatusCode::OK
}

async fn get_monitoring(State(state): State<AppState>) -> Json<bool> {
    Json(state.session.monitoring())
}

/// Pause (`false`) or resume (`true`) text intake
async fn put_monitoring(State(state): State<AppState>, Json(enabled): Json<bool>) -> impl IntoResponse {
    state.session.set_monitoring(enabled);
    StatusCode::OK
}

/// Queue a text. The request waits while the input queue is full.
async fn submit_text(State(state): State<AppState>, body: String) -> impl IntoResponse {
    match state.intake.submit(&body).await {
        Ok(text) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                accepted: true,
                text: Some(text.as_str().to_string()),
                reason: None,
            }),
        ),
        Err(reason) => {
            debug!("POST /text skipped: {}", reason);
            let status = match reason {
                SkipReason::Paused => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::OK,
            };
            (
                status,
                Json(SubmitResponse {
                    accepted: false,
                    text: None,
                    reason: Some(reason.to_string()),
                }),
            )
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        queues: vec![state.input.depth_report(), state.output.depth_report()],
        listener_connected: state.session.listener_connected(),
        monitoring: state.session.monitoring(),
    })
}
