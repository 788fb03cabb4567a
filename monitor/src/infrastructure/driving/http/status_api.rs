use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::application::live::{LiveSnapshot, SessionController};
use crate::domain::aggregates::AggregateStats;
use crate::domain::value_objects::{Detection, SessionId};

/// JSON view of a [`LiveSnapshot`]
#[derive(Debug, Serialize)]
pub struct SnapshotView {
    pub state: &'static str,
    pub session_id: Option<SessionId>,
    pub started_at: Option<DateTime<Utc>>,
    /// `data:image/jpeg;base64,...`
    pub frame: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub detections: Vec<DetectionView>,
    pub stats: AggregateStats,
    pub consecutive_poll_failures: u32,
}

#[derive(Debug, Serialize)]
pub struct DetectionView {
    pub class: String,
    pub confidence: f64,
    pub confidence_percent: String,
    pub is_fall: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,
}

impl From<&Detection> for DetectionView {
    fn from(detection: &Detection) -> Self {
        Self {
            class: detection.class.to_string(),
            confidence: detection.confidence.value(),
            confidence_percent: detection.confidence.as_percent(),
            is_fall: detection.is_fall(),
            bbox: detection.bbox.map(|b| [b.x1, b.y1, b.x2, b.y2]),
        }
    }
}

impl From<LiveSnapshot> for SnapshotView {
    fn from(snapshot: LiveSnapshot) -> Self {
        Self {
            state: snapshot.state.as_str(),
            session_id: snapshot.session_id,
            started_at: snapshot.started_at,
            frame: snapshot.current_frame.as_ref().map(|f| f.to_data_uri()),
            captured_at: snapshot.current_frame.as_ref().map(|f| f.captured_at),
            detections: snapshot.current_detections.iter().map(DetectionView::from).collect(),
            stats: snapshot.stats,
            consecutive_poll_failures: snapshot.consecutive_poll_failures,
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn bad_gateway(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() })))
}

pub fn create_live_routes(controller: Arc<SessionController>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/stream-url", get(stream_url))
        .with_state(controller)
}

async fn status(State(controller): State<Arc<SessionController>>) -> Json<SnapshotView> {
    Json(controller.snapshot().into())
}

async fn start(
    State(controller): State<Arc<SessionController>>,
) -> Result<Json<SnapshotView>, ApiError> {
    tracing::info!("[API] Start requested");
    controller.start().await.map_err(bad_gateway)?;
    Ok(Json(controller.snapshot().into()))
}

async fn stop(State(controller): State<Arc<SessionController>>) -> Json<Value> {
    tracing::info!("[API] Stop requested");
    // Stop always lands in Idle; a remote failure is reported alongside the snapshot
    let remote_error = controller.stop().await.err().map(|e| e.to_string());
    let snapshot = SnapshotView::from(controller.snapshot());
    Json(json!({ "snapshot": snapshot, "remote_error": remote_error }))
}

async fn stream_url(
    State(controller): State<Arc<SessionController>>,
) -> Result<Json<Value>, ApiError> {
    let url = controller.stream_url().await.map_err(bad_gateway)?;
    Ok(Json(json!({ "url": url })))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_status_router(controller: Arc<SessionController>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/live", create_live_routes(controller))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
