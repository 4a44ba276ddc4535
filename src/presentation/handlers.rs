// HTTP request handlers
use crate::application::ingest_service::SourceStatus;
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub source: &'static str,
    pub error: Option<String>,
    pub lines_received: u64,
    pub lines_undecodable: u64,
    pub lines_rejected: u64,
    pub samples_stored: u64,
    pub samples_refused: u64,
    pub sink_failures: u64,
    pub series: usize,
    pub points: usize,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest rendered frame, 204 until the first tick
pub async fn latest_frame(State(state): State<Arc<AppState>>) -> Response {
    let frame = state.frames.borrow().clone();
    match frame {
        Some(frame) => Json(frame.as_ref().clone()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Ingestion counters, source state and store size
pub async fn ingest_status(State(state): State<Arc<AppState>>) -> Json<StatusView> {
    let counters = state.stats.counters();
    let (source, error) = match state.stats.status() {
        SourceStatus::Running => ("running", None),
        SourceStatus::Ended => ("ended", None),
        SourceStatus::Failed(message) => ("failed", Some(message)),
    };

    Json(StatusView {
        source,
        error,
        lines_received: counters.lines_received,
        lines_undecodable: counters.lines_undecodable,
        lines_rejected: counters.lines_rejected,
        samples_stored: counters.samples_stored,
        samples_refused: counters.samples_refused,
        sink_failures: counters.sink_failures,
        series: state.store.series_count(),
        points: state.store.point_count(),
    })
}
