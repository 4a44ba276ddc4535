// Application state for HTTP handlers
use crate::application::ingest_service::IngestStats;
use crate::application::telemetry_store::TelemetryStore;
use crate::infrastructure::frame_publisher::LatestFrame;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub frames: LatestFrame,
    pub stats: Arc<IngestStats>,
    pub store: Arc<TelemetryStore>,
}
