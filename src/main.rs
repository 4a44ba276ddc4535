// Main entry point - Dependency injection, ingestion and render loops
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use axum::{routing::get, Router};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::axis_layout::AxisLayoutEngine;
use crate::application::ingest_service::{IngestService, IngestStats, ProcessClock};
use crate::application::ports::AppendSink;
use crate::application::render_cadence::RenderCadenceController;
use crate::application::telemetry_store::TelemetryStore;
use crate::infrastructure::append_log::FileAppendSink;
use crate::infrastructure::config::load_plotter_config;
use crate::infrastructure::frame_publisher::FramePublisher;
use crate::infrastructure::line_source::open_source;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{health_check, ingest_status, latest_frame};

async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Timestamps are seconds since this point
    let clock = ProcessClock::start();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("telemetry_plotter=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_plotter_config()?;
    tracing::debug!(?config, "Loaded configuration");

    // Create the store and the renderer (infrastructure layer)
    let store = Arc::new(TelemetryStore::new(config.retention()));
    let stats = Arc::new(IngestStats::default());
    let publisher = Arc::new(FramePublisher::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Render loop (application layer)
    let controller = RenderCadenceController::new(
        store.clone(),
        AxisLayoutEngine::new(config.layout_settings()),
        publisher.clone(),
        config.tick_period(),
        config.window_secs,
    );
    let render_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { controller.run(shutdown).await }
    });

    // Build router (presentation layer)
    let state = Arc::new(AppState {
        frames: publisher.subscribe(),
        stats: stats.clone(),
        store: store.clone(),
    });
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/frame", get(latest_frame))
        .route("/status", get(ingest_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.http.bind).await?;
    tracing::info!(addr = %config.http.bind, "Serving frames over HTTP");
    let server_task = tokio::spawn({
        let shutdown = shutdown_requested(shutdown_rx.clone());
        async move { axum::serve(listener, router).with_graceful_shutdown(shutdown).await }
    });

    // Ingestion runs on this task until the source ends, fails, or Ctrl-C
    let sink: Option<Box<dyn AppendSink>> = match config.log_path() {
        Some(path) => Some(Box::new(FileAppendSink::open(path).await?)),
        None => None,
    };
    let mut ingest = IngestService::new(store, stats, clock, sink);
    let ingestion = async {
        let mut source = open_source(&config.source).await?;
        ingest.run(source.as_mut()).await
    };

    let outcome = tokio::select! {
        result = ingestion => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    if outcome.is_some() {
        // Keep serving the last consistent frame until the user stops us
        tracing::info!("Ingestion finished; press Ctrl-C to exit");
        tokio::signal::ctrl_c().await?;
    }

    tracing::info!("Shutting down");
    shutdown_tx.send_replace(true);
    let frames = render_task.await?;
    server_task.await??;
    tracing::info!(frames, "Stopped");

    match outcome {
        Some(Err(e)) => Err(e.into()),
        _ => Ok(()),
    }
}
