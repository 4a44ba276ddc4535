// Render cadence controller - Fixed-period snapshot, layout and draw
use crate::application::axis_layout::AxisLayoutEngine;
use crate::application::ports::Renderer;
use crate::application::telemetry_store::TelemetryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

pub struct RenderCadenceController {
    store: Arc<TelemetryStore>,
    engine: AxisLayoutEngine,
    renderer: Arc<dyn Renderer>,
    period: Duration,
    window: f64,
}

impl RenderCadenceController {
    pub fn new(
        store: Arc<TelemetryStore>,
        engine: AxisLayoutEngine,
        renderer: Arc<dyn Renderer>,
        period: Duration,
        window: f64,
    ) -> Self {
        Self {
            store,
            engine,
            renderer,
            period,
            window,
        }
    }

    /// Ticks until `shutdown` flips to true or its sender goes away. Returns the number
    /// of frames drawn.
    ///
    /// Samples arriving between ticks are not queued as frames; the next tick simply
    /// sees them in its snapshot. A tick that overruns skips the ticks it missed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frames = 0;

        tracing::info!(period_ms = self.period.as_millis() as u64, "Render loop started");
        while !*shutdown.borrow_and_update() {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(()) => frames += 1,
                        Err(e) => tracing::warn!(error = %e, "Renderer failed to draw frame"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        break;
                    }
                }
            }
        }
        tracing::info!(frames, "Render loop stopped");
        frames
    }

    /// One frame: snapshot under the store lock, then layout and draw without it.
    pub async fn tick(&self) -> anyhow::Result<()> {
        let snapshot = self.store.snapshot(self.window);
        let layout = self.engine.layout(&snapshot.index);
        tracing::trace!(
            series = snapshot.series.len(),
            points = snapshot.point_count(),
            groups = layout.groups.len(),
            "Rendering frame"
        );
        self.renderer.draw(&snapshot, &layout).await
    }
}
