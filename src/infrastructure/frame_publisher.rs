// Frame publisher - Renderer that keeps the latest frame for HTTP clients
use crate::application::ports::Renderer;
use crate::application::telemetry_store::Snapshot;
use crate::domain::layout::LayoutResult;
use crate::infrastructure::frame_view::{frame_to_view, FrameView};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

pub type LatestFrame = watch::Receiver<Option<Arc<FrameView>>>;

pub struct FramePublisher {
    tx: watch::Sender<Option<Arc<FrameView>>>,
}

impl FramePublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> LatestFrame {
        self.tx.subscribe()
    }
}

impl Default for FramePublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Renderer for FramePublisher {
    async fn draw(&self, snapshot: &Snapshot, layout: &LayoutResult) -> anyhow::Result<()> {
        let frame = frame_to_view(snapshot, layout);
        // Replaces even with no subscribers so late subscribers see the newest frame.
        self.tx.send_replace(Some(Arc::new(frame)));
        Ok(())
    }
}
