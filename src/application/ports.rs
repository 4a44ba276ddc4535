// Ports - Traits the application layer drives its collaborators through
use crate::application::telemetry_store::Snapshot;
use crate::domain::error::SourceError;
use crate::domain::layout::LayoutResult;
use async_trait::async_trait;

/// Raw line feed, independent of transport.
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its terminator, `None` at end of stream.
    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, SourceError>;

    /// Human readable origin, for logs
    fn describe(&self) -> String;
}

/// Receives every decoded line for logging.
#[async_trait]
pub trait AppendSink: Send {
    async fn append(&mut self, line: &str) -> anyhow::Result<()>;
}

/// Draws one frame. Called without any store lock held.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn draw(&self, snapshot: &Snapshot, layout: &LayoutResult) -> anyhow::Result<()>;
}
