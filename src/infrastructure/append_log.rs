// Append log - Every decoded line with a local ISO-8601 timestamp
use crate::application::ports::AppendSink;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

pub struct FileAppendSink {
    path: PathBuf,
    file: File,
}

impl FileAppendSink {
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing::info!(path = %path.display(), "Appending received lines to log file");
        Ok(Self { path, file })
    }
}

fn format_entry(at: DateTime<Local>, line: &str) -> String {
    format!("{}: {}\n", at.format("%Y-%m-%dT%H:%M:%S%.6f"), line)
}

#[async_trait]
impl AppendSink for FileAppendSink {
    async fn append(&mut self, line: &str) -> anyhow::Result<()> {
        let entry = format_entry(Local::now(), line);
        self.file
            .write_all(entry.as_bytes())
            .await
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        self.file.flush().await?;
        Ok(())
    }
}
