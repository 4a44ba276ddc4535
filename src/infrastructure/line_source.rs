// Line sources - Stdin, files, device nodes and TCP streams as raw lines
use crate::application::ports::LineSource;
use crate::domain::error::SourceError;
use crate::infrastructure::config::SourceConfig;
use async_trait::async_trait;
use std::io::BufRead;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

/// Longest line kept, excluding the newline. Longer lines are discarded whole.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

// Lines queued between the stdin thread and the ingest loop.
const STDIN_QUEUE: usize = 256;

/// Splits any buffered async reader on `\n`. Bytes are passed through undecoded.
pub struct ReaderLineSource<R> {
    reader: R,
    label: String,
    max_line: usize,
}

impl<R> ReaderLineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
            max_line: MAX_LINE_BYTES,
        }
    }

    #[cfg(test)]
    fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    // Reads at most one byte past the limit; zero only at EOF.
    async fn read_chunk(&mut self, buf: &mut Vec<u8>) -> std::io::Result<usize> {
        buf.clear();
        (&mut self.reader)
            .take(self.max_line as u64 + 1)
            .read_until(b'\n', buf)
            .await
    }
}

#[async_trait]
impl<R> LineSource for ReaderLineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let mut line = Vec::new();
        loop {
            if self.read_chunk(&mut line).await? == 0 {
                return Ok(None);
            }
            match finish_line(&mut line, self.max_line) {
                LineEnd::Complete => return Ok(Some(line)),
                LineEnd::Overlong => {
                    let mut discarded = line.len();
                    let mut rest = Vec::new();
                    loop {
                        let read = self.read_chunk(&mut rest).await?;
                        discarded += read;
                        if read == 0 || rest.last() == Some(&b'\n') {
                            break;
                        }
                    }
                    tracing::warn!(source = %self.label, discarded, "Dropped overlong line");
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

enum LineEnd {
    Complete,
    Overlong,
}

// Strips the newline. A chunk without one is complete only when EOF cut it short.
fn finish_line(line: &mut Vec<u8>, max_line: usize) -> LineEnd {
    if line.last() == Some(&b'\n') {
        line.pop();
        LineEnd::Complete
    } else if line.len() > max_line {
        LineEnd::Overlong
    } else {
        LineEnd::Complete
    }
}

/// Blocking reads happen on a plain OS thread, so a read that never returns cannot
/// hold up runtime shutdown. The thread exits with the process.
pub struct ThreadLineSource {
    lines: mpsc::Receiver<std::io::Result<Vec<u8>>>,
    label: String,
}

impl ThreadLineSource {
    pub fn spawn<R>(reader: R, label: impl Into<String>) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        Self::spawn_with_limit(reader, label, MAX_LINE_BYTES)
    }

    fn spawn_with_limit<R>(
        mut reader: R,
        label: impl Into<String>,
        max_line: usize,
    ) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = mpsc::channel(STDIN_QUEUE);
        let thread_label = label.clone();
        std::thread::Builder::new()
            .name(format!("{}-reader", label))
            .spawn(move || {
                loop {
                    let message = match read_blocking_line(&mut reader, max_line, &thread_label) {
                        Ok(Some(line)) => Ok(line),
                        Ok(None) => break,
                        Err(e) => {
                            let _ = tx.blocking_send(Err(e));
                            break;
                        }
                    };
                    // Receiver gone: ingestion stopped.
                    if tx.blocking_send(message).is_err() {
                        break;
                    }
                }
            })?;
        Ok(Self { lines: rx, label })
    }
}

fn read_blocking_line<R: BufRead>(
    reader: &mut R,
    max_line: usize,
    label: &str,
) -> std::io::Result<Option<Vec<u8>>> {
    let limit = max_line as u64 + 1;
    let mut line = Vec::new();
    loop {
        line.clear();
        if std::io::Read::take(&mut *reader, limit).read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        match finish_line(&mut line, max_line) {
            LineEnd::Complete => return Ok(Some(line)),
            LineEnd::Overlong => {
                let mut discarded = line.len();
                let mut rest = Vec::new();
                loop {
                    rest.clear();
                    let read =
                        std::io::Read::take(&mut *reader, limit).read_until(b'\n', &mut rest)?;
                    discarded += read;
                    if read == 0 || rest.last() == Some(&b'\n') {
                        break;
                    }
                }
                tracing::warn!(source = %label, discarded, "Dropped overlong line");
            }
        }
    }
}

#[async_trait]
impl LineSource for ThreadLineSource {
    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        match self.lines.recv().await {
            Some(line) => Ok(Some(line?)),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

pub async fn open_source(config: &SourceConfig) -> Result<Box<dyn LineSource>, SourceError> {
    match config {
        SourceConfig::Stdin => {
            let stdin = std::io::BufReader::new(std::io::stdin());
            let source = ThreadLineSource::spawn(stdin, "stdin").map_err(|source| {
                SourceError::Connect {
                    target: "stdin".to_string(),
                    source,
                }
            })?;
            Ok(Box::new(source))
        }
        SourceConfig::File { path } => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| SourceError::Connect {
                    target: path.clone(),
                    source,
                })?;
            Ok(Box::new(ReaderLineSource::new(
                BufReader::new(file),
                format!("file:{}", path),
            )))
        }
        SourceConfig::Tcp { address } => {
            let stream = tokio::net::TcpStream::connect(address)
                .await
                .map_err(|source| SourceError::Connect {
                    target: address.clone(),
                    source,
                })?;
            Ok(Box::new(ReaderLineSource::new(
                BufReader::new(stream),
                format!("tcp:{}", address),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_reader_source_splits_lines() {
        let data: &[u8] = b"Temp/a[V]: 1\r\n\xff\nlast without newline";
        let mut source = ReaderLineSource::new(data, "memory");

        assert_eq!(source.next_line().await.unwrap(), Some(b"Temp/a[V]: 1\r".to_vec()));
        assert_eq!(source.next_line().await.unwrap(), Some(b"\xff".to_vec()));
        assert_eq!(
            source.next_line().await.unwrap(),
            Some(b"last without newline".to_vec())
        );
        assert_eq!(source.next_line().await.unwrap(), None);
        assert_eq!(source.describe(), "memory");
    }

    #[tokio::test]
    async fn test_open_missing_file_is_connect_error() {
        let config = SourceConfig::File {
            path: "/nonexistent/telemetry-plotter/feed".to_string(),
        };
        assert!(matches!(
            open_source(&config).await,
            Err(SourceError::Connect { .. })
        ));
    }

    #[tokio::test]
    async fn test_tcp_source_reads_until_peer_closes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"Power/Batt[V]: 12.5\n").await.unwrap();
        });

        let mut source = open_source(&SourceConfig::Tcp { address }).await.unwrap();

        assert_eq!(
            source.next_line().await.unwrap(),
            Some(b"Power/Batt[V]: 12.5".to_vec())
        );
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reader_source_drops_overlong_lines() {
        let data: &[u8] = b"12345678\nthis line is too long\nnext\nunterminated and too long";
        let mut source = ReaderLineSource::new(data, "memory").with_max_line(8);

        assert_eq!(source.next_line().await.unwrap(), Some(b"12345678".to_vec()));
        assert_eq!(source.next_line().await.unwrap(), Some(b"next".to_vec()));
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_thread_source_reads_until_eof() {
        let data = std::io::Cursor::new(b"Power/Batt[V]: 12.5\r\nwhat\n".to_vec());
        let mut source = ThreadLineSource::spawn(data, "cursor").unwrap();

        assert_eq!(
            source.next_line().await.unwrap(),
            Some(b"Power/Batt[V]: 12.5\r".to_vec())
        );
        assert_eq!(source.next_line().await.unwrap(), Some(b"what".to_vec()));
        assert_eq!(source.next_line().await.unwrap(), None);
        assert_eq!(source.describe(), "cursor");
    }

    #[tokio::test]
    async fn test_thread_source_drops_overlong_lines() {
        let data = std::io::Cursor::new(b"far too long for four\nok\n".to_vec());
        let mut source = ThreadLineSource::spawn_with_limit(data, "cursor", 4).unwrap();

        assert_eq!(source.next_line().await.unwrap(), Some(b"ok".to_vec()));
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    struct Stalled;

    impl std::io::Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                std::thread::park();
            }
        }
    }

    #[test]
    fn test_idle_thread_source_does_not_block_runtime_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let waited = runtime.block_on(async {
            let mut source =
                ThreadLineSource::spawn(std::io::BufReader::new(Stalled), "stalled").unwrap();
            tokio::time::timeout(std::time::Duration::from_millis(50), source.next_line()).await
        });
        assert!(waited.is_err());

        // Returns even though the reader thread is still parked in `read`.
        drop(runtime);
    }
}
