//! Rating event ingestion.
//!
//! A `RateIngester` turns some external source into a lazy stream of
//! `RatingEvent`s. The stream ends when the source is exhausted or the
//! shutdown signal fires.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cinegrid_core::RatingEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{RatingError, RatingResult};

/// Source of rating events.
#[async_trait]
pub trait RateIngester: Send + Sync {
    /// Start producing events. The receiver yields `None` once the stream ends.
    async fn ingest(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> RatingResult<mpsc::Receiver<RatingEvent>>;
}

/// Reads newline-delimited JSON rating events from a file.
///
/// Lines that fail to decode are logged and skipped.
#[derive(Debug, Clone)]
pub struct JsonLinesIngester {
    path: PathBuf,
    buffer: usize,
}

impl JsonLinesIngester {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            buffer: 64,
        }
    }

    /// Set the channel capacity between the reader task and the consumer.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

#[async_trait]
impl RateIngester for JsonLinesIngester {
    async fn ingest(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> RatingResult<mpsc::Receiver<RatingEvent>> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| RatingError::Ingest(format!("open {}: {e}", self.path.display())))?;
        let (tx, rx) = mpsc::channel(self.buffer);
        let path = self.path.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(file).lines();
            let mut line_no = 0u64;
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.changed() => {
                        debug!(path = %path.display(), "rating ingestion cancelled");
                        break;
                    }
                    next = lines.next_line() => {
                        let line = match next {
                            Ok(Some(line)) => line,
                            Ok(None) => break,
                            Err(e) => {
                                warn!(
                                    path = %path.display(),
                                    error = %e,
                                    "rating source read failed"
                                );
                                break;
                            }
                        };
                        line_no += 1;
                        if line.trim().is_empty() {
                            continue;
                        }
                        let event: RatingEvent = match serde_json::from_str(&line) {
                            Ok(event) => event,
                            Err(e) => {
                                warn!(
                                    path = %path.display(),
                                    line = line_no,
                                    error = %e,
                                    "skipping malformed rating event"
                                );
                                continue;
                            }
                        };
                        if tx.send(event).await.is_err() {
                            debug!("rating event consumer dropped");
                            break;
                        }
                    }
                }
            }
            info!(path = %path.display(), lines = line_no, "rating source drained");
        });

        Ok(rx)
    }
}
