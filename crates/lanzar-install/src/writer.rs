#![forbid(unsafe_code)]

use futures::{Stream, StreamExt};
use lanzar_events::InstallFailure;
use lanzar_net::{ByteStream, NetError};
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Error from the archive write loop.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("source stream error: {0}")]
    Source(#[source] NetError),

    #[error("archive write error: {0}")]
    Sink(#[source] std::io::Error),
}

impl WriteError {
    /// Collapse into the failure reason published on the bus.
    #[must_use]
    pub fn into_failure(self) -> InstallFailure {
        match self {
            Self::Source(e) => InstallFailure::Network(e.to_string()),
            Self::Sink(e) => InstallFailure::Io(e.to_string()),
        }
    }
}

/// Item yielded by the archive write loop.
#[derive(Debug, Clone, Copy)]
pub enum WriteItem {
    /// A chunk landed on disk; `downloaded` is the running byte total.
    Chunk { downloaded: u64 },
    /// Source exhausted and the file flushed.
    Done { total_bytes: u64 },
}

/// Copy `source` into `file`, yielding one item per chunk written.
///
/// Cancellation is observed between chunks, never mid-chunk, and ends
/// the stream silently without a `Done` item; the caller treats that
/// as a cancelled download. Empty chunks are skipped.
pub fn write_archive(
    mut source: ByteStream,
    mut file: File,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<WriteItem, WriteError>> {
    async_stream::stream! {
        let mut downloaded: u64 = 0;

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!(downloaded, "archive write cancelled");
                    return;
                }

                next = source.next() => {
                    let Some(next) = next else {
                        if let Err(e) = file.flush().await {
                            yield Err(WriteError::Sink(e));
                            return;
                        }
                        debug!(total_bytes = downloaded, "archive fully written");
                        yield Ok(WriteItem::Done { total_bytes: downloaded });
                        return;
                    };

                    let bytes = match next {
                        Ok(b) => b,
                        Err(e) => {
                            yield Err(WriteError::Source(e));
                            return;
                        }
                    };

                    if bytes.is_empty() {
                        warn!(downloaded, "skipping empty chunk from source");
                        continue;
                    }

                    if let Err(e) = file.write_all(&bytes).await {
                        yield Err(WriteError::Sink(e));
                        return;
                    }

                    downloaded = downloaded.saturating_add(bytes.len() as u64);
                    yield Ok(WriteItem::Chunk { downloaded });
                }
            }
        }
    }
}
