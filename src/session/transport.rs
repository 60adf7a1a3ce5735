use std::path::PathBuf;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::ACCEPT;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::protocol::emit::ValidationRequest;

/// Raw chunks as they come off the wire. Boundaries are arbitrary.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("HTTP error: {status}")]
    Status { status: u16, body: String },
    #[error("stream read failed: {0}")]
    Read(#[source] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The cancellation token fired. Not a failure from the user's point of view.
    #[error("cancelled")]
    Cancelled,
}

/// Something that can start a validation run and stream back its output.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Open a stream for `request`. Implementations should give up with
    /// [`TransportError::Cancelled`] once `cancel` fires.
    async fn open(
        &self,
        request: &ValidationRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, TransportError>;
}

/// Streams from the pipeline service over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    record_to: Option<PathBuf>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            record_to: None,
        }
    }

    /// Also write every raw chunk to `path`, for later replay.
    #[must_use]
    pub fn record_to(mut self, path: PathBuf) -> Self {
        self.record_to = Some(path);
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/validate", self.base_url.trim_end_matches('/'))
    }
}

impl Transport for HttpTransport {
    async fn open(
        &self,
        request: &ValidationRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, TransportError> {
        let endpoint = self.endpoint();
        info!(%endpoint, "opening validation stream");
        let send = self
            .client
            .post(&endpoint)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            result = send => result.map_err(TransportError::Request)?,
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let recorder = match &self.record_to {
            Some(path) => Some(spawn_recorder(tokio::fs::File::create(path).await?).0),
            None => None,
        };

        let stream = response.bytes_stream().map(move |chunk| {
            let chunk = chunk.map_err(TransportError::Read)?.to_vec();
            if let Some(tx) = &recorder {
                // The writer task stops on its first failed write.
                tx.send(chunk.clone()).ok();
            }
            Ok(chunk)
        });
        Ok(stream.boxed())
    }
}

/// Write chunks to `file` in order on a background task until the sender is dropped.
fn spawn_recorder(mut file: tokio::fs::File) -> (mpsc::UnboundedSender<Vec<u8>>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let handle = tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if let Err(e) = file.write_all(&chunk).await {
                warn!(error = %e, "failed to record stream chunk");
                return;
            }
        }
        if let Err(e) = file.flush().await {
            warn!(error = %e, "failed to flush stream recording");
        }
    });
    (tx, handle)
}

enum ReplaySource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Replays a recorded stream, split into fixed-size chunks.
pub struct ReplayTransport {
    source: ReplaySource,
    chunk_size: usize,
    pace: Option<Duration>,
}

impl ReplayTransport {
    const DEFAULT_CHUNK_SIZE: usize = 64;

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ReplaySource::File(path.into()),
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            pace: None,
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: ReplaySource::Bytes(bytes.into()),
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            pace: None,
        }
    }

    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Sleep this long before yielding each chunk.
    #[must_use]
    pub fn pace(mut self, delay: Duration) -> Self {
        self.pace = Some(delay);
        self
    }
}

impl Transport for ReplayTransport {
    async fn open(
        &self,
        _request: &ValidationRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let bytes = match &self.source {
            ReplaySource::File(path) => tokio::fs::read(path).await?,
            ReplaySource::Bytes(bytes) => bytes.clone(),
        };
        let chunks: Vec<Result<Vec<u8>, TransportError>> = bytes
            .chunks(self.chunk_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();

        let stream = futures::stream::iter(chunks);
        match self.pace {
            Some(delay) => Ok(stream
                .then(move |chunk| async move {
                    tokio::time::sleep(delay).await;
                    chunk
                })
                .boxed()),
            None => Ok(stream.boxed()),
        }
    }
}
