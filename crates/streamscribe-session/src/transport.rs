use async_trait::async_trait;
use streamscribe_core::{AudioChunk, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Linear16,
}

/// Parameters of the initial configuration frame sent when a recognition
/// stream opens.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hz: u32,
    pub language: String,
    pub max_alternatives: u32,
    pub interim_results: bool,
}

/// One recognition result as it arrives off the wire. `end_offset_ms` is the
/// position of the recognized audio's end within the current stream.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub alternatives: Vec<String>,
    pub end_offset_ms: u64,
    pub is_final: bool,
}

/// Write half of an open recognition stream. Only the session's ingest path
/// writes; `close` half-closes so the server can flush trailing results.
#[async_trait]
pub trait AudioSink: Send {
    async fn write(&mut self, chunk: &AudioChunk) -> Result<(), TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of an open recognition stream.
#[async_trait]
pub trait ResultSource: Send {
    /// Next result from the server, `Ok(None)` once it has finished
    /// responding.
    async fn next_result(&mut self) -> Result<Option<TranscriptResult>, TransportError>;
}

/// A bidirectional speech-recognition transport.
///
/// Implementations are registered via [`TransportRegistry`](crate::TransportRegistry).
/// `open` sends the initial configuration frame and returns the two stream
/// halves; the session writes audio to one and reads results from the other
/// until it half-closes the write side or the stream fails.
#[async_trait]
pub trait SpeechTransport: Send + Sync {
    /// Returns the transport's plugin name (e.g. `"null"`, `"gcp"`).
    fn name(&self) -> &str;
    /// One-time initialisation with transport-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), TransportError>;
    /// Open a recognition stream carrying `config` as its first frame.
    async fn open(
        &self,
        config: &StreamConfig,
    ) -> Result<(Box<dyn AudioSink>, Box<dyn ResultSource>), TransportError>;
    /// Gracefully shut down the transport, releasing resources.
    async fn shutdown(&self) -> Result<(), TransportError>;
}
