use crate::transport::{
    AudioSink, ResultSource, SpeechTransport, StreamConfig, TranscriptResult,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use streamscribe_core::{AudioChunk, TransportError};
use tokio::sync::mpsc;

/// Loopback transport: every chunk written comes back as a synthetic final
/// result. Lets the whole pipeline run end to end without a cloud account.
pub struct NullTransport {
    open_count: AtomicUsize,
}

impl NullTransport {
    pub fn new() -> Self {
        Self {
            open_count: AtomicUsize::new(0),
        }
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Relaxed)
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechTransport for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, _config: toml::Value) -> Result<(), TransportError> {
        Ok(())
    }

    async fn open(
        &self,
        config: &StreamConfig,
    ) -> Result<(Box<dyn AudioSink>, Box<dyn ResultSource>), TransportError> {
        let count = self.open_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("NullTransport opened stream #{count}");
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = NullSink {
            tx,
            sample_rate_hz: config.sample_rate_hz.max(1),
            offset_ms: 0,
        };
        Ok((Box::new(sink), Box::new(NullSource { rx })))
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct NullSink {
    tx: mpsc::UnboundedSender<TranscriptResult>,
    sample_rate_hz: u32,
    offset_ms: u64,
}

#[async_trait]
impl AudioSink for NullSink {
    async fn write(&mut self, chunk: &AudioChunk) -> Result<(), TransportError> {
        let samples = (chunk.len() / 2) as u64;
        self.offset_ms += samples * 1000 / self.sample_rate_hz as u64;
        let result = TranscriptResult {
            alternatives: vec![format!("[null] {} bytes", chunk.len())],
            end_offset_ms: self.offset_ms,
            is_final: true,
        };
        let _ = self.tx.send(result);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the sender ends the result stream, mirroring a server
        // that finishes responding after the half-close
        Ok(())
    }
}

struct NullSource {
    rx: mpsc::UnboundedReceiver<TranscriptResult>,
}

#[async_trait]
impl ResultSource for NullSource {
    async fn next_result(&mut self) -> Result<Option<TranscriptResult>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::AudioEncoding;

    fn stream_config() -> StreamConfig {
        StreamConfig {
            encoding: AudioEncoding::Linear16,
            sample_rate_hz: 16000,
            language: "en".to_string(),
            max_alternatives: 1,
            interim_results: true,
        }
    }

    #[test]
    fn test_null_transport_name() {
        let transport = NullTransport::new();
        assert_eq!(transport.name(), "null");
    }

    #[tokio::test]
    async fn test_null_transport_initialize_succeeds() {
        let mut transport = NullTransport::new();
        let result = transport
            .initialize(toml::Value::Table(Default::default()))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_null_transport_echoes_write_as_final_result() {
        let transport = NullTransport::new();
        let (mut sink, mut source) = transport.open(&stream_config()).await.unwrap();

        // 16000 samples at 16kHz = 1000ms of audio
        sink.write(&AudioChunk::from_pcm(vec![0u8; 32000]))
            .await
            .unwrap();

        let result = source.next_result().await.unwrap().unwrap();
        assert_eq!(result.alternatives[0], "[null] 32000 bytes");
        assert_eq!(result.end_offset_ms, 1000);
        assert!(result.is_final);
    }

    #[tokio::test]
    async fn test_null_transport_offset_accumulates() {
        let transport = NullTransport::new();
        let (mut sink, mut source) = transport.open(&stream_config()).await.unwrap();

        for _ in 0..3 {
            sink.write(&AudioChunk::from_pcm(vec![0u8; 3200])).await.unwrap();
        }

        let mut last = 0;
        for _ in 0..3 {
            last = source.next_result().await.unwrap().unwrap().end_offset_ms;
        }
        // 1600 samples per chunk = 100ms each
        assert_eq!(last, 300);
    }

    #[tokio::test]
    async fn test_null_transport_close_ends_results() {
        let transport = NullTransport::new();
        let (sink, mut source) = transport.open(&stream_config()).await.unwrap();

        drop(sink);
        let result = source.next_result().await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_null_transport_counts_opens() {
        let transport = NullTransport::new();
        assert_eq!(transport.open_count(), 0);
        let _ = transport.open(&stream_config()).await.unwrap();
        let _ = transport.open(&stream_config()).await.unwrap();
        assert_eq!(transport.open_count(), 2);
    }

    #[test]
    fn test_null_transport_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullTransport>();
    }
}
