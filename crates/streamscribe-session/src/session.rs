use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use streamscribe_core::{AudioChunk, SessionError, SessionEvent, TranscriptEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::transport::{
    AudioEncoding, ResultSource, SpeechTransport, StreamConfig, TranscriptResult,
};

// ── SessionConfig ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sample_rate_hz: u32,
    pub language: String,
    pub interim_results: bool,
    /// How long a single transport stream may live before the session rolls
    /// it over. Cloud recognizers cap a stream just shy of five minutes.
    pub max_stream_duration: Duration,
    /// Upper bound on waiting for the response reader to drain during stop.
    pub stop_drain_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16000,
            language: "en".to_string(),
            interim_results: true,
            max_stream_duration: Duration::from_millis(290_000),
            stop_drain_timeout: Duration::from_secs(5),
        }
    }
}

// ── Bridging state ─────────────────────────────────────────────

/// State shared between the ingest path and the response reader. Offsets are
/// milliseconds of stream time as reported by the server.
#[derive(Default)]
struct BridgeState {
    /// Chunks written since the current transport stream opened.
    stream_chunks: Vec<AudioChunk>,
    /// Chunks written to the previous stream, retained for rollover replay.
    last_stream_chunks: Vec<AudioChunk>,
    result_end_ms: u64,
    final_end_ms: u64,
    final_request_end_ms: u64,
    bridging_offset_ms: f64,
    replay_pending: bool,
}

/// Compute the tail of the previous stream's chunks estimated as not yet
/// consumed by the server, and advance the bridging offset.
///
/// Chunk timing is reconstructed by spreading the stream duration limit
/// evenly over the retained chunks. This is an estimate, not an
/// acknowledgment protocol: the transport never reports which chunks the
/// server processed, so continuity across a rollover is best-effort and may
/// duplicate or drop a fraction of a chunk at the boundary.
fn bridging_tail(bridge: &mut BridgeState, max_stream_ms: f64) -> Vec<AudioChunk> {
    if bridge.last_stream_chunks.is_empty() {
        return Vec::new();
    }
    let chunk_duration_ms = max_stream_ms / bridge.last_stream_chunks.len() as f64;
    if chunk_duration_ms <= f64::EPSILON {
        return Vec::new();
    }

    bridge.bridging_offset_ms = bridge
        .bridging_offset_ms
        .clamp(0.0, bridge.final_request_end_ms as f64);

    let skip = ((bridge.final_request_end_ms as f64 - bridge.bridging_offset_ms)
        / chunk_duration_ms)
        .floor() as usize;
    let skip = skip.min(bridge.last_stream_chunks.len());

    bridge.bridging_offset_ms =
        ((bridge.last_stream_chunks.len() - skip) as f64 * chunk_duration_ms).floor();

    bridge.last_stream_chunks[skip..].to_vec()
}

// ── StreamSession ──────────────────────────────────────────────

enum StopMode {
    Caller,
    Rollover,
}

struct SessionInner {
    transport: Arc<dyn SpeechTransport>,
    active: AtomicBool,
    stopping: AtomicBool,
    /// Bumped every time a stream opens; stale rollover requests carry the
    /// generation they were issued against and are dropped on mismatch.
    generation: AtomicU64,
    bridge: std::sync::Mutex<BridgeState>,
    config: std::sync::Mutex<Option<SessionConfig>>,
    sink: tokio::sync::Mutex<Option<Box<dyn crate::transport::AudioSink>>>,
    reader: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    stream_cancel: std::sync::Mutex<CancellationToken>,
    /// Serializes start/stop/rollover so a caller stop can never interleave
    /// with a rollover's stop/start pair.
    lifecycle: tokio::sync::Mutex<()>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

/// One logical listening session. May span many transport streams: when the
/// stream duration limit is reached (or the stream fails mid-session), the
/// session closes the stream, opens a fresh one and replays the estimated
/// unacknowledged audio tail, invisibly to the caller.
#[derive(Clone)]
pub struct StreamSession {
    inner: Arc<SessionInner>,
    event_rx: Arc<std::sync::Mutex<Option<mpsc::UnboundedReceiver<SessionEvent>>>>,
}

impl StreamSession {
    pub fn new(transport: Arc<dyn SpeechTransport>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(SessionInner {
                transport,
                active: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                bridge: std::sync::Mutex::new(BridgeState::default()),
                config: std::sync::Mutex::new(None),
                sink: tokio::sync::Mutex::new(None),
                reader: tokio::sync::Mutex::new(None),
                stream_cancel: std::sync::Mutex::new(CancellationToken::new()),
                lifecycle: tokio::sync::Mutex::new(()),
                event_tx,
            }),
            event_rx: Arc::new(std::sync::Mutex::new(Some(event_rx))),
        }
    }

    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.event_rx.lock().unwrap().take()
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Begin listening. Opens a transport stream, starts the response reader
    /// and the stream-age timer, and emits `Started`.
    pub async fn start(&self, config: SessionConfig) -> Result<(), SessionError> {
        let _guard = self.inner.lifecycle.lock().await;
        if self.inner.active.load(Ordering::SeqCst) {
            return Err(SessionError::AlreadyActive);
        }
        *self.inner.config.lock().unwrap() = Some(config.clone());
        if let Err(e) = self.inner.clone().open_stream(&config, false).await {
            *self.inner.config.lock().unwrap() = None;
            return Err(e);
        }
        tracing::info!(
            language = %config.language,
            sample_rate_hz = config.sample_rate_hz,
            "listening session started"
        );
        Ok(())
    }

    /// Stop listening. Idempotent; a stop on an idle session is a no-op.
    pub async fn stop(&self) {
        let _guard = self.inner.lifecycle.lock().await;
        if !self.inner.active.load(Ordering::SeqCst) {
            return;
        }
        self.inner.close_stream(StopMode::Caller).await;
    }

    /// Feed one capture period of PCM audio. A no-op while inactive or while
    /// a stop is in progress.
    pub async fn ingest(&self, chunk: AudioChunk) {
        self.inner.clone().ingest(chunk).await;
    }
}

impl SessionInner {
    async fn open_stream(
        self: Arc<Self>,
        config: &SessionConfig,
        rollover: bool,
    ) -> Result<(), SessionError> {
        let stream_config = StreamConfig {
            encoding: AudioEncoding::Linear16,
            sample_rate_hz: config.sample_rate_hz,
            language: config.language.clone(),
            max_alternatives: 1,
            interim_results: config.interim_results,
        };
        let (sink, source) = self.transport.open(&stream_config).await?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.sink.lock().await = Some(sink);

        let cancel = CancellationToken::new();
        *self.stream_cancel.lock().unwrap() = cancel.clone();

        self.stopping.store(false, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);

        let reader = tokio::spawn(read_responses(self.clone(), source, generation));
        *self.reader.lock().await = Some(reader);

        // Stream-age timer; rolls the stream over once the limit elapses
        let timer_inner = self.clone();
        let max = config.max_stream_duration;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(max) => {
                    tracing::debug!("stream duration limit reached, rolling over");
                    timer_inner.rollover(generation).await;
                }
            }
        });

        if !rollover {
            let _ = self.event_tx.send(SessionEvent::Started);
        }
        tracing::debug!(generation, "recognition stream open");
        Ok(())
    }

    async fn close_stream(&self, mode: StopMode) {
        // Refuse new chunks first, then take the stream down
        self.stopping.store(true, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        self.stream_cancel.lock().unwrap().cancel();

        let drain_timeout = self
            .config
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.stop_drain_timeout)
            .unwrap_or(Duration::from_secs(5));

        // Half-close the write side so the server flushes trailing results
        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                tracing::debug!("write half-close failed: {e}");
            }
        }

        // Wait for the response reader to drain, bounded
        if let Some(mut reader) = self.reader.lock().await.take() {
            if tokio::time::timeout(drain_timeout, &mut reader)
                .await
                .is_err()
            {
                tracing::warn!("response reader did not drain in time, aborting it");
                reader.abort();
            }
        }

        match mode {
            StopMode::Caller => {
                *self.bridge.lock().unwrap() = BridgeState::default();
                *self.config.lock().unwrap() = None;
                let _ = self.event_tx.send(SessionEvent::Stopped);
                tracing::info!("listening session stopped");
            }
            StopMode::Rollover => {
                let mut bridge = self.bridge.lock().unwrap();
                bridge.replay_pending = true;
                if bridge.result_end_ms > 0 {
                    bridge.final_request_end_ms = bridge.final_end_ms;
                }
                bridge.result_end_ms = 0;
                bridge.last_stream_chunks = std::mem::take(&mut bridge.stream_chunks);
            }
        }
    }

    /// Replace the current transport stream with a fresh one, carrying the
    /// bridging state forward. Invisible to the caller: no Started/Stopped
    /// events fire and transcript delivery simply continues.
    fn rollover(
        self: Arc<Self>,
        expected_generation: u64,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let _guard = self.lifecycle.lock().await;
            if !self.active.load(Ordering::SeqCst) {
                return; // a caller stop won the race
            }
            if self.generation.load(Ordering::SeqCst) != expected_generation {
                return; // the stream was already replaced
            }
            let config = match self.config.lock().unwrap().clone() {
                Some(c) => c,
                None => return,
            };

            self.close_stream(StopMode::Rollover).await;
            if let Err(e) = self.clone().open_stream(&config, true).await {
                // The session cannot continue without a stream; surface the end
                // of the session rather than the transport failure
                tracing::error!("failed to reopen recognition stream: {e}");
                *self.bridge.lock().unwrap() = BridgeState::default();
                *self.config.lock().unwrap() = None;
                let _ = self.event_tx.send(SessionEvent::Stopped);
            }
        })
    }

    async fn ingest(self: Arc<Self>, chunk: AudioChunk) {
        if !self.active.load(Ordering::SeqCst) || self.stopping.load(Ordering::SeqCst) {
            return;
        }

        let max_stream_ms = self
            .config
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.max_stream_duration.as_millis() as f64)
            .unwrap_or(0.0);

        // After a rollover, first replay the estimated unacknowledged tail of
        // the previous stream, then proceed with the fresh chunk
        let replay = {
            let mut bridge = self.bridge.lock().unwrap();
            let replay = if bridge.replay_pending {
                bridge.replay_pending = false;
                bridging_tail(&mut bridge, max_stream_ms)
            } else {
                Vec::new()
            };
            bridge.stream_chunks.push(chunk.clone());
            replay
        };

        let mut sink_guard = self.sink.lock().await;
        let Some(sink) = sink_guard.as_mut() else {
            return;
        };
        for c in replay.iter().chain(std::iter::once(&chunk)) {
            if let Err(e) = sink.write(c).await {
                if self.stopping.load(Ordering::SeqCst) {
                    tracing::debug!("write error during shutdown ignored: {e}");
                } else {
                    tracing::warn!("audio write failed, reopening stream: {e}");
                    let generation = self.generation.load(Ordering::SeqCst);
                    let restart = self.clone();
                    tokio::spawn(async move { restart.rollover(generation).await });
                }
                break;
            }
        }
    }

    fn handle_result(&self, result: TranscriptResult) {
        let transcript = match result.alternatives.first() {
            Some(t) => t.trim().to_string(),
            None => return, // nothing recognized in this result
        };

        let interim_enabled = self
            .config
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.interim_results)
            .unwrap_or(false);

        {
            let mut bridge = self.bridge.lock().unwrap();
            bridge.result_end_ms = result.end_offset_ms;
            if result.is_final {
                bridge.final_end_ms = result.end_offset_ms;
            }
        }

        if result.is_final {
            tracing::debug!(end_offset_ms = result.end_offset_ms, "final: {transcript}");
            let _ = self.event_tx.send(SessionEvent::Transcript(TranscriptEvent {
                text: transcript,
                is_final: true,
                end_offset_ms: result.end_offset_ms,
            }));
        } else if interim_enabled {
            tracing::trace!(end_offset_ms = result.end_offset_ms, "interim: {transcript}");
            let _ = self.event_tx.send(SessionEvent::Transcript(TranscriptEvent {
                text: transcript,
                is_final: false,
                end_offset_ms: result.end_offset_ms,
            }));
        }
    }
}

async fn read_responses(
    inner: Arc<SessionInner>,
    mut source: Box<dyn ResultSource>,
    generation: u64,
) {
    loop {
        match source.next_result().await {
            Ok(Some(result)) => inner.handle_result(result),
            Ok(None) => break, // server finished responding
            Err(e) => {
                if inner.stopping.load(Ordering::SeqCst) {
                    // Expected consequence of half-closing during stop
                    tracing::debug!("read error during shutdown ignored: {e}");
                } else {
                    tracing::warn!("transport read failed, reopening stream: {e}");
                    let restart = inner.clone();
                    tokio::spawn(async move { restart.rollover(generation).await });
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(n: usize) -> Vec<AudioChunk> {
        (0..n).map(|i| AudioChunk::from_pcm(vec![i as u8; 2])).collect()
    }

    fn bridge_with(n: usize, final_request_end_ms: u64, bridging_offset_ms: f64) -> BridgeState {
        BridgeState {
            last_stream_chunks: chunks(n),
            final_request_end_ms,
            bridging_offset_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.sample_rate_hz, 16000);
        assert_eq!(config.language, "en");
        assert!(config.interim_results);
        assert_eq!(config.max_stream_duration, Duration::from_millis(290_000));
    }

    #[test]
    fn test_bridging_nothing_retained() {
        let mut bridge = bridge_with(0, 500, 0.0);
        let tail = bridging_tail(&mut bridge, 1000.0);
        assert!(tail.is_empty());
    }

    #[test]
    fn test_bridging_zero_duration_skips_replay() {
        let mut bridge = bridge_with(10, 500, 0.0);
        let tail = bridging_tail(&mut bridge, 0.0);
        assert!(tail.is_empty());
    }

    #[test]
    fn test_bridging_no_acknowledged_audio_replays_everything() {
        let mut bridge = bridge_with(10, 0, 0.0);
        let tail = bridging_tail(&mut bridge, 1000.0);
        assert_eq!(tail.len(), 10);
        assert_eq!(bridge.bridging_offset_ms, 1000.0);
    }

    #[test]
    fn test_bridging_skips_acknowledged_prefix() {
        // 10 chunks over 1000ms, server acknowledged through 500ms
        let mut bridge = bridge_with(10, 500, 0.0);
        let tail = bridging_tail(&mut bridge, 1000.0);
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0].as_bytes(), &[5, 5]);
        assert_eq!(bridge.bridging_offset_ms, 500.0);
    }

    #[test]
    fn test_bridging_second_rollover_uses_carried_offset() {
        let mut bridge = bridge_with(10, 800, 500.0);
        let tail = bridging_tail(&mut bridge, 1000.0);
        // (800 - 500) / 100 = 3 chunks already consumed
        assert_eq!(tail.len(), 7);
        assert_eq!(bridge.bridging_offset_ms, 700.0);
    }

    #[test]
    fn test_bridging_negative_offset_clamped_to_zero() {
        let mut bridge = bridge_with(10, 500, -50.0);
        let tail = bridging_tail(&mut bridge, 1000.0);
        assert_eq!(tail.len(), 5);
    }

    #[test]
    fn test_bridging_offset_clamped_to_final_request_end() {
        let mut bridge = bridge_with(10, 500, 900.0);
        let tail = bridging_tail(&mut bridge, 1000.0);
        // Clamped to 500 → skip (500-500)/100 = 0 chunks
        assert_eq!(tail.len(), 10);
        assert_eq!(bridge.bridging_offset_ms, 1000.0);
    }

    #[test]
    fn test_bridging_skip_clamped_to_retained_count() {
        // Acknowledged end beyond the stream limit: skip everything
        let mut bridge = bridge_with(10, 5000, 0.0);
        let tail = bridging_tail(&mut bridge, 1000.0);
        assert!(tail.is_empty());
        assert_eq!(bridge.bridging_offset_ms, 0.0);
    }

    #[test]
    fn test_bridging_tail_is_a_suffix() {
        let mut bridge = bridge_with(8, 250, 0.0);
        let tail = bridging_tail(&mut bridge, 1000.0);
        let n = tail.len();
        assert!(n <= 8);
        for (i, chunk) in tail.iter().enumerate() {
            assert_eq!(chunk.as_bytes(), &[(8 - n + i) as u8; 2]);
        }
    }

    #[test]
    fn test_bridging_offset_invariant_over_random_inputs() {
        // Deterministic LCG; no RNG crate needed for an invariant sweep
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            seed >> 16
        };

        for _ in 0..500 {
            let count = (next() % 50 + 1) as usize;
            let max_ms = (next() % 300_000 + 1) as f64;
            let mut bridge = bridge_with(
                count,
                next() % 300_000,
                (next() % 600_000) as f64 - 300_000.0,
            );
            let tail = bridging_tail(&mut bridge, max_ms);

            assert!(tail.len() <= count);
            assert!(bridge.bridging_offset_ms >= 0.0);
            // The updated offset never exceeds the reconstructed stream span
            assert!(bridge.bridging_offset_ms <= max_ms + 1.0);
        }
    }
}
