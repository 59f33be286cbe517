use cpal::traits::DeviceTrait;
use cpal::{Device, SampleRate, Stream, StreamConfig};
use ringbuf::traits::Producer;
use ringbuf::HeapProd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use streamscribe_core::AudioError;

// ── CaptureHandle ─────────────────────────────────────────────

/// Observes whether the capture callback has delivered any samples yet.
#[derive(Clone)]
pub struct CaptureHandle {
    saw_signal: Arc<AtomicBool>,
}

impl CaptureHandle {
    pub fn saw_signal(&self) -> bool {
        self.saw_signal.load(Ordering::Relaxed)
    }

    /// Wait until the device delivers its first samples. Some microphones take
    /// a moment to spin up; a device that stays silent past `timeout` is
    /// treated as unusable and listening must not start.
    pub async fn wait_for_signal(&self, timeout: Duration) -> Result<(), AudioError> {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.saw_signal() {
            if tokio::time::Instant::now() >= deadline {
                return Err(AudioError::InitTimeout);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }
}

// ── CaptureNode ───────────────────────────────────────────────

pub struct CaptureNode {
    _stream: Stream,
}

impl CaptureNode {
    pub fn new(
        device: &Device,
        producer: HeapProd<f32>,
        sample_rate: u32,
        channels: u16,
        buffer_size: u32,
    ) -> Result<(Self, CaptureHandle), AudioError> {
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(buffer_size),
        };

        let producer = Arc::new(Mutex::new(producer));
        let saw_signal = Arc::new(AtomicBool::new(false));
        let signal_flag = Arc::clone(&saw_signal);

        let err_callback = |err: cpal::StreamError| {
            tracing::error!("capture stream error: {}", err);
        };

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !data.is_empty() {
                        signal_flag.store(true, Ordering::Relaxed);
                    }
                    if let Ok(mut prod) = producer.lock() {
                        // Push as much as we can; overflow is silently dropped
                        prod.push_slice(data);
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        let handle = CaptureHandle { saw_signal };
        Ok((Self { _stream: stream }, handle))
    }
}
