use crate::pcm::first_channel_to_pcm16;
use ringbuf::traits::Consumer;
use ringbuf::HeapCons;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streamscribe_core::AudioChunk;
use tokio::sync::mpsc;

// ── ChunkPump ──────────────────────────────────────────────────

/// Drains the capture ring at a fixed cadence, one buffer period per cycle,
/// converting each block to PCM16 and handing it to the session's ingest
/// path. This replaces the audio engine's periodic filter callback with an
/// explicit timer-driven loop.
pub struct ChunkPump {
    consumer: HeapCons<f32>,
    read_buffer: Vec<f32>,
    channels: u16,
    chunk_tx: mpsc::UnboundedSender<AudioChunk>,
}

impl ChunkPump {
    pub fn new(
        consumer: HeapCons<f32>,
        frames_per_chunk: usize,
        channels: u16,
        chunk_tx: mpsc::UnboundedSender<AudioChunk>,
    ) -> Self {
        let stride = channels.max(1) as usize;
        Self {
            consumer,
            read_buffer: vec![0.0; frames_per_chunk * stride],
            channels,
            chunk_tx,
        }
    }

    /// Run one pump cycle: pop at most one block from the ring, convert it,
    /// send it. Returns the number of samples drained.
    pub fn pump_once(&mut self) -> usize {
        let n = self.consumer.pop_slice(&mut self.read_buffer);
        if n == 0 {
            return 0;
        }

        let pcm = first_channel_to_pcm16(&self.read_buffer[..n], self.channels);
        if self.chunk_tx.send(AudioChunk::from_pcm(pcm)).is_err() {
            tracing::debug!("chunk receiver dropped, discarding capture block");
        }
        n
    }

    /// Run the pump loop until `running` is set to false.
    pub fn run(&mut self, running: Arc<AtomicBool>, interval: std::time::Duration) {
        while running.load(Ordering::Relaxed) {
            self.pump_once();
            std::thread::sleep(interval);
        }
    }

    /// Spawn the pump on a dedicated thread. Consumes self.
    /// Returns a `PumpHandle` that can stop the thread.
    pub fn start(mut self, interval: std::time::Duration) -> PumpHandle {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = std::thread::Builder::new()
            .name("chunk-pump".into())
            .spawn(move || {
                self.run(flag, interval);
            })
            .expect("failed to spawn pump thread");
        PumpHandle {
            running,
            thread: Some(thread),
        }
    }
}

// ── PumpHandle ─────────────────────────────────────────────────

pub struct PumpHandle {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl PumpHandle {
    /// Signal the pump thread to stop and wait for it to finish.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(t) = self.thread.take() {
            t.join().expect("pump thread panicked");
        }
    }
}
