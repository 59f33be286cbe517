use std::sync::Arc;

/// One capture period of interleaved floating-point samples, as delivered by
/// the audio device.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// An immutable blob of 16-bit little-endian PCM, one capture period long.
///
/// Clones share the payload: the session retains chunks after writing them so
/// they can be replayed when a stream rolls over.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    data: Arc<[u8]>,
}

impl AudioChunk {
    pub fn from_pcm(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
    pub end_offset_ms: u64,
}

/// Session notifications, delivered on a single channel so callers observe
/// them in processing order.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started,
    Stopped,
    Transcript(TranscriptEvent),
}
