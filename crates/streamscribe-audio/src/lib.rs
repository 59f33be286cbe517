pub mod capture;
pub mod device;
pub mod pcm;
pub mod pump;

pub use capture::{CaptureHandle, CaptureNode};
pub use device::DeviceManager;
pub use pcm::first_channel_to_pcm16;
pub use pump::{ChunkPump, PumpHandle};

use ringbuf::traits::Split;
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Create a ring buffer split into producer and consumer halves.
pub fn create_ring_buffer(capacity: usize) -> (HeapProd<f32>, HeapCons<f32>) {
    HeapRb::<f32>::new(capacity).split()
}
