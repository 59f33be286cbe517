/// Scale for float-to-16-bit conversion. The fractional tail makes a
/// full-scale 1.0 sample land on exactly `i16::MAX` after truncation.
const PCM16_SCALE: f64 = 0x7FFF as f64 + 0.499_999_999_999_999_9;

/// Convert the first channel of an interleaved float block to 16-bit signed
/// PCM, packed little-endian. Other channels are discarded; the recognizer
/// only wants mono.
pub fn first_channel_to_pcm16(samples: &[f32], channels: u16) -> Vec<u8> {
    let stride = channels.max(1) as usize;
    let frames = samples.len() / stride;
    let mut out = Vec::with_capacity(frames * 2);
    for frame in 0..frames {
        let sample = (samples[frame * stride] as f64 * PCM16_SCALE) as i16;
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}
