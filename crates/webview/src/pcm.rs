//! Float sample blocks to 16-bit PCM.

use bytes::{BufMut, Bytes, BytesMut};

/// Scale a [-1.0, 1.0] sample to i16.
///
/// Truncates toward zero. Out-of-range input saturates and NaN becomes 0.
pub fn sample_to_i16(sample: f32) -> i16 {
    (sample * 32767.0) as i16
}

/// Convert a block to signed 16-bit little-endian PCM.
pub fn to_pcm16_le(samples: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * 2);
    for &sample in samples {
        buf.put_i16_le(sample_to_i16(sample));
    }
    buf.freeze()
}

/// Read little-endian PCM back into samples. A trailing odd byte is ignored.
pub fn pcm16_le_samples(pcm: &[u8]) -> impl Iterator<Item = i16> + '_ {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}
