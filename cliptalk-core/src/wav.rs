//! Streaming WAV framing for raw PCM backends

use bytes::{BufMut, Bytes, BytesMut};

/// Size of a canonical RIFF/WAVE PCM header
pub const HEADER_LEN: usize = 44;

/// Data length written into a header whose stream length is not known yet.
///
/// Players that stream WAV over HTTP ignore the size fields, so the
/// placeholder stays zero like a header written before any frames.
const UNKNOWN_DATA_LEN: u32 = 0;

/// PCM layout of a raw sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

impl PcmFormat {
    pub fn mono16(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Header announcing a stream of unknown length
    pub fn streaming_header(&self) -> Bytes {
        self.header(UNKNOWN_DATA_LEN)
    }

    /// Header for exactly `data_len` bytes of samples
    pub fn header(&self, data_len: u32) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        buf.put_slice(b"RIFF");
        buf.put_u32_le(36u32.saturating_add(data_len));
        buf.put_slice(b"WAVE");

        buf.put_slice(b"fmt ");
        buf.put_u32_le(16);
        buf.put_u16_le(1); // PCM
        buf.put_u16_le(self.channels);
        buf.put_u32_le(self.sample_rate);
        buf.put_u32_le(self.byte_rate());
        buf.put_u16_le(self.block_align());
        buf.put_u16_le(self.bits_per_sample);

        buf.put_slice(b"data");
        buf.put_u32_le(data_len);
        buf.freeze()
    }
}
