//! PCM decode: base64 payload to playable sample buffer.
//!
//! The speech endpoint delivers raw 16-bit little-endian PCM, mono, at a
//! fixed 24 kHz. No container, no header; an odd byte count means the payload
//! is corrupt.

use crate::error::{VoiceError, VoiceResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rodio::buffer::SamplesBuffer;

/// Sample rate of every payload the speech endpoint returns.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Decodes a base64 PCM16 payload into samples.
pub fn decode_base64_pcm(data: &str) -> VoiceResult<Vec<i16>> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| VoiceError::Decode(format!("invalid base64: {e}")))?;
    if bytes.len() % 2 != 0 {
        return Err(VoiceError::Decode(format!(
            "odd PCM16 byte count: {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Wraps decoded samples for the output sink (mono, fixed rate).
pub fn samples_buffer(samples: Vec<i16>) -> SamplesBuffer<i16> {
    SamplesBuffer::new(1, SPEECH_SAMPLE_RATE, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_samples() {
        // 0x0001 and -2 (0xFFFE) little-endian.
        let payload = BASE64.encode([0x01, 0x00, 0xFE, 0xFF]);
        let samples = decode_base64_pcm(&payload).unwrap();
        assert_eq!(samples, vec![1, -2]);
    }

    #[test]
    fn empty_payload_decodes_to_no_samples() {
        assert!(decode_base64_pcm("").unwrap().is_empty());
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let err = decode_base64_pcm("!!not base64!!").unwrap_err();
        assert!(matches!(err, VoiceError::Decode(_)));
    }

    #[test]
    fn odd_byte_count_is_a_decode_error() {
        let payload = BASE64.encode([0x01, 0x00, 0xFE]);
        let err = decode_base64_pcm(&payload).unwrap_err();
        assert!(matches!(err, VoiceError::Decode(_)));
    }
}
