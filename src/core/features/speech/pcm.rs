use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::shared::error::{AppError, AppResult};

/// Rate of the synthesized speech payload
pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;

/// Decoded audio, normalized to [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as u64 / u64::from(self.channels.max(1));
        Duration::from_millis(frames * 1000 / u64::from(self.sample_rate.max(1)))
    }
}

/// Decode a base64 payload of 16-bit signed little-endian mono PCM
pub fn decode(payload: &str) -> AppResult<PcmBuffer> {
    let bytes = STANDARD.decode(payload.trim())?;
    from_le_bytes(&bytes)
}

pub fn from_le_bytes(bytes: &[u8]) -> AppResult<PcmBuffer> {
    if bytes.len() < 2 {
        return Err(AppError::Audio("Audio payload is empty".to_string()));
    }
    if bytes.len() % 2 != 0 {
        tracing::debug!(len = bytes.len(), "Dropping trailing odd byte from audio payload");
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();

    Ok(PcmBuffer {
        samples,
        sample_rate: SAMPLE_RATE,
        channels: CHANNELS,
    })
}

/// Interleave a mono buffer for a device running at `rate` with `channels`
/// outputs. Resamples by repeating (or skipping) the nearest source sample
/// and writes the same value to every channel.
#[cfg_attr(not(feature = "playback"), allow(dead_code))]
pub fn to_device_frames(buffer: &PcmBuffer, rate: u32, channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    let source_rate = u64::from(buffer.sample_rate.max(1));
    let source_len = buffer.samples.len() as u64;
    let frames = source_len * u64::from(rate) / source_rate;

    let mut out = Vec::with_capacity(frames as usize * channels);
    for frame in 0..frames {
        let index = (frame * source_rate / u64::from(rate)).min(source_len.saturating_sub(1));
        let sample = buffer.samples[index as usize];
        out.extend(std::iter::repeat(sample).take(channels));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        STANDARD.encode(bytes)
    }

    #[test]
    fn samples_are_normalized() {
        let buffer = decode(&encode(&[0, 16384, i16::MIN, i16::MAX])).unwrap();
        assert_eq!(buffer.sample_rate, 24_000);
        assert_eq!(buffer.channels, 1);
        assert_eq!(buffer.samples[0], 0.0);
        assert_eq!(buffer.samples[1], 0.5);
        assert_eq!(buffer.samples[2], -1.0);
        assert!(buffer.samples[3] < 1.0 && buffer.samples[3] > 0.999);
    }

    #[test]
    fn invalid_payloads_fail() {
        assert!(matches!(decode("not base64!!"), Err(AppError::Parse(_))));
        assert!(matches!(decode(""), Err(AppError::Audio(_))));
    }

    #[test]
    fn odd_trailing_byte_is_ignored() {
        let buffer = from_le_bytes(&[0x00, 0x40, 0x7f]).unwrap();
        assert_eq!(buffer.samples, vec![0.5]);
    }

    #[test]
    fn duration_follows_rate() {
        let buffer = from_le_bytes(&vec![0u8; 48_000]).unwrap();
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn upsampling_repeats_samples_on_every_channel() {
        let buffer = PcmBuffer { samples: vec![0.1, 0.2], sample_rate: 24_000, channels: 1 };
        let frames = to_device_frames(&buffer, 48_000, 2);
        assert_eq!(frames, vec![0.1, 0.1, 0.1, 0.1, 0.2, 0.2, 0.2, 0.2]);
    }

    #[test]
    fn matching_rate_keeps_samples() {
        let buffer = PcmBuffer { samples: vec![0.1, -0.2, 0.3], sample_rate: 24_000, channels: 1 };
        assert_eq!(to_device_frames(&buffer, 24_000, 1), buffer.samples);
    }
}
