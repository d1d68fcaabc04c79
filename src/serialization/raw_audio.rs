//! SPAW raw audio pipe format.
//!
//! A 16-byte header followed by interleaved f32 little-endian samples:
//!
//! | bytes | field |
//! |-------|-------|
//! | 0-3   | magic `SPAW` |
//! | 4-7   | sample rate, u32 LE |
//! | 8-11  | channel count, u32 LE |
//! | 12-15 | frame count, u32 LE; `0` means unknown, read to end of input |
//!
//! When the frame count is known exactly that many frames are read and anything after them
//! is left in the reader. When it is zero the remaining input must hold a whole number of
//! frames.

use std::io::{Read, Write};

use tracing::debug;

use super::{read_prefix, read_to_end};
use crate::repr::AudioData;
use crate::{AudioSpectraError, AudioSpectraResult, FormatError};

/// Magic bytes opening every SPAW stream.
pub const MAGIC: &[u8; 4] = b"SPAW";

/// Size of the fixed header.
pub const HEADER_LEN: usize = 16;

const BYTES_PER_SAMPLE: usize = 4;

/// Write `audio` as a SPAW stream with its exact frame count.
///
/// # Errors
/// Returns a format error if the channel or frame count does not fit in a u32, or an I/O
/// error if the writer fails.
pub fn encode<W: Write>(audio: &AudioData, writer: &mut W) -> AudioSpectraResult<()> {
    let channels = u32::try_from(audio.channels())
        .map_err(|_| FormatError::invalid_header("channels", "exceeds u32"))?;
    let frames = u32::try_from(audio.frames())
        .map_err(|_| FormatError::invalid_header("frames", "exceeds u32"))?;

    let body_len = audio.frames() * audio.channels() * BYTES_PER_SAMPLE;
    let mut buffer = Vec::with_capacity(HEADER_LEN + body_len);
    buffer.extend_from_slice(MAGIC);
    buffer.extend_from_slice(&audio.sample_rate().to_le_bytes());
    buffer.extend_from_slice(&channels.to_le_bytes());
    buffer.extend_from_slice(&frames.to_le_bytes());
    for sample in audio.samples().iter() {
        buffer.extend_from_slice(&sample.to_le_bytes());
    }

    writer
        .write_all(&buffer)
        .map_err(|e| AudioSpectraError::io("writing SPAW stream", e))
}

/// Encode `audio` into a new byte vector.
pub fn encode_to_vec(audio: &AudioData) -> AudioSpectraResult<Vec<u8>> {
    let mut buffer = Vec::new();
    encode(audio, &mut buffer)?;
    Ok(buffer)
}

/// Read a SPAW stream.
///
/// # Errors
/// - [`FormatError::Truncated`] if the header is short, the body holds fewer frames than
///   declared, or a streaming body ends part way through a frame
/// - [`FormatError::BadMagic`] if the stream is not SPAW
/// - [`FormatError::InvalidHeader`] for a zero sample rate or channel count
pub fn decode<R: Read>(reader: &mut R) -> AudioSpectraResult<AudioData> {
    let header = read_prefix::<_, HEADER_LEN>(reader, "header")?;
    if &header[..4] != MAGIC {
        return Err(FormatError::bad_magic(MAGIC, &header[..4]).into());
    }
    let field =
        |i: usize| u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]);
    let sample_rate = field(4);
    let channels = field(8) as usize;
    let frames = field(12) as usize;

    if sample_rate == 0 {
        return Err(FormatError::invalid_header("sample_rate", "must be positive").into());
    }
    if channels == 0 {
        return Err(FormatError::invalid_header("channels", "must be at least 1").into());
    }
    let frame_bytes = channels * BYTES_PER_SAMPLE;

    let body = if frames == 0 {
        let body = read_to_end(reader, "body")?;
        if body.len() % frame_bytes != 0 {
            let whole = body.len() / frame_bytes;
            return Err(
                FormatError::truncated("body", (whole + 1) * frame_bytes, body.len()).into(),
            );
        }
        body
    } else {
        let expected = frames * frame_bytes;
        let body = read_to_end(&mut reader.by_ref().take(expected as u64), "body")?;
        if body.len() != expected {
            return Err(FormatError::truncated("body", expected, body.len()).into());
        }
        body
    };
    debug!(sample_rate, channels, frames = body.len() / frame_bytes, "decoded SPAW");

    let samples = body
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    AudioData::from_interleaved(samples, channels, sample_rate)
}

/// Decode a SPAW byte buffer.
pub fn decode_bytes(mut bytes: &[u8]) -> AudioSpectraResult<AudioData> {
    decode(&mut bytes)
}

/// Write `audio` to a pipe or other stream and flush it.
pub fn write_pipe<W: Write>(audio: &AudioData, writer: &mut W) -> AudioSpectraResult<()> {
    encode(audio, writer)?;
    writer
        .flush()
        .map_err(|e| AudioSpectraError::io("flushing SPAW pipe", e))
}

/// Read a SPAW stream from a pipe.
pub fn read_pipe<R: Read>(reader: &mut R) -> AudioSpectraResult<AudioData> {
    decode(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn stereo() -> AudioData {
        AudioData::new(array![[0.5, -0.5], [0.25, -0.25], [1.0, -1.0]], 48000).unwrap()
    }

    #[test]
    fn test_round_trip_and_layout() {
        let audio = stereo();
        let bytes = encode_to_vec(&audio).unwrap();

        assert_eq!(bytes.len(), HEADER_LEN + 3 * 2 * 4);
        assert_eq!(&bytes[..4], b"SPAW");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 48000);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 3);
        // Interleaved: L0 R0 L1 ...
        assert_eq!(f32::from_le_bytes(bytes[20..24].try_into().unwrap()), -0.5);
        assert_eq!(f32::from_le_bytes(bytes[24..28].try_into().unwrap()), 0.25);

        assert_eq!(decode_bytes(&bytes).unwrap(), audio);
    }

    #[test]
    fn test_streaming_frame_count() {
        let mut bytes = encode_to_vec(&stereo()).unwrap();
        bytes[12..16].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(decode_bytes(&bytes).unwrap(), stereo());

        // Half a frame left over.
        bytes.extend_from_slice(&0.0f32.to_le_bytes());
        assert!(matches!(
            decode_bytes(&bytes),
            Err(AudioSpectraError::Format(FormatError::Truncated { section: "body", .. }))
        ));
    }

    #[test]
    fn test_known_length_leaves_trailing_input() {
        let mut bytes = encode_to_vec(&stereo()).unwrap();
        bytes.extend_from_slice(b"next");
        let mut reader = bytes.as_slice();
        assert_eq!(decode(&mut reader).unwrap(), stereo());
        assert_eq!(reader, b"next");
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(
            decode_bytes(&[0u8; 4]),
            Err(AudioSpectraError::Format(FormatError::Truncated {
                section: "header",
                expected: 16,
                actual: 4
            }))
        ));

        let mut bad = [0u8; 16];
        bad[..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            decode_bytes(&bad),
            Err(AudioSpectraError::Format(FormatError::BadMagic { .. }))
        ));

        let mut no_channels = encode_to_vec(&stereo()).unwrap();
        no_channels[8..12].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            decode_bytes(&no_channels),
            Err(AudioSpectraError::Format(FormatError::InvalidHeader { .. }))
        ));
    }

    #[test]
    fn test_short_body() {
        let bytes = encode_to_vec(&stereo()).unwrap();
        match decode_bytes(&bytes[..bytes.len() - 8]) {
            Err(AudioSpectraError::Format(FormatError::Truncated { expected, actual, .. })) => {
                assert_eq!(expected, 24);
                assert_eq!(actual, 16);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }
}
