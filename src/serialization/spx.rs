//! SPXF spectral container.
//!
//! ```text
//! offset  size  contents
//! 0       4     ASCII magic "SPXF"
//! 4       4     header length H, u32 little-endian
//! 8       H     UTF-8 JSON header
//! 8+H     ...   f32 little-endian body, layout (channels, frames, bins, 2)
//! ```
//!
//! The header carries `version`, `sample_rate`, `n_fft`, `hop_length`, `window`,
//! `original_frames`, `channels`, `frames` and `bins`. The last three are redundant with the
//! body but let a reader size its buffer before touching the body. Keys are written in that
//! order with `", "` and `": "` separators.
//!
//! The `version` key is checked before the rest of the header is interpreted, so a stream
//! from a newer writer reports [`FormatError::UnsupportedVersion`] even if its other keys
//! have changed.
//!
//! Decoding always reads the body to end of input and requires exactly
//! `channels * frames * bins * 2` floats; a short or long body is a truncation error.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array3;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::Formatter;
use tracing::debug;

use super::{read_prefix, read_to_end};
use crate::operations::types::{StftParams, WindowType};
use crate::repr::SpectralFrame;
use crate::{AudioSpectraError, AudioSpectraResult, FormatError};

/// Magic bytes opening every SPXF stream.
pub const MAGIC: &[u8; 4] = b"SPXF";

/// The only format version this crate reads and writes.
pub const FORMAT_VERSION: u32 = 1;

const PREFIX_LEN: usize = 8;
const BYTES_PER_BIN: usize = 8;

/// JSON header block of an SPXF stream.
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpxHeader {
    /// Format version, always [`FORMAT_VERSION`] when written by this crate.
    pub version: u64,
    /// Sample rate of the analysed signal in Hz.
    pub sample_rate: u32,
    /// FFT window length.
    pub n_fft: usize,
    /// Hop between frames.
    pub hop_length: usize,
    /// Window name, e.g. `hann`.
    pub window: String,
    /// Sample count of the analysed signal.
    pub original_frames: usize,
    /// Channel count.
    pub channels: usize,
    /// Spectral frame count.
    pub frames: usize,
    /// Bins per frame, `n_fft / 2 + 1`.
    pub bins: usize,
}

/// JSON formatter writing `", "` between entries and `": "` after keys.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }
}

impl SpxHeader {
    /// Describe `frame`.
    pub fn from_frame(frame: &SpectralFrame) -> Self {
        Self {
            version: u64::from(FORMAT_VERSION),
            sample_rate: frame.sample_rate(),
            n_fft: frame.fft_size(),
            hop_length: frame.hop_length(),
            window: frame.window().name().to_string(),
            original_frames: frame.original_frame_count(),
            channels: frame.channels(),
            frames: frame.frames(),
            bins: frame.bins(),
        }
    }

    /// Serialize to the JSON bytes stored in the stream.
    pub fn to_json(&self) -> AudioSpectraResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedFormatter);
        self.serialize(&mut serializer)
            .map_err(|e| FormatError::invalid_header("header", e.to_string()))?;
        Ok(buffer)
    }

    /// Parse and validate a JSON header block.
    ///
    /// # Errors
    /// [`FormatError::UnsupportedVersion`] as soon as `version` is read and differs from
    /// [`FORMAT_VERSION`]; [`FormatError::InvalidHeader`] for malformed JSON, a missing
    /// `version`, or missing and inconsistent fields.
    pub fn parse(bytes: &[u8]) -> AudioSpectraResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| FormatError::invalid_header("header", e.to_string()))?;
        let version = value.get("version").and_then(Value::as_u64).ok_or_else(|| {
            FormatError::invalid_header("version", "missing or not an unsigned integer")
        })?;
        check_version(version)?;

        let header: Self = serde_json::from_value(value)
            .map_err(|e| FormatError::invalid_header("header", e.to_string()))?;
        header.validate()?;
        Ok(header)
    }

    /// Check the version and the internal consistency of the header.
    pub fn validate(&self) -> AudioSpectraResult<()> {
        check_version(self.version)?;
        if self.sample_rate == 0 {
            return Err(FormatError::invalid_header("sample_rate", "must be positive").into());
        }
        if self.channels == 0 {
            return Err(FormatError::invalid_header("channels", "must be at least 1").into());
        }
        if self.n_fft == 0 || self.n_fft % 2 != 0 {
            return Err(FormatError::invalid_header(
                "n_fft",
                format!("must be positive and even, got {}", self.n_fft),
            )
            .into());
        }
        if self.hop_length == 0 || self.hop_length > self.n_fft {
            return Err(FormatError::invalid_header(
                "hop_length",
                format!("must be in 1..={}, got {}", self.n_fft, self.hop_length),
            )
            .into());
        }
        if self.bins != self.n_fft / 2 + 1 {
            return Err(FormatError::invalid_header(
                "bins",
                format!(
                    "expected {} for n_fft {}, got {}",
                    self.n_fft / 2 + 1,
                    self.n_fft,
                    self.bins
                ),
            )
            .into());
        }
        Ok(())
    }

    /// Body size in bytes implied by the header.
    pub fn body_len(&self) -> AudioSpectraResult<usize> {
        self.channels
            .checked_mul(self.frames)
            .and_then(|n| n.checked_mul(self.bins))
            .and_then(|n| n.checked_mul(BYTES_PER_BIN))
            .ok_or_else(|| {
                FormatError::invalid_header("frames", "declared body size overflows").into()
            })
    }

    fn params(&self) -> AudioSpectraResult<StftParams> {
        let window: WindowType = self.window.parse()?;
        Ok(StftParams::with(self.n_fft, self.hop_length, window))
    }
}

fn check_version(version: u64) -> AudioSpectraResult<()> {
    if version != u64::from(FORMAT_VERSION) {
        return Err(FormatError::UnsupportedVersion {
            expected: FORMAT_VERSION,
            actual: version,
        }
        .into());
    }
    Ok(())
}

/// Write `frame` as an SPXF stream.
///
/// # Errors
/// Fails with an I/O error if the writer fails, or a format error if the header would not
/// fit the 32-bit length prefix.
#[tracing::instrument(
    level = "debug",
    skip(frame, writer),
    fields(channels = frame.channels(), frames = frame.frames(), bins = frame.bins())
)]
pub fn encode<W: Write>(frame: &SpectralFrame, writer: &mut W) -> AudioSpectraResult<()> {
    let header = SpxHeader::from_frame(frame).to_json()?;
    let header_len = u32::try_from(header.len()).map_err(|_| {
        FormatError::invalid_header("header", format!("{} bytes exceeds u32", header.len()))
    })?;

    let mut body = Vec::with_capacity(frame.data().len() * BYTES_PER_BIN);
    for value in frame.data().iter() {
        body.extend_from_slice(&value.re.to_le_bytes());
        body.extend_from_slice(&value.im.to_le_bytes());
    }
    debug!(header_len, body_len = body.len(), "encoded SPXF");

    writer
        .write_all(MAGIC)
        .and_then(|()| writer.write_all(&header_len.to_le_bytes()))
        .and_then(|()| writer.write_all(&header))
        .and_then(|()| writer.write_all(&body))
        .map_err(|e| AudioSpectraError::io("writing SPXF stream", e))
}

/// Encode `frame` into a new byte vector.
pub fn encode_to_vec(frame: &SpectralFrame) -> AudioSpectraResult<Vec<u8>> {
    let mut buffer = Vec::new();
    encode(frame, &mut buffer)?;
    Ok(buffer)
}

/// Read an SPXF stream to end of input.
///
/// # Errors
/// - [`FormatError::Truncated`] if the 8-byte prefix, the header or the body is short, or
///   the body is longer than the header declares
/// - [`FormatError::BadMagic`] if the stream is not SPXF
/// - [`FormatError::UnsupportedVersion`] for any version other than 1
/// - [`FormatError::InvalidHeader`] for malformed JSON or inconsistent fields
#[tracing::instrument(level = "debug", skip(reader))]
pub fn decode<R: Read>(reader: &mut R) -> AudioSpectraResult<SpectralFrame> {
    let prefix = read_prefix::<_, PREFIX_LEN>(reader, "header prefix")?;
    if &prefix[..4] != MAGIC {
        return Err(FormatError::bad_magic(MAGIC, &prefix[..4]).into());
    }
    let header_len = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]) as usize;

    let header_bytes = read_to_end(&mut reader.by_ref().take(header_len as u64), "header")?;
    if header_bytes.len() != header_len {
        return Err(FormatError::truncated("header", header_len, header_bytes.len()).into());
    }
    let header = SpxHeader::parse(&header_bytes)?;
    debug!(
        channels = header.channels,
        frames = header.frames,
        bins = header.bins,
        "decoded SPXF header"
    );

    let expected = header.body_len()?;
    let body = read_to_end(reader, "body")?;
    if body.len() != expected {
        return Err(FormatError::truncated("body", expected, body.len()).into());
    }

    let values: Vec<Complex32> = body
        .chunks_exact(BYTES_PER_BIN)
        .map(|c| {
            Complex32::new(
                f32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                f32::from_le_bytes([c[4], c[5], c[6], c[7]]),
            )
        })
        .collect();
    let data = Array3::from_shape_vec((header.channels, header.frames, header.bins), values)
        .map_err(|e| FormatError::invalid_header("frames", e.to_string()))?;

    SpectralFrame::new(
        data,
        header.sample_rate,
        header.params()?,
        header.original_frames,
    )
}

/// Decode a complete SPXF byte buffer.
pub fn decode_bytes(mut bytes: &[u8]) -> AudioSpectraResult<SpectralFrame> {
    decode(&mut bytes)
}

/// Save `frame` to a `.spx` file.
pub fn save<P: AsRef<Path>>(frame: &SpectralFrame, path: P) -> AudioSpectraResult<()> {
    let file = File::create(path.as_ref())
        .map_err(|e| AudioSpectraError::io("creating SPXF file", e))?;
    let mut writer = BufWriter::new(file);
    encode(frame, &mut writer)?;
    writer
        .flush()
        .map_err(|e| AudioSpectraError::io("flushing SPXF file", e))
}

/// Load a `.spx` file.
pub fn load<P: AsRef<Path>>(path: P) -> AudioSpectraResult<SpectralFrame> {
    let file =
        File::open(path.as_ref()).map_err(|e| AudioSpectraError::io("opening SPXF file", e))?;
    decode(&mut BufReader::new(file))
}

/// Write `frame` to a pipe or other stream and flush it.
pub fn write_pipe<W: Write>(frame: &SpectralFrame, writer: &mut W) -> AudioSpectraResult<()> {
    encode(frame, writer)?;
    writer
        .flush()
        .map_err(|e| AudioSpectraError::io("flushing SPXF pipe", e))
}

/// Read an SPXF stream from a pipe.
pub fn read_pipe<R: Read>(reader: &mut R) -> AudioSpectraResult<SpectralFrame> {
    decode(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParameterError;

    fn sample_frame() -> SpectralFrame {
        let data = Array3::from_shape_fn((2, 3, 5), |(c, f, b)| {
            Complex32::new((c * 100 + f * 10 + b) as f32, -(b as f32) * 0.5)
        });
        SpectralFrame::new(data, 22050, StftParams::with(8, 4, WindowType::Hamming), 9).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let frame = sample_frame();
        let bytes = encode_to_vec(&frame).unwrap();
        let decoded = decode_bytes(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_byte_layout() {
        let frame = sample_frame();
        let bytes = encode_to_vec(&frame).unwrap();

        assert_eq!(&bytes[..4], b"SPXF");
        let header_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let header = std::str::from_utf8(&bytes[8..8 + header_len]).unwrap();
        assert_eq!(
            header,
            "{\"version\": 1, \"sample_rate\": 22050, \"n_fft\": 8, \"hop_length\": 4, \
             \"window\": \"hamming\", \"original_frames\": 9, \"channels\": 2, \
             \"frames\": 3, \"bins\": 5}"
        );

        let body = &bytes[8 + header_len..];
        assert_eq!(body.len(), 2 * 3 * 5 * 8);
        // Element (0, 0, 1): re = 1.0, im = -0.5.
        assert_eq!(f32::from_le_bytes(body[8..12].try_into().unwrap()), 1.0);
        assert_eq!(f32::from_le_bytes(body[12..16].try_into().unwrap()), -0.5);
        // Element (1, 0, 0) starts after one full channel.
        let offset = 3 * 5 * 8;
        assert_eq!(
            f32::from_le_bytes(body[offset..offset + 4].try_into().unwrap()),
            100.0
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode_to_vec(&sample_frame()).unwrap();
        bytes[..4].copy_from_slice(b"RIFF");
        match decode_bytes(&bytes) {
            Err(AudioSpectraError::Format(FormatError::BadMagic { expected, actual })) => {
                assert_eq!(expected, "SPXF");
                assert_eq!(actual, "RIFF");
            }
            other => panic!("expected bad magic, got {other:?}"),
        }
    }

    #[test]
    fn test_short_prefix_is_truncated() {
        match decode_bytes(b"SPX") {
            Err(AudioSpectraError::Format(FormatError::Truncated { section, expected, actual })) => {
                assert_eq!(section, "header prefix");
                assert_eq!(expected, 8);
                assert_eq!(actual, 3);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn test_body_length_must_match_exactly() {
        let bytes = encode_to_vec(&sample_frame()).unwrap();

        let short = &bytes[..bytes.len() - 4];
        assert!(matches!(
            decode_bytes(short),
            Err(AudioSpectraError::Format(FormatError::Truncated { section: "body", .. }))
        ));

        let mut long = bytes.clone();
        long.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            decode_bytes(&long),
            Err(AudioSpectraError::Format(FormatError::Truncated { section: "body", .. }))
        ));
    }

    fn with_header(json: &str) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&(json.len() as u32).to_le_bytes());
        bytes.extend_from_slice(json.as_bytes());
        bytes
    }

    #[test]
    fn test_unsupported_version() {
        let bytes = with_header(
            r#"{"version":2,"sample_rate":8000,"n_fft":8,"hop_length":4,"window":"hann","original_frames":0,"channels":1,"frames":0,"bins":5}"#,
        );
        match decode_bytes(&bytes) {
            Err(AudioSpectraError::Format(FormatError::UnsupportedVersion { expected, actual })) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected unsupported version, got {other:?}"),
        }
    }

    #[test]
    fn test_version_checked_before_other_keys() {
        let bytes = with_header(r#"{"version": 3, "layout": "planar"}"#);
        match decode_bytes(&bytes) {
            Err(AudioSpectraError::Format(FormatError::UnsupportedVersion { actual, .. })) => {
                assert_eq!(actual, 3);
            }
            other => panic!("expected unsupported version, got {other:?}"),
        }

        let bytes = with_header(r#"{"sample_rate": 8000}"#);
        match decode_bytes(&bytes) {
            Err(AudioSpectraError::Format(FormatError::InvalidHeader { field, .. })) => {
                assert_eq!(field, "version");
            }
            other => panic!("expected invalid header, got {other:?}"),
        }
    }

    #[test]
    fn test_compact_headers_still_decode() {
        let frame = sample_frame();
        let encoded = encode_to_vec(&frame).unwrap();
        let header_len = u32::from_le_bytes(encoded[4..8].try_into().unwrap()) as usize;
        let body = &encoded[8 + header_len..];

        let compact = serde_json::to_string(&SpxHeader::from_frame(&frame)).unwrap();
        let mut bytes = with_header(&compact);
        bytes.extend_from_slice(body);
        assert_eq!(decode_bytes(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_inconsistent_bins() {
        let bytes = with_header(
            r#"{"version":1,"sample_rate":8000,"n_fft":8,"hop_length":4,"window":"hann","original_frames":0,"channels":1,"frames":0,"bins":4}"#,
        );
        match decode_bytes(&bytes) {
            Err(AudioSpectraError::Format(FormatError::InvalidHeader { field, .. })) => {
                assert_eq!(field, "bins");
            }
            other => panic!("expected invalid header, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_and_short_header() {
        let bytes = with_header("{not json}");
        assert!(matches!(
            decode_bytes(&bytes),
            Err(AudioSpectraError::Format(FormatError::InvalidHeader { .. }))
        ));

        let mut short = MAGIC.to_vec();
        short.extend_from_slice(&100u32.to_le_bytes());
        short.extend_from_slice(b"{\"version\":1");
        assert!(matches!(
            decode_bytes(&short),
            Err(AudioSpectraError::Format(FormatError::Truncated { section: "header", .. }))
        ));
    }

    #[test]
    fn test_unknown_window_in_header() {
        for name in ["kaiser", "tukey", "flattop", "nuttall"] {
            let bytes = with_header(&format!(
                r#"{{"version": 1, "sample_rate": 8000, "n_fft": 8, "hop_length": 4, "window": "{name}", "original_frames": 0, "channels": 1, "frames": 0, "bins": 5}}"#
            ));
            match decode_bytes(&bytes) {
                Err(AudioSpectraError::Parameter(ParameterError::UnsupportedWindow {
                    name: actual,
                })) => assert_eq!(actual, name),
                other => panic!("expected unsupported window for {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_pipe_flushes_and_reads_back() {
        let frame = sample_frame();
        let mut pipe = Vec::new();
        write_pipe(&frame, &mut pipe).unwrap();
        let decoded = read_pipe(&mut pipe.as_slice()).unwrap();
        assert_eq!(decoded, frame);
    }
}
