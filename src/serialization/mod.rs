//! Wire formats for spectral frames and raw audio.
//!
//! Two binary containers are supported:
//!
//! - [`spx`] - the SPXF spectral container (JSON header + complex f32 body)
//! - [`raw_audio`] - the SPAW raw audio pipe format (16-byte header + interleaved f32 body)
//!
//! Which container a stream holds is decided once, at the I/O boundary, by
//! [`WireFormat::from_magic`] or [`WireFormat::from_path`]. [`read_payload`] returns a
//! typed [`Payload`] so downstream code never has to sniff bytes again.
//!
//! # Examples
//!
//! ```rust
//! use audio_spectra::serialization::{read_payload, spx, Payload};
//! use audio_spectra::{StftParams, operations::transforms::forward};
//! use audio_spectra::utils::generation::sine_wave;
//!
//! let audio = sine_wave(440.0, 0.1, 8000, 0.5).unwrap();
//! let frame = forward(&audio, &StftParams::with(256, 64, Default::default())).unwrap();
//! let bytes = spx::encode_to_vec(&frame).unwrap();
//!
//! match read_payload(&mut bytes.as_slice()).unwrap() {
//!     Payload::Spectral(decoded) => assert_eq!(decoded, frame),
//!     Payload::Audio(_) => unreachable!(),
//! }
//! ```

pub mod raw_audio;
pub mod spx;

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use crate::repr::{AudioData, SpectralFrame};
use crate::{AudioSpectraError, AudioSpectraResult, FormatError};

/// Container format of an encoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// SPXF spectral frame.
    Spectral,
    /// SPAW raw interleaved audio.
    Audio,
}

impl WireFormat {
    /// The four magic bytes that open a stream of this format.
    pub const fn magic(&self) -> &'static [u8; 4] {
        match self {
            WireFormat::Spectral => spx::MAGIC,
            WireFormat::Audio => raw_audio::MAGIC,
        }
    }

    /// Resolve the format from the first four bytes of a stream.
    ///
    /// # Errors
    /// Returns [`FormatError::BadMagic`] if the bytes match neither container.
    pub fn from_magic(magic: &[u8]) -> AudioSpectraResult<Self> {
        if magic == spx::MAGIC {
            Ok(WireFormat::Spectral)
        } else if magic == raw_audio::MAGIC {
            Ok(WireFormat::Audio)
        } else {
            Err(FormatError::bad_magic(b"SPXF or SPAW", magic).into())
        }
    }

    /// Resolve the format from a file path.
    ///
    /// `.spx` files are spectral and every other path holds audio. Returns `None` for `-`,
    /// the conventional name for standard input/output, whose format must be read from the
    /// stream itself.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        if path.as_os_str() == "-" {
            return None;
        }
        let is_spx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("spx"));
        Some(if is_spx {
            WireFormat::Spectral
        } else {
            WireFormat::Audio
        })
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Spectral => f.write_str("spectral"),
            WireFormat::Audio => f.write_str("audio"),
        }
    }
}

/// A decoded stream, tagged with the domain it was stored in.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Time-domain samples from a SPAW stream.
    Audio(AudioData),
    /// STFT tensor from an SPXF stream.
    Spectral(SpectralFrame),
}

impl Payload {
    /// The wire format this payload is written in.
    pub const fn format(&self) -> WireFormat {
        match self {
            Payload::Audio(_) => WireFormat::Audio,
            Payload::Spectral(_) => WireFormat::Spectral,
        }
    }

    /// Encode this payload in its own wire format and flush the writer.
    pub fn write_pipe<W: Write>(&self, writer: &mut W) -> AudioSpectraResult<()> {
        match self {
            Payload::Audio(audio) => raw_audio::write_pipe(audio, writer),
            Payload::Spectral(frame) => spx::write_pipe(frame, writer),
        }
    }
}

impl From<AudioData> for Payload {
    fn from(audio: AudioData) -> Self {
        Payload::Audio(audio)
    }
}

impl From<SpectralFrame> for Payload {
    fn from(frame: SpectralFrame) -> Self {
        Payload::Spectral(frame)
    }
}

/// Read one stream whose format is not known in advance.
///
/// The first four bytes select the decoder; they are chained back in front of the reader
/// so each decoder sees the complete stream.
pub fn read_payload<R: Read>(reader: &mut R) -> AudioSpectraResult<Payload> {
    let magic = read_prefix::<_, 4>(reader, "magic")?;
    let format = WireFormat::from_magic(&magic)?;
    tracing::debug!(%format, "resolved wire format");
    read_payload_as(format, &mut Cursor::new(magic).chain(reader))
}

/// Decode a stream already known to be in `format`.
pub fn read_payload_as<R: Read>(
    format: WireFormat,
    reader: &mut R,
) -> AudioSpectraResult<Payload> {
    match format {
        WireFormat::Spectral => spx::decode(reader).map(Payload::Spectral),
        WireFormat::Audio => raw_audio::decode(reader).map(Payload::Audio),
    }
}

/// Fill a fixed-size prefix, reporting a truncation if input ends first.
pub(crate) fn read_prefix<R: Read + ?Sized, const N: usize>(
    reader: &mut R,
    section: &'static str,
) -> AudioSpectraResult<[u8; N]> {
    let mut buffer = [0u8; N];
    let mut filled = 0;
    while filled < N {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => return Err(FormatError::truncated(section, N, filled).into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(AudioSpectraError::io("reading stream prefix", e)),
        }
    }
    Ok(buffer)
}

/// Read everything that remains in `reader`.
pub(crate) fn read_to_end<R: Read + ?Sized>(
    reader: &mut R,
    section: &'static str,
) -> AudioSpectraResult<Vec<u8>> {
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .map_err(|e| AudioSpectraError::io(section, e))?;
    Ok(buffer)
}
