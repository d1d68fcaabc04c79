// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::vec_box)] // Avoids using `Vec<Box<T>>` when unnecessary
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![cfg_attr(not(test), warn(clippy::unwrap_used))] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions
#![warn(clippy::missing_const_for_fn)] // Suggests making eligible functions `const`
#![deny(missing_docs)] // Documentation is a must for release

//! # AudioSpectra
//!
//! Frequency-domain audio processing for Rust: a complex STFT tensor type, a compact binary
//! container for it, a family of spectral operators and a harmonic decomposition that
//! splits a polyphonic spectrum into one component per note.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! audio_spectra = "0.1.0"
//! ```
//!
//! Per-channel transforms can run on a rayon pool:
//!
//! ```toml
//! [dependencies]
//! audio_spectra = { version = "0.1.0", features = ["parallel-processing"] }
//! ```
//!
//! ## Data Model
//!
//! - [`AudioData`] - time-domain samples, shape `(frames, channels)`, plus a sample rate
//! - [`SpectralFrame`] - complex STFT values, shape `(channels, frames, bins)`, plus the
//!   sample rate, FFT size, hop, window and the length of the analysed signal
//! - [`Sound`] - holds either of the above and computes the other on demand
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`AudioSpectraResult`]. The error is split by cause:
//!
//! ```rust
//! use audio_spectra::{AudioSpectraError, AudioSpectraResult, ParameterError};
//!
//! let result: AudioSpectraResult<()> = Err(AudioSpectraError::Parameter(
//!     ParameterError::invalid_value("factor", "must be positive"),
//! ));
//!
//! match result {
//!     Ok(()) => {}
//!     Err(AudioSpectraError::Format(err)) => eprintln!("Bad stream: {err}"),
//!     Err(AudioSpectraError::Parameter(err)) => eprintln!("Invalid parameter: {err}"),
//!     Err(AudioSpectraError::Compatibility(err)) => eprintln!("Cannot combine: {err}"),
//!     Err(other) => eprintln!("Other error: {other}"),
//! }
//! ```
//!
//! ## Quick Start
//!
//! ### Round trip through the spectral domain
//!
//! ```rust
//! use audio_spectra::{StftParams, WindowType};
//! use audio_spectra::operations::transforms::{forward, inverse};
//! use audio_spectra::utils::generation::sine_wave;
//!
//! let audio = sine_wave(440.0, 0.5, 16000, 0.5).unwrap();
//! let frame = forward(&audio, &StftParams::with(2048, 512, WindowType::Hann)).unwrap();
//! let restored = inverse(&frame);
//!
//! assert_eq!(restored.frames(), audio.frames());
//! ```
//!
//! ### Spectral operators
//!
//! ```rust
//! use audio_spectra::{SpectralProcessing, SpectralResampling, StftParams};
//! use audio_spectra::operations::transforms::forward;
//! use audio_spectra::utils::generation::sine_wave;
//!
//! let audio = sine_wave(440.0, 0.5, 16000, 0.5).unwrap();
//! let frame = forward(&audio, &StftParams::new()).unwrap();
//!
//! let octave_up = frame.transpose(12.0);
//! let slower = frame.stretch(2.0).unwrap();
//! let quiet = frame.gain(0.25).gate(-80.0);
//!
//! assert_eq!(slower.frames(), (frame.frames() as f64 * 2.0).round() as usize);
//! assert_eq!(octave_up.frames(), quiet.frames());
//! ```
//!
//! ### Harmonic decomposition
//!
//! ```rust
//! use audio_spectra::{DecomposeConfig, SpectralDecomposition, StftParams, join};
//! use audio_spectra::operations::transforms::forward;
//! use audio_spectra::utils::generation::compound_tone;
//!
//! let chord = compound_tone(&[(250.0, 0.3), (437.5, 0.3)], 1.0, 16000).unwrap();
//! let frame = forward(&chord, &StftParams::new()).unwrap();
//!
//! let parts = frame.decompose(&DecomposeConfig::new()).unwrap();
//! let rebuilt = join(&parts.into_frames(), true).unwrap();
//! assert_eq!(rebuilt.data(), frame.data());
//! ```
//!
//! ### SPXF files and pipes
//!
//! ```rust
//! use audio_spectra::serialization::spx;
//! use audio_spectra::{StftParams, operations::transforms::forward};
//! use audio_spectra::utils::generation::sine_wave;
//!
//! let frame = forward(&sine_wave(220.0, 0.2, 8000, 0.5).unwrap(), &StftParams::new()).unwrap();
//! let bytes = spx::encode_to_vec(&frame).unwrap();
//! assert_eq!(&bytes[..4], b"SPXF");
//! assert_eq!(spx::decode_bytes(&bytes).unwrap(), frame);
//! ```

mod error;
mod repr;

pub mod operations;
pub mod serialization;
pub mod sound;
pub mod utils;

pub use crate::error::{
    AudioSpectraError, AudioSpectraResult, CompatibilityError, FormatError, ParameterError,
};
pub use crate::operations::{
    AudioProcessing, BinMask, Component, DecomposeConfig, Decomposition, FilterKind,
    HarmonicMode, LevelReading, NormalizationMode, PitchEstimate, SpectralAnalysis,
    SpectralDecomposition, SpectralEditing, SpectralProcessing, SpectralResampling, StftParams,
    WindowType, join,
};
pub use crate::repr::{AudioData, SpectralFrame};
pub use crate::serialization::{Payload, WireFormat};
pub use crate::sound::Sound;
