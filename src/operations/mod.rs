//! Spectral and time-domain operations.
//!
//! Operations are grouped into focused traits implemented on [`SpectralFrame`] and
//! [`AudioData`]. Every operation borrows its input and returns a new value.
//!
//! ## Module Organization
//!
//! - [`traits`] - Operation trait definitions
//! - [`types`] - Parameter types and result records
//! - [`transforms`] - Forward and inverse STFT
//! - [`processing`] - Gain, gate, denoise, brick-wall filter and normalize
//! - [`resample`] - Frequency-axis and frame-axis interpolation: transpose, stretch, morph
//! - [`editing`] - Fades, trims, reversal, looping and concatenation along the frame axis
//! - [`peak_picking`] - Local maxima with topographic prominence
//! - [`decomposition`] - Harmonic decomposition into disjoint components and `join`
//! - [`pitch_analysis`] - Per-frame dominant pitch
//! - [`time_domain`] - Operations on [`AudioData`] samples
//!
//! ## Quick Start
//!
//! ```rust
//! use audio_spectra::operations::*;
//! use audio_spectra::operations::transforms::{forward, inverse};
//! use audio_spectra::utils::generation::sine_wave;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let audio = sine_wave(440.0, 1.0, 16000, 0.5)?;
//! let frame = forward(&audio, &StftParams::new())?;
//!
//! let processed = frame
//!     .gate(-60.0)
//!     .filter(FilterKind::Lowpass, 4000.0, None)?
//!     .transpose(-12.0);
//!
//! let audio_out = inverse(&processed);
//! assert_eq!(audio_out.frames(), audio.frames());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! [`SpectralFrame`]: crate::SpectralFrame
//! [`AudioData`]: crate::AudioData

pub mod traits;
pub mod types;

pub mod decomposition;
pub mod editing;
pub mod peak_picking;
pub mod pitch_analysis;
pub mod processing;
pub mod resample;
pub mod time_domain;
pub mod transforms;

pub use traits::{
    AudioProcessing, SpectralAnalysis, SpectralDecomposition, SpectralEditing,
    SpectralProcessing, SpectralResampling,
};

pub use types::{
    DecomposeConfig, FilterKind, HarmonicMode, LevelReading, NormalizationMode, PitchEstimate,
    StftParams, WindowType,
};

pub use decomposition::{BinMask, Component, Decomposition, join};
