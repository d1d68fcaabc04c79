//! Core trait definitions for spectral and time-domain operations.
//!
//! Each trait groups one family of operations and is implemented in its own module:
//!
//! - [`SpectralProcessing`] (in `processing`) - per-bin amplitude operators
//! - [`SpectralResampling`] (in `resample`) - frequency and frame-axis resampling
//! - [`SpectralEditing`] (in `editing`) - frame-axis editing
//! - [`SpectralDecomposition`] (in `decomposition`) - harmonic separation
//! - [`SpectralAnalysis`] (in `pitch_analysis`) - per-frame measurements
//! - [`AudioProcessing`] (in `time_domain`) - the time-domain counterparts used by
//!   [`Sound`](crate::Sound) when only samples are materialised
//!
//! Every method borrows its receiver and returns a new value; nothing is mutated in place.

use super::decomposition::Decomposition;
use super::types::{
    DecomposeConfig, FilterKind, LevelReading, NormalizationMode, PitchEstimate,
};
use crate::AudioSpectraResult;

/// Amplitude operators acting independently on every `(channel, frame, bin)` value.
///
/// All operators preserve the frame's metadata and shape.
pub trait SpectralProcessing: Sized {
    /// Multiplies every complex value by a real scalar. No clipping is applied.
    fn gain(&self, factor: f32) -> Self;

    /// Zeroes every value whose magnitude is strictly below `10^(threshold_db / 20)`.
    fn gate(&self, threshold_db: f64) -> Self;

    /// Spectral subtraction using a noise profile measured over `noise_start..noise_end` frames.
    ///
    /// The profile is the mean magnitude per bin over the frame range and all channels. The
    /// range is clamped to the frame axis and widened to at least one frame. Each value's
    /// magnitude becomes `max(0, |v| - oversubtract * profile[bin])` with its phase kept.
    fn denoise(&self, noise_start: usize, noise_end: usize, oversubtract: f64) -> Self;

    /// Brick-wall filter: zeroes every bin outside the pass region of `kind`.
    ///
    /// # Errors
    /// Band filters require `freq_hi`; omitting it is a [`ParameterError`](crate::ParameterError).
    fn filter(&self, kind: FilterKind, freq: f64, freq_hi: Option<f64>) -> AudioSpectraResult<Self>;

    /// Scales the frame so the resynthesised signal's peak or RMS level is `target_db` dBFS.
    ///
    /// The level is measured on the inverse transform. Silence is returned unchanged.
    fn normalize(&self, target_db: f64, mode: NormalizationMode) -> Self;
}

/// Linear-interpolation resampling of the frequency and frame axes.
pub trait SpectralResampling: Sized {
    /// Naive pitch shift by resampling the bin axis by `2^(semitones / 12)`.
    ///
    /// Output bin `b` reads source position `b / factor`; positions past the last bin are zero.
    fn transpose(&self, semitones: f64) -> Self;

    /// Time stretch by resampling the frame axis to `round(frames * factor)` frames.
    ///
    /// # Errors
    /// `factor` must be finite and strictly positive.
    fn stretch(&self, factor: f64) -> AudioSpectraResult<Self>;

    /// Cross-fades from `self` to `other` with an alpha ramp from `blend_start` to `blend_end`.
    ///
    /// `other` is resampled to `self`'s frame count first.
    ///
    /// # Errors
    /// Returns a [`CompatibilityError`](crate::CompatibilityError) if the frames differ in
    /// `fft_size`, `hop_length`, channel count or sample rate.
    fn morph(&self, other: &Self, blend_start: f64, blend_end: f64) -> AudioSpectraResult<Self>;
}

/// Editing along the frame axis.
pub trait SpectralEditing: Sized {
    /// Applies a linear fade-in over the first `fade_in_frames` frames and a fade-out over the
    /// last `fade_out_frames` frames.
    fn fade(&self, fade_in_frames: usize, fade_out_frames: usize) -> Self;

    /// Keeps frames `start..end` (clamped). `None` keeps everything from `start`.
    fn trim_frames(&self, start: usize, end: Option<usize>) -> Self;

    /// Keeps the time range `start..end` in seconds, clamped to the sound's duration. The new
    /// `original_frame_count` is the range length in samples, not a whole number of hops.
    fn trim_seconds(&self, start: f64, end: Option<f64>) -> Self;

    /// Reverses the frame order.
    fn reverse(&self) -> Self;

    /// Repeats the frame `times` times end to end.
    ///
    /// # Errors
    /// `times` must be at least 1.
    fn repeat(&self, times: usize) -> AudioSpectraResult<Self>;

    /// Concatenates frames along the frame axis.
    ///
    /// # Errors
    /// Fails on an empty slice or on inputs whose metadata disagree with the first.
    fn concat(frames: &[Self]) -> AudioSpectraResult<Self>;
}

/// Harmonic decomposition into disjoint per-note bin masks.
pub trait SpectralDecomposition {
    /// Splits the frame into one component per detected fundamental plus an optional remainder.
    ///
    /// Finding no fundamentals is not an error; the result is simply empty.
    fn decompose(&self, config: &DecomposeConfig) -> AudioSpectraResult<Decomposition>;
}

/// Frame-by-frame measurements.
pub trait SpectralAnalysis {
    /// Dominant frequency of each frame within `[fmin, fmax]`.
    ///
    /// # Errors
    /// Fails if the range is empty, negative or not finite.
    fn pitch_track(&self, fmin: f64, fmax: f64) -> AudioSpectraResult<Vec<PitchEstimate>>;
}

/// Time-domain operators on [`AudioData`](crate::AudioData).
///
/// Lengths are in samples. Outputs that can exceed full scale are clipped to `[-1.0, 1.0]`.
pub trait AudioProcessing: Sized {
    /// Multiplies every sample by `factor` and clips.
    fn gain(&self, factor: f32) -> Self;

    /// Linear fade-in over the first `fade_in` samples and fade-out over the last `fade_out`.
    fn fade(&self, fade_in: usize, fade_out: usize) -> Self;

    /// Keeps samples `start..end` (clamped). `None` keeps everything from `start`.
    fn trim(&self, start: usize, end: Option<usize>) -> Self;

    /// Repeats the signal `times` times.
    ///
    /// # Errors
    /// `times` must be at least 1.
    fn repeat(&self, times: usize) -> AudioSpectraResult<Self>;

    /// Reverses the sample order.
    fn reverse(&self) -> Self;

    /// Adds `before` and `after` samples of silence.
    fn pad(&self, before: usize, after: usize) -> Self;

    /// Scales to a peak or RMS level of `target_db` dBFS, then clips. Silence is unchanged.
    fn normalize(&self, target_db: f64, mode: NormalizationMode) -> Self;

    /// Butterworth IIR filter of any positive `order`, applied per channel and clipped.
    /// Band filters have `2 * order` poles.
    ///
    /// # Errors
    /// Fails for a missing `freq_hi` on band filters, a zero order, or cutoffs outside
    /// `(0, nyquist)`.
    fn filter(
        &self,
        kind: FilterKind,
        freq: f64,
        freq_hi: Option<f64>,
        order: usize,
    ) -> AudioSpectraResult<Self>;

    /// Sliding-window RMS and peak levels of the mono mix.
    ///
    /// # Errors
    /// Window and hop must be positive.
    fn level_track(
        &self,
        window_seconds: f64,
        hop_seconds: f64,
    ) -> AudioSpectraResult<Vec<LevelReading>>;
}
