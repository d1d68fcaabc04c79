//! Core spectral and time-domain data representations.
//!
//! This module provides the two value types every operation works with:
//!
//! - [`SpectralFrame`] - a complex STFT tensor of shape `(channels, frames, bins)`
//!   paired with the framing metadata needed to invert it
//! - [`AudioData`] - a time-domain sample matrix of shape `(frames, channels)` with its
//!   sample rate
//!
//! Both types are immutable values: every operation borrows its input and returns a freshly
//! owned output, so there is no shared mutable state anywhere in the crate.
//!
//! # Memory Layout
//!
//! The spectral tensor stores `Complex<f32>` values (real, imaginary pairs of 32-bit floats)
//! in row-major order, which is exactly the body layout of the SPXF wire format. A tensor
//! occupies `channels * frames * bins * 8` bytes.
//!
//! # Examples
//!
//! ```rust
//! use audio_spectra::{AudioData, StftParams, operations::transforms::forward};
//! use ndarray::Array2;
//!
//! let audio = AudioData::new(Array2::zeros((4096, 2)), 44100).unwrap();
//! let frame = forward(&audio, &StftParams::new()).unwrap();
//!
//! assert_eq!(frame.channels(), 2);
//! assert_eq!(frame.bins(), 1025);
//! assert_eq!(frame.original_frame_count(), 4096);
//! ```

use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use num_complex::Complex32;

use crate::operations::types::{StftParams, WindowType};
use crate::{AudioSpectraResult, CompatibilityError, ParameterError};

/// Metadata fields compared when frames are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameField {
    SampleRate,
    FftSize,
    HopLength,
    Window,
    Channels,
    Frames,
}

impl FrameField {
    const fn name(self) -> &'static str {
        match self {
            FrameField::SampleRate => "sample_rate",
            FrameField::FftSize => "fft_size",
            FrameField::HopLength => "hop_length",
            FrameField::Window => "window",
            FrameField::Channels => "channels",
            FrameField::Frames => "frames",
        }
    }

    fn read(self, frame: &SpectralFrame) -> String {
        match self {
            FrameField::SampleRate => frame.sample_rate.to_string(),
            FrameField::FftSize => frame.fft_size.to_string(),
            FrameField::HopLength => frame.hop_length.to_string(),
            FrameField::Window => frame.window.to_string(),
            FrameField::Channels => frame.channels().to_string(),
            FrameField::Frames => frame.frames().to_string(),
        }
    }
}

/// A complex time-frequency tensor and its STFT metadata.
///
/// Invariants upheld by every constructor:
/// - `bins == fft_size / 2 + 1`
/// - `channels >= 1`
/// - `fft_size` is positive and even, `1 <= hop_length <= fft_size`
/// - `sample_rate > 0`
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    data: Array3<Complex32>,
    sample_rate: u32,
    fft_size: usize,
    hop_length: usize,
    window: WindowType,
    original_frame_count: usize,
}

impl SpectralFrame {
    /// Create a new spectral frame, validating the tensor shape against the metadata.
    ///
    /// # Errors
    /// Returns a [`ParameterError`] if the sample rate is zero, the STFT parameters are
    /// invalid, the tensor has no channels, or the bin axis does not match `fft_size / 2 + 1`.
    pub fn new(
        data: Array3<Complex32>,
        sample_rate: u32,
        params: StftParams,
        original_frame_count: usize,
    ) -> AudioSpectraResult<Self> {
        params.validate()?;
        if sample_rate == 0 {
            return Err(ParameterError::invalid_value("sample_rate", "must be positive").into());
        }
        let (channels, _, bins) = data.dim();
        if channels == 0 {
            return Err(ParameterError::invalid_value("channels", "must be at least 1").into());
        }
        if bins != params.bins() {
            return Err(ParameterError::invalid_value(
                "bins",
                format!(
                    "expected {} bins for fft_size {}, got {}",
                    params.bins(),
                    params.fft_size,
                    bins
                ),
            )
            .into());
        }
        Ok(Self {
            data,
            sample_rate,
            fft_size: params.fft_size,
            hop_length: params.hop_length,
            window: params.window,
            original_frame_count,
        })
    }

    /// Build a frame that shares this frame's metadata but carries a different tensor.
    ///
    /// The caller guarantees the bin and channel axes are unchanged.
    pub(crate) fn with_data(&self, data: Array3<Complex32>) -> Self {
        debug_assert_eq!(data.dim().0, self.channels());
        debug_assert_eq!(data.dim().2, self.bins());
        Self {
            data,
            sample_rate: self.sample_rate,
            fft_size: self.fft_size,
            hop_length: self.hop_length,
            window: self.window,
            original_frame_count: self.original_frame_count,
        }
    }

    /// Same as [`with_data`](Self::with_data) with a new `original_frame_count`.
    pub(crate) fn with_data_and_length(
        &self,
        data: Array3<Complex32>,
        original_frame_count: usize,
    ) -> Self {
        let mut frame = self.with_data(data);
        frame.original_frame_count = original_frame_count;
        frame
    }

    /// Compare `fields` of `other` (input number `index`) against this frame, in order.
    ///
    /// Returns the first mismatch.
    pub(crate) fn check_compatible(
        &self,
        other: &Self,
        index: usize,
        fields: &[FrameField],
    ) -> Result<(), CompatibilityError> {
        for &field in fields {
            let expected = field.read(self);
            let actual = field.read(other);
            if expected != actual {
                return Err(CompatibilityError::new(index, field.name(), expected, actual));
            }
        }
        Ok(())
    }

    /// Read-only view of the tensor, shape `(channels, frames, bins)`.
    pub const fn data(&self) -> &Array3<Complex32> {
        &self.data
    }

    /// Consume the frame, returning the tensor.
    pub fn into_data(self) -> Array3<Complex32> {
        self.data
    }

    /// Sample rate of the represented signal in Hz.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Window length in samples.
    pub const fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Advance between frames in samples.
    pub const fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Analysis/synthesis window.
    pub const fn window(&self) -> WindowType {
        self.window
    }

    /// The STFT parameters this frame was produced with.
    pub const fn params(&self) -> StftParams {
        StftParams::with(self.fft_size, self.hop_length, self.window)
    }

    /// Length in samples of the time-domain signal this frame represents.
    pub const fn original_frame_count(&self) -> usize {
        self.original_frame_count
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.data.dim().0
    }

    /// Number of STFT time frames.
    pub fn frames(&self) -> usize {
        self.data.dim().1
    }

    /// Number of frequency bins, always `fft_size / 2 + 1`.
    pub fn bins(&self) -> usize {
        self.data.dim().2
    }

    /// Duration of the represented signal in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.original_frame_count as f64 / self.sample_rate as f64
    }

    /// Centre frequency in Hz of every bin (`k * sample_rate / fft_size`).
    pub fn bin_frequencies(&self) -> Vec<f64> {
        crate::utils::audio_math::fft_frequencies(self.fft_size, self.sample_rate as f64)
    }

    /// Convert a time in seconds to the nearest frame index (not clamped). Halves round to even.
    pub fn seconds_to_frame(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.sample_rate as f64 / self.hop_length as f64).round_ties_even()
            as usize
    }

    /// Magnitude of every value, shape `(channels, frames, bins)`.
    pub fn magnitudes(&self) -> Array3<f32> {
        self.data.mapv(|c| c.norm())
    }

    /// Mean magnitude over all channels and frames, one value per bin.
    pub fn mean_magnitude_profile(&self) -> Array1<f64> {
        let (channels, frames, bins) = self.data.dim();
        let count = (channels * frames).max(1) as f64;
        let mut profile = Array1::<f64>::zeros(bins);
        for lane in self.data.lanes(Axis(2)) {
            for (acc, value) in profile.iter_mut().zip(lane.iter()) {
                *acc += value.norm() as f64;
            }
        }
        profile.mapv_inplace(|sum| sum / count);
        profile
    }

    /// Mean magnitude over the whole tensor.
    pub fn mean_magnitude(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|c| c.norm() as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Mean magnitude of a single time frame across channels and bins.
    ///
    /// # Panics
    /// Panics if `frame >= self.frames()`.
    pub fn frame_mean_magnitude(&self, frame: usize) -> f64 {
        let slice = self.data.index_axis(Axis(1), frame);
        if slice.is_empty() {
            return 0.0;
        }
        slice.iter().map(|c| c.norm() as f64).sum::<f64>() / slice.len() as f64
    }
}

/// A time-domain sample matrix, shape `(frames, channels)`, plus its sample rate.
///
/// Samples are nominally in `[-1.0, 1.0]`; values are not clamped on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    samples: Array2<f32>,
    sample_rate: u32,
}

impl AudioData {
    /// Create audio from a `(frames, channels)` matrix.
    ///
    /// # Errors
    /// Returns a [`ParameterError`] if the sample rate is zero or there are no channels.
    pub fn new(samples: Array2<f32>, sample_rate: u32) -> AudioSpectraResult<Self> {
        if sample_rate == 0 {
            return Err(ParameterError::invalid_value("sample_rate", "must be positive").into());
        }
        if samples.ncols() == 0 {
            return Err(ParameterError::invalid_value("channels", "must be at least 1").into());
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create mono audio from a sample vector.
    pub fn new_mono(samples: Vec<f32>, sample_rate: u32) -> AudioSpectraResult<Self> {
        let frames = samples.len();
        let matrix = Array2::from_shape_vec((frames, 1), samples)
            .map_err(|e| ParameterError::invalid_value("samples", e.to_string()))?;
        Self::new(matrix, sample_rate)
    }

    /// Create audio from interleaved samples (`LRLR...`).
    pub fn from_interleaved(
        samples: Vec<f32>,
        channels: usize,
        sample_rate: u32,
    ) -> AudioSpectraResult<Self> {
        if channels == 0 {
            return Err(ParameterError::invalid_value("channels", "must be at least 1").into());
        }
        if samples.len() % channels != 0 {
            return Err(ParameterError::invalid_value(
                "samples",
                format!(
                    "{} interleaved samples do not divide into {} channels",
                    samples.len(),
                    channels
                ),
            )
            .into());
        }
        let frames = samples.len() / channels;
        let matrix = Array2::from_shape_vec((frames, channels), samples)
            .map_err(|e| ParameterError::invalid_value("samples", e.to_string()))?;
        Self::new(matrix, sample_rate)
    }

    /// Build from parts already known to be valid.
    pub(crate) fn from_parts(samples: Array2<f32>, sample_rate: u32) -> Self {
        debug_assert!(samples.ncols() > 0 && sample_rate > 0);
        Self {
            samples,
            sample_rate,
        }
    }

    /// Read-only view of the sample matrix, shape `(frames, channels)`.
    pub fn samples(&self) -> ArrayView2<'_, f32> {
        self.samples.view()
    }

    /// Consume the audio, returning the sample matrix.
    pub fn into_samples(self) -> Array2<f32> {
        self.samples
    }

    /// Sample rate in Hz.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.samples.ncols()
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.nrows()
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples in interleaved order (`LRLR...`).
    pub fn to_interleaved(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }

    /// Convert a time in seconds to the nearest sample index (not clamped). Halves round to even.
    pub fn seconds_to_samples(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.sample_rate as f64).round_ties_even() as usize
    }

    /// Average all channels into one.
    pub fn as_mono(&self) -> Self {
        if self.channels() == 1 {
            return self.clone();
        }
        let mono = self
            .samples
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(self.frames()));
        Self::from_parts(mono.insert_axis(Axis(1)), self.sample_rate)
    }

    /// Duplicate a mono signal into two channels; stereo input is returned unchanged.
    ///
    /// # Errors
    /// Returns a [`ParameterError`] for inputs with more than two channels.
    pub fn as_stereo(&self) -> AudioSpectraResult<Self> {
        match self.channels() {
            2 => Ok(self.clone()),
            1 => {
                let column = self.samples.column(0);
                let mut stereo = Array2::zeros((self.frames(), 2));
                stereo.column_mut(0).assign(&column);
                stereo.column_mut(1).assign(&column);
                Ok(Self::from_parts(stereo, self.sample_rate))
            }
            n => Err(ParameterError::invalid_value(
                "channels",
                format!("cannot convert {n}-channel audio to stereo directly"),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    fn params() -> StftParams {
        StftParams::with(8, 2, WindowType::Hann)
    }

    #[test]
    fn test_spectral_frame_rejects_wrong_bins() {
        let data = Array3::<Complex32>::zeros((1, 3, 4));
        assert!(SpectralFrame::new(data, 8000, params(), 4).is_err());

        let data = Array3::<Complex32>::zeros((1, 3, 5));
        let frame = SpectralFrame::new(data, 8000, params(), 4).unwrap();
        assert_eq!(frame.bins(), 5);
        assert_eq!(frame.frames(), 3);
        assert_eq!(frame.channels(), 1);
    }

    #[test]
    fn test_spectral_frame_rejects_zero_channels() {
        let data = Array3::<Complex32>::zeros((0, 3, 5));
        assert!(SpectralFrame::new(data, 8000, params(), 4).is_err());
    }

    #[test]
    fn test_mean_magnitude_profile() {
        let mut data = Array3::<Complex32>::zeros((2, 2, 5));
        data[[0, 0, 1]] = Complex32::new(3.0, 4.0);
        data[[1, 1, 1]] = Complex32::new(0.0, 1.0);
        let frame = SpectralFrame::new(data, 8000, params(), 4).unwrap();
        let profile = frame.mean_magnitude_profile();
        assert!((profile[1] - 1.5).abs() < 1e-9);
        assert_eq!(profile[0], 0.0);
    }

    #[test]
    fn test_check_compatible_reports_first_field() {
        let a = SpectralFrame::new(Array3::zeros((1, 3, 5)), 8000, params(), 4).unwrap();
        let b = SpectralFrame::new(Array3::zeros((2, 3, 5)), 16000, params(), 4).unwrap();
        let err = a
            .check_compatible(&b, 1, &[FrameField::FftSize, FrameField::SampleRate, FrameField::Channels])
            .unwrap_err();
        assert_eq!(err.field, "sample_rate");
        assert_eq!(err.index, 1);
        assert!(a.check_compatible(&a, 1, &[FrameField::Window, FrameField::Frames]).is_ok());
    }

    #[test]
    fn test_audio_interleaved_round_trip() {
        let audio = AudioData::from_interleaved(vec![0.1, 0.2, 0.3, 0.4], 2, 8000).unwrap();
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.frames(), 2);
        assert_eq!(audio.to_interleaved(), vec![0.1, 0.2, 0.3, 0.4]);
        assert!(AudioData::from_interleaved(vec![0.1, 0.2, 0.3], 2, 8000).is_err());
    }

    #[test]
    fn test_audio_channel_conversion() {
        let audio = AudioData::from_interleaved(vec![0.2, 0.4, -0.2, -0.4], 2, 8000).unwrap();
        let mono = audio.as_mono();
        assert_eq!(mono.channels(), 1);
        assert!((mono.samples()[[0, 0]] - 0.3).abs() < 1e-6);

        let stereo = mono.as_stereo().unwrap();
        assert_eq!(stereo.channels(), 2);
        assert_eq!(stereo.samples()[[1, 1]], stereo.samples()[[1, 0]]);
    }

    #[test]
    fn test_seconds_conversion_rounds_half_to_even() {
        // 4 Hz with a hop of 2: one frame every half second.
        let frame = SpectralFrame::new(Array3::zeros((1, 3, 5)), 4, params(), 4).unwrap();
        assert_eq!(frame.seconds_to_frame(0.25), 0);
        assert_eq!(frame.seconds_to_frame(0.75), 2);
        assert_eq!(frame.seconds_to_frame(-1.0), 0);

        let audio = AudioData::new(Array2::zeros((8, 1)), 4).unwrap();
        assert_eq!(audio.seconds_to_samples(0.625), 2);
        assert_eq!(audio.seconds_to_samples(0.875), 4);
    }
}
