//! Supporting types and enums for spectral operations.
//!
//! This module contains the configuration types, enums, and result records
//! used by the spectral processing traits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AudioSpectraError, AudioSpectraResult, ParameterError};

/// Window functions for STFT analysis and overlap-add synthesis.
///
/// All windows use the periodic (DFT-even) definition, so a window of length `N`
/// is the first `N` points of the symmetric window of length `N + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WindowType {
    /// Rectangular window (no tapering).
    Boxcar,
    /// Hann window - good general-purpose window with moderate leakage.
    #[default]
    Hann,
    /// Hamming window - similar to Hann but does not reach zero at the edges.
    Hamming,
    /// Blackman window - low leakage but wider main lobe.
    Blackman,
    /// Bartlett (triangular) window.
    Bartlett,
}

impl WindowType {
    /// Canonical name written into SPXF headers.
    pub const fn name(&self) -> &'static str {
        match self {
            WindowType::Boxcar => "boxcar",
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::Bartlett => "bartlett",
        }
    }

    /// Generate `size` window coefficients.
    pub fn coefficients(&self, size: usize) -> Vec<f64> {
        use std::f64::consts::PI;

        let n = size as f64;
        match self {
            WindowType::Boxcar => vec![1.0; size],
            WindowType::Hann => (0..size)
                .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n).cos())
                .collect(),
            WindowType::Hamming => (0..size)
                .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / n).cos())
                .collect(),
            WindowType::Blackman => (0..size)
                .map(|i| {
                    let x = i as f64 / n;
                    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                })
                .collect(),
            WindowType::Bartlett => (0..size)
                .map(|i| 1.0 - (2.0 * i as f64 / n - 1.0).abs())
                .collect(),
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowType {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowType::Hann),
            "hamming" => Ok(WindowType::Hamming),
            "blackman" => Ok(WindowType::Blackman),
            "boxcar" | "rectangular" | "rect" | "ones" => Ok(WindowType::Boxcar),
            "bartlett" | "triangular" => Ok(WindowType::Bartlett),
            _ => Err(ParameterError::unsupported_window(s)),
        }
    }
}

impl TryFrom<String> for WindowType {
    type Error = ParameterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WindowType> for String {
    fn from(value: WindowType) -> Self {
        value.name().to_string()
    }
}

/// STFT framing parameters.
///
/// Used by [`forward`](crate::operations::transforms::forward) and by
/// [`Sound`](crate::Sound) when it has to materialise a spectral representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StftParams {
    /// Window length in samples; must be positive and even.
    pub fft_size: usize,
    /// Advance between frames in samples; `1..=fft_size`.
    pub hop_length: usize,
    /// Analysis/synthesis window.
    pub window: WindowType,
}

impl StftParams {
    /// Default parameters: 2048-sample Hann window, 512-sample hop.
    pub const fn new() -> Self {
        Self {
            fft_size: 2048,
            hop_length: 512,
            window: WindowType::Hann,
        }
    }

    /// Create parameters with an explicit window length, hop and window.
    pub const fn with(fft_size: usize, hop_length: usize, window: WindowType) -> Self {
        Self {
            fft_size,
            hop_length,
            window,
        }
    }

    /// Set the window length.
    pub const fn fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    /// Set the hop length.
    pub const fn hop_length(mut self, hop_length: usize) -> Self {
        self.hop_length = hop_length;
        self
    }

    /// Set the window function.
    pub const fn window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    /// Number of frequency bins, `fft_size / 2 + 1`.
    pub const fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Number of STFT frames produced for `samples` input samples.
    ///
    /// The signal is padded with `fft_size / 2` zeros on both sides and then
    /// zero-extended to a whole number of hops, giving `ceil(samples / hop) + 1`.
    pub const fn frame_count(&self, samples: usize) -> usize {
        samples.div_ceil(self.hop_length) + 1
    }

    /// Validate the framing parameters.
    pub fn validate(&self) -> AudioSpectraResult<()> {
        if self.fft_size == 0 || self.fft_size % 2 != 0 {
            return Err(ParameterError::invalid_value(
                "fft_size",
                format!("must be a positive even number, got {}", self.fft_size),
            )
            .into());
        }
        if self.hop_length == 0 || self.hop_length > self.fft_size {
            return Err(ParameterError::invalid_value(
                "hop_length",
                format!(
                    "must be in 1..={}, got {}",
                    self.fft_size, self.hop_length
                ),
            )
            .into());
        }
        Ok(())
    }
}

impl Default for StftParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Brick-wall filter shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Keep bins at or below the cutoff.
    Lowpass,
    /// Keep bins at or above the cutoff.
    Highpass,
    /// Keep bins inside `[freq, freq_hi]`; requires `freq_hi`.
    Bandpass,
    /// Remove bins inside `[freq, freq_hi]`; requires `freq_hi`.
    Bandstop,
}

impl FilterKind {
    /// Whether this kind needs an upper edge frequency.
    pub const fn is_band(&self) -> bool {
        matches!(self, FilterKind::Bandpass | FilterKind::Bandstop)
    }

    /// Lowercase name of the filter kind.
    pub const fn name(&self) -> &'static str {
        match self {
            FilterKind::Lowpass => "lowpass",
            FilterKind::Highpass => "highpass",
            FilterKind::Bandpass => "bandpass",
            FilterKind::Bandstop => "bandstop",
        }
    }

    /// Resolve the upper edge, failing for band kinds without one.
    pub(crate) fn require_upper(&self, freq_hi: Option<f64>) -> AudioSpectraResult<f64> {
        match (self.is_band(), freq_hi) {
            (true, Some(hi)) => Ok(hi),
            (true, None) => Err(AudioSpectraError::Parameter(ParameterError::missing(
                "freq_hi",
                format!("{} filter", self.name()),
            ))),
            (false, _) => Ok(f64::INFINITY),
        }
    }
}

impl FromStr for FilterKind {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowpass" => Ok(FilterKind::Lowpass),
            "highpass" => Ok(FilterKind::Highpass),
            "bandpass" => Ok(FilterKind::Bandpass),
            "bandstop" | "notch" => Ok(FilterKind::Bandstop),
            other => Err(ParameterError::invalid_value(
                "kind",
                format!("unknown filter kind '{other}'"),
            )),
        }
    }
}

/// Level measure used by `normalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    /// Scale so the absolute peak sample reaches the target.
    #[default]
    Peak,
    /// Scale so the RMS level reaches the target.
    Rms,
}

/// Which bins a decomposed component claims around its fundamental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicMode {
    /// The fundamental and its integer harmonics up to `max_harmonics`.
    #[default]
    Full,
    /// Only the bin window around the fundamental.
    FundamentalOnly,
}

/// Configuration for harmonic decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposeConfig {
    /// Maximum number of candidate peaks kept after prominence ranking. Zero yields an empty
    /// decomposition.
    pub max_components: usize,
    /// Bins below this frequency (Hz) are never selected as peaks.
    pub min_freq: f64,
    /// Minimum peak prominence in dB.
    pub prominence_db: f64,
    /// Neighbouring bins included on each side of a harmonic.
    pub bin_window: usize,
    /// Maximum number of harmonics (including the fundamental) per component.
    pub max_harmonics: usize,
    /// Full harmonic series or fundamental only.
    pub harmonic_mode: HarmonicMode,
    /// Whether to produce the remainder frame of unclaimed bins.
    pub include_remainder: bool,
}

impl DecomposeConfig {
    /// Default configuration: 12 components above 50 Hz with 15 dB prominence,
    /// +/-2 bins around each of up to 16 harmonics, remainder included.
    pub const fn new() -> Self {
        Self {
            max_components: 12,
            min_freq: 50.0,
            prominence_db: 15.0,
            bin_window: 2,
            max_harmonics: 16,
            harmonic_mode: HarmonicMode::Full,
            include_remainder: true,
        }
    }

    /// Set the maximum number of components.
    pub const fn max_components(mut self, max_components: usize) -> Self {
        self.max_components = max_components;
        self
    }

    /// Set the minimum fundamental frequency.
    pub const fn min_freq(mut self, min_freq: f64) -> Self {
        self.min_freq = min_freq;
        self
    }

    /// Set the minimum prominence in dB.
    pub const fn prominence_db(mut self, prominence_db: f64) -> Self {
        self.prominence_db = prominence_db;
        self
    }

    /// Set the per-harmonic bin window.
    pub const fn bin_window(mut self, bin_window: usize) -> Self {
        self.bin_window = bin_window;
        self
    }

    /// Set the maximum number of harmonics.
    pub const fn max_harmonics(mut self, max_harmonics: usize) -> Self {
        self.max_harmonics = max_harmonics;
        self
    }

    /// Set the harmonic mode.
    pub const fn harmonic_mode(mut self, harmonic_mode: HarmonicMode) -> Self {
        self.harmonic_mode = harmonic_mode;
        self
    }

    /// Enable or disable the remainder component.
    pub const fn include_remainder(mut self, include_remainder: bool) -> Self {
        self.include_remainder = include_remainder;
        self
    }

    /// Validate the decomposition configuration.
    pub fn validate(&self) -> AudioSpectraResult<()> {
        if !self.min_freq.is_finite() || self.min_freq < 0.0 {
            return Err(ParameterError::invalid_value(
                "min_freq",
                format!("must be a finite, non-negative frequency, got {}", self.min_freq),
            )
            .into());
        }
        if !self.prominence_db.is_finite() || self.prominence_db < 0.0 {
            return Err(ParameterError::invalid_value(
                "prominence_db",
                format!("must be finite and non-negative, got {}", self.prominence_db),
            )
            .into());
        }
        if self.max_harmonics == 0 {
            return Err(ParameterError::invalid_value("max_harmonics", "must be at least 1").into());
        }
        Ok(())
    }
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Dominant pitch of one STFT frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    /// Frame start time in seconds (`frame * hop / sample_rate`).
    pub time_seconds: f64,
    /// Frequency of the strongest bin, or 0.0 for a silent frame.
    pub frequency_hz: f64,
    /// Fractional MIDI note number, absent when no pitch was found.
    pub midi: Option<f64>,
    /// Nearest note name such as `A4`, absent when no pitch was found.
    pub note: Option<String>,
}

/// RMS and peak level of one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelReading {
    /// Window start time in seconds.
    pub time_seconds: f64,
    /// RMS level in dBFS.
    pub rms_db: f64,
    /// Peak level in dBFS.
    pub peak_db: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_names_round_trip() {
        for window in [
            WindowType::Boxcar,
            WindowType::Hann,
            WindowType::Hamming,
            WindowType::Blackman,
            WindowType::Bartlett,
        ] {
            assert_eq!(window.name().parse::<WindowType>().unwrap(), window);
        }
        assert_eq!("hanning".parse::<WindowType>().unwrap(), WindowType::Hann);
        assert!(matches!(
            "kaiser".parse::<WindowType>(),
            Err(ParameterError::UnsupportedWindow { .. })
        ));
    }

    #[test]
    fn test_periodic_hann_coefficients() {
        let w = WindowType::Hann.coefficients(4);
        assert_eq!(w.len(), 4);
        assert!(w[0].abs() < 1e-12);
        assert!((w[1] - 0.5).abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);
        assert!((w[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_stft_params_validation() {
        assert!(StftParams::new().validate().is_ok());
        assert!(StftParams::with(2047, 512, WindowType::Hann).validate().is_err());
        assert!(StftParams::with(1024, 0, WindowType::Hann).validate().is_err());
        assert!(StftParams::with(1024, 2048, WindowType::Hann).validate().is_err());
    }

    #[test]
    fn test_frame_count_convention() {
        let params = StftParams::with(2048, 512, WindowType::Hann);
        assert_eq!(params.frame_count(0), 1);
        assert_eq!(params.frame_count(512), 2);
        assert_eq!(params.frame_count(513), 3);
        assert_eq!(params.bins(), 1025);
    }

    #[test]
    fn test_band_filters_require_upper_edge() {
        assert!(FilterKind::Bandpass.require_upper(None).is_err());
        assert_eq!(FilterKind::Bandstop.require_upper(Some(60.0)).unwrap(), 60.0);
        assert!(FilterKind::Lowpass.require_upper(None).is_ok());
    }

    #[test]
    fn test_decompose_config_validation() {
        assert!(DecomposeConfig::default().validate().is_ok());
        assert!(DecomposeConfig::new().max_components(0).validate().is_ok());
        assert!(DecomposeConfig::new().max_harmonics(0).validate().is_err());
        assert!(DecomposeConfig::new().prominence_db(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_window_serde_uses_name() {
        let json = serde_json::to_string(&StftParams::new()).unwrap();
        assert!(json.contains("\"hann\""));
        let back: StftParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StftParams::new());
    }
}
