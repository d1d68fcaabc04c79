//! Per-bin amplitude operators for [`SpectralFrame`].
//!
//! This module implements the [`SpectralProcessing`] trait: gain, noise gate, spectral
//! subtraction, brick-wall filtering and level normalisation. Every operator maps the
//! tensor value by value and keeps the frame's metadata.

use ndarray::{Array1, ArrayView2, Axis, Zip, s};
use num_complex::Complex32;
use num_traits::Zero;

use super::traits::SpectralProcessing;
use super::transforms::inverse;
use super::types::{FilterKind, NormalizationMode};
use crate::AudioSpectraResult;
use crate::repr::SpectralFrame;
use crate::utils::audio_math::db_to_amplitude;

/// Levels below this are treated as silence by `normalize`.
pub(crate) const SILENCE_THRESHOLD: f64 = 1e-10;

/// Peak or RMS level of a `(frames, channels)` sample matrix.
pub(crate) fn measure_level(samples: ArrayView2<'_, f32>, mode: NormalizationMode) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    match mode {
        NormalizationMode::Peak => samples
            .iter()
            .fold(0.0f64, |peak, &s| peak.max((s as f64).abs())),
        NormalizationMode::Rms => {
            let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum_sq / samples.len() as f64).sqrt()
        }
    }
}

/// Per-bin keep mask of a brick-wall filter over `bin_freqs`.
fn filter_mask(bin_freqs: &[f64], kind: FilterKind, freq: f64, freq_hi: f64) -> Vec<bool> {
    bin_freqs
        .iter()
        .map(|&f| match kind {
            FilterKind::Lowpass => f <= freq,
            FilterKind::Highpass => f >= freq,
            FilterKind::Bandpass => f >= freq && f <= freq_hi,
            FilterKind::Bandstop => f < freq || f > freq_hi,
        })
        .collect()
}

impl SpectralProcessing for SpectralFrame {
    fn gain(&self, factor: f32) -> Self {
        self.with_data(self.data().mapv(|c| c * factor))
    }

    fn gate(&self, threshold_db: f64) -> Self {
        let threshold = db_to_amplitude(threshold_db);
        self.with_data(self.data().mapv(|c| {
            let magnitude = (c.re as f64).hypot(c.im as f64);
            if magnitude < threshold {
                Complex32::zero()
            } else {
                c
            }
        }))
    }

    fn denoise(&self, noise_start: usize, noise_end: usize, oversubtract: f64) -> Self {
        let frames = self.frames();
        if frames == 0 {
            return self.clone();
        }
        let start = noise_start.min(frames - 1);
        let end = noise_end.min(frames).max(start + 1);

        let region = self.data().slice(s![.., start..end, ..]);
        let count = (region.len_of(Axis(0)) * region.len_of(Axis(1))) as f64;
        let mut profile = Array1::<f64>::zeros(self.bins());
        for lane in region.lanes(Axis(2)) {
            for (acc, value) in profile.iter_mut().zip(lane.iter()) {
                *acc += value.norm() as f64;
            }
        }
        profile.mapv_inplace(|sum| sum / count * oversubtract);

        tracing::debug!(start, end, oversubtract, "denoise profile measured");

        let mut data = self.data().clone();
        for mut lane in data.lanes_mut(Axis(2)) {
            Zip::from(&mut lane).and(&profile).for_each(|value, &floor| {
                let magnitude = value.norm() as f64;
                let reduced = (magnitude - floor).max(0.0) as f32;
                *value = Complex32::from_polar(reduced, value.arg());
            });
        }
        self.with_data(data)
    }

    fn filter(&self, kind: FilterKind, freq: f64, freq_hi: Option<f64>) -> AudioSpectraResult<Self> {
        let upper = kind.require_upper(freq_hi)?;
        let keep = filter_mask(&self.bin_frequencies(), kind, freq, upper);

        let mut data = self.data().clone();
        for (bin, &kept) in keep.iter().enumerate() {
            if !kept {
                data.slice_mut(s![.., .., bin]).fill(Complex32::zero());
            }
        }
        Ok(self.with_data(data))
    }

    fn normalize(&self, target_db: f64, mode: NormalizationMode) -> Self {
        let audio = inverse(self);
        let current = measure_level(audio.samples(), mode);
        if current < SILENCE_THRESHOLD {
            tracing::warn!(?mode, "normalize on silent input, leaving unchanged");
            return self.clone();
        }
        let factor = db_to_amplitude(target_db) / current;
        self.gain(factor as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::transforms::forward;
    use crate::utils::generation::sine_wave;
    use crate::{StftParams, WindowType};
    use approx_eq::assert_approx_eq;
    use ndarray::Array3;

    fn filled(magnitude: f32, channels: usize, frames: usize) -> SpectralFrame {
        let data = Array3::from_elem((channels, frames, 5), Complex32::new(magnitude, 0.0));
        SpectralFrame::new(data, 8000, StftParams::with(8, 2, WindowType::Hann), frames * 2)
            .unwrap()
    }

    #[test]
    fn test_gain_scales_without_clipping() {
        let frame = filled(0.75, 1, 3);
        let louder = frame.gain(4.0);
        assert!(louder.data().iter().all(|c| (c.re - 3.0).abs() < 1e-6));
        assert_eq!(louder.original_frame_count(), frame.original_frame_count());
    }

    #[test]
    fn test_gate_threshold_is_strict() {
        let quiet = filled(1e-4, 2, 4).gate(-40.0);
        assert!(quiet.data().iter().all(|c| c.norm() == 0.0));

        let loud = filled(1.0, 2, 4).gate(-40.0);
        assert!(loud.data().iter().all(|c| c.norm() > 0.0));

        // 0 dB is exactly 1.0: a magnitude on the threshold is kept, the next float below is not.
        let exact = filled(1.0, 1, 1).gate(0.0);
        assert!(exact.data().iter().all(|c| c.norm() == 1.0));
        let below = filled(1.0 - f32::EPSILON / 2.0, 1, 1).gate(0.0);
        assert!(below.data().iter().all(|c| c.norm() == 0.0));
    }

    #[test]
    fn test_denoise_removes_matching_noise() {
        let mut data = Array3::<Complex32>::zeros((1, 10, 5));
        for ((_, f, b), v) in data.indexed_iter_mut() {
            *v = Complex32::from_polar(0.3, (f * 5 + b) as f32 * 0.1);
        }
        let frame =
            SpectralFrame::new(data, 8000, StftParams::with(8, 2, WindowType::Hann), 20).unwrap();
        let cleaned = frame.denoise(0, 5, 1.0);
        assert!(cleaned.mean_magnitude() < 0.01 * frame.mean_magnitude());
    }

    #[test]
    fn test_denoise_clamps_range_and_keeps_phase() {
        let mut data = Array3::<Complex32>::zeros((1, 4, 5));
        data[[0, 3, 2]] = Complex32::from_polar(1.0, 0.7);
        let frame =
            SpectralFrame::new(data, 8000, StftParams::with(8, 2, WindowType::Hann), 8).unwrap();
        // Range past the end collapses to the last frame, whose profile at bin 2 is 1.0.
        let cleaned = frame.denoise(50, 60, 0.5);
        let v = cleaned.data()[[0, 3, 2]];
        assert_approx_eq!(v.norm() as f64, 0.5, 1e-6);
        assert_approx_eq!(v.arg() as f64, 0.7, 1e-5);
    }

    #[test]
    fn test_filter_masks() {
        // Bin frequencies: 0, 1000, 2000, 3000, 4000.
        let frame = filled(1.0, 1, 2);
        let kept = |f: &SpectralFrame| -> Vec<bool> {
            (0..5).map(|b| f.data()[[0, 0, b]].norm() > 0.0).collect()
        };

        let low = frame.filter(FilterKind::Lowpass, 2000.0, None).unwrap();
        assert_eq!(kept(&low), vec![true, true, true, false, false]);

        let high = frame.filter(FilterKind::Highpass, 2000.0, None).unwrap();
        assert_eq!(kept(&high), vec![false, false, true, true, true]);

        let band = frame.filter(FilterKind::Bandpass, 1000.0, Some(3000.0)).unwrap();
        assert_eq!(kept(&band), vec![false, true, true, true, false]);

        let stop = frame.filter(FilterKind::Bandstop, 1000.0, Some(3000.0)).unwrap();
        assert_eq!(kept(&stop), vec![true, false, false, false, true]);
    }

    #[test]
    fn test_band_filter_requires_upper_edge() {
        let err = filled(1.0, 1, 2)
            .filter(FilterKind::Bandpass, 1000.0, None)
            .unwrap_err();
        assert!(err.is_parameter());
        assert!(err.to_string().contains("freq_hi"));
    }

    #[test]
    fn test_normalize_peak() {
        let audio = sine_wave(440.0, 0.5, 8000, 0.25).unwrap();
        let frame = forward(&audio, &StftParams::with(512, 128, WindowType::Hann)).unwrap();
        let normalized = frame.normalize(-6.0, NormalizationMode::Peak);
        let peak = measure_level(inverse(&normalized).samples(), NormalizationMode::Peak);
        assert_approx_eq!(peak, db_to_amplitude(-6.0), 1e-2);
    }

    #[test]
    fn test_normalize_silence_unchanged() {
        let frame = filled(0.0, 1, 4);
        assert_eq!(frame.normalize(0.0, NormalizationMode::Rms), frame);
    }
}
