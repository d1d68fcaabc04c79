//! Linear-interpolation resampling of the spectral tensor.
//!
//! Two interpolation schemes are used:
//!
//! - **edge-clamped** along the frame axis: source and destination positions are both
//!   normalised to `[0, 1]`, so the first and last frames map onto each other exactly and
//!   nothing wraps around. Used by `stretch` and `morph`.
//! - **zero-filled** along the bin axis: positions past the last bin read zero. Used by
//!   `transpose`.
//!
//! Real and imaginary parts are interpolated independently.

use ndarray::{Array3, ArrayView3, Axis, Zip};
use num_complex::Complex32;

use super::traits::SpectralResampling;
use crate::repr::{FrameField, SpectralFrame};
use crate::utils::audio_math::{linspace, semitones_to_ratio};
use crate::{AudioSpectraResult, ParameterError};

fn lerp(a: Complex32, b: Complex32, t: f32) -> Complex32 {
    Complex32::new(a.re + (b.re - a.re) * t, a.im + (b.im - a.im) * t)
}

/// Resample the frame axis of `data` to `new_frames` frames, clamping at both edges.
///
/// An empty source yields zeros and a single-frame source is repeated.
pub fn resample_frames(data: ArrayView3<'_, Complex32>, new_frames: usize) -> Array3<Complex32> {
    let (channels, frames, bins) = data.dim();
    let mut out = Array3::<Complex32>::zeros((channels, new_frames, bins));
    if frames == 0 {
        return out;
    }

    let last = (frames - 1) as f64;
    for (j, t) in linspace(0.0, 1.0, new_frames).into_iter().enumerate() {
        let position = (t * last).clamp(0.0, last);
        let lo = position.floor() as usize;
        let hi = (lo + 1).min(frames - 1);
        let frac = (position - lo as f64) as f32;

        let lower = data.index_axis(Axis(1), lo);
        let upper = data.index_axis(Axis(1), hi);
        Zip::from(out.index_axis_mut(Axis(1), j))
            .and(&lower)
            .and(&upper)
            .for_each(|dst, &a, &b| *dst = lerp(a, b, frac));
    }
    out
}

/// Resample the bin axis so output bin `b` reads source position `b / ratio`.
///
/// Positions beyond the last bin read zero.
pub fn resample_bins(data: ArrayView3<'_, Complex32>, ratio: f64) -> Array3<Complex32> {
    let (_, _, bins) = data.dim();
    let mut out = Array3::<Complex32>::zeros(data.raw_dim());
    if bins == 0 {
        return out;
    }

    let last = (bins - 1) as f64;
    for b in 0..bins {
        let position = b as f64 / ratio;
        if !(0.0..=last).contains(&position) {
            continue;
        }
        let lo = position.floor() as usize;
        let hi = (lo + 1).min(bins - 1);
        let frac = (position - lo as f64) as f32;

        let lower = data.index_axis(Axis(2), lo);
        let upper = data.index_axis(Axis(2), hi);
        Zip::from(out.index_axis_mut(Axis(2), b))
            .and(&lower)
            .and(&upper)
            .for_each(|dst, &a, &b| *dst = lerp(a, b, frac));
    }
    out
}

impl SpectralResampling for SpectralFrame {
    fn transpose(&self, semitones: f64) -> Self {
        let ratio = semitones_to_ratio(semitones);
        tracing::debug!(semitones, ratio, "transposing bin axis");
        self.with_data(resample_bins(self.data().view(), ratio))
    }

    fn stretch(&self, factor: f64) -> AudioSpectraResult<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ParameterError::invalid_value(
                "factor",
                format!("stretch factor must be a positive number, got {factor}"),
            )
            .into());
        }
        let new_frames = ((self.frames() as f64 * factor).round_ties_even() as usize).max(1);
        let new_length = (self.original_frame_count() as f64 * factor).round_ties_even() as usize;

        tracing::debug!(from = self.frames(), to = new_frames, "stretching frame axis");
        Ok(self.with_data_and_length(resample_frames(self.data().view(), new_frames), new_length))
    }

    fn morph(&self, other: &Self, blend_start: f64, blend_end: f64) -> AudioSpectraResult<Self> {
        self.check_compatible(
            other,
            1,
            &[
                FrameField::FftSize,
                FrameField::HopLength,
                FrameField::Channels,
                FrameField::SampleRate,
            ],
        )?;

        let frames = self.frames();
        let resampled = resample_frames(other.data().view(), frames);
        let alpha = linspace(blend_start, blend_end, frames);

        let mut data = self.data().clone();
        for (m, &a) in alpha.iter().enumerate() {
            let a = a as f32;
            Zip::from(data.index_axis_mut(Axis(1), m))
                .and(resampled.index_axis(Axis(1), m))
                .for_each(|dst, &src| *dst = *dst * (1.0 - a) + src * a);
        }
        Ok(self.with_data(data))
    }
}
