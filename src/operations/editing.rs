//! Frame-axis editing operations for [`SpectralFrame`].
//!
//! This module implements the [`SpectralEditing`] trait: fades, trimming, reversal,
//! looping and concatenation. Frame indices are clamped to the tensor, never rejected.

use ndarray::{Array1, Axis, concatenate, s};

use super::traits::SpectralEditing;
use crate::repr::{FrameField, SpectralFrame};
use crate::utils::audio_math::linspace;
use crate::{AudioSpectraResult, ParameterError};

/// Gain envelope of `total` points with a linear fade-in and fade-out.
///
/// Both ramps are clamped to `total`; where they overlap the fade-out wins.
pub(crate) fn fade_envelope(total: usize, fade_in: usize, fade_out: usize) -> Array1<f32> {
    let mut envelope = Array1::<f32>::ones(total);
    let fade_in = fade_in.min(total);
    let fade_out = fade_out.min(total);

    for (dst, value) in envelope
        .iter_mut()
        .zip(linspace(0.0, 1.0, fade_in))
    {
        *dst = value as f32;
    }
    for (dst, value) in envelope
        .iter_mut()
        .skip(total - fade_out)
        .zip(linspace(1.0, 0.0, fade_out))
    {
        *dst = value as f32;
    }
    envelope
}

/// Clamp `start..end` to `0..len`, returning an empty range rather than failing.
pub(crate) fn clamp_range(start: usize, end: Option<usize>, len: usize) -> (usize, usize) {
    let start = start.min(len);
    let end = end.unwrap_or(len).min(len).max(start);
    (start, end)
}

impl SpectralEditing for SpectralFrame {
    fn fade(&self, fade_in_frames: usize, fade_out_frames: usize) -> Self {
        let envelope = fade_envelope(self.frames(), fade_in_frames, fade_out_frames);
        let mut data = self.data().clone();
        for (mut frame, &gain) in data.axis_iter_mut(Axis(1)).zip(envelope.iter()) {
            frame.mapv_inplace(|c| c * gain);
        }
        self.with_data(data)
    }

    fn trim_frames(&self, start: usize, end: Option<usize>) -> Self {
        let (start, end) = clamp_range(start, end, self.frames());
        let data = self.data().slice(s![.., start..end, ..]).to_owned();
        let length = ((end - start) * self.hop_length()).min(self.original_frame_count());
        self.with_data_and_length(data, length)
    }

    fn trim_seconds(&self, start: f64, end: Option<f64>) -> Self {
        let total = self.duration_seconds();
        let start = start.max(0.0).min(total);
        let end = end.unwrap_or(total).min(total).max(start);

        let first = self.seconds_to_frame(start).min(self.frames());
        let last = self.seconds_to_frame(end).min(self.frames()).max(first);
        let data = self.data().slice(s![.., first..last, ..]).to_owned();
        let length = ((end - start) * self.sample_rate() as f64).round_ties_even() as usize;
        self.with_data_and_length(data, length)
    }

    fn reverse(&self) -> Self {
        self.with_data(self.data().slice(s![.., ..;-1, ..]).to_owned())
    }

    fn repeat(&self, times: usize) -> AudioSpectraResult<Self> {
        if times == 0 {
            return Err(ParameterError::invalid_value("times", "must be at least 1").into());
        }
        let views = vec![self.data().view(); times];
        let data = concatenate(Axis(1), &views)
            .map_err(|e| ParameterError::invalid_value("times", e.to_string()))?;
        Ok(self.with_data_and_length(data, self.original_frame_count() * times))
    }

    fn concat(frames: &[Self]) -> AudioSpectraResult<Self> {
        let Some(first) = frames.first() else {
            return Err(ParameterError::invalid_value("frames", "nothing to concatenate").into());
        };
        for (index, frame) in frames.iter().enumerate().skip(1) {
            first.check_compatible(
                frame,
                index,
                &[
                    FrameField::SampleRate,
                    FrameField::FftSize,
                    FrameField::HopLength,
                    FrameField::Channels,
                    FrameField::Window,
                ],
            )?;
        }

        let views: Vec<_> = frames.iter().map(|f| f.data().view()).collect();
        let data = concatenate(Axis(1), &views)
            .map_err(|e| ParameterError::invalid_value("frames", e.to_string()))?;
        let length = frames.iter().map(SpectralFrame::original_frame_count).sum();
        Ok(first.with_data_and_length(data, length))
    }
}
