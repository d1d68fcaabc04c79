//! Forward and inverse short-time Fourier transforms.
//!
//! The forward transform frames each channel independently under a fixed, centred
//! zero-padding convention: the signal is padded with `fft_size / 2` zeros on both
//! sides, then zero-extended so the padded length is a whole number of hops past the
//! first window. This yields `ceil(N / hop) + 1` frames for `N` input samples and
//! centres the first and last samples in a window.
//!
//! Bins are stored exactly as computed by the FFT of the windowed frame (no scaling
//! beyond the window itself). The inverse transform runs a weighted overlap-add with
//! the same window, normalises by the squared-window overlap sum, removes the centring
//! pad, and returns exactly `original_frame_count` samples clipped to `[-1.0, 1.0]`.
//!
//! ## Mathematical Foundation
//!
//! ```text
//! X[m, k] = sum_n x[n + m*H - N/2] * w[n] * exp(-2*pi*i*k*n / N)
//! x[t]    = sum_m w[t - m*H] * ifft(X[m])[t - m*H] / sum_m w[t - m*H]^2
//! ```

use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis, s};
use num_complex::{Complex, Complex32};
use rustfft::{Fft, FftPlanner};

use crate::operations::types::StftParams;
use crate::repr::{AudioData, SpectralFrame};
use crate::AudioSpectraResult;

/// Overlap sums at or below this value are left unnormalised.
const WINDOW_SUM_FLOOR: f64 = 1e-10;

/// Compute the STFT of `audio`, one channel at a time.
///
/// Returns a [`SpectralFrame`] with shape `(channels, ceil(N / hop) + 1, fft_size / 2 + 1)`
/// and `original_frame_count = N`.
///
/// # Errors
/// Returns a [`ParameterError`](crate::ParameterError) if `params` is invalid.
///
/// # Examples
///
/// ```rust
/// use audio_spectra::{StftParams, WindowType, utils::generation::sine_wave};
/// use audio_spectra::operations::transforms::{forward, inverse};
///
/// let audio = sine_wave(440.0, 0.25, 16000, 0.5).unwrap();
/// let params = StftParams::with(1024, 256, WindowType::Hann);
/// let frame = forward(&audio, &params).unwrap();
/// let back = inverse(&frame);
/// assert_eq!(back.frames(), audio.frames());
/// ```
#[tracing::instrument(
    level = "debug",
    skip(audio),
    fields(channels = audio.channels(), samples = audio.frames())
)]
pub fn forward(audio: &AudioData, params: &StftParams) -> AudioSpectraResult<SpectralFrame> {
    params.validate()?;

    let samples = audio.samples();
    let frames = params.frame_count(audio.frames());
    let bins = params.bins();
    let window = params.window.coefficients(params.fft_size);
    let fft = FftPlanner::<f64>::new().plan_fft_forward(params.fft_size);

    tracing::debug!(frames, bins, "computing forward STFT");

    let per_channel = map_channels(audio.channels(), |ch| {
        analyse_channel(samples.column(ch), params, frames, &window, &fft)
    });

    let mut data = Array3::<Complex32>::zeros((audio.channels(), frames, bins));
    for (ch, spectrum) in per_channel.into_iter().enumerate() {
        data.index_axis_mut(Axis(0), ch).assign(&spectrum);
    }

    SpectralFrame::new(data, audio.sample_rate(), *params, audio.frames())
}

/// Synthesize the time-domain signal of `frame` by weighted overlap-add.
///
/// Always uses the frame's own `fft_size`, `hop_length` and window. The result has
/// exactly `original_frame_count` samples per channel (truncated, or zero-extended if the
/// frame axis is too short to cover it) with every sample clipped to `[-1.0, 1.0]`.
#[tracing::instrument(
    level = "debug",
    skip(frame),
    fields(channels = frame.channels(), frames = frame.frames())
)]
pub fn inverse(frame: &SpectralFrame) -> AudioData {
    let params = frame.params();
    let window = params.window.coefficients(params.fft_size);
    let ifft = FftPlanner::<f64>::new().plan_fft_inverse(params.fft_size);
    let length = frame.original_frame_count();
    let data = frame.data();

    let per_channel = map_channels(frame.channels(), |ch| {
        synthesise_channel(data.index_axis(Axis(0), ch), &params, length, &window, &ifft)
    });

    let mut samples = Array2::<f32>::zeros((length, frame.channels()));
    for (ch, signal) in per_channel.into_iter().enumerate() {
        for (dst, &src) in samples.column_mut(ch).iter_mut().zip(signal.iter()) {
            *dst = (src as f32).clamp(-1.0, 1.0);
        }
    }

    tracing::debug!(samples = length, "inverse STFT complete");
    AudioData::from_parts(samples, frame.sample_rate())
}

/// Run `f` over every channel index, in parallel when the feature is enabled.
#[cfg(feature = "parallel-processing")]
fn map_channels<T, F>(channels: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    use rayon::prelude::*;

    if channels > 1 && num_cpus::get() > 1 {
        (0..channels).into_par_iter().map(f).collect()
    } else {
        (0..channels).map(f).collect()
    }
}

#[cfg(not(feature = "parallel-processing"))]
fn map_channels<T, F>(channels: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..channels).map(f).collect()
}

/// Forward STFT of one channel, shape `(frames, bins)`.
fn analyse_channel(
    signal: ArrayView1<'_, f32>,
    params: &StftParams,
    frames: usize,
    window: &[f64],
    fft: &Arc<dyn Fft<f64>>,
) -> Array2<Complex32> {
    let n_fft = params.fft_size;
    let half = n_fft / 2;
    let bins = params.bins();
    let len = signal.len();

    let mut out = Array2::<Complex32>::zeros((frames, bins));
    let mut buffer = vec![Complex::new(0.0f64, 0.0); n_fft];

    for m in 0..frames {
        // Sample index in the unpadded signal that lines up with window position 0.
        let origin = (m * params.hop_length) as isize - half as isize;
        for (n, slot) in buffer.iter_mut().enumerate() {
            let idx = origin + n as isize;
            let sample = if idx >= 0 && (idx as usize) < len {
                signal[idx as usize] as f64
            } else {
                0.0
            };
            *slot = Complex::new(sample * window[n], 0.0);
        }
        fft.process(&mut buffer);
        for (dst, src) in out.row_mut(m).iter_mut().zip(buffer.iter()) {
            *dst = Complex32::new(src.re as f32, src.im as f32);
        }
    }
    out
}

/// Inverse STFT of one channel's `(frames, bins)` matrix, returning `length` samples.
fn synthesise_channel(
    spectrum: ArrayView2<'_, Complex32>,
    params: &StftParams,
    length: usize,
    window: &[f64],
    ifft: &Arc<dyn Fft<f64>>,
) -> Vec<f64> {
    let n_fft = params.fft_size;
    let half = n_fft / 2;
    let bins = params.bins();
    let frames = spectrum.nrows();

    if frames == 0 {
        return vec![0.0; length];
    }

    let padded_len = (frames - 1) * params.hop_length + n_fft;
    let mut output = vec![0.0f64; padded_len];
    let mut window_sum = vec![0.0f64; padded_len];
    let mut buffer = vec![Complex::new(0.0f64, 0.0); n_fft];
    let scale = 1.0 / n_fft as f64;

    for m in 0..frames {
        fill_hermitian(spectrum.slice(s![m, ..]), bins, &mut buffer);
        ifft.process(&mut buffer);

        let start = m * params.hop_length;
        for (n, value) in buffer.iter().enumerate() {
            output[start + n] += value.re * scale * window[n];
            window_sum[start + n] += window[n] * window[n];
        }
    }

    for (sample, &norm) in output.iter_mut().zip(window_sum.iter()) {
        if norm > WINDOW_SUM_FLOOR {
            *sample /= norm;
        }
    }

    let available = padded_len.saturating_sub(half);
    let mut signal: Vec<f64> = output
        .into_iter()
        .skip(half)
        .take(length.min(available))
        .collect();
    signal.resize(length, 0.0);
    signal
}

/// Expand a half spectrum into the full Hermitian-symmetric FFT input.
///
/// The imaginary parts of the DC and Nyquist bins are discarded, matching a real inverse FFT.
fn fill_hermitian(half: ArrayView1<'_, Complex32>, bins: usize, buffer: &mut [Complex<f64>]) {
    let n_fft = buffer.len();
    for (k, value) in half.iter().enumerate() {
        let c = Complex::new(value.re as f64, value.im as f64);
        if k == 0 || k == bins - 1 {
            buffer[k] = Complex::new(c.re, 0.0);
        } else {
            buffer[k] = c;
            buffer[n_fft - k] = c.conj();
        }
    }
}

/// Validate that a window name is supported, returning the parsed window.
///
/// Convenience for boundary layers that receive window names as text.
pub fn parse_window(name: &str) -> AudioSpectraResult<crate::WindowType> {
    Ok(name.parse::<crate::WindowType>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WindowType;
    use crate::utils::generation::{compound_tone, sine_wave};

    #[test]
    fn test_forward_shape_and_metadata() {
        let audio = sine_wave(440.0, 0.5, 16000, 0.5).unwrap();
        let params = StftParams::with(2048, 512, WindowType::Hann);
        let frame = forward(&audio, &params).unwrap();

        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.bins(), 1025);
        assert_eq!(frame.frames(), 8000usize.div_ceil(512) + 1);
        assert_eq!(frame.original_frame_count(), 8000);
        assert_eq!(frame.sample_rate(), 16000);
        assert_eq!(frame.window(), WindowType::Hann);
    }

    #[test]
    fn test_sine_round_trip_within_tolerance() {
        let audio = sine_wave(440.0, 1.0, 16000, 0.8).unwrap();
        let params = StftParams::with(2048, 512, WindowType::Hann);
        let frame = forward(&audio, &params).unwrap();
        let reconstructed = inverse(&frame);

        assert_eq!(reconstructed.frames(), audio.frames());
        for (o, r) in audio.samples().iter().zip(reconstructed.samples().iter()) {
            assert!(
                (o - r).abs() < 1e-3,
                "round-trip error too large: orig={o}, recon={r}"
            );
        }
    }

    #[test]
    fn test_round_trip_all_windows_multichannel() {
        let left = compound_tone(&[(220.0, 0.3), (660.0, 0.2)], 0.25, 8000).unwrap();
        let stereo = left.as_stereo().unwrap();
        for window in [
            WindowType::Hann,
            WindowType::Hamming,
            WindowType::Blackman,
            WindowType::Boxcar,
            WindowType::Bartlett,
        ] {
            let params = StftParams::with(512, 128, window);
            let frame = forward(&stereo, &params).unwrap();
            assert_eq!(frame.channels(), 2);
            let back = inverse(&frame);
            let max_error = stereo
                .samples()
                .iter()
                .zip(back.samples().iter())
                .fold(0.0f32, |m, (o, r)| m.max((o - r).abs()));
            assert!(max_error < 1e-3, "{window}: max error {max_error}");
        }
    }

    #[test]
    fn test_sine_peak_bin() {
        let audio = sine_wave(1000.0, 0.5, 16000, 0.5).unwrap();
        let frame = forward(&audio, &StftParams::with(1024, 256, WindowType::Hann)).unwrap();
        let profile = frame.mean_magnitude_profile();
        let peak = profile
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0;
        // 1000 Hz at 16000 / 1024 Hz per bin = bin 64
        assert_eq!(peak, 64);
    }

    #[test]
    fn test_inverse_clips_and_pads() {
        let audio = sine_wave(440.0, 0.1, 8000, 1.0).unwrap();
        let params = StftParams::with(256, 64, WindowType::Hann);
        let frame = forward(&audio, &params).unwrap();
        let loud = frame.with_data(frame.data().mapv(|c| c * 4.0));
        let out = inverse(&loud);
        assert!(out.samples().iter().all(|s| (-1.0..=1.0).contains(s)));

        let longer = frame.with_data_and_length(frame.data().clone(), audio.frames() + 5000);
        let out = inverse(&longer);
        assert_eq!(out.frames(), audio.frames() + 5000);
        assert!(out.samples().slice(s![-100.., ..]).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_forward_empty_signal() {
        let audio = AudioData::new_mono(Vec::new(), 8000).unwrap();
        let frame = forward(&audio, &StftParams::with(64, 16, WindowType::Hann)).unwrap();
        assert_eq!(frame.frames(), 1);
        assert_eq!(inverse(&frame).frames(), 0);
    }

    #[test]
    fn test_forward_rejects_bad_params() {
        let audio = sine_wave(440.0, 0.1, 8000, 0.5).unwrap();
        assert!(forward(&audio, &StftParams::with(255, 64, WindowType::Hann)).is_err());
        assert!(parse_window("kaiser").is_err());
    }
}
