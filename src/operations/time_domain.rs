//! Time-domain operators for [`AudioData`].
//!
//! These are the sample-domain counterparts of the spectral editing and processing
//! operators. The [`Sound`](crate::Sound) wrapper runs them when only samples are
//! materialised, so that a gain or trim never forces a transform.
//!
//! ## Filtering
//!
//! Filters are digital Butterworth designs of any positive order, built the classic way:
//!
//! 1. Analog low-pass prototype with `N` poles on the left half of the unit circle,
//!    `p_k = -exp(i * pi * (2k - N + 1) / (2N))`.
//! 2. Frequency transform to the requested response at the pre-warped edges
//!    `w = 4 * tan(pi * f / sample_rate)`. Band responses use the centre
//!    `w0 = sqrt(w_lo * w_hi)` and bandwidth `w_hi - w_lo`, and have `2N` poles.
//! 3. Bilinear transform `z = (4 + s) / (4 - s)`.
//! 4. Conjugate pole and zero pairs become second-order sections; a lone real pole (odd
//!    low-pass and high-pass orders) becomes a first-order section.
//!
//! The response is exactly `1 / sqrt(2)` at every cutoff edge. Output samples are clipped to
//! `[-1.0, 1.0]`.

use std::f64::consts::PI;

use ndarray::{Array2, Axis, concatenate, s};
use num_complex::Complex64;
use num_traits::Zero;

use super::editing::{clamp_range, fade_envelope};
use super::processing::{SILENCE_THRESHOLD, measure_level};
use super::traits::AudioProcessing;
use super::types::{FilterKind, LevelReading, NormalizationMode};
use crate::repr::AudioData;
use crate::utils::audio_math::{amplitude_to_db, db_to_amplitude};
use crate::{AudioSpectraResult, CompatibilityError, ParameterError};

/// Floor for reported levels in dBFS.
pub const SILENCE_DB: f64 = -96.0;

/// Imaginary parts below this are treated as real roots when pairing.
const REAL_ROOT_TOLERANCE: f64 = 1e-10;

/// Bilinear transform constant `2 * fs` for a design normalised to `fs = 2`.
const BILINEAR_K: f64 = 4.0;

/// Second-order IIR section in direct form I.
///
/// Coefficients are normalised so that `a0 == 1`. A first-order section has `b2 == a2 == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
    x: [f64; 2],
    y: [f64; 2],
}

impl Biquad {
    /// Section from raw numerator and denominator coefficients.
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        Self {
            b: [b[0] / a[0], b[1] / a[0], b[2] / a[0]],
            a: [a[1] / a[0], a[2] / a[0]],
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    /// Process one sample.
    ///
    /// `y[n] = b0 x[n] + b1 x[n-1] + b2 x[n-2] - a1 y[n-1] - a2 y[n-2]`
    pub fn process_sample(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.b[1] * self.x[0] + self.b[2] * self.x[1]
            - self.a[0] * self.y[0]
            - self.a[1] * self.y[1];
        self.x = [input, self.x[0]];
        self.y = [output, self.y[0]];
        output
    }

    /// Clear the delay lines.
    pub fn reset(&mut self) {
        self.x = [0.0; 2];
        self.y = [0.0; 2];
    }

    /// Complex response at `z^-1 = z_inv`.
    fn response(&self, z_inv: Complex64) -> Complex64 {
        let numerator = self.b[0] + z_inv * (self.b[1] + z_inv * self.b[2]);
        let denominator = 1.0 + z_inv * (self.a[0] + z_inv * self.a[1]);
        numerator / denominator
    }
}

/// Zeros, poles and gain of a transfer function.
#[derive(Debug, Clone)]
struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

impl Zpk {
    /// Analog Butterworth low-pass prototype with unit cutoff.
    fn prototype(order: usize) -> Self {
        let n = order as f64;
        let poles = (0..order)
            .map(|k| -Complex64::from_polar(1.0, PI * (2.0 * k as f64 - n + 1.0) / (2.0 * n)))
            .collect();
        Self {
            zeros: Vec::new(),
            poles,
            gain: 1.0,
        }
    }

    fn degree(&self) -> usize {
        self.poles.len() - self.zeros.len()
    }

    /// `prod(-zeros) / prod(-poles)`, the gain correction of the reciprocal transforms.
    fn reciprocal_gain(&self) -> f64 {
        let zeros: Complex64 = self.zeros.iter().map(|&z| -z).product();
        let poles: Complex64 = self.poles.iter().map(|&p| -p).product();
        (zeros / poles).re
    }

    fn to_lowpass(&self, wo: f64) -> Self {
        Self {
            zeros: self.zeros.iter().map(|&z| z * wo).collect(),
            poles: self.poles.iter().map(|&p| p * wo).collect(),
            gain: self.gain * wo.powi(self.degree() as i32),
        }
    }

    fn to_highpass(&self, wo: f64) -> Self {
        let mut zeros: Vec<Complex64> = self.zeros.iter().map(|&z| wo / z).collect();
        zeros.extend(std::iter::repeat_n(Complex64::zero(), self.degree()));
        Self {
            zeros,
            poles: self.poles.iter().map(|&p| wo / p).collect(),
            gain: self.gain * self.reciprocal_gain(),
        }
    }

    /// Each root `r` maps to the pair `r +- sqrt(r^2 - wo^2)`.
    fn split(roots: impl Iterator<Item = Complex64>, wo: f64) -> Vec<Complex64> {
        let (plus, minus): (Vec<_>, Vec<_>) = roots
            .map(|r| {
                let offset = (r * r - wo * wo).sqrt();
                (r + offset, r - offset)
            })
            .unzip();
        plus.into_iter().chain(minus).collect()
    }

    fn to_bandpass(&self, wo: f64, bw: f64) -> Self {
        let mut zeros = Self::split(self.zeros.iter().map(|&z| z * (bw / 2.0)), wo);
        zeros.extend(std::iter::repeat_n(Complex64::zero(), self.degree()));
        Self {
            zeros,
            poles: Self::split(self.poles.iter().map(|&p| p * (bw / 2.0)), wo),
            gain: self.gain * bw.powi(self.degree() as i32),
        }
    }

    fn to_bandstop(&self, wo: f64, bw: f64) -> Self {
        let mut zeros = Self::split(self.zeros.iter().map(|&z| (bw / 2.0) / z), wo);
        let notch = Complex64::new(0.0, wo);
        zeros.extend(std::iter::repeat_n(notch, self.degree()));
        zeros.extend(std::iter::repeat_n(notch.conj(), self.degree()));
        Self {
            zeros,
            poles: Self::split(self.poles.iter().map(|&p| (bw / 2.0) / p), wo),
            gain: self.gain * self.reciprocal_gain(),
        }
    }

    /// Map the analog design to the z-plane; zeros at infinity land on Nyquist.
    fn bilinear(&self) -> Self {
        let map = |&s: &Complex64| (BILINEAR_K + s) / (BILINEAR_K - s);
        let mut zeros: Vec<Complex64> = self.zeros.iter().map(map).collect();
        zeros.extend(std::iter::repeat_n(Complex64::new(-1.0, 0.0), self.degree()));
        let numerator: Complex64 = self.zeros.iter().map(|&z| BILINEAR_K - z).product();
        let denominator: Complex64 = self.poles.iter().map(|&p| BILINEAR_K - p).product();
        Self {
            zeros,
            poles: self.poles.iter().map(map).collect(),
            gain: self.gain * (numerator / denominator).re,
        }
    }
}

/// Real polynomial factors `[1, c1, c2]` of a conjugate-symmetric root set.
///
/// Complex roots give one quadratic per conjugate pair. Real roots are paired smallest with
/// largest; an odd one out becomes the linear factor `[1, -r, 0]`, always last.
fn quadratic_factors(roots: &[Complex64]) -> Vec<[f64; 3]> {
    let mut factors: Vec<[f64; 3]> = roots
        .iter()
        .filter(|r| r.im > REAL_ROOT_TOLERANCE)
        .map(|r| [1.0, -2.0 * r.re, r.norm_sqr()])
        .collect();

    let mut reals: Vec<f64> = roots
        .iter()
        .filter(|r| r.im.abs() <= REAL_ROOT_TOLERANCE)
        .map(|r| r.re)
        .collect();
    reals.sort_by(f64::total_cmp);
    let (mut lo, mut hi) = (0, reals.len());
    while hi - lo >= 2 {
        let (a, b) = (reals[lo], reals[hi - 1]);
        factors.push([1.0, -(a + b), a * b]);
        lo += 1;
        hi -= 1;
    }
    if hi > lo {
        factors.push([1.0, -reals[lo], 0.0]);
    }
    factors
}

/// A cascade of second-order sections forming one Butterworth response.
#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthFilter {
    sections: Vec<Biquad>,
}

impl ButterworthFilter {
    /// Design a filter of `order` for `kind`; `freq_hi` is the upper edge of band filters.
    ///
    /// Cutoffs are assumed to lie strictly between 0 and Nyquist, with `freq < freq_hi`.
    pub fn design(
        kind: FilterKind,
        order: usize,
        freq: f64,
        freq_hi: f64,
        sample_rate: f64,
    ) -> Self {
        let warp = |f: f64| BILINEAR_K * (PI * f / sample_rate).tan();
        let prototype = Zpk::prototype(order);
        let analog = match kind {
            FilterKind::Lowpass => prototype.to_lowpass(warp(freq)),
            FilterKind::Highpass => prototype.to_highpass(warp(freq)),
            FilterKind::Bandpass | FilterKind::Bandstop => {
                let (lo, hi) = (warp(freq), warp(freq_hi));
                let (wo, bw) = ((lo * hi).sqrt(), hi - lo);
                if kind == FilterKind::Bandpass {
                    prototype.to_bandpass(wo, bw)
                } else {
                    prototype.to_bandstop(wo, bw)
                }
            }
        };
        let digital = analog.bilinear();

        let mut sections: Vec<Biquad> = quadratic_factors(&digital.zeros)
            .into_iter()
            .zip(quadratic_factors(&digital.poles))
            .map(|(b, a)| Biquad::new(b, a))
            .collect();
        if let Some(first) = sections.first_mut() {
            first.b.iter_mut().for_each(|b| *b *= digital.gain);
        }
        tracing::trace!(?kind, order, sections = sections.len(), "designed Butterworth filter");
        Self { sections }
    }

    /// Number of cascaded sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Magnitude response at `freq` Hz.
    pub fn magnitude_at(&self, freq: f64, sample_rate: f64) -> f64 {
        let z_inv = Complex64::from_polar(1.0, -2.0 * PI * freq / sample_rate);
        self.sections
            .iter()
            .map(|section| section.response(z_inv).norm())
            .product()
    }

    /// Filter a signal from a zero initial state.
    pub fn process(&mut self, input: &[f64]) -> Vec<f64> {
        self.sections.iter_mut().for_each(Biquad::reset);
        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter_mut()
                    .fold(x, |acc, section| section.process_sample(acc))
            })
            .collect()
    }
}

fn validate_cutoff(name: &'static str, freq: f64, nyquist: f64) -> AudioSpectraResult<()> {
    if !freq.is_finite() || freq <= 0.0 || freq >= nyquist {
        return Err(ParameterError::invalid_value(
            name,
            format!("cutoff must lie strictly between 0 and {nyquist} Hz, got {freq}"),
        )
        .into());
    }
    Ok(())
}

fn clip(sample: f32) -> f32 {
    sample.clamp(-1.0, 1.0)
}

impl AudioProcessing for AudioData {
    fn gain(&self, factor: f32) -> Self {
        Self::from_parts(
            self.samples().mapv(|s| clip(s * factor)),
            self.sample_rate(),
        )
    }

    fn fade(&self, fade_in: usize, fade_out: usize) -> Self {
        let envelope = fade_envelope(self.frames(), fade_in, fade_out);
        let mut samples = self.samples().to_owned();
        for (mut row, &gain) in samples.axis_iter_mut(Axis(0)).zip(envelope.iter()) {
            row.mapv_inplace(|s| s * gain);
        }
        Self::from_parts(samples, self.sample_rate())
    }

    fn trim(&self, start: usize, end: Option<usize>) -> Self {
        let (start, end) = clamp_range(start, end, self.frames());
        Self::from_parts(
            self.samples().slice(s![start..end, ..]).to_owned(),
            self.sample_rate(),
        )
    }

    fn repeat(&self, times: usize) -> AudioSpectraResult<Self> {
        if times == 0 {
            return Err(ParameterError::invalid_value("times", "must be at least 1").into());
        }
        let views = vec![self.samples(); times];
        let samples = concatenate(Axis(0), &views)
            .map_err(|e| ParameterError::invalid_value("times", e.to_string()))?;
        Ok(Self::from_parts(samples, self.sample_rate()))
    }

    fn reverse(&self) -> Self {
        Self::from_parts(
            self.samples().slice(s![..;-1, ..]).to_owned(),
            self.sample_rate(),
        )
    }

    fn pad(&self, before: usize, after: usize) -> Self {
        let mut samples = Array2::<f32>::zeros((before + self.frames() + after, self.channels()));
        samples
            .slice_mut(s![before..before + self.frames(), ..])
            .assign(&self.samples());
        Self::from_parts(samples, self.sample_rate())
    }

    fn normalize(&self, target_db: f64, mode: NormalizationMode) -> Self {
        let current = measure_level(self.samples(), mode);
        if current < SILENCE_THRESHOLD {
            tracing::warn!(?mode, "normalize on silent input, leaving unchanged");
            return self.clone();
        }
        self.gain((db_to_amplitude(target_db) / current) as f32)
    }

    fn filter(
        &self,
        kind: FilterKind,
        freq: f64,
        freq_hi: Option<f64>,
        order: usize,
    ) -> AudioSpectraResult<Self> {
        let upper = kind.require_upper(freq_hi)?;
        if order == 0 {
            return Err(ParameterError::invalid_value("order", "must be at least 1").into());
        }
        let sample_rate = self.sample_rate() as f64;
        let nyquist = sample_rate / 2.0;
        validate_cutoff("freq", freq, nyquist)?;
        if kind.is_band() {
            validate_cutoff("freq_hi", upper, nyquist)?;
            if upper <= freq {
                return Err(ParameterError::invalid_value(
                    "freq_hi",
                    format!("upper edge {upper} Hz must exceed lower edge {freq} Hz"),
                )
                .into());
            }
        }

        let mut filter = ButterworthFilter::design(kind, order, freq, upper, sample_rate);
        let mut samples = Array2::<f32>::zeros(self.samples().raw_dim());
        for (ch, mut column) in samples.axis_iter_mut(Axis(1)).enumerate() {
            let signal: Vec<f64> = self.samples().column(ch).iter().map(|&s| s as f64).collect();
            for (dst, value) in column.iter_mut().zip(filter.process(&signal)) {
                *dst = clip(value as f32);
            }
        }
        Ok(Self::from_parts(samples, self.sample_rate()))
    }

    fn level_track(
        &self,
        window_seconds: f64,
        hop_seconds: f64,
    ) -> AudioSpectraResult<Vec<LevelReading>> {
        for (name, value) in [("window", window_seconds), ("hop", hop_seconds)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::invalid_value(
                    name,
                    format!("must be a positive duration, got {value}"),
                )
                .into());
            }
        }
        let sample_rate = self.sample_rate() as f64;
        let window = ((window_seconds * sample_rate).round() as usize).max(1);
        let hop = ((hop_seconds * sample_rate).round() as usize).max(1);

        let mono = self.as_mono();
        let signal = mono.samples();
        let signal = signal.column(0);

        let floor_db = |linear: f64| amplitude_to_db(linear).max(SILENCE_DB);
        let readings = (0..self.frames())
            .step_by(hop)
            .map(|pos| {
                let segment = signal.slice(s![pos..(pos + window).min(self.frames())]);
                let sum_sq: f64 = segment.iter().map(|&s| (s as f64) * (s as f64)).sum();
                let rms = (sum_sq / segment.len() as f64).sqrt();
                let peak = segment.iter().fold(0.0f64, |m, &s| m.max((s as f64).abs()));
                LevelReading {
                    time_seconds: pos as f64 / sample_rate,
                    rms_db: floor_db(rms),
                    peak_db: floor_db(peak),
                }
            })
            .collect();
        Ok(readings)
    }
}

/// Bring every source to a common channel count, duplicating mono into stereo.
fn align_channels(sources: &[AudioData]) -> AudioSpectraResult<Vec<AudioData>> {
    let channels = sources.iter().map(AudioData::channels).max().unwrap_or(1);
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| match (source.channels(), channels) {
            (c, target) if c == target => Ok(source.clone()),
            (1, 2) => source.as_stereo(),
            (c, target) => Err(CompatibilityError::new(index, "channels", target, c).into()),
        })
        .collect()
}

fn check_sample_rates(sources: &[AudioData]) -> AudioSpectraResult<u32> {
    let Some(first) = sources.first() else {
        return Err(ParameterError::invalid_value("sources", "at least one input is required").into());
    };
    for (index, source) in sources.iter().enumerate().skip(1) {
        if source.sample_rate() != first.sample_rate() {
            return Err(CompatibilityError::new(
                index,
                "sample_rate",
                first.sample_rate(),
                source.sample_rate(),
            )
            .into());
        }
    }
    Ok(first.sample_rate())
}

/// Weighted sum of several signals, zero-padded to the longest and clipped.
///
/// Weights default to `1 / N` each. Mono sources are duplicated when mixed with stereo.
///
/// # Errors
/// Fails on an empty source list, a weight count that does not match the sources, differing
/// sample rates, or channel counts that cannot be reconciled.
pub fn mix(sources: &[AudioData], weights: Option<&[f64]>) -> AudioSpectraResult<AudioData> {
    let sample_rate = check_sample_rates(sources)?;
    let weights: Vec<f64> = match weights {
        Some(w) if w.len() != sources.len() => {
            return Err(ParameterError::invalid_value(
                "weights",
                format!("got {} weights for {} inputs", w.len(), sources.len()),
            )
            .into());
        }
        Some(w) => w.to_vec(),
        None => vec![1.0 / sources.len() as f64; sources.len()],
    };

    let aligned = align_channels(sources)?;
    let frames = aligned.iter().map(AudioData::frames).max().unwrap_or(0);
    let channels = aligned.first().map_or(1, AudioData::channels);

    let mut acc = Array2::<f32>::zeros((frames, channels));
    for (source, &weight) in aligned.iter().zip(weights.iter()) {
        acc.slice_mut(s![..source.frames(), ..])
            .zip_mut_with(&source.samples(), |a, &s| *a += s * weight as f32);
    }
    acc.mapv_inplace(clip);
    Ok(AudioData::from_parts(acc, sample_rate))
}

/// Join signals end to end. Mono sources are duplicated when joined with stereo.
///
/// # Errors
/// Fails on an empty list, differing sample rates, or irreconcilable channel counts.
pub fn concat(sources: &[AudioData]) -> AudioSpectraResult<AudioData> {
    let sample_rate = check_sample_rates(sources)?;
    let aligned = align_channels(sources)?;
    let views: Vec<_> = aligned.iter().map(AudioData::samples).collect();
    let samples = concatenate(Axis(0), &views)
        .map_err(|e| ParameterError::invalid_value("sources", e.to_string()))?;
    Ok(AudioData::from_parts(samples, sample_rate))
}
