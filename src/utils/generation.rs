//! Audio signal generation utilities.
//!
//! Deterministic test and synthesis signals, all returned as mono [`AudioData`].

use std::f64::consts::TAU;

use crate::repr::AudioData;
use crate::{AudioSpectraResult, ParameterError};

fn sample_count(duration_seconds: f64, sample_rate: u32) -> AudioSpectraResult<usize> {
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(ParameterError::invalid_value(
            "duration",
            format!("must be a non-negative number of seconds, got {duration_seconds}"),
        )
        .into());
    }
    Ok((duration_seconds * sample_rate as f64).round() as usize)
}

/// Generates a sine wave `amplitude * sin(2 * pi * f * t)`.
///
/// # Errors
/// Returns a [`ParameterError`] for a zero sample rate or a negative duration.
pub fn sine_wave(
    frequency: f64,
    duration_seconds: f64,
    sample_rate: u32,
    amplitude: f64,
) -> AudioSpectraResult<AudioData> {
    compound_tone(&[(frequency, amplitude)], duration_seconds, sample_rate)
}

/// Generates the sum of several sinusoids given as `(frequency, amplitude)` pairs.
pub fn compound_tone(
    partials: &[(f64, f64)],
    duration_seconds: f64,
    sample_rate: u32,
) -> AudioSpectraResult<AudioData> {
    let count = sample_count(duration_seconds, sample_rate)?;
    let sr = sample_rate as f64;
    let samples = (0..count)
        .map(|i| {
            let t = i as f64 / sr;
            partials
                .iter()
                .map(|&(f, a)| a * (TAU * f * t).sin())
                .sum::<f64>() as f32
        })
        .collect();
    AudioData::new_mono(samples, sample_rate)
}

/// Generates a harmonic tone: `amplitude / n` on every multiple `n * fundamental` up to `harmonics`.
pub fn harmonic_tone(
    fundamental: f64,
    harmonics: usize,
    duration_seconds: f64,
    sample_rate: u32,
    amplitude: f64,
) -> AudioSpectraResult<AudioData> {
    let partials: Vec<(f64, f64)> = (1..=harmonics)
        .map(|n| (fundamental * n as f64, amplitude / n as f64))
        .collect();
    compound_tone(&partials, duration_seconds, sample_rate)
}

/// Generates digital silence.
pub fn silence(duration_seconds: f64, sample_rate: u32) -> AudioSpectraResult<AudioData> {
    let count = sample_count(duration_seconds, sample_rate)?;
    AudioData::new_mono(vec![0.0; count], sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_sine_wave_values() {
        let audio = sine_wave(1000.0, 0.01, 8000, 0.5).unwrap();
        assert_eq!(audio.frames(), 80);
        assert_eq!(audio.channels(), 1);
        // Quarter period at 1 kHz / 8 kHz is sample 2.
        assert_approx_eq!(audio.samples()[[2, 0]] as f64, 0.5, 1e-6);
    }

    #[test]
    fn test_harmonic_tone_peak_bounded() {
        let audio = harmonic_tone(100.0, 4, 0.1, 8000, 0.4).unwrap();
        let peak = audio.samples().iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.4 * (1.0 + 0.5 + 1.0 / 3.0 + 0.25) + 1e-6);
    }

    #[test]
    fn test_generation_rejects_negative_duration() {
        assert!(silence(-1.0, 8000).is_err());
        assert!(sine_wave(440.0, 1.0, 0, 0.5).is_err());
    }
}
