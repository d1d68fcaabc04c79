//! Per-frame dominant pitch tracking on spectral frames.
//!
//! Each frame's magnitudes are averaged across channels and the strongest bin inside the
//! search band is reported as that frame's pitch. This is a peak-bin estimator: its
//! resolution is one bin (`sample_rate / fft_size` Hz) and it follows the loudest partial,
//! which is not always the perceived fundamental.

use ndarray::{Axis, s};

use super::traits::SpectralAnalysis;
use super::types::PitchEstimate;
use crate::repr::SpectralFrame;
use crate::utils::audio_math::{hz_to_midi, midi_to_note};
use crate::{AudioSpectraResult, ParameterError};

impl SpectralAnalysis for SpectralFrame {
    fn pitch_track(&self, fmin: f64, fmax: f64) -> AudioSpectraResult<Vec<PitchEstimate>> {
        if !fmin.is_finite() || !fmax.is_finite() || fmin < 0.0 || fmax <= fmin {
            return Err(ParameterError::invalid_value(
                "fmax",
                format!("search band must satisfy 0 <= fmin < fmax, got {fmin}..{fmax}"),
            )
            .into());
        }

        let resolution = self.sample_rate() as f64 / self.fft_size() as f64;
        let bin_min = (fmin / resolution).ceil() as usize;
        let bin_max = ((fmax / resolution).floor() as usize).min(self.bins() - 1);
        if bin_min > bin_max {
            return Err(ParameterError::invalid_value(
                "fmax",
                format!("band {fmin}..{fmax} Hz contains no bins at {resolution} Hz resolution"),
            )
            .into());
        }

        let magnitudes = self.magnitudes();
        let mean = magnitudes
            .mean_axis(Axis(0))
            .ok_or_else(|| ParameterError::invalid_value("channels", "must be at least 1"))?;
        let band = mean.slice(s![.., bin_min..=bin_max]);

        let hop_seconds = self.hop_length() as f64 / self.sample_rate() as f64;
        let estimates = band
            .outer_iter()
            .enumerate()
            .map(|(frame, row)| {
                let (offset, peak) = row
                    .iter()
                    .enumerate()
                    .fold((0, 0.0f32), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
                let frequency_hz = if peak > 0.0 {
                    (bin_min + offset) as f64 * resolution
                } else {
                    0.0
                };
                let midi = (frequency_hz > 0.0).then(|| hz_to_midi(frequency_hz));
                PitchEstimate {
                    time_seconds: frame as f64 * hop_seconds,
                    frequency_hz,
                    midi,
                    note: midi.map(|m| midi_to_note(m.round_ties_even() as i32)),
                }
            })
            .collect();
        Ok(estimates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::transforms::forward;
    use crate::utils::generation::{silence, sine_wave};
    use crate::{StftParams, WindowType};
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_pitch_track_sine() {
        // 437.5 Hz is exactly bin 56 at 16000 / 2048.
        let audio = sine_wave(437.5, 0.5, 16000, 0.5).unwrap();
        let frame = forward(&audio, &StftParams::with(2048, 512, WindowType::Hann)).unwrap();
        let track = frame.pitch_track(50.0, 2000.0).unwrap();

        assert_eq!(track.len(), frame.frames());
        let middle = &track[track.len() / 2];
        assert_approx_eq!(middle.frequency_hz, 437.5, 1e-9);
        assert_eq!(middle.note.as_deref(), Some("A4"));
        assert_approx_eq!(track[1].time_seconds, 512.0 / 16000.0, 1e-12);
    }

    #[test]
    fn test_pitch_track_silence_has_no_note() {
        let audio = silence(0.1, 8000).unwrap();
        let frame = forward(&audio, &StftParams::with(256, 64, WindowType::Hann)).unwrap();
        let track = frame.pitch_track(50.0, 1000.0).unwrap();
        assert!(track.iter().all(|p| p.frequency_hz == 0.0 && p.midi.is_none() && p.note.is_none()));
    }

    #[test]
    fn test_pitch_track_band_validation() {
        let audio = silence(0.1, 8000).unwrap();
        let frame = forward(&audio, &StftParams::with(256, 64, WindowType::Hann)).unwrap();
        assert!(frame.pitch_track(500.0, 100.0).is_err());
        assert!(frame.pitch_track(-1.0, 100.0).is_err());
        // 31.25 Hz bins: nothing between 40 and 60 Hz.
        assert!(frame.pitch_track(40.0, 60.0).is_err());
    }
}
