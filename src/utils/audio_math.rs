//! Audio mathematics utilities and conversion functions.
//!
//! Small, pure helpers shared by the spectral operators: decibel conversions, pitch and
//! note conversions, and the bin-frequency axis of an STFT.
//!
//! # Examples
//!
//! ```rust
//! use audio_spectra::utils::audio_math::{amplitude_to_db, hz_to_midi, midi_to_note};
//!
//! let db = amplitude_to_db(0.5); // -6.02 dB
//! let midi = hz_to_midi(440.0); // 69.0
//! assert_eq!(midi_to_note(69), "A4");
//! # assert!((db + 6.0206).abs() < 1e-3);
//! # assert!((midi - 69.0).abs() < 1e-12);
//! ```

// =============================================================================
// AMPLITUDE CONVERSIONS
// =============================================================================

/// Converts linear amplitude to decibels.
///
/// Uses `dB = 20 * log10(amplitude)`. Zero or negative amplitudes map to negative infinity;
/// callers that need a floor apply it themselves.
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        20.0 * amplitude.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Converts linear amplitude to decibels with a lower bound on the amplitude.
///
/// Computes `20 * log10(max(amplitude, floor))`, which keeps silence finite.
pub fn amplitude_to_db_floored(amplitude: f64, floor: f64) -> f64 {
    20.0 * amplitude.max(floor).log10()
}

/// Converts decibels to linear amplitude using `amplitude = 10^(dB / 20)`.
///
/// ```rust
/// use audio_spectra::utils::audio_math::db_to_amplitude;
///
/// assert!((db_to_amplitude(-20.0) - 0.1).abs() < 1e-12);
/// assert_eq!(db_to_amplitude(0.0), 1.0);
/// ```
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

// =============================================================================
// PITCH CONVERSIONS
// =============================================================================

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Converts frequency in Hz to a (fractional) MIDI note number.
///
/// `midi = 69 + 12 * log2(freq / 440)`
pub fn hz_to_midi(freq_hz: f64) -> f64 {
    69.0 + 12.0 * (freq_hz / 440.0).log2()
}

/// Converts a MIDI note number to frequency in Hz.
pub fn midi_to_hz(midi_note: f64) -> f64 {
    440.0 * 2f64.powf((midi_note - 69.0) / 12.0)
}

/// Converts a MIDI note number to its sharp-notation name with octave, e.g. `"C#3"`.
///
/// Octaves follow scientific pitch notation, so MIDI 60 is `"C4"` and MIDI 0 is `"C-1"`.
pub fn midi_to_note(midi_note: i32) -> String {
    let octave = midi_note.div_euclid(12) - 1;
    let name = NOTE_NAMES[midi_note.rem_euclid(12) as usize];
    format!("{name}{octave}")
}

/// Frequency ratio for a shift of `semitones` in twelve-tone equal temperament.
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    2f64.powf(semitones / 12.0)
}

// =============================================================================
// FREQUENCY AXIS
// =============================================================================

/// Centre frequencies of the `n_fft / 2 + 1` bins of a real FFT.
///
/// ```rust
/// use audio_spectra::utils::audio_math::fft_frequencies;
///
/// let freqs = fft_frequencies(1024, 44100.0);
/// assert_eq!(freqs.len(), 513);
/// assert_eq!(freqs[0], 0.0);
/// assert_eq!(freqs[512], 22050.0);
/// ```
pub fn fft_frequencies(n_fft: usize, sample_rate: f64) -> Vec<f64> {
    let resolution = sample_rate / n_fft as f64;
    (0..n_fft / 2 + 1).map(|k| k as f64 * resolution).collect()
}

/// Evenly spaced values from `start` to `end` inclusive.
///
/// A single point yields `[start]`, like the usual `linspace` convention.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}
