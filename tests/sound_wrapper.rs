use audio_spectra::utils::generation::{compound_tone, sine_wave};
use audio_spectra::{FilterKind, NormalizationMode, Sound, StftParams, WindowType};

fn tone(freq: f64) -> Sound {
    Sound::from_audio(sine_wave(freq, 0.5, 16000, 0.5).unwrap())
        .with_params(StftParams::with(1024, 256, WindowType::Hann))
}

fn peak(sound: &Sound) -> f32 {
    sound
        .audio()
        .samples()
        .iter()
        .fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn operators_never_modify_the_receiver() {
    let sound = tone(440.0);
    let before = sound.audio().clone();
    let _ = sound.gain(0.1).reverse().fade(0.1, 0.1);
    let _ = sound.transpose(7.0).unwrap();
    assert_eq!(sound.audio(), &before);
}

#[test]
fn filter_runs_in_either_domain() {
    let chord = compound_tone(&[(300.0, 0.4), (4000.0, 0.4)], 0.5, 16000).unwrap();
    let sound = Sound::from_audio(chord).with_params(StftParams::with(1024, 256, WindowType::Hann));

    let time_filtered = sound
        .filter(FilterKind::Lowpass, 1000.0, None, None)
        .unwrap();
    assert!(!time_filtered.is_spectral());

    sound.spectral().unwrap();
    let spectral_filtered = sound
        .filter(FilterKind::Lowpass, 1000.0, None, None)
        .unwrap();
    assert!(spectral_filtered.is_spectral());

    for filtered in [&time_filtered, &spectral_filtered] {
        let track = filtered.pitch_track(100.0, 6000.0).unwrap();
        let middle = &track[track.len() / 2];
        assert!((middle.frequency_hz - 300.0).abs() < 20.0);
    }
}

#[test]
fn band_filter_requires_upper_edge_in_both_domains() {
    let sound = tone(440.0);
    assert!(sound.filter(FilterKind::Bandpass, 200.0, None, None).is_err());
    let spectral = Sound::from_spectral(sound.spectral().unwrap().clone());
    assert!(spectral.filter(FilterKind::Bandstop, 200.0, None, None).is_err());
}

#[test]
fn normalize_reaches_target_peak() {
    let sound = tone(440.0);
    let normalized = sound.normalize(-6.0, NormalizationMode::Peak);
    let target = 10f32.powf(-6.0 / 20.0);
    assert!((peak(&normalized) - target).abs() < 1e-3);
}

#[test]
fn stretch_and_pad_change_duration() {
    let sound = tone(440.0);
    let slower = sound.stretch(2.0).unwrap();
    assert!((slower.duration_seconds() - 1.0).abs() < 1e-6);
    assert_eq!(slower.audio().frames(), 16000);

    let padded = sound.pad(0.25, 0.25);
    assert!(!padded.is_spectral());
    assert_eq!(padded.audio().frames(), 16000);
}

#[test]
fn rms_track_reports_sine_level() {
    let sound = tone(440.0);
    let readings = sound.rms(0.1, None).unwrap();
    assert!(!readings.is_empty());
    // RMS of a 0.5 amplitude sine is 0.5 / sqrt(2), about -9.03 dBFS.
    let first = &readings[0];
    assert!((first.rms_db + 9.03).abs() < 0.1);
    assert!((first.peak_db + 6.02).abs() < 0.1);
}
