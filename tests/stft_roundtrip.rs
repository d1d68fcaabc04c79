use audio_spectra::operations::transforms::{forward, inverse};
use audio_spectra::utils::generation::{compound_tone, sine_wave};
use audio_spectra::{AudioData, StftParams, WindowType};
use ndarray::Array2;

fn max_abs_error(a: &AudioData, b: &AudioData) -> f32 {
    a.samples()
        .iter()
        .zip(b.samples().iter())
        .fold(0.0f32, |m, (x, y)| m.max((x - y).abs()))
}

#[test]
fn sine_reconstructs_within_tolerance() {
    let audio = sine_wave(440.0, 1.0, 16000, 0.8).unwrap();
    let frame = forward(&audio, &StftParams::with(2048, 512, WindowType::Hann)).unwrap();
    let restored = inverse(&frame);

    assert_eq!(restored.frames(), audio.frames());
    assert_eq!(restored.sample_rate(), 16000);
    assert!(max_abs_error(&audio, &restored) < 1e-3);
}

#[test]
fn frame_count_and_metadata() {
    let audio = sine_wave(440.0, 1.0, 16000, 0.5).unwrap();
    let frame = forward(&audio, &StftParams::with(2048, 512, WindowType::Hann)).unwrap();

    // ceil(16000 / 512) + 1
    assert_eq!(frame.frames(), 33);
    assert_eq!(frame.bins(), 1025);
    assert_eq!(frame.original_frame_count(), 16000);
    assert_eq!(frame.window(), WindowType::Hann);
}

#[test]
fn stereo_channels_are_independent() {
    let left = compound_tone(&[(300.0, 0.4)], 0.5, 8000).unwrap();
    let right = compound_tone(&[(1200.0, 0.2)], 0.5, 8000).unwrap();
    let mut samples = Array2::<f32>::zeros((left.frames(), 2));
    samples.column_mut(0).assign(&left.samples().column(0));
    samples.column_mut(1).assign(&right.samples().column(0));
    let stereo = AudioData::new(samples, 8000).unwrap();

    let frame = forward(&stereo, &StftParams::with(512, 128, WindowType::Hamming)).unwrap();
    assert_eq!(frame.channels(), 2);

    let restored = inverse(&frame);
    assert_eq!(restored.channels(), 2);
    assert!(max_abs_error(&stereo, &restored) < 1e-3);
}

#[test]
fn odd_lengths_are_restored_exactly_in_length() {
    let samples: Vec<f32> = (0..1001).map(|i| ((i as f32) * 0.05).sin() * 0.3).collect();
    let audio = AudioData::new_mono(samples, 8000).unwrap();
    let frame = forward(&audio, &StftParams::with(256, 64, WindowType::Hann)).unwrap();
    let restored = inverse(&frame);

    assert_eq!(restored.frames(), 1001);
    assert!(max_abs_error(&audio, &restored) < 1e-3);
}

#[test]
fn invalid_parameters_are_rejected() {
    let audio = sine_wave(440.0, 0.1, 8000, 0.5).unwrap();
    assert!(forward(&audio, &StftParams::with(0, 0, WindowType::Hann)).is_err());
    assert!(forward(&audio, &StftParams::with(255, 64, WindowType::Hann)).is_err());
    assert!(forward(&audio, &StftParams::with(256, 512, WindowType::Hann)).is_err());
}
