use audio_spectra::operations::transforms::forward;
use audio_spectra::utils::generation::{compound_tone, sine_wave};
use audio_spectra::{
    AudioSpectraError, DecomposeConfig, HarmonicMode, SpectralDecomposition, SpectralFrame,
    StftParams, WindowType, join,
};

fn chord() -> SpectralFrame {
    let audio = compound_tone(&[(250.0, 0.3), (437.5, 0.3)], 1.0, 16000).unwrap();
    forward(&audio, &StftParams::with(2048, 512, WindowType::Hann)).unwrap()
}

#[test]
fn decompose_then_join_is_exact() {
    let frame = chord();
    let parts = frame.decompose(&DecomposeConfig::new()).unwrap();
    assert!(!parts.is_empty());
    assert!(parts.remainder.is_some());

    let frames = parts.into_frames();
    assert!(frames.iter().all(|f| f.frames() == frame.frames()));
    let rebuilt = join(&frames, true).unwrap();
    assert_eq!(rebuilt.data(), frame.data());
    assert_eq!(rebuilt.original_frame_count(), frame.original_frame_count());
}

#[test]
fn component_masks_are_disjoint() {
    let frame = chord();
    let parts = frame.decompose(&DecomposeConfig::new()).unwrap();

    for (i, a) in parts.components.iter().enumerate() {
        for b in &parts.components[i + 1..] {
            assert!(a.mask.is_disjoint(&b.mask));
        }
    }
    let fundamentals: Vec<f64> = parts.components.iter().map(|c| c.fundamental_hz).collect();
    let mut sorted = fundamentals.clone();
    sorted.sort_by(f64::total_cmp);
    assert_eq!(fundamentals, sorted);
}

#[test]
fn fundamental_only_mode_still_reconstructs() {
    let frame = chord();
    let config = DecomposeConfig::new().harmonic_mode(HarmonicMode::FundamentalOnly);
    let parts = frame.decompose(&config).unwrap();
    let rebuilt = join(&parts.into_frames(), true).unwrap();
    assert_eq!(rebuilt.data(), frame.data());
}

#[test]
fn silence_yields_empty_result() {
    let audio = sine_wave(440.0, 0.5, 16000, 0.0).unwrap();
    let frame = forward(&audio, &StftParams::new()).unwrap();
    let parts = frame.decompose(&DecomposeConfig::new()).unwrap();
    assert!(parts.is_empty());
    assert!(parts.remainder.is_none());
}

#[test]
fn join_names_mismatched_fft_size() {
    let audio = sine_wave(440.0, 0.5, 16000, 0.5).unwrap();
    let a = forward(&audio, &StftParams::with(2048, 512, WindowType::Hann)).unwrap();
    let b = forward(&audio, &StftParams::with(1024, 512, WindowType::Hann)).unwrap();

    match join(&[a, b], false) {
        Err(AudioSpectraError::Compatibility(err)) => {
            assert_eq!(err.field, "fft_size");
            assert_eq!(err.index, 1);
            assert!(err.to_string().contains("fft_size"));
        }
        other => panic!("expected compatibility error, got {other:?}"),
    }
}

#[test]
fn join_pads_in_lenient_mode_only() {
    let short = forward(
        &sine_wave(440.0, 0.25, 16000, 0.5).unwrap(),
        &StftParams::new(),
    )
    .unwrap();
    let long = forward(
        &sine_wave(440.0, 0.5, 16000, 0.5).unwrap(),
        &StftParams::new(),
    )
    .unwrap();

    assert!(join(&[short.clone(), long.clone()], true).is_err());

    let joined = join(&[short, long.clone()], false).unwrap();
    assert_eq!(joined.frames(), long.frames());
    assert_eq!(joined.original_frame_count(), long.original_frame_count());
}
