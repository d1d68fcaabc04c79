//! Dual-domain sound values with lazy conversion.
//!
//! A [`Sound`] is created from either a time-domain [`AudioData`] or a [`SpectralFrame`].
//! The other representation is computed on first access with
//! [`forward`] or [`inverse`] and cached inside that `Sound`, so each instance pays for
//! at most one conversion.
//!
//! Operators fall into two groups:
//!
//! - **Domain-preserving** ([`gain`](Sound::gain), [`fade`](Sound::fade),
//!   [`trim`](Sound::trim), [`repeat`](Sound::repeat), [`reverse`](Sound::reverse),
//!   [`filter`](Sound::filter), [`normalize`](Sound::normalize)) run in the spectral domain
//!   whenever a spectral frame is already available, primary or cached, and in the time
//!   domain otherwise.
//! - **Spectral-only** ([`transpose`](Sound::transpose), [`gate`](Sound::gate),
//!   [`denoise`](Sound::denoise), [`stretch`](Sound::stretch), [`morph`](Sound::morph),
//!   [`decompose`](Sound::decompose)) materialise the spectral frame first.
//!
//! Every operator returns a new `Sound`; the receiver is never modified apart from filling
//! its conversion cache. Time arguments are given in seconds and resolved to samples or
//! frames for whichever domain the operator runs in.
//!
//! # Examples
//!
//! ```rust
//! use audio_spectra::Sound;
//! use audio_spectra::utils::generation::sine_wave;
//!
//! let tone = Sound::from_audio(sine_wave(440.0, 0.5, 16000, 0.5).unwrap());
//! let shifted = tone.transpose(12.0).unwrap().gain(0.5);
//!
//! assert!(shifted.is_spectral());
//! assert_eq!(shifted.sample_rate(), 16000);
//! let audio = shifted.audio();
//! assert_eq!(audio.frames(), 8000);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::ops::Mul;
use std::path::Path;
use std::sync::OnceLock;

use crate::operations::decomposition::Decomposition;
use crate::operations::time_domain;
use crate::operations::transforms::{forward, inverse};
use crate::operations::{
    AudioProcessing, DecomposeConfig, FilterKind, LevelReading, NormalizationMode,
    PitchEstimate, SpectralAnalysis, SpectralDecomposition, SpectralEditing, SpectralProcessing,
    SpectralResampling, StftParams,
};
use crate::repr::{AudioData, SpectralFrame};
use crate::serialization::{Payload, WireFormat, raw_audio, read_payload_as, spx};
use crate::{AudioSpectraError, AudioSpectraResult};

/// Butterworth order used when a time-domain filter is not given one.
pub const DEFAULT_FILTER_ORDER: usize = 4;

#[derive(Debug, Clone)]
enum Representation {
    Time {
        audio: AudioData,
        spectral: OnceLock<SpectralFrame>,
    },
    Frequency {
        frame: SpectralFrame,
        audio: OnceLock<AudioData>,
    },
}

/// Borrowed view of whichever representation an operator should run on.
enum Materialized<'a> {
    Time(&'a AudioData),
    Frequency(&'a SpectralFrame),
}

/// An audio signal held in one domain and lazily available in the other.
#[derive(Debug, Clone)]
pub struct Sound {
    repr: Representation,
    params: StftParams,
    name: Option<String>,
}

impl Sound {
    /// Wrap time-domain audio. Spectral access uses [`StftParams::default`] unless
    /// [`with_params`](Self::with_params) says otherwise.
    pub fn from_audio(audio: AudioData) -> Self {
        Self {
            repr: Representation::Time {
                audio,
                spectral: OnceLock::new(),
            },
            params: StftParams::default(),
            name: None,
        }
    }

    /// Wrap a spectral frame. Its own framing parameters are used for any re-analysis.
    pub fn from_spectral(frame: SpectralFrame) -> Self {
        let params = frame.params();
        Self {
            repr: Representation::Frequency {
                frame,
                audio: OnceLock::new(),
            },
            params,
            name: None,
        }
    }

    /// Set the STFT parameters used when a spectral frame has to be computed.
    ///
    /// Any cached spectral frame of a time-domain sound is discarded.
    pub fn with_params(mut self, params: StftParams) -> Self {
        if let Representation::Time { spectral, .. } = &mut self.repr {
            *spectral = OnceLock::new();
        }
        self.params = params;
        self
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// STFT parameters used for lazy analysis.
    pub const fn params(&self) -> StftParams {
        self.params
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        match &self.repr {
            Representation::Time { audio, .. } => audio.sample_rate(),
            Representation::Frequency { frame, .. } => frame.sample_rate(),
        }
    }

    /// Channel count.
    pub fn channels(&self) -> usize {
        match &self.repr {
            Representation::Time { audio, .. } => audio.channels(),
            Representation::Frequency { frame, .. } => frame.channels(),
        }
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        match &self.repr {
            Representation::Time { audio, .. } => audio.duration_seconds(),
            Representation::Frequency { frame, .. } => frame.duration_seconds(),
        }
    }

    /// Whether the primary representation is spectral.
    pub const fn is_spectral(&self) -> bool {
        matches!(self.repr, Representation::Frequency { .. })
    }

    /// Whether a spectral frame is available without computing one.
    pub fn has_spectral(&self) -> bool {
        match &self.repr {
            Representation::Time { spectral, .. } => spectral.get().is_some(),
            Representation::Frequency { .. } => true,
        }
    }

    /// Whether time-domain audio is available without computing it.
    pub fn has_audio(&self) -> bool {
        match &self.repr {
            Representation::Time { .. } => true,
            Representation::Frequency { audio, .. } => audio.get().is_some(),
        }
    }

    /// Time-domain samples, synthesised from the spectral frame on first access.
    pub fn audio(&self) -> &AudioData {
        match &self.repr {
            Representation::Time { audio, .. } => audio,
            Representation::Frequency { frame, audio } => audio.get_or_init(|| inverse(frame)),
        }
    }

    /// Spectral frame, analysed from the audio on first access.
    ///
    /// # Errors
    /// Fails if the sound's [`StftParams`] are invalid.
    pub fn spectral(&self) -> AudioSpectraResult<&SpectralFrame> {
        match &self.repr {
            Representation::Frequency { frame, .. } => Ok(frame),
            Representation::Time { audio, spectral } => {
                if let Some(frame) = spectral.get() {
                    return Ok(frame);
                }
                let frame = forward(audio, &self.params)?;
                Ok(spectral.get_or_init(|| frame))
            }
        }
    }

    /// Convert into the primary representation as a wire payload.
    pub fn into_payload(self) -> Payload {
        match self.repr {
            Representation::Time { audio, .. } => Payload::Audio(audio),
            Representation::Frequency { frame, .. } => Payload::Spectral(frame),
        }
    }

    fn materialized(&self) -> Materialized<'_> {
        match &self.repr {
            Representation::Frequency { frame, .. } => Materialized::Frequency(frame),
            Representation::Time { audio, spectral } => match spectral.get() {
                Some(frame) => Materialized::Frequency(frame),
                None => Materialized::Time(audio),
            },
        }
    }

    fn derive_audio(&self, audio: AudioData) -> Self {
        Self {
            repr: Representation::Time {
                audio,
                spectral: OnceLock::new(),
            },
            params: self.params,
            name: self.name.clone(),
        }
    }

    fn derive_spectral(&self, frame: SpectralFrame) -> Self {
        Self {
            repr: Representation::Frequency {
                frame,
                audio: OnceLock::new(),
            },
            params: self.params,
            name: self.name.clone(),
        }
    }

    // Domain-preserving operators

    /// Multiply by `factor`. Time-domain results are clipped.
    pub fn gain(&self, factor: f32) -> Self {
        match self.materialized() {
            Materialized::Frequency(frame) => {
                self.derive_spectral(SpectralProcessing::gain(frame, factor))
            }
            Materialized::Time(audio) => self.derive_audio(AudioProcessing::gain(audio, factor)),
        }
    }

    /// Linear fade-in and fade-out, lengths in seconds.
    pub fn fade(&self, fade_in: f64, fade_out: f64) -> Self {
        match self.materialized() {
            Materialized::Frequency(frame) => self.derive_spectral(SpectralEditing::fade(
                frame,
                frame.seconds_to_frame(fade_in),
                frame.seconds_to_frame(fade_out),
            )),
            Materialized::Time(audio) => self.derive_audio(AudioProcessing::fade(
                audio,
                audio.seconds_to_samples(fade_in),
                audio.seconds_to_samples(fade_out),
            )),
        }
    }

    /// Keep `start..end` seconds; `None` keeps everything after `start`.
    pub fn trim(&self, start: f64, end: Option<f64>) -> Self {
        match self.materialized() {
            Materialized::Frequency(frame) => self.derive_spectral(frame.trim_seconds(start, end)),
            Materialized::Time(audio) => self.derive_audio(audio.trim(
                audio.seconds_to_samples(start),
                end.map(|e| audio.seconds_to_samples(e)),
            )),
        }
    }

    /// Play the sound `times` times back to back.
    ///
    /// # Errors
    /// `times` must be at least 1.
    pub fn repeat(&self, times: usize) -> AudioSpectraResult<Self> {
        Ok(match self.materialized() {
            Materialized::Frequency(frame) => {
                self.derive_spectral(SpectralEditing::repeat(frame, times)?)
            }
            Materialized::Time(audio) => self.derive_audio(AudioProcessing::repeat(audio, times)?),
        })
    }

    /// Reverse in time.
    pub fn reverse(&self) -> Self {
        match self.materialized() {
            Materialized::Frequency(frame) => {
                self.derive_spectral(SpectralEditing::reverse(frame))
            }
            Materialized::Time(audio) => self.derive_audio(AudioProcessing::reverse(audio)),
        }
    }

    /// Lowpass, highpass, bandpass or bandstop filter.
    ///
    /// Spectral sounds get a brick-wall bin mask; time-domain sounds get a Butterworth
    /// filter of the given `order` ([`DEFAULT_FILTER_ORDER`] if `None`).
    ///
    /// # Errors
    /// Band filters require `freq_hi`; the time-domain filter also validates the order and
    /// cutoffs.
    pub fn filter(
        &self,
        kind: FilterKind,
        freq: f64,
        freq_hi: Option<f64>,
        order: Option<usize>,
    ) -> AudioSpectraResult<Self> {
        Ok(match self.materialized() {
            Materialized::Frequency(frame) => {
                self.derive_spectral(SpectralProcessing::filter(frame, kind, freq, freq_hi)?)
            }
            Materialized::Time(audio) => self.derive_audio(AudioProcessing::filter(
                audio,
                kind,
                freq,
                freq_hi,
                order.unwrap_or(DEFAULT_FILTER_ORDER),
            )?),
        })
    }

    /// Scale to a peak or RMS level of `target_db` dBFS.
    pub fn normalize(&self, target_db: f64, mode: NormalizationMode) -> Self {
        match self.materialized() {
            Materialized::Frequency(frame) => {
                self.derive_spectral(SpectralProcessing::normalize(frame, target_db, mode))
            }
            Materialized::Time(audio) => {
                self.derive_audio(AudioProcessing::normalize(audio, target_db, mode))
            }
        }
    }

    /// Add `before` and `after` seconds of silence. Always produces a time-domain sound.
    pub fn pad(&self, before: f64, after: f64) -> Self {
        let audio = self.audio();
        self.derive_audio(audio.pad(
            audio.seconds_to_samples(before),
            audio.seconds_to_samples(after),
        ))
    }

    // Spectral-only operators

    /// Shift pitch by `semitones`.
    pub fn transpose(&self, semitones: f64) -> AudioSpectraResult<Self> {
        Ok(self.derive_spectral(self.spectral()?.transpose(semitones)))
    }

    /// Zero every bin quieter than `threshold_db`.
    pub fn gate(&self, threshold_db: f64) -> AudioSpectraResult<Self> {
        Ok(self.derive_spectral(self.spectral()?.gate(threshold_db)))
    }

    /// Spectral subtraction using `noise_start..noise_end` seconds as the noise profile.
    pub fn denoise(
        &self,
        noise_start: f64,
        noise_end: f64,
        oversubtract: f64,
    ) -> AudioSpectraResult<Self> {
        let frame = self.spectral()?;
        Ok(self.derive_spectral(frame.denoise(
            frame.seconds_to_frame(noise_start),
            frame.seconds_to_frame(noise_end),
            oversubtract,
        )))
    }

    /// Change duration by `factor` without changing pitch.
    pub fn stretch(&self, factor: f64) -> AudioSpectraResult<Self> {
        Ok(self.derive_spectral(self.spectral()?.stretch(factor)?))
    }

    /// Cross-fade from this sound into `other`.
    ///
    /// `other` is analysed with its own parameters; both frames must agree on FFT size, hop,
    /// channel count and sample rate.
    pub fn morph(
        &self,
        other: &Sound,
        blend_start: f64,
        blend_end: f64,
    ) -> AudioSpectraResult<Self> {
        let morphed = self
            .spectral()?
            .morph(other.spectral()?, blend_start, blend_end)?;
        Ok(self.derive_spectral(morphed))
    }

    /// Split into one sound per detected note, named by fundamental (`"220.0Hz"`), plus a
    /// `"remainder"` sound when the config asks for it.
    ///
    /// An empty vector means no fundamentals were found.
    pub fn decompose(&self, config: &DecomposeConfig) -> AudioSpectraResult<Vec<Sound>> {
        let Decomposition {
            components,
            remainder,
        } = self.spectral()?.decompose(config)?;

        let mut parts: Vec<Sound> = components
            .into_iter()
            .map(|c| {
                let name = format!("{:.1}Hz", c.fundamental_hz);
                self.derive_spectral(c.frame).with_name(name)
            })
            .collect();
        if let Some(frame) = remainder {
            parts.push(self.derive_spectral(frame).with_name("remainder"));
        }
        Ok(parts)
    }

    // Analysis

    /// Dominant pitch of every spectral frame within `fmin..=fmax` Hz.
    pub fn pitch_track(&self, fmin: f64, fmax: f64) -> AudioSpectraResult<Vec<PitchEstimate>> {
        self.spectral()?.pitch_track(fmin, fmax)
    }

    /// RMS and peak levels over windows of `window` seconds, advancing by `hop` seconds
    /// (`window` if `None`).
    pub fn rms(&self, window: f64, hop: Option<f64>) -> AudioSpectraResult<Vec<LevelReading>> {
        self.audio().level_track(window, hop.unwrap_or(window))
    }

    // I/O

    /// Load a `.spx` file as a spectral sound, or any other path as SPAW raw audio.
    ///
    /// The sound is named after the file.
    pub fn load<P: AsRef<Path>>(path: P) -> AudioSpectraResult<Self> {
        let path = path.as_ref();
        let format = WireFormat::from_path(path).unwrap_or(WireFormat::Audio);
        let file = File::open(path).map_err(|e| AudioSpectraError::io("opening sound file", e))?;
        let sound = Sound::from(read_payload_as(format, &mut BufReader::new(file))?);
        Ok(match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => sound.with_name(name),
            None => sound,
        })
    }

    /// Save to a `.spx` file (spectral frame) or any other path (SPAW raw audio).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> AudioSpectraResult<()> {
        let path = path.as_ref();
        match WireFormat::from_path(path).unwrap_or(WireFormat::Audio) {
            WireFormat::Spectral => spx::save(self.spectral()?, path),
            WireFormat::Audio => {
                let file = File::create(path)
                    .map_err(|e| AudioSpectraError::io("creating sound file", e))?;
                raw_audio::write_pipe(self.audio(), &mut BufWriter::new(file))
            }
        }
    }

    /// Write the sound in `format` to a pipe and flush it.
    pub fn write_pipe<W: Write>(
        &self,
        format: WireFormat,
        writer: &mut W,
    ) -> AudioSpectraResult<()> {
        match format {
            WireFormat::Spectral => spx::write_pipe(self.spectral()?, writer),
            WireFormat::Audio => raw_audio::write_pipe(self.audio(), writer),
        }
    }

    /// Read one sound of either format from a pipe.
    pub fn read_pipe<R: Read>(reader: &mut R) -> AudioSpectraResult<Self> {
        crate::serialization::read_payload(reader).map(Sound::from)
    }
}

impl From<AudioData> for Sound {
    fn from(audio: AudioData) -> Self {
        Sound::from_audio(audio)
    }
}

impl From<SpectralFrame> for Sound {
    fn from(frame: SpectralFrame) -> Self {
        Sound::from_spectral(frame)
    }
}

impl From<Payload> for Sound {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Audio(audio) => Sound::from_audio(audio),
            Payload::Spectral(frame) => Sound::from_spectral(frame),
        }
    }
}

impl Mul<f32> for &Sound {
    type Output = Sound;

    fn mul(self, factor: f32) -> Sound {
        self.gain(factor)
    }
}

impl Mul<f32> for Sound {
    type Output = Sound;

    fn mul(self, factor: f32) -> Sound {
        self.gain(factor)
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sound(\"{}\", {}ch, {}Hz, {:.3}s)",
            self.name().unwrap_or("untitled"),
            self.channels(),
            self.sample_rate(),
            self.duration_seconds()
        )
    }
}

/// Weighted mix of several sounds in the time domain.
///
/// Weights default to `1 / N` each. The result is named `mix`.
pub fn mix(sounds: &[Sound], weights: Option<&[f64]>) -> AudioSpectraResult<Sound> {
    let audio: Vec<AudioData> = sounds.iter().map(|s| s.audio().clone()).collect();
    let mixed = time_domain::mix(&audio, weights)?;
    Ok(Sound::from_audio(mixed).with_name("mix"))
}

/// Join sounds end to end in the time domain. The result is named `concat`.
pub fn concat(sounds: &[Sound]) -> AudioSpectraResult<Sound> {
    let audio: Vec<AudioData> = sounds.iter().map(|s| s.audio().clone()).collect();
    let joined = time_domain::concat(&audio)?;
    Ok(Sound::from_audio(joined).with_name("concat"))
}
