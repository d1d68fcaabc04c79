//! Harmonic decomposition of a spectral frame into disjoint per-note components.
//!
//! The algorithm works on the frame's mean magnitude profile (averaged over channels and
//! frames):
//!
//! 1. Convert the profile to dB (floored at `1e-10` linear) and mask out bins below
//!    `min_freq` with negative infinity.
//! 2. Pick strict local maxima with at least `prominence_db` of prominence and keep the
//!    `max_components` most prominent.
//! 3. Run a harmonic sieve in ascending frequency: a candidate within 5% of the `n`-th
//!    harmonic (`n >= 2`) of an accepted fundamental is rejected.
//! 4. Build a [`BinMask`] for each fundamental (its harmonic series, or the fundamental
//!    alone) and [`claim`] it against the bins already owned by lower fundamentals.
//! 5. Mask the original frame with each claimed set. The bins nobody claimed form the
//!    remainder.
//!
//! Because the claimed masks and the remainder partition the bin axis, [`join`] of every
//! component plus the remainder reproduces the original tensor exactly.

use ndarray::{Array3, s};
use num_complex::Complex32;
use num_traits::Zero;

use super::peak_picking::{find_peaks, top_by_prominence};
use super::traits::SpectralDecomposition;
use super::types::{DecomposeConfig, HarmonicMode};
use crate::repr::{FrameField, SpectralFrame};
use crate::utils::audio_math::amplitude_to_db_floored;
use crate::{AudioSpectraResult, ParameterError};

/// Linear magnitude floor applied before converting the profile to dB.
const MAGNITUDE_FLOOR: f64 = 1e-10;

/// Relative distance from an integer harmonic under which a candidate is a harmonic.
const HARMONIC_TOLERANCE: f64 = 0.05;

const WORD_BITS: usize = u64::BITS as usize;

/// A set of frequency bins, stored as a bitset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinMask {
    words: Vec<u64>,
    bins: usize,
}

impl BinMask {
    /// An empty mask over `bins` bins.
    pub fn empty(bins: usize) -> Self {
        Self {
            words: vec![0; bins.div_ceil(WORD_BITS)],
            bins,
        }
    }

    /// A mask containing every one of `bins` bins.
    pub fn full(bins: usize) -> Self {
        Self::empty(bins).complement()
    }

    /// Number of bins the mask ranges over.
    pub const fn bins(&self) -> usize {
        self.bins
    }

    /// Whether `bin` is in the mask. Out-of-range bins are never contained.
    pub fn contains(&self, bin: usize) -> bool {
        bin < self.bins && (self.words[bin / WORD_BITS] >> (bin % WORD_BITS)) & 1 == 1
    }

    /// Add `bin` to the mask. Out-of-range bins are ignored.
    pub fn insert(&mut self, bin: usize) {
        if bin < self.bins {
            self.words[bin / WORD_BITS] |= 1 << (bin % WORD_BITS);
        }
    }

    /// Add `centre` and `radius` bins on each side, clipped to the bin range.
    pub fn insert_window(&mut self, centre: usize, radius: usize) {
        if self.bins == 0 {
            return;
        }
        let lo = centre.saturating_sub(radius);
        let hi = centre.saturating_add(radius).min(self.bins - 1);
        for bin in lo..=hi {
            self.insert(bin);
        }
    }

    /// Number of bins in the mask.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether the mask contains no bins.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Bins in either mask.
    pub fn union(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a | b)
    }

    /// Bins in `self` but not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a & !b)
    }

    /// Bins in both masks.
    pub fn intersection(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a & b)
    }

    /// Bins not in the mask.
    pub fn complement(&self) -> Self {
        let mut words: Vec<u64> = self.words.iter().map(|w| !w).collect();
        let tail = self.bins % WORD_BITS;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
        Self {
            words,
            bins: self.bins,
        }
    }

    /// Whether the two masks share no bins.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.intersection(other).is_empty()
    }

    /// Iterate over contained bins in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.bins).filter(|&bin| self.contains(bin))
    }

    fn combine(&self, other: &Self, op: impl Fn(u64, u64) -> u64) -> Self {
        debug_assert_eq!(self.bins, other.bins);
        Self {
            words: self
                .words
                .iter()
                .zip(other.words.iter())
                .map(|(&a, &b)| op(a, b))
                .collect(),
            bins: self.bins,
        }
    }
}

/// Claim `mask` against the bins already `claimed`.
///
/// Returns `(owned, claimed')`: the bins of `mask` nobody owned yet, and the claimed set
/// grown by all of `mask`.
pub fn claim(mask: BinMask, claimed: BinMask) -> (BinMask, BinMask) {
    let owned = mask.difference(&claimed);
    let claimed = claimed.union(&mask);
    (owned, claimed)
}

/// A fundamental accepted by the harmonic sieve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fundamental {
    /// Frequency of the peak bin in Hz.
    pub frequency_hz: f64,
    /// Peak bin index.
    pub bin: usize,
}

fn is_harmonic_of(frequency: f64, fundamental: f64) -> bool {
    let ratio = frequency / fundamental;
    let n = ratio.round_ties_even();
    n >= 2.0 && (ratio - n).abs() / n < HARMONIC_TOLERANCE
}

/// Harmonic sieve over `(frequency_hz, bin)` candidates sorted by ascending frequency.
///
/// Returns the accepted fundamentals in acceptance (ascending frequency) order.
pub fn harmonic_sieve(candidates: &[(f64, usize)]) -> Vec<Fundamental> {
    let mut fundamentals: Vec<Fundamental> = Vec::new();
    for &(frequency_hz, bin) in candidates {
        match fundamentals
            .iter()
            .find(|f| is_harmonic_of(frequency_hz, f.frequency_hz))
        {
            Some(parent) => {
                tracing::trace!(frequency_hz, parent = parent.frequency_hz, "rejected harmonic");
            }
            None => {
                tracing::trace!(frequency_hz, bin, "accepted fundamental");
                fundamentals.push(Fundamental { frequency_hz, bin });
            }
        }
    }
    fundamentals
}

/// Index of the bin whose frequency is closest to `target`; ties go to the lower bin.
pub fn nearest_bin(bin_freqs: &[f64], target: f64) -> usize {
    bin_freqs
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, best_dist), (bin, &f)| {
            let dist = (f - target).abs();
            if dist < best_dist { (bin, dist) } else { (best, best_dist) }
        })
        .0
}

/// Mask of the harmonic series of `fundamental_hz`, `bin_window` bins either side of each
/// harmonic, up to `max_harmonics` harmonics or the last bin frequency.
pub fn harmonic_mask(
    fundamental_hz: f64,
    bin_freqs: &[f64],
    bin_window: usize,
    max_harmonics: usize,
) -> BinMask {
    let mut mask = BinMask::empty(bin_freqs.len());
    let Some(&top) = bin_freqs.last() else {
        return mask;
    };
    for n in 1..=max_harmonics {
        let target = n as f64 * fundamental_hz;
        if target > top {
            break;
        }
        mask.insert_window(nearest_bin(bin_freqs, target), bin_window);
    }
    mask
}

/// Mask of the `bin_window` neighbourhood of the fundamental only.
pub fn fundamental_mask(fundamental_hz: f64, bin_freqs: &[f64], bin_window: usize) -> BinMask {
    let mut mask = BinMask::empty(bin_freqs.len());
    if !bin_freqs.is_empty() {
        mask.insert_window(nearest_bin(bin_freqs, fundamental_hz), bin_window);
    }
    mask
}

/// Zero every bin of `frame` outside `mask`, on all channels and frames.
pub fn apply_mask(frame: &SpectralFrame, mask: &BinMask) -> SpectralFrame {
    let mut data = frame.data().clone();
    for bin in mask.complement().iter() {
        data.slice_mut(s![.., .., bin]).fill(Complex32::zero());
    }
    frame.with_data(data)
}

/// One decomposed note.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Fundamental frequency in Hz.
    pub fundamental_hz: f64,
    /// Peak bin of the fundamental.
    pub bin: usize,
    /// Bins owned by this component.
    pub mask: BinMask,
    /// The original frame with every bin outside `mask` zeroed.
    pub frame: SpectralFrame,
}

/// Result of [`SpectralDecomposition::decompose`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decomposition {
    /// Components in ascending fundamental order.
    pub components: Vec<Component>,
    /// Bins claimed by no component, if requested.
    pub remainder: Option<SpectralFrame>,
}

impl Decomposition {
    /// Whether no fundamentals were found.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of components, not counting the remainder.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Every output frame: components in order, then the remainder.
    pub fn into_frames(self) -> Vec<SpectralFrame> {
        self.components
            .into_iter()
            .map(|c| c.frame)
            .chain(self.remainder)
            .collect()
    }
}

impl SpectralDecomposition for SpectralFrame {
    #[tracing::instrument(
        level = "debug",
        skip(self, config),
        fields(bins = self.bins(), frames = self.frames())
    )]
    fn decompose(&self, config: &DecomposeConfig) -> AudioSpectraResult<Decomposition> {
        config.validate()?;
        if config.max_components == 0 {
            tracing::debug!("max_components is zero, nothing to decompose");
            return Ok(Decomposition::default());
        }

        let bin_freqs = self.bin_frequencies();
        let profile = self.mean_magnitude_profile();
        let db: Vec<f64> = profile
            .iter()
            .zip(bin_freqs.iter())
            .map(|(&magnitude, &freq)| {
                if freq < config.min_freq {
                    f64::NEG_INFINITY
                } else {
                    amplitude_to_db_floored(magnitude, MAGNITUDE_FLOOR)
                }
            })
            .collect();

        let peaks = find_peaks(&db, config.prominence_db)?;
        tracing::debug!(peaks = peaks.len(), "prominent peaks found");

        let mut candidates: Vec<(f64, usize)> = top_by_prominence(peaks, config.max_components)
            .into_iter()
            .map(|p| (bin_freqs[p.index], p.index))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let fundamentals = harmonic_sieve(&candidates);
        if fundamentals.is_empty() {
            tracing::warn!(
                prominence_db = config.prominence_db,
                min_freq = config.min_freq,
                "no fundamentals found; try a lower prominence or minimum frequency"
            );
            return Ok(Decomposition::default());
        }
        tracing::debug!(fundamentals = fundamentals.len(), "harmonic sieve complete");

        let mut claimed = BinMask::empty(self.bins());
        let mut components = Vec::with_capacity(fundamentals.len());
        for fundamental in fundamentals {
            let mask = match config.harmonic_mode {
                HarmonicMode::Full => harmonic_mask(
                    fundamental.frequency_hz,
                    &bin_freqs,
                    config.bin_window,
                    config.max_harmonics,
                ),
                HarmonicMode::FundamentalOnly => {
                    fundamental_mask(fundamental.frequency_hz, &bin_freqs, config.bin_window)
                }
            };
            let (owned, next) = claim(mask, claimed);
            claimed = next;

            components.push(Component {
                fundamental_hz: fundamental.frequency_hz,
                bin: fundamental.bin,
                frame: apply_mask(self, &owned),
                mask: owned,
            });
        }

        let remainder = config
            .include_remainder
            .then(|| apply_mask(self, &claimed.complement()));

        Ok(Decomposition {
            components,
            remainder,
        })
    }
}

/// Sum the tensors of several frames.
///
/// All inputs must match input 0 in sample rate, FFT size, hop length, window and channel
/// count. Differing frame counts fail in `strict` mode and are otherwise zero-padded to the
/// longest. The result's `original_frame_count` is the largest among the inputs.
///
/// # Errors
/// Returns a [`ParameterError`] for an empty input list and a
/// [`CompatibilityError`](crate::CompatibilityError) naming the first mismatching input
/// and field.
#[tracing::instrument(level = "debug", skip(frames), fields(inputs = frames.len()))]
pub fn join(frames: &[SpectralFrame], strict: bool) -> AudioSpectraResult<SpectralFrame> {
    let Some(first) = frames.first() else {
        return Err(ParameterError::invalid_value("frames", "nothing to join").into());
    };
    for (index, frame) in frames.iter().enumerate().skip(1) {
        first.check_compatible(
            frame,
            index,
            &[
                FrameField::SampleRate,
                FrameField::FftSize,
                FrameField::HopLength,
                FrameField::Window,
                FrameField::Channels,
            ],
        )?;
    }

    let max_frames = frames.iter().map(SpectralFrame::frames).max().unwrap_or(0);
    if frames.iter().any(|f| f.frames() != max_frames) {
        if strict {
            for (index, frame) in frames.iter().enumerate().skip(1) {
                first.check_compatible(frame, index, &[FrameField::Frames])?;
            }
        } else {
            tracing::warn!(max_frames, "zero-padding inputs with differing frame counts");
        }
    }

    let mut sum = Array3::<Complex32>::zeros((first.channels(), max_frames, first.bins()));
    for frame in frames {
        sum.slice_mut(s![.., ..frame.frames(), ..])
            .zip_mut_with(frame.data(), |acc, &value| *acc += value);
    }

    let length = frames
        .iter()
        .map(SpectralFrame::original_frame_count)
        .max()
        .unwrap_or(0);
    Ok(first.with_data_and_length(sum, length))
}
