//! Peak picking with topographic prominence.
//!
//! A peak is a strict local maximum: greater than both immediate neighbours. The first
//! and last samples are never peaks.
//!
//! ## Prominence
//!
//! For a peak at index `i` with value `v`, scan outwards on each side until reaching either
//! the edge of the signal or a sample `>= v`. The lowest value passed on each side is that
//! side's base, and
//!
//! ```text
//! prominence(i) = v - max(left_base, right_base)
//! ```
//!
//! Negative infinity is a valid sample value and marks regions that can never hold a peak;
//! a base of negative infinity on both sides gives an infinite prominence.

use crate::{AudioSpectraResult, ParameterError};

/// A detected peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Index of the peak sample.
    pub index: usize,
    /// Prominence of the peak in the units of the input signal.
    pub prominence: f64,
}

/// Prominence of the sample at `index`, assuming it is a local maximum.
pub fn peak_prominence(values: &[f64], index: usize) -> f64 {
    let peak = values[index];

    let left_base = values[..index]
        .iter()
        .rev()
        .take_while(|&&v| v < peak)
        .fold(f64::INFINITY, |m, &v| m.min(v));
    let right_base = values[index + 1..]
        .iter()
        .take_while(|&&v| v < peak)
        .fold(f64::INFINITY, |m, &v| m.min(v));

    peak - left_base.max(right_base)
}

/// Find all strict local maxima of `values` whose prominence is at least `min_prominence`.
///
/// Peaks are returned in ascending index order.
///
/// # Errors
/// Returns a [`ParameterError`] if `min_prominence` is NaN.
pub fn find_peaks(values: &[f64], min_prominence: f64) -> AudioSpectraResult<Vec<Peak>> {
    if min_prominence.is_nan() {
        return Err(ParameterError::invalid_value("min_prominence", "must not be NaN").into());
    }
    if values.len() < 3 {
        return Ok(Vec::new());
    }

    let peaks = (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
        .map(|index| Peak {
            index,
            prominence: peak_prominence(values, index),
        })
        .filter(|p| p.prominence >= min_prominence)
        .collect();
    Ok(peaks)
}

/// Keep the `limit` most prominent peaks, most prominent first.
///
/// The sort is stable, so equally prominent peaks stay in ascending index order.
pub fn top_by_prominence(mut peaks: Vec<Peak>, limit: usize) -> Vec<Peak> {
    peaks.sort_by(|a, b| b.prominence.total_cmp(&a.prominence));
    peaks.truncate(limit);
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_peaks_basic() {
        let signal = [0.0, 1.0, 0.0, 3.0, 1.0, 2.0, 0.0];
        let peaks = find_peaks(&signal, 0.0).unwrap();
        let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 3, 5]);

        // Peak at 5 drops to 1.0 on the left before reaching 3.0, and to 0.0 on the right.
        assert_eq!(peaks[2].prominence, 1.0);
        assert_eq!(peaks[1].prominence, 3.0);
        assert_eq!(peaks[0].prominence, 1.0);
    }

    #[test]
    fn test_endpoints_and_plateaus_are_not_peaks() {
        assert!(find_peaks(&[5.0, 1.0, 5.0], 0.0).unwrap().is_empty());
        assert!(find_peaks(&[0.0, 2.0, 2.0, 0.0], 0.0).unwrap().is_empty());
        assert!(find_peaks(&[1.0, 2.0], 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_prominence_threshold() {
        let signal = [0.0, 10.0, 8.0, 9.0, 0.0];
        let peaks = find_peaks(&signal, 5.0).unwrap();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 1);
    }

    #[test]
    fn test_equal_neighbour_stops_scan() {
        // Scanning left from index 3 stops at index 1 (equal height), so the left base is 2.0.
        let signal = [0.0, 5.0, 2.0, 5.0, 4.0];
        assert_eq!(peak_prominence(&signal, 3), 1.0);
    }

    #[test]
    fn test_negative_infinity_regions() {
        let signal = [f64::NEG_INFINITY, f64::NEG_INFINITY, -20.0, -40.0, -30.0, -60.0];
        let peaks = find_peaks(&signal, 15.0).unwrap();
        let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        // Index 2: left base -inf, right base -60, prominence 40.
        // Index 4: left base -40 (stops at -20), right -60: prominence 10.
        assert_eq!(indices, vec![2]);
        assert_eq!(peaks[0].prominence, 40.0);
    }

    #[test]
    fn test_top_by_prominence_is_stable() {
        let peaks = vec![
            Peak { index: 4, prominence: 2.0 },
            Peak { index: 9, prominence: 5.0 },
            Peak { index: 12, prominence: 2.0 },
        ];
        let top = top_by_prominence(peaks, 2);
        assert_eq!(top.iter().map(|p| p.index).collect::<Vec<_>>(), vec![9, 4]);
        assert!(find_peaks(&[0.0, 1.0, 0.0], f64::NAN).is_err());
    }
}
