//! Error types and result utilities for spectral audio operations.
//!
//! Errors are organised hierarchically: [`AudioSpectraError`] is the single error type
//! returned by the public API, and each variant wraps a more specific error describing
//! one failure class.
//!
//! - [`FormatError`] - malformed or unsupported wire data (bad magic, truncation, version)
//! - [`ParameterError`] - invalid or missing operation parameters
//! - [`CompatibilityError`] - two frames whose STFT parameters cannot be combined
//!
//! Range conditions (frame indices outside the tensor) are never errors; operators clamp.

use thiserror::Error;

/// Convenience type alias for results that may contain an [`AudioSpectraError`].
pub type AudioSpectraResult<T> = Result<T, AudioSpectraError>;

/// Top-level error type for all spectral operations.
#[derive(Error, Debug)]
pub enum AudioSpectraError {
    /// Malformed, truncated or unsupported encoded data.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Invalid or missing parameters supplied to an operation.
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Two or more frames with incompatible STFT metadata were combined.
    #[error(transparent)]
    Compatibility(#[from] CompatibilityError),

    /// Underlying reader or writer failed for a reason other than truncation.
    #[error("I/O error while {operation}: {source}")]
    Io {
        /// What the codec was doing when the failure occurred.
        operation: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl AudioSpectraError {
    /// Wrap an I/O error raised while performing `operation`.
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }

    /// Returns true if this is a [`FormatError`].
    pub const fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }

    /// Returns true if this is a [`ParameterError`].
    pub const fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter(_))
    }

    /// Returns true if this is a [`CompatibilityError`].
    pub const fn is_compatibility(&self) -> bool {
        matches!(self, Self::Compatibility(_))
    }
}

/// Errors raised while decoding SPXF or raw audio streams.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// The stream does not start with the expected magic bytes.
    #[error("Bad magic: expected {expected:?}, found {actual:?}")]
    BadMagic {
        /// Expected magic, e.g. `SPXF`.
        expected: String,
        /// Bytes actually found, lossily decoded.
        actual: String,
    },

    /// A section of the stream ended early or carried unexpected trailing bytes.
    #[error("Truncated {section}: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Which part of the stream was being read.
        section: &'static str,
        /// Number of bytes required.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },

    /// The header declares a format version this crate cannot read.
    #[error("Unsupported format version: expected {expected}, found {actual}")]
    UnsupportedVersion {
        /// Version this crate writes and reads.
        expected: u32,
        /// Version found in the header.
        actual: u64,
    },

    /// The header is not valid JSON or carries inconsistent fields.
    #[error("Invalid header field '{field}': {reason}")]
    InvalidHeader {
        /// Offending header field, or `header` when the JSON itself is malformed.
        field: String,
        /// Human readable reason.
        reason: String,
    },
}

impl FormatError {
    /// Create a bad magic error.
    pub fn bad_magic(expected: &[u8], actual: &[u8]) -> Self {
        Self::BadMagic {
            expected: String::from_utf8_lossy(expected).into_owned(),
            actual: String::from_utf8_lossy(actual).into_owned(),
        }
    }

    /// Create a truncation error.
    pub const fn truncated(section: &'static str, expected: usize, actual: usize) -> Self {
        Self::Truncated {
            section,
            expected,
            actual,
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors describing invalid operation parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter required in this context was not supplied.
    #[error("Missing parameter '{parameter}': required for {context}")]
    Missing {
        /// Name of the missing parameter.
        parameter: &'static str,
        /// The operation or mode that requires it.
        context: String,
    },

    /// A parameter was supplied with a value the operation cannot accept.
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        /// Name of the parameter.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The named window function is not supported.
    #[error("Unsupported window function '{name}'")]
    UnsupportedWindow {
        /// Window name as supplied.
        name: String,
    },
}

impl ParameterError {
    /// Create a missing-parameter error.
    pub fn missing(parameter: &'static str, context: impl Into<String>) -> Self {
        Self::Missing {
            parameter,
            context: context.into(),
        }
    }

    /// Create an invalid-value error.
    pub fn invalid_value(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            parameter,
            reason: reason.into(),
        }
    }

    /// Create an unsupported-window error.
    pub fn unsupported_window(name: impl Into<String>) -> Self {
        Self::UnsupportedWindow { name: name.into() }
    }
}

/// Raised when frames combined by `join`, `morph` or `concat` disagree on metadata.
///
/// `index` is the position of the offending input; it is always compared against input 0.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Input {index} is incompatible with input 0: {field} {actual} vs {expected}")]
pub struct CompatibilityError {
    /// Position of the first mismatching input.
    pub index: usize,
    /// Name of the first mismatching field.
    pub field: &'static str,
    /// Value held by input 0.
    pub expected: String,
    /// Value held by the offending input.
    pub actual: String,
}

impl CompatibilityError {
    /// Create a compatibility error for `field` at `index`.
    pub fn new(
        index: usize,
        field: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self {
            index,
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
