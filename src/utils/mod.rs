//! Utility functions for spectral work.
//!
//! # Modules
//!
//! - [`audio_math`] - Decibel, MIDI and bin-frequency conversions
//! - [`generation`] - Test signal generation

pub mod audio_math;
pub mod generation;
