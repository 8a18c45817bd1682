//! Signal processing module - statistics over masked travel and velocity
//!
//! Every analysis here consumes a [`Mask`](crate::types::Mask) (or the samples
//! it selects) and is recomputed from scratch whenever the selection changes:
//!
//! - `histogram`: travel and travel-by-velocity bin counts from precomputed bin indices
//! - `fft`: amplitude spectrum of the travel signal
//! - `velocity_bands`: low/high-speed compression/rebound statistics
//! - `balance`: joint front/rear stroke velocity distribution

mod balance;
mod fft;
mod histogram;
mod velocity_bands;

pub use balance::*;
pub use fft::*;
pub use histogram::*;
pub use velocity_bands::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors in signal processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Invalid sample interval: {0} s")]
    InvalidSampleInterval(f64),
}

/// Frequency spectrum of a travel signal.
///
/// Empty (no bins) when the selection contained no samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencySpectrum {
    /// Frequency bins (Hz)
    pub frequencies: Vec<f64>,
    /// One-sided amplitude at each frequency (mm)
    pub amplitudes: Vec<f64>,
    /// Frequency of the largest non-DC amplitude
    pub peak_frequency: Option<f64>,
    /// Number of time-domain samples transformed
    pub sample_count: usize,
}

impl FrequencySpectrum {
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Power (amplitude squared) at each frequency.
    pub fn power(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a * a).collect()
    }
}
