//! Travel spectrum using rustfft
//!
//! Amplitude spectrum of the suspension travel signal, used to spot
//! oscillation frequencies (wheel hop, pedal bob, under-damped rebound).
//!
//! # Non-contiguous selections
//!
//! A mask produced by removing topouts, or by intersecting with a time range,
//! is usually made of many separate runs. Transforming the concatenation of
//! those runs puts artificial steps at every seam, and the steps show up as
//! broadband energy that is not in the ride. [`SpectrumPolicy::LongestRun`]
//! (the default) therefore transforms only the longest contiguous run of the
//! selection; [`SpectrumPolicy::Concatenate`] keeps every selected sample.
//!
//! # Example
//!
//! ```ignore
//! let spectrum = travel_spectrum(&travel, &mask, 1.0 / 1000.0, SpectrumPolicy::LongestRun, Some(10.0))?;
//! let peaks = find_dominant_frequencies(&spectrum, 3);
//! ```

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

use super::{FrequencySpectrum, ProcessingError};
use crate::types::Mask;

/// How a masked selection becomes the time-domain signal for the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumPolicy {
    /// Only the longest contiguous run of selected samples
    #[default]
    LongestRun,
    /// All selected samples, joined end to end
    Concatenate,
}

/// Time-domain signal for `mask` under `policy`.
pub fn select_signal(travel: &[f64], mask: &Mask, policy: SpectrumPolicy) -> Vec<f64> {
    match policy {
        SpectrumPolicy::LongestRun => mask
            .longest_run()
            .and_then(|iv| travel.get(iv.start..iv.end.min(travel.len())))
            .map(<[f64]>::to_vec)
            .unwrap_or_default(),
        SpectrumPolicy::Concatenate => mask.select(travel),
    }
}

/// Spectrum of the travel samples selected by `mask`.
///
/// `tick` is the sample interval (seconds). An empty selection yields an empty
/// spectrum; only an invalid `tick` is an error. Bins above `max_frequency`
/// are dropped when given.
pub fn travel_spectrum(
    travel: &[f64],
    mask: &Mask,
    tick: f64,
    policy: SpectrumPolicy,
    max_frequency: Option<f64>,
) -> Result<FrequencySpectrum, ProcessingError> {
    if !(tick.is_finite() && tick > 0.0) {
        return Err(ProcessingError::InvalidSampleInterval(tick));
    }

    let signal = select_signal(travel, mask, policy);
    let mut spectrum = compute_fft(&signal, 1.0 / tick)?;

    if let Some(limit) = max_frequency {
        let keep = spectrum
            .frequencies
            .iter()
            .take_while(|&&f| f <= limit)
            .count();
        spectrum.frequencies.truncate(keep);
        spectrum.amplitudes.truncate(keep);
        spectrum.peak_frequency = peak_frequency(&spectrum.frequencies, &spectrum.amplitudes);
    }

    tracing::trace!(
        selected = mask.count(),
        transformed = spectrum.sample_count,
        bins = spectrum.frequencies.len(),
        "Travel spectrum"
    );
    Ok(spectrum)
}

/// Compute the one-sided amplitude spectrum of time-domain samples.
///
/// Samples are de-meaned, Hann-windowed and zero-padded to the next power of
/// two. Amplitudes are normalised by the window sum so a sine of amplitude A
/// sitting on a bin reads A.
pub fn compute_fft(
    samples: &[f64],
    sample_rate: f64,
) -> Result<FrequencySpectrum, ProcessingError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(ProcessingError::InvalidSampleInterval(1.0 / sample_rate));
    }
    if samples.is_empty() {
        return Ok(FrequencySpectrum::default());
    }

    let processor = FftProcessor::new(samples.len(), sample_rate)?;
    Ok(processor.compute(samples))
}

// ============================================================================
// FFT Processor (Pre-planned for repeated use)
// ============================================================================

/// FFT processor with a pre-planned transform, for repeated spectra of the
/// same length (e.g. while a selection is dragged across the trace).
pub struct FftProcessor {
    fft: Arc<dyn Fft<f64>>,
    size: usize,
    sampling_rate: f64,
}

impl FftProcessor {
    /// Create a processor for signals of up to `size` samples.
    ///
    /// The transform length is `size` rounded up to a power of two.
    pub fn new(size: usize, sampling_rate: f64) -> Result<Self, ProcessingError> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(ProcessingError::InvalidSampleInterval(1.0 / sampling_rate));
        }

        let actual_size = size.max(1).next_power_of_two();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(actual_size);

        Ok(Self {
            fft,
            size: actual_size,
            sampling_rate,
        })
    }

    /// Transform `signal`; samples beyond the planned size are ignored.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(&self, signal: &[f64]) -> FrequencySpectrum {
        let n = signal.len().min(self.size);
        if n == 0 {
            return FrequencySpectrum::default();
        }
        let signal = &signal[..n];

        let mean = signal.iter().sum::<f64>() / n as f64;
        let window = hann(n);
        let window_sum: f64 = window.iter().sum();

        let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); self.size];
        for ((slot, &x), &w) in buffer.iter_mut().zip(signal).zip(&window) {
            *slot = Complex::new((x - mean) * w, 0.0);
        }

        self.fft.process(&mut buffer);

        let n_positive = self.size / 2 + 1;
        let frequencies = self.frequency_bins();

        // DC and Nyquist appear once in a one-sided spectrum, every other bin twice
        let amplitudes: Vec<f64> = buffer
            .iter()
            .take(n_positive)
            .enumerate()
            .map(|(i, c)| {
                let twice = i != 0 && !(self.size > 1 && i == n_positive - 1);
                let scale = if twice { 2.0 } else { 1.0 } / window_sum;
                c.norm() * scale
            })
            .collect();

        FrequencySpectrum {
            peak_frequency: peak_frequency(&frequencies, &amplitudes),
            frequencies,
            amplitudes,
            sample_count: n,
        }
    }

    /// Get frequency bins for this FFT configuration
    #[allow(clippy::cast_precision_loss)]
    pub fn frequency_bins(&self) -> Vec<f64> {
        let n_positive = self.size / 2 + 1;
        let resolution = self.frequency_resolution();
        (0..n_positive).map(|i| i as f64 * resolution).collect()
    }

    /// Get the FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the frequency resolution (Hz per bin)
    #[allow(clippy::cast_precision_loss)]
    pub fn frequency_resolution(&self) -> f64 {
        self.sampling_rate / self.size as f64
    }
}

/// Symmetric Hann window; rectangular below three samples, where Hann is all zeros.
#[allow(clippy::cast_precision_loss)]
fn hann(n: usize) -> Vec<f64> {
    if n < 3 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|k| 0.5 - 0.5 * (2.0 * PI * k as f64 / denom).cos())
        .collect()
}

/// Frequency of the largest non-DC amplitude; `None` for a flat spectrum.
fn peak_frequency(frequencies: &[f64], amplitudes: &[f64]) -> Option<f64> {
    frequencies
        .iter()
        .zip(amplitudes)
        .skip(1)
        .filter(|(_, &a)| a > 0.0)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(&f, _)| f)
}

/// Find dominant frequencies in a spectrum using true peak detection.
///
/// Identifies local maxima (peaks) where the amplitude is higher than
/// both neighboring bins, then returns the top N by amplitude.
///
/// # Returns
/// Vector of (frequency, amplitude) tuples sorted by amplitude descending
pub fn find_dominant_frequencies(spectrum: &FrequencySpectrum, n_peaks: usize) -> Vec<(f64, f64)> {
    let a = &spectrum.amplitudes;
    if a.len() < 3 {
        return Vec::new();
    }

    let mut peaks: Vec<(f64, f64)> = (1..a.len() - 1)
        .filter(|&i| a[i] > a[i - 1] && a[i] > a[i + 1])
        .map(|i| (spectrum.frequencies[i], a[i]))
        .collect();

    peaks.sort_by(|x, y| y.1.total_cmp(&x.1));
    peaks.truncate(n_peaks);
    peaks
}

// ============================================================================
// Tests
// ============================================================================
