//! Velocity-band statistics
//!
//! Splits the selected velocity samples by direction (compression is positive
//! velocity, rebound negative) and by magnitude against the high-speed
//! threshold. Zero velocity belongs to neither direction. Magnitudes at or
//! above the threshold count as high speed.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityBand {
    LowSpeedCompression,
    HighSpeedCompression,
    LowSpeedRebound,
    HighSpeedRebound,
}

impl VelocityBand {
    pub const ALL: [VelocityBand; 4] = [
        VelocityBand::HighSpeedRebound,
        VelocityBand::LowSpeedRebound,
        VelocityBand::LowSpeedCompression,
        VelocityBand::HighSpeedCompression,
    ];

    /// Band of a single velocity sample, `None` for zero or non-finite velocity.
    pub fn classify(velocity: f64, high_speed_threshold: f64) -> Option<Self> {
        if !velocity.is_finite() || velocity == 0.0 {
            return None;
        }
        let high = velocity.abs() >= high_speed_threshold;
        Some(match (velocity > 0.0, high) {
            (true, false) => VelocityBand::LowSpeedCompression,
            (true, true) => VelocityBand::HighSpeedCompression,
            (false, false) => VelocityBand::LowSpeedRebound,
            (false, true) => VelocityBand::HighSpeedRebound,
        })
    }
}

/// Statistics of one band. Magnitudes are `None` when the band is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandStat {
    pub band: VelocityBand,
    pub count: usize,
    /// Share of all selected samples (%)
    pub share_percent: f64,
    /// Mean |v| (mm/s)
    pub mean_magnitude: Option<f64>,
    /// Max |v| (mm/s)
    pub max_magnitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityBandStats {
    pub high_speed_threshold: f64,
    /// Number of selected samples, including zero-velocity ones
    pub sample_count: usize,
    /// In [`VelocityBand::ALL`] order
    pub bands: Vec<BandStat>,
    pub average_compression: Option<f64>,
    pub max_compression: Option<f64>,
    /// Rebound figures are magnitudes
    pub average_rebound: Option<f64>,
    pub max_rebound: Option<f64>,
}

impl VelocityBandStats {
    pub fn band(&self, band: VelocityBand) -> Option<&BandStat> {
        self.bands.iter().find(|b| b.band == band)
    }
}

/// Band statistics over already-selected velocity samples (mm/s).
#[allow(clippy::cast_precision_loss)]
pub fn velocity_band_stats(samples: &[f64], high_speed_threshold: f64) -> VelocityBandStats {
    let sample_count = samples.len();

    let bands = VelocityBand::ALL
        .iter()
        .map(|&band| {
            let magnitudes: Vec<f64> = samples
                .iter()
                .filter(|&&v| VelocityBand::classify(v, high_speed_threshold) == Some(band))
                .map(|v| v.abs())
                .collect();
            let share_percent = if sample_count == 0 {
                0.0
            } else {
                magnitudes.len() as f64 / sample_count as f64 * 100.0
            };
            BandStat {
                band,
                count: magnitudes.len(),
                share_percent,
                mean_magnitude: mean(&magnitudes),
                max_magnitude: max(&magnitudes),
            }
        })
        .collect();

    let compression: Vec<f64> = samples
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    let rebound: Vec<f64> = samples
        .iter()
        .filter(|v| v.is_finite() && **v < 0.0)
        .map(|v| v.abs())
        .collect();

    VelocityBandStats {
        high_speed_threshold,
        sample_count,
        bands,
        average_compression: mean(&compression),
        max_compression: max(&compression),
        average_rebound: mean(&rebound),
        max_rebound: max(&rebound),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| Statistics::mean(values))
}

fn max(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| Statistics::max(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mask;

    #[test]
    fn test_band_partition() {
        let v = [100.0, 400.0, -50.0, -800.0, -300.0, 0.0, 350.0];
        let stats = velocity_band_stats(&v, 350.0);

        let lsc = stats.band(VelocityBand::LowSpeedCompression).unwrap();
        assert_eq!(lsc.count, 1);
        assert_eq!(lsc.mean_magnitude, Some(100.0));

        let hsc = stats.band(VelocityBand::HighSpeedCompression).unwrap();
        assert_eq!(hsc.count, 2);
        assert_eq!(hsc.mean_magnitude, Some(375.0));
        assert_eq!(hsc.max_magnitude, Some(400.0));

        let lsr = stats.band(VelocityBand::LowSpeedRebound).unwrap();
        assert_eq!(lsr.count, 2);
        assert_eq!(lsr.mean_magnitude, Some(175.0));

        let hsr = stats.band(VelocityBand::HighSpeedRebound).unwrap();
        assert_eq!(hsr.max_magnitude, Some(800.0));

        // The zero sample is in no band but still counts toward the shares
        let counted: usize = stats.bands.iter().map(|b| b.count).sum();
        assert_eq!(counted, 6);
        assert_eq!(stats.sample_count, 7);

        assert_eq!(stats.max_compression, Some(400.0));
        assert_eq!(stats.max_rebound, Some(800.0));
    }

    #[test]
    fn test_empty_bands_report_no_data() {
        let stats = velocity_band_stats(&[120.0, 80.0], 350.0);
        let hsr = stats.band(VelocityBand::HighSpeedRebound).unwrap();
        assert_eq!(hsr.count, 0);
        assert_eq!(hsr.mean_magnitude, None);
        assert_eq!(hsr.max_magnitude, None);
        assert_eq!(stats.average_rebound, None);
    }

    #[test]
    fn test_every_empty_selection_is_defined() {
        let velocity = [10.0, -400.0, 0.0, 700.0];
        let masks = [Mask::filled(4, false), Mask::filled(0, false)];
        for mask in masks {
            let stats = velocity_band_stats(&mask.select(&velocity), 350.0);
            assert_eq!(stats.sample_count, 0);
            for b in &stats.bands {
                assert_eq!(b.count, 0);
                assert_eq!(b.share_percent, 0.0);
                assert!(b.mean_magnitude.is_none());
            }
            assert!(stats.average_compression.is_none());
        }
    }

    #[test]
    fn test_shares_sum_for_nonzero_samples() {
        let v = [1.0, -2.0, 500.0, -600.0];
        let stats = velocity_band_stats(&v, 350.0);
        let total: f64 = stats.bands.iter().map(|b| b.share_percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }
}
