//! Travel and velocity histograms over masked samples
//!
//! Bin edges and per-sample bin indices are produced once by the decoder.
//! A [`HistogramEngine`] borrows them and only re-counts when the selection
//! changes, so a new mask costs one pass over the selected samples.

use serde::{Deserialize, Serialize};

use crate::types::{Mask, Suspension};

/// Counts per travel bin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelHistogram {
    pub counts: Vec<u64>,
}

impl TravelHistogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Share of the selected samples per bin (%); all zeros when nothing is selected.
    #[allow(clippy::cast_precision_loss)]
    pub fn percentages(&self) -> Vec<f64> {
        let total = self.total();
        self.counts
            .iter()
            .map(|&c| percent(c, total))
            .collect()
    }
}

/// Counts per velocity bin, split by travel bin: `counts[travel_bin][velocity_bin]`.
///
/// Summing over travel bins gives the plain velocity histogram; the split lets
/// a renderer stack the bars by travel zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityHistogram {
    pub counts: Vec<Vec<u64>>,
}

impl VelocityHistogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Counts per velocity bin over all travel bins.
    pub fn velocity_totals(&self) -> Vec<u64> {
        let width = self.counts.first().map_or(0, Vec::len);
        let mut totals = vec![0; width];
        for row in &self.counts {
            for (t, &c) in totals.iter_mut().zip(row) {
                *t += c;
            }
        }
        totals
    }

    /// Same layout as `counts`, each cell as a share of all selected samples (%).
    pub fn percentages(&self) -> Vec<Vec<f64>> {
        let total = self.total();
        self.counts
            .iter()
            .map(|row| row.iter().map(|&c| percent(c, total)).collect())
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Histogram counter bound to one suspension's digitization.
#[derive(Debug, Clone, Copy)]
pub struct HistogramEngine<'a> {
    digitized_travel: &'a [i32],
    digitized_velocity: &'a [i32],
    travel_bins: usize,
    velocity_bins: usize,
}

impl<'a> HistogramEngine<'a> {
    pub fn new(suspension: &'a Suspension) -> Self {
        Self::from_parts(
            &suspension.digitized_travel,
            &suspension.digitized_velocity,
            suspension.travel_bin_count(),
            suspension.velocity_bin_count(),
        )
    }

    pub fn from_parts(
        digitized_travel: &'a [i32],
        digitized_velocity: &'a [i32],
        travel_bins: usize,
        velocity_bins: usize,
    ) -> Self {
        Self {
            digitized_travel,
            digitized_velocity,
            travel_bins,
            velocity_bins,
        }
    }

    pub fn travel_histogram(&self, mask: &Mask) -> TravelHistogram {
        let mut counts = vec![0u64; self.travel_bins];
        for i in mask.indices() {
            let bin = self
                .digitized_travel
                .get(i)
                .and_then(|&b| clamp_bin(b, self.travel_bins));
            if let Some(bin) = bin {
                counts[bin] += 1;
            }
        }
        TravelHistogram { counts }
    }

    pub fn velocity_histogram(&self, mask: &Mask) -> VelocityHistogram {
        let mut counts = vec![vec![0u64; self.velocity_bins]; self.travel_bins];
        for i in mask.indices() {
            let (Some(&t), Some(&v)) = (self.digitized_travel.get(i), self.digitized_velocity.get(i))
            else {
                continue;
            };
            if let (Some(t), Some(v)) = (
                clamp_bin(t, self.travel_bins),
                clamp_bin(v, self.velocity_bins),
            ) {
                counts[t][v] += 1;
            }
        }
        VelocityHistogram { counts }
    }
}

/// Clamp a bin index into `[0, bins)`; `None` when there are no bins.
#[allow(clippy::cast_sign_loss)]
fn clamp_bin(index: i32, bins: usize) -> Option<usize> {
    if bins == 0 {
        return None;
    }
    Some((index.max(0) as usize).min(bins - 1))
}

/// Midpoint of each bin given its edges.
pub fn bin_midpoints(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine<'a>(dt: &'a [i32], dv: &'a [i32]) -> HistogramEngine<'a> {
        HistogramEngine::from_parts(dt, dv, 4, 3)
    }

    #[test]
    fn test_counts_selected_samples_only() {
        let dt = [0, 1, 1, 2, 3, 3, 3];
        let dv = [0, 1, 2, 0, 1, 1, 2];
        let mask = Mask::from(vec![true, true, false, true, false, true, true]);

        let travel = engine(&dt, &dv).travel_histogram(&mask);
        assert_eq!(travel.counts, vec![1, 1, 1, 2]);

        let velocity = engine(&dt, &dv).velocity_histogram(&mask);
        assert_eq!(velocity.counts[3], vec![0, 1, 1]);
        assert_eq!(velocity.velocity_totals(), vec![2, 2, 1]);
        assert_eq!(velocity.total(), 5);
    }

    #[test]
    fn test_count_conservation() {
        let dt: Vec<i32> = (0..50).map(|i| (i * 7 % 5) - 1).collect();
        let dv: Vec<i32> = (0..50).map(|i| i * 3 % 4).collect();
        let e = engine(&dt, &dv);
        let all = Mask::filled(50, true);

        let masks = [
            Mask::filled(50, false),
            Mask::from_range(50, 10..30),
            Mask::from((0..50).map(|i| i % 3 == 0).collect::<Vec<_>>()),
        ];
        for m in masks {
            let inside = e.travel_histogram(&m);
            let outside = e.travel_histogram(&m.not());
            let whole = e.travel_histogram(&all);
            let summed: Vec<u64> = inside
                .counts
                .iter()
                .zip(&outside.counts)
                .map(|(a, b)| a + b)
                .collect();
            assert_eq!(summed, whole.counts);
            assert_eq!(whole.total(), 50);

            let vin = e.velocity_histogram(&m).total();
            let vout = e.velocity_histogram(&m.not()).total();
            assert_eq!(vin + vout, e.velocity_histogram(&all).total());
        }
    }

    #[test]
    fn test_empty_mask_is_zero_not_nan() {
        let dt = [0, 1, 2];
        let dv = [0, 1, 2];
        let mask = Mask::filled(3, false);
        let travel = engine(&dt, &dv).travel_histogram(&mask);
        assert_eq!(travel.total(), 0);
        assert!(travel.percentages().iter().all(|&p| p == 0.0));

        let velocity = engine(&dt, &dv).velocity_histogram(&mask);
        assert!(velocity.percentages().iter().flatten().all(|&p| p == 0.0));
    }

    #[test]
    fn test_out_of_range_indices_clamped() {
        let dt = [-3, 9];
        let dv = [5, -1];
        let all = Mask::filled(2, true);
        let travel = engine(&dt, &dv).travel_histogram(&all);
        assert_eq!(travel.counts, vec![1, 0, 0, 1]);

        let velocity = engine(&dt, &dv).velocity_histogram(&all);
        assert_eq!(velocity.counts[0], vec![0, 0, 1]);
        assert_eq!(velocity.counts[3], vec![1, 0, 0]);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let dt = [0, 0, 1, 3];
        let travel = engine(&dt, &dt).travel_histogram(&Mask::filled(4, true));
        let sum: f64 = travel.percentages().iter().sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert!((travel.percentages()[0] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_bin_midpoints() {
        assert_eq!(bin_midpoints(&[0.0, 10.0, 30.0]), vec![5.0, 20.0]);
        assert!(bin_midpoints(&[1.0]).is_empty());
    }
}
