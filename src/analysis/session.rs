//! Per-session analysis
//!
//! Everything that depends only on the recording is derived once in
//! [`SessionAnalysis::new`]: topouts, riding masks, airtimes, idlings and
//! balances. [`SessionAnalysis::stats`] recomputes the selection-dependent
//! statistics by intersecting each side's riding mask with the requested time
//! range; the stored masks are never modified.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::detection::{combined_topouts, filter_airtimes, filter_idlings, topouts};
use crate::processing::{
    find_dominant_frequencies, stroke_balance, travel_spectrum, velocity_band_stats, Balance,
    BalanceDirection, FrequencySpectrum, HistogramEngine, ProcessingError, StrokeSide,
    TravelHistogram, VelocityBandStats, VelocityHistogram,
};
use crate::types::{intervals_mask, Interval, Mask, Side, Telemetry, TelemetryError};

/// Number of spectral peaks reported per side.
const DOMINANT_PEAKS: usize = 3;

/// Time range picked on the travel trace (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub start_s: f64,
    pub end_s: f64,
}

impl Selection {
    pub fn new(start_s: f64, end_s: f64) -> Self {
        Self { start_s, end_s }
    }

    /// Sample range covered, truncated to whole samples and clamped to `record_count`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn to_range(&self, sample_rate: u32, record_count: usize) -> Range<usize> {
        let rate = f64::from(sample_rate);
        // Float-to-int casts saturate: negative and NaN become 0
        let a = ((self.start_s * rate) as usize).min(record_count);
        let b = ((self.end_s * rate) as usize).min(record_count);
        a.min(b)..a.max(b)
    }
}

/// Load-time results for one present suspension.
#[derive(Debug, Clone, PartialEq)]
pub struct SideAnalysis {
    pub topouts: Vec<Interval>,
    /// `true` outside every topout
    pub riding: Mask,
    pub idlings: Vec<Interval>,
}

/// Selection-dependent statistics for one suspension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionStats {
    pub side: Side,
    pub selected_samples: usize,
    pub travel_histogram: TravelHistogram,
    pub velocity_histogram: VelocityHistogram,
    pub velocity_bands: VelocityBandStats,
    pub spectrum: FrequencySpectrum,
    /// (frequency, amplitude), strongest first
    pub dominant_frequencies: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub range: Interval,
    pub front: Option<SuspensionStats>,
    pub rear: Option<SuspensionStats>,
}

impl SessionStats {
    pub fn side(&self, side: Side) -> Option<&SuspensionStats> {
        match side {
            Side::Front => self.front.as_ref(),
            Side::Rear => self.rear.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionAnalysis {
    telemetry: Telemetry,
    config: AnalysisConfig,
    record_count: usize,
    front: Option<SideAnalysis>,
    rear: Option<SideAnalysis>,
    airtimes: Vec<Interval>,
    airtime_mask: Mask,
    compression_balance: Option<Balance>,
    rebound_balance: Option<Balance>,
}

impl SessionAnalysis {
    /// Run the load-time analysis.
    ///
    /// A side with no samples outside its topouts is marked absent and left
    /// out of every later result. Fails only when the telemetry itself is
    /// unusable.
    pub fn new(telemetry: Telemetry, config: &AnalysisConfig) -> Result<Self, TelemetryError> {
        telemetry.validate()?;

        let record_count = telemetry.record_count();
        let rate = telemetry.sample_rate;
        let mut telemetry = telemetry;
        let mut found: [Option<(Vec<Interval>, Mask)>; 2] = [None, None];

        for (slot, side) in found.iter_mut().zip(Side::BOTH) {
            if !telemetry.is_present(side) {
                continue;
            }
            let s = telemetry.suspension(side);
            let tops = topouts(&s.travel, telemetry.max_travel(side), rate, &config.topout);
            let riding = intervals_mask(&tops, record_count, false);
            if riding.any() {
                *slot = Some((tops, riding));
            } else {
                warn!(%side, topouts = tops.len(), "No samples outside topouts, marking suspension absent");
                telemetry = telemetry.with_absent(side);
            }
        }

        let zeros = vec![0.0; record_count];
        let travel_or_zeros = |side: Side| {
            let s = telemetry.suspension(side);
            if s.present { &s.travel } else { &zeros }
        };
        let velocity_or_zeros = |side: Side| {
            let s = telemetry.suspension(side);
            if s.present { &s.velocity } else { &zeros }
        };

        let candidates = combined_topouts(
            travel_or_zeros(Side::Front),
            telemetry.max_travel(Side::Front),
            travel_or_zeros(Side::Rear),
            telemetry.max_travel(Side::Rear),
            rate,
            &config.topout,
        );
        let airtimes = filter_airtimes(
            &candidates,
            velocity_or_zeros(Side::Front),
            velocity_or_zeros(Side::Rear),
            rate,
            &config.airtime,
        );
        let airtime_mask = intervals_mask(&airtimes, record_count, true);

        let [front, rear] = found.map(|f| {
            f.map(|(topouts, riding)| SideAnalysis {
                idlings: filter_idlings(&topouts, &airtime_mask),
                topouts,
                riding,
            })
        });

        let (compression_balance, rebound_balance) = if front.is_some() && rear.is_some() {
            let bins = config.balance.bins;
            let side_of = |side: Side, direction: BalanceDirection| {
                let s = telemetry.suspension(side);
                StrokeSide {
                    strokes: match direction {
                        BalanceDirection::Compression => &s.strokes.compressions,
                        BalanceDirection::Rebound => &s.strokes.rebounds,
                    },
                    velocity: &s.velocity,
                    max_travel: telemetry.max_wheel_travel(side),
                }
            };
            let balance_for = |direction| {
                stroke_balance(
                    side_of(Side::Front, direction),
                    side_of(Side::Rear, direction),
                    direction,
                    bins,
                )
            };
            (
                Some(balance_for(BalanceDirection::Compression)),
                Some(balance_for(BalanceDirection::Rebound)),
            )
        } else {
            (None, None)
        };

        info!(
            session = %telemetry.name,
            records = record_count,
            front = front.is_some(),
            rear = rear.is_some(),
            airtimes = airtimes.len(),
            "Session analysed"
        );

        Ok(Self {
            telemetry,
            config: config.clone(),
            record_count,
            front,
            rear,
            airtimes,
            airtime_mask,
            compression_balance,
            rebound_balance,
        })
    }

    /// Telemetry with absent flags reflecting the analysis.
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn side(&self, side: Side) -> Option<&SideAnalysis> {
        match side {
            Side::Front => self.front.as_ref(),
            Side::Rear => self.rear.as_ref(),
        }
    }

    pub fn is_present(&self, side: Side) -> bool {
        self.side(side).is_some()
    }

    pub fn airtimes(&self) -> &[Interval] {
        &self.airtimes
    }

    pub fn airtime_mask(&self) -> &Mask {
        &self.airtime_mask
    }

    pub fn balance(&self, direction: BalanceDirection) -> Option<&Balance> {
        match direction {
            BalanceDirection::Compression => self.compression_balance.as_ref(),
            BalanceDirection::Rebound => self.rebound_balance.as_ref(),
        }
    }

    /// Statistics for `selection`, or for the whole session when `None`.
    pub fn stats(&self, selection: Option<Selection>) -> Result<SessionStats, ProcessingError> {
        let range = selection.map_or(0..self.record_count, |s| {
            s.to_range(self.telemetry.sample_rate, self.record_count)
        });

        let mut per_side = [None, None];
        for (slot, side) in per_side.iter_mut().zip(Side::BOTH) {
            if let Some(analysis) = self.side(side) {
                let mask = analysis.riding.intersect_range(range.clone());
                *slot = Some(self.suspension_stats(side, &mask)?);
            }
        }
        let [front, rear] = per_side;

        debug!(start = range.start, end = range.end, "Selection statistics");
        Ok(SessionStats {
            range: Interval::new(range.start, range.end),
            front,
            rear,
        })
    }

    fn suspension_stats(&self, side: Side, mask: &Mask) -> Result<SuspensionStats, ProcessingError> {
        let s = self.telemetry.suspension(side);
        let engine = HistogramEngine::new(s);

        let spectrum = travel_spectrum(
            &s.travel,
            mask,
            self.telemetry.tick(),
            self.config.spectrum.policy,
            self.config.spectrum.max_frequency_hz,
        )?;

        Ok(SuspensionStats {
            side,
            selected_samples: mask.count(),
            travel_histogram: engine.travel_histogram(mask),
            velocity_histogram: engine.velocity_histogram(mask),
            velocity_bands: velocity_band_stats(
                &mask.select(&s.velocity),
                self.config.velocity.high_speed_threshold_mm_s,
            ),
            dominant_frequencies: find_dominant_frequencies(&spectrum, DOMINANT_PEAKS),
            spectrum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Calibration, Geometry, Strokes, Suspension};

    fn suspension(travel: Vec<f64>, velocity: Vec<f64>, max_stroke: f64) -> Suspension {
        let n = travel.len();
        Suspension {
            present: true,
            calibration: Calibration {
                name: "test".to_string(),
                max_stroke,
            },
            travel,
            velocity,
            travel_bins: vec![0.0, 50.0, 100.0, 150.0, 200.0],
            velocity_bins: vec![-1000.0, 0.0, 1000.0],
            digitized_travel: vec![1; n],
            digitized_velocity: vec![0; n],
            strokes: Strokes::default(),
        }
    }

    fn telemetry(front: Suspension, rear: Suspension) -> Telemetry {
        Telemetry {
            name: "session".to_string(),
            sample_rate: 100,
            front,
            rear,
            frame: Geometry {
                max_rear_travel: 150.0,
                ..Geometry::default()
            },
        }
    }

    /// Rest, ride, jump with a landing spike, ride.
    fn riding_trace() -> (Vec<f64>, Vec<f64>) {
        let mut travel = vec![0.0; 50];
        travel.extend((0..100).map(|i| 60.0 + 20.0 * (i as f64 / 5.0).sin()));
        travel.extend(vec![0.0; 40]);
        travel.extend((0..110).map(|i| 60.0 + 20.0 * (i as f64 / 5.0).sin()));
        let mut velocity = vec![0.0; travel.len()];
        velocity[191] = 1500.0;
        (travel, velocity)
    }

    #[test]
    fn test_topouts_airtimes_and_idlings() {
        let (ft, fv) = riding_trace();
        let (rt, rv) = riding_trace();
        let analysis = SessionAnalysis::new(
            telemetry(suspension(ft, fv, 160.0), suspension(rt, rv, 65.0)),
            &AnalysisConfig::default(),
        )
        .unwrap();

        let front = analysis.side(Side::Front).unwrap();
        assert_eq!(front.topouts.len(), 2);
        assert_eq!(front.topouts[0], Interval::new(0, 50));
        assert_eq!(analysis.airtimes(), &[Interval::new(150, 190)]);
        assert_eq!(front.idlings, vec![Interval::new(0, 50)]);
        assert_eq!(front.riding.count(), 300 - 90);
        assert!(analysis.balance(BalanceDirection::Compression).is_some());
    }

    #[test]
    fn test_selection_restricts_stats() {
        let (ft, fv) = riding_trace();
        let analysis = SessionAnalysis::new(
            telemetry(suspension(ft, fv, 160.0), Suspension::absent()),
            &AnalysisConfig::default(),
        )
        .unwrap();

        let all = analysis.stats(None).unwrap();
        assert_eq!(all.range, Interval::new(0, 300));
        let front = all.side(Side::Front).unwrap();
        assert_eq!(front.selected_samples, 210);
        assert_eq!(front.travel_histogram.total(), 210);
        assert!(all.rear.is_none());

        // 0.4 s .. 1.0 s covers samples 40..100, ten of them in the first topout
        let part = analysis.stats(Some(Selection::new(0.4, 1.0))).unwrap();
        assert_eq!(part.range, Interval::new(40, 100));
        assert_eq!(part.side(Side::Front).unwrap().selected_samples, 50);

        // The stored mask is untouched by a selection
        assert_eq!(analysis.side(Side::Front).unwrap().riding.count(), 210);
    }

    #[test]
    fn test_empty_selection_is_defined() {
        let (ft, fv) = riding_trace();
        let analysis = SessionAnalysis::new(
            telemetry(suspension(ft, fv, 160.0), Suspension::absent()),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let stats = analysis.stats(Some(Selection::new(0.1, 0.3))).unwrap();
        let front = stats.front.unwrap();
        assert_eq!(front.selected_samples, 0);
        assert!(front.spectrum.is_empty());
        assert!(front.velocity_bands.average_compression.is_none());
    }

    #[test]
    fn test_all_topout_side_marked_absent() {
        let (ft, fv) = riding_trace();
        let rest = vec![1.0; ft.len()];
        let zero_v = vec![0.0; ft.len()];
        let analysis = SessionAnalysis::new(
            telemetry(suspension(ft, fv, 160.0), suspension(rest, zero_v, 65.0)),
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert!(analysis.is_present(Side::Front));
        assert!(!analysis.is_present(Side::Rear));
        assert!(!analysis.telemetry().rear.present);
        assert!(analysis.balance(BalanceDirection::Rebound).is_none());
        assert!(analysis.stats(None).unwrap().rear.is_none());
    }

    #[test]
    fn test_corrupt_dataset_rejected() {
        let (ft, fv) = riding_trace();
        let short = suspension(vec![0.0; 10], vec![0.0; 10], 65.0);
        let err = SessionAnalysis::new(
            telemetry(suspension(ft, fv, 160.0), short),
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TelemetryError::CorruptDataset { .. }));
    }

    #[test]
    fn test_selection_range_clamping() {
        assert_eq!(Selection::new(-1.0, 0.5).to_range(100, 300), 0..50);
        assert_eq!(Selection::new(2.0, 0.5).to_range(100, 300), 50..200);
        assert_eq!(Selection::new(1.0, 10.0).to_range(100, 300), 100..300);
        assert_eq!(Selection::new(f64::NAN, 1.0).to_range(100, 300), 0..100);
    }
}
