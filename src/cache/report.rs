//! Rendered session report
//!
//! The artifact the cache worker stores: everything a viewer needs to draw
//! a session without re-running the analysis. Traces are downsampled by the
//! level of detail; statistics are always computed on every sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SessionId, SetupInfo};
use crate::analysis::{SessionAnalysis, SuspensionStats};
use crate::processing::{bin_midpoints, Balance, BalanceDirection, ProcessingError};
use crate::types::{Interval, Side};

/// Points on the shock stroke to wheel travel curve.
const SHOCK_WHEEL_POINTS: usize = 50;

/// Downsampled travel and velocity traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traces {
    pub lod: usize,
    /// Seconds
    pub time: Vec<f64>,
    pub front_travel: Option<Vec<f64>>,
    pub front_velocity: Option<Vec<f64>>,
    pub rear_travel: Option<Vec<f64>>,
    pub rear_velocity: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionReport {
    pub travel_bin_midpoints: Vec<f64>,
    pub velocity_bin_midpoints: Vec<f64>,
    /// (start, end) seconds
    pub topouts: Vec<(f64, f64)>,
    pub idlings: Vec<(f64, f64)>,
    /// Amplitude squared at each spectrum frequency
    pub spectrum_power: Vec<f64>,
    pub stats: SuspensionStats,
}

/// Linkage input data (not measured).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageData {
    pub wheel_leverage_ratio: Vec<f64>,
    /// (shock stroke, wheel travel) mm
    pub shock_wheel: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub name: String,
    pub description: String,
    pub generated_at: DateTime<Utc>,
    pub sample_rate: u32,
    pub duration_s: f64,
    pub high_speed_threshold: f64,
    pub traces: Traces,
    pub airtimes: Vec<(f64, f64)>,
    pub front: Option<SuspensionReport>,
    pub rear: Option<SuspensionReport>,
    pub compression_balance: Option<Balance>,
    pub rebound_balance: Option<Balance>,
    pub leverage: LeverageData,
    pub setup: SetupInfo,
}

impl SessionReport {
    /// Render a report from a finished analysis.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(
        session_id: SessionId,
        description: &str,
        setup: SetupInfo,
        analysis: &SessionAnalysis,
        lod: usize,
    ) -> Result<Self, ProcessingError> {
        let telemetry = analysis.telemetry();
        let rate = f64::from(telemetry.sample_rate);
        let stats = analysis.stats(None)?;

        let side_report = |side: Side| -> Option<SuspensionReport> {
            let sa = analysis.side(side)?;
            let s = telemetry.suspension(side);
            let stats = stats.side(side)?;
            Some(SuspensionReport {
                travel_bin_midpoints: bin_midpoints(&s.travel_bins),
                velocity_bin_midpoints: bin_midpoints(&s.velocity_bins),
                topouts: to_seconds(&sa.topouts, rate),
                idlings: to_seconds(&sa.idlings, rate),
                spectrum_power: stats.spectrum.power(),
                stats: stats.clone(),
            })
        };
        let trace = |side: Side, velocity: bool| -> Option<Vec<f64>> {
            analysis.is_present(side).then(|| {
                let s = telemetry.suspension(side);
                downsample(if velocity { &s.velocity } else { &s.travel }, lod)
            })
        };

        let record_count = analysis.record_count();
        let time: Vec<f64> = (0..record_count)
            .step_by(lod.max(1))
            .map(|i| i as f64 / rate)
            .collect();

        Ok(Self {
            session_id,
            name: telemetry.name.clone(),
            description: description.to_string(),
            generated_at: Utc::now(),
            sample_rate: telemetry.sample_rate,
            duration_s: record_count as f64 / rate,
            high_speed_threshold: analysis.config().velocity.high_speed_threshold_mm_s,
            traces: Traces {
                lod,
                time,
                front_travel: trace(Side::Front, false),
                front_velocity: trace(Side::Front, true),
                rear_travel: trace(Side::Rear, false),
                rear_velocity: trace(Side::Rear, true),
            },
            airtimes: to_seconds(analysis.airtimes(), rate),
            front: side_report(Side::Front),
            rear: side_report(Side::Rear),
            compression_balance: analysis.balance(BalanceDirection::Compression).cloned(),
            rebound_balance: analysis.balance(BalanceDirection::Rebound).cloned(),
            leverage: LeverageData {
                wheel_leverage_ratio: telemetry.frame.wheel_leverage_ratio.clone(),
                shock_wheel: telemetry
                    .frame
                    .shock_wheel_curve(telemetry.rear.calibration.max_stroke, SHOCK_WHEEL_POINTS),
            },
            setup,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

fn to_seconds(intervals: &[Interval], rate: f64) -> Vec<(f64, f64)> {
    intervals.iter().map(|iv| iv.to_seconds(rate)).collect()
}

/// Every `lod`-th sample; `lod` of 0 is treated as 1.
pub fn downsample(values: &[f64], lod: usize) -> Vec<f64> {
    values.iter().step_by(lod.max(1)).copied().collect()
}
