//! Telemetry record for one recorded session
//!
//! Constructed once per loaded session by the external decoder and read-only
//! afterwards. Marking a suspension absent produces a new value through
//! [`Telemetry::with_absent`] instead of mutating shared state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Interval;

/// Errors that make a session unusable for analysis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("Corrupt dataset: front has {front} records, rear has {rear}")]
    CorruptDataset { front: usize, rear: usize },

    #[error("Missing calibration for {side} suspension: max travel {max_travel}")]
    MissingCalibration { side: Side, max_travel: f64 },

    #[error("{side} suspension has {travel} travel samples but {velocity} velocity samples")]
    VelocityLengthMismatch {
        side: Side,
        travel: usize,
        velocity: usize,
    },

    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),
}

/// Which end of the bike a suspension belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Rear,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Front, Side::Rear];

    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Rear => "rear",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Calibration {
    #[serde(default)]
    pub name: String,
    /// Maximum stroke of the sensor (mm)
    pub max_stroke: f64,
}

/// Compression and rebound strokes found by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Strokes {
    #[serde(default)]
    pub compressions: Vec<Interval>,
    #[serde(default)]
    pub rebounds: Vec<Interval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Suspension {
    /// Records without the flag predate it and always carried both sides.
    #[serde(default = "default_present")]
    pub present: bool,
    pub calibration: Calibration,
    /// Travel (mm)
    #[serde(default)]
    pub travel: Vec<f64>,
    /// Velocity (mm/s), positive while compressing
    #[serde(default)]
    pub velocity: Vec<f64>,
    /// Travel histogram bin edges (mm)
    #[serde(default)]
    pub travel_bins: Vec<f64>,
    /// Velocity histogram bin edges (mm/s)
    #[serde(default)]
    pub velocity_bins: Vec<f64>,
    /// Travel bin index per sample
    #[serde(default)]
    pub digitized_travel: Vec<i32>,
    /// Velocity bin index per sample
    #[serde(default)]
    pub digitized_velocity: Vec<i32>,
    #[serde(default)]
    pub strokes: Strokes,
}

const fn default_present() -> bool {
    true
}

impl Suspension {
    /// A suspension with no data, flagged absent.
    pub fn absent() -> Self {
        Self {
            present: false,
            calibration: Calibration::default(),
            travel: Vec::new(),
            velocity: Vec::new(),
            travel_bins: Vec::new(),
            velocity_bins: Vec::new(),
            digitized_travel: Vec::new(),
            digitized_velocity: Vec::new(),
            strokes: Strokes::default(),
        }
    }

    /// Number of travel bins (edges minus one).
    pub fn travel_bin_count(&self) -> usize {
        self.travel_bins.len().saturating_sub(1)
    }

    /// Number of velocity bins (edges minus one).
    pub fn velocity_bin_count(&self) -> usize {
        self.velocity_bins.len().saturating_sub(1)
    }
}

/// Frame / linkage geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    /// Maximum front wheel travel (mm); the fork's max stroke is used when absent.
    #[serde(default)]
    pub max_front_travel: Option<f64>,
    /// Maximum rear wheel travel (mm)
    pub max_rear_travel: f64,
    #[serde(default)]
    pub wheel_leverage_ratio: Vec<f64>,
    /// Polynomial coefficients mapping shock stroke to wheel travel, lowest order first
    #[serde(default)]
    pub coeffs_shock_wheel: Vec<f64>,
}

impl Geometry {
    /// Wheel travel for a given shock stroke.
    pub fn wheel_travel(&self, shock_stroke: f64) -> f64 {
        self.coeffs_shock_wheel
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * shock_stroke + c)
    }

    /// `points` evenly spaced (shock stroke, wheel travel) pairs over `[0, max_stroke]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn shock_wheel_curve(&self, max_stroke: f64, points: usize) -> Vec<(f64, f64)> {
        if points < 2 || self.coeffs_shock_wheel.is_empty() {
            return Vec::new();
        }
        let step = max_stroke / (points - 1) as f64;
        (0..points)
            .map(|i| {
                let s = i as f64 * step;
                (s, self.wheel_travel(s))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Telemetry {
    #[serde(default)]
    pub name: String,
    /// Samples per second
    pub sample_rate: u32,
    pub front: Suspension,
    pub rear: Suspension,
    pub frame: Geometry,
}

impl Telemetry {
    pub fn suspension(&self, side: Side) -> &Suspension {
        match side {
            Side::Front => &self.front,
            Side::Rear => &self.rear,
        }
    }

    pub fn is_present(&self, side: Side) -> bool {
        self.suspension(side).present
    }

    /// Reference travel range used for topout detection and normalisation.
    ///
    /// The fork is measured directly, so its sensor stroke is used; rear
    /// travel is recorded as wheel travel and uses the frame's maximum.
    pub fn max_travel(&self, side: Side) -> f64 {
        match side {
            Side::Front => self.front.calibration.max_stroke,
            Side::Rear => self.frame.max_rear_travel,
        }
    }

    /// Maximum wheel travel, used when comparing front and rear.
    pub fn max_wheel_travel(&self, side: Side) -> f64 {
        match side {
            Side::Front => self
                .frame
                .max_front_travel
                .unwrap_or(self.front.calibration.max_stroke),
            Side::Rear => self.frame.max_rear_travel,
        }
    }

    /// Seconds per sample.
    pub fn tick(&self) -> f64 {
        1.0 / f64::from(self.sample_rate)
    }

    /// Number of records in the session (0 when neither side is present).
    pub fn record_count(&self) -> usize {
        if self.front.present {
            self.front.travel.len()
        } else if self.rear.present {
            self.rear.travel.len()
        } else {
            0
        }
    }

    /// Check the invariants the analysis relies on.
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.sample_rate == 0 {
            return Err(TelemetryError::InvalidSampleRate(self.sample_rate));
        }

        for side in Side::BOTH {
            let s = self.suspension(side);
            if !s.present {
                continue;
            }
            let max_travel = self.max_travel(side);
            if !max_travel.is_finite() || max_travel <= 0.0 {
                return Err(TelemetryError::MissingCalibration { side, max_travel });
            }
            if s.velocity.len() != s.travel.len() {
                return Err(TelemetryError::VelocityLengthMismatch {
                    side,
                    travel: s.travel.len(),
                    velocity: s.velocity.len(),
                });
            }
        }

        if self.front.present
            && self.rear.present
            && self.front.travel.len() != self.rear.travel.len()
        {
            return Err(TelemetryError::CorruptDataset {
                front: self.front.travel.len(),
                rear: self.rear.travel.len(),
            });
        }

        Ok(())
    }

    /// New value with `side` flagged absent; everything else is moved over unchanged.
    #[must_use]
    pub fn with_absent(mut self, side: Side) -> Self {
        match side {
            Side::Front => self.front.present = false,
            Side::Rear => self.rear.present = false,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suspension(n: usize, max_stroke: f64) -> Suspension {
        Suspension {
            present: true,
            calibration: Calibration {
                name: "test".to_string(),
                max_stroke,
            },
            travel: vec![10.0; n],
            velocity: vec![0.0; n],
            ..Suspension::absent()
        }
    }

    fn telemetry(front: Suspension, rear: Suspension) -> Telemetry {
        Telemetry {
            name: "t".to_string(),
            sample_rate: 100,
            front,
            rear,
            frame: Geometry {
                max_rear_travel: 150.0,
                ..Geometry::default()
            },
        }
    }

    #[test]
    fn test_validate_ok() {
        let t = telemetry(suspension(50, 160.0), suspension(50, 65.0));
        assert!(t.validate().is_ok());
        assert_eq!(t.record_count(), 50);
    }

    #[test]
    fn test_unequal_lengths_are_corrupt() {
        let t = telemetry(suspension(50, 160.0), suspension(40, 65.0));
        assert_eq!(
            t.validate(),
            Err(TelemetryError::CorruptDataset { front: 50, rear: 40 })
        );
    }

    #[test]
    fn test_unequal_lengths_fine_when_one_side_absent() {
        let mut rear = suspension(40, 65.0);
        rear.present = false;
        let t = telemetry(suspension(50, 160.0), rear);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_missing_calibration() {
        let t = telemetry(suspension(10, 0.0), Suspension::absent());
        assert!(matches!(
            t.validate(),
            Err(TelemetryError::MissingCalibration {
                side: Side::Front,
                ..
            })
        ));
    }

    #[test]
    fn test_with_absent_builds_new_value() {
        let t = telemetry(suspension(10, 160.0), suspension(10, 65.0));
        let original = t.clone();
        let t2 = t.with_absent(Side::Front);
        assert!(!t2.front.present);
        assert!(t2.rear.present);
        assert!(original.front.present);
        assert_eq!(t2.record_count(), 10);
    }

    #[test]
    fn test_present_defaults_to_true() {
        let json = r#"{"Calibration": {"MaxStroke": 160.0}, "Travel": [1.0], "Velocity": [0.0]}"#;
        let s: Suspension = serde_json::from_str(json).unwrap();
        assert!(s.present);
    }

    #[test]
    fn test_shock_wheel_polynomial() {
        let g = Geometry {
            coeffs_shock_wheel: vec![0.0, 3.0, 0.01],
            ..Geometry::default()
        };
        assert!((g.wheel_travel(10.0) - 31.0).abs() < 1e-9);
        let curve = g.shock_wheel_curve(50.0, 6);
        assert_eq!(curve.len(), 6);
        assert!((curve[5].0 - 50.0).abs() < 1e-9);
    }
}
