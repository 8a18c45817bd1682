//! Shared data structures for suspension telemetry analysis
//!
//! This module defines the core types consumed by every analysis stage:
//! - Telemetry: per-session record of raw travel/velocity, calibration and frame geometry
//! - Interval: half-open sample-index range (topouts, airtimes, strokes)
//! - Mask: explicit boolean sample mask with linear-time set operations

mod interval;
mod mask;
mod telemetry;

pub use interval::*;
pub use mask::*;
pub use telemetry::*;
