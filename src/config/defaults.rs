//! System-wide default constants.
//!
//! Centralises the tunable defaults used by [`AnalysisConfig`](super::AnalysisConfig).
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Topout detection
// ============================================================================

/// Fraction of max travel within which a sample counts as fully extended.
pub const TOPOUT_THRESHOLD_FRACTION: f64 = 0.04;

/// Minimum time a suspension must stay extended to form a topout (seconds).
pub const TOPOUT_MIN_DWELL_S: f64 = 0.2;

/// Predicate drop-outs up to this long are bridged when merging runs (seconds).
pub const TOPOUT_GAP_TOLERANCE_S: f64 = 0.0;

// ============================================================================
// Airtime classification
// ============================================================================

/// Velocity magnitude at the end of a combined topout that marks a landing (mm/s).
pub const AIRTIME_IMPACT_VELOCITY_MM_S: f64 = 500.0;

/// Length of the window after a combined topout searched for the landing spike (seconds).
pub const AIRTIME_CHECK_WINDOW_S: f64 = 0.02;

// ============================================================================
// Statistics & rendering
// ============================================================================

/// Boundary between low- and high-speed velocity bands (mm/s).
pub const HIGH_SPEED_THRESHOLD_MM_S: f64 = 350.0;

/// Bins per axis of the front/rear balance distribution.
pub const BALANCE_BINS: usize = 10;

/// Downsampling factor for rendered traces.
pub const LEVEL_OF_DETAIL: usize = 5;

// ============================================================================
// Batch driver
// ============================================================================

/// Address the serve mode listens on for session ids.
pub const QUEUE_ADDR: &str = "0.0.0.0:5555";

/// Default sled database location.
pub const DATABASE_PATH: &str = "./data/sst.db";
