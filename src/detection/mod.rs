//! Interval detection on travel and velocity signals
//!
//! Finds the sample ranges that must be treated specially by the statistics:
//!
//! - `topouts`: a single suspension resting near full extension
//! - `combined_topouts`: both suspensions jointly near full extension
//! - `filter_airtimes`: combined topouts that end with a landing impact
//! - `filter_idlings`: topouts that are genuine rest, not mid-air pauses
//!
//! All functions are pure and return sorted, non-overlapping interval lists.

mod airtime;
mod topouts;

pub use airtime::{filter_airtimes, filter_idlings};
pub use topouts::{combined_topouts, topouts};

/// Whole number of samples covering `seconds` at `sample_rate`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn samples_for(seconds: f64, sample_rate: u32) -> usize {
    let n = (seconds * f64::from(sample_rate)).round();
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        0
    }
}
