//! Airtime and idling classification
//!
//! Airtimes are combined topouts that end in a landing: right after the
//! interval, front or rear velocity magnitude exceeds the impact threshold.
//! The take-off edge is not checked, because slow roll-offs (drops in
//! particular) would otherwise be missed.

use tracing::debug;

use super::samples_for;
use super::topouts::predicate_runs;
use crate::config::AirtimeConfig;
use crate::types::{Interval, Mask};

/// Keep the combined-topout candidates whose trailing edge shows a landing.
///
/// The window `[end, end + check_window)` is searched on both velocity
/// signals. Candidates that run to the end of the recording have no
/// observable landing and are dropped.
pub fn filter_airtimes(
    candidates: &[Interval],
    front_velocity: &[f64],
    rear_velocity: &[f64],
    sample_rate: u32,
    config: &AirtimeConfig,
) -> Vec<Interval> {
    let window = samples_for(config.check_window_s, sample_rate).max(1);
    let record_count = front_velocity.len().max(rear_velocity.len());

    let airtimes: Vec<Interval> = candidates
        .iter()
        .filter(|c| c.end < record_count)
        .filter(|c| {
            let peak = peak_magnitude(front_velocity, c.end, window)
                .max(peak_magnitude(rear_velocity, c.end, window));
            peak > config.impact_velocity_mm_s
        })
        .copied()
        .collect();

    debug!(
        candidates = candidates.len(),
        airtimes = airtimes.len(),
        window,
        "Airtime classification"
    );
    airtimes
}

/// Largest |v| in `velocity[start..start + len]`, clipped to the signal; 0 when empty.
fn peak_magnitude(velocity: &[f64], start: usize, len: usize) -> f64 {
    let end = start.saturating_add(len).min(velocity.len());
    velocity
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .map(|v| v.abs())
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}

/// Portions of the topouts outside the airtime mask.
///
/// A topout partly covered by an airtime is trimmed to its uncovered runs;
/// one fully inside an airtime disappears. Each portion stays within the
/// topout it came from.
pub fn filter_idlings(topouts: &[Interval], airtime_mask: &Mask) -> Vec<Interval> {
    topouts
        .iter()
        .flat_map(|&topout| {
            predicate_runs((topout.start..topout.end).map(|i| !airtime_mask.get(i)))
                .into_iter()
                .map(move |run| Interval::new(topout.start + run.start, topout.start + run.end))
        })
        .collect()
}
