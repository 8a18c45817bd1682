//! Topout detection
//!
//! A sample is "at rest" when its travel is within `threshold_fraction` of the
//! maximum travel from the signal's full-extension reference. The reference is
//! the lowest finite travel observed in the signal, so a sensor whose zero sits
//! slightly off full extension still yields topouts. It is clamped at zero, so
//! a negative sensor glitch cannot shift the rest band for the whole session.
//! Contiguous runs of at-rest samples (optionally bridging short drop-outs)
//! shorter than the minimum dwell time are discarded.

use tracing::debug;

use super::samples_for;
use crate::config::TopoutConfig;
use crate::types::Interval;

/// Find intervals where `travel` rests near full extension.
///
/// Returns an empty list for an empty signal or a non-positive `max_travel`.
pub fn topouts(
    travel: &[f64],
    max_travel: f64,
    sample_rate: u32,
    config: &TopoutConfig,
) -> Vec<Interval> {
    if !(max_travel.is_finite() && max_travel > 0.0) {
        return Vec::new();
    }
    let Some(reference) = travel
        .iter()
        .copied()
        .filter(|t| t.is_finite())
        .reduce(f64::min)
        .map(|lowest| lowest.max(0.0))
    else {
        return Vec::new();
    };

    let band = config.threshold_fraction * max_travel;
    let runs = predicate_runs(travel.iter().map(|&t| t.is_finite() && t - reference <= band));
    let merged = merge_close(runs, samples_for(config.gap_tolerance_s, sample_rate));
    let min_len = samples_for(config.min_dwell_s, sample_rate).max(1);

    let result: Vec<Interval> = merged.into_iter().filter(|iv| iv.len() >= min_len).collect();
    debug!(
        samples = travel.len(),
        reference,
        band,
        min_len,
        topouts = result.len(),
        "Topout detection"
    );
    result
}

/// Topouts of the mean of the two max-normalised travel signals.
///
/// A single suspension can briefly leave the rest band mid-air (under drops in
/// particular); averaging the normalised signals keeps such intervals together
/// while still requiring both ends to be near full extension. Signals of
/// unequal length are compared over the shorter one.
pub fn combined_topouts(
    front_travel: &[f64],
    front_max: f64,
    rear_travel: &[f64],
    rear_max: f64,
    sample_rate: u32,
    config: &TopoutConfig,
) -> Vec<Interval> {
    let combined: Vec<f64> = front_travel
        .iter()
        .zip(rear_travel)
        .map(|(&f, &r)| (normalize(f, front_max) + normalize(r, rear_max)) / 2.0)
        .collect();
    topouts(&combined, 1.0, sample_rate, config)
}

fn normalize(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// Maximal runs of `true` in a predicate sequence.
pub(super) fn predicate_runs(predicate: impl Iterator<Item = bool>) -> Vec<Interval> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let mut len = 0;
    for (i, p) in predicate.enumerate() {
        len = i + 1;
        match (p, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(Interval::new(s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(Interval::new(s, len));
    }
    runs
}

/// Merge consecutive runs separated by at most `max_gap` samples.
fn merge_close(runs: Vec<Interval>, max_gap: usize) -> Vec<Interval> {
    if max_gap == 0 {
        return runs;
    }
    let mut merged: Vec<Interval> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(last) if run.start - last.end <= max_gap => last.end = run.end,
            _ => merged.push(run),
        }
    }
    merged
}
