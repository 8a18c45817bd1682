//! Front/rear balance
//!
//! Compares how fast the fork and the shock move through the same event.
//! Each front stroke is paired with the rear stroke it overlaps most; the peak
//! velocity of both strokes, divided by the side's maximum wheel travel, gives
//! one point of the joint distribution. A balanced bike puts the points on the
//! diagonal.
//!
//! The direction only changes how the result is framed: rebound velocities are
//! negative, so [`Balance::signed_pairs`] flips the sign back for display. All
//! aggregate figures are computed on magnitudes.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::types::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceDirection {
    Compression,
    Rebound,
}

/// One side's strokes, velocity and reference travel.
#[derive(Debug, Clone, Copy)]
pub struct StrokeSide<'a> {
    pub strokes: &'a [Interval],
    pub velocity: &'a [f64],
    /// Maximum wheel travel (mm)
    pub max_travel: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokePair {
    pub front: Interval,
    pub rear: Interval,
    /// Peak |v| / max travel (1/s)
    pub front_value: f64,
    pub rear_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub r: f64,
    pub p_value: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub direction: BalanceDirection,
    pub pairs: Vec<StrokePair>,
    /// Upper edge of both histogram axes; the lower edge is 0
    pub range: f64,
    /// `histogram[front_bin][rear_bin]`
    pub histogram: Vec<Vec<u64>>,
    pub mean_front: Option<f64>,
    pub mean_rear: Option<f64>,
    /// Mean of front minus rear over the pairs
    pub mean_difference: Option<f64>,
    /// Needs at least three pairs
    pub correlation: Option<Correlation>,
}

impl Balance {
    /// (front, rear) points with rebound shown as negative values.
    pub fn signed_pairs(&self) -> Vec<(f64, f64)> {
        let sign = match self.direction {
            BalanceDirection::Compression => 1.0,
            BalanceDirection::Rebound => -1.0,
        };
        self.pairs
            .iter()
            .map(|p| (sign * p.front_value, sign * p.rear_value))
            .collect()
    }
}

/// Joint front/rear distribution over paired strokes.
#[allow(clippy::cast_precision_loss)]
pub fn stroke_balance(
    front: StrokeSide<'_>,
    rear: StrokeSide<'_>,
    direction: BalanceDirection,
    bins: usize,
) -> Balance {
    let pairs: Vec<StrokePair> = front
        .strokes
        .iter()
        .filter_map(|&f| {
            let r = best_overlap(f, rear.strokes)?;
            Some(StrokePair {
                front: f,
                rear: r,
                front_value: normalized_peak(front.velocity, f, front.max_travel)?,
                rear_value: normalized_peak(rear.velocity, r, rear.max_travel)?,
            })
        })
        .collect();

    let range = pairs
        .iter()
        .flat_map(|p| [p.front_value, p.rear_value])
        .fold(0.0, f64::max);
    let histogram = histogram_2d(&pairs, range, bins);

    let fronts: Vec<f64> = pairs.iter().map(|p| p.front_value).collect();
    let rears: Vec<f64> = pairs.iter().map(|p| p.rear_value).collect();
    let diffs: Vec<f64> = pairs.iter().map(|p| p.front_value - p.rear_value).collect();

    let correlation = (pairs.len() >= 3).then(|| {
        let r = pearson(&fronts, &rears);
        Correlation {
            r,
            p_value: p_value_for_r(r, pairs.len()),
            sample_count: pairs.len(),
        }
    });

    tracing::debug!(
        ?direction,
        front_strokes = front.strokes.len(),
        rear_strokes = rear.strokes.len(),
        pairs = pairs.len(),
        "Balance"
    );

    Balance {
        direction,
        mean_front: mean(&fronts),
        mean_rear: mean(&rears),
        mean_difference: mean(&diffs),
        pairs,
        range,
        histogram,
        correlation,
    }
}

/// Rear stroke sharing the most samples with `front`; earliest wins ties.
fn best_overlap(front: Interval, rear: &[Interval]) -> Option<Interval> {
    let first = rear.partition_point(|r| r.end <= front.start);
    rear[first..]
        .iter()
        .take_while(|r| r.start < front.end)
        .map(|&r| (r, front.overlap(&r)))
        .filter(|&(_, n)| n > 0)
        .fold(None, |best: Option<(Interval, usize)>, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .map(|(r, _)| r)
}

fn normalized_peak(velocity: &[f64], stroke: Interval, max_travel: f64) -> Option<f64> {
    if !(max_travel.is_finite() && max_travel > 0.0) {
        return None;
    }
    let end = stroke.end.min(velocity.len());
    let peak = velocity
        .get(stroke.start..end)?
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| v.abs())
        .reduce(f64::max)?;
    Some(peak / max_travel)
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn histogram_2d(pairs: &[StrokePair], range: f64, bins: usize) -> Vec<Vec<u64>> {
    let mut counts = vec![vec![0u64; bins]; bins];
    if bins == 0 {
        return counts;
    }
    let bin_of = |v: f64| -> usize {
        if range <= 0.0 {
            return 0;
        }
        ((v / range * bins as f64) as usize).min(bins - 1)
    };
    for p in pairs {
        counts[bin_of(p.front_value)][bin_of(p.rear_value)] += 1;
    }
    counts
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
#[allow(clippy::cast_precision_loss)]
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|a| a * a).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

/// Two-tailed p-value of r from Student's t with n-2 degrees of freedom.
#[allow(clippy::cast_precision_loss)]
fn p_value_for_r(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 0.9999 {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();

    match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_stat.abs())),
        Err(_) => 1.0,
    }
}
