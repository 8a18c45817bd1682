//! Sample-index intervals

use serde::{Deserialize, Serialize};

/// Half-open sample-index range `[start, end)`.
///
/// Field names follow the decoder's record layout (`Start`/`End`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of samples covered.
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Number of samples shared with `other`.
    pub fn overlap(&self, other: &Self) -> usize {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }

    /// Start and end converted to seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_seconds(&self, sample_rate: f64) -> (f64, f64) {
        (
            self.start as f64 / sample_rate,
            self.end as f64 / sample_rate,
        )
    }
}

/// Check the interval-list invariant: every interval is non-empty, the list is
/// sorted ascending by start and no two intervals overlap.
pub fn is_sorted_disjoint(intervals: &[Interval]) -> bool {
    intervals.iter().all(|iv| !iv.is_empty())
        && intervals.windows(2).all(|w| w[0].end <= w[1].start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let a = Interval::new(0, 10);
        assert_eq!(a.overlap(&Interval::new(5, 20)), 5);
        assert_eq!(a.overlap(&Interval::new(10, 20)), 0);
        assert_eq!(a.overlap(&Interval::new(2, 3)), 1);
    }

    #[test]
    fn test_sorted_disjoint() {
        assert!(is_sorted_disjoint(&[]));
        assert!(is_sorted_disjoint(&[Interval::new(0, 2), Interval::new(2, 4)]));
        assert!(!is_sorted_disjoint(&[Interval::new(0, 3), Interval::new(2, 4)]));
        assert!(!is_sorted_disjoint(&[Interval::new(4, 4)]));
    }

    #[test]
    fn test_interval_serde_field_names() {
        let iv: Interval = serde_json::from_str(r#"{"Start": 3, "End": 7}"#).unwrap();
        assert_eq!(iv, Interval::new(3, 7));
        assert_eq!(iv.len(), 4);
    }
}
