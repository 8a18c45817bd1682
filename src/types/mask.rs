//! Boolean sample masks and interval/mask conversion
//!
//! A [`Mask`] has one entry per telemetry record; `true` marks an included
//! sample. Every operation here is a single linear pass.
//!
//! Binary operations on masks of different lengths keep the receiver's length
//! and treat positions missing from the other operand as `false`.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::Interval;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mask(Vec<bool>);

impl Mask {
    /// Mask of `len` samples, all set to `value`.
    pub fn filled(len: usize, value: bool) -> Self {
        Self(vec![value; len])
    }

    /// Mask that is `true` only within `range` (clamped to `len`).
    pub fn from_range(len: usize, range: Range<usize>) -> Self {
        let end = range.end.min(len);
        let start = range.start.min(end);
        let mut bits = vec![false; len];
        bits[start..end].fill(true);
        Self(bits)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> bool {
        self.0.get(idx).copied().unwrap_or(false)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Number of `true` positions.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|&b| b)
    }

    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        Self(
            self.0
                .iter()
                .enumerate()
                .map(|(i, &b)| b && other.get(i))
                .collect(),
        )
    }

    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        Self(
            self.0
                .iter()
                .enumerate()
                .map(|(i, &b)| b || other.get(i))
                .collect(),
        )
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(&self) -> Self {
        Self(self.0.iter().map(|&b| !b).collect())
    }

    /// Keep only the `true` positions that fall inside `range`.
    #[must_use]
    pub fn intersect_range(&self, range: Range<usize>) -> Self {
        Self(
            self.0
                .iter()
                .enumerate()
                .map(|(i, &b)| b && range.contains(&i))
                .collect(),
        )
    }

    /// Maximal runs of `true`, as a sorted disjoint interval list.
    pub fn intervals(&self) -> Vec<Interval> {
        let mut out = Vec::new();
        let mut run_start: Option<usize> = None;
        for (i, &b) in self.0.iter().enumerate() {
            match (b, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(s)) => {
                    out.push(Interval::new(s, i));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = run_start {
            out.push(Interval::new(s, self.0.len()));
        }
        out
    }

    /// Longest run of `true`; the earliest one wins ties.
    pub fn longest_run(&self) -> Option<Interval> {
        self.intervals()
            .into_iter()
            .fold(None, |best: Option<Interval>, iv| match best {
                Some(b) if b.len() >= iv.len() => Some(b),
                _ => Some(iv),
            })
    }

    /// Values at the `true` positions, in order.
    pub fn select<T: Copy>(&self, values: &[T]) -> Vec<T> {
        values
            .iter()
            .zip(self.0.iter())
            .filter_map(|(&v, &b)| b.then_some(v))
            .collect()
    }

    /// Indices of the `true` positions.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
    }
}

impl From<Vec<bool>> for Mask {
    fn from(bits: Vec<bool>) -> Self {
        Self(bits)
    }
}

/// Build a mask of `length` samples from an interval list.
///
/// With `invert = true` the positions inside any interval are `true`; with
/// `invert = false` the result is the complement (positions outside every
/// interval are `true`). Interval bounds beyond `length` are clamped.
pub fn intervals_mask(intervals: &[Interval], length: usize, invert: bool) -> Mask {
    let mut bits = vec![!invert; length];
    for iv in intervals {
        let end = iv.end.min(length);
        let start = iv.start.min(end);
        bits[start..end].fill(invert);
    }
    Mask(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervals_mask_inside_and_outside() {
        let ivs = [Interval::new(1, 3), Interval::new(5, 6)];
        let inside = intervals_mask(&ivs, 8, true);
        let outside = intervals_mask(&ivs, 8, false);
        assert_eq!(
            inside.as_slice(),
            &[false, true, true, false, false, true, false, false]
        );
        assert_eq!(outside, inside.not());
        assert_eq!(inside.count() + outside.count(), 8);
    }

    #[test]
    fn test_intervals_mask_complement_for_many_layouts() {
        let layouts: Vec<Vec<Interval>> = vec![
            vec![],
            vec![Interval::new(0, 10)],
            vec![Interval::new(0, 1), Interval::new(9, 10)],
            vec![Interval::new(2, 4), Interval::new(4, 7)],
            vec![Interval::new(8, 40)],
        ];
        for ivs in layouts {
            for n in [0, 1, 5, 10, 12] {
                let a = intervals_mask(&ivs, n, true);
                let b = intervals_mask(&ivs, n, false);
                assert_eq!(a.len(), n);
                assert!(a
                    .as_slice()
                    .iter()
                    .zip(b.as_slice())
                    .all(|(x, y)| x != y));
            }
        }
    }

    #[test]
    fn test_intervals_roundtrip_from_mask() {
        let ivs = vec![Interval::new(0, 2), Interval::new(4, 5), Interval::new(7, 9)];
        let m = intervals_mask(&ivs, 9, true);
        assert_eq!(m.intervals(), ivs);
    }

    #[test]
    fn test_set_operations() {
        let a = Mask::from(vec![true, true, false, false]);
        let b = Mask::from(vec![true, false, true, false]);
        assert_eq!(a.and(&b).as_slice(), &[true, false, false, false]);
        assert_eq!(a.or(&b).as_slice(), &[true, true, true, false]);
        assert_eq!(a.not().as_slice(), &[false, false, true, true]);
    }

    #[test]
    fn test_unequal_lengths_use_receiver_length() {
        let a = Mask::filled(4, true);
        let b = Mask::filled(2, true);
        assert_eq!(a.and(&b).as_slice(), &[true, true, false, false]);
        assert_eq!(b.or(&a).len(), 2);
    }

    #[test]
    fn test_range_and_intersection() {
        let m = Mask::from_range(6, 2..4);
        assert_eq!(m.count(), 2);
        let full = Mask::filled(6, true);
        assert_eq!(full.intersect_range(2..4), m);
        assert_eq!(Mask::from_range(3, 2..10).count(), 1);
        assert_eq!(Mask::from_range(3, 5..10).count(), 0);
    }

    #[test]
    fn test_longest_run_and_select() {
        let m = Mask::from(vec![true, false, true, true, true, false, true, true]);
        assert_eq!(m.longest_run(), Some(Interval::new(2, 5)));
        assert_eq!(Mask::filled(3, false).longest_run(), None);
        assert_eq!(m.select(&[0, 1, 2, 3, 4, 5, 6, 7]), vec![0, 2, 3, 4, 6, 7]);
        assert_eq!(m.indices().collect::<Vec<_>>(), vec![0, 2, 3, 4, 6, 7]);
    }
}
