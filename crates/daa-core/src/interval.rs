//! Ordered interval and disjoint interval set arithmetic.
//!
//! Leaf dependency for the detectors, the bands engine, and alerting. The set
//! keeps a sorted, pairwise-disjoint, coalesced sequence of closed intervals
//! over the real line, or over a wraparound circle for track angles in
//! [0, 2π). All operations are O(n) amortized in the member count.

use serde::{Deserialize, Serialize};

/// A closed interval [low, up]. Empty iff `low > up`; a point iff equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub low: f64,
    pub up: f64,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        low: f64::INFINITY,
        up: f64::NEG_INFINITY,
    };

    pub fn new(low: f64, up: f64) -> Self {
        Self { low, up }
    }

    pub fn is_empty(&self) -> bool {
        self.low > self.up || self.low.is_nan() || self.up.is_nan()
    }

    pub fn is_point(&self) -> bool {
        self.low == self.up
    }

    /// Width of the interval, zero when empty.
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.up - self.low
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        !self.is_empty() && self.low <= v && v <= self.up
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        Interval::new(self.low.max(other.low), self.up.min(other.up))
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Intersection with [lo, up], empty when disjoint.
    pub fn clip(&self, lo: f64, up: f64) -> Interval {
        self.intersect(&Interval::new(lo, up))
    }
}

/// A maintained collection of sorted, pairwise-disjoint intervals.
///
/// Invariant: no two members touch or overlap. Members are kept in ascending
/// order of lower bound (ties, which can only involve empty input, break by
/// ascending upper bound). In circular mode the domain wraps at `modulo`;
/// callers normalize values into [0, modulo) before insertion, and an
/// interval given with `low > up` is taken as the arc through the seam.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
    modulo: Option<f64>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
            modulo: None,
        }
    }

    /// A set over the circle [0, modulo).
    pub fn circular(modulo: f64) -> Self {
        Self {
            intervals: Vec::new(),
            modulo: Some(modulo),
        }
    }

    pub fn is_circular(&self) -> bool {
        self.modulo.is_some()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn interval(&self, i: usize) -> Option<&Interval> {
        self.intervals.get(i)
    }

    /// Ascending iteration over the members.
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }

    pub fn contains(&self, v: f64) -> bool {
        self.intervals.iter().any(|iv| iv.contains(v))
    }

    /// Sum of member widths.
    pub fn total_measure(&self) -> f64 {
        self.intervals.iter().map(|iv| iv.width()).sum()
    }

    /// Insert an interval, merging any members it overlaps or touches.
    pub fn union(&mut self, iv: Interval) {
        if iv.is_empty() {
            return;
        }
        if let Some(m) = self.modulo {
            if iv.low > iv.up {
                // Arc through the seam: insert as its two halves.
                self.union_linear(Interval::new(iv.low, m));
                self.union_linear(Interval::new(0.0, iv.up));
                return;
            }
        }
        self.union_linear(iv);
    }

    fn union_linear(&mut self, iv: Interval) {
        let mut merged = iv;
        let mut out = Vec::with_capacity(self.intervals.len() + 1);
        let mut placed = false;
        for member in self.intervals.drain(..) {
            if member.up < merged.low {
                out.push(member);
            } else if member.low > merged.up {
                if !placed {
                    out.push(merged);
                    placed = true;
                }
                out.push(member);
            } else {
                // Overlapping or touching: absorb.
                merged = Interval::new(member.low.min(merged.low), member.up.max(merged.up));
            }
        }
        if !placed {
            out.push(merged);
        }
        self.intervals = out;
    }

    /// Union every member of `other` into this set.
    pub fn union_set(&mut self, other: &IntervalSet) {
        for iv in other.iter() {
            self.union(*iv);
        }
    }

    /// Remove the extent of an interval, splitting members as needed.
    pub fn diff(&mut self, iv: Interval) {
        if iv.is_empty() {
            return;
        }
        if let Some(m) = self.modulo {
            if iv.low > iv.up {
                self.diff_linear(Interval::new(iv.low, m));
                self.diff_linear(Interval::new(0.0, iv.up));
                return;
            }
        }
        self.diff_linear(iv);
    }

    fn diff_linear(&mut self, iv: Interval) {
        let mut out = Vec::with_capacity(self.intervals.len() + 1);
        for member in self.intervals.drain(..) {
            if !member.overlaps(&iv) {
                out.push(member);
                continue;
            }
            let left = Interval::new(member.low, iv.low);
            let right = Interval::new(iv.up, member.up);
            if !left.is_empty() && left.width() > 0.0 {
                out.push(left);
            }
            if !right.is_empty() && right.width() > 0.0 {
                out.push(right);
            }
        }
        self.intervals = out;
    }

    /// Delete members narrower than `tol`, suppressing slivers.
    pub fn sweep_single(&mut self, tol: f64) {
        self.intervals.retain(|iv| iv.width() >= tol);
    }

    /// Merge members across gaps narrower than `tol`.
    pub fn sweep_breaks(&mut self, tol: f64) {
        if self.intervals.len() < 2 {
            return;
        }
        let mut out: Vec<Interval> = Vec::with_capacity(self.intervals.len());
        for member in self.intervals.drain(..) {
            match out.last_mut() {
                Some(last) if member.low - last.up < tol => {
                    last.up = last.up.max(member.up);
                }
                _ => out.push(member),
            }
        }
        self.intervals = out;
    }

    /// Members of `self` restricted to the extent of `other`.
    pub fn intersection(&self, other: &IntervalSet) -> IntervalSet {
        let mut out = IntervalSet {
            intervals: Vec::new(),
            modulo: self.modulo,
        };
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let a = self.intervals[i];
            let b = other.intervals[j];
            let cut = a.intersect(&b);
            if !cut.is_empty() && cut.width() > 0.0 {
                out.union(cut);
            }
            if a.up <= b.up {
                i += 1;
            } else {
                j += 1;
            }
        }
        out
    }

    /// Gaps of this set within [lo, up].
    pub fn complement(&self, lo: f64, up: f64) -> IntervalSet {
        let mut out = IntervalSet {
            intervals: vec![Interval::new(lo, up)],
            modulo: self.modulo,
        };
        for iv in &self.intervals {
            out.diff_linear(*iv);
        }
        out
    }
}
