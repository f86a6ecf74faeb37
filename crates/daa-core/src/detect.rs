//! Pairwise conflict detectors over relative kinematics.
//!
//! Both detectors work on the relative state s = so - si, v = vo - vi in the
//! local ENU frame and assume linear relative motion over the search window.
//! They are value objects: each configured alert level owns its own deep copy,
//! and none of them ever panics on degenerate geometry.

use serde::{Deserialize, Serialize};

use crate::interval::{Interval, IntervalSet};
use crate::units;
use crate::vect::{Vect2, Vect3};

/// Result of one detector call.
///
/// `time_in`/`time_out` bound the first predicted conflict window within the
/// search window; `conflict()` holds iff that window is nonempty. Times are
/// meaningless when `conflict()` is false.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConflictData {
    /// Loss of separation at the time of the call.
    pub violation: bool,
    /// Entry time of the conflict window, seconds from now.
    pub time_in: f64,
    /// Exit time of the conflict window, seconds from now.
    pub time_out: f64,
    /// Time of closest approach (exact minimizer of |s + t v|^2, floored at 0).
    pub time_cpa: f64,
    /// Separation at closest approach, meters.
    pub dist_cpa: f64,
    /// Relative position used, meters.
    pub s: Vect3,
    /// Relative velocity used, m/s.
    pub v: Vect3,
}

impl ConflictData {
    /// A result that reports no conflict and no violation.
    pub fn none(s: Vect3, v: Vect3) -> Self {
        let (time_cpa, dist_cpa) = closest_approach(&s, &v);
        Self {
            violation: false,
            time_in: f64::INFINITY,
            time_out: f64::NEG_INFINITY,
            time_cpa,
            dist_cpa,
            s,
            v,
        }
    }

    /// Result for input the validity checks should have rejected upstream.
    pub fn invalid() -> Self {
        Self {
            violation: false,
            time_in: f64::INFINITY,
            time_out: f64::NEG_INFINITY,
            time_cpa: f64::NAN,
            dist_cpa: f64::NAN,
            s: Vect3::ZERO,
            v: Vect3::ZERO,
        }
    }

    /// Whether a conflict exists now or within the search window.
    pub fn conflict(&self) -> bool {
        self.time_in <= self.time_out
    }
}

/// Time and distance of closest approach for linear relative motion.
/// Zero relative velocity means the separation never changes.
pub fn closest_approach(s: &Vect3, v: &Vect3) -> (f64, f64) {
    let vv = v.sqv();
    let t = if vv > 0.0 {
        (-s.dot(v) / vv).max(0.0)
    } else {
        0.0
    };
    (t, s.linear(v, t).norm())
}

/// Times where |s2 + t v2| <= d, or an unbounded/empty interval when the
/// relative horizontal velocity is zero.
fn horizontal_entry_exit(s2: Vect2, v2: Vect2, d: f64) -> Interval {
    let a = v2.sqv();
    let c = s2.sqv() - d * d;
    if a <= 0.0 {
        // No relative horizontal motion: inside forever or never inside.
        return if c < 0.0 {
            Interval::new(f64::NEG_INFINITY, f64::INFINITY)
        } else {
            Interval::EMPTY
        };
    }
    let b = 2.0 * s2.dot(&v2);
    let disc = b * b - 4.0 * a * c;
    if disc <= 0.0 {
        return Interval::EMPTY;
    }
    let sq = disc.sqrt();
    Interval::new((-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a))
}

/// Times where |sz + t vz| <= h.
fn vertical_entry_exit(sz: f64, vz: f64, h: f64) -> Interval {
    if vz == 0.0 {
        return if sz.abs() < h {
            Interval::new(f64::NEG_INFINITY, f64::INFINITY)
        } else {
            Interval::EMPTY
        };
    }
    let t1 = (-h - sz) / vz;
    let t2 = (h - sz) / vz;
    Interval::new(t1.min(t2), t1.max(t2))
}

/// Cylinder loss-of-separation detector: horizontal radius `d`, half-height `h`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CylinderDetector {
    /// Horizontal separation minimum, meters.
    pub d: f64,
    /// Vertical separation minimum (half-height), meters.
    pub h: f64,
}

impl Default for CylinderDetector {
    fn default() -> Self {
        Self {
            d: units::nm_to_m(5.0),
            h: units::ft_to_m(1000.0),
        }
    }
}

impl CylinderDetector {
    pub fn new(d_m: f64, h_m: f64) -> Self {
        Self { d: d_m, h: h_m }
    }

    pub fn violation_rel(&self, s: &Vect3) -> bool {
        s.vect2().norm() < self.d && s.z.abs() < self.h
    }

    /// Conflict window within [b, t] for linear relative motion (s, v).
    pub fn conflict_window(&self, s: &Vect3, v: &Vect3, b: f64, t: f64) -> Interval {
        let horiz = horizontal_entry_exit(s.vect2(), v.vect2(), self.d);
        let vert = vertical_entry_exit(s.z, v.z, self.h);
        horiz.intersect(&vert).clip(b, t)
    }
}

/// Well-clear (modified-tau) detector.
///
/// Violation is the conjunction of a horizontal and a vertical condition:
/// horizontally, range below DTHR or, while converging, modified tau within
/// TTHR; vertically, co-altitude within ZTHR or time to co-altitude within
/// TCOA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellClearDetector {
    /// Horizontal range threshold, meters.
    pub dthr: f64,
    /// Vertical range threshold, meters.
    pub zthr: f64,
    /// Modified-tau threshold, seconds.
    pub tthr: f64,
    /// Time-to-co-altitude threshold, seconds.
    pub tcoa: f64,
}

impl Default for WellClearDetector {
    fn default() -> Self {
        Self {
            dthr: units::ft_to_m(4000.0),
            zthr: units::ft_to_m(450.0),
            tthr: 35.0,
            tcoa: 0.0,
        }
    }
}

impl WellClearDetector {
    pub fn new(dthr_m: f64, zthr_m: f64, tthr_s: f64, tcoa_s: f64) -> Self {
        Self {
            dthr: dthr_m,
            zthr: zthr_m,
            tthr: tthr_s,
            tcoa: tcoa_s,
        }
    }

    /// Modified tau: time-to-range-threshold surrogate, valid while converging.
    pub fn taumod(&self, s2: Vect2, v2: Vect2) -> f64 {
        let sv = s2.dot(&v2);
        if sv < 0.0 {
            (self.dthr * self.dthr - s2.sqv()) / sv
        } else {
            -1.0
        }
    }

    pub fn horizontal_wcv(&self, s2: Vect2, v2: Vect2) -> bool {
        if s2.sqv() <= self.dthr * self.dthr {
            return true;
        }
        let tau = self.taumod(s2, v2);
        0.0 <= tau && tau <= self.tthr
    }

    pub fn vertical_wcv(&self, sz: f64, vz: f64) -> bool {
        if sz.abs() <= self.zthr {
            return true;
        }
        if vz == 0.0 {
            return false;
        }
        let t_co = -sz / vz;
        0.0 <= t_co && t_co <= self.tcoa
    }

    pub fn violation_rel(&self, s: &Vect3, v: &Vect3) -> bool {
        self.horizontal_wcv(s.vect2(), v.vect2()) && self.vertical_wcv(s.z, v.z)
    }

    /// Times where the modified-tau condition holds:
    /// converging and |s2 + t v2|^2 + TTHR * ((s2 + t v2) . v2) - DTHR^2 <= 0.
    fn taumod_region(&self, s2: Vect2, v2: Vect2) -> Interval {
        let vv = v2.sqv();
        if vv <= 0.0 {
            return Interval::EMPTY;
        }
        let sv = s2.dot(&v2);
        // Quadratic in t from expanding the taumod inequality.
        let a = vv;
        let b = 2.0 * sv + self.tthr * vv;
        let c = s2.sqv() + self.tthr * sv - self.dthr * self.dthr;
        let disc = b * b - 4.0 * a * c;
        if disc <= 0.0 {
            return Interval::EMPTY;
        }
        let sq = disc.sqrt();
        let region = Interval::new((-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a));
        // Converging only: (s2 + t v2) . v2 < 0 before horizontal CPA.
        let t_cpa = -sv / vv;
        region.intersect(&Interval::new(f64::NEG_INFINITY, t_cpa))
    }

    /// Times where 0 <= tcoa(t) <= TCOA, i.e. [t_co - TCOA, t_co].
    fn coalt_region(&self, sz: f64, vz: f64) -> Interval {
        if vz == 0.0 {
            return Interval::EMPTY;
        }
        let t_co = -sz / vz;
        Interval::new(t_co - self.tcoa, t_co)
    }

    /// Conflict windows within [b, t]; the union of the closed-form roots of
    /// each sub-inequality, horizontal intersected with vertical.
    pub fn conflict_windows(&self, s: &Vect3, v: &Vect3, b: f64, t: f64) -> IntervalSet {
        let s2 = s.vect2();
        let v2 = v.vect2();

        let mut horiz = IntervalSet::new();
        horiz.union(horizontal_entry_exit(s2, v2, self.dthr).clip(b, t));
        horiz.union(self.taumod_region(s2, v2).clip(b, t));

        let mut vert = IntervalSet::new();
        vert.union(vertical_entry_exit(s.z, v.z, self.zthr).clip(b, t));
        vert.union(self.coalt_region(s.z, v.z).clip(b, t));

        horiz.intersection(&vert)
    }
}

/// The closed detector family. A tagged variant rather than trait objects so
/// that configured threshold levels stay plain deep-copyable values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Detector {
    Cylinder(CylinderDetector),
    WellClear(WellClearDetector),
}

impl Detector {
    /// Loss of separation right now for ownship (so, vo) and intruder (si, vi).
    pub fn violation(&self, so: &Vect3, vo: &Vect3, si: &Vect3, vi: &Vect3) -> bool {
        let s = *so - *si;
        let v = *vo - *vi;
        if !s.is_finite() || !v.is_finite() {
            return false;
        }
        match self {
            Detector::Cylinder(d) => d.violation_rel(&s),
            Detector::WellClear(d) => d.violation_rel(&s, &v),
        }
    }

    /// Conflict search over the window [b, t], seconds from now.
    pub fn conflict_detection(
        &self,
        so: &Vect3,
        vo: &Vect3,
        si: &Vect3,
        vi: &Vect3,
        b: f64,
        t: f64,
    ) -> ConflictData {
        let s = *so - *si;
        let v = *vo - *vi;
        if !s.is_finite() || !v.is_finite() || !(b <= t) {
            return ConflictData::invalid();
        }

        let window = match self {
            Detector::Cylinder(d) => d.conflict_window(&s, &v, b, t),
            Detector::WellClear(d) => {
                let set = d.conflict_windows(&s, &v, b, t);
                set.interval(0).copied().unwrap_or(Interval::EMPTY)
            }
        };

        let (time_cpa, dist_cpa) = closest_approach(&s, &v);
        let violation = self.violation(so, vo, si, vi);
        if window.is_empty() {
            return ConflictData {
                violation,
                ..ConflictData::none(s, v)
            };
        }
        ConflictData {
            violation,
            time_in: window.low,
            time_out: window.up,
            time_cpa,
            dist_cpa,
            s,
            v,
        }
    }

    pub fn cylinder(&self) -> Option<&CylinderDetector> {
        match self {
            Detector::Cylinder(d) => Some(d),
            _ => None,
        }
    }

    pub fn well_clear(&self) -> Option<&WellClearDetector> {
        match self {
            Detector::WellClear(d) => Some(d),
            _ => None,
        }
    }
}
