//! Kinematic maneuver bands.
//!
//! For each maneuver dimension the engine discretizes the legal range,
//! synthesizes a kinematically reachable trajectory to every candidate value,
//! re-runs the configured detectors against every intruder along that
//! trajectory, and accumulates the answers into disjoint interval sets tagged
//! with a severity region. When no conflict-free value exists the engine
//! searches forward along the unmaneuvered path for the earliest escape
//! (recovery bands), hard-capped at the configured max recovery time.

use serde::{Deserialize, Serialize};

use crate::alert::{AlertLevel, AlertThresholds};
use crate::detect::{closest_approach, CylinderDetector, Detector};
use crate::interval::{Interval, IntervalSet};
use crate::params::Parameters;
use crate::units;
use crate::vect::Vect3;
use crate::velocity::Velocity;

use std::f64::consts::PI;

/// Sampling step along the maneuver segment, seconds.
const MANEUVER_SAMPLE_S: f64 = 1.0;
/// Granularity of the forward recovery search, seconds.
const RECOVERY_SEARCH_STEP_S: f64 = 1.0;

/// A maneuver dimension of the ownship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandsDim {
    Track,
    GroundSpeed,
    VerticalSpeed,
    Altitude,
}

/// Severity tag on an output interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandsRegion {
    /// Conflict-free.
    None,
    /// Conflict at the least severe configured levels.
    Far,
    /// Conflict one level below the most severe.
    Mid,
    /// Conflict at the most severe configured level.
    Near,
    /// Earliest escape once no conflict-free value exists.
    Recovery,
    /// Could not be computed.
    Unknown,
}

/// One tagged output interval, SI units of its dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub interval: Interval,
    pub region: BandsRegion,
}

/// An intruder projected into the ownship-anchored ENU frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalIntruder {
    /// Relative position, meters (intruder minus ownship).
    pub p: Vect3,
    /// Intruder velocity, m/s.
    pub v: Vect3,
}

/// A snapshot projected into a common frame with the ownship at the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalScene {
    /// Ownship velocity.
    pub vo: Velocity,
    /// Ownship altitude, meters (candidate altitudes are absolute).
    pub own_alt: f64,
    /// Caller-visible wind vector; used for airspeed-derived turn rates.
    pub wind: Velocity,
    pub intruders: Vec<LocalIntruder>,
}

impl LocalScene {
    /// Scene advanced `t` seconds along every unmaneuvered path, keeping the
    /// ownship at the origin.
    pub fn shifted(&self, t: f64) -> LocalScene {
        let vo = self.vo.vect3();
        LocalScene {
            vo: self.vo,
            own_alt: self.own_alt + self.vo.vs() * t,
            wind: self.wind,
            intruders: self
                .intruders
                .iter()
                .map(|it| LocalIntruder {
                    p: it.p + (it.v - vo) * t,
                    v: it.v,
                })
                .collect(),
        }
    }
}

/// Legal range and step of a dimension: (low, up, step, circular).
fn dim_range(dim: BandsDim, params: &Parameters) -> (f64, f64, f64, bool) {
    match dim {
        BandsDim::Track => (0.0, 2.0 * PI, params.trk_step, true),
        BandsDim::GroundSpeed => (params.min_gs, params.max_gs, params.gs_step, false),
        BandsDim::VerticalSpeed => (params.min_vs, params.max_vs, params.vs_step, false),
        BandsDim::Altitude => (params.min_alt, params.max_alt, params.alt_step, false),
    }
}

fn enumerate_candidates(lo: f64, hi: f64, step: f64, circular: bool) -> Vec<f64> {
    let mut out = Vec::new();
    if circular {
        let n = ((hi - lo) / step).ceil() as usize;
        for k in 0..n {
            let v = lo + k as f64 * step;
            if v < hi {
                out.push(v);
            }
        }
    } else {
        let n = ((hi - lo) / step + 1e-9).floor() as usize;
        for k in 0..=n {
            out.push(lo + k as f64 * step);
        }
    }
    out
}

/// A synthesized maneuver from the current state to one candidate value:
/// sampled states during the transition, then the reached state.
struct Maneuver {
    t_reach: f64,
    p_reach: Vect3,
    v_after: Vect3,
    /// (time, ownship position, ownship velocity) during the transition.
    samples: Vec<(f64, Vect3, Vect3)>,
}

impl Maneuver {
    fn instant(v_after: Velocity) -> Self {
        Self {
            t_reach: 0.0,
            p_reach: Vect3::ZERO,
            v_after: v_after.vect3(),
            samples: Vec::new(),
        }
    }
}

/// Turn rate from the configuration: explicit rate wins, otherwise a
/// coordinated turn at the configured bank angle and current airspeed.
fn turn_rate(scene: &LocalScene, params: &Parameters) -> f64 {
    if params.turn_rate > 0.0 {
        return params.turn_rate;
    }
    let airspeed = (scene.vo.vect2() - scene.wind.vect2()).norm().max(1.0);
    units::G * params.bank_angle.tan() / airspeed
}

fn synthesize(dim: BandsDim, target: f64, scene: &LocalScene, params: &Parameters) -> Maneuver {
    let vo = scene.vo;
    match dim {
        BandsDim::Track => {
            let gs = vo.gs();
            let vs = vo.vs();
            if gs < 0.1 {
                return Maneuver::instant(vo.with_trk(target));
            }
            let trk0 = vo.trk();
            let delta = units::to_pi(target - trk0);
            if delta.abs() < 1e-9 {
                return Maneuver::instant(vo);
            }
            let omega = turn_rate(scene, params);
            let dir = delta.signum();
            let t_reach = delta.abs() / omega;
            let radius = gs / omega;
            let pos = |tau: f64| {
                let trk = trk0 + dir * omega * tau;
                Vect3::new(
                    dir * radius * (trk0.cos() - trk.cos()),
                    dir * radius * (trk.sin() - trk0.sin()),
                    vs * tau,
                )
            };
            let mut samples = Vec::new();
            let mut tau = 0.0;
            while tau < t_reach {
                let trk = trk0 + dir * omega * tau;
                samples.push((tau, pos(tau), Velocity::from_trk_gs_vs(trk, gs, vs).vect3()));
                tau += MANEUVER_SAMPLE_S;
            }
            Maneuver {
                t_reach,
                p_reach: pos(t_reach),
                v_after: vo.with_trk(units::to_2pi(target)).vect3(),
                samples,
            }
        }
        BandsDim::GroundSpeed => {
            let g0 = vo.gs();
            let dv = target - g0;
            if dv.abs() < 1e-9 {
                return Maneuver::instant(vo);
            }
            let accel = params.horizontal_accel * dv.signum();
            let t_reach = dv.abs() / params.horizontal_accel;
            let trk0 = vo.trk();
            let u = Vect3::new(trk0.sin(), trk0.cos(), 0.0);
            let pos = |tau: f64| {
                u * (g0 * tau + 0.5 * accel * tau * tau) + Vect3::new(0.0, 0.0, vo.vs() * tau)
            };
            let mut samples = Vec::new();
            let mut tau = 0.0;
            while tau < t_reach {
                samples.push((tau, pos(tau), vo.with_gs(g0 + accel * tau).vect3()));
                tau += MANEUVER_SAMPLE_S;
            }
            Maneuver {
                t_reach,
                p_reach: pos(t_reach),
                v_after: vo.with_gs(target).vect3(),
                samples,
            }
        }
        BandsDim::VerticalSpeed => {
            let v0 = vo.vs();
            let dv = target - v0;
            if dv.abs() < 1e-9 {
                return Maneuver::instant(vo);
            }
            let accel = params.vertical_accel * dv.signum();
            let t_reach = dv.abs() / params.vertical_accel;
            let pos = |tau: f64| {
                Vect3::new(vo.x * tau, vo.y * tau, v0 * tau + 0.5 * accel * tau * tau)
            };
            let mut samples = Vec::new();
            let mut tau = 0.0;
            while tau < t_reach {
                samples.push((tau, pos(tau), vo.with_vs(v0 + accel * tau).vect3()));
                tau += MANEUVER_SAMPLE_S;
            }
            Maneuver {
                t_reach,
                p_reach: pos(t_reach),
                v_after: vo.with_vs(target).vect3(),
                samples,
            }
        }
        BandsDim::Altitude => {
            let dz = target - scene.own_alt;
            if dz.abs() < 1e-6 {
                return Maneuver::instant(vo.with_vs(0.0));
            }
            let rate = params.vertical_rate * dz.signum();
            let t_reach = dz.abs() / params.vertical_rate;
            let pos = |tau: f64| Vect3::new(vo.x * tau, vo.y * tau, rate * tau);
            let mut samples = Vec::new();
            let mut tau = 0.0;
            while tau < t_reach {
                samples.push((tau, pos(tau), vo.with_vs(rate).vect3()));
                tau += MANEUVER_SAMPLE_S;
            }
            Maneuver {
                t_reach,
                p_reach: Vect3::new(vo.x * t_reach, vo.y * t_reach, dz),
                v_after: vo.with_vs(0.0).vect3(),
                samples,
            }
        }
    }
}

/// Detection horizon of an alert level; alerting time 0 means the level is
/// violation-only and is searched over the whole lookahead.
fn effective_horizon(alerting_time: f64, lookahead: f64) -> f64 {
    if alerting_time > 0.0 {
        alerting_time.min(lookahead)
    } else {
        lookahead
    }
}

/// Whether the maneuver conflicts with any of `intruders`: sampled violation
/// during the transition, closed-form detection on the linear segment after.
fn maneuver_conflicts(
    m: &Maneuver,
    intruders: &[LocalIntruder],
    detector: &Detector,
    horizon: f64,
) -> bool {
    for it in intruders {
        for (tau, p, v) in &m.samples {
            if *tau > horizon {
                break;
            }
            if detector.violation(p, v, &it.p.linear(&it.v, *tau), &it.v) {
                return true;
            }
        }
        if m.t_reach < horizon {
            let si = it.p.linear(&it.v, m.t_reach);
            let cd = detector.conflict_detection(
                &m.p_reach,
                &m.v_after,
                &si,
                &it.v,
                0.0,
                horizon - m.t_reach,
            );
            if cd.conflict() {
                return true;
            }
        }
    }
    false
}

/// Most severe level (1-based) that predicts a conflict for this candidate,
/// 0 when the candidate is conflict-free.
fn candidate_severity(
    dim: BandsDim,
    value: f64,
    scene: &LocalScene,
    params: &Parameters,
    thresholds: &AlertThresholds,
) -> usize {
    let m = synthesize(dim, value, scene, params);
    let mut severity = 0;
    for (idx, level) in thresholds.iter().enumerate() {
        let horizon = effective_horizon(level.alerting_time, params.lookahead_time);
        if maneuver_conflicts(&m, &scene.intruders, &level.detector, horizon) {
            severity = idx + 1;
        }
    }
    severity
}

fn region_of(severity: usize, n_levels: usize) -> BandsRegion {
    if severity == 0 {
        return BandsRegion::None;
    }
    match n_levels - severity {
        0 => BandsRegion::Near,
        1 => BandsRegion::Mid,
        _ => BandsRegion::Far,
    }
}

/// Candidate extent unioned into its region set. Track extents wrap.
fn union_extent(set: &mut IntervalSet, value: f64, step: f64, lo: f64, hi: f64, circular: bool) {
    let half = step / 2.0;
    if circular {
        let a = units::to_2pi(value - half);
        let b = units::to_2pi(value + half);
        if a == b {
            set.union(Interval::new(0.0, 2.0 * PI));
        } else {
            set.union(Interval::new(a, b));
        }
    } else {
        set.union(Interval::new(value - half, value + half).clip(lo, hi));
    }
}

fn assemble(
    region_sets: Vec<(BandsRegion, IntervalSet)>,
    lo: f64,
    hi: f64,
    step: f64,
) -> Vec<Band> {
    let mut covered = IntervalSet::new();
    let mut bands = Vec::new();
    for (region, set) in &region_sets {
        for iv in set.iter() {
            covered.union(*iv);
            bands.push(Band {
                interval: *iv,
                region: *region,
            });
        }
    }
    let mut none = covered.complement(lo, hi);
    none.sweep_single(step * 0.01);
    for iv in none.iter() {
        bands.push(Band {
            interval: *iv,
            region: BandsRegion::None,
        });
    }
    bands.sort_by(|a, b| {
        a.interval
            .low
            .total_cmp(&b.interval.low)
            .then(a.interval.up.total_cmp(&b.interval.up))
    });
    bands
}

/// Compute the maneuver bands of one dimension against every intruder.
pub fn compute(
    dim: BandsDim,
    scene: &LocalScene,
    params: &Parameters,
    thresholds: &AlertThresholds,
) -> Vec<Band> {
    let (lo, hi, step, circular) = dim_range(dim, params);
    let candidates = enumerate_candidates(lo, hi, step, circular);
    let n_levels = thresholds.len();
    if candidates.is_empty() || n_levels == 0 || scene.intruders.is_empty() {
        return vec![Band {
            interval: Interval::new(lo, hi),
            region: BandsRegion::None,
        }];
    }

    let severities: Vec<usize> = candidates
        .iter()
        .map(|&v| candidate_severity(dim, v, scene, params, thresholds))
        .collect();

    let saturated = severities.iter().all(|&s| s == n_levels);
    if saturated && recovery_enabled(dim, params) {
        return recovery_bands(dim, &candidates, scene, params, thresholds);
    }

    let mut sets = vec![
        (BandsRegion::Near, new_region_set(circular)),
        (BandsRegion::Mid, new_region_set(circular)),
        (BandsRegion::Far, new_region_set(circular)),
    ];
    for (&value, &severity) in candidates.iter().zip(&severities) {
        let region = region_of(severity, n_levels);
        if let Some((_, set)) = sets.iter_mut().find(|(r, _)| *r == region) {
            union_extent(set, value, step, lo, hi, circular);
        }
    }
    for (_, set) in sets.iter_mut() {
        set.sweep_breaks(step * 0.01);
        set.sweep_single(step * 0.5);
    }
    assemble(sets, lo, hi, step)
}

fn recovery_enabled(dim: BandsDim, params: &Parameters) -> bool {
    match dim {
        BandsDim::Track => params.recovery_trk,
        BandsDim::GroundSpeed => params.recovery_gs,
        BandsDim::VerticalSpeed => params.recovery_vs,
        BandsDim::Altitude => params.recovery_alt,
    }
}

/// The volume used during the forward recovery search: the configured minimum
/// recovery distances, falling back to the most severe detector's thresholds.
fn recovery_detector(thresholds: &AlertThresholds, params: &Parameters) -> Detector {
    let (dh, dv) = match thresholds.most_severe().map(|l| &l.detector) {
        Some(Detector::Cylinder(c)) => (c.d, c.h),
        Some(Detector::WellClear(w)) => (w.dthr, w.zthr),
        None => {
            let c = CylinderDetector::default();
            (c.d, c.h)
        }
    };
    let d = if params.min_horizontal_recovery > 0.0 {
        params.min_horizontal_recovery
    } else {
        dh
    };
    let h = if params.min_vertical_recovery > 0.0 {
        params.min_vertical_recovery
    } else {
        dv
    };
    Detector::Cylinder(CylinderDetector::new(d, h))
}

/// Smallest predicted miss distance over all intruders for the post-maneuver
/// segment; used by the repulsive criterion.
fn min_miss_distance(m: &Maneuver, intruders: &[LocalIntruder]) -> f64 {
    let mut best = f64::INFINITY;
    for it in intruders {
        let s = m.p_reach - it.p.linear(&it.v, m.t_reach);
        let v = m.v_after - it.v;
        let (_, dist) = closest_approach(&s, &v);
        best = best.min(dist);
    }
    best
}

/// Forward search for the earliest instant at which a conflict-free maneuver
/// exists, bounded by `max_recovery_time`. Returns solid Near when the bound
/// is exhausted without a solution.
fn recovery_bands(
    dim: BandsDim,
    candidates: &[f64],
    scene: &LocalScene,
    params: &Parameters,
    thresholds: &AlertThresholds,
) -> Vec<Band> {
    let (lo, hi, step, circular) = dim_range(dim, params);
    let rec_det = recovery_detector(thresholds, params);
    let stability = params.recovery_stability_time;

    let mut t_r = 0.0;
    while t_r <= params.max_recovery_time {
        let now = scene.shifted(t_r);
        let later = if stability > 0.0 {
            Some(scene.shifted(t_r + stability))
        } else {
            None
        };

        let unmaneuvered_miss = if params.repulsive_criterion {
            let straight = synthesize(dim, current_value(dim, &now), &now, params);
            min_miss_distance(&straight, &now.intruders)
        } else {
            0.0
        };

        let free: Vec<bool> = candidates
            .iter()
            .map(|&v| {
                let m = synthesize(dim, v, &now, params);
                if maneuver_conflicts(&m, &now.intruders, &rec_det, params.lookahead_time) {
                    return false;
                }
                if let Some(later) = &later {
                    let ml = synthesize(dim, v, later, params);
                    if maneuver_conflicts(&ml, &later.intruders, &rec_det, params.lookahead_time) {
                        return false;
                    }
                }
                if params.repulsive_criterion
                    && min_miss_distance(&m, &now.intruders) < unmaneuvered_miss
                {
                    return false;
                }
                true
            })
            .collect();

        if free.iter().any(|&f| f) {
            let mut rec_set = new_region_set(circular);
            for (&v, &f) in candidates.iter().zip(&free) {
                if f {
                    union_extent(&mut rec_set, v, step, lo, hi, circular);
                }
            }
            rec_set.sweep_breaks(step * 0.01);
            rec_set.sweep_single(step * 0.5);
            let mut bands = Vec::new();
            let mut covered = IntervalSet::new();
            for iv in rec_set.iter() {
                covered.union(*iv);
                bands.push(Band {
                    interval: *iv,
                    region: BandsRegion::Recovery,
                });
            }
            for iv in covered.complement(lo, hi).iter() {
                if iv.width() > step * 0.01 {
                    bands.push(Band {
                        interval: *iv,
                        region: BandsRegion::Near,
                    });
                }
            }
            bands.sort_by(|a, b| {
                a.interval
                    .low
                    .total_cmp(&b.interval.low)
                    .then(a.interval.up.total_cmp(&b.interval.up))
            });
            return bands;
        }
        t_r += RECOVERY_SEARCH_STEP_S;
    }

    // No recovery found within the bound.
    vec![Band {
        interval: Interval::new(lo, hi),
        region: BandsRegion::Near,
    }]
}

/// The ownship's current value of a dimension.
fn current_value(dim: BandsDim, scene: &LocalScene) -> f64 {
    match dim {
        BandsDim::Track => scene.vo.trk(),
        BandsDim::GroundSpeed => scene.vo.gs(),
        BandsDim::VerticalSpeed => scene.vo.vs(),
        BandsDim::Altitude => scene.own_alt,
    }
}

/// Collision-avoidance bands: the same machinery restricted to the
/// violation-only sub-detector of the most severe level (its bare cylinder
/// volume, searched over the whole lookahead).
pub fn compute_ca(
    dim: BandsDim,
    scene: &LocalScene,
    params: &Parameters,
    thresholds: &AlertThresholds,
) -> Vec<Band> {
    let (dh, dv) = match thresholds.most_severe().map(|l| &l.detector) {
        Some(Detector::Cylinder(c)) => (c.d, c.h),
        Some(Detector::WellClear(w)) => (w.dthr, w.zthr),
        None => {
            let c = CylinderDetector::default();
            (c.d, c.h)
        }
    };
    let sub = AlertThresholds::new(vec![AlertLevel::new(
        Detector::Cylinder(CylinderDetector::new(dh, dv)),
        0.0,
        false,
    )]);
    compute(dim, scene, params, &sub)
}

/// Whether any sampled maneuver of `dim` within [lo, hi] conflicts with one
/// intruder. Used by alerting spreads; recovery is never consulted here.
#[allow(clippy::too_many_arguments)]
pub fn spread_conflict(
    dim: BandsDim,
    scene: &LocalScene,
    intruder: &LocalIntruder,
    detector: &Detector,
    horizon: f64,
    lo: f64,
    hi: f64,
    params: &Parameters,
) -> bool {
    let (range_lo, range_hi, step, circular) = dim_range(dim, params);
    let mut v = lo;
    while v <= hi + 1e-9 {
        let target = if circular {
            units::to_2pi(v)
        } else {
            v.clamp(range_lo, range_hi)
        };
        let m = synthesize(dim, target, scene, params);
        if maneuver_conflicts(&m, std::slice::from_ref(intruder), detector, horizon) {
            return true;
        }
        v += step;
    }
    false
}

/// Circular set for track, linear otherwise.
fn new_region_set(circular: bool) -> IntervalSet {
    if circular {
        IntervalSet::circular(2.0 * PI)
    } else {
        IntervalSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{ft_to_m, kn_to_mps, nm_to_m};

    fn northbound_scene(intruders: Vec<LocalIntruder>) -> LocalScene {
        LocalScene {
            vo: Velocity::from_trk_gs_vs(0.0, kn_to_mps(200.0), 0.0),
            own_alt: ft_to_m(3000.0),
            wind: Velocity::ZERO,
            intruders,
        }
    }

    fn cylinder_ladder() -> AlertThresholds {
        AlertThresholds::new(vec![AlertLevel::new(
            Detector::Cylinder(CylinderDetector::new(nm_to_m(5.0), ft_to_m(1000.0))),
            0.0,
            false,
        )])
    }

    fn head_on_intruder(range_m: f64) -> LocalIntruder {
        LocalIntruder {
            p: Vect3::new(0.0, range_m, 0.0),
            v: Velocity::from_trk_gs_vs(PI, kn_to_mps(200.0), 0.0).vect3(),
        }
    }

    fn region_at(bands: &[Band], v: f64) -> BandsRegion {
        bands
            .iter()
            .find(|b| b.interval.contains(v))
            .map(|b| b.region)
            .unwrap_or(BandsRegion::Unknown)
    }

    #[test]
    fn no_intruders_single_none_band() {
        let scene = northbound_scene(Vec::new());
        let params = Parameters::default();
        let ladder = cylinder_ladder();
        for dim in [
            BandsDim::Track,
            BandsDim::GroundSpeed,
            BandsDim::VerticalSpeed,
            BandsDim::Altitude,
        ] {
            let bands = compute(dim, &scene, &params, &ladder);
            assert_eq!(bands.len(), 1, "{:?}", dim);
            assert_eq!(bands[0].region, BandsRegion::None);
            let (lo, hi, _, _) = dim_range(dim, &params);
            assert_eq!(bands[0].interval, Interval::new(lo, hi));
        }
    }

    #[test]
    fn head_on_track_bands_near_around_current_track() {
        let mut params = Parameters::default();
        params.lookahead_time = 300.0;
        let scene = northbound_scene(vec![head_on_intruder(nm_to_m(10.0))]);
        let bands = compute(BandsDim::Track, &scene, &params, &cylinder_ladder());

        // Flying at the intruder conflicts, turning perpendicular does not.
        assert_eq!(region_at(&bands, 0.01), BandsRegion::Near);
        assert_eq!(region_at(&bands, PI / 2.0), BandsRegion::None);
        assert_eq!(region_at(&bands, PI), BandsRegion::None);
        assert_eq!(region_at(&bands, 3.0 * PI / 2.0), BandsRegion::None);
    }

    #[test]
    fn bands_cover_the_whole_range() {
        let mut params = Parameters::default();
        params.lookahead_time = 300.0;
        let scene = northbound_scene(vec![head_on_intruder(nm_to_m(10.0))]);
        for dim in [BandsDim::Track, BandsDim::GroundSpeed, BandsDim::Altitude] {
            let bands = compute(dim, &scene, &params, &cylinder_ladder());
            let (lo, hi, step, _) = dim_range(dim, &params);
            let measure: f64 = bands.iter().map(|b| b.interval.width()).sum();
            assert!(
                (measure - (hi - lo)).abs() < step,
                "{:?}: measure {} of {}",
                dim,
                measure,
                hi - lo
            );
        }
    }

    #[test]
    fn three_level_ladder_grades_regions() {
        // Same volume, nested alerting times: closer in time means more severe.
        let det = Detector::Cylinder(CylinderDetector::new(nm_to_m(5.0), ft_to_m(1000.0)));
        let ladder = AlertThresholds::new(vec![
            AlertLevel::new(det, 180.0, false),
            AlertLevel::new(det, 120.0, false),
            AlertLevel::new(det, 60.0, false),
        ]);
        let mut params = Parameters::default();
        params.lookahead_time = 300.0;
        // Head-on at 10 NM, 400 kn closure: conflict enters at ~45 s, so the
        // current track trips all three levels.
        let scene = northbound_scene(vec![head_on_intruder(nm_to_m(10.0))]);
        let bands = compute(BandsDim::Track, &scene, &params, &ladder);
        assert_eq!(region_at(&bands, 0.01), BandsRegion::Near);
        assert!(bands.iter().any(|b| b.region == BandsRegion::None));
    }

    #[test]
    fn solid_near_when_every_candidate_conflicts() {
        let mut params = Parameters::default();
        params.recovery_trk = false;
        // Intruder inside the separation volume right now: every candidate
        // starts in violation.
        let scene = northbound_scene(vec![head_on_intruder(nm_to_m(1.0))]);
        let bands = compute(BandsDim::Track, &scene, &params, &cylinder_ladder());
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].region, BandsRegion::Near);
        assert!((bands[0].interval.width() - 2.0 * PI).abs() < 1e-6);
    }

    #[test]
    fn recovery_bands_appear_after_intruder_passes() {
        let mut params = Parameters::default();
        params.lookahead_time = 180.0;
        params.max_recovery_time = 120.0;
        // Intruder currently violating, crossing fast left to right: every
        // immediate candidate conflicts but the geometry clears itself.
        let scene = northbound_scene(vec![LocalIntruder {
            p: Vect3::new(-nm_to_m(0.5), nm_to_m(1.0), 0.0),
            v: Velocity::from_trk_gs_vs(PI / 2.0, kn_to_mps(400.0), 0.0).vect3(),
        }]);
        let bands = compute(BandsDim::Track, &scene, &params, &cylinder_ladder());
        assert!(
            bands.iter().any(|b| b.region == BandsRegion::Recovery),
            "expected recovery bands, got {:?}",
            bands
        );
    }

    #[test]
    fn recovery_search_is_bounded() {
        let mut params = Parameters::default();
        params.max_recovery_time = 5.0;
        // Intruder welded to the ownship: same velocity, zero separation.
        // No maneuver or delay ever escapes, the search must cap out.
        let scene = northbound_scene(vec![LocalIntruder {
            p: Vect3::new(100.0, 0.0, 0.0),
            v: Velocity::from_trk_gs_vs(0.0, kn_to_mps(200.0), 0.0).vect3(),
        }]);
        let bands = compute(BandsDim::Track, &scene, &params, &cylinder_ladder());
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].region, BandsRegion::Near);
    }

    #[test]
    fn ca_bands_use_bare_volume() {
        let mut params = Parameters::default();
        params.lookahead_time = 300.0;
        let ladder = AlertThresholds::default();
        let scene = northbound_scene(vec![head_on_intruder(nm_to_m(10.0))]);
        let ca = compute_ca(BandsDim::Track, &scene, &params, &ladder);
        // The well-clear DTHR cylinder is much smaller than the tau-widened
        // region, so CA bands are narrower than conflict bands.
        let conflict = compute(BandsDim::Track, &scene, &params, &ladder);
        let ca_near: f64 = ca
            .iter()
            .filter(|b| b.region == BandsRegion::Near)
            .map(|b| b.interval.width())
            .sum();
        let conflict_near: f64 = conflict
            .iter()
            .filter(|b| b.region != BandsRegion::None)
            .map(|b| b.interval.width())
            .sum();
        assert!(ca_near > 0.0);
        assert!(ca_near <= conflict_near);
    }

    #[test]
    fn altitude_bands_forbid_intruder_level() {
        let mut params = Parameters::default();
        params.lookahead_time = 300.0;
        // Intruder 20 NM ahead, co-altitude, 300 kn closure: the conflict is
        // ~3 min out, so a climb started now clears the volume in time while
        // holding altitude does not.
        let scene = northbound_scene(vec![LocalIntruder {
            p: Vect3::new(0.0, nm_to_m(20.0), 0.0),
            v: Velocity::from_trk_gs_vs(PI, kn_to_mps(100.0), 0.0).vect3(),
        }]);
        let bands = compute(BandsDim::Altitude, &scene, &params, &cylinder_ladder());
        assert_eq!(region_at(&bands, scene.own_alt), BandsRegion::Near);
        assert_eq!(region_at(&bands, ft_to_m(9500.0)), BandsRegion::None);
    }
}
