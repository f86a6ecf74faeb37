//! Alerting thresholds and per-intruder urgency.

use serde::{Deserialize, Serialize};

use crate::bands::{self, BandsDim, LocalIntruder, LocalScene};
use crate::detect::{ConflictData, Detector, WellClearDetector};
use crate::params::Parameters;
use crate::units;

/// One severity level of the alerting ladder.
///
/// Each level owns its detector instance outright; levels never share
/// mutable state. `spread` opts the level into the configured per-dimension
/// spread widening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertLevel {
    pub detector: Detector,
    /// Horizon used to decide whether this level fires, seconds.
    pub alerting_time: f64,
    /// Widen the trigger with the configured maneuver spreads.
    pub spread: bool,
}

impl AlertLevel {
    pub fn new(detector: Detector, alerting_time: f64, spread: bool) -> Self {
        Self {
            detector,
            alerting_time,
            spread,
        }
    }
}

/// Ordered alerting ladder. Index 1 is the least severe level, the last
/// index the most severe; `alerting` scans from most to least severe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    levels: Vec<AlertLevel>,
}

impl Default for AlertThresholds {
    /// Three-step well-clear ladder: preventive (wider vertical volume,
    /// spread enabled), corrective, and warning (short alerting time).
    fn default() -> Self {
        let preventive = WellClearDetector {
            zthr: units::ft_to_m(700.0),
            ..WellClearDetector::default()
        };
        let corrective = WellClearDetector::default();
        Self {
            levels: vec![
                AlertLevel::new(Detector::WellClear(preventive), 55.0, true),
                AlertLevel::new(Detector::WellClear(corrective), 55.0, false),
                AlertLevel::new(Detector::WellClear(corrective), 25.0, false),
            ],
        }
    }
}

impl AlertThresholds {
    pub fn new(levels: Vec<AlertLevel>) -> Self {
        Self { levels }
    }

    pub fn empty() -> Self {
        Self { levels: Vec::new() }
    }

    pub fn add_level(&mut self, level: AlertLevel) {
        self.levels.push(level);
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level by 1-based severity index.
    pub fn level(&self, severity: usize) -> Option<&AlertLevel> {
        if severity == 0 {
            return None;
        }
        self.levels.get(severity - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlertLevel> {
        self.levels.iter()
    }

    pub fn most_severe(&self) -> Option<&AlertLevel> {
        self.levels.last()
    }
}

/// Alert level for one intruder: the most severe level whose predicate holds,
/// 0 when none fires.
///
/// A level fires on current violation, on a predicted conflict within its
/// alerting time, or - when its spread flag is set - on any sampled maneuver
/// within the configured spreads that itself conflicts (single dimension,
/// recovery disabled).
pub fn alerting(
    scene: &LocalScene,
    intruder: &LocalIntruder,
    thresholds: &AlertThresholds,
    params: &Parameters,
) -> usize {
    for (idx, level) in thresholds.levels.iter().enumerate().rev() {
        if level_fires(scene, intruder, level, params) {
            return idx + 1;
        }
    }
    0
}

fn level_fires(
    scene: &LocalScene,
    intruder: &LocalIntruder,
    level: &AlertLevel,
    params: &Parameters,
) -> bool {
    let so = crate::vect::Vect3::ZERO;
    let vo = scene.vo.vect3();
    if level.detector.violation(&so, &vo, &intruder.p, &intruder.v) {
        return true;
    }
    let horizon = level.alerting_time.min(params.lookahead_time);
    if level
        .detector
        .conflict_detection(&so, &vo, &intruder.p, &intruder.v, 0.0, horizon)
        .conflict()
    {
        return true;
    }
    if level.spread {
        return spread_fires(scene, intruder, level, params);
    }
    false
}

/// Spread widening: sample maneuvers inside each dimension's configured
/// spread. Dimensions with zero spread are "no assumption" and not sampled.
fn spread_fires(
    scene: &LocalScene,
    intruder: &LocalIntruder,
    level: &AlertLevel,
    params: &Parameters,
) -> bool {
    let horizon = level.alerting_time.min(params.lookahead_time);

    if params.trk_spread_left > 0.0 || params.trk_spread_right > 0.0 {
        let trk = scene.vo.trk();
        let lo = trk - params.trk_spread_left;
        let hi = trk + params.trk_spread_right;
        if bands::spread_conflict(
            BandsDim::Track,
            scene,
            intruder,
            &level.detector,
            horizon,
            lo,
            hi,
            params,
        ) {
            return true;
        }
    }
    if params.gs_spread > 0.0 {
        let gs = scene.vo.gs();
        if bands::spread_conflict(
            BandsDim::GroundSpeed,
            scene,
            intruder,
            &level.detector,
            horizon,
            gs - params.gs_spread,
            gs + params.gs_spread,
            params,
        ) {
            return true;
        }
    }
    if params.vs_spread > 0.0 {
        let vs = scene.vo.vs();
        if bands::spread_conflict(
            BandsDim::VerticalSpeed,
            scene,
            intruder,
            &level.detector,
            horizon,
            vs - params.vs_spread,
            vs + params.vs_spread,
            params,
        ) {
            return true;
        }
    }
    if params.alt_spread > 0.0 {
        if bands::spread_conflict(
            BandsDim::Altitude,
            scene,
            intruder,
            &level.detector,
            horizon,
            scene.own_alt - params.alt_spread,
            scene.own_alt + params.alt_spread,
            params,
        ) {
            return true;
        }
    }
    false
}

/// Conflict data for one intruder against the most severe configured level,
/// over the full lookahead.
pub fn intruder_conflict(
    scene: &LocalScene,
    intruder: &LocalIntruder,
    thresholds: &AlertThresholds,
    params: &Parameters,
) -> Option<ConflictData> {
    let level = thresholds.most_severe()?;
    Some(level.detector.conflict_detection(
        &crate::vect::Vect3::ZERO,
        &scene.vo.vect3(),
        &intruder.p,
        &intruder.v,
        0.0,
        params.lookahead_time,
    ))
}

/// Index of the most urgent intruder among those currently alerting:
/// soonest non-negative time to closest approach, ties broken by smallest
/// predicted miss distance. `None` when no intruder alerts.
pub fn most_urgent(
    scene: &LocalScene,
    thresholds: &AlertThresholds,
    params: &Parameters,
) -> Option<usize> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (idx, intruder) in scene.intruders.iter().enumerate() {
        if alerting(scene, intruder, thresholds, params) == 0 {
            continue;
        }
        let Some(cd) = intruder_conflict(scene, intruder, thresholds, params) else {
            continue;
        };
        if !cd.time_cpa.is_finite() || cd.time_cpa < 0.0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, t, d)) => {
                cd.time_cpa < t || (cd.time_cpa == t && cd.dist_cpa < d)
            }
        };
        if better {
            best = Some((idx, cd.time_cpa, cd.dist_cpa));
        }
    }
    best.map(|(idx, _, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{ft_to_m, kn_to_mps, nm_to_m};
    use crate::vect::Vect3;
    use crate::velocity::Velocity;

    fn scene_with(intruders: Vec<LocalIntruder>) -> LocalScene {
        LocalScene {
            vo: Velocity::from_trk_gs_vs(0.0, kn_to_mps(200.0), 0.0),
            own_alt: ft_to_m(3000.0),
            wind: Velocity::ZERO,
            intruders,
        }
    }

    fn head_on_intruder(range_m: f64) -> LocalIntruder {
        LocalIntruder {
            p: Vect3::new(0.0, range_m, 0.0),
            v: Velocity::from_trk_gs_vs(std::f64::consts::PI, kn_to_mps(200.0), 0.0).vect3(),
        }
    }

    #[test]
    fn ladder_monotonicity() {
        // Levels are strict relaxations bottom-up: if level j fires, every
        // level below j fires too.
        let thresholds = AlertThresholds::default();
        let params = Parameters::default();
        for range_nm in [2.0, 5.0, 10.0, 20.0, 40.0] {
            let scene = scene_with(vec![head_on_intruder(nm_to_m(range_nm))]);
            let level = alerting(&scene, &scene.intruders[0], &thresholds, &params);
            for j in 1..=level {
                let fires = level_fires(
                    &scene,
                    &scene.intruders[0],
                    thresholds.level(j).unwrap(),
                    &params,
                );
                assert!(fires, "level {} silent while level {} fires", j, level);
            }
        }
    }

    #[test]
    fn close_head_on_alerts_at_top_level() {
        let thresholds = AlertThresholds::default();
        let params = Parameters::default();
        let scene = scene_with(vec![head_on_intruder(nm_to_m(1.5))]);
        assert_eq!(
            alerting(&scene, &scene.intruders[0], &thresholds, &params),
            thresholds.len()
        );
    }

    #[test]
    fn distant_traffic_does_not_alert() {
        let thresholds = AlertThresholds::default();
        let params = Parameters::default();
        // Co-altitude but diverging: behind the ownship, flying away.
        let scene = scene_with(vec![LocalIntruder {
            p: Vect3::new(0.0, -nm_to_m(30.0), 0.0),
            v: Velocity::from_trk_gs_vs(std::f64::consts::PI, kn_to_mps(200.0), 0.0).vect3(),
        }]);
        assert_eq!(alerting(&scene, &scene.intruders[0], &thresholds, &params), 0);
        assert_eq!(most_urgent(&scene, &thresholds, &params), None);
    }

    #[test]
    fn most_urgent_prefers_sooner_approach() {
        let thresholds = AlertThresholds::default();
        let params = Parameters::default();
        let scene = scene_with(vec![
            head_on_intruder(nm_to_m(8.0)),
            head_on_intruder(nm_to_m(3.0)),
        ]);
        assert_eq!(most_urgent(&scene, &thresholds, &params), Some(1));
    }

    #[test]
    fn spread_widens_a_level() {
        let detector = Detector::WellClear(WellClearDetector::new(
            nm_to_m(2.0),
            ft_to_m(450.0),
            35.0,
            0.0,
        ));
        let thresholds = AlertThresholds::new(vec![AlertLevel::new(detector, 40.0, true)]);
        let mut params = Parameters::default();

        // Parallel traffic 2.5 NM to the right at matched speed: zero relative
        // velocity, clear forever on the current track, but a right turn
        // closes the gap inside DTHR.
        let own = Velocity::from_trk_gs_vs(0.0, kn_to_mps(150.0), 0.0);
        let intruder = LocalIntruder {
            p: Vect3::new(nm_to_m(2.5), 0.0, 0.0),
            v: Velocity::from_trk_gs_vs(0.0, kn_to_mps(150.0), 0.0).vect3(),
        };
        let scene = LocalScene {
            vo: own,
            own_alt: ft_to_m(3000.0),
            wind: Velocity::ZERO,
            intruders: vec![intruder],
        };

        let without = alerting(&scene, &scene.intruders[0], &thresholds, &params);
        assert_eq!(without, 0);

        params.trk_spread_right = (90.0f64).to_radians();
        let with = alerting(&scene, &scene.intruders[0], &thresholds, &params);
        assert_eq!(with, 1);
    }
}
