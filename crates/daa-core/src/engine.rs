//! The detect-and-avoid engine facade.
//!
//! A host control loop pushes one ownship/intruder snapshot per cycle and
//! pulls bands, alert levels, and conflict data. Every accessor triggers a
//! lazy computation that is cached until the next snapshot or configuration
//! change. The engine is synchronous and single-threaded by contract: one
//! instance per control-loop thread, or an external lock around the whole
//! snapshot-then-query sequence.

use chrono::{DateTime, Utc};

use crate::alert::{self, AlertThresholds};
use crate::bands::{self, Band, BandsDim, BandsRegion, LocalIntruder, LocalScene};
use crate::detect::{ConflictData, WellClearDetector};
use crate::errors::ErrorLog;
use crate::geodesy::MAX_PROJECTION_RANGE_M;
use crate::interval::Interval;
use crate::params::Parameters;
use crate::position::Position;
use crate::traffic::{AircraftRole, TrafficState};
use crate::units;
use crate::velocity::Velocity;

/// Snapshot projected into the ownship-anchored frame, with the mapping
/// between traffic indices and the intruders that survived validity checks.
struct SceneCache {
    local: LocalScene,
    /// traffic index -> index into `local.intruders`
    map: Vec<Option<usize>>,
    /// intruder index -> traffic index
    reverse: Vec<usize>,
}

#[derive(Default)]
struct Cache {
    scene: Option<SceneCache>,
    bands: [Option<Vec<Band>>; 4],
    ca_bands: [Option<Vec<Band>>; 4],
    alerts: Option<Vec<usize>>,
}

fn dim_index(dim: BandsDim) -> usize {
    match dim {
        BandsDim::Track => 0,
        BandsDim::GroundSpeed => 1,
        BandsDim::VerticalSpeed => 2,
        BandsDim::Altitude => 3,
    }
}

pub struct DaaEngine {
    params: Parameters,
    thresholds: AlertThresholds,
    wind: Velocity,
    ownship: Option<TrafficState>,
    traffic: Vec<TrafficState>,
    errors: ErrorLog,
    cache: Cache,
}

impl Default for DaaEngine {
    fn default() -> Self {
        Self::new(Parameters::default(), AlertThresholds::default())
    }
}

impl DaaEngine {
    /// Build an engine from an explicit configuration. There is no
    /// process-wide default state; two engines never share anything.
    pub fn new(params: Parameters, thresholds: AlertThresholds) -> Self {
        let mut engine = Self {
            params,
            thresholds,
            wind: Velocity::ZERO,
            ownship: None,
            traffic: Vec::new(),
            errors: ErrorLog::new(),
            cache: Cache::default(),
        };
        for problem in engine.params.validate() {
            engine.errors.add(problem);
        }
        engine
    }

    fn invalidate(&mut self) {
        self.cache = Cache::default();
    }

    // ---- state ingestion ----

    /// Set the ownship state, starting a new snapshot. Clears all traffic
    /// and every cached result.
    pub fn set_ownship_state(
        &mut self,
        id: impl Into<String>,
        position: Position,
        velocity: Velocity,
        time: DateTime<Utc>,
    ) {
        let state = TrafficState::new(id, position, velocity, time, AircraftRole::Ownship);
        if !state.is_valid() {
            self.errors
                .add(format!("rejected non-finite ownship state '{}'", state.id));
            return;
        }
        self.ownship = Some(state);
        self.traffic.clear();
        self.invalidate();
    }

    /// Add an intruder to the current snapshot. States submitted at a
    /// different time than the ownship's are linearly extrapolated when the
    /// snapshot is projected. Returns the aircraft index.
    pub fn add_traffic_state(
        &mut self,
        id: impl Into<String>,
        position: Position,
        velocity: Velocity,
        time: DateTime<Utc>,
    ) -> Option<usize> {
        if self.ownship.is_none() {
            self.errors
                .add("traffic state submitted before ownship was set");
            return None;
        }
        let state = TrafficState::new(id, position, velocity, time, AircraftRole::Intruder);
        if !state.is_valid() {
            self.errors
                .add(format!("rejected non-finite traffic state '{}'", state.id));
            return None;
        }
        self.traffic.push(state);
        self.invalidate();
        Some(self.traffic.len() - 1)
    }

    pub fn ownship(&self) -> Option<&TrafficState> {
        self.ownship.as_ref()
    }

    pub fn traffic_count(&self) -> usize {
        self.traffic.len()
    }

    pub fn traffic_state(&self, ac_idx: usize) -> Option<&TrafficState> {
        self.traffic.get(ac_idx)
    }

    /// The caller-visible wind vector used for extrapolation and for
    /// airspeed-derived turn rates.
    pub fn set_wind_velocity(&mut self, wind: Velocity) {
        self.wind = wind;
        self.invalidate();
    }

    pub fn wind_velocity(&self) -> Velocity {
        self.wind
    }

    // ---- configuration ----

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn set_parameters(&mut self, params: Parameters) {
        self.params = params;
        for problem in self.params.validate() {
            self.errors.add(problem);
        }
        self.invalidate();
    }

    /// Set one numeric parameter from the flat surface. Out-of-range values
    /// are logged and leave the previous value in place.
    pub fn set_param(&mut self, key: &str, value: f64, unit: &str) -> bool {
        match self.params.set_number(key, value, unit) {
            Ok(()) => {
                self.invalidate();
                true
            }
            Err(e) => {
                self.errors.add(e.to_string());
                false
            }
        }
    }

    /// Read one numeric parameter in `unit`; NaN on an unknown key or unit.
    pub fn param(&mut self, key: &str, unit: &str) -> f64 {
        match self.params.number(key, unit) {
            Ok(v) => v,
            Err(e) => {
                self.errors.add(e.to_string());
                f64::NAN
            }
        }
    }

    pub fn set_param_bool(&mut self, key: &str, value: bool) -> bool {
        match self.params.set_bool(key, value) {
            Ok(()) => {
                self.invalidate();
                true
            }
            Err(e) => {
                self.errors.add(e.to_string());
                false
            }
        }
    }

    pub fn param_bool(&mut self, key: &str) -> bool {
        match self.params.get_bool(key) {
            Ok(v) => v,
            Err(e) => {
                self.errors.add(e.to_string());
                false
            }
        }
    }

    pub fn alert_thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    pub fn set_alert_thresholds(&mut self, thresholds: AlertThresholds) {
        self.thresholds = thresholds;
        self.invalidate();
    }

    /// Well-clear thresholds of one 1-based alert level. Logs a mismatch when
    /// that level is not configured with a tau-based detector.
    pub fn tau_thresholds(&mut self, level: usize) -> Option<WellClearDetector> {
        let Some(alert_level) = self.thresholds.level(level) else {
            self.errors
                .add(format!("alert level {} is not configured", level));
            return None;
        };
        match alert_level.detector.well_clear() {
            Some(wc) => Some(*wc),
            None => {
                self.errors.add(format!(
                    "alert level {} is not a tau-based detector",
                    level
                ));
                None
            }
        }
    }

    // ---- snapshot projection ----

    /// Project every state into the ownship-anchored ENU frame, extrapolating
    /// stale states to the ownship time. Logs and skips intruders that mix
    /// position representations with the ownship; logs pairs beyond the
    /// projection validity range.
    fn ensure_scene(&mut self) -> bool {
        if self.cache.scene.is_some() {
            return true;
        }
        let Some(own) = self.ownship.clone() else {
            self.errors.add("query before ownship was set");
            return false;
        };

        let mut intruders = Vec::new();
        let mut map = Vec::with_capacity(self.traffic.len());
        let mut reverse = Vec::new();
        let mut messages = Vec::new();

        for st in &self.traffic {
            let dt = own
                .time
                .signed_duration_since(st.time)
                .num_milliseconds() as f64
                / 1000.0;
            let st = if dt != 0.0 { st.linear(dt) } else { st.clone() };

            let Some(p) = st.position.to_local(&own.position) else {
                messages.push(format!(
                    "aircraft '{}' mixes geodetic and Euclidean positions with the ownship",
                    st.id
                ));
                map.push(None);
                continue;
            };
            if own.position.is_lat_lon() && p.vect2().norm() > MAX_PROJECTION_RANGE_M {
                messages.push(format!(
                    "aircraft '{}' is beyond the tangent-plane validity range",
                    st.id
                ));
            }
            map.push(Some(intruders.len()));
            reverse.push(map.len() - 1);
            intruders.push(LocalIntruder {
                p,
                v: st.velocity.vect3(),
            });
        }
        for m in messages {
            self.errors.add(m);
        }

        tracing::debug!(
            target: "daa_core",
            intruders = intruders.len(),
            "projected snapshot"
        );
        self.cache.scene = Some(SceneCache {
            local: LocalScene {
                vo: own.velocity,
                own_alt: own.position.alt_m(),
                wind: self.wind,
                intruders,
            },
            map,
            reverse,
        });
        true
    }

    // ---- bands queries ----

    fn ensure_bands(&mut self, dim: BandsDim, collision: bool) {
        let idx = dim_index(dim);
        let slot = if collision {
            &self.cache.ca_bands[idx]
        } else {
            &self.cache.bands[idx]
        };
        if slot.is_some() {
            return;
        }
        if !self.ensure_scene() {
            return;
        }
        let problems = self.params.validate();
        if !problems.is_empty() {
            for p in problems {
                self.errors.add(p);
            }
            let slot = if collision {
                &mut self.cache.ca_bands[idx]
            } else {
                &mut self.cache.bands[idx]
            };
            *slot = Some(Vec::new());
            return;
        }
        let Some(scene) = self.cache.scene.as_ref().map(|s| s.local.clone()) else {
            return;
        };
        let bands = if collision {
            bands::compute_ca(dim, &scene, &self.params, &self.thresholds)
        } else {
            bands::compute(dim, &scene, &self.params, &self.thresholds)
        };
        let slot = if collision {
            &mut self.cache.ca_bands[idx]
        } else {
            &mut self.cache.bands[idx]
        };
        *slot = Some(bands);
    }

    fn band_slot(&self, dim: BandsDim, collision: bool) -> Option<&Vec<Band>> {
        let idx = dim_index(dim);
        if collision {
            self.cache.ca_bands[idx].as_ref()
        } else {
            self.cache.bands[idx].as_ref()
        }
    }

    /// Number of bands of a dimension; 0 before the ownship is set.
    pub fn band_count(&mut self, dim: BandsDim) -> usize {
        self.ensure_bands(dim, false);
        self.band_slot(dim, false).map(|b| b.len()).unwrap_or(0)
    }

    /// Band interval by index, SI units. Empty on an invalid index.
    pub fn band_interval(&mut self, dim: BandsDim, i: usize) -> Interval {
        self.ensure_bands(dim, false);
        match self.band_slot(dim, false).and_then(|b| b.get(i)) {
            Some(band) => band.interval,
            None => {
                self.errors
                    .add(format!("invalid band index {} for {:?}", i, dim));
                Interval::EMPTY
            }
        }
    }

    /// Band interval by index in caller units; NaN bounds on an unknown unit.
    pub fn band_interval_in(&mut self, dim: BandsDim, i: usize, unit: &str) -> Interval {
        let iv = self.band_interval(dim, i);
        if iv.is_empty() {
            return iv;
        }
        match (units::to_unit(iv.low, unit), units::to_unit(iv.up, unit)) {
            (Some(low), Some(up)) => Interval::new(low, up),
            _ => {
                self.errors.add(format!("unknown unit '{}'", unit));
                Interval::new(f64::NAN, f64::NAN)
            }
        }
    }

    /// Band region by index; Unknown on an invalid index.
    pub fn band_region(&mut self, dim: BandsDim, i: usize) -> BandsRegion {
        self.ensure_bands(dim, false);
        match self.band_slot(dim, false).and_then(|b| b.get(i)) {
            Some(band) => band.region,
            None => {
                self.errors
                    .add(format!("invalid band index {} for {:?}", i, dim));
                BandsRegion::Unknown
            }
        }
    }

    /// Collision-avoidance bands: the violation-only sub-detector variant.
    /// Empty unless enabled with the `ca_bands` parameter.
    pub fn ca_band_count(&mut self, dim: BandsDim) -> usize {
        if !self.params.ca_bands {
            self.errors
                .add("collision-avoidance bands are not enabled");
            return 0;
        }
        self.ensure_bands(dim, true);
        self.band_slot(dim, true).map(|b| b.len()).unwrap_or(0)
    }

    pub fn ca_band_interval(&mut self, dim: BandsDim, i: usize) -> Interval {
        if !self.params.ca_bands {
            self.errors
                .add("collision-avoidance bands are not enabled");
            return Interval::EMPTY;
        }
        self.ensure_bands(dim, true);
        match self.band_slot(dim, true).and_then(|b| b.get(i)) {
            Some(band) => band.interval,
            None => {
                self.errors
                    .add(format!("invalid CA band index {} for {:?}", i, dim));
                Interval::EMPTY
            }
        }
    }

    pub fn ca_band_region(&mut self, dim: BandsDim, i: usize) -> BandsRegion {
        if !self.params.ca_bands {
            self.errors
                .add("collision-avoidance bands are not enabled");
            return BandsRegion::Unknown;
        }
        self.ensure_bands(dim, true);
        match self.band_slot(dim, true).and_then(|b| b.get(i)) {
            Some(band) => band.region,
            None => {
                self.errors
                    .add(format!("invalid CA band index {} for {:?}", i, dim));
                BandsRegion::Unknown
            }
        }
    }

    // ---- alerting queries ----

    fn ensure_alerts(&mut self) {
        if self.cache.alerts.is_some() {
            return;
        }
        if !self.ensure_scene() {
            return;
        }
        let Some(scene) = self.cache.scene.as_ref() else {
            return;
        };
        let mut levels = Vec::with_capacity(self.traffic.len());
        for mapped in &scene.map {
            let level = match mapped {
                Some(i) => alert::alerting(
                    &scene.local,
                    &scene.local.intruders[*i],
                    &self.thresholds,
                    &self.params,
                ),
                None => 0,
            };
            levels.push(level);
        }
        self.cache.alerts = Some(levels);
    }

    /// Alert level of one intruder, 0..=N; 0 on an invalid index.
    pub fn alert_level(&mut self, ac_idx: usize) -> usize {
        self.ensure_alerts();
        match self.cache.alerts.as_ref().and_then(|a| a.get(ac_idx)) {
            Some(level) => *level,
            None => {
                self.errors
                    .add(format!("invalid aircraft index {}", ac_idx));
                0
            }
        }
    }

    /// The most urgent alerting intruder: soonest non-negative closest
    /// approach, ties by smallest miss distance. Returns the invalid
    /// sentinel when no intruder alerts.
    pub fn most_urgent_aircraft(&mut self) -> TrafficState {
        if !self.ensure_scene() {
            return TrafficState::invalid();
        }
        let Some(scene) = self.cache.scene.as_ref() else {
            return TrafficState::invalid();
        };
        match alert::most_urgent(&scene.local, &self.thresholds, &self.params) {
            Some(intruder_idx) => {
                let traffic_idx = scene.reverse[intruder_idx];
                self.traffic[traffic_idx].clone()
            }
            None => TrafficState::invalid(),
        }
    }

    /// Raw conflict detection result for one intruder against the most
    /// severe configured level, over the full lookahead.
    pub fn conflict_detection(&mut self, ac_idx: usize) -> ConflictData {
        if !self.ensure_scene() {
            return ConflictData::invalid();
        }
        let Some(scene) = self.cache.scene.as_ref() else {
            return ConflictData::invalid();
        };
        let Some(Some(intruder_idx)) = scene.map.get(ac_idx).copied() else {
            self.errors
                .add(format!("invalid aircraft index {}", ac_idx));
            return ConflictData::invalid();
        };
        alert::intruder_conflict(
            &scene.local,
            &scene.local.intruders[intruder_idx],
            &self.thresholds,
            &self.params,
        )
        .unwrap_or_else(ConflictData::invalid)
    }

    // ---- error surface ----

    pub fn has_error(&self) -> bool {
        self.errors.has_error()
    }

    /// Oldest pending error message, removed from the log.
    pub fn get_message(&mut self) -> Option<String> {
        self.errors.get_message()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{ft_to_m, kn_to_mps, nm_to_m};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()
    }

    fn engine_with_head_on() -> DaaEngine {
        let mut engine = DaaEngine::default();
        engine.set_ownship_state(
            "OWN",
            Position::euclidean(0.0, 0.0, ft_to_m(3000.0)),
            Velocity::from_trk_gs_vs(0.0, kn_to_mps(200.0), 0.0),
            t0(),
        );
        // Close enough head-on that the warning level (25 s) fires.
        engine.add_traffic_state(
            "INTR",
            Position::euclidean(0.0, nm_to_m(6.0), ft_to_m(3000.0)),
            Velocity::from_trk_gs_vs(std::f64::consts::PI, kn_to_mps(200.0), 0.0),
            t0(),
        );
        engine
    }

    #[test]
    fn query_before_ownship_is_logged_not_fatal() {
        let mut engine = DaaEngine::default();
        assert_eq!(engine.band_count(BandsDim::Track), 0);
        assert!(engine.has_error());
        assert!(engine
            .get_message()
            .unwrap()
            .contains("before ownship"));
        // The engine keeps working afterwards.
        engine.set_ownship_state(
            "OWN",
            Position::euclidean(0.0, 0.0, 300.0),
            Velocity::from_trk_gs_vs(0.0, kn_to_mps(150.0), 0.0),
            t0(),
        );
        assert_eq!(engine.band_count(BandsDim::Track), 1);
    }

    #[test]
    fn traffic_before_ownship_is_rejected() {
        let mut engine = DaaEngine::default();
        let idx = engine.add_traffic_state(
            "INTR",
            Position::euclidean(0.0, 1000.0, 300.0),
            Velocity::ZERO,
            t0(),
        );
        assert_eq!(idx, None);
        assert!(engine.has_error());
    }

    #[test]
    fn invalid_band_index_yields_empty_and_unknown() {
        let mut engine = engine_with_head_on();
        let n = engine.band_count(BandsDim::Track);
        assert!(engine.band_interval(BandsDim::Track, n + 5).is_empty());
        assert_eq!(engine.band_region(BandsDim::Track, n + 5), BandsRegion::Unknown);
        assert!(engine.has_error());
    }

    #[test]
    fn mixed_position_representations_are_logged_and_skipped() {
        let mut engine = DaaEngine::default();
        engine.set_ownship_state(
            "OWN",
            Position::lat_lon_alt(34.0, -118.0, 900.0),
            Velocity::from_trk_gs_vs(0.0, kn_to_mps(150.0), 0.0),
            t0(),
        );
        engine.add_traffic_state(
            "XYZ",
            Position::euclidean(0.0, 5000.0, 900.0),
            Velocity::ZERO,
            t0(),
        );
        assert_eq!(engine.alert_level(0), 0);
        assert!(engine.has_error());
        assert!(engine.get_message().unwrap().contains("mixes geodetic"));
    }

    #[test]
    fn stale_traffic_is_extrapolated_to_ownship_time() {
        let mut engine = DaaEngine::default();
        engine.set_ownship_state(
            "OWN",
            Position::euclidean(0.0, 0.0, 300.0),
            Velocity::from_trk_gs_vs(0.0, kn_to_mps(200.0), 0.0),
            t0(),
        );
        // Submitted 60 s in the past, northbound at 100 m/s: by the ownship
        // time it has moved 6 km north.
        engine.add_traffic_state(
            "OLD",
            Position::euclidean(0.0, 10_000.0, 300.0),
            Velocity::new(0.0, 100.0, 0.0),
            t0() - chrono::Duration::seconds(60),
        );
        let cd = engine.conflict_detection(0);
        assert!((cd.s.y - (-16_000.0)).abs() < 1.0, "s.y = {}", cd.s.y);
    }

    #[test]
    fn most_urgent_returns_sentinel_without_alerts() {
        let mut engine = DaaEngine::default();
        engine.set_ownship_state(
            "OWN",
            Position::euclidean(0.0, 0.0, 300.0),
            Velocity::from_trk_gs_vs(0.0, kn_to_mps(150.0), 0.0),
            t0(),
        );
        let urgent = engine.most_urgent_aircraft();
        assert!(!urgent.is_valid());
        assert_eq!(urgent.id, "INVALID");
    }

    #[test]
    fn most_urgent_identifies_the_closer_intruder() {
        let mut engine = engine_with_head_on();
        engine.add_traffic_state(
            "NEARER",
            Position::euclidean(0.0, nm_to_m(3.0), ft_to_m(3000.0)),
            Velocity::from_trk_gs_vs(std::f64::consts::PI, kn_to_mps(200.0), 0.0),
            t0(),
        );
        assert_eq!(engine.most_urgent_aircraft().id, "NEARER");
    }

    #[test]
    fn snapshot_invalidates_cached_bands() {
        let mut engine = engine_with_head_on();
        let near_exists = (0..engine.band_count(BandsDim::Track))
            .any(|i| engine.band_region(BandsDim::Track, i) == BandsRegion::Near);
        assert!(near_exists);

        // New snapshot with no traffic: bands must be recomputed clean.
        engine.set_ownship_state(
            "OWN",
            Position::euclidean(0.0, 0.0, ft_to_m(3000.0)),
            Velocity::from_trk_gs_vs(0.0, kn_to_mps(200.0), 0.0),
            t0() + chrono::Duration::seconds(1),
        );
        assert_eq!(engine.band_count(BandsDim::Track), 1);
        assert_eq!(engine.band_region(BandsDim::Track, 0), BandsRegion::None);
    }

    #[test]
    fn parameter_errors_accumulate_without_interrupting() {
        let mut engine = engine_with_head_on();
        assert!(!engine.set_param("trk_step", -1.0, "deg"));
        assert!(engine.param("no_such_key", "s").is_nan());
        assert!(engine.has_error());
        // Still answers queries.
        assert!(engine.band_count(BandsDim::Track) >= 1);
    }

    #[test]
    fn tau_threshold_query_on_non_tau_detector_is_logged() {
        use crate::alert::AlertLevel;
        use crate::detect::{CylinderDetector, Detector};
        let thresholds = AlertThresholds::new(vec![AlertLevel::new(
            Detector::Cylinder(CylinderDetector::default()),
            60.0,
            false,
        )]);
        let mut engine = DaaEngine::new(Parameters::default(), thresholds);
        assert!(engine.tau_thresholds(1).is_none());
        assert!(engine.get_message().unwrap().contains("tau"));
        assert!(engine.tau_thresholds(7).is_none());
        assert!(engine.get_message().unwrap().contains("not configured"));
    }

    #[test]
    fn ca_bands_require_opt_in() {
        let mut engine = engine_with_head_on();
        assert_eq!(engine.ca_band_count(BandsDim::Track), 0);
        assert!(engine.has_error());
        engine.clear_errors();
        assert!(engine.set_param_bool("ca_bands", true));
        assert!(engine.ca_band_count(BandsDim::Track) >= 1);
        assert!(!engine.has_error());
    }

    #[test]
    fn band_intervals_convert_to_caller_units() {
        let mut engine = engine_with_head_on();
        let n = engine.band_count(BandsDim::GroundSpeed);
        assert!(n >= 1);
        let si = engine.band_interval(BandsDim::GroundSpeed, 0);
        let kn = engine.band_interval_in(BandsDim::GroundSpeed, 0, "kn");
        assert!((kn.low - crate::units::mps_to_kn(si.low)).abs() < 1e-9);
        let bogus = engine.band_interval_in(BandsDim::GroundSpeed, 0, "furlong");
        assert!(bogus.low.is_nan());
    }
}
