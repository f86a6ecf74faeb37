//! Engine configuration and its flat key/value parameter surface.
//!
//! Values are stored in SI; the string surface accepts and reports any unit
//! the `units` table knows. Loading and saving this configuration from disk
//! is an external collaborator's job (the struct serializes with serde); the
//! core only applies and reports it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter key '{0}'")]
    UnknownKey(String),
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("parameter '{key}' value {value} out of legal range [{min}, {max}]")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("parameter '{0}' is not numeric")]
    NotNumeric(String),
    #[error("parameter '{0}' is not boolean")]
    NotBoolean(String),
}

/// Every tunable of the engine. All numeric fields are SI (meters, meters per
/// second, radians, seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Conflict prediction horizon, seconds.
    pub lookahead_time: f64,

    // Legal maneuver ranges. Track is always the full circle.
    pub min_gs: f64,
    pub max_gs: f64,
    pub min_vs: f64,
    pub max_vs: f64,
    pub min_alt: f64,
    pub max_alt: f64,

    // Discretization steps per maneuver dimension.
    pub trk_step: f64,
    pub gs_step: f64,
    pub vs_step: f64,
    pub alt_step: f64,

    // Ownship performance used to synthesize reachable trajectories.
    /// Turn rate, rad/s. Zero means derive from bank angle.
    pub turn_rate: f64,
    /// Bank angle for coordinated turns, radians.
    pub bank_angle: f64,
    /// Horizontal acceleration magnitude, m/s^2.
    pub horizontal_accel: f64,
    /// Vertical acceleration magnitude, m/s^2.
    pub vertical_accel: f64,
    /// Vertical rate flown during altitude maneuvers, m/s.
    pub vertical_rate: f64,

    // Recovery bands.
    pub recovery_stability_time: f64,
    pub max_recovery_time: f64,
    /// Recovery cylinder radius, meters. Zero falls back to the most severe
    /// detector's horizontal threshold.
    pub min_horizontal_recovery: f64,
    /// Recovery cylinder half-height, meters. Zero falls back likewise.
    pub min_vertical_recovery: f64,
    pub recovery_trk: bool,
    pub recovery_gs: bool,
    pub recovery_vs: bool,
    pub recovery_alt: bool,
    /// Candidate maneuvers must not reduce separation at closest approach
    /// relative to the unmaneuvered path.
    pub repulsive_criterion: bool,

    /// Collision-avoidance bands (violation-only sub-detector).
    pub ca_bands: bool,

    // Alerting spreads, applied to levels that enable spread.
    pub trk_spread_left: f64,
    pub trk_spread_right: f64,
    pub gs_spread: f64,
    pub vs_spread: f64,
    pub alt_spread: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            lookahead_time: 180.0,
            min_gs: units::kn_to_mps(10.0),
            max_gs: units::kn_to_mps(300.0),
            min_vs: units::fpm_to_mps(-3000.0),
            max_vs: units::fpm_to_mps(3000.0),
            min_alt: 0.0,
            max_alt: units::ft_to_m(10_000.0),
            trk_step: (3.0f64).to_radians(),
            gs_step: units::kn_to_mps(5.0),
            vs_step: units::fpm_to_mps(100.0),
            alt_step: units::ft_to_m(500.0),
            turn_rate: 0.0,
            bank_angle: (30.0f64).to_radians(),
            horizontal_accel: 2.0,
            vertical_accel: 1.0,
            vertical_rate: units::fpm_to_mps(500.0),
            recovery_stability_time: 2.0,
            max_recovery_time: 60.0,
            min_horizontal_recovery: 0.0,
            min_vertical_recovery: 0.0,
            recovery_trk: true,
            recovery_gs: true,
            recovery_vs: true,
            recovery_alt: true,
            repulsive_criterion: false,
            ca_bands: false,
            trk_spread_left: 0.0,
            trk_spread_right: 0.0,
            gs_spread: 0.0,
            vs_spread: 0.0,
            alt_spread: 0.0,
        }
    }
}

/// Legal range for each numeric key, SI.
fn legal_range(key: &str) -> Option<(f64, f64)> {
    let r = match key {
        "lookahead_time" => (1.0, 86_400.0),
        "min_gs" => (0.0, units::kn_to_mps(2000.0)),
        "max_gs" => (units::kn_to_mps(1.0), units::kn_to_mps(2000.0)),
        "min_vs" => (units::fpm_to_mps(-10_000.0), 0.0),
        "max_vs" => (0.0, units::fpm_to_mps(10_000.0)),
        "min_alt" => (0.0, units::ft_to_m(60_000.0)),
        "max_alt" => (units::ft_to_m(100.0), units::ft_to_m(60_000.0)),
        // Steps must be strictly positive so every scan is finite.
        "trk_step" => (f64::MIN_POSITIVE, (30.0f64).to_radians()),
        "gs_step" => (f64::MIN_POSITIVE, units::kn_to_mps(50.0)),
        "vs_step" => (f64::MIN_POSITIVE, units::fpm_to_mps(1000.0)),
        "alt_step" => (f64::MIN_POSITIVE, units::ft_to_m(2000.0)),
        "turn_rate" => (0.0, (20.0f64).to_radians()),
        "bank_angle" => ((1.0f64).to_radians(), (60.0f64).to_radians()),
        "horizontal_accel" => (0.1, 20.0),
        "vertical_accel" => (0.1, 20.0),
        "vertical_rate" => (units::fpm_to_mps(50.0), units::fpm_to_mps(10_000.0)),
        "recovery_stability_time" => (0.0, 60.0),
        "max_recovery_time" => (0.0, 3600.0),
        "min_horizontal_recovery" => (0.0, units::nm_to_m(10.0)),
        "min_vertical_recovery" => (0.0, units::ft_to_m(5000.0)),
        "trk_spread_left" => (0.0, std::f64::consts::PI),
        "trk_spread_right" => (0.0, std::f64::consts::PI),
        "gs_spread" => (0.0, units::kn_to_mps(100.0)),
        "vs_spread" => (0.0, units::fpm_to_mps(2000.0)),
        "alt_spread" => (0.0, units::ft_to_m(2000.0)),
        _ => return None,
    };
    Some(r)
}

const BOOL_KEYS: [&str; 6] = [
    "recovery_trk",
    "recovery_gs",
    "recovery_vs",
    "recovery_alt",
    "repulsive_criterion",
    "ca_bands",
];

impl Parameters {
    fn numeric_field(&mut self, key: &str) -> Option<&mut f64> {
        let field = match key {
            "lookahead_time" => &mut self.lookahead_time,
            "min_gs" => &mut self.min_gs,
            "max_gs" => &mut self.max_gs,
            "min_vs" => &mut self.min_vs,
            "max_vs" => &mut self.max_vs,
            "min_alt" => &mut self.min_alt,
            "max_alt" => &mut self.max_alt,
            "trk_step" => &mut self.trk_step,
            "gs_step" => &mut self.gs_step,
            "vs_step" => &mut self.vs_step,
            "alt_step" => &mut self.alt_step,
            "turn_rate" => &mut self.turn_rate,
            "bank_angle" => &mut self.bank_angle,
            "horizontal_accel" => &mut self.horizontal_accel,
            "vertical_accel" => &mut self.vertical_accel,
            "vertical_rate" => &mut self.vertical_rate,
            "recovery_stability_time" => &mut self.recovery_stability_time,
            "max_recovery_time" => &mut self.max_recovery_time,
            "min_horizontal_recovery" => &mut self.min_horizontal_recovery,
            "min_vertical_recovery" => &mut self.min_vertical_recovery,
            "trk_spread_left" => &mut self.trk_spread_left,
            "trk_spread_right" => &mut self.trk_spread_right,
            "gs_spread" => &mut self.gs_spread,
            "vs_spread" => &mut self.vs_spread,
            "alt_spread" => &mut self.alt_spread,
            _ => return None,
        };
        Some(field)
    }

    fn bool_field(&mut self, key: &str) -> Option<&mut bool> {
        let field = match key {
            "recovery_trk" => &mut self.recovery_trk,
            "recovery_gs" => &mut self.recovery_gs,
            "recovery_vs" => &mut self.recovery_vs,
            "recovery_alt" => &mut self.recovery_alt,
            "repulsive_criterion" => &mut self.repulsive_criterion,
            "ca_bands" => &mut self.ca_bands,
            _ => return None,
        };
        Some(field)
    }

    /// Set a numeric parameter from a value expressed in `unit`.
    pub fn set_number(&mut self, key: &str, value: f64, unit: &str) -> Result<(), ParamError> {
        let si = units::from_unit(value, unit).ok_or_else(|| ParamError::UnknownUnit(unit.into()))?;
        let (min, max) = legal_range(key).ok_or_else(|| {
            if BOOL_KEYS.contains(&key) {
                ParamError::NotNumeric(key.into())
            } else {
                ParamError::UnknownKey(key.into())
            }
        })?;
        if !si.is_finite() || si < min || si > max {
            return Err(ParamError::OutOfRange {
                key: key.into(),
                value: si,
                min,
                max,
            });
        }
        match self.numeric_field(key) {
            Some(field) => {
                *field = si;
                Ok(())
            }
            None => Err(ParamError::UnknownKey(key.into())),
        }
    }

    fn numeric_value(&self, key: &str) -> Option<f64> {
        let v = match key {
            "lookahead_time" => self.lookahead_time,
            "min_gs" => self.min_gs,
            "max_gs" => self.max_gs,
            "min_vs" => self.min_vs,
            "max_vs" => self.max_vs,
            "min_alt" => self.min_alt,
            "max_alt" => self.max_alt,
            "trk_step" => self.trk_step,
            "gs_step" => self.gs_step,
            "vs_step" => self.vs_step,
            "alt_step" => self.alt_step,
            "turn_rate" => self.turn_rate,
            "bank_angle" => self.bank_angle,
            "horizontal_accel" => self.horizontal_accel,
            "vertical_accel" => self.vertical_accel,
            "vertical_rate" => self.vertical_rate,
            "recovery_stability_time" => self.recovery_stability_time,
            "max_recovery_time" => self.max_recovery_time,
            "min_horizontal_recovery" => self.min_horizontal_recovery,
            "min_vertical_recovery" => self.min_vertical_recovery,
            "trk_spread_left" => self.trk_spread_left,
            "trk_spread_right" => self.trk_spread_right,
            "gs_spread" => self.gs_spread,
            "vs_spread" => self.vs_spread,
            "alt_spread" => self.alt_spread,
            _ => return None,
        };
        Some(v)
    }

    /// Read a numeric parameter in `unit`.
    pub fn number(&self, key: &str, unit: &str) -> Result<f64, ParamError> {
        let si = self.numeric_value(key).ok_or_else(|| {
            if BOOL_KEYS.contains(&key) {
                ParamError::NotNumeric(key.into())
            } else {
                ParamError::UnknownKey(key.into())
            }
        })?;
        units::to_unit(si, unit).ok_or_else(|| ParamError::UnknownUnit(unit.into()))
    }

    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<(), ParamError> {
        let field = self.bool_field(key).ok_or_else(|| {
            if legal_range(key).is_some() {
                ParamError::NotBoolean(key.to_string())
            } else {
                ParamError::UnknownKey(key.to_string())
            }
        })?;
        *field = value;
        Ok(())
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ParamError> {
        let v = match key {
            "recovery_trk" => Some(self.recovery_trk),
            "recovery_gs" => Some(self.recovery_gs),
            "recovery_vs" => Some(self.recovery_vs),
            "recovery_alt" => Some(self.recovery_alt),
            "repulsive_criterion" => Some(self.repulsive_criterion),
            "ca_bands" => Some(self.ca_bands),
            _ => None,
        };
        v.ok_or_else(|| {
            if legal_range(key).is_some() {
                ParamError::NotBoolean(key.to_string())
            } else {
                ParamError::UnknownKey(key.to_string())
            }
        })
    }

    /// Cross-field consistency problems, empty when the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.min_gs >= self.max_gs {
            errors.push(format!(
                "min_gs ({:.1}) must be less than max_gs ({:.1})",
                self.min_gs, self.max_gs
            ));
        }
        if self.min_vs >= self.max_vs {
            errors.push(format!(
                "min_vs ({:.1}) must be less than max_vs ({:.1})",
                self.min_vs, self.max_vs
            ));
        }
        if self.min_alt >= self.max_alt {
            errors.push(format!(
                "min_alt ({:.1}) must be less than max_alt ({:.1})",
                self.min_alt, self.max_alt
            ));
        }
        if self.turn_rate == 0.0 && self.bank_angle == 0.0 {
            errors.push("either turn_rate or bank_angle must be nonzero".to_string());
        }
        errors
    }
}
