//! Unit conversions between internal SI values and conventional aviation units.
//!
//! Everything inside the engine is SI: meters, meters per second, radians,
//! seconds. Public accessors and the flat parameter surface convert on demand.

use std::f64::consts::PI;

/// Meters per nautical mile.
pub const NM: f64 = 1852.0;
/// Meters per foot.
pub const FT: f64 = 0.3048;
/// Meters per second per knot.
pub const KN: f64 = NM / 3600.0;
/// Meters per second per foot-per-minute.
pub const FPM: f64 = FT / 60.0;
/// Standard gravity, m/s^2.
pub const G: f64 = 9.80665;

pub fn nm_to_m(v: f64) -> f64 {
    v * NM
}

pub fn m_to_nm(v: f64) -> f64 {
    v / NM
}

pub fn ft_to_m(v: f64) -> f64 {
    v * FT
}

pub fn m_to_ft(v: f64) -> f64 {
    v / FT
}

pub fn kn_to_mps(v: f64) -> f64 {
    v * KN
}

pub fn mps_to_kn(v: f64) -> f64 {
    v / KN
}

pub fn fpm_to_mps(v: f64) -> f64 {
    v * FPM
}

pub fn mps_to_fpm(v: f64) -> f64 {
    v / FPM
}

/// Normalize an angle to [0, 2π).
pub fn to_2pi(rad: f64) -> f64 {
    let r = rad.rem_euclid(2.0 * PI);
    if r == 2.0 * PI {
        0.0
    } else {
        r
    }
}

/// Normalize an angle to (-π, π].
pub fn to_pi(rad: f64) -> f64 {
    let r = to_2pi(rad);
    if r > PI {
        r - 2.0 * PI
    } else {
        r
    }
}

/// Convert `value` expressed in `unit` into the SI equivalent.
///
/// Supported unit names are the ones the parameter surface accepts:
/// `m`, `NM`, `ft`, `m/s`, `kn`, `fpm`, `m/s^2`, `deg`, `rad`, `deg/s`,
/// `rad/s`, `s`. Returns `None` for an unrecognized unit.
pub fn from_unit(value: f64, unit: &str) -> Option<f64> {
    let si = match unit {
        "m" | "m/s" | "m/s^2" | "rad" | "rad/s" | "s" => value,
        "NM" | "nmi" => nm_to_m(value),
        "ft" => ft_to_m(value),
        "kn" | "knot" => kn_to_mps(value),
        "fpm" | "ft/min" => fpm_to_mps(value),
        "deg" => value.to_radians(),
        "deg/s" => value.to_radians(),
        _ => return None,
    };
    Some(si)
}

/// Convert an SI `value` into `unit`. Inverse of [`from_unit`].
pub fn to_unit(value: f64, unit: &str) -> Option<f64> {
    let out = match unit {
        "m" | "m/s" | "m/s^2" | "rad" | "rad/s" | "s" => value,
        "NM" | "nmi" => m_to_nm(value),
        "ft" => m_to_ft(value),
        "kn" | "knot" => mps_to_kn(value),
        "fpm" | "ft/min" => mps_to_fpm(value),
        "deg" => value.to_degrees(),
        "deg/s" => value.to_degrees(),
        _ => return None,
    };
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knots_round_trip() {
        let v = kn_to_mps(200.0);
        assert!((v - 102.888).abs() < 0.01);
        assert!((mps_to_kn(v) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn angle_normalization() {
        assert!((to_2pi(-PI / 2.0) - 1.5 * PI).abs() < 1e-12);
        assert!((to_pi(1.5 * PI) + PI / 2.0).abs() < 1e-12);
        assert_eq!(to_2pi(2.0 * PI), 0.0);
    }

    #[test]
    fn unit_table_round_trip() {
        for unit in ["NM", "ft", "kn", "fpm", "deg", "m"] {
            let si = from_unit(3.5, unit).unwrap();
            assert!((to_unit(si, unit).unwrap() - 3.5).abs() < 1e-9);
        }
        assert!(from_unit(1.0, "furlong").is_none());
    }
}
