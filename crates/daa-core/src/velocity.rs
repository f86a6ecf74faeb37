//! Aircraft velocity with track / ground speed / vertical speed accessors.

use serde::{Deserialize, Serialize};

use crate::units;
use crate::vect::{Vect2, Vect3};

/// Velocity stored as Cartesian ENU components in meters per second.
/// Constructors and accessors convert to and from polar aviation form
/// (track clockwise from true north, ground speed, vertical speed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// East component, m/s
    pub x: f64,
    /// North component, m/s
    pub y: f64,
    /// Up component, m/s
    pub z: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build from track (radians, clockwise from north), ground speed (m/s)
    /// and vertical speed (m/s, positive up).
    pub fn from_trk_gs_vs(trk_rad: f64, gs_mps: f64, vs_mps: f64) -> Self {
        Self {
            x: gs_mps * trk_rad.sin(),
            y: gs_mps * trk_rad.cos(),
            z: vs_mps,
        }
    }

    /// Track in [0, 2π), radians. Zero ground speed reports track 0.
    pub fn trk(&self) -> f64 {
        if self.gs() <= f64::EPSILON {
            0.0
        } else {
            units::to_2pi(self.x.atan2(self.y))
        }
    }

    pub fn trk_deg(&self) -> f64 {
        self.trk().to_degrees()
    }

    /// Ground speed, m/s.
    pub fn gs(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn gs_kn(&self) -> f64 {
        units::mps_to_kn(self.gs())
    }

    /// Vertical speed, m/s, positive up.
    pub fn vs(&self) -> f64 {
        self.z
    }

    pub fn vs_fpm(&self) -> f64 {
        units::mps_to_fpm(self.z)
    }

    pub fn vect2(&self) -> Vect2 {
        Vect2::new(self.x, self.y)
    }

    pub fn vect3(&self) -> Vect3 {
        Vect3::new(self.x, self.y, self.z)
    }

    pub fn from_vect3(v: Vect3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }

    /// Same horizontal velocity with a replaced vertical speed.
    pub fn with_vs(&self, vs_mps: f64) -> Self {
        Self { z: vs_mps, ..*self }
    }

    /// Same track and vertical speed with a replaced ground speed.
    pub fn with_gs(&self, gs_mps: f64) -> Self {
        Velocity::from_trk_gs_vs(self.trk(), gs_mps, self.z)
    }

    /// Same ground speed and vertical speed with a replaced track.
    pub fn with_trk(&self, trk_rad: f64) -> Self {
        Velocity::from_trk_gs_vs(trk_rad, self.gs(), self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn polar_round_trip() {
        let v = Velocity::from_trk_gs_vs(PI / 3.0, 100.0, -2.5);
        assert!((v.trk() - PI / 3.0).abs() < 1e-12);
        assert!((v.gs() - 100.0).abs() < 1e-12);
        assert!((v.vs() + 2.5).abs() < 1e-12);
    }

    #[test]
    fn north_track_is_pure_y() {
        let v = Velocity::from_trk_gs_vs(0.0, 50.0, 0.0);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 50.0).abs() < 1e-12);
    }

    #[test]
    fn with_setters_preserve_other_components() {
        let v = Velocity::from_trk_gs_vs(1.0, 80.0, 3.0);
        let w = v.with_gs(40.0);
        assert!((w.trk() - 1.0).abs() < 1e-12);
        assert!((w.gs() - 40.0).abs() < 1e-12);
        assert!((w.vs() - 3.0).abs() < 1e-12);
    }
}
