//! Aircraft position, geodetic or local Euclidean.

use serde::{Deserialize, Serialize};

use crate::geodesy;
use crate::vect::{Vect2, Vect3};

/// An aircraft position. Geodetic positions are projected into a local ENU
/// tangent frame (anchored at the ownship) before any geometry runs;
/// Euclidean positions are already expressed in such a frame, in meters.
///
/// A single snapshot must not mix the two representations; the engine logs
/// mixed pairs and skips them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    LatLonAlt {
        lat_deg: f64,
        lon_deg: f64,
        alt_m: f64,
    },
    Euclidean(Vect3),
}

impl Position {
    pub fn lat_lon_alt(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Position::LatLonAlt {
            lat_deg,
            lon_deg,
            alt_m,
        }
    }

    pub fn euclidean(x_m: f64, y_m: f64, z_m: f64) -> Self {
        Position::Euclidean(Vect3::new(x_m, y_m, z_m))
    }

    pub fn is_lat_lon(&self) -> bool {
        matches!(self, Position::LatLonAlt { .. })
    }

    /// Altitude above the reference, meters.
    pub fn alt_m(&self) -> f64 {
        match self {
            Position::LatLonAlt { alt_m, .. } => *alt_m,
            Position::Euclidean(v) => v.z,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Position::LatLonAlt {
                lat_deg,
                lon_deg,
                alt_m,
            } => lat_deg.is_finite() && lon_deg.is_finite() && alt_m.is_finite(),
            Position::Euclidean(v) => v.is_finite(),
        }
    }

    /// ENU offset of `self` from `anchor`, meters. `None` when the two
    /// positions do not share a representation.
    pub fn to_local(&self, anchor: &Position) -> Option<Vect3> {
        match (self, anchor) {
            (
                Position::LatLonAlt {
                    lat_deg,
                    lon_deg,
                    alt_m,
                },
                Position::LatLonAlt {
                    lat_deg: alat,
                    lon_deg: alon,
                    alt_m: aalt,
                },
            ) => {
                let xy: Vect2 = geodesy::project(*alat, *alon, *lat_deg, *lon_deg);
                Some(Vect3::new(xy.x, xy.y, alt_m - aalt))
            }
            (Position::Euclidean(p), Position::Euclidean(a)) => Some(*p - *a),
            _ => None,
        }
    }

    /// Horizontal separation from `other` in meters, along whichever
    /// representation both share. `None` on mixed representations.
    pub fn horizontal_distance(&self, other: &Position) -> Option<f64> {
        match (self, other) {
            (
                Position::LatLonAlt {
                    lat_deg, lon_deg, ..
                },
                Position::LatLonAlt {
                    lat_deg: lat2,
                    lon_deg: lon2,
                    ..
                },
            ) => Some(geodesy::haversine_distance(*lat_deg, *lon_deg, *lat2, *lon2)),
            (Position::Euclidean(a), Position::Euclidean(b)) => Some((*a - *b).vect2().norm()),
            _ => None,
        }
    }

    /// Position advanced `t` seconds along `vel` (ENU meters per second).
    pub fn linear(&self, vel: &Vect3, t: f64) -> Position {
        match self {
            Position::LatLonAlt {
                lat_deg,
                lon_deg,
                alt_m,
            } => {
                let dist = vel.vect2().norm() * t;
                let brg = vel.vect2().trk();
                let (lat, lon) = geodesy::offset_by_bearing(*lat_deg, *lon_deg, dist, brg);
                Position::LatLonAlt {
                    lat_deg: lat,
                    lon_deg: lon,
                    alt_m: alt_m + vel.z * t,
                }
            }
            Position::Euclidean(p) => Position::Euclidean(p.linear(vel, t)),
        }
    }
}
