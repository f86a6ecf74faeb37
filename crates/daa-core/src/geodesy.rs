//! Geodetic math: local tangent-plane projection and distance calculations.
//!
//! Geodetic aircraft states are projected into a local ENU frame anchored at
//! the ownship before any conflict geometry runs. The projection is a
//! flat-earth approximation with latitude-aware scaling; it is only valid
//! within [`MAX_PROJECTION_RANGE_M`] of the anchor and callers must flag
//! pairs beyond that range.

use crate::vect::Vect2;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Validity range of the tangent-plane projection (about one degree of arc).
pub const MAX_PROJECTION_RANGE_M: f64 = 111_000.0;

/// Calculate distance between two points in meters using the Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Project a geodetic point into the ENU tangent plane anchored at
/// (`anchor_lat`, `anchor_lon`). Returns (east, north) in meters.
pub fn project(anchor_lat: f64, anchor_lon: f64, lat: f64, lon: f64) -> Vect2 {
    let east = (lon - anchor_lon) * meters_per_deg_lon(anchor_lat);
    let north = (lat - anchor_lat) * meters_per_deg_lat(anchor_lat);
    Vect2::new(east, north)
}

/// Inverse of [`project`]: ENU offset in meters back to (lat, lon) degrees.
pub fn unproject(anchor_lat: f64, anchor_lon: f64, enu: Vect2) -> (f64, f64) {
    let lat = anchor_lat + enu.y / meters_per_deg_lat(anchor_lat).max(1e-9);
    let lon = anchor_lon + enu.x / meters_per_deg_lon(anchor_lat).max(1e-9);
    (lat, lon)
}

/// Calculate bearing from point 1 to point 2 in radians.
/// Returns bearing in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn haversine_same_point() {
        let dist = haversine_distance(33.6846, -117.8265, 33.6846, -117.8265);
        assert!(dist < 0.001);
    }

    #[test]
    fn project_round_trip() {
        let (alat, alon) = (34.1, -118.2);
        let enu = project(alat, alon, 34.15, -118.1);
        let (lat, lon) = unproject(alat, alon, enu);
        assert!((lat - 34.15).abs() < 1e-9);
        assert!((lon + 118.1).abs() < 1e-9);
    }

    #[test]
    fn projection_matches_haversine_at_short_range() {
        let (alat, alon) = (40.0, -75.0);
        let (lat, lon) = offset_by_bearing(alat, alon, 9_260.0, 1.1);
        let enu = project(alat, alon, lat, lon);
        let hav = haversine_distance(alat, alon, lat, lon);
        // The ellipsoidal series and the spherical haversine differ by a few
        // tenths of a percent; at 5 NM that is a handful of meters.
        assert!((enu.norm() - hav).abs() < hav * 0.005);
    }
}
