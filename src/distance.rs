//! Great-circle distance between coordinates.
//!
//! The production formula is haversine on a sphere of radius 3960 miles.
//! Inputs are (latitude, longitude) pairs in degrees; outputs are miles.

use std::f64::consts::PI;

use crate::models::GeoPoint;

/// Earth's radius in miles used by the haversine formula.
pub const EARTH_RADIUS_MILES: f64 = 3960.0;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

fn deg_to_rad(value: f64) -> f64 {
    value * DEG_TO_RAD
}

/// Calculate the great-circle distance between two points.
///
/// Uses the haversine formula, which stays accurate for the short distances
/// typical between neighbouring postal codes. The intermediate term is
/// clamped to [0, 1] so rounding never produces `NaN`.
///
/// # Arguments
///
/// * `from` - First point in degrees
/// * `to` - Second point in degrees
///
/// # Returns
///
/// Distance in miles. Identical points give exactly `0.0`.
///
/// # Example
///
/// ```
/// use zipgeo::distance::haversine_miles;
/// use zipgeo::models::GeoPoint;
///
/// // One degree of latitude is ~69 miles
/// let d = haversine_miles(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
/// assert!((d - 69.1).abs() < 0.1);
/// ```
pub fn haversine_miles(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = deg_to_rad(from.lat);
    let lat2_rad = deg_to_rad(to.lat);
    let delta_lat = deg_to_rad(to.lat - from.lat);
    let delta_lon = deg_to_rad(to.lon - from.lon);

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Spherical law of cosines, kept as an independent reference for
/// differential tests against [`haversine_miles`].
#[cfg(test)]
pub(crate) mod reference {
    use super::{deg_to_rad, GeoPoint};

    pub const EARTH_RADIUS_MILES: f64 = 3958.56540656;

    pub fn law_of_cosines_miles(from: GeoPoint, to: GeoPoint) -> f64 {
        let lat1 = deg_to_rad(from.lat);
        let lat2 = deg_to_rad(to.lat);

        let cosine = lat1.sin() * lat2.sin()
            + lat1.cos() * lat2.cos() * deg_to_rad(from.lon - to.lon).cos();

        cosine.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_MILES
    }
}
