//! Great-circle distance helpers for radius search.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance in kilometres between two `(lat, lng)` points.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Latitude/longitude box that contains every point within `radius_km`.
/// Used as a coarse SQL prefilter before the exact distance check.
///
/// When the box crosses the antimeridian `min_lng > max_lng` and the
/// longitude range is `[min_lng, 180] + [-180, max_lng]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(lat: f64, lng: f64, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let lat_rad = lat.to_radians();
        let min_lat = lat_rad - angular;
        let max_lat = lat_rad + angular;

        // A circle that reaches a pole spans every meridian.
        if min_lat <= -std::f64::consts::FRAC_PI_2
            || max_lat >= std::f64::consts::FRAC_PI_2
            || angular >= std::f64::consts::PI
        {
            return Self {
                min_lat: min_lat.to_degrees().max(-90.0),
                max_lat: max_lat.to_degrees().min(90.0),
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        let d_lng = (angular.sin() / lat_rad.cos()).min(1.0).asin().to_degrees();
        let mut min_lng = lng - d_lng;
        let mut max_lng = lng + d_lng;
        if min_lng < -180.0 {
            min_lng += 360.0;
        }
        if max_lng > 180.0 {
            max_lng -= 360.0;
        }

        Self {
            min_lat: min_lat.to_degrees(),
            max_lat: max_lat.to_degrees(),
            min_lng,
            max_lng,
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lng > self.max_lng
    }
}

pub fn is_valid_coordinate(lng: f64, lat: f64) -> bool {
    lng.is_finite() && lat.is_finite() && (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat)
}
