//! Great-circle distance

use attend_api::Coordinate;

/// Mean earth radius used by the haversine formula, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const SF: Coordinate = Coordinate::new(37.7749, -122.4194);
    const LA: Coordinate = Coordinate::new(34.0522, -118.2437);

    #[test]
    fn identical_points_are_zero() {
        assert_eq!(haversine_distance(SF, SF), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(haversine_distance(SF, LA), haversine_distance(LA, SF));
    }

    #[test]
    fn san_francisco_to_los_angeles() {
        let d = haversine_distance(SF, LA);
        assert!((d - 559_120.0).abs() < 1_000.0, "got {d}");
    }

    #[test]
    fn small_latitude_offset() {
        // 0.002 degrees of latitude is about 222 m
        let d = haversine_distance(SF, Coordinate::new(37.7769, -122.4194));
        assert!((d - 222.39).abs() < 0.5, "got {d}");
    }

    #[test]
    fn antipodal_points() {
        let d = haversine_distance(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1e-3);
    }
}
