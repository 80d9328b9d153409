//! Great-circle distance and derived speed between two fixes.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Speeds above this are treated as GPS glitches.
pub const SPEED_GLITCH_THRESHOLD_KMH: f64 = 90.0;
/// Value substituted for a glitched speed.
pub const SPEED_GLITCH_REPLACEMENT_KMH: f64 = 50.0;

/// Haversine distance in kilometres.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Average speed in km/h covering `seconds` between the two points.
///
/// Returns `0.0` when `seconds` is zero. Anything faster than
/// [`SPEED_GLITCH_THRESHOLD_KMH`] is reported as [`SPEED_GLITCH_REPLACEMENT_KMH`].
pub fn speed(lat1: f64, lon1: f64, lat2: f64, lon2: f64, seconds: f64) -> f64 {
    if seconds == 0.0 {
        return 0.0;
    }

    let kmh = distance(lat1, lon1, lat2, lon2) / (seconds / 3600.0);
    if kmh > SPEED_GLITCH_THRESHOLD_KMH {
        SPEED_GLITCH_REPLACEMENT_KMH
    } else {
        kmh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_same_point_is_zero() {
        assert_eq!(distance(52.2297, 21.0122, 52.2297, 21.0122), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            ((52.3, 21.2), (51.3, 21.0)),
            ((52.22274, 20.98), (52.25, 21.05)),
            ((-33.86, 151.2), (51.5, -0.12)),
        ];
        for ((a_lat, a_lon), (b_lat, b_lon)) in pairs {
            let ab = distance(a_lat, a_lon, b_lat, b_lon);
            let ba = distance(b_lat, b_lon, a_lat, a_lon);
            assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
        }
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is ~111.19 km on a 6371 km sphere.
        let d = distance(52.0, 21.0, 53.0, 21.0);
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_speed_zero_seconds() {
        assert_eq!(speed(52.0, 21.0, 52.1, 21.1, 0.0), 0.0);
    }

    #[test]
    fn test_speed_normal() {
        // ~1.112 km in two minutes is ~33 km/h.
        let s = speed(52.0, 21.0, 52.01, 21.0, 120.0);
        assert!((s - 33.36).abs() < 0.1, "got {s}");
    }

    #[test]
    fn test_speed_glitch_is_clamped() {
        // ~13 km in one minute.
        let s = speed(51.9, 20.9, 52.0, 21.0, 60.0);
        assert_eq!(s, SPEED_GLITCH_REPLACEMENT_KMH);
    }

    #[test]
    fn test_speed_stationary() {
        assert_eq!(speed(52.1, 21.1, 52.1, 21.1, 60.0), 0.0);
    }
}
