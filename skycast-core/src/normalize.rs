//! Mapping of raw values into the categorical vocabulary the model expects.

use crate::model::{CloudCover, Season};

/// Bucket a cloud-cover percentage. Boundaries are lower-inclusive: 10, 40 and 80.
pub fn cloud_category(percent: f64) -> CloudCover {
    if percent < 10.0 {
        CloudCover::Clear
    } else if percent < 40.0 {
        CloudCover::PartlyCloudy
    } else if percent < 80.0 {
        CloudCover::Cloudy
    } else {
        CloudCover::Overcast
    }
}

/// Season for a calendar month (1-12), northern-hemisphere convention.
pub fn season(month: u32) -> Season {
    match month {
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Autumn,
        _ => Season::Winter,
    }
}

/// Wrap a longitude into [-180, 180).
pub fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

pub fn clamp_latitude(latitude: f64) -> f64 {
    latitude.clamp(-90.0, 90.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_boundaries_are_exact() {
        assert_eq!(cloud_category(0.0), CloudCover::Clear);
        assert_eq!(cloud_category(9.9), CloudCover::Clear);
        assert_eq!(cloud_category(10.0), CloudCover::PartlyCloudy);
        assert_eq!(cloud_category(39.9), CloudCover::PartlyCloudy);
        assert_eq!(cloud_category(40.0), CloudCover::Cloudy);
        assert_eq!(cloud_category(79.9), CloudCover::Cloudy);
        assert_eq!(cloud_category(80.0), CloudCover::Overcast);
        assert_eq!(cloud_category(100.0), CloudCover::Overcast);
    }

    #[test]
    fn every_month_has_one_season() {
        let expected = [
            Season::Winter,
            Season::Winter,
            Season::Spring,
            Season::Spring,
            Season::Spring,
            Season::Summer,
            Season::Summer,
            Season::Summer,
            Season::Autumn,
            Season::Autumn,
            Season::Autumn,
            Season::Winter,
        ];
        for (month, want) in (1..=12).zip(expected) {
            assert_eq!(season(month), want, "month {month}");
        }
    }

    #[test]
    fn longitude_wraps() {
        assert_eq!(normalize_longitude(190.0), -170.0);
        assert_eq!(normalize_longitude(-200.0), 160.0);
        assert_eq!(normalize_longitude(540.0), -180.0);
    }

    #[test]
    fn longitude_normalization_is_idempotent() {
        for lon in [-180.0, -170.0, -0.5, 0.0, 45.25, 107.5, 179.75] {
            assert_eq!(normalize_longitude(lon), lon);
            assert_eq!(normalize_longitude(normalize_longitude(lon)), lon);
        }
        assert!((normalize_longitude(108.206) - 108.206).abs() < 1e-9);
    }

    #[test]
    fn latitude_clamps() {
        assert_eq!(clamp_latitude(95.0), 90.0);
        assert_eq!(clamp_latitude(-95.0), -90.0);
        assert_eq!(clamp_latitude(16.047), 16.047);
    }
}
