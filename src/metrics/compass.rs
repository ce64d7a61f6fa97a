//! Bearing helpers: 16-point compass labels and clockwise arcs

use serde::{Deserialize, Serialize};

const POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

const SECTOR_WIDTH: f64 = 22.5;

/// Convert a bearing in degrees to one of the 16 compass points.
///
/// Each sector is 22.5 degrees wide and centred on its label, so North
/// covers `[348.75, 11.25)`. Bearings outside 0-360 wrap around; non-finite
/// input has no label.
#[must_use]
pub fn compass_label(degrees: f64) -> Option<&'static str> {
    if !degrees.is_finite() {
        return None;
    }
    let normalized = degrees.rem_euclid(360.0);
    let index = ((normalized + SECTOR_WIDTH / 2.0) / SECTOR_WIDTH).floor() as usize % POINTS.len();
    Some(POINTS[index])
}

/// Clockwise arc of bearings from `from` to `to`, both inclusive.
///
/// `from > to` means the arc crosses North, e.g. 315..45.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingArc {
    pub from: f64,
    pub to: f64,
}

impl BearingArc {
    #[must_use]
    pub const fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Check if a bearing lies on the arc, handling 360-degree wraparound
    #[must_use]
    pub fn contains(&self, degrees: f64) -> bool {
        if !degrees.is_finite() {
            return false;
        }
        let normalize = |a: f64| a.rem_euclid(360.0);
        let angle = normalize(degrees);
        let from = normalize(self.from);
        let to = normalize(self.to);

        if from <= to {
            angle >= from && angle <= to
        } else {
            angle >= from || angle <= to
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "N")]
    #[case(90.0, "E")]
    #[case(180.0, "S")]
    #[case(270.0, "W")]
    #[case(360.0, "N")]
    #[case(11.0, "N")]
    #[case(11.3, "NNE")]
    #[case(348.75, "N")]
    #[case(348.7, "NNW")]
    #[case(225.0, "SW")]
    #[case(-90.0, "W")]
    #[case(450.0, "E")]
    fn test_compass_label(#[case] degrees: f64, #[case] expected: &str) {
        assert_eq!(compass_label(degrees), Some(expected));
    }

    #[test]
    fn test_compass_label_non_finite() {
        assert_eq!(compass_label(f64::NAN), None);
        assert_eq!(compass_label(f64::INFINITY), None);
    }

    #[test]
    fn test_arc_across_north() {
        let arc = BearingArc::new(315.0, 45.0);
        assert!(arc.contains(315.0));
        assert!(arc.contains(0.0));
        assert!(arc.contains(360.0));
        assert!(arc.contains(45.0));
        assert!(!arc.contains(46.0));
        assert!(!arc.contains(314.9));
        assert!(!arc.contains(180.0));
    }

    #[test]
    fn test_plain_arc() {
        let arc = BearingArc::new(270.0, 340.0);
        assert!(arc.contains(300.0));
        assert!(!arc.contains(10.0));
        assert!(!arc.contains(f64::NAN));
    }
}
