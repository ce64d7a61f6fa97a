//! Sunset and sunrise bracketing a night

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use crate::models::Location;

/// Sunset on `date` and the following sunrise, or `None` for invalid
/// coordinates
#[must_use]
pub fn night_bounds(location: &Location, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let coordinates = Coordinates::new(location.latitude, location.longitude)?;

    let sunset = SolarDay::new(coordinates, date).event_time(SolarEvent::Sunset);
    let sunrise = SolarDay::new(coordinates, date + Duration::days(1)).event_time(SolarEvent::Sunrise);

    Some((sunset?, sunrise?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summer_night_at_lake_tyrrell() {
        let location = Location::new(-35.32, 142.80, "Lake Tyrrell");
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();

        let (sunset, sunrise) = night_bounds(&location, date).unwrap();

        let night = sunrise - sunset;
        assert!(night > Duration::hours(8), "night was {night}");
        assert!(night < Duration::hours(11), "night was {night}");
    }

    #[test]
    fn test_invalid_coordinates() {
        let location = Location::new(120.0, 0.0, "Nowhere");
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert!(night_bounds(&location, date).is_none());
    }
}
