//! Moon phase from the synodic month

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Julian day of the reference new moon (2000-01-06 00:00 UTC)
const REFERENCE_NEW_MOON_JD: f64 = 2_451_549.5;
/// Mean synodic month in days
pub const SYNODIC_MONTH: f64 = 29.53;
/// Offset between chrono's day count from 0001-01-01 and the Julian day at midnight
const CE_TO_JULIAN_DAY: f64 = 1_721_424.5;

/// The eight named phases of the lunar cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    pub const ALL: [MoonPhase; 8] = [
        MoonPhase::NewMoon,
        MoonPhase::WaxingCrescent,
        MoonPhase::FirstQuarter,
        MoonPhase::WaxingGibbous,
        MoonPhase::FullMoon,
        MoonPhase::WaningGibbous,
        MoonPhase::LastQuarter,
        MoonPhase::WaningCrescent,
    ];

    /// Phase for a calendar date
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self::from_age(moon_age(date))
    }

    /// Phase for an age in days since the last new moon.
    ///
    /// Each named phase spans an eighth of the cycle, centred on its
    /// nominal age, so "New Moon" covers the last and first 1.84 days.
    #[must_use]
    pub fn from_age(age_days: f64) -> Self {
        let eighth = SYNODIC_MONTH / 8.0;
        let index = ((age_days.rem_euclid(SYNODIC_MONTH) / eighth) + 0.5).floor() as usize % 8;
        Self::ALL[index]
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "🌑",
            MoonPhase::WaxingCrescent => "🌒",
            MoonPhase::FirstQuarter => "🌓",
            MoonPhase::WaxingGibbous => "🌔",
            MoonPhase::FullMoon => "🌕",
            MoonPhase::WaningGibbous => "🌖",
            MoonPhase::LastQuarter => "🌗",
            MoonPhase::WaningCrescent => "🌘",
        }
    }

    /// Position in [`MoonPhase::ALL`]
    #[must_use]
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }
}

impl fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbol(), self.name())
    }
}

/// Julian day number at 00:00 UTC of `date`
#[must_use]
pub fn julian_day(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce()) + CE_TO_JULIAN_DAY
}

/// Days elapsed since the most recent new moon, in `[0, SYNODIC_MONTH)`
#[must_use]
pub fn moon_age(date: NaiveDate) -> f64 {
    (julian_day(date) - REFERENCE_NEW_MOON_JD).rem_euclid(SYNODIC_MONTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_julian_day_reference() {
        assert_eq!(julian_day(date(2000, 1, 1)), 2_451_544.5);
        assert_eq!(julian_day(date(2000, 1, 6)), REFERENCE_NEW_MOON_JD);
    }

    #[rstest]
    #[case(date(2000, 1, 6), MoonPhase::NewMoon)]
    #[case(date(2024, 4, 8), MoonPhase::NewMoon)]
    #[case(date(2024, 4, 23), MoonPhase::FullMoon)]
    #[case(date(2024, 4, 15), MoonPhase::FirstQuarter)]
    fn test_known_dates(#[case] day: NaiveDate, #[case] expected: MoonPhase) {
        assert_eq!(MoonPhase::for_date(day), expected);
    }

    #[test]
    fn test_exactly_eight_labels_over_a_year() {
        let start = date(2025, 1, 1);
        let names: HashSet<&str> = (0..365)
            .map(|i| MoonPhase::for_date(start + Duration::days(i)).name())
            .collect();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_periodic_over_synodic_cycles() {
        // two cycles are 59.06 days, so shifting by 59 days moves the age by
        // less than a tenth of a day
        let start = date(2023, 3, 1);
        for i in 0..400 {
            let day = start + Duration::days(i);
            let a = MoonPhase::for_date(day).index();
            let b = MoonPhase::for_date(day + Duration::days(59)).index();
            let distance = (a as i32 - b as i32).rem_euclid(8).min((b as i32 - a as i32).rem_euclid(8));
            assert!(distance <= 1, "{day}: {a} vs {b}");
        }
    }

    #[test]
    fn test_from_age_boundaries() {
        assert_eq!(MoonPhase::from_age(0.0), MoonPhase::NewMoon);
        assert_eq!(MoonPhase::from_age(1.8), MoonPhase::NewMoon);
        assert_eq!(MoonPhase::from_age(1.9), MoonPhase::WaxingCrescent);
        assert_eq!(MoonPhase::from_age(14.8), MoonPhase::FullMoon);
        assert_eq!(MoonPhase::from_age(28.0), MoonPhase::NewMoon);
    }
}
