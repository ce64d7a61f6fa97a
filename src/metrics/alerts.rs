//! Weather alert classification over a look-ahead window

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::compass::BearingArc;
use crate::error::InsufficientData;
use crate::models::{ForecastSeries, Rgb, Sample, Variable};

/// Alert categories, ordered by priority (highest last)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AlertLevel {
    Normal,
    HighWind,
    FireRisk,
    Thunderstorm,
}

impl AlertLevel {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "NORMAL",
            AlertLevel::HighWind => "HIGH WIND",
            AlertLevel::FireRisk => "FIRE RISK",
            AlertLevel::Thunderstorm => "THUNDERSTORM",
        }
    }

    /// Severity colour used for the status row
    #[must_use]
    pub fn color(&self) -> Rgb {
        match self {
            AlertLevel::Normal => Rgb(240, 255, 240),       // honeydew
            AlertLevel::HighWind => Rgb(255, 160, 122),     // light salmon
            AlertLevel::FireRisk => Rgb(255, 165, 0),       // orange
            AlertLevel::Thunderstorm => Rgb(147, 112, 219), // medium purple
        }
    }
}

/// Thresholds for the alert classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRules {
    /// Hours after "now" that are inspected
    pub lookahead_hours: u32,
    /// WMO codes counted as thunderstorms
    pub storm_codes: Vec<u32>,
    /// Minimum temperature (C) for a fire-risk sample
    pub fire_temperature: f64,
    /// Wind directions that carry fire risk (hot inland winds)
    pub fire_arc: BearingArc,
    /// Minimum gust speed (km/h) for a high-wind sample
    pub gust_threshold: f64,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            lookahead_hours: 24,
            storm_codes: vec![95, 96, 99],
            fire_temperature: 25.0,
            fire_arc: BearingArc::new(315.0, 45.0),
            gust_threshold: 35.0,
        }
    }
}

impl AlertRules {
    #[must_use]
    pub fn is_storm_code(&self, code: f64) -> bool {
        self.storm_codes
            .iter()
            .any(|storm| (f64::from(*storm) - code).abs() < f64::EPSILON)
    }

    /// Hot and blowing from inside the fire arc
    #[must_use]
    pub fn is_fire_sample(&self, temperature: Option<f64>, direction: Option<f64>) -> bool {
        match (temperature, direction) {
            (Some(t), Some(d)) => t >= self.fire_temperature && self.fire_arc.contains(d),
            _ => false,
        }
    }

    /// Highest-priority level a single sample triggers
    #[must_use]
    pub fn level_of(&self, sample: &Sample) -> AlertLevel {
        if sample
            .get(Variable::WeatherCode)
            .is_some_and(|code| self.is_storm_code(code))
        {
            AlertLevel::Thunderstorm
        } else if self.is_fire_sample(
            sample.get(Variable::Temperature),
            sample.get(Variable::WindDirection),
        ) {
            AlertLevel::FireRisk
        } else if sample
            .get(Variable::WindGusts)
            .is_some_and(|gust| gust >= self.gust_threshold)
        {
            AlertLevel::HighWind
        } else {
            AlertLevel::Normal
        }
    }
}

/// Classify the samples in `[now, now + lookahead]`.
///
/// Returns the highest-priority category any sample matches:
/// thunderstorm, then fire risk, then high wind, else normal.
pub fn classify_alert(
    series: &ForecastSeries,
    now: NaiveDateTime,
    rules: &AlertRules,
) -> Result<AlertLevel, InsufficientData> {
    let cutoff = now + Duration::hours(i64::from(rules.lookahead_hours));
    let mut window = series.between(now, cutoff).peekable();
    if window.peek().is_none() {
        return Err(InsufficientData::new("alert window"));
    }

    Ok(window
        .map(|sample| rules.level_of(sample))
        .max()
        .unwrap_or(AlertLevel::Normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Granularity;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn calm_series(hours: i64) -> Vec<Sample> {
        (0..hours)
            .map(|h| {
                Sample::new(start() + Duration::hours(h))
                    .with(Variable::Temperature, 18.0)
                    .with(Variable::WindDirection, 200.0)
                    .with(Variable::WindGusts, 12.0)
                    .with(Variable::WeatherCode, 3.0)
            })
            .collect()
    }

    fn series(samples: Vec<Sample>) -> ForecastSeries {
        ForecastSeries::new(Granularity::Hourly, 0, samples).unwrap()
    }

    #[test]
    fn test_normal_when_nothing_matches() {
        let level = classify_alert(&series(calm_series(48)), start(), &AlertRules::default());
        assert_eq!(level, Ok(AlertLevel::Normal));
    }

    #[test]
    fn test_storm_code_beats_other_alerts() {
        let mut samples = calm_series(48);
        samples[5].set(Variable::WeatherCode, Some(95.0));
        samples[6].set(Variable::Temperature, Some(31.0));
        samples[6].set(Variable::WindDirection, Some(350.0));
        let level = classify_alert(&series(samples), start(), &AlertRules::default());
        assert_eq!(level, Ok(AlertLevel::Thunderstorm));
    }

    #[test]
    fn test_storm_without_gusts_is_thunderstorm() {
        let mut samples = calm_series(48);
        samples[10].set(Variable::WeatherCode, Some(95.0));
        let level = classify_alert(&series(samples), start(), &AlertRules::default());
        assert_eq!(level, Ok(AlertLevel::Thunderstorm));
    }

    #[test]
    fn test_fire_risk_needs_heat_and_arc() {
        let mut samples = calm_series(48);
        samples[3].set(Variable::Temperature, Some(25.0));
        samples[3].set(Variable::WindDirection, Some(10.0));
        samples[4].set(Variable::WindGusts, Some(40.0));
        let level = classify_alert(&series(samples), start(), &AlertRules::default());
        assert_eq!(level, Ok(AlertLevel::FireRisk));

        let mut samples = calm_series(48);
        samples[3].set(Variable::Temperature, Some(30.0));
        samples[3].set(Variable::WindDirection, Some(180.0));
        let level = classify_alert(&series(samples), start(), &AlertRules::default());
        assert_eq!(level, Ok(AlertLevel::Normal));
    }

    #[test]
    fn test_high_wind_threshold_inclusive() {
        let mut samples = calm_series(48);
        samples[2].set(Variable::WindGusts, Some(35.0));
        let level = classify_alert(&series(samples), start(), &AlertRules::default());
        assert_eq!(level, Ok(AlertLevel::HighWind));
    }

    #[test]
    fn test_alerts_outside_window_ignored() {
        let mut samples = calm_series(48);
        samples[30].set(Variable::WeatherCode, Some(99.0));
        let level = classify_alert(&series(samples), start(), &AlertRules::default());
        assert_eq!(level, Ok(AlertLevel::Normal));
    }

    #[test]
    fn test_empty_window_is_insufficient() {
        let later = start() + Duration::days(5);
        let level = classify_alert(&series(calm_series(24)), later, &AlertRules::default());
        assert!(level.is_err());
    }

    #[test]
    fn test_priority_order() {
        assert!(AlertLevel::Thunderstorm > AlertLevel::FireRisk);
        assert!(AlertLevel::FireRisk > AlertLevel::HighWind);
        assert!(AlertLevel::HighWind > AlertLevel::Normal);
    }
}
