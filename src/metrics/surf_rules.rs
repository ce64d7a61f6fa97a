//! Per-spot surf rule tables ("X-factor" windows)
//!
//! A rule combines a wind-direction arc, a swell-height range and a tide
//! range. Rules are tried in order and the first one matching a sample
//! labels it. Every bound a rule names must be satisfied by a present
//! reading; an absent wind or tide value never matches a rule that
//! constrains it.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::compass::BearingArc;
use crate::models::{ForecastSeries, Sample, Variable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRule {
    pub label: String,
    #[serde(default)]
    pub wind_arc: Option<BearingArc>,
    /// Minimum swell height in metres, inclusive
    pub swell_min: f64,
    /// Maximum swell height in metres, inclusive
    #[serde(default)]
    pub swell_max: Option<f64>,
    #[serde(default)]
    pub min_tide: Option<f64>,
    #[serde(default)]
    pub max_tide: Option<f64>,
}

impl SpotRule {
    #[must_use]
    pub fn new(label: impl Into<String>, swell_min: f64, swell_max: Option<f64>) -> Self {
        Self {
            label: label.into(),
            wind_arc: None,
            swell_min,
            swell_max,
            min_tide: None,
            max_tide: None,
        }
    }

    #[must_use]
    pub fn with_wind(mut self, from: f64, to: f64) -> Self {
        self.wind_arc = Some(BearingArc::new(from, to));
        self
    }

    #[must_use]
    pub fn with_tide(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_tide = min;
        self.max_tide = max;
        self
    }

    #[must_use]
    pub fn matches(&self, sample: &Sample) -> bool {
        let Some(swell) = sample.get(Variable::SwellHeight) else {
            return false;
        };
        if swell < self.swell_min || self.swell_max.is_some_and(|max| swell > max) {
            return false;
        }

        if let Some(arc) = &self.wind_arc {
            match sample.get(Variable::WindDirection) {
                Some(direction) if arc.contains(direction) => {}
                _ => return false,
            }
        }

        if self.min_tide.is_some() || self.max_tide.is_some() {
            let Some(tide) = sample.get(Variable::TideHeight) else {
                return false;
            };
            if self.min_tide.is_some_and(|min| tide < min)
                || self.max_tide.is_some_and(|max| tide > max)
            {
                return false;
            }
        }

        true
    }

    /// Check the rule's own bounds are coherent
    pub fn validate(&self) -> Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("Spot rule label cannot be empty".to_string());
        }
        if self.swell_max.is_some_and(|max| max < self.swell_min) {
            return Err(format!(
                "Spot rule '{}' has swell_max below swell_min",
                self.label
            ));
        }
        if let (Some(min), Some(max)) = (self.min_tide, self.max_tide) {
            if max < min {
                return Err(format!(
                    "Spot rule '{}' has max_tide below min_tide",
                    self.label
                ));
            }
        }
        Ok(())
    }
}

/// Generic table used when a location has no rules of its own
#[must_use]
pub fn default_rules() -> Vec<SpotRule> {
    vec![
        SpotRule::new("Peak Window", 1.2, Some(2.5)).with_wind(270.0, 340.0),
        SpotRule::new("Session", 0.8, Some(3.0)),
    ]
}

/// Rule tables for known breaks, keyed by location name
#[must_use]
pub fn builtin_spot_rules() -> HashMap<String, Vec<SpotRule>> {
    HashMap::from([(
        "Phillip Island".to_string(),
        vec![
            SpotRule::new("Woolamai", 0.8, Some(2.5))
                .with_wind(25.0, 85.0)
                .with_tide(Some(1.4), None),
            SpotRule::new("Smiths", 0.9, Some(2.2))
                .with_wind(310.0, 355.0)
                .with_tide(Some(0.9), Some(1.7)),
            SpotRule::new("Cat Bay", 2.4, None)
                .with_wind(140.0, 220.0)
                .with_tide(Some(1.5), None),
        ],
    )])
}

/// First rule matching a sample
#[must_use]
pub fn match_rule<'a>(rules: &'a [SpotRule], sample: &Sample) -> Option<&'a SpotRule> {
    rules.iter().find(|rule| rule.matches(sample))
}

/// A labelled sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub time: NaiveDateTime,
    pub label: String,
    pub swell: f64,
}

/// All rule matches on one calendar date
#[must_use]
pub fn matches_on(series: &ForecastSeries, rules: &[SpotRule], date: NaiveDate) -> Vec<RuleMatch> {
    series
        .on_date(date)
        .filter_map(|sample| {
            let rule = match_rule(rules, sample)?;
            Some(RuleMatch {
                time: sample.time,
                label: rule.label.clone(),
                swell: sample.get(Variable::SwellHeight)?,
            })
        })
        .collect()
}

/// Look up a location's table by name, ignoring case and punctuation
#[must_use]
pub fn rules_for<'a>(
    spot_rules: &'a HashMap<String, Vec<SpotRule>>,
    default: &'a [SpotRule],
    location_name: &str,
) -> &'a [SpotRule] {
    let key = normalize(location_name);
    spot_rules
        .iter()
        .find(|(name, _)| normalize(name) == key)
        .map_or(default, |(_, rules)| rules.as_slice())
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(swell: f64, wind: Option<f64>, tide: Option<f64>) -> Sample {
        let time = NaiveDate::from_ymd_opt(2025, 1, 7)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let mut s = Sample::new(time).with(Variable::SwellHeight, swell);
        s.set(Variable::WindDirection, wind);
        s.set(Variable::TideHeight, tide);
        s
    }

    #[test]
    fn test_default_rules_order() {
        let rules = default_rules();
        let peak = match_rule(&rules, &sample(1.6, Some(300.0), None)).unwrap();
        assert_eq!(peak.label, "Peak Window");

        let session = match_rule(&rules, &sample(1.6, Some(90.0), None)).unwrap();
        assert_eq!(session.label, "Session");

        assert!(match_rule(&rules, &sample(0.5, Some(300.0), None)).is_none());
        assert!(match_rule(&rules, &sample(3.1, Some(300.0), None)).is_none());
    }

    #[test]
    fn test_missing_wind_fails_wind_bound() {
        let rules = default_rules();
        let matched = match_rule(&rules, &sample(1.6, None, None)).unwrap();
        assert_eq!(matched.label, "Session");
    }

    #[test]
    fn test_missing_tide_fails_tide_bound() {
        let spots = builtin_spot_rules();
        let rules = &spots["Phillip Island"];
        assert!(match_rule(rules, &sample(1.5, Some(50.0), None)).is_none());
        let matched = match_rule(rules, &sample(1.5, Some(50.0), Some(1.6))).unwrap();
        assert_eq!(matched.label, "Woolamai");
    }

    #[test]
    fn test_smiths_tide_range_inclusive() {
        let spots = builtin_spot_rules();
        let rules = &spots["Phillip Island"];
        assert!(match_rule(rules, &sample(1.0, Some(330.0), Some(1.7))).is_some());
        assert!(match_rule(rules, &sample(1.0, Some(330.0), Some(1.71))).is_none());
    }

    #[test]
    fn test_rules_lookup_by_name() {
        let spots = builtin_spot_rules();
        let default = default_rules();
        assert_eq!(rules_for(&spots, &default, "phillip-island").len(), 3);
        assert_eq!(rules_for(&spots, &default, "Bells Beach"), default.as_slice());
    }

    #[test]
    fn test_validate() {
        assert!(SpotRule::new("ok", 1.0, Some(2.0)).validate().is_ok());
        assert!(SpotRule::new("bad", 2.0, Some(1.0)).validate().is_err());
        assert!(SpotRule::new(" ", 1.0, None).validate().is_err());
    }
}
