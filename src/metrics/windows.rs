//! Calendar bucketing and best-window selection
//!
//! A series is partitioned into buckets keyed by a date: either the calendar
//! day of each sample, or the night it belongs to when the bucket is a clock
//! window crossing midnight. Each bucket is reduced to [`BucketStats`] over
//! the valid values only, and the best bucket is the first one holding the
//! extremal mean.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::InsufficientData;
use crate::models::{ForecastSeries, Variable};

/// Aggregates of one bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStats {
    /// Calendar day, or the evening date of a night bucket
    pub date: NaiveDate,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Number of valid samples aggregated
    pub count: usize,
}

/// Clock-hour window, both ends inclusive, that may cross midnight.
///
/// For the default 20..=4 window, 22:00 on the 7th and 03:00 on the 8th
/// both belong to the night of the 7th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for NightWindow {
    fn default() -> Self {
        Self {
            start_hour: 20,
            end_hour: 4,
        }
    }
}

impl NightWindow {
    #[must_use]
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// The night a timestamp belongs to, if it falls inside the window
    #[must_use]
    pub fn night_of(&self, time: NaiveDateTime) -> Option<NaiveDate> {
        let hour = time.hour();
        let date = time.date();
        if self.start_hour <= self.end_hour {
            return (self.start_hour..=self.end_hour)
                .contains(&hour)
                .then_some(date);
        }
        if hour >= self.start_hour {
            Some(date)
        } else if hour <= self.end_hour {
            date.pred_opt()
        } else {
            None
        }
    }

    /// First and last instant of the night starting on `date`
    #[must_use]
    pub fn span(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_hms_opt(self.start_hour, 0, 0).unwrap_or_default();
        let end_date = if self.start_hour <= self.end_hour {
            date
        } else {
            date + Duration::days(1)
        };
        let end = end_date
            .and_hms_opt(self.end_hour, 0, 0)
            .unwrap_or_default();
        (start, end)
    }
}

/// How samples are assigned to buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucketing {
    Daily,
    Night(NightWindow),
}

impl Bucketing {
    fn key(&self, time: NaiveDateTime) -> Option<NaiveDate> {
        match self {
            Bucketing::Daily => Some(time.date()),
            Bucketing::Night(window) => window.night_of(time),
        }
    }
}

/// Which end of the aggregate is best
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

/// Aggregate valid values of `variable` per bucket, in chronological order.
///
/// Buckets without a single valid value are left out.
#[must_use]
pub fn bucket_stats(
    series: &ForecastSeries,
    variable: Variable,
    bucketing: Bucketing,
) -> Vec<BucketStats> {
    let mut buckets: Vec<(NaiveDate, Vec<f64>)> = Vec::new();

    for (time, value) in series.values(variable) {
        let Some(key) = bucketing.key(time) else {
            continue;
        };
        match buckets.iter_mut().find(|(date, _)| *date == key) {
            Some((_, values)) => values.push(value),
            None => buckets.push((key, vec![value])),
        }
    }

    buckets.sort_by_key(|(date, _)| *date);
    buckets
        .into_iter()
        .map(|(date, values)| {
            let sum: f64 = values.iter().sum();
            BucketStats {
                date,
                mean: sum / values.len() as f64,
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                count: values.len(),
            }
        })
        .collect()
}

/// First bucket in chronological order holding the extremal mean
pub fn best_window(
    buckets: &[BucketStats],
    extremum: Extremum,
    metric: &'static str,
) -> Result<BucketStats, InsufficientData> {
    let mut best: Option<&BucketStats> = None;
    for bucket in buckets {
        let better = match best {
            None => true,
            Some(current) => match extremum {
                Extremum::Max => bucket.mean > current.mean,
                Extremum::Min => bucket.mean < current.mean,
            },
        };
        if better {
            best = Some(bucket);
        }
    }
    best.cloned().ok_or_else(|| InsufficientData::new(metric))
}

/// Day with the highest mean wave height
pub fn best_swell_day(series: &ForecastSeries) -> Result<BucketStats, InsufficientData> {
    let buckets = bucket_stats(series, Variable::WaveHeight, Bucketing::Daily);
    best_window(&buckets, Extremum::Max, "best swell day")
}

/// Best night for viewing: lowest mean cloud cover inside the night window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestNight {
    pub date: NaiveDate,
    pub mean_cloud: f64,
    /// 100 minus the mean cloud cover
    pub clarity: f64,
}

///
/// Nights that started before `from` are over and never chosen, even when the
/// series still carries their last few hours.
pub fn best_viewing_night(
    series: &ForecastSeries,
    window: NightWindow,
    from: NaiveDate,
) -> Result<BestNight, InsufficientData> {
    let buckets: Vec<BucketStats> =
        bucket_stats(series, Variable::CloudCover, Bucketing::Night(window))
            .into_iter()
            .filter(|bucket| bucket.date >= from)
            .collect();
    let best = best_window(&buckets, Extremum::Min, "best viewing night")?;
    Ok(BestNight {
        date: best.date,
        mean_cloud: best.mean,
        clarity: clarity(best.mean),
    })
}

/// Clarity percentage for a cloud cover percentage
#[must_use]
pub fn clarity(cloud_cover: f64) -> f64 {
    (100.0 - cloud_cover).clamp(0.0, 100.0)
}

/// Current reading of a variable: the last sample's value, else the last
/// valid prior one, else `fallback`
#[must_use]
pub fn current_reading(series: &ForecastSeries, variable: Variable, fallback: f64) -> f64 {
    series
        .last_valid(variable)
        .map_or(fallback, |(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Granularity, Sample};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hourly(variable: Variable, values: &[Option<f64>]) -> ForecastSeries {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut s = Sample::new(start() + Duration::hours(i as i64));
                s.set(variable, *v);
                s
            })
            .collect();
        ForecastSeries::new(Granularity::Hourly, 0, samples).unwrap()
    }

    fn days(per_day: &[f64]) -> Vec<Option<f64>> {
        per_day
            .iter()
            .flat_map(|v| std::iter::repeat_n(Some(*v), 24))
            .collect()
    }

    #[test]
    fn test_best_swell_day_picks_highest_mean() {
        let series = hourly(Variable::WaveHeight, &days(&[1.0, 1.2, 2.3, 1.8, 0.9]));
        let best = best_swell_day(&series).unwrap();
        assert_eq!(best.date, NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());
        assert!((best.mean - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_best_day_tie_resolves_to_first() {
        let series = hourly(Variable::WaveHeight, &days(&[1.0, 1.7, 1.2, 1.7]));
        let best = best_swell_day(&series).unwrap();
        assert_eq!(best.date, NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
    }

    #[test]
    fn test_absent_values_excluded_from_mean() {
        let mut values = days(&[1.0, 1.0]);
        // day two: half missing, remaining hours at 1.5
        for (i, v) in values.iter_mut().enumerate().skip(24) {
            *v = if i % 2 == 0 { None } else { Some(1.5) };
        }
        let buckets = bucket_stats(
            &hourly(Variable::WaveHeight, &values),
            Variable::WaveHeight,
            Bucketing::Daily,
        );
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].count, 12);
        assert!((buckets[1].mean - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_valid_data_is_insufficient() {
        let series = hourly(Variable::WaveHeight, &[None, None, None]);
        assert_eq!(
            best_swell_day(&series),
            Err(InsufficientData::new("best swell day"))
        );
    }

    #[test]
    fn test_night_window_crosses_midnight() {
        let window = NightWindow::default();
        let evening = start() + Duration::hours(22);
        let small_hours = start() + Duration::hours(27);
        let afternoon = start() + Duration::hours(15);
        assert_eq!(window.night_of(evening), Some(start().date()));
        assert_eq!(window.night_of(small_hours), Some(start().date()));
        assert_eq!(window.night_of(afternoon), None);
        assert_eq!(
            window.night_of(start() + Duration::hours(4)),
            start().date().pred_opt()
        );
        assert_eq!(window.night_of(start() + Duration::hours(5)), None);
    }

    #[test]
    fn test_best_viewing_night_minimises_cloud() {
        // 3 days of cloud: clear on the night of the 8th only
        let mut values = vec![Some(80.0); 72];
        for v in values.iter_mut().take(24 + 24 + 5).skip(24 + 20) {
            *v = Some(10.0);
        }
        let series = hourly(Variable::CloudCover, &values);
        let best = best_viewing_night(&series, NightWindow::default(), start().date()).unwrap();
        assert_eq!(best.date, NaiveDate::from_ymd_opt(2025, 1, 8).unwrap());
        assert!((best.clarity - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_viewing_night_skips_night_already_over() {
        // clear small hours of the 7th belong to the night of the 6th
        let mut values = vec![Some(60.0); 48];
        for v in values.iter_mut().take(5) {
            *v = Some(0.0);
        }
        let series = hourly(Variable::CloudCover, &values);

        let day_before = start().date() - Duration::days(1);
        let stale = best_viewing_night(&series, NightWindow::default(), day_before).unwrap();
        assert_eq!(stale.date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());

        let best = best_viewing_night(&series, NightWindow::default(), start().date()).unwrap();
        assert_eq!(best.date, start().date());
        assert!((best.clarity - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_viewing_night_with_only_past_nights_is_insufficient() {
        let values = vec![Some(10.0); 5];
        let series = hourly(Variable::CloudCover, &values);
        assert!(best_viewing_night(&series, NightWindow::default(), start().date()).is_err());
    }

    #[test]
    fn test_current_reading_fallbacks() {
        let series = hourly(Variable::CloudCover, &[Some(20.0), Some(35.0), None]);
        assert_eq!(current_reading(&series, Variable::CloudCover, 50.0), 35.0);
        assert_eq!(current_reading(&series, Variable::WaveHeight, 0.0), 0.0);
    }
}
