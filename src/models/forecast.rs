//! Forecast series model and query helpers

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Location, ReportKind, Sample, Variable};
use crate::error::FetchError;

/// Spacing of the samples in a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Hourly,
    Daily,
}

/// Ordered, immutable sequence of forecast samples.
///
/// Timestamps are local to the forecast location and strictly increasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSeries {
    granularity: Granularity,
    utc_offset_seconds: i32,
    samples: Vec<Sample>,
}

impl ForecastSeries {
    /// Build a series, rejecting timestamps that are not strictly increasing
    pub fn new(
        granularity: Granularity,
        utc_offset_seconds: i32,
        samples: Vec<Sample>,
    ) -> Result<Self, FetchError> {
        if let Some(pair) = samples.windows(2).find(|pair| pair[1].time <= pair[0].time) {
            return Err(FetchError::malformed(format!(
                "timestamps not strictly increasing at {}",
                pair[1].time
            )));
        }
        if FixedOffset::east_opt(utc_offset_seconds).is_none() {
            return Err(FetchError::malformed(format!(
                "utc offset out of range: {utc_offset_seconds}s"
            )));
        }

        Ok(Self {
            granularity,
            utc_offset_seconds,
            samples,
        })
    }

    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn utc_offset_seconds(&self) -> i32 {
        self.utc_offset_seconds
    }

    /// Convert an absolute instant into the series' local clock
    #[must_use]
    pub fn local_time(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        // offset validated in new()
        FixedOffset::east_opt(self.utc_offset_seconds).map_or(instant.naive_utc(), |offset| {
            instant.with_timezone(&offset).naive_local()
        })
    }

    /// Valid `(time, value)` pairs of one variable, in order
    pub fn values(&self, variable: Variable) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.samples
            .iter()
            .filter_map(move |s| s.get(variable).map(|v| (s.time, v)))
    }

    /// True if at least one sample carries a valid value
    #[must_use]
    pub fn has_valid(&self, variable: Variable) -> bool {
        self.values(variable).next().is_some()
    }

    /// Samples with `start <= time <= end`
    pub fn between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> impl Iterator<Item = &Sample> + '_ {
        self.samples
            .iter()
            .filter(move |s| s.time >= start && s.time <= end)
    }

    /// Samples falling on a calendar date
    pub fn on_date(&self, date: NaiveDate) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter().filter(move |s| s.time.date() == date)
    }

    /// Last valid reading of a variable
    #[must_use]
    pub fn last_valid(&self, variable: Variable) -> Option<(NaiveDateTime, f64)> {
        self.samples
            .iter()
            .rev()
            .find_map(|s| s.get(variable).map(|v| (s.time, v)))
    }

    #[must_use]
    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.samples.first().map(|s| s.time)
    }

    #[must_use]
    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|s| s.time)
    }
}

/// Everything fetched for one report: the primary hourly series and, for
/// weather reports, a daily series
#[derive(Debug, Clone)]
pub struct Forecast {
    pub location: Location,
    pub kind: ReportKind,
    pub hourly: ForecastSeries,
    pub daily: Option<ForecastSeries>,
}

impl Forecast {
    #[must_use]
    pub fn new(location: Location, kind: ReportKind, hourly: ForecastSeries) -> Self {
        Self {
            location,
            kind,
            hourly,
            daily: None,
        }
    }

    #[must_use]
    pub fn with_daily(mut self, daily: ForecastSeries) -> Self {
        self.daily = Some(daily);
        self
    }
}
