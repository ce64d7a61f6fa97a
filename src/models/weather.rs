//! Forecast sample model and variable catalogue

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Named numeric fields a forecast sample can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    /// Significant wave height in metres
    WaveHeight,
    /// Mean wave period in seconds
    WavePeriod,
    /// Swell wave height in metres
    SwellHeight,
    /// Swell direction in degrees (0-360, where 0/360 is North)
    SwellDirection,
    /// Sea level height in metres, used as the tide reading
    TideHeight,
    /// Wind speed at 10 m in km/h
    WindSpeed,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    WindDirection,
    /// Wind gusts at 10 m in km/h
    WindGusts,
    /// Total cloud cover percentage (0-100)
    CloudCover,
    /// Temperature at 2 m in Celsius
    Temperature,
    /// Precipitation in mm
    Precipitation,
    /// WMO weather interpretation code
    WeatherCode,
}

impl Variable {
    /// Human readable label with unit
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Variable::WaveHeight => "Wave Height (m)",
            Variable::WavePeriod => "Wave Period (s)",
            Variable::SwellHeight => "Swell (m)",
            Variable::SwellDirection => "Swell Direction (deg)",
            Variable::TideHeight => "Tide (m)",
            Variable::WindSpeed => "Wind (km/h)",
            Variable::WindDirection => "Wind Direction (deg)",
            Variable::WindGusts => "Gusts (km/h)",
            Variable::CloudCover => "Cloud Cover (%)",
            Variable::Temperature => "Temp (C)",
            Variable::Precipitation => "Rain (mm)",
            Variable::WeatherCode => "Weather Code",
        }
    }
}

/// One time-indexed row of a forecast series.
///
/// Absent values stay `None`; they are never coerced to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Local time at the forecast location
    pub time: NaiveDateTime,
    pub wave_height: Option<f64>,
    pub wave_period: Option<f64>,
    pub swell_height: Option<f64>,
    pub swell_direction: Option<f64>,
    pub tide_height: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_gusts: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub weather_code: Option<f64>,
}

impl Sample {
    /// Create an empty sample at the given time
    #[must_use]
    pub fn new(time: NaiveDateTime) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    /// Value of a variable; non-finite numbers count as absent
    #[must_use]
    pub fn get(&self, variable: Variable) -> Option<f64> {
        let value = match variable {
            Variable::WaveHeight => self.wave_height,
            Variable::WavePeriod => self.wave_period,
            Variable::SwellHeight => self.swell_height,
            Variable::SwellDirection => self.swell_direction,
            Variable::TideHeight => self.tide_height,
            Variable::WindSpeed => self.wind_speed,
            Variable::WindDirection => self.wind_direction,
            Variable::WindGusts => self.wind_gusts,
            Variable::CloudCover => self.cloud_cover,
            Variable::Temperature => self.temperature,
            Variable::Precipitation => self.precipitation,
            Variable::WeatherCode => self.weather_code,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn set(&mut self, variable: Variable, value: Option<f64>) {
        let slot = match variable {
            Variable::WaveHeight => &mut self.wave_height,
            Variable::WavePeriod => &mut self.wave_period,
            Variable::SwellHeight => &mut self.swell_height,
            Variable::SwellDirection => &mut self.swell_direction,
            Variable::TideHeight => &mut self.tide_height,
            Variable::WindSpeed => &mut self.wind_speed,
            Variable::WindDirection => &mut self.wind_direction,
            Variable::WindGusts => &mut self.wind_gusts,
            Variable::CloudCover => &mut self.cloud_cover,
            Variable::Temperature => &mut self.temperature,
            Variable::Precipitation => &mut self.precipitation,
            Variable::WeatherCode => &mut self.weather_code,
        };
        *slot = value;
    }

    /// Builder style variant of [`Sample::set`]
    #[must_use]
    pub fn with(mut self, variable: Variable, value: f64) -> Self {
        self.set(variable, Some(value));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_get_set_roundtrip_per_variable() {
        let mut sample = Sample::new(noon());
        sample.set(Variable::CloudCover, Some(42.0));
        sample.set(Variable::SwellDirection, Some(225.0));
        assert_eq!(sample.get(Variable::CloudCover), Some(42.0));
        assert_eq!(sample.cloud_cover, Some(42.0));
        assert_eq!(sample.get(Variable::SwellDirection), Some(225.0));
        assert_eq!(sample.get(Variable::WaveHeight), None);
    }

    #[test]
    fn test_non_finite_values_are_absent() {
        let sample = Sample::new(noon()).with(Variable::WaveHeight, f64::NAN);
        assert_eq!(sample.get(Variable::WaveHeight), None);
    }
}
