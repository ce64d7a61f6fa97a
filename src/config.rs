//! Configuration management for the report pipeline
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metrics::surf_rules::{self, SpotRule};
use crate::metrics::{AlertRules, NightWindow};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Forecast API configuration
    pub forecast: ForecastConfig,
    /// Where reports are written
    pub output: OutputConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Surf spot rule tables
    pub surf: SurfConfig,
    /// Night window for the sky report
    pub sky: SkyConfig,
    /// Weather alert thresholds
    pub alerts: AlertRules,
    /// Delivery channels
    pub dispatch: DispatchConfig,
}

/// Forecast API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Base URL for the forecast API
    #[serde(default = "default_forecast_base_url")]
    pub base_url: String,
    /// Base URL for the marine API
    #[serde(default = "default_marine_base_url")]
    pub marine_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Forecast horizon for surf, sky and the weekly weather view
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
    /// Horizon of the hourly weather series
    #[serde(default = "default_weather_hourly_days")]
    pub weather_hourly_days: u32,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory; reports land in `<root>/<location>/`
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfConfig {
    /// Rules for locations without their own table
    #[serde(default = "surf_rules::default_rules")]
    pub default_rules: Vec<SpotRule>,
    /// Rule tables keyed by location name
    #[serde(default = "surf_rules::builtin_spot_rules")]
    pub spot_rules: HashMap<String, Vec<SpotRule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyConfig {
    /// First hour of the viewing night
    #[serde(default = "default_night_start")]
    pub night_start_hour: u32,
    /// Last hour of the viewing night, inclusive
    #[serde(default = "default_night_end")]
    pub night_end_hour: u32,
}

impl SkyConfig {
    #[must_use]
    pub fn night_window(&self) -> NightWindow {
        NightWindow::new(self.night_start_hour, self.night_end_hour)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub telegram: Option<TelegramConfig>,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

// Default value functions
fn default_forecast_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_marine_base_url() -> String {
    "https://marine-api.open-meteo.com/v1".to_string()
}

fn default_timeout() -> u32 {
    15
}

fn default_forecast_days() -> u32 {
    7
}

fn default_weather_hourly_days() -> u32 {
    3
}

fn default_output_root() -> PathBuf {
    PathBuf::from("reports")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_night_start() -> u32 {
    20
}

fn default_night_end() -> u32 {
    4
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: default_forecast_base_url(),
            marine_base_url: default_marine_base_url(),
            timeout_seconds: default_timeout(),
            forecast_days: default_forecast_days(),
            weather_hourly_days: default_weather_hourly_days(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for SurfConfig {
    fn default() -> Self {
        Self {
            default_rules: surf_rules::default_rules(),
            spot_rules: surf_rules::builtin_spot_rules(),
        }
    }
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            night_start_hour: default_night_start(),
            night_end_hour: default_night_end(),
        }
    }
}

impl SentinelConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SENTINEL_FORECAST__TIMEOUT_SECONDS=20 etc.
        builder = builder.add_source(
            Environment::with_prefix("SENTINEL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SentinelConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to deserialize configuration from {}", config_file.display()))?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sentinel").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.forecast.base_url.is_empty() {
            self.forecast.base_url = default_forecast_base_url();
        }
        if self.forecast.marine_base_url.is_empty() {
            self.forecast.marine_base_url = default_marine_base_url();
        }
        if self.forecast.timeout_seconds == 0 {
            self.forecast.timeout_seconds = default_timeout();
        }
        if self.forecast.forecast_days == 0 {
            self.forecast.forecast_days = default_forecast_days();
        }
        if self.forecast.weather_hourly_days == 0 {
            self.forecast.weather_hourly_days = default_weather_hourly_days();
        }
        if self.output.root.as_os_str().is_empty() {
            self.output.root = default_output_root();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.surf.default_rules.is_empty() {
            self.surf.default_rules = surf_rules::default_rules();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_rules()?;
        self.validate_dispatch()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(1..=60).contains(&self.forecast.timeout_seconds) {
            return Err(ConfigError::new("Forecast timeout must be between 1 and 60 seconds").into());
        }

        if !(1..=16).contains(&self.forecast.forecast_days) {
            return Err(ConfigError::new("Forecast days must be between 1 and 16").into());
        }

        if !(1..=16).contains(&self.forecast.weather_hourly_days) {
            return Err(ConfigError::new("Hourly weather days must be between 1 and 16").into());
        }

        if self.sky.night_start_hour > 23 || self.sky.night_end_hour > 23 {
            return Err(ConfigError::new("Night window hours must be between 0 and 23").into());
        }

        if self.alerts.lookahead_hours == 0 || self.alerts.lookahead_hours > 384 {
            return Err(ConfigError::new("Alert look-ahead must be between 1 and 384 hours").into());
        }

        if self.alerts.gust_threshold <= 0.0 {
            return Err(ConfigError::new("Gust threshold must be positive").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::new(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::new(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for url in [&self.forecast.base_url, &self.forecast.marine_base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::new(format!(
                    "Forecast API URL '{url}' must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    fn validate_rules(&self) -> Result<()> {
        let all_rules = self
            .surf
            .default_rules
            .iter()
            .chain(self.surf.spot_rules.values().flatten());
        for rule in all_rules {
            rule.validate().map_err(ConfigError::new)?;
        }
        Ok(())
    }

    fn validate_dispatch(&self) -> Result<()> {
        if let Some(telegram) = &self.dispatch.telegram {
            if telegram.bot_token.trim().is_empty() || telegram.chat_id.trim().is_empty() {
                return Err(ConfigError::new("Telegram bot_token and chat_id cannot be empty").into());
            }
        }

        if let Some(email) = &self.dispatch.email {
            let fields = [
                &email.smtp_host,
                &email.username,
                &email.password,
                &email.from,
                &email.to,
            ];
            if fields.iter().any(|field| field.trim().is_empty()) {
                return Err(ConfigError::new("Email dispatch settings cannot be empty").into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = SentinelConfig::default();
        assert_eq!(config.forecast.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.forecast.timeout_seconds, 15);
        assert_eq!(config.forecast.forecast_days, 7);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.sky.night_window(), NightWindow::new(20, 4));
        assert_eq!(config.alerts.storm_codes, vec![95, 96, 99]);
        assert!(config.dispatch.telegram.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = SentinelConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = SentinelConfig::default();
        config.forecast.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout must be between"));

        let mut config = SentinelConfig::default();
        config.sky.night_start_hour = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_bad_url() {
        let mut config = SentinelConfig::default();
        config.forecast.marine_base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_dispatch_credentials() {
        let mut config = SentinelConfig::default();
        config.dispatch.telegram = Some(TelegramConfig {
            bot_token: String::new(),
            chat_id: "42".to_string(),
            api_base: default_telegram_api_base(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_empty_fields() {
        let mut config = SentinelConfig::default();
        config.forecast.base_url.clear();
        config.forecast.timeout_seconds = 0;
        config.surf.default_rules.clear();
        config.apply_defaults();
        assert_eq!(config.forecast.base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.forecast.timeout_seconds, 15);
        assert_eq!(config.surf.default_rules.len(), 2);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = env::temp_dir().join(format!("sentinel-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(
            &path,
            r#"
[output]
root = "/srv/reports"

[sky]
night_start_hour = 21
night_end_hour = 3

[alerts]
gust_threshold = 50.0

[[surf.default_rules]]
label = "Glassy"
swell_min = 0.5
swell_max = 1.5
"#,
        )
        .unwrap();

        let config = SentinelConfig::load_from_path(Some(path)).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(config.output.root, PathBuf::from("/srv/reports"));
        assert_eq!(config.sky.night_window(), NightWindow::new(21, 3));
        assert_eq!(config.alerts.gust_threshold, 50.0);
        assert_eq!(config.alerts.lookahead_hours, 24);
        assert_eq!(config.surf.default_rules.len(), 1);
        assert_eq!(config.surf.default_rules[0].label, "Glassy");
        assert_eq!(config.forecast.timeout_seconds, 15);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = SentinelConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("sentinel"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
