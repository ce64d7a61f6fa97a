//! Report orchestration
//!
//! [`ReportOrchestrator::generate`] runs one report end to end:
//! fetch, derive, render every chart, compose. Each report kind differs only
//! in its [`ReportProfile`] (charts, header colour, primary variable and
//! legend) and in the metadata rows derived for it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::api::ForecastSource;
use crate::chart::{self, ChartContext, ChartLayout, ChartRenderer, ChartSpec, ChartWindow};
use crate::config::SentinelConfig;
use crate::document::{self, DocumentSpec, MetadataRow};
use crate::error::{InsufficientData, ReportError};
use crate::metrics::{
    ConditionScale, MoonPhase, NightWindow, SpotRule, best_swell_day, best_viewing_night,
    classify_alert, clarity, compass_label, current_reading, match_rule, night_bounds,
    surf_rules,
};
use crate::models::{Forecast, ForecastSeries, Location, ReportKind, Rgb, Variable};

const SURF_BLUE: Rgb = Rgb(0x1f, 0x77, 0xb4);
const SURF_ORANGE: Rgb = Rgb(0xff, 0x7f, 0x0e);
const EXCELLENT_GREEN: Rgb = Rgb(0x00, 0x80, 0x00);
const INDIGO: Rgb = Rgb(0x4b, 0x00, 0x82);
const MIDNIGHT: Rgb = Rgb(0x19, 0x19, 0x70);
const GOLD: Rgb = Rgb(0xff, 0xd7, 0x00);
const SLATE: Rgb = Rgb(0x2f, 0x4f, 0x4f);

/// Fallbacks when a series has no valid current reading at all
const WAVE_FALLBACK: f64 = 0.0;
const CLOUD_FALLBACK: f64 = 50.0;

/// Per-kind report configuration
#[derive(Debug, Clone)]
pub struct ReportProfile {
    pub kind: ReportKind,
    pub header_color: Rgb,
    /// Without a single valid value of this variable there is no report
    pub primary: Variable,
    pub scale: Option<ConditionScale>,
    pub charts: Vec<ChartSpec>,
}

impl ReportProfile {
    #[must_use]
    pub fn for_kind(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Surf => Self {
                kind,
                header_color: SURF_BLUE,
                primary: Variable::WaveHeight,
                scale: Some(ConditionScale::SURF),
                charts: vec![
                    ChartSpec {
                        id: "today",
                        layout: ChartLayout::Profile,
                        window: ChartWindow::Today,
                        variable: Variable::WaveHeight,
                        title: "TODAY'S WAVE CONDITIONS",
                        color: SURF_BLUE,
                        highlight: EXCELLENT_GREEN,
                        size: (1400, 663),
                    },
                    ChartSpec {
                        id: "best-day",
                        layout: ChartLayout::Profile,
                        window: ChartWindow::BestDay,
                        variable: Variable::WaveHeight,
                        title: "BEST SWELL DAY: %A, %B %d",
                        color: SURF_BLUE,
                        highlight: EXCELLENT_GREEN,
                        size: (1400, 663),
                    },
                    ChartSpec {
                        id: "week",
                        layout: ChartLayout::BucketBars,
                        window: ChartWindow::Week,
                        variable: Variable::WaveHeight,
                        title: "7-DAY SWELL FORECAST",
                        color: SURF_BLUE,
                        highlight: SURF_ORANGE,
                        size: (1400, 663),
                    },
                ],
            },
            ReportKind::Sky => Self {
                kind,
                header_color: INDIGO,
                primary: Variable::CloudCover,
                scale: Some(ConditionScale::SKY),
                charts: vec![
                    ChartSpec {
                        id: "tonight",
                        layout: ChartLayout::Profile,
                        window: ChartWindow::Tonight,
                        variable: Variable::CloudCover,
                        title: "TONIGHT: %A, %B %d",
                        color: INDIGO,
                        highlight: GOLD,
                        size: (1400, 490),
                    },
                    ChartSpec {
                        id: "best-night",
                        layout: ChartLayout::Profile,
                        window: ChartWindow::BestNight,
                        variable: Variable::CloudCover,
                        title: "BEST VIEWING NIGHT: %A, %B %d",
                        color: MIDNIGHT,
                        highlight: GOLD,
                        size: (1400, 490),
                    },
                    ChartSpec {
                        id: "week",
                        layout: ChartLayout::BucketBars,
                        window: ChartWindow::Week,
                        variable: Variable::CloudCover,
                        title: "7-NIGHT CLARITY FORECAST",
                        color: INDIGO,
                        highlight: GOLD,
                        size: (1400, 490),
                    },
                ],
            },
            ReportKind::Weather => Self {
                kind,
                header_color: SLATE,
                primary: Variable::Temperature,
                scale: None,
                charts: vec![
                    ChartSpec {
                        id: "daily",
                        layout: ChartLayout::DualAxis,
                        window: ChartWindow::Today,
                        variable: Variable::Temperature,
                        title: "TODAY: %A, %B %d",
                        color: SLATE,
                        highlight: SLATE,
                        size: (1400, 696),
                    },
                    ChartSpec {
                        id: "weekly",
                        layout: ChartLayout::DualAxis,
                        window: ChartWindow::Week,
                        variable: Variable::Temperature,
                        title: "7-DAY OUTLOOK FROM %A, %B %d",
                        color: SLATE,
                        highlight: SLATE,
                        size: (1400, 590),
                    },
                ],
            },
        }
    }

    /// Closing paragraph explaining the chart markings
    #[must_use]
    pub fn legend(&self, night: NightWindow) -> String {
        match self.kind {
            ReportKind::Surf => "Green X = Excellent (>2.0m) | Red X = Weekly Peak | \
                 Blue X = spot rule match, labelled with the rule name. \
                 The orange bar marks the best swell day."
                .to_string(),
            ReportKind::Sky => format!(
                "Gold stars indicate cloud cover <15% (clear sky). Clarity is 100% minus \
                 cloud cover, averaged over night hours ({:02}:00-{:02}:00). \
                 The gold bar marks the best viewing night.",
                night.start_hour, night.end_hour
            ),
            ReportKind::Weather => "C = Current, F = Forecast. Red labels mark wind from the \
                 fire danger sector and the shaded band covers hours with fire risk. \
                 STORM and FIRE flag days in the weekly outlook."
                .to_string(),
        }
    }
}

/// A successfully written report
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub location: Location,
    pub kind: ReportKind,
    pub path: PathBuf,
    pub metadata: Vec<MetadataRow>,
    pub charts_embedded: usize,
    /// Ids of charts left out because they could not be drawn
    pub charts_omitted: Vec<String>,
    pub pages: usize,
}

impl GeneratedReport {
    /// Value of a metadata row by label
    #[must_use]
    pub fn row(&self, label: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.value.as_str())
    }
}

/// `<root>/<location>/<Kind>_Report_<location>_<YYYY-MM-DD_HHMM>.pdf`
#[must_use]
pub fn report_path(
    root: &Path,
    location: &Location,
    kind: ReportKind,
    generated: NaiveDateTime,
) -> PathBuf {
    let stem = location.file_stem();
    root.join(&stem).join(format!(
        "{}_Report_{}_{}.pdf",
        kind.file_prefix(),
        stem,
        generated.format("%Y-%m-%d_%H%M")
    ))
}

/// Runs the report pipeline against a forecast source and chart renderer
pub struct ReportOrchestrator<S, R> {
    config: SentinelConfig,
    source: S,
    renderer: R,
}

impl<S: ForecastSource, R: ChartRenderer> ReportOrchestrator<S, R> {
    #[must_use]
    pub fn new(config: SentinelConfig, source: S, renderer: R) -> Self {
        Self {
            config,
            source,
            renderer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Generate one report. `now` is the generation instant; it decides the
    /// "today" and "tonight" windows and the file name.
    #[instrument(skip_all, fields(location = %location.name, kind = %kind))]
    pub fn generate(
        &self,
        location: &Location,
        kind: ReportKind,
        now: DateTime<Utc>,
    ) -> Result<GeneratedReport, ReportError> {
        let forecast = self.source.fetch(location, kind).map_err(|e| {
            error!("Fetch failed: {}", e);
            ReportError::data_unavailable(&location.name, kind, e)
        })?;

        let profile = ReportProfile::for_kind(kind);
        let hourly = &forecast.hourly;
        if !hourly.has_valid(profile.primary) {
            error!("No valid {} samples", profile.primary.label());
            return Err(ReportError::data_unavailable(
                &location.name,
                kind,
                InsufficientData::new(primary_metric(profile.primary)),
            ));
        }

        let local_now = hourly.local_time(now);
        info!(
            "Deriving metrics from {} samples (local time {})",
            hourly.len(),
            local_now.format("%Y-%m-%d %H:%M")
        );

        let night_window = self.config.sky.night_window();
        let spot_rules = surf_rules::rules_for(
            &self.config.surf.spot_rules,
            &self.config.surf.default_rules,
            &location.name,
        );

        let mut best_day = None;
        let mut best_night = None;
        let mut rows = match kind {
            ReportKind::Surf => {
                let best = best_swell_day(hourly)
                    .inspect_err(|e| warn!("{}", e))
                    .ok();
                best_day = best.as_ref().map(|b| b.date);
                surf_rows(location, hourly, best.map(|b| (b.date, b.mean)), spot_rules)
            }
            ReportKind::Sky => {
                let best = best_viewing_night(hourly, night_window, local_now.date())
                    .inspect_err(|e| warn!("{}", e))
                    .ok();
                best_night = best.as_ref().map(|b| b.date);
                sky_rows(location, hourly, local_now, best.map(|b| (b.date, b.clarity)))
            }
            ReportKind::Weather => self.weather_rows(location, &forecast, local_now),
        };
        rows.push(MetadataRow::new(
            "GENERATED",
            local_now.format("%Y-%m-%d %H:%M").to_string(),
        ));

        let ctx = ChartContext {
            forecast: &forecast,
            now: local_now,
            best_day,
            best_night,
            night_window,
            spot_rules,
            alert_rules: &self.config.alerts,
            scale: profile.scale,
        };
        info!("Rendering {} charts", profile.charts.len());
        let (charts, omitted) = chart::render_all(&profile.charts, &ctx, &self.renderer);

        let path = report_path(&self.config.output.root, location, kind, local_now);
        let spec = DocumentSpec {
            title: format!("{} {} Report", location.name, kind),
            header_color: profile.header_color,
            rows: rows.clone(),
            charts,
            narrative: profile.legend(night_window),
        };

        info!("Composing {}", path.display());
        let written = document::compose(&spec, &path).map_err(|e| {
            error!("Writing report failed: {}", e);
            ReportError::write_failed(&location.name, kind, e)
        })?;

        Ok(GeneratedReport {
            location: location.clone(),
            kind,
            path: written.path,
            metadata: rows,
            charts_embedded: written.charts_embedded,
            charts_omitted: omitted.into_iter().map(|(id, _)| id.to_string()).collect(),
            pages: written.pages,
        })
    }

    fn weather_rows(
        &self,
        location: &Location,
        forecast: &Forecast,
        local_now: NaiveDateTime,
    ) -> Vec<MetadataRow> {
        let hourly = &forecast.hourly;
        let status = match classify_alert(hourly, local_now, &self.config.alerts) {
            Ok(level) => MetadataRow::new(
                "STATUS",
                format!("{} - {}", level.label(), location.name.to_uppercase()),
            )
            .highlighted(level.color()),
            Err(e) => {
                warn!("{}", e);
                MetadataRow::new(
                    "STATUS",
                    format!("NO DATA - {}", location.name.to_uppercase()),
                )
            }
        };

        let temperature = reading_at(hourly, Variable::Temperature, local_now);
        let wind = reading_at(hourly, Variable::WindSpeed, local_now);
        let direction = reading_at(hourly, Variable::WindDirection, local_now)
            .and_then(compass_label);

        let mut rows = vec![
            status,
            MetadataRow::new("LOCATION", location.name.clone()),
            MetadataRow::new("COORDINATES", location.format_coordinates()),
            MetadataRow::new(
                "TEMPERATURE",
                temperature.map_or_else(|| "No data available".to_string(), |t| format!("{t:.0}C")),
            ),
            MetadataRow::new(
                "WIND",
                match (wind, direction) {
                    (Some(speed), Some(dir)) => format!("{speed:.0} km/h {dir}"),
                    (Some(speed), None) => format!("{speed:.0} km/h"),
                    _ => "No data available".to_string(),
                },
            ),
        ];

        if let Some(daily) = &forecast.daily {
            let storm_days = daily
                .values(Variable::WeatherCode)
                .filter(|(_, code)| self.config.alerts.is_storm_code(*code))
                .count();
            rows.push(MetadataRow::new("STORM DAYS", storm_days.to_string()));
        }
        rows
    }
}

fn primary_metric(variable: Variable) -> &'static str {
    match variable {
        Variable::WaveHeight => "wave height",
        Variable::CloudCover => "cloud cover",
        Variable::Temperature => "temperature",
        _ => "primary variable",
    }
}

/// Last valid value at or before `now`
fn reading_at(series: &ForecastSeries, variable: Variable, now: NaiveDateTime) -> Option<f64> {
    series
        .values(variable)
        .take_while(|(time, _)| *time <= now)
        .last()
        .map(|(_, value)| value)
}

fn surf_rows(
    location: &Location,
    hourly: &ForecastSeries,
    best: Option<(NaiveDate, f64)>,
    rules: &[SpotRule],
) -> Vec<MetadataRow> {
    let wave = current_reading(hourly, Variable::WaveHeight, WAVE_FALLBACK);
    vec![
        MetadataRow::new("LOCATION", location.name.clone()),
        MetadataRow::new("COORDINATES", location.format_coordinates()),
        MetadataRow::new(
            "CURRENT WAVE",
            format!("{wave:.1}m - {}", ConditionScale::SURF.classify(wave)),
        ),
        MetadataRow::new(
            "BEST SWELL DAY",
            best.map_or_else(
                || "No data available".to_string(),
                |(date, mean)| format!("{} ({mean:.1}m average)", date.format("%A, %B %d")),
            ),
        ),
        MetadataRow::new("PEAK WINDOWS", peak_window_summary(hourly, rules)),
    ]
}

/// Matched hours per rule label, in rule order
#[must_use]
pub fn peak_window_summary(series: &ForecastSeries, rules: &[SpotRule]) -> String {
    let counts: Vec<(&str, usize)> = rules
        .iter()
        .map(|rule| {
            let hours = series
                .samples()
                .iter()
                .filter(|sample| {
                    match_rule(rules, sample).is_some_and(|matched| matched.label == rule.label)
                })
                .count();
            (rule.label.as_str(), hours)
        })
        .filter(|(_, hours)| *hours > 0)
        .collect();

    if counts.is_empty() {
        "None forecast".to_string()
    } else {
        counts
            .iter()
            .map(|(label, hours)| format!("{label}: {hours}h"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn sky_rows(
    location: &Location,
    hourly: &ForecastSeries,
    local_now: NaiveDateTime,
    best: Option<(NaiveDate, f64)>,
) -> Vec<MetadataRow> {
    let cloud = current_reading(hourly, Variable::CloudCover, CLOUD_FALLBACK);
    let phase = MoonPhase::for_date(local_now.date());

    let sun = night_bounds(location, local_now.date()).map_or_else(
        || "No data available".to_string(),
        |(sunset, sunrise)| {
            format!(
                "{} / {}",
                hourly.local_time(sunset).format("%H:%M"),
                hourly.local_time(sunrise).format("%H:%M")
            )
        },
    );

    vec![
        MetadataRow::new("LOCATION", location.name.clone()),
        MetadataRow::new("COORDINATES", location.format_coordinates()),
        MetadataRow::new("MOON PHASE", phase.name()),
        MetadataRow::new(
            "CURRENT CONDITION",
            format!("{} ({cloud:.0}% cloud)", ConditionScale::SKY.classify(cloud)),
        ),
        MetadataRow::new("CURRENT CLARITY", format!("{:.0}%", clarity(cloud))),
        MetadataRow::new(
            "BEST VIEWING NIGHT",
            best.map_or_else(
                || "No data available".to_string(),
                |(date, clarity)| {
                    format!("{} ({clarity:.0}% clarity)", date.format("%A, %B %d"))
                },
            ),
        ),
        MetadataRow::new("SUNSET / SUNRISE", sun),
    ]
}
