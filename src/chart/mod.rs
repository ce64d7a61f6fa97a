//! Chart planning and rendering
//!
//! Charting is split in two steps. [`plan`] is a pure function turning a
//! [`ChartSpec`] plus the forecast and derived metrics into [`ChartData`]:
//! the points, bars, markers and reference lines to draw. A
//! [`ChartRenderer`] then rasterises that data. Keeping the first step pure
//! lets the highlight and "now" logic be tested without pixels.

pub mod plotters_renderer;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use image::RgbImage;
use tracing::{debug, warn};

use crate::error::ChartRenderError;
use crate::metrics::surf_rules::{self, SpotRule};
use crate::metrics::{
    AlertRules, Bucketing, ConditionScale, NightWindow, bucket_stats, clarity, compass_label,
};
use crate::models::{Forecast, ForecastSeries, Granularity, Rgb, Variable};

pub use plotters_renderer::PlottersRenderer;

/// Chart shapes the renderer knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartLayout {
    /// One hourly line over a single day or night
    Profile,
    /// One bar per day or night bucket
    BucketBars,
    /// Temperature against wind on two y axes with a rain panel
    DualAxis,
}

/// The part of the forecast a chart covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartWindow {
    Today,
    BestDay,
    Tonight,
    BestNight,
    Week,
}

/// Static description of one chart in a report
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub id: &'static str,
    pub layout: ChartLayout,
    pub window: ChartWindow,
    /// Primary variable plotted
    pub variable: Variable,
    /// Title; `%` sequences are formatted with the window's date
    pub title: &'static str,
    pub color: Rgb,
    /// Colour of highlighted points or the best bucket
    pub highlight: Rgb,
    /// Pixel size
    pub size: (u32, u32),
}

/// Everything chart planning may look at
#[derive(Debug, Clone)]
pub struct ChartContext<'a> {
    pub forecast: &'a Forecast,
    /// Local time at the forecast location
    pub now: NaiveDateTime,
    pub best_day: Option<NaiveDate>,
    pub best_night: Option<NaiveDate>,
    pub night_window: NightWindow,
    pub spot_rules: &'a [SpotRule],
    pub alert_rules: &'a AlertRules,
    /// Scale whose top label earns a highlight marker
    pub scale: Option<ConditionScale>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Cross,
    Star,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub time: NaiveDateTime,
    pub value: f64,
    pub shape: MarkerShape,
    pub color: Rgb,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub label: String,
    pub color: Rgb,
    pub width: u32,
    pub points: Vec<(NaiveDateTime, f64)>,
}

/// Text placed at a data coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub time: NaiveDateTime,
    pub value: f64,
    pub text: String,
    pub color: Rgb,
}

/// How the x axis of a time chart is labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAxis {
    Hours,
    Days,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChart {
    pub title: String,
    pub y_label: String,
    pub span: (NaiveDateTime, NaiveDateTime),
    pub y_range: (f64, f64),
    pub line: Line,
    pub markers: Vec<Marker>,
    pub now: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub annotation: String,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub y_label: String,
    pub y_max: f64,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DualAxisChart {
    pub title: String,
    pub span: (NaiveDateTime, NaiveDateTime),
    pub axis: TimeAxis,
    /// Left axis series (temperature)
    pub primary: Line,
    /// Right axis series (wind, gusts)
    pub secondary: Vec<Line>,
    pub primary_label: String,
    pub secondary_label: String,
    /// Lower panel bars (precipitation)
    pub rain: Vec<(NaiveDateTime, f64)>,
    pub annotations: Vec<Annotation>,
    /// Time ranges shaded in the highlight colour
    pub shading: Vec<(NaiveDateTime, NaiveDateTime)>,
    pub shading_color: Rgb,
    pub now: Option<NaiveDateTime>,
}

/// Planned content of one chart
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Profile(ProfileChart),
    Bars(BarChart),
    DualAxis(DualAxisChart),
}

/// Rasterises planned chart data
pub trait ChartRenderer {
    fn render(&self, spec: &ChartSpec, data: &ChartData) -> Result<RgbImage, ChartRenderError>;
}

/// A rendered chart ready for embedding
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub id: &'static str,
    pub caption: String,
    pub image: RgbImage,
}

const WEEKLY_PEAK: Rgb = Rgb(214, 39, 40);
const RULE_MATCH: Rgb = Rgb(31, 119, 180);
const NOW_LINE: Rgb = Rgb(220, 0, 0);
const TEMPERATURE: Rgb = Rgb(214, 39, 40);
const WIND: Rgb = Rgb(44, 160, 44);
const GUSTS: Rgb = Rgb(152, 223, 138);
const FIRE: Rgb = Rgb(255, 140, 0);
const STORM: Rgb = Rgb(128, 0, 128);
/// Vertical gap (in degrees) between labels stacked on one day
const LABEL_STACK: f64 = 1.5;

/// Plan the content of one chart
pub fn plan(spec: &ChartSpec, ctx: &ChartContext<'_>) -> Result<ChartData, ChartRenderError> {
    match spec.layout {
        ChartLayout::Profile => plan_profile(spec, ctx).map(ChartData::Profile),
        ChartLayout::BucketBars => plan_bars(spec, ctx).map(ChartData::Bars),
        ChartLayout::DualAxis => plan_dual_axis(spec, ctx).map(ChartData::DualAxis),
    }
}

fn no_data(spec: &ChartSpec) -> ChartRenderError {
    ChartRenderError::NoData {
        chart: spec.id.to_string(),
    }
}

fn day_span(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(chrono::NaiveTime::MIN);
    (start, start + Duration::hours(23))
}

/// Date and span a profile window covers
fn profile_window(
    spec: &ChartSpec,
    ctx: &ChartContext<'_>,
) -> Result<(NaiveDate, (NaiveDateTime, NaiveDateTime)), ChartRenderError> {
    let today = ctx.now.date();
    match spec.window {
        ChartWindow::Today => Ok((today, day_span(today))),
        ChartWindow::BestDay => ctx
            .best_day
            .map(|date| (date, day_span(date)))
            .ok_or_else(|| no_data(spec)),
        ChartWindow::Tonight => {
            let night = ctx.night_window.night_of(ctx.now).unwrap_or(today);
            Ok((night, ctx.night_window.span(night)))
        }
        ChartWindow::BestNight => ctx
            .best_night
            .map(|date| (date, ctx.night_window.span(date)))
            .ok_or_else(|| no_data(spec)),
        ChartWindow::Week => {
            let series = &ctx.forecast.hourly;
            match (series.first_time(), series.last_time()) {
                (Some(first), Some(last)) => Ok((first.date(), (first, last))),
                _ => Err(no_data(spec)),
            }
        }
    }
}

fn within(now: NaiveDateTime, span: (NaiveDateTime, NaiveDateTime)) -> Option<NaiveDateTime> {
    (now >= span.0 && now <= span.1).then_some(now)
}

fn plan_profile(spec: &ChartSpec, ctx: &ChartContext<'_>) -> Result<ProfileChart, ChartRenderError> {
    let series = &ctx.forecast.hourly;
    let (date, span) = profile_window(spec, ctx)?;

    let points: Vec<(NaiveDateTime, f64)> = series
        .between(span.0, span.1)
        .filter_map(|s| s.get(spec.variable).map(|v| (s.time, v)))
        .collect();
    if points.is_empty() {
        return Err(no_data(spec));
    }

    let shape = if spec.variable == Variable::CloudCover {
        MarkerShape::Star
    } else {
        MarkerShape::Cross
    };

    let mut markers: Vec<Marker> = ctx
        .scale
        .map(|scale| {
            points
                .iter()
                .filter(|(_, v)| scale.is_top(*v))
                .map(|(time, value)| Marker {
                    time: *time,
                    value: *value,
                    shape,
                    color: spec.highlight,
                    label: None,
                })
                .collect()
        })
        .unwrap_or_default();

    if spec.variable == Variable::WaveHeight {
        // weekly peak
        let peak = series
            .values(spec.variable)
            .fold(None::<(NaiveDateTime, f64)>, |best, (t, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((t, v)),
            });
        if let Some((time, value)) = peak.filter(|(t, _)| within(*t, span).is_some()) {
            markers.push(Marker {
                time,
                value,
                shape: MarkerShape::Cross,
                color: WEEKLY_PEAK,
                label: Some("Weekly Peak".to_string()),
            });
        }

        for matched in surf_rules::matches_on(series, ctx.spot_rules, date) {
            if let Some((_, value)) = points.iter().find(|(t, _)| *t == matched.time) {
                markers.push(Marker {
                    time: matched.time,
                    value: *value,
                    shape: MarkerShape::Cross,
                    color: RULE_MATCH,
                    label: Some(matched.label),
                });
            }
        }
    }

    let y_range = if spec.variable == Variable::CloudCover {
        (0.0, 100.0)
    } else {
        let max = points.iter().map(|(_, v)| *v).fold(0.0, f64::max);
        (0.0, (max * 1.2).max(3.0))
    };

    debug!("Planned profile '{}' with {} points", spec.id, points.len());
    Ok(ProfileChart {
        title: date.format(spec.title).to_string(),
        y_label: spec.variable.label().to_string(),
        span,
        y_range,
        line: Line {
            label: spec.variable.label().to_string(),
            color: spec.color,
            width: 3,
            points,
        },
        markers,
        now: within(ctx.now, span),
    })
}

/// Bars over buckets. Cloud cover is shown as nightly clarity with the best
/// night highlighted; other variables as the daily maximum with the best
/// day highlighted.
fn plan_bars(spec: &ChartSpec, ctx: &ChartContext<'_>) -> Result<BarChart, ChartRenderError> {
    let series = &ctx.forecast.hourly;
    let sky = spec.variable == Variable::CloudCover;
    let bucketing = if sky {
        Bucketing::Night(ctx.night_window)
    } else {
        Bucketing::Daily
    };

    let buckets = bucket_stats(series, spec.variable, bucketing);
    if buckets.is_empty() {
        return Err(no_data(spec));
    }

    let best = if sky { ctx.best_night } else { ctx.best_day };
    let bars: Vec<Bar> = buckets
        .iter()
        .map(|bucket| {
            let (value, annotation) = if sky {
                let c = clarity(bucket.mean);
                (c, format!("{c:.0}%"))
            } else {
                (bucket.max, format!("{:.1}m", bucket.max))
            };
            Bar {
                label: bucket.date.format("%a %d").to_string(),
                value,
                annotation,
                color: if Some(bucket.date) == best {
                    spec.highlight
                } else {
                    spec.color
                },
            }
        })
        .collect();

    let y_max = if sky {
        100.0
    } else {
        let max = bars.iter().map(|b| b.value).fold(0.0, f64::max);
        (max * 1.25).max(1.0)
    };

    Ok(BarChart {
        title: spec.title.to_string(),
        y_label: if sky {
            "Clarity (%)".to_string()
        } else {
            spec.variable.label().to_string()
        },
        y_max,
        bars,
    })
}

fn plan_dual_axis(
    spec: &ChartSpec,
    ctx: &ChartContext<'_>,
) -> Result<DualAxisChart, ChartRenderError> {
    let (series, span, axis, date): (&ForecastSeries, _, _, _) = match spec.window {
        ChartWindow::Week => {
            let daily = ctx.forecast.daily.as_ref().ok_or_else(|| no_data(spec))?;
            let (Some(first), Some(last)) = (daily.first_time(), daily.last_time()) else {
                return Err(no_data(spec));
            };
            (
                daily,
                (first, last + Duration::hours(23)),
                TimeAxis::Days,
                first.date(),
            )
        }
        _ => {
            let today = ctx.now.date();
            (&ctx.forecast.hourly, day_span(today), TimeAxis::Hours, today)
        }
    };

    let samples: Vec<_> = series.between(span.0, span.1).collect();
    let line_of = |variable: Variable| -> Vec<(NaiveDateTime, f64)> {
        samples
            .iter()
            .filter_map(|s| s.get(variable).map(|v| (s.time, v)))
            .collect()
    };

    let temperature = line_of(Variable::Temperature);
    if temperature.is_empty() {
        return Err(no_data(spec));
    }

    let rules = ctx.alert_rules;
    let mut annotations = Vec::new();
    let mut shading = Vec::new();

    match series.granularity() {
        Granularity::Hourly => {
            for sample in samples.iter().filter(|s| s.time.hour() % 3 == 0) {
                let (Some(temp), Some(direction)) = (
                    sample.get(Variable::Temperature),
                    sample.get(Variable::WindDirection),
                ) else {
                    continue;
                };
                let suffix = if sample.time < ctx.now { "C" } else { "F" };
                annotations.push(Annotation {
                    time: sample.time,
                    value: temp,
                    text: format!(
                        "{temp:.0}C {} ({suffix})",
                        compass_label(direction).unwrap_or("-")
                    ),
                    color: if rules.fire_arc.contains(direction) {
                        TEMPERATURE
                    } else {
                        Rgb::BLACK
                    },
                });
            }

            let fire_times: Vec<NaiveDateTime> = samples
                .iter()
                .filter(|s| {
                    rules.is_fire_sample(
                        s.get(Variable::Temperature),
                        s.get(Variable::WindDirection),
                    )
                })
                .map(|s| s.time)
                .collect();
            if let (Some(first), Some(last)) = (fire_times.first(), fire_times.last()) {
                shading.push((*first, *last));
            }
        }
        Granularity::Daily => {
            for sample in &samples {
                let Some(temp) = sample.get(Variable::Temperature) else {
                    continue;
                };
                let mut height = temp;
                if sample
                    .get(Variable::WeatherCode)
                    .is_some_and(|code| rules.is_storm_code(code))
                {
                    annotations.push(Annotation {
                        time: sample.time,
                        value: height,
                        text: "STORM".to_string(),
                        color: STORM,
                    });
                    height += LABEL_STACK;
                }
                if rules.is_fire_sample(Some(temp), sample.get(Variable::WindDirection)) {
                    annotations.push(Annotation {
                        time: sample.time,
                        value: height,
                        text: "FIRE".to_string(),
                        color: FIRE,
                    });
                }
            }
        }
    }

    Ok(DualAxisChart {
        title: date.format(spec.title).to_string(),
        span,
        axis,
        primary: Line {
            label: Variable::Temperature.label().to_string(),
            color: TEMPERATURE,
            width: 3,
            points: temperature,
        },
        secondary: vec![
            Line {
                label: Variable::WindSpeed.label().to_string(),
                color: WIND,
                width: 2,
                points: line_of(Variable::WindSpeed),
            },
            Line {
                label: Variable::WindGusts.label().to_string(),
                color: GUSTS,
                width: 1,
                points: line_of(Variable::WindGusts),
            },
        ],
        primary_label: Variable::Temperature.label().to_string(),
        secondary_label: Variable::WindSpeed.label().to_string(),
        rain: line_of(Variable::Precipitation),
        annotations,
        shading,
        shading_color: FIRE,
        now: within(ctx.now, span),
    })
}

/// Plan and render every chart in order.
///
/// A chart that cannot be planned or drawn is logged and left out; the
/// others are still returned.
pub fn render_all<R: ChartRenderer + ?Sized>(
    specs: &[ChartSpec],
    ctx: &ChartContext<'_>,
    renderer: &R,
) -> (Vec<ChartArtifact>, Vec<(&'static str, ChartRenderError)>) {
    let mut artifacts = Vec::with_capacity(specs.len());
    let mut omitted = Vec::new();

    for spec in specs {
        let result = plan(spec, ctx).and_then(|data| {
            let caption = match &data {
                ChartData::Profile(c) => c.title.clone(),
                ChartData::Bars(c) => c.title.clone(),
                ChartData::DualAxis(c) => c.title.clone(),
            };
            renderer
                .render(spec, &data)
                .map(|image| ChartArtifact {
                    id: spec.id,
                    caption,
                    image,
                })
        });

        match result {
            Ok(artifact) => artifacts.push(artifact),
            Err(e) => {
                warn!("Omitting chart '{}': {}", spec.id, e);
                omitted.push((spec.id, e));
            }
        }
    }

    (artifacts, omitted)
}
