//! Raster chart backend built on `plotters`
//!
//! Charts are drawn into an in-memory RGB buffer; nothing touches disk.
//! Time axes are plotted as hours since the start of the chart span and
//! labelled back into clock or calendar text.

use std::error::Error;

use chrono::{Duration, NaiveDateTime};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use super::{
    BarChart, ChartData, ChartRenderer, ChartSpec, DualAxisChart, MarkerShape, ProfileChart,
    TimeAxis,
};
use crate::error::ChartRenderError;
use crate::models::Rgb;

type DrawResult = Result<(), Box<dyn Error>>;
type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const FONT: &str = "sans-serif";

/// Draws [`ChartData`] with plotters' bitmap backend
#[derive(Debug, Clone, Default)]
pub struct PlottersRenderer;

impl PlottersRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, spec: &ChartSpec, data: &ChartData) -> Result<RgbImage, ChartRenderError> {
        let (width, height) = spec.size;
        if width == 0 || height == 0 {
            return Err(ChartRenderError::Encoding {
                chart: spec.id.to_string(),
            });
        }
        let mut buffer = vec![0u8; width as usize * height as usize * 3];

        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            let drawn = match data {
                ChartData::Profile(chart) => draw_profile(&root, chart),
                ChartData::Bars(chart) => draw_bars(&root, chart),
                ChartData::DualAxis(chart) => draw_dual_axis(&root, chart),
            }
            .and_then(|()| root.present().map_err(Into::into));

            drawn.map_err(|e| ChartRenderError::Drawing {
                chart: spec.id.to_string(),
                message: e.to_string(),
            })?;
        }

        RgbImage::from_raw(width, height, buffer).ok_or_else(|| ChartRenderError::Encoding {
            chart: spec.id.to_string(),
        })
    }
}

fn color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

fn hours_since(origin: NaiveDateTime, time: NaiveDateTime) -> f64 {
    (time - origin).num_seconds() as f64 / 3600.0
}

fn time_label(origin: NaiveDateTime, hours: f64, axis: TimeAxis) -> String {
    let time = origin + Duration::seconds((hours * 3600.0).round() as i64);
    match axis {
        TimeAxis::Hours => time.format("%H:%M").to_string(),
        TimeAxis::Days => time.format("%a %d").to_string(),
    }
}

fn x_extent(span: (NaiveDateTime, NaiveDateTime)) -> std::ops::Range<f64> {
    let end = hours_since(span.0, span.1).max(1.0);
    0.0..end
}

/// Five-pointed star around the origin, tip up, in pixel offsets
fn star_points(outer: i32, inner: i32) -> Vec<(i32, i32)> {
    (0..10)
        .map(|i| {
            let radius = f64::from(if i % 2 == 0 { outer } else { inner });
            let angle = std::f64::consts::PI * (f64::from(i) / 5.0 - 0.5);
            (
                (radius * angle.cos()).round() as i32,
                (radius * angle.sin()).round() as i32,
            )
        })
        .collect()
}

fn draw_now_line<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    x: f64,
    y_range: (f64, f64),
    label: String,
) -> DrawResult {
    let style = color(super::NOW_LINE).stroke_width(2);
    chart
        .draw_series(LineSeries::new(vec![(x, y_range.0), (x, y_range.1)], style))
        .map_err(|e| e.to_string())?;
    chart
        .draw_series(std::iter::once(Text::new(
            label,
            (x, y_range.1),
            (FONT, 14).into_font().color(&color(super::NOW_LINE)),
        )))
        .map_err(|e| e.to_string())?;
    Ok(())
}

fn draw_profile(root: &Area<'_>, data: &ProfileChart) -> DrawResult {
    root.fill(&WHITE)?;
    let origin = data.span.0;
    let x_range = x_extent(data.span);

    let mut chart = ChartBuilder::on(root)
        .caption(&data.title, (FONT, 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, data.y_range.0..data.y_range.1)?;

    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|x| time_label(origin, *x, TimeAxis::Hours))
        .y_desc(data.y_label.as_str())
        .draw()?;

    let line_color = color(data.line.color);
    chart
        .draw_series(LineSeries::new(
            data.line
                .points
                .iter()
                .map(|(t, v)| (hours_since(origin, *t), *v)),
            line_color.stroke_width(data.line.width),
        ))?
        .label(data.line.label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_color));

    for marker in &data.markers {
        let point = (hours_since(origin, marker.time), marker.value);
        let style = color(marker.color).stroke_width(3);
        match marker.shape {
            MarkerShape::Cross => {
                chart.draw_series(std::iter::once(Cross::new(point, 8, style)))?;
            }
            MarkerShape::Star => {
                chart.draw_series(std::iter::once(
                    EmptyElement::at(point)
                        + Polygon::new(star_points(9, 4), color(marker.color).filled()),
                ))?;
            }
        }
        if let Some(label) = &marker.label {
            chart.draw_series(std::iter::once(Text::new(
                label.clone(),
                point,
                (FONT, 13).into_font().color(&color(marker.color)),
            )))?;
        }
    }

    if let Some(now) = data.now {
        let x = hours_since(origin, now);
        draw_now_line(&mut chart, x, data.y_range, now.format("%H:%M").to_string())?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

fn draw_bars(root: &Area<'_>, data: &BarChart) -> DrawResult {
    root.fill(&WHITE)?;
    let count = data.bars.len().max(1) as u32;

    let mut chart = ChartBuilder::on(root)
        .caption(&data.title, (FONT, 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..count).into_segmented(), 0.0..data.y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(data.bars.len() + 1)
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => data
                .bars
                .get(*i as usize)
                .map(|bar| bar.label.clone())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .y_desc(data.y_label.as_str())
        .draw()?;

    chart.draw_series(data.bars.iter().zip(0u32..).map(|(bar, i)| {
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), bar.value),
            ],
            color(bar.color).filled(),
        );
        rect.set_margin(0, 0, 12, 12);
        rect
    }))?;

    chart.draw_series(data.bars.iter().zip(0u32..).map(|(bar, i)| {
        Text::new(
            bar.annotation.clone(),
            (SegmentValue::CenterOf(i), bar.value + data.y_max * 0.02),
            (FONT, 15).into_font().color(&BLACK),
        )
    }))?;

    Ok(())
}

fn draw_dual_axis(root: &Area<'_>, data: &DualAxisChart) -> DrawResult {
    root.fill(&WHITE)?;
    let origin = data.span.0;
    let axis = data.axis;
    let x_range = x_extent(data.span);
    let height = root.dim_in_pixel().1;
    let (upper, lower) = root.split_vertically((height as f64 * 0.72) as u32);

    let temps = data.primary.points.iter().map(|(_, v)| *v);
    let t_min = temps.clone().fold(f64::INFINITY, f64::min);
    let t_max = temps.fold(f64::NEG_INFINITY, f64::max);
    let t_range = (t_min - 3.0).floor()..(t_max + 3.0).ceil();
    let wind_max = data
        .secondary
        .iter()
        .flat_map(|line| line.points.iter().map(|(_, v)| *v))
        .fold(10.0, f64::max);

    let mut chart = ChartBuilder::on(&upper)
        .caption(&data.title, (FONT, 28).into_font())
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), t_range.clone())?
        .set_secondary_coord(x_range.clone(), 0.0..wind_max * 1.2);

    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|x| time_label(origin, *x, axis))
        .y_desc(data.primary_label.as_str())
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc(data.secondary_label.as_str())
        .draw()?;

    let shade = color(data.shading_color).mix(0.15).filled();
    chart.draw_series(data.shading.iter().map(|(from, to)| {
        Rectangle::new(
            [
                (hours_since(origin, *from), t_range.start),
                (hours_since(origin, *to), t_range.end),
            ],
            shade,
        )
    }))?;

    let primary_color = color(data.primary.color);
    chart
        .draw_series(LineSeries::new(
            data.primary
                .points
                .iter()
                .map(|(t, v)| (hours_since(origin, *t), *v)),
            primary_color.stroke_width(data.primary.width),
        ))?
        .label(data.primary.label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], primary_color));

    for line in &data.secondary {
        let line_color = color(line.color);
        chart
            .draw_secondary_series(LineSeries::new(
                line.points.iter().map(|(t, v)| (hours_since(origin, *t), *v)),
                line_color.stroke_width(line.width),
            ))?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_color));
    }

    chart.draw_series(data.annotations.iter().map(|a| {
        Text::new(
            a.text.clone(),
            (hours_since(origin, a.time), a.value + 0.8),
            (FONT, 13).into_font().color(&color(a.color)),
        )
    }))?;

    if let Some(now) = data.now {
        let x = hours_since(origin, now);
        draw_now_line(
            &mut chart,
            x,
            (t_range.start, t_range.end),
            now.format("%H:%M").to_string(),
        )?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    let rain_max = data.rain.iter().map(|(_, v)| *v).fold(1.0, f64::max);
    let mut rain_chart = ChartBuilder::on(&lower)
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(x_range, 0.0..rain_max * 1.2)?;
    rain_chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|x| time_label(origin, *x, axis))
        .y_desc("Rain (mm)")
        .draw()?;

    let bar_width = match axis {
        TimeAxis::Hours => 0.4,
        TimeAxis::Days => 4.0,
    };
    let rain_color = RGBColor(31, 119, 180).filled();
    rain_chart.draw_series(data.rain.iter().filter(|(_, v)| *v > 0.0).map(|(t, v)| {
        let x = hours_since(origin, *t);
        Rectangle::new([(x - bar_width, 0.0), (x + bar_width, *v)], rain_color)
    }))?;

    Ok(())
}
