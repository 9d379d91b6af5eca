use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use ridetrace_parser::TimeSeries;
use serde::Serialize;
use tracing::info;

use crate::error::RenderError;

pub const DEFAULT_WIDTH_PX: u32 = 800;
pub const DEFAULT_HEIGHT_PX: u32 = 400;
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";
pub const CHART_EXTENSION: &str = "png";

/// Family every chart label is drawn in, backed by the bundled DejaVu Sans.
pub const CHART_FONT_FAMILY: &str = "sans-serif";
static CHART_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_REGISTRATION: OnceLock<bool> = OnceLock::new();

/// Makes the bundled font available to plotters. Safe to call repeatedly.
pub fn ensure_chart_font() -> Result<(), RenderError> {
    let registered = *FONT_REGISTRATION
        .get_or_init(|| register_font(CHART_FONT_FAMILY, FontStyle::Normal, CHART_FONT).is_ok());
    if registered {
        Ok(())
    } else {
        Err(RenderError::Font {
            family: CHART_FONT_FAMILY.to_string(),
        })
    }
}

/// Everything a backend needs to draw one chart, in backend-neutral terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub time_format: String,
    /// One vertex per record, in record order.
    pub points: Vec<(DateTime<Utc>, f64)>,
    pub x_range: Range<DateTime<Utc>>,
    pub y_range: Range<f64>,
}

impl ChartPlan {
    pub fn altitude_over_time(series: &TimeSeries) -> Self {
        let points: Vec<(DateTime<Utc>, f64)> = series
            .records
            .iter()
            .map(|record| (record.timestamp, record.altitude))
            .collect();

        let x_range = match series.time_span() {
            Some((min, max)) if min < max => min..max,
            Some((min, max)) => (min - Duration::seconds(1))..(max + Duration::seconds(1)),
            None => series.start..(series.start + Duration::minutes(1)),
        };

        Self {
            title: "Altitude over Time".to_string(),
            x_label: "Time".to_string(),
            y_label: "Altitude (m)".to_string(),
            time_format: TIME_OF_DAY_FORMAT.to_string(),
            y_range: value_range(points.iter().map(|(_, alt)| *alt)),
            points,
            x_range,
        }
    }

    /// Earliest and latest plotted timestamp.
    pub fn x_domain(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.points.first()?.0;
        Some(
            self.points
                .iter()
                .fold((first, first), |(min, max), (ts, _)| (min.min(*ts), max.max(*ts))),
        )
    }
}

fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        });

    if !min.is_finite() {
        return 0.0..1.0;
    }
    let padding = if (max - min).abs() > 1e-6 {
        (max - min) * 0.05
    } else {
        1.0
    };
    (min - padding)..(max + padding)
}

/// Draws a [`ChartPlan`] to an image file.
pub trait ChartBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn draw(&self, plan: &ChartPlan, output: &Path) -> Result<(), RenderError>;
}

/// PNG output through plotters' bitmap backend.
#[derive(Debug, Clone, Copy)]
pub struct PlottersPng {
    pub width: u32,
    pub height: u32,
}

impl Default for PlottersPng {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH_PX,
            height: DEFAULT_HEIGHT_PX,
        }
    }
}

impl ChartBackend for PlottersPng {
    fn name(&self) -> &'static str {
        "plotters-png"
    }

    fn draw(&self, plan: &ChartPlan, output: &Path) -> Result<(), RenderError> {
        ensure_chart_font()?;

        let draw_err = |err: &dyn fmt::Display| RenderError::Draw {
            path: output.to_path_buf(),
            message: err.to_string(),
        };

        let root = BitMapBackend::new(output, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|err| draw_err(&err))?;

        let x_range: Range<NaiveDateTime> =
            plan.x_range.start.naive_utc()..plan.x_range.end.naive_utc();

        let mut chart = ChartBuilder::on(&root)
            .caption(&plan.title, (CHART_FONT_FAMILY, 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(RangedDateTime::from(x_range), plan.y_range.clone())
            .map_err(|err| draw_err(&err))?;

        let time_format = plan.time_format.as_str();
        chart
            .configure_mesh()
            .label_style((CHART_FONT_FAMILY, 12))
            .axis_desc_style((CHART_FONT_FAMILY, 14))
            .x_desc(plan.x_label.as_str())
            .y_desc(plan.y_label.as_str())
            .x_label_formatter(&|dt: &NaiveDateTime| dt.format(time_format).to_string())
            .light_line_style(BLACK.mix(0.15))
            .draw()
            .map_err(|err| draw_err(&err))?;

        if !plan.points.is_empty() {
            chart
                .draw_series(LineSeries::new(
                    plan.points.iter().map(|(ts, alt)| (ts.naive_utc(), *alt)),
                    &BLUE,
                ))
                .map_err(|err| draw_err(&err))?;
        }

        root.present().map_err(|err| draw_err(&err))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartArtifact {
    pub path: PathBuf,
    pub points: usize,
}

/// `<output_dir>/<source stem>.png`
pub fn chart_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chart".to_string());
    output_dir.join(format!("{stem}.{CHART_EXTENSION}"))
}

/// Plots altitude over time for `series` and writes it to `output`.
/// An empty series still produces an image, with axes and grid only.
pub fn render_chart<B>(
    series: &TimeSeries,
    output: &Path,
    backend: &B,
) -> Result<ChartArtifact, RenderError>
where
    B: ChartBackend + ?Sized,
{
    let parent = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.is_dir() {
        return Err(RenderError::OutputDirectory {
            path: output.to_path_buf(),
        });
    }

    let plan = ChartPlan::altitude_over_time(series);
    backend.draw(&plan, output)?;

    info!(
        source = %series.source.display(),
        chart = %output.display(),
        backend = backend.name(),
        points = plan.points.len(),
        "rendered chart"
    );

    Ok(ChartArtifact {
        path: output.to_path_buf(),
        points: plan.points.len(),
    })
}
