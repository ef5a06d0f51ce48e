//! PNG chart drawing with plotters.

use super::series::ChartSeries;
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const TITLE: &str = "The Em Dash Conspiracy";
const X_DESC: &str = "Month";
const Y_DESC: &str = "Share of Posts Using Em Dash";
const FONT_FAMILY: &str = "sans-serif";

/// Line colours, cycled in legend order.
const PALETTE: [RGBColor; 12] = [
    RGBColor(0x88, 0x11, 0x77),
    RGBColor(0xaa, 0x33, 0x55),
    RGBColor(0xcc, 0x66, 0x66),
    RGBColor(0xee, 0x99, 0x44),
    RGBColor(0xee, 0xdd, 0x00),
    RGBColor(0x99, 0xdd, 0x55),
    RGBColor(0x44, 0xdd, 0x88),
    RGBColor(0x22, 0xcc, 0xbb),
    RGBColor(0x00, 0xbb, 0xcc),
    RGBColor(0x00, 0x99, 0xcc),
    RGBColor(0x33, 0x66, 0xbb),
    RGBColor(0x66, 0x33, 0x99),
];

/// Common locations of a plain sans font.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_LOADED: OnceLock<PathBuf> = OnceLock::new();

/// Image settings.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    /// Font file for all chart text; common system fonts are tried if unset.
    pub font_path: Option<PathBuf>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 1200,
            font_path: None,
        }
    }
}

fn resolve_font(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        anyhow::bail!("Font file does not exist: {}", path.display());
    }

    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .ok_or_else(|| anyhow!("No usable font found; set [plot] font_path or pass --font"))
}

/// Register the chart font once per process.
fn ensure_font(explicit: Option<&Path>) -> Result<()> {
    if let Some(loaded) = FONT_LOADED.get() {
        debug!("Font already registered from {}", loaded.display());
        return Ok(());
    }

    let path = resolve_font(explicit)?;
    let bytes = std::fs::read(&path)
        .with_context(|| format!("Failed to read font: {}", path.display()))?;
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());

    plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| anyhow!("Invalid font file: {}", path.display()))?;

    debug!("Registered chart font {}", path.display());
    let _ = FONT_LOADED.set(path);
    Ok(())
}

/// Sorted union of every month that appears in any series.
pub fn month_axis(series: &[ChartSeries]) -> Vec<NaiveDate> {
    let mut months: Vec<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(m, _)| *m))
        .collect();
    months.sort();
    months.dedup();
    months
}

/// Draw one line per series to a PNG at `path`.
pub fn draw_chart(series: &[ChartSeries], path: &Path, style: &ChartStyle) -> Result<()> {
    ensure_font(style.font_path.as_deref())?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let months = month_axis(series);
    if months.is_empty() {
        warn!("No data points to plot; writing an empty chart");
    }
    let x_max = months.len().saturating_sub(1).max(1) as i32;
    let month_label = |idx: &i32| {
        usize::try_from(*idx)
            .ok()
            .and_then(|i| months.get(i))
            .map(|m| m.format("%b %y").to_string())
            .unwrap_or_default()
    };
    let percent_label = |v: &f64| format!("{:.0}%", v);

    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(TITLE, (FONT_FAMILY, 48))
        .margin(30)
        .x_label_area_size(80)
        .y_label_area_size(100)
        .build_cartesian_2d(0..x_max, 0f64..100f64)?;

    chart
        .configure_mesh()
        .x_desc(X_DESC)
        .y_desc(Y_DESC)
        .x_labels(months.len().clamp(2, 12))
        .x_label_formatter(&month_label)
        .y_labels(11)
        .y_label_formatter(&percent_label)
        .label_style((FONT_FAMILY, 22))
        .axis_desc_style((FONT_FAMILY, 28))
        .draw()?;

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let points: Vec<(i32, f64)> = s
            .points
            .iter()
            .filter_map(|(m, y)| months.binary_search(m).ok().map(|idx| (idx as i32, *y)))
            .collect();

        chart
            .draw_series(LineSeries::new(points, color.stroke_width(4)))?
            .label(s.label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 30, y)], color.stroke_width(4))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .label_font((FONT_FAMILY, 26))
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;

    info!("Saved chart with {} series to {}", series.len(), path.display());
    Ok(())
}
