//! Stacked traffic chart rendering.
//!
//! PNG by default; an `.svg` output path selects the SVG backend instead.

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use tracing::{debug, info};

use crate::aggregate::ChartData;

pub const CHART_TITLE: &str = "Network Traffic (Drift Corrected & Aggregated)";
pub const EMPTY_CAPTION: &str = "No traffic detected";

/// tab20
const PALETTE: [RGBColor; 20] = [
    RGBColor(31, 119, 180),
    RGBColor(174, 199, 232),
    RGBColor(255, 127, 14),
    RGBColor(255, 187, 120),
    RGBColor(44, 160, 44),
    RGBColor(152, 223, 138),
    RGBColor(214, 39, 40),
    RGBColor(255, 152, 150),
    RGBColor(148, 103, 189),
    RGBColor(197, 176, 213),
    RGBColor(140, 86, 75),
    RGBColor(196, 156, 148),
    RGBColor(227, 119, 194),
    RGBColor(247, 182, 210),
    RGBColor(127, 127, 127),
    RGBColor(199, 199, 199),
    RGBColor(188, 189, 34),
    RGBColor(219, 219, 141),
    RGBColor(23, 190, 207),
    RGBColor(158, 218, 229),
];

const AREA_ALPHA: f64 = 0.8;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("chart output path is empty")]
    EmptyPath,

    #[error("drawing chart failed: {0}")]
    Draw(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Image geometry.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
        }
    }
}

/// Draws `chart` into the image file at `path`.
pub fn render_chart(chart: &ChartData, path: &Path, opts: &RenderOptions) -> Result<(), RenderError> {
    if path.as_os_str().is_empty() {
        return Err(RenderError::EmptyPath);
    }
    let size = (opts.width, opts.height);
    debug!(
        "Rendering {} series ({}) to {}",
        chart.series.len(),
        chart.unit.label(),
        path.display()
    );

    match path.extension().and_then(|e| e.to_str()) {
        Some("svg") => draw(SVGBackend::new(path, size).into_drawing_area(), chart, opts)?,
        _ => draw(BitMapBackend::new(path, size).into_drawing_area(), chart, opts)?,
    }

    info!("Chart written to {}", path.display());
    Ok(())
}

/// Visible x range; slot 0 is reserved and not shown.
fn x_range(duration: usize) -> (f64, f64) {
    if duration > 1 {
        (1.0, duration as f64)
    } else {
        (0.0, 1.0)
    }
}

fn draw<DB>(root: DrawingArea<DB, Shift>, chart: &ChartData, opts: &RenderOptions) -> Result<(), RenderError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(draw_err)?;

    let (x0, x1) = x_range(chart.duration);
    let y_max = match chart.max_stacked() {
        m if m > 0.0 => m * 1.05,
        _ => 1.0,
    };

    let mut ctx = ChartBuilder::on(&root)
        .caption(CHART_TITLE, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, 0f64..y_max)
        .map_err(draw_err)?;

    ctx.configure_mesh()
        .x_desc("Time (seconds)")
        .y_desc(format!("Traffic Volume ({})", chart.unit.label()))
        .light_line_style(BLACK.mix(0.08))
        .draw()
        .map_err(draw_err)?;

    if chart.is_empty() {
        ctx.draw_series(std::iter::once(Text::new(
            EMPTY_CAPTION,
            ((x0 + x1) / 2.0, y_max / 2.0),
            ("sans-serif", 20).into_font(),
        )))
        .map_err(draw_err)?;
        root.present().map_err(draw_err)?;
        return Ok(());
    }

    let visible: Vec<usize> = (1..=chart.duration).collect();
    let mut lower = vec![0.0f64; chart.duration + 1];
    for (i, series) in chart.series.iter().enumerate() {
        let upper: Vec<f64> = lower
            .iter()
            .zip(&series.values)
            .map(|(l, v)| l + v)
            .collect();

        let mut outline: Vec<(f64, f64)> = visible.iter().map(|&x| (x as f64, upper[x])).collect();
        outline.extend(visible.iter().rev().map(|&x| (x as f64, lower[x])));

        let color = PALETTE[i % PALETTE.len()];
        ctx.draw_series(std::iter::once(Polygon::new(
            outline,
            color.mix(AREA_ALPHA).filled(),
        )))
        .map_err(draw_err)?
        .label(series.name.clone())
        .legend(move |(x, y)| {
            Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.mix(AREA_ALPHA).filled())
        });

        lower = upper;
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .draw()
        .map_err(draw_err)?;

    root.draw(&Text::new(
        format!("Top {} & Others", chart.top_n),
        (opts.width as i32 - 180, 12),
        ("sans-serif", 16).into_font(),
    ))
    .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    Ok(())
}
