use crate::metrics::{DailyCount, VerdictShare};
use crate::style::verdict_swatch;
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::BTreeSet;
use std::error::Error;
use std::f64::consts::PI;

/// Fraction of the ring radius left empty in the middle
const RING_HOLE: f64 = 0.4;

/// Share below which a ring segment is too thin to carry its percentage
const MIN_LABELLED_SHARE: f64 = 0.04;

/// Configuration options for chart generation
///
/// Both charts render to a standalone SVG document of the given size.
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl ChartOptions {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
        }
    }
}

impl Default for ChartOptions {
    /// 720x400 with a generic title
    fn default() -> Self {
        Self::new("Gráfico", 720, 400)
    }
}

fn swatch_color(verdict: &str) -> RGBColor {
    let (r, g, b) = verdict_swatch(verdict).rgb;
    RGBColor(r, g, b)
}

/// Creates the analysis-history chart
///
/// Draws one group of bars per calendar date and one bar per verdict inside
/// each group, coloured with the verdict colour, plus a legend.
///
/// # Arguments
/// * `daily` - Counts per (date, verdict), as produced by `metrics::daily_breakdown`
/// * `options` - Chart title and size
///
/// # Returns
/// * A Result containing the SVG document or an error
///
/// # Notes
/// * An empty breakdown renders the title and a "no dated records" notice
pub fn daily_chart_svg(
    daily: &[DailyCount],
    options: &ChartOptions,
) -> Result<String, Box<dyn Error>> {
    let mut svg = String::new();
    {
        let root =
            SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        if daily.is_empty() {
            draw_notice(&root, &options.title, "Sin registros con fecha")?;
        } else {
            draw_daily_bars(&root, daily, options)?;
        }

        root.present()?;
    }
    Ok(svg)
}

fn draw_daily_bars(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    daily: &[DailyCount],
    options: &ChartOptions,
) -> Result<(), Box<dyn Error>> {
    let dates: Vec<NaiveDate> = daily
        .iter()
        .map(|d| d.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let verdicts: Vec<&str> = daily
        .iter()
        .map(|d| d.verdict.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let max_count = daily.iter().map(|d| d.count).max().unwrap_or(1) as u32;
    let y_top = max_count + 1 + max_count / 10;

    // Integer x positions are the group centres.
    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(40)
        .build_cartesian_2d(-0.5f64..(dates.len() as f64 - 0.5), 0u32..y_top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(dates.len())
        .x_label_formatter(&|x: &f64| date_label(&dates, *x))
        .y_desc("Cantidad")
        .draw()?;

    let slot = 0.8 / verdicts.len() as f64;
    for (j, verdict) in verdicts.iter().enumerate() {
        let color = swatch_color(verdict);
        let bars: Vec<Rectangle<(f64, u32)>> = daily
            .iter()
            .filter(|d| d.verdict == *verdict)
            .map(|d| {
                let group = dates.binary_search(&d.date).unwrap_or_else(|i| i) as f64;
                let left = group - 0.4 + j as f64 * slot;
                Rectangle::new([(left, 0), (left + slot, d.count as u32)], color.filled())
            })
            .collect();

        chart
            .draw_series(bars)?
            .label(verdict.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

fn date_label(dates: &[NaiveDate], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 1e-6 {
        return String::new();
    }
    dates
        .get(idx as usize)
        .map(|d| d.format("%d/%m").to_string())
        .unwrap_or_default()
}

/// Creates the risk-status ring chart
///
/// Each verdict gets a ring segment proportional to its share, labelled with
/// its percentage when the segment is wide enough, and a legend row with its
/// record count below the ring.
///
/// # Arguments
/// * `shares` - Verdict proportions, as produced by `metrics::verdict_shares`
/// * `options` - Chart title and size
///
/// # Returns
/// * A Result containing the SVG document or an error
pub fn verdict_ring_svg(
    shares: &[VerdictShare],
    options: &ChartOptions,
) -> Result<String, Box<dyn Error>> {
    let mut svg = String::new();
    {
        let root =
            SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let total: usize = shares.iter().map(|s| s.count).sum();
        if total == 0 {
            draw_notice(&root, &options.title, "Sin registros")?;
        } else {
            draw_ring(&root, shares, total, options)?;
        }

        root.present()?;
    }
    Ok(svg)
}

fn draw_ring(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    shares: &[VerdictShare],
    total: usize,
    options: &ChartOptions,
) -> Result<(), Box<dyn Error>> {
    let area = root.titled(&options.title, ("sans-serif", 22).into_font())?;
    let (width, height) = area.dim_in_pixel();

    let legend_height = shares.len() as u32 * 22 + 10;
    let ring_height = height.saturating_sub(legend_height).max(height / 2);
    let center = (width as i32 / 2, ring_height as i32 / 2);
    let outer = width.min(ring_height) as f64 / 2.0 * 0.9;
    let inner = outer * RING_HOLE;

    let label_style = ("sans-serif", 14)
        .into_font()
        .color(&WHITE)
        .pos(Pos::new(HPos::Center, VPos::Center));

    let mut start = -PI / 2.0;
    for share in shares {
        let sweep = 2.0 * PI * share.count as f64 / total as f64;
        let color = swatch_color(&share.verdict);
        area.draw(&Polygon::new(
            ring_segment(center, inner, outer, start, sweep),
            color.filled(),
        ))?;

        if share.fraction >= MIN_LABELLED_SHARE {
            let at = polar(center, (inner + outer) / 2.0, start + sweep / 2.0);
            area.draw(&Text::new(
                format!("{:.0}%", share.fraction * 100.0),
                at,
                label_style.clone(),
            ))?;
        }
        start += sweep;
    }

    for (i, share) in shares.iter().enumerate() {
        let x = 20;
        let y = ring_height as i32 + 10 + i as i32 * 22;
        area.draw(&Rectangle::new(
            [(x, y), (x + 14, y + 14)],
            swatch_color(&share.verdict).filled(),
        ))?;
        area.draw(&Text::new(
            format!("{} ({})", share.verdict, share.count),
            (x + 22, y + 1),
            ("sans-serif", 14).into_font(),
        ))?;
    }

    Ok(())
}

fn polar(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 + (radius * angle.sin()).round() as i32,
    )
}

/// Outline of one ring segment: outer arc forward, inner arc back.
fn ring_segment(
    center: (i32, i32),
    inner: f64,
    outer: f64,
    start: f64,
    sweep: f64,
) -> Vec<(i32, i32)> {
    let steps = ((sweep / (2.0 * PI)) * 120.0).ceil().max(2.0) as usize;
    let angle = |k: usize| start + sweep * k as f64 / steps as f64;

    let mut points: Vec<(i32, i32)> = (0..=steps).map(|k| polar(center, outer, angle(k))).collect();
    points.extend((0..=steps).rev().map(|k| polar(center, inner, angle(k))));
    points
}

fn draw_notice(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    title: &str,
    message: &str,
) -> Result<(), Box<dyn Error>> {
    let area = root.titled(title, ("sans-serif", 22).into_font())?;
    let (width, height) = area.dim_in_pixel();
    area.draw(&Text::new(
        message.to_string(),
        (width as i32 / 2, height as i32 / 2),
        ("sans-serif", 16)
            .into_font()
            .color(&BLACK.mix(0.6))
            .pos(Pos::new(HPos::Center, VPos::Center)),
    ))?;
    Ok(())
}
