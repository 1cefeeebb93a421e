//! PNG chart rendering for campaign and platform metrics
//!
//! Each chart is drawn onto a [`Canvas`] and saved independently, so one
//! failing chart never prevents the others.

use super::canvas::*;
use super::report::{format_compact, format_currency_whole};
use ab_glyph::FontArc;
use adscale_core::config::{ChartOptions, DEFAULT_CHART_HEIGHT};
use adscale_core::{CampaignMetrics, CampaignPerformance, DailyPlatformMetrics, RenderError};
use chrono::NaiveDate;
use image::Rgba;
use std::path::Path;
use tracing::info;

pub const REVENUE_CHART: &str = "revenue";
pub const CTR_CHART: &str = "ctr_vs_conversion";
pub const PLATFORM_CHART: &str = "platform_comparison";

const ANNOTATED_CAMPAIGNS: usize = 10;
const COLOR_POINT: Rgba<u8> = Rgba([0x4C, 0x72, 0xB0, 0xCC]);
const COLOR_LABEL_FILL: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xCC]);
const COLOR_LABEL_BORDER: Rgba<u8> = Rgba([0x80, 0x80, 0x80, 0xCC]);
const COLOR_LABEL_TEXT: Rgba<u8> = Rgba([0x26, 0x26, 0x26, 0xB3]);

/// Font sizes and spacing scaled to the canvas height.
#[derive(Debug, Clone, Copy)]
struct Typography {
    unit: f32,
    title: f32,
    label: f32,
    tick: f32,
    note: f32,
}

impl Typography {
    fn for_height(height: u32) -> Self {
        let unit = (height as f32 / DEFAULT_CHART_HEIGHT as f32).max(0.2);
        Self {
            unit,
            title: 32.0 * unit,
            label: 24.0 * unit,
            tick: 18.0 * unit,
            note: 15.0 * unit,
        }
    }

    fn px(&self, value: f32) -> i32 {
        (value * self.unit).round() as i32
    }
}

/// Maps data coordinates into a pixel rectangle.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl PlotArea {
    fn width(&self) -> i32 {
        self.right - self.left
    }

    fn x_to_px(&self, x: f64) -> f32 {
        let span = self.x_max - self.x_min;
        if span <= 0.0 {
            return (self.left + self.width() / 2) as f32;
        }
        self.left as f32 + ((x - self.x_min) / span) as f32 * self.width() as f32
    }

    fn y_to_px(&self, y: f64) -> f32 {
        let span = self.y_max - self.y_min;
        if span <= 0.0 {
            return ((self.top + self.bottom) / 2) as f32;
        }
        self.bottom as f32 - ((y - self.y_min) / span) as f32 * (self.bottom - self.top) as f32
    }
}

pub struct ChartRenderer {
    width: u32,
    height: u32,
    font: Option<FontArc>,
}

impl ChartRenderer {
    pub fn new(options: &ChartOptions, font: Option<FontArc>) -> Self {
        Self {
            width: options.width,
            height: options.height,
            font,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn revenue_performance(
        &self,
        campaigns: &[CampaignMetrics],
        path: &Path,
    ) -> Result<(), RenderError> {
        save(&self.draw_revenue(campaigns), REVENUE_CHART, path)
    }

    pub fn ctr_vs_conversion(
        &self,
        performance: &CampaignPerformance,
        path: &Path,
    ) -> Result<(), RenderError> {
        save(&self.draw_ctr_scatter(performance), CTR_CHART, path)
    }

    pub fn platform_comparison(
        &self,
        daily: &[DailyPlatformMetrics],
        path: &Path,
    ) -> Result<(), RenderError> {
        save(&self.draw_platform_panels(daily), PLATFORM_CHART, path)
    }

    fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height, self.font.clone())
    }

    fn draw_revenue(&self, campaigns: &[CampaignMetrics]) -> Canvas {
        let mut canvas = self.canvas();
        let t = Typography::for_height(self.height);

        let label_extent = campaigns
            .iter()
            .map(|c| canvas.text_vertical_extent(t.note, &c.campaign))
            .max()
            .unwrap_or(0)
            .min(canvas.height() * 2 / 5);

        let max_revenue = campaigns
            .iter()
            .map(|c| c.total_revenue)
            .fold(0.0f64, f64::max);
        let y_ticks = nice_ticks(0.0, max_revenue.max(1.0) * 1.2, 6);
        let y_max = y_ticks.last().copied().unwrap_or(1.0);

        let area = PlotArea {
            left: t.px(130.0),
            top: t.px(80.0),
            right: canvas.width() - t.px(30.0),
            bottom: canvas.height() - t.px(70.0) - label_extent,
            x_min: 0.0,
            x_max: campaigns.len() as f64,
            y_min: 0.0,
            y_max,
        };

        let tick_labels: Vec<(f64, String)> = y_ticks
            .iter()
            .map(|&v| (v, format_compact_currency(v)))
            .collect();
        draw_frame(&mut canvas, &area, &tick_labels, false, t);
        draw_titles(
            &mut canvas,
            &area,
            t,
            "Campaign Revenue Performance",
            "Campaigns",
            "Total Revenue ($)",
        );

        if campaigns.is_empty() {
            draw_empty_note(&mut canvas, &area, t);
            return canvas;
        }

        let slot = area.width() as f32 / campaigns.len() as f32;
        let bar_width = (slot * 0.8).max(1.0);
        for (i, campaign) in campaigns.iter().enumerate() {
            let center = area.left as f32 + slot * (i as f32 + 0.5);
            let top = area.y_to_px(campaign.total_revenue);
            let x = (center - bar_width / 2.0).round() as i32;
            let y = top.round() as i32;
            canvas.fill_rect(x, y, bar_width.round().max(1.0) as i32, area.bottom - y, COLOR_BAR);

            let center = center.round() as i32;
            canvas.text_vertical(
                center,
                y - t.px(4.0),
                t.note,
                COLOR_TEXT_PRIMARY,
                &format_currency_whole(campaign.total_revenue),
            );
            canvas.text_vertical(
                center,
                area.bottom + t.px(6.0) + canvas.text_vertical_extent(t.note, &campaign.campaign),
                t.note,
                COLOR_TEXT_SECONDARY,
                &campaign.campaign,
            );
        }

        canvas
    }

    fn draw_ctr_scatter(&self, performance: &CampaignPerformance) -> Canvas {
        let mut canvas = self.canvas();
        let t = Typography::for_height(self.height);

        // Ranked by CTR, so the first entries are the ones to annotate
        let points: Vec<(&str, f64, f64)> = performance
            .by_ctr
            .iter()
            .filter_map(|m| Some((m.campaign.as_str(), m.ctr?, m.conversion_rate?)))
            .collect();

        let (x_min, x_max) = padded_range(points.iter().map(|p| p.1));
        let (y_min, y_max) = padded_range(points.iter().map(|p| p.2));
        let x_ticks = nice_ticks(x_min, x_max, 8);
        let y_ticks = nice_ticks(y_min, y_max, 6);

        let area = PlotArea {
            left: t.px(120.0),
            top: t.px(80.0),
            right: canvas.width() - t.px(40.0),
            bottom: canvas.height() - t.px(90.0),
            x_min: x_ticks.first().copied().unwrap_or(x_min),
            x_max: x_ticks.last().copied().unwrap_or(x_max),
            y_min: y_ticks.first().copied().unwrap_or(y_min),
            y_max: y_ticks.last().copied().unwrap_or(y_max),
        };

        let y_labels: Vec<(f64, String)> = y_ticks.iter().map(|&v| (v, format_rate_tick(v))).collect();
        draw_frame(&mut canvas, &area, &y_labels, false, t);
        for &v in &x_ticks {
            let x = area.x_to_px(v);
            canvas.line((x, area.top as f32), (x, area.bottom as f32), COLOR_GRID, 1);
            canvas.text_centered(
                x.round() as i32,
                area.bottom + t.px(28.0),
                t.tick,
                COLOR_TEXT_SECONDARY,
                &format_rate_tick(v),
            );
        }
        draw_titles(
            &mut canvas,
            &area,
            t,
            "Click-Through Rate vs Conversion Rate by Campaign",
            "Click-Through Rate",
            "Conversion Rate",
        );

        if points.is_empty() {
            draw_empty_note(&mut canvas, &area, t);
            return canvas;
        }

        let radius = t.px(7.0).max(2);
        for &(_, ctr, conversion) in &points {
            let center = (area.x_to_px(ctr).round() as i32, area.y_to_px(conversion).round() as i32);
            canvas.circle(center, radius, COLOR_POINT);
        }

        let pad = t.px(5.0).max(1);
        let box_height = (t.note * 1.2).ceil() as i32 + 2 * pad;
        for &(name, ctr, conversion) in points.iter().take(ANNOTATED_CAMPAIGNS) {
            let x = area.x_to_px(ctr).round() as i32 + t.px(8.0);
            let y = area.y_to_px(conversion).round() as i32 - t.px(8.0) - box_height;
            let box_width = canvas.text_width(t.note, name).ceil() as i32 + 2 * pad;
            canvas.rounded_box(
                x,
                y,
                box_width,
                box_height,
                t.px(6.0),
                COLOR_LABEL_FILL,
                COLOR_LABEL_BORDER,
            );
            canvas.text(
                x + pad,
                y + pad + t.note.round() as i32,
                t.note,
                COLOR_LABEL_TEXT,
                name,
            );
        }

        canvas
    }

    fn draw_platform_panels(&self, daily: &[DailyPlatformMetrics]) -> Canvas {
        let mut canvas = self.canvas();
        let t = Typography::for_height(self.height);

        let metrics: [(&str, Rgba<u8>, fn(&DailyPlatformMetrics) -> Option<f64>); 3] = [
            ("Engagement Rate", COLOR_BLUE, |d| Some(d.engagement_rate)),
            ("CTR", COLOR_GREEN, |d| d.ctr),
            ("Conversion Rate", COLOR_RED, |d| d.conversion_rate),
        ];

        let mut platforms: Vec<&str> = Vec::new();
        for row in daily {
            if !platforms.contains(&row.platform.as_str()) {
                platforms.push(&row.platform);
            }
        }

        let first_date = daily.iter().map(|d| d.date).min();
        let last_date = daily.iter().map(|d| d.date).max();
        let day_span = match (first_date, last_date) {
            (Some(first), Some(last)) => (last - first).num_days() as f64,
            _ => 0.0,
        };
        let day_offset =
            |date: NaiveDate| first_date.map_or(0.0, |first| (date - first).num_days() as f64);

        let panel_gap = t.px(40.0);
        let top_margin = t.px(20.0);
        let bottom_margin = t.px(70.0);
        let panel_height =
            (canvas.height() - top_margin - bottom_margin - panel_gap * 2) / metrics.len() as i32;

        for (index, (metric, color, value_of)) in metrics.iter().enumerate() {
            let panel_top = top_margin + index as i32 * (panel_height + panel_gap);
            let values: Vec<f64> = daily.iter().filter_map(value_of).collect();
            let (y_min, y_max) = padded_range(values.iter().copied());
            let y_ticks = nice_ticks(y_min, y_max, 4);

            let area = PlotArea {
                left: t.px(130.0),
                top: panel_top + t.px(40.0),
                right: canvas.width() - t.px(30.0),
                bottom: panel_top + panel_height,
                x_min: 0.0,
                x_max: day_span,
                y_min: y_ticks.first().copied().unwrap_or(y_min).min(y_min),
                y_max: y_ticks.last().copied().unwrap_or(y_max).max(y_max),
            };

            let y_labels: Vec<(f64, String)> =
                y_ticks.iter().map(|&v| (v, format_rate_tick(v))).collect();
            draw_frame(&mut canvas, &area, &y_labels, true, t);

            if let Some(first) = first_date {
                for offset in date_ticks(day_span as i64, 8) {
                    let x = area.x_to_px(offset as f64);
                    canvas.dashed_line(
                        (x, area.top as f32),
                        (x, area.bottom as f32),
                        COLOR_GRID_DASHED,
                        1,
                        t.px(6.0).max(2) as f32,
                        t.px(4.0).max(2) as f32,
                    );
                    let label = first
                        .checked_add_days(chrono::Days::new(offset as u64))
                        .map(|d| d.format("%m-%d").to_string())
                        .unwrap_or_default();
                    canvas.text_centered(
                        x.round() as i32,
                        area.bottom + t.px(22.0),
                        t.tick,
                        COLOR_TEXT_SECONDARY,
                        &label,
                    );
                }
            }

            let title = format!("{metric} Over Time");
            canvas.text_centered(
                (area.left + area.right) / 2,
                panel_top + t.px(28.0),
                t.label,
                COLOR_TEXT_PRIMARY,
                &title,
            );
            canvas.text_vertical(
                t.px(34.0),
                (area.top + area.bottom) / 2 + canvas.text_vertical_extent(t.tick, metric) / 2,
                t.tick,
                COLOR_TEXT_PRIMARY,
                metric,
            );

            let mut legend: Vec<(String, Option<(f32, f32)>)> = Vec::new();
            for (platform_index, platform) in platforms.iter().enumerate() {
                let dash = (platform_index > 0)
                    .then(|| (t.px(10.0).max(3) as f32, t.px(6.0).max(2) as f32));

                // Undefined values break the line rather than bridging the gap
                let mut run: Vec<(f32, f32)> = Vec::new();
                for row in daily.iter().filter(|d| d.platform == *platform) {
                    match value_of(row) {
                        Some(value) => run.push((
                            area.x_to_px(day_offset(row.date)),
                            area.y_to_px(value),
                        )),
                        None => {
                            canvas.polyline(&run, *color, t.px(2.0).max(1), dash);
                            run.clear();
                        }
                    }
                }
                if run.len() == 1 {
                    let (x, y) = run[0];
                    canvas.circle((x.round() as i32, y.round() as i32), t.px(3.0).max(1), *color);
                }
                canvas.polyline(&run, *color, t.px(2.0).max(1), dash);

                legend.push((format!("{platform} {metric}"), dash));
            }

            draw_legend(&mut canvas, &area, &legend, *color, t);
        }

        canvas.text_centered(
            canvas.width() / 2,
            canvas.height() - t.px(16.0),
            t.label,
            COLOR_TEXT_PRIMARY,
            "Date",
        );

        if daily.is_empty() {
            let area = PlotArea {
                left: 0,
                top: 0,
                right: canvas.width(),
                bottom: canvas.height(),
                x_min: 0.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 1.0,
            };
            draw_empty_note(&mut canvas, &area, t);
        }

        canvas
    }
}

fn save(canvas: &Canvas, chart: &'static str, path: &Path) -> Result<(), RenderError> {
    canvas.save(path).map_err(|e| RenderError {
        chart,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    info!("Saved {} chart to {}", chart, path.display());
    Ok(())
}

/// Axis lines, horizontal grid and y tick labels.
fn draw_frame(
    canvas: &mut Canvas,
    area: &PlotArea,
    y_ticks: &[(f64, String)],
    dashed_grid: bool,
    t: Typography,
) {
    for (value, label) in y_ticks {
        let y = area.y_to_px(*value);
        if dashed_grid {
            canvas.dashed_line(
                (area.left as f32, y),
                (area.right as f32, y),
                COLOR_GRID_DASHED,
                1,
                t.px(6.0).max(2) as f32,
                t.px(4.0).max(2) as f32,
            );
        } else {
            canvas.line((area.left as f32, y), (area.right as f32, y), COLOR_GRID, 1);
        }
        canvas.text_right(
            area.left - t.px(10.0),
            y.round() as i32 + (t.tick / 3.0).round() as i32,
            t.tick,
            COLOR_TEXT_SECONDARY,
            label,
        );
    }

    let (left, right) = (area.left as f32, area.right as f32);
    let (top, bottom) = (area.top as f32, area.bottom as f32);
    canvas.line((left, top), (left, bottom), COLOR_AXIS, 1);
    canvas.line((left, bottom), (right, bottom), COLOR_AXIS, 1);
}

fn draw_titles(
    canvas: &mut Canvas,
    area: &PlotArea,
    t: Typography,
    title: &str,
    x_label: &str,
    y_label: &str,
) {
    let center_x = (area.left + area.right) / 2;
    canvas.text_centered(center_x, t.px(48.0), t.title, COLOR_TEXT_PRIMARY, title);
    canvas.text_centered(
        center_x,
        canvas.height() - t.px(20.0),
        t.label,
        COLOR_TEXT_PRIMARY,
        x_label,
    );
    canvas.text_vertical(
        t.px(36.0),
        (area.top + area.bottom) / 2 + canvas.text_vertical_extent(t.label, y_label) / 2,
        t.label,
        COLOR_TEXT_PRIMARY,
        y_label,
    );
}

fn draw_legend(
    canvas: &mut Canvas,
    area: &PlotArea,
    entries: &[(String, Option<(f32, f32)>)],
    color: Rgba<u8>,
    t: Typography,
) {
    if entries.is_empty() {
        return;
    }

    let sample = t.px(36.0).max(6);
    let pad = t.px(8.0).max(2);
    let line_height = (t.note * 1.5).ceil() as i32;
    let text_width = entries
        .iter()
        .map(|(label, _)| canvas.text_width(t.note, label).ceil() as i32)
        .max()
        .unwrap_or(0);

    let width = pad * 3 + sample + text_width;
    let height = pad * 2 + line_height * entries.len() as i32;
    let x = area.right - width - pad;
    let y = area.top + pad;

    canvas.rounded_box(x, y, width, height, t.px(4.0), COLOR_LABEL_FILL, COLOR_LABEL_BORDER);
    for (i, (label, dash)) in entries.iter().enumerate() {
        let row_mid = y + pad + line_height * i as i32 + line_height / 2;
        let from = ((x + pad) as f32, row_mid as f32);
        let to = ((x + pad + sample) as f32, row_mid as f32);
        canvas.polyline(&[from, to], color, t.px(2.0).max(1), *dash);
        canvas.text(
            x + pad * 2 + sample,
            row_mid + (t.note / 3.0).round() as i32,
            t.note,
            COLOR_TEXT_PRIMARY,
            label,
        );
    }
}

fn draw_empty_note(canvas: &mut Canvas, area: &PlotArea, t: Typography) {
    canvas.text_centered(
        (area.left + area.right) / 2,
        (area.top + area.bottom) / 2,
        t.label,
        COLOR_TEXT_SECONDARY,
        "No data",
    );
}

/// Evenly spaced, human-friendly tick values covering `[min, max]`.
fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !min.is_finite() || !max.is_finite() || target == 0 || max < min {
        return Vec::new();
    }

    let (min, max) = if max - min <= f64::EPSILON {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        (min - pad, max + pad)
    } else {
        (min, max)
    };

    let step = nice_step((max - min) / target as f64);
    let start = (min / step).floor() * step;
    let end = (max / step).ceil() * step;
    let count = ((end - start) / step).round() as usize;

    (0..=count).map(|i| start + step * i as f64).collect()
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 2.5 {
        2.5
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Day offsets for at most `target` date labels across `span` days.
fn date_ticks(span: i64, target: i64) -> Vec<i64> {
    let step = ((span + target - 1) / target.max(1)).max(1);
    (0..=span).step_by(step as usize).collect()
}

/// Data range with a 5% margin, widened when every value is equal.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span <= f64::EPSILON {
        let pad = if min == 0.0 { 0.01 } else { min.abs() * 0.1 };
        return (min - pad, max + pad);
    }
    (min - span * 0.05, max + span * 0.05)
}

fn format_rate_tick(value: f64) -> String {
    let percent = value * 100.0;
    if percent.abs() < 1e-9 {
        "0%".to_string()
    } else if (percent - percent.round()).abs() < 1e-6 {
        format!("{percent:.0}%")
    } else {
        format!("{percent:.1}%")
    }
}

fn format_compact_currency(value: f64) -> String {
    format!("${}", format_compact(value))
}
