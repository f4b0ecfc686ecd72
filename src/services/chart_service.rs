use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::models::{ChartGeometry, DrawCommand, Padding, Point, RateSeries, Rgba, TextAnchor};
use crate::utils::dates;

pub const PADDING: Padding = Padding {
    top: 20.0,
    right: 20.0,
    bottom: 60.0,
    left: 70.0,
};

/// Horizontal gridline intervals (one more line than steps)
pub const Y_STEPS: usize = 5;

/// Approximate pixels one rotated date label needs
pub const LABEL_WIDTH: f64 = 35.0;

pub const POINT_RADIUS: f64 = 3.0;
pub const TICK_LENGTH: f64 = 5.0;
pub const LABEL_ROTATION_DEG: f64 = 30.0;

const RATE_PADDING_RATIO: f64 = 0.1;
/// Flat series: pad by this share of the rate instead
const FLAT_PADDING_RATIO: f64 = 0.05;
const MIN_FLAT_PADDING: f64 = 1e-4;

const BACKGROUND: Rgba = Rgba::new(0.1, 0.1, 0.1, 0.9);
const AXIS: Rgba = Rgba::new(0.5, 0.5, 0.5, 1.0);
const H_GRID: Rgba = Rgba::new(0.3, 0.3, 0.3, 0.5);
const V_GRID: Rgba = Rgba::new(0.3, 0.3, 0.3, 0.3);
const LABEL: Rgba = Rgba::new(0.8, 0.8, 0.8, 1.0);
const LINE: Rgba = Rgba::new(0.5, 0.8, 1.0, 1.0);
const MARKER: Rgba = Rgba::new(0.3, 0.6, 1.0, 1.0);
const TITLE: Rgba = Rgba::new(0.9, 0.9, 0.9, 1.0);

/// Compute the pixel mapping for `rates` on a `width` x `height` canvas.
///
/// Returns `None` when there are fewer than two rates or the canvas cannot
/// hold the padding box.
pub fn compute_geometry(rates: &[f64], width: f64, height: f64) -> Option<ChartGeometry> {
    if rates.len() < 2 {
        return None;
    }

    let plot_width = width - PADDING.left - PADDING.right;
    let plot_height = height - PADDING.top - PADDING.bottom;
    if plot_width <= 0.0 || plot_height <= 0.0 {
        return None;
    }

    let min_rate = rates.iter().copied().fold(f64::INFINITY, f64::min);
    let max_rate = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let rate_range = max_rate - min_rate;

    let rate_padding = if rate_range > 0.0 {
        rate_range * RATE_PADDING_RATIO
    } else {
        (max_rate.abs() * FLAT_PADDING_RATIO).max(MIN_FLAT_PADDING)
    };

    Some(ChartGeometry {
        width,
        height,
        padding: PADDING,
        plot_width,
        plot_height,
        min_rate,
        max_rate,
        rate_padding,
        point_count: rates.len(),
    })
}

/// Indices of the points that get a date label.
///
/// Every point when they all fit; otherwise the first, the last and evenly
/// stepped indices in between, ascending and without duplicates.
pub fn label_indices(point_count: usize, plot_width: f64) -> Vec<usize> {
    if point_count == 0 {
        return Vec::new();
    }

    let available = (plot_width / LABEL_WIDTH).floor().max(0.0) as usize;
    if available >= point_count {
        return (0..point_count).collect();
    }

    let last = point_count - 1;
    let mut indices = BTreeSet::from([0, last]);
    if available >= 2 {
        let step = last as f64 / (available - 1) as f64;
        for i in 1..available - 1 {
            indices.insert(((i as f64 * step).round() as usize).min(last));
        }
    }

    indices.into_iter().collect()
}

/// Render `series` to drawing commands for a `width` x `height` canvas.
///
/// Only samples with a rate are plotted, indexed by their position among the
/// valid samples. With fewer than two of them only the background is drawn.
pub fn render(series: &RateSeries, width: f64, height: f64) -> Vec<DrawCommand> {
    let mut commands = vec![DrawCommand::Clear {
        width,
        height,
        color: BACKGROUND,
    }];

    let valid = series.valid();
    let rates: Vec<f64> = valid.iter().map(|(_, rate)| *rate).collect();
    let geometry = match compute_geometry(&rates, width, height) {
        Some(g) => g,
        None => return commands,
    };

    let left = geometry.padding.left;
    let top = geometry.padding.top;
    let right = geometry.plot_right();
    let bottom = geometry.plot_bottom();

    // Axes
    commands.push(line(Point::new(left, top), Point::new(left, bottom), AXIS, 1.0));
    commands.push(line(Point::new(left, bottom), Point::new(right, bottom), AXIS, 1.0));

    // Horizontal gridlines with rate labels, top to bottom
    for i in 0..=Y_STEPS {
        let y = top + i as f64 * geometry.plot_height / Y_STEPS as f64;
        let value = geometry.scale_max() - i as f64 * geometry.scale_span() / Y_STEPS as f64;

        commands.push(line(Point::new(left, y), Point::new(right, y), H_GRID, 0.5));
        commands.push(text(
            Point::new(5.0, y + 4.0),
            format!("{:.4}", value),
            10.0,
            LABEL,
            0.0,
            TextAnchor::Start,
        ));
    }

    // Vertical gridline per sample
    for index in 0..valid.len() {
        let x = geometry.x_for_index(index);
        commands.push(line(Point::new(x, top), Point::new(x, bottom), V_GRID, 0.5));
    }

    let points: Vec<Point> = rates
        .iter()
        .enumerate()
        .map(|(index, rate)| Point::new(geometry.x_for_index(index), geometry.y_for_rate(*rate)))
        .collect();

    commands.push(DrawCommand::Polyline {
        points: points.clone(),
        color: LINE,
        width: 2.0,
    });
    for center in points {
        commands.push(DrawCommand::Circle {
            center,
            radius: POINT_RADIUS,
            color: MARKER,
        });
    }

    // Ticks on every sample, date labels on the selected ones
    let labelled = label_indices(valid.len(), geometry.plot_width);
    for (index, (date, _)) in valid.iter().enumerate() {
        let x = geometry.x_for_index(index);
        commands.push(line(Point::new(x, bottom), Point::new(x, bottom + TICK_LENGTH), LABEL, 1.0));

        if labelled.binary_search(&index).is_ok() {
            commands.push(text(
                Point::new(x, bottom + 10.0),
                dates::short_day_month(*date),
                10.0,
                LABEL,
                LABEL_ROTATION_DEG,
                TextAnchor::Start,
            ));
        }
    }

    commands.push(text(
        Point::new(width / 2.0, top - 5.0),
        chart_title(&valid),
        12.0,
        TITLE,
        0.0,
        TextAnchor::Center,
    ));

    commands
}

fn chart_title(valid: &[(NaiveDate, f64)]) -> String {
    match (valid.first(), valid.last()) {
        (Some((first, _)), Some((last, _))) => {
            format!("{} to {}", dates::iso_day(*first), dates::iso_day(*last))
        }
        _ => String::new(),
    }
}

fn line(from: Point, to: Point, color: Rgba, width: f64) -> DrawCommand {
    DrawCommand::Line { from, to, color, width }
}

fn text(
    at: Point,
    text: String,
    size: f64,
    color: Rgba,
    rotation: f64,
    anchor: TextAnchor,
) -> DrawCommand {
    DrawCommand::Text {
        at,
        text,
        size,
        color,
        rotation,
        anchor,
    }
}

fn to_rgba(color: Rgba) -> RGBAColor {
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RGBAColor(channel(color.r), channel(color.g), channel(color.b), color.a.clamp(0.0, 1.0))
}

fn to_pixel(point: Point) -> (i32, i32) {
    (point.x.round() as i32, point.y.round() as i32)
}

/// Rasterize drawing commands into a PNG at `path`.
///
/// The bitmap backend has no arbitrary text rotation, so rotated labels are
/// drawn upright.
pub fn export_png(
    commands: &[DrawCommand],
    width: u32,
    height: u32,
    path: &Path,
) -> Result<(), String> {
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();

    for command in commands {
        match command {
            DrawCommand::Clear { color, .. } => {
                root.fill(&to_rgba(*color))
                    .map_err(|e| format!("Failed to fill canvas: {}", e))?;
            }
            DrawCommand::Line { from, to, color, width } => {
                let style = ShapeStyle {
                    color: to_rgba(*color),
                    filled: false,
                    stroke_width: width.ceil().max(1.0) as u32,
                };
                root.draw(&PathElement::new(vec![to_pixel(*from), to_pixel(*to)], style))
                    .map_err(|e| format!("Failed to draw line: {}", e))?;
            }
            DrawCommand::Polyline { points, color, width } => {
                let style = ShapeStyle {
                    color: to_rgba(*color),
                    filled: false,
                    stroke_width: width.ceil().max(1.0) as u32,
                };
                let pixels: Vec<(i32, i32)> = points.iter().copied().map(to_pixel).collect();
                root.draw(&PathElement::new(pixels, style))
                    .map_err(|e| format!("Failed to draw line: {}", e))?;
            }
            DrawCommand::Circle { center, radius, color } => {
                root.draw(&Circle::new(
                    to_pixel(*center),
                    radius.round() as i32,
                    to_rgba(*color).filled(),
                ))
                .map_err(|e| format!("Failed to draw point: {}", e))?;
            }
            DrawCommand::Text { at, text, size, color, anchor, .. } => {
                let (h_pos, v_pos) = match anchor {
                    TextAnchor::Start => (HPos::Left, VPos::Bottom),
                    TextAnchor::Center => (HPos::Center, VPos::Bottom),
                };
                let style = ("sans-serif", *size)
                    .into_font()
                    .color(&to_rgba(*color))
                    .pos(Pos::new(h_pos, v_pos));
                root.draw(&Text::new(text.clone(), to_pixel(*at), style))
                    .map_err(|e| format!("Failed to draw text: {}", e))?;
            }
        }
    }

    root.present()
        .map_err(|e| format!("Failed to render chart: {}", e))?;

    Ok(())
}
