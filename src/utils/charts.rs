//! SVG Chart Generator
//!
//! Renders the two charts written after training: the train/test loss curves
//! and the confusion-matrix heat-map. Output is plain SVG so no plotting
//! backend is needed.

use std::fs;
use std::path::Path;

use crate::utils::metrics::ConfusionMatrix;

/// Chart styling constants
const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 500.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 80.0;

pub const COLOR_PRIMARY: &str = "#3498db";
pub const COLOR_SECONDARY: &str = "#e67e22";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// Heat-map cell size and label gutter for the confusion matrix
const CELL_SIZE: f64 = 44.0;
const HEATMAP_GUTTER: f64 = 170.0;

/// A data point for a line chart
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

/// A data series for charts
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
    pub color: String,
}

impl DataSeries {
    /// Build a series from per-epoch values (x = 1-based epoch)
    pub fn per_epoch(name: &str, values: &[f64], color: &str) -> Self {
        Self {
            name: name.to_string(),
            points: values
                .iter()
                .enumerate()
                .map(|(i, &y)| DataPoint {
                    x: (i + 1) as f64,
                    y,
                })
                .collect(),
            color: color.to_string(),
        }
    }
}

fn svg_header(svg: &mut String, width: f64, height: f64) {
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        width, height, width, height
    ));
    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        width, height
    ));
}

fn svg_title(svg: &mut String, width: f64, title: &str) {
    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        width / 2.0, COLOR_TEXT, escape_xml(title)
    ));
}

/// Render a line chart as an SVG document
///
/// The y axis starts at zero and ends at the largest value in any series.
pub fn render_line_chart(title: &str, x_label: &str, y_label: &str, series: &[DataSeries]) -> String {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let (x_min, mut x_max, _, y_max) = find_ranges(series);
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    let y_min = 0.0;
    let y_max = if y_max.is_finite() && y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let to_x = |x: f64| MARGIN_LEFT + ((x - x_min) / (x_max - x_min)) * plot_width;
    let to_y = |y: f64| MARGIN_TOP + plot_height - ((y - y_min) / (y_max - y_min)) * plot_height;

    let mut svg = String::new();
    svg_header(&mut svg, CHART_WIDTH, CHART_HEIGHT);
    svg_title(&mut svg, CHART_WIDTH, title);

    // Grid lines
    for i in 0..=5 {
        let y = MARGIN_TOP + plot_height - (i as f64 / 5.0) * plot_height;
        let value = y_min + (i as f64 / 5.0) * (y_max - y_min);

        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT, y, MARGIN_LEFT + plot_width, y, COLOR_GRID
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.2}</text>"#,
            MARGIN_LEFT - 10.0, y + 4.0, COLOR_TEXT, value
        ));
    }

    // Axes
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP + plot_height, MARGIN_LEFT + plot_width, MARGIN_TOP + plot_height, COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, MARGIN_TOP + plot_height, COLOR_AXIS
    ));

    // Axis labels
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0, CHART_HEIGHT - 20.0, COLOR_TEXT, escape_xml(x_label)
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">{}</text>"#,
        CHART_HEIGHT / 2.0, COLOR_TEXT, CHART_HEIGHT / 2.0, escape_xml(y_label)
    ));

    for series_data in series {
        if series_data.points.is_empty() {
            continue;
        }

        let path = series_data
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let cmd = if i == 0 { "M" } else { "L" };
                format!("{} {:.2} {:.2}", cmd, to_x(p.x), to_y(p.y))
            })
            .collect::<Vec<_>>()
            .join(" ");

        svg.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="3"/>"#,
            path, series_data.color
        ));

        for point in &series_data.points {
            svg.push_str(&format!(
                r#"<circle cx="{:.2}" cy="{:.2}" r="4" fill="{}" stroke="white" stroke-width="2"/>"#,
                to_x(point.x), to_y(point.y), series_data.color
            ));
        }
    }

    // X-axis tick labels from the first series
    if let Some(first) = series.first() {
        for point in &first.points {
            svg.push_str(&format!(
                r#"<text x="{:.2}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{:.0}</text>"#,
                to_x(point.x), MARGIN_TOP + plot_height + 20.0, COLOR_TEXT, point.x
            ));
        }
    }

    // Legend
    let mut legend_y = MARGIN_TOP + 10.0;
    for series_data in series {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}"/>"#,
            CHART_WIDTH - MARGIN_RIGHT - 150.0, legend_y, series_data.color
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            CHART_WIDTH - MARGIN_RIGHT - 130.0, legend_y + 12.0, COLOR_TEXT, escape_xml(&series_data.name)
        ));
        legend_y += 25.0;
    }

    svg.push_str("</svg>");
    svg
}

/// Write the train/test loss curves
pub fn save_loss_curves(train_losses: &[f64], test_losses: &[f64], output_path: &Path) -> std::io::Result<()> {
    let series = [
        DataSeries::per_epoch("Training Loss", train_losses, COLOR_PRIMARY),
        DataSeries::per_epoch("Validation Loss", test_losses, COLOR_SECONDARY),
    ];
    let svg = render_line_chart("Training and Validation Loss", "Epochs", "Loss", &series);
    fs::write(output_path, svg)
}

/// Render a confusion matrix heat-map (rows = true label, columns = predicted)
pub fn render_confusion_matrix(cm: &ConfusionMatrix, class_names: &[String]) -> String {
    let n = cm.num_classes;
    let grid = n as f64 * CELL_SIZE;
    let width = HEATMAP_GUTTER + grid + MARGIN_RIGHT;
    let height = MARGIN_TOP + grid + HEATMAP_GUTTER;
    let max_count = cm.max_count().max(1) as f64;

    let label = |idx: usize| {
        class_names
            .get(idx)
            .cloned()
            .unwrap_or_else(|| idx.to_string())
    };

    let mut svg = String::new();
    svg_header(&mut svg, width, height);
    svg_title(&mut svg, width, "Confusion Matrix");

    for row in 0..n {
        for col in 0..n {
            let count = cm.get(row, col);
            let intensity = count as f64 / max_count;
            let x = HEATMAP_GUTTER + col as f64 * CELL_SIZE;
            let y = MARGIN_TOP + row as f64 * CELL_SIZE;

            svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="white" stroke-width="1"/>"#,
                x, y, CELL_SIZE, CELL_SIZE, blues(intensity)
            ));

            let text_color = if intensity > 0.5 { "white" } else { COLOR_TEXT };
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
                x + CELL_SIZE / 2.0, y + CELL_SIZE / 2.0 + 4.0, text_color, count
            ));
        }
    }

    // True labels down the left side
    for row in 0..n {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="11" fill="{}">{}</text>"#,
            HEATMAP_GUTTER - 8.0,
            MARGIN_TOP + row as f64 * CELL_SIZE + CELL_SIZE / 2.0 + 4.0,
            COLOR_TEXT,
            escape_xml(&label(row))
        ));
    }

    // Predicted labels rotated along the bottom
    for col in 0..n {
        let x = HEATMAP_GUTTER + col as f64 * CELL_SIZE + CELL_SIZE / 2.0;
        let y = MARGIN_TOP + grid + 10.0;
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="11" fill="{}" transform="rotate(-60 {} {})">{}</text>"#,
            x, y, COLOR_TEXT, x, y, escape_xml(&label(col))
        ));
    }

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">Predicted labels</text>"#,
        HEATMAP_GUTTER + grid / 2.0, height - 15.0, COLOR_TEXT
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">True labels</text>"#,
        MARGIN_TOP + grid / 2.0, COLOR_TEXT, MARGIN_TOP + grid / 2.0
    ));

    svg.push_str("</svg>");
    svg
}

/// Write the confusion matrix heat-map
pub fn save_confusion_matrix(cm: &ConfusionMatrix, class_names: &[String], output_path: &Path) -> std::io::Result<()> {
    fs::write(output_path, render_confusion_matrix(cm, class_names))
}

/// White-to-blue ramp for intensity in [0, 1]
fn blues(intensity: f64) -> String {
    let t = intensity.clamp(0.0, 1.0);
    let lerp = |from: f64, to: f64| (from + (to - from) * t).round() as u8;
    format!("#{:02x}{:02x}{:02x}", lerp(247.0, 8.0), lerp(251.0, 48.0), lerp(255.0, 107.0))
}

fn find_ranges(series: &[DataSeries]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for s in series {
        for p in &s.points {
            x_min = x_min.min(p.x);
            x_max = x_max.max(p.x);
            y_min = y_min.min(p.y);
            y_max = y_max.max(p.y);
        }
    }

    if !x_min.is_finite() {
        x_min = 0.0;
        x_max = 1.0;
    }

    (x_min, x_max, y_min, y_max)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
