//! Artifact rendering: frequency table or horizontal bar chart.
//!
//! The decision rule is fixed: more than `chart_threshold` distinct
//! responses renders as a data table, otherwise as a bar chart. Charts are
//! rasterized with plotters to a transient PNG in the OS temp dir, read back
//! into memory, and the file is removed again before the artifact leaves
//! this module.

use crate::config::ReportConfig;
use crate::models::{Artifact, ChartArtifact, FrequencyDistribution, TableArtifact, TableRowData};
use plotters::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum length of the sanitized question token used in chart filenames.
const FILENAME_TOKEN_LEN: usize = 50;

/// Bar fill color, matching the house style of earlier reports.
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Recoverable rendering failure; the caller skips the question.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("chart rendering failed: {0}")]
    Backend(String),

    #[error("failed to read chart image: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the document artifact for one question.
pub fn render_artifact(
    dist: &FrequencyDistribution,
    report: &ReportConfig,
) -> Result<Artifact, RenderError> {
    if dist.distinct_count() > report.chart_threshold {
        debug!(
            "'{}': {} distinct values, rendering as table",
            dist.question(),
            dist.distinct_count()
        );
        Ok(Artifact::Table(build_table(dist)))
    } else {
        debug!(
            "'{}': {} distinct values, rendering as chart",
            dist.question(),
            dist.distinct_count()
        );
        render_chart(dist, report).map(Artifact::Chart)
    }
}

/// Build the table artifact: rows in descending-count order with
/// one-decimal percentages.
fn build_table(dist: &FrequencyDistribution) -> TableArtifact {
    let rows = dist
        .sorted_entries()
        .into_iter()
        .map(|(response, count)| TableRowData {
            response: response.to_string(),
            count,
            percentage: (dist.percentage(count) * 10.0).round() / 10.0,
        })
        .collect();

    TableArtifact { rows }
}

/// Removes the transient chart file when dropped, on success and failure
/// paths alike.
struct TempChart(PathBuf);

impl Drop for TempChart {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.0) {
            warn!(
                "Could not remove transient chart {}: {}",
                self.0.display(),
                err
            );
        }
    }
}

/// Render the bar chart for a distribution and return it as PNG bytes.
///
/// The image is written under a filename derived from the sanitized
/// question id; if that write fails, one retry under a hash-based filename
/// is attempted before giving up.
fn render_chart(
    dist: &FrequencyDistribution,
    report: &ReportConfig,
) -> Result<ChartArtifact, RenderError> {
    let dir = std::env::temp_dir();
    let token = sanitize_token(dist.question());
    let primary = dir.join(format!("chart_{}.png", token));

    let path = match draw_chart(&primary, dist, report) {
        Ok(()) => primary,
        Err(err) => {
            warn!(
                "Chart write failed for '{}' ({}), retrying with hashed filename",
                dist.question(),
                err
            );
            // The backend may have partially written the primary file.
            let _ = std::fs::remove_file(&primary);
            let fallback = dir.join(format!("chart_{:016x}.png", hash_token(dist.question())));
            draw_chart(&fallback, dist, report)?;
            fallback
        }
    };

    let guard = TempChart(path);
    let png = std::fs::read(&guard.0)?;

    Ok(ChartArtifact {
        png,
        width_px: report.chart_width_px,
        height_px: report.chart_height_px,
    })
}

/// Draw the horizontal bar chart to `path`.
///
/// Bars are ordered top-to-bottom by descending count, annotated with their
/// percentage of the total; the x-range extends 15% past the longest bar to
/// leave room for the labels. No titles, no x ticks, black plot frame.
fn draw_chart(
    path: &Path,
    dist: &FrequencyDistribution,
    report: &ReportConfig,
) -> Result<(), RenderError> {
    let sorted = dist.sorted_entries();
    let n = sorted.len() as i32;
    let max = sorted.first().map(|(_, count)| *count).unwrap_or(0) as f64;
    let x_max = if max > 0.0 { max * 1.15 } else { 1.0 };

    // Segment i counts from the bottom; reversing the descending order puts
    // the most frequent response at the top.
    let labels: Vec<String> = sorted.iter().rev().map(|(v, _)| v.to_string()).collect();

    let root = BitMapBackend::new(path, (report.chart_width_px, report.chart_height_px))
        .into_drawing_area();
    root.fill(&WHITE).map_err(backend_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .x_label_area_size(0)
        .y_label_area_size(240)
        .build_cartesian_2d(0f64..x_max, (0..n).into_segmented())
        .map_err(backend_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_labels(sorted.len())
        .y_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) => labels
                .get(*i as usize)
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        })
        .label_style(("sans-serif", 16))
        .axis_style(BLACK.stroke_width(2))
        .draw()
        .map_err(backend_err)?;

    for (rank, (_, count)) in sorted.iter().enumerate() {
        let segment = n - 1 - rank as i32;
        let value = *count as f64;

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(segment)),
                    (value, SegmentValue::Exact(segment + 1)),
                ],
                BAR_COLOR.filled(),
            )))
            .map_err(backend_err)?;

        chart
            .draw_series(std::iter::once(Text::new(
                format!("{:.1}%", dist.percentage(*count)),
                (value + max * 0.02, SegmentValue::CenterOf(segment)),
                ("sans-serif", 16),
            )))
            .map_err(backend_err)?;
    }

    // Closed black frame around the plot area.
    chart
        .draw_series(std::iter::once(Rectangle::new(
            [
                (0.0, SegmentValue::Exact(0)),
                (x_max, SegmentValue::Exact(n)),
            ],
            BLACK.stroke_width(2),
        )))
        .map_err(backend_err)?;

    root.present().map_err(backend_err)?;
    Ok(())
}

fn backend_err<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Backend(err.to_string())
}

/// Reduce a question id to a filename-safe alphanumeric token.
fn sanitize_token(question: &str) -> String {
    question
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(FILENAME_TOKEN_LEN)
        .collect()
}

fn hash_token(question: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    question.hash(&mut hasher);
    hasher.finish()
}
