pub mod types;

pub use types::{FitQuality, Report};

use crate::model::TrainingOutcome;
use crate::persist;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from the outcome of a training run.
pub fn build(outcome: TrainingOutcome) -> Report {
    Report {
        quality: FitQuality::from_r_squared(outcome.metrics.r_squared),
        trainer: outcome.trainer,
        model_path: outcome.model_path,
        loaded_rows: outcome.loaded_rows,
        training_rows: outcome.training_rows,
        feature_width: outcome.feature_width,
        metrics: outcome.metrics,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(trainer = %report.trainer, quality = %report.quality))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

/// Print the report to the terminal.
fn print_terminal_report(report: &Report) {
    print!("{}", render_terminal_report(report));
}

/// Terminal layout:
///
/// ═══ Regression Metrics: CoordinateDescentRegression ═══
/// Training rows: 480 of 500 | Test rows: 500 | Features: 73
///   • R-squared:               0.4213
///   • Mean absolute error:     31.25
///   • Mean squared error:      3469.00
///   • Root mean squared error: 58.90
/// Model saved to model.json
///
/// ═══ Fit Quality: FAIR ═══
fn render_terminal_report(report: &Report) -> String {
    let m = &report.metrics;
    let mut out = String::from("\n");
    out.push_str(&format!("═══ Regression Metrics: {} ═══\n", report.trainer));
    out.push_str(&format!(
        "Training rows: {} of {} | Test rows: {} | Features: {}\n",
        report.training_rows, report.loaded_rows, m.rows, report.feature_width
    ));
    out.push_str(&format!("  • R-squared:               {:.4}\n", m.r_squared));
    out.push_str(&format!("  • Mean absolute error:     {:.2}\n", m.mean_absolute_error));
    out.push_str(&format!("  • Mean squared error:      {:.2}\n", m.mean_squared_error));
    out.push_str(&format!("  • Root mean squared error: {:.2}\n", m.root_mean_squared_error));
    out.push_str(&format!("Model saved to {}\n\n", report.model_path.display()));
    out.push_str(&format!("═══ Fit Quality: {} ═══\n\n", colorize_quality(report.quality)));
    out
}

/// Write the report as a markdown file, replacing any existing one.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let m = &report.metrics;
    let mut md = String::new();
    md.push_str(&format!("# Regression Metrics: {}\n\n", report.trainer));
    md.push_str(&format!(
        "**Training rows:** {} of {} | **Test rows:** {} | **Features:** {}\n\n",
        report.training_rows, report.loaded_rows, m.rows, report.feature_width
    ));
    md.push_str("| Metric | Value |\n|---|---|\n");
    md.push_str(&format!("| R-squared | {:.4} |\n", m.r_squared));
    md.push_str(&format!("| Mean absolute error | {:.2} |\n", m.mean_absolute_error));
    md.push_str(&format!("| Mean squared error | {:.2} |\n", m.mean_squared_error));
    md.push_str(&format!("| Root mean squared error | {:.2} |\n\n", m.root_mean_squared_error));
    md.push_str(&format!("Model saved to `{}`\n\n", report.model_path.display()));
    md.push_str(&format!("## Fit Quality: {}\n", report.quality));

    persist::write_replacing(path, md.as_bytes())?;
    Ok(())
}

fn colorize_quality(quality: FitQuality) -> colored::ColoredString {
    match quality {
        FitQuality::Poor => "POOR".red().bold(),
        FitQuality::Fair => "FAIR".yellow().bold(),
        FitQuality::Good => "GOOD".green().bold(),
    }
}
