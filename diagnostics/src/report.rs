//! Human and machine readable renderings of a diagnostics run.

use crate::summary::TestSummary;
use crate::types::TestResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown report format '{input}' (expected text or json)")]
    UnknownFormat { input: String },
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ReportError::UnknownFormat {
                input: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport<'a> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: TestSummary,
    pub results: &'a [TestResult],
}

impl<'a> DiagnosticsReport<'a> {
    pub fn new(results: &'a [TestResult], summary: TestSummary) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            summary,
            results,
        }
    }
}

pub fn render_report(
    results: &[TestResult],
    summary: &TestSummary,
    format: ReportFormat,
) -> ReportResult<String> {
    match format {
        ReportFormat::Json => {
            let report = DiagnosticsReport::new(results, *summary);
            Ok(serde_json::to_string_pretty(&report)?)
        }
        ReportFormat::Text => Ok(render_text(results, summary)),
    }
}

/// One line per status change, used for live progress output.
pub fn render_live_line(result: &TestResult) -> String {
    let badge = result.status.badge();
    let mut line = format!(
        "{} {:<7} {:<28} {}",
        badge.symbol, badge.label, result.id, result.message
    );
    if let Some(ms) = result.duration_ms() {
        let _ = write!(line, " ({ms}ms)");
    }
    line
}

fn render_text(results: &[TestResult], summary: &TestSummary) -> String {
    let mut out = String::new();

    for result in results {
        let badge = result.status.badge();
        let duration = result
            .duration_ms()
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        let critical = if result.critical { "*" } else { " " };

        let _ = writeln!(
            out,
            "{} {:<7} {:<4} {}{:<28} {:>8}  {}",
            badge.symbol,
            badge.label,
            result.category.meta().tag,
            critical,
            result.id,
            duration,
            result.message
        );
    }

    if !results.is_empty() {
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "{} total: {} passed, {} warnings, {} failed, {} not run (critical {}/{} passed)",
        summary.total,
        summary.passed,
        summary.warnings,
        summary.failed,
        summary.idle + summary.running,
        summary.critical_passed,
        summary.critical
    );
    let _ = write!(out, "Overall: {:?}", summary.overall());
    out
}
