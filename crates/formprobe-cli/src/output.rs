//! Report rendering

use crate::commands::{ExportFormat, ReportFormat};
use crate::error::CliResult;
use console::style;
use formprobe::{Outcome, RunReport, Scenario};

/// Render a run report for stdout
pub fn render_report(report: &RunReport, format: ReportFormat, use_color: bool) -> CliResult<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Text => Ok(render_text(report, use_color)),
    }
}

fn render_text(report: &RunReport, use_color: bool) -> String {
    let badge = match report.outcome {
        Outcome::Passed => style("PASSED").green().bold(),
        Outcome::Failed => style("FAILED").red().bold(),
    };
    let mut out = format!(
        "{} {} ({} steps, {}ms)\n",
        badge.force_styling(use_color),
        report.title,
        report.steps_executed,
        report.elapsed_ms
    );
    if report.outcome == Outcome::Failed {
        if let Some(expected) = &report.expected {
            out.push_str(&format!("  expected: {expected:?}\n"));
        }
        match &report.actual {
            Some(actual) => out.push_str(&format!("  actual:   {actual:?}\n")),
            None => out.push_str("  actual:   <no text>\n"),
        }
    }
    out.push_str(&format!("  screenshot: {}", report.screenshot.display()));
    out
}

/// Serialize a scenario for export
pub fn render_scenario(scenario: &Scenario, format: ExportFormat) -> CliResult<String> {
    Ok(match format {
        ExportFormat::Yaml => scenario.to_yaml()?,
        ExportFormat::Json => scenario.to_json()?,
    })
}

/// One-line confirmation for `validate`
#[must_use]
pub fn render_validation(scenario: &Scenario, use_color: bool) -> String {
    let mark = style("✓").green().force_styling(use_color);
    let assertion = scenario
        .assertion()
        .map_or_else(|| "no text assertion".to_string(), |(selectors, expected)| {
            format!("asserts {selectors} == {expected:?}")
        });
    format!(
        "{mark} {}: {} steps, {assertion}",
        scenario.title,
        scenario.steps.len()
    )
}
