//! Plain-text report adapter implementing ReportPort.

use crate::domain::registry::StrategyProfile;
use crate::domain::report::{BatchOutcome, ValidationReport};
use crate::domain::summary::SummaryAnomaly;
use crate::ports::report_port::ReportPort;

pub const SUCCESS_LINE: &str = "No anomalies found. Logic looks consistent with parameters.";

#[derive(Debug, Clone, Copy, Default)]
pub struct TextReportAdapter {
    /// List every finding instead of the first ten.
    pub show_all: bool,
    /// Append remediation hints after the findings.
    pub suggestions: bool,
}

impl TextReportAdapter {
    pub fn new(show_all: bool, suggestions: bool) -> Self {
        Self {
            show_all,
            suggestions,
        }
    }

    fn render_report(&self, report: &ValidationReport) -> String {
        let mut output = String::new();

        if report.records_checked() == 0 {
            output.push_str("  Empty file.\n");
            return output;
        }
        if report.is_clean() {
            output.push_str(&format!("  {SUCCESS_LINE}\n"));
            return output;
        }

        output.push_str(&format!("  Found {} anomalies:\n", report.total()));
        let shown = if self.show_all {
            report.findings()
        } else {
            report.preview()
        };
        for finding in shown {
            output.push_str(&format!("    - {finding}\n"));
        }
        if !self.show_all && report.remainder() > 0 {
            output.push_str(&format!("    ... and {} more.\n", report.remainder()));
        }

        if self.suggestions {
            output.push_str("  Suggestions:\n");
            for hint in report.suggestions() {
                output.push_str(&format!("    * {hint}\n"));
            }
        }
        output
    }
}

impl ReportPort for TextReportAdapter {
    fn render(&self, outcome: &BatchOutcome, strategy: Option<&StrategyProfile>) -> String {
        let mut output = format!("\n--- Validating {} ---\n", outcome.batch());
        if let Some(profile) = strategy {
            output.push_str(&format!(
                "  Strategy: {} ({})\n",
                profile.display_name, profile.name
            ));
        }

        match outcome {
            BatchOutcome::Validated(report) => output.push_str(&self.render_report(report)),
            BatchOutcome::Skipped { reason, .. } => {
                output.push_str(&format!("  Skipped: {reason}\n"));
            }
        }
        output
    }
}

/// Render the result of the summary-metrics check.
pub fn render_summary(anomalies: &[SummaryAnomaly]) -> String {
    if anomalies.is_empty() {
        return "Summary metrics are consistent.\n".to_string();
    }
    let mut output = format!("Found {} summary anomalies:\n", anomalies.len());
    for anomaly in anomalies {
        output.push_str(&format!("  - [{}] {}\n", anomaly.check, anomaly.message));
    }
    output
}
