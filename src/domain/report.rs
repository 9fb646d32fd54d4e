//! Findings and the per-batch validation report.

use crate::domain::rule::RuleId;
use std::fmt;

/// Number of findings in the human-facing preview.
pub const PREVIEW_LIMIT: usize = 10;

/// What produced a finding. Parse failures sort ahead of rule findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FindingKind {
    ParseFailure,
    Rule(RuleId),
}

impl FindingKind {
    pub fn code(&self) -> &'static str {
        match self {
            FindingKind::ParseFailure => "PARSE",
            FindingKind::Rule(rule) => rule.code(),
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub record_index: usize,
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    pub fn rule_id(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.record_index, self.message)
    }
}

/// Problem areas used to group remediation hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingCategory {
    ParseFailure,
    Weekend,
    SessionHours,
    Pnl,
    ExitConflict,
    ExitPrice,
}

impl FindingCategory {
    pub fn of(kind: FindingKind) -> Self {
        match kind {
            FindingKind::ParseFailure => FindingCategory::ParseFailure,
            FindingKind::Rule(RuleId::WeekendEntry | RuleId::WeekendExit) => FindingCategory::Weekend,
            FindingKind::Rule(RuleId::EntryHours | RuleId::ExitHours) => {
                FindingCategory::SessionHours
            }
            FindingKind::Rule(RuleId::PnlConsistency) => FindingCategory::Pnl,
            FindingKind::Rule(RuleId::TpSlExclusive) => FindingCategory::ExitConflict,
            FindingKind::Rule(RuleId::TpPrice | RuleId::SlPrice) => FindingCategory::ExitPrice,
        }
    }

    pub fn suggestion(self) -> &'static str {
        match self {
            FindingCategory::ParseFailure => {
                "Some rows could not be parsed. Check the exporter for empty or non-numeric cells."
            }
            FindingCategory::Weekend => {
                "Weekend trades detected. Check the data source for incorrect timestamps \
                 or ensure the backtester skips weekends."
            }
            FindingCategory::SessionHours => {
                "Trades outside market hours detected. Verify the data source provides \
                 correct timestamps and that the strategy respects trading hours."
            }
            FindingCategory::Pnl => {
                "P&L calculation mismatches found. Verify the fee calculations and \
                 entry/exit prices."
            }
            FindingCategory::ExitConflict => {
                "Take profit and stop loss both triggered on the same trade. \
                 Review the strategy exit logic for race conditions."
            }
            FindingCategory::ExitPrice => {
                "Exit prices do not match the recorded target or stop. Check how fills \
                 are simulated when a take profit or stop loss triggers."
            }
        }
    }
}

/// Accumulates findings for a single batch.
#[derive(Debug, Default)]
pub struct FindingCollector {
    findings: Vec<Finding>,
    records_checked: usize,
}

impl FindingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record_index: usize, kind: FindingKind, message: impl Into<String>) {
        self.findings.push(Finding {
            record_index,
            kind,
            message: message.into(),
        });
    }

    pub fn record_checked(&mut self) {
        self.records_checked += 1;
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Seal the findings into a report ordered by record then rule.
    pub fn finish(mut self, batch: impl Into<String>) -> ValidationReport {
        self.findings.sort_by_key(|f| (f.record_index, f.kind));
        ValidationReport {
            batch: batch.into(),
            findings: self.findings,
            records_checked: self.records_checked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    batch: String,
    findings: Vec<Finding>,
    records_checked: usize,
}

impl ValidationReport {
    pub fn batch(&self) -> &str {
        &self.batch
    }

    pub fn total(&self) -> usize {
        self.findings.len()
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn records_checked(&self) -> usize {
        self.records_checked
    }

    /// Every finding, in report order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// The first [`PREVIEW_LIMIT`] findings.
    pub fn preview(&self) -> &[Finding] {
        &self.findings[..self.findings.len().min(PREVIEW_LIMIT)]
    }

    /// How many findings the preview leaves out.
    pub fn remainder(&self) -> usize {
        self.findings.len().saturating_sub(PREVIEW_LIMIT)
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    /// One hint per problem area present, in a fixed order.
    pub fn suggestions(&self) -> Vec<&'static str> {
        let mut categories: Vec<FindingCategory> = self
            .findings
            .iter()
            .map(|f| FindingCategory::of(f.kind))
            .collect();
        categories.sort();
        categories.dedup();
        categories.into_iter().map(FindingCategory::suggestion).collect()
    }
}

/// Result of handling one input source.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Validated(ValidationReport),
    Skipped { batch: String, reason: String },
}

impl BatchOutcome {
    pub fn batch(&self) -> &str {
        match self {
            BatchOutcome::Validated(report) => report.batch(),
            BatchOutcome::Skipped { batch, .. } => batch,
        }
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            BatchOutcome::Validated(report) => Some(report),
            BatchOutcome::Skipped { .. } => None,
        }
    }
}
