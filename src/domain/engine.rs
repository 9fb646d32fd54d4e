//! Batch validation engine.
//!
//! Each row is parsed, normalized into exchange time, and run through the
//! active rules. Nothing here returns an error for bad data: unparseable rows
//! become findings and unusable batches become [`BatchOutcome::Skipped`].

use crate::domain::error::TradeAuditError;
use crate::domain::report::{BatchOutcome, FindingCollector, FindingKind, ValidationReport};
use crate::domain::rule::{NormalizedTrade, active_rules};
use crate::domain::timezone::{NaiveTimePolicy, to_exchange_time};
use crate::domain::trade::{TradeBatch, TradeRecord};
use crate::ports::trade_source_port::TradeSourcePort;
use std::fmt;
use std::str::FromStr;

/// What to do with a batch that lacks the exit-reason columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Disable the exit-reason rules for that batch.
    #[default]
    Lenient,
    /// Skip the batch as unusable.
    Strict,
}

impl FromStr for SchemaPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(SchemaPolicy::Lenient),
            "strict" => Ok(SchemaPolicy::Strict),
            other => Err(format!("unknown schema policy '{other}' (expected lenient or strict)")),
        }
    }
}

impl fmt::Display for SchemaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaPolicy::Lenient => write!(f, "lenient"),
            SchemaPolicy::Strict => write!(f, "strict"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub schema_policy: SchemaPolicy,
    pub naive_time: NaiveTimePolicy,
}

/// Reject a batch whose schema the policy does not accept.
pub fn check_schema(batch: &TradeBatch, policy: SchemaPolicy) -> Result<(), TradeAuditError> {
    match policy {
        SchemaPolicy::Lenient => Ok(()),
        SchemaPolicy::Strict if batch.schema.exit_checks_enabled() => Ok(()),
        SchemaPolicy::Strict => Err(TradeAuditError::IncompleteSchema {
            batch: batch.name.clone(),
            missing: batch.schema.missing_exit_columns().join(", "),
        }),
    }
}

/// Run every active rule over every row of a batch.
pub fn validate_batch(batch: &TradeBatch, config: &ValidatorConfig) -> ValidationReport {
    let rules = active_rules(&batch.schema);
    let mut collector = FindingCollector::new();

    for (index, row) in batch.rows.iter().enumerate() {
        collector.record_checked();

        let parsed = match row {
            Ok(raw) => TradeRecord::parse(raw, &batch.schema),
            Err(e) => Err(e.clone()),
        };
        let record = match parsed {
            Ok(r) => r,
            Err(e) => {
                collector.push(
                    index,
                    FindingKind::ParseFailure,
                    format!("Unparseable record: {e}"),
                );
                continue;
            }
        };

        let trade = NormalizedTrade {
            record: &record,
            entry: to_exchange_time(record.entry_time, config.naive_time),
            exit: to_exchange_time(record.exit_time, config.naive_time),
        };
        for rule in &rules {
            if let Some(message) = rule.check(&trade) {
                collector.push(index, FindingKind::Rule(*rule), message);
            }
        }
    }

    log::debug!(
        "{}: {} rows, {} rules active, {} findings",
        batch.name,
        batch.len(),
        rules.len(),
        collector.len()
    );
    collector.finish(batch.name.clone())
}

/// Validate one batch, or skip it if its schema is rejected.
pub fn run_batch(batch: &TradeBatch, config: &ValidatorConfig) -> BatchOutcome {
    if let Err(e) = check_schema(batch, config.schema_policy) {
        log::warn!("skipping {} ({})", batch.name, e);
        return BatchOutcome::Skipped {
            batch: batch.name.clone(),
            reason: e.to_string(),
        };
    }
    if !batch.schema.exit_checks_enabled() {
        log::info!(
            "{}: exit-reason columns absent ({}), TP/SL checks disabled",
            batch.name,
            batch.schema.missing_exit_columns().join(", ")
        );
    }
    BatchOutcome::Validated(validate_batch(batch, config))
}

/// Validate every batch a source offers.
///
/// Fails only if the source cannot list its batches. A batch that cannot be
/// loaded is skipped and the rest continue.
pub fn validate_source(
    source: &dyn TradeSourcePort,
    config: &ValidatorConfig,
) -> Result<Vec<BatchOutcome>, TradeAuditError> {
    let names = source.list_batches()?;
    log::info!("found {} batch(es) to validate", names.len());

    let outcomes = names
        .iter()
        .map(|name| match source.load_batch(name) {
            Ok(batch) => run_batch(&batch, config),
            Err(e) => {
                log::warn!("skipping {} ({})", name, e);
                BatchOutcome::Skipped {
                    batch: name.clone(),
                    reason: e.to_string(),
                }
            }
        })
        .collect();
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::RecordError;
    use crate::domain::rule::RuleId;
    use crate::domain::trade::{BatchSchema, RawTradeRow};

    fn row(entry: &str, exit: &str, pnl: &str) -> RawTradeRow {
        RawTradeRow {
            entry_time: entry.into(),
            exit_time: exit.into(),
            entry_price: "100".into(),
            exit_price: "105".into(),
            shares: "10".into(),
            total_fees: "1".into(),
            pnl: pnl.into(),
            ..Default::default()
        }
    }

    fn good_row() -> RawTradeRow {
        row("2024-01-08T15:00:00Z", "2024-01-08T19:30:00Z", "49")
    }

    #[test]
    fn clean_batch_has_no_findings() {
        let batch = TradeBatch::new("b", BatchSchema::default(), vec![good_row(), good_row()]);
        let report = validate_batch(&batch, &ValidatorConfig::default());
        assert!(report.is_clean());
        assert_eq!(report.records_checked(), 2);
    }

    #[test]
    fn saturday_entry_and_pnl_mismatch() {
        let batch = TradeBatch::new(
            "b",
            BatchSchema::default(),
            vec![
                good_row(),
                row("2024-01-06T15:00:00Z", "2024-01-08T19:30:00Z", "40"),
            ],
        );
        let report = validate_batch(&batch, &ValidatorConfig::default());
        let findings = report.findings();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].record_index, 1);
        assert_eq!(findings[0].kind, FindingKind::Rule(RuleId::WeekendEntry));
        assert!(findings[0].message.contains("Saturday"));
        assert_eq!(findings[1].kind, FindingKind::Rule(RuleId::PnlConsistency));
        assert_eq!(findings[1].message, "P&L mismatch. Expected $49.00, got $40.00");
    }

    #[test]
    fn unparseable_row_yields_one_finding_and_batch_continues() {
        let bad = RawTradeRow {
            entry_price: "n/a".into(),
            entry_time: "2024-01-06T15:00:00Z".into(),
            ..good_row()
        };
        let batch = TradeBatch::new("b", BatchSchema::default(), vec![bad, good_row()]);
        let report = validate_batch(&batch, &ValidatorConfig::default());
        assert_eq!(report.total(), 1);
        let f = &report.findings()[0];
        assert_eq!(f.record_index, 0);
        assert_eq!(f.kind, FindingKind::ParseFailure);
        assert_eq!(f.message, "Unparseable record: invalid number in entry_price: \"n/a\"");
    }

    #[test]
    fn source_level_row_error_is_kept_in_position() {
        let mut batch = TradeBatch::new("b", BatchSchema::default(), vec![good_row()]);
        batch.rows.insert(
            0,
            Err(RecordError::Malformed {
                reason: "wrong field count".into(),
            }),
        );
        let report = validate_batch(&batch, &ValidatorConfig::default());
        assert_eq!(report.total(), 1);
        assert_eq!(report.findings()[0].record_index, 0);
        assert_eq!(
            report.findings()[0].message,
            "Unparseable record: malformed row: wrong field count"
        );
    }

    #[test]
    fn exit_rules_need_full_schema() {
        let flagged = RawTradeRow {
            tp: Some("1".into()),
            sl: Some("1".into()),
            ..good_row()
        };
        let partial = BatchSchema {
            has_tp: true,
            has_sl: true,
            ..Default::default()
        };
        let batch = TradeBatch::new("b", partial, vec![flagged.clone()]);
        assert!(validate_batch(&batch, &ValidatorConfig::default()).is_clean());

        let batch = TradeBatch::new("b", BatchSchema::extended(), vec![flagged]);
        let report = validate_batch(&batch, &ValidatorConfig::default());
        let codes: Vec<_> = report.findings().iter().map(|f| f.rule_id()).collect();
        assert_eq!(codes, vec!["R6", "R7", "R8"]);
        assert_eq!(report.findings()[0].message, "Both TP and SL marked as hit!");
    }

    #[test]
    fn strict_policy_skips_incomplete_batch() {
        let batch = TradeBatch::new("b.csv", BatchSchema::default(), vec![good_row()]);
        let config = ValidatorConfig {
            schema_policy: SchemaPolicy::Strict,
            ..Default::default()
        };
        match run_batch(&batch, &config) {
            BatchOutcome::Skipped { batch, reason } => {
                assert_eq!(batch, "b.csv");
                assert!(reason.contains("TP, SL, target_price, stop_price"));
            }
            other => panic!("expected skip, got {other:?}"),
        }

        let lenient = run_batch(&batch, &ValidatorConfig::default());
        assert!(lenient.report().unwrap().is_clean());
    }

    #[test]
    fn naive_policy_changes_hours() {
        // 21:00 naive: UTC -> 16:00 ET (fine), exchange-local -> 21:00 ET (late)
        let late = row("2024-01-08 15:00:00", "2024-01-08 21:00:00", "49");
        let batch = TradeBatch::new("b", BatchSchema::default(), vec![late]);

        let utc = validate_batch(&batch, &ValidatorConfig::default());
        assert!(utc.is_clean());

        let exchange = ValidatorConfig {
            naive_time: NaiveTimePolicy::Exchange,
            ..Default::default()
        };
        let report = validate_batch(&batch, &exchange);
        assert_eq!(report.total(), 1);
        assert_eq!(report.findings()[0].kind, FindingKind::Rule(RuleId::ExitHours));
    }

    #[test]
    fn policies_parse() {
        assert_eq!("Strict".parse::<SchemaPolicy>(), Ok(SchemaPolicy::Strict));
        assert_eq!("lenient".parse::<SchemaPolicy>(), Ok(SchemaPolicy::Lenient));
        assert!("loose".parse::<SchemaPolicy>().is_err());
        assert_eq!(SchemaPolicy::Strict.to_string(), "strict");
    }
}
