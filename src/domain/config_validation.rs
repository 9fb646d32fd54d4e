//! Configuration validation.
//!
//! Checks config values before any batch is read.

use crate::domain::engine::SchemaPolicy;
use crate::domain::error::TradeAuditError;
use crate::domain::timezone::NaiveTimePolicy;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const METRIC_NUMBER_KEYS: [&str; 8] = [
    "total_return",
    "total_pnl",
    "annualized_return",
    "win_rate",
    "total_trades",
    "winning_trades",
    "sharpe_ratio",
    "initial_capital",
];

pub fn validate_validator_config(config: &dyn ConfigPort) -> Result<(), TradeAuditError> {
    validate_schema_policy(config)?;
    validate_naive_time(config)?;
    validate_non_empty(config, "results_dir")?;
    validate_pattern(config)?;
    Ok(())
}

pub fn validate_metrics_config(config: &dyn ConfigPort) -> Result<(), TradeAuditError> {
    for key in METRIC_NUMBER_KEYS {
        parse_metric(config, key)?;
    }
    validate_trade_counts(config)?;
    validate_capital(config)?;
    validate_metric_dates(config)?;
    Ok(())
}

fn validate_schema_policy(config: &dyn ConfigPort) -> Result<(), TradeAuditError> {
    if let Some(value) = config.get_string("validator", "schema_policy") {
        value
            .parse::<SchemaPolicy>()
            .map_err(|reason| invalid("validator", "schema_policy", reason))?;
    }
    Ok(())
}

fn validate_naive_time(config: &dyn ConfigPort) -> Result<(), TradeAuditError> {
    if let Some(value) = config.get_string("validator", "naive_time") {
        value
            .parse::<NaiveTimePolicy>()
            .map_err(|reason| invalid("validator", "naive_time", reason))?;
    }
    Ok(())
}

fn validate_non_empty(config: &dyn ConfigPort, key: &str) -> Result<(), TradeAuditError> {
    match config.get_string("validator", key) {
        Some(s) if s.trim().is_empty() => Err(invalid(
            "validator",
            key,
            format!("{key} must not be empty"),
        )),
        _ => Ok(()),
    }
}

fn validate_pattern(config: &dyn ConfigPort) -> Result<(), TradeAuditError> {
    validate_non_empty(config, "pattern")?;
    if let Some(pattern) = config.get_string("validator", "pattern") {
        if pattern.matches('*').count() > 1 {
            return Err(invalid(
                "validator",
                "pattern",
                "pattern may contain at most one '*'".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_trade_counts(config: &dyn ConfigPort) -> Result<(), TradeAuditError> {
    let total = parse_metric(config, "total_trades")?;
    let winning = parse_metric(config, "winning_trades")?;
    for (key, value) in [("total_trades", total), ("winning_trades", winning)] {
        if value < 0.0 || value.fract() != 0.0 {
            return Err(invalid(
                "metrics",
                key,
                format!("{key} must be a non-negative whole number"),
            ));
        }
    }
    if winning > total {
        return Err(invalid(
            "metrics",
            "winning_trades",
            "winning_trades cannot exceed total_trades".to_string(),
        ));
    }
    Ok(())
}

fn validate_capital(config: &dyn ConfigPort) -> Result<(), TradeAuditError> {
    if parse_metric(config, "initial_capital")? < 0.0 {
        return Err(invalid(
            "metrics",
            "initial_capital",
            "initial_capital must be non-negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_metric_dates(config: &dyn ConfigPort) -> Result<(), TradeAuditError> {
    let start = parse_metric_date(config, "start_date")?;
    let end = parse_metric_date(config, "end_date")?;
    if start > end {
        return Err(invalid(
            "metrics",
            "start_date",
            "start_date must not be after end_date".to_string(),
        ));
    }
    Ok(())
}

/// Read a required numeric `[metrics]` value. `nan` and `inf` are accepted
/// because the summary check reports them.
pub fn parse_metric(config: &dyn ConfigPort, key: &str) -> Result<f64, TradeAuditError> {
    let raw = config
        .get_string("metrics", key)
        .ok_or_else(|| TradeAuditError::ConfigMissing {
            section: "metrics".to_string(),
            key: key.to_string(),
        })?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| invalid("metrics", key, format!("invalid number '{raw}'")))
}

pub fn parse_metric_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, TradeAuditError> {
    let raw = config
        .get_string("metrics", key)
        .ok_or_else(|| TradeAuditError::ConfigMissing {
            section: "metrics".to_string(),
            key: key.to_string(),
        })?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        invalid(
            "metrics",
            key,
            format!("invalid {key} format, expected YYYY-MM-DD"),
        )
    })
}

fn invalid(section: &str, key: &str, reason: String) -> TradeAuditError {
    TradeAuditError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
