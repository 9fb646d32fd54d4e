//! Trade records and batch schema.
//!
//! A [`RawTradeRow`] is what a source hands over: strings keyed by column.
//! [`TradeRecord::parse`] turns it into the typed, immutable record the rules
//! work on.

use crate::domain::error::RecordError;
use crate::domain::timezone::{RawInstant, parse_instant};
use serde::Deserialize;

/// Columns every batch must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "entry_time",
    "exit_time",
    "entry_price",
    "exit_price",
    "shares",
    "total_fees",
    "pnl",
];

/// Optional exit-reason columns. All four must be present for the
/// exit-reason rules to run.
pub const EXIT_REASON_COLUMNS: [&str; 4] = ["TP", "SL", "target_price", "stop_price"];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTradeRow {
    pub entry_time: String,
    pub exit_time: String,
    pub entry_price: String,
    pub exit_price: String,
    pub shares: String,
    pub total_fees: String,
    pub pnl: String,
    #[serde(rename = "TP", default)]
    pub tp: Option<String>,
    #[serde(rename = "SL", default)]
    pub sl: Option<String>,
    #[serde(default)]
    pub target_price: Option<String>,
    #[serde(default)]
    pub stop_price: Option<String>,
}

/// Which optional columns a batch header declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSchema {
    pub has_tp: bool,
    pub has_sl: bool,
    pub has_target_price: bool,
    pub has_stop_price: bool,
}

impl BatchSchema {
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let has = |name: &str| headers.iter().any(|h| h.as_ref().trim() == name);
        Self {
            has_tp: has("TP"),
            has_sl: has("SL"),
            has_target_price: has("target_price"),
            has_stop_price: has("stop_price"),
        }
    }

    /// A schema that carries every exit-reason column.
    pub fn extended() -> Self {
        Self {
            has_tp: true,
            has_sl: true,
            has_target_price: true,
            has_stop_price: true,
        }
    }

    /// Whether the exit-reason rules apply to this batch.
    pub fn exit_checks_enabled(&self) -> bool {
        self.has_tp && self.has_sl && self.has_target_price && self.has_stop_price
    }

    pub fn missing_exit_columns(&self) -> Vec<&'static str> {
        let flags = [
            self.has_tp,
            self.has_sl,
            self.has_target_price,
            self.has_stop_price,
        ];
        EXIT_REASON_COLUMNS
            .iter()
            .zip(flags)
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect()
    }
}

/// First required column absent from `headers`, if any.
pub fn missing_required_column<S: AsRef<str>>(headers: &[S]) -> Option<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h.as_ref().trim() == **col))
        .copied()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub entry_time: RawInstant,
    pub exit_time: RawInstant,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: f64,
    pub total_fees: f64,
    pub pnl: f64,
    pub target_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub tp: bool,
    pub sl: bool,
}

impl TradeRecord {
    /// Parse a row. Exit-reason cells are only read when `schema` enables the
    /// exit-reason rules; otherwise they stay unset.
    pub fn parse(row: &RawTradeRow, schema: &BatchSchema) -> Result<Self, RecordError> {
        let mut record = Self {
            entry_time: parse_time("entry_time", &row.entry_time)?,
            exit_time: parse_time("exit_time", &row.exit_time)?,
            entry_price: parse_number("entry_price", &row.entry_price)?,
            exit_price: parse_number("exit_price", &row.exit_price)?,
            shares: parse_number("shares", &row.shares)?,
            total_fees: parse_number("total_fees", &row.total_fees)?,
            pnl: parse_number("pnl", &row.pnl)?,
            target_price: None,
            stop_price: None,
            tp: false,
            sl: false,
        };
        if schema.exit_checks_enabled() {
            record.target_price =
                parse_optional_number("target_price", row.target_price.as_deref())?;
            record.stop_price = parse_optional_number("stop_price", row.stop_price.as_deref())?;
            record.tp = parse_flag("TP", row.tp.as_deref())?;
            record.sl = parse_flag("SL", row.sl.as_deref())?;
        }
        Ok(record)
    }

    /// Realized P&L implied by prices, size, and fees.
    pub fn expected_pnl(&self) -> f64 {
        (self.exit_price - self.entry_price) * self.shares - self.total_fees
    }
}

/// One input source, fully materialized.
///
/// Rows that the source could not even split into columns are carried as
/// errors so their position in the batch is preserved.
#[derive(Debug, Clone)]
pub struct TradeBatch {
    pub name: String,
    pub schema: BatchSchema,
    pub rows: Vec<Result<RawTradeRow, RecordError>>,
}

impl TradeBatch {
    pub fn new(name: impl Into<String>, schema: BatchSchema, rows: Vec<RawTradeRow>) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: rows.into_iter().map(Ok).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<RawInstant, RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::MissingField { field });
    }
    parse_instant(value).ok_or_else(|| RecordError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, RecordError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordError::MissingField { field });
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RecordError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_optional_number(field: &'static str, value: Option<&str>) -> Result<Option<f64>, RecordError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_number(field, v).map(Some),
    }
}

fn parse_flag(field: &'static str, value: Option<&str>) -> Result<bool, RecordError> {
    let Some(raw) = value else {
        return Ok(false);
    };
    match raw.trim().to_lowercase().as_str() {
        "" | "0" | "0.0" | "false" | "no" | "n" => Ok(false),
        "1" | "1.0" | "true" | "yes" | "y" => Ok(true),
        _ => Err(RecordError::InvalidFlag {
            field,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_row() -> RawTradeRow {
        RawTradeRow {
            entry_time: "2024-01-08 15:00:00+00:00".into(),
            exit_time: "2024-01-08 19:30:00+00:00".into(),
            entry_price: "100".into(),
            exit_price: "105".into(),
            shares: "10".into(),
            total_fees: "1".into(),
            pnl: "49".into(),
            ..Default::default()
        }
    }

    #[test]
    fn parses_required_fields() {
        let record = TradeRecord::parse(&sample_row(), &BatchSchema::extended()).unwrap();
        assert_relative_eq!(record.entry_price, 100.0);
        assert_relative_eq!(record.exit_price, 105.0);
        assert_relative_eq!(record.shares, 10.0);
        assert_relative_eq!(record.total_fees, 1.0);
        assert_relative_eq!(record.pnl, 49.0);
        assert!(!record.tp);
        assert!(!record.sl);
        assert_eq!(record.target_price, None);
    }

    #[test]
    fn expected_pnl_subtracts_fees() {
        let record = TradeRecord::parse(&sample_row(), &BatchSchema::extended()).unwrap();
        assert_relative_eq!(record.expected_pnl(), 49.0);
    }

    #[test]
    fn bad_number_is_reported_with_field() {
        let row = RawTradeRow {
            pnl: "forty".into(),
            ..sample_row()
        };
        let err = TradeRecord::parse(&row, &BatchSchema::extended()).unwrap_err();
        assert_eq!(
            err,
            RecordError::InvalidNumber {
                field: "pnl",
                value: "forty".into()
            }
        );
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for bad in ["NaN", "inf", "-inf"] {
            let row = RawTradeRow {
                shares: bad.into(),
                ..sample_row()
            };
            assert!(matches!(
                TradeRecord::parse(&row, &BatchSchema::extended()),
                Err(RecordError::InvalidNumber { field: "shares", .. })
            ));
        }
    }

    #[test]
    fn empty_required_field_is_missing() {
        let row = RawTradeRow {
            exit_time: "".into(),
            ..sample_row()
        };
        assert_eq!(
            TradeRecord::parse(&row, &BatchSchema::extended()).unwrap_err(),
            RecordError::MissingField { field: "exit_time" }
        );
    }

    #[test]
    fn bad_timestamp_is_reported() {
        let row = RawTradeRow {
            entry_time: "yesterday".into(),
            ..sample_row()
        };
        assert!(matches!(
            TradeRecord::parse(&row, &BatchSchema::extended()),
            Err(RecordError::InvalidTimestamp { field: "entry_time", .. })
        ));
    }

    #[test]
    fn flags_accept_boolean_like_values() {
        for (raw, expected) in [
            ("1", true),
            ("1.0", true),
            ("True", true),
            ("yes", true),
            ("0", false),
            ("0.0", false),
            ("FALSE", false),
            ("", false),
        ] {
            let row = RawTradeRow {
                tp: Some(raw.into()),
                ..sample_row()
            };
            let record = TradeRecord::parse(&row, &BatchSchema::extended()).unwrap();
            assert_eq!(record.tp, expected, "{raw}");
        }
    }

    #[test]
    fn unknown_flag_value_is_rejected() {
        let row = RawTradeRow {
            sl: Some("maybe".into()),
            ..sample_row()
        };
        assert!(matches!(
            TradeRecord::parse(&row, &BatchSchema::extended()),
            Err(RecordError::InvalidFlag { field: "SL", .. })
        ));
    }

    #[test]
    fn exit_cells_ignored_without_full_schema() {
        let row = RawTradeRow {
            tp: Some("maybe".into()),
            target_price: Some("n/a".into()),
            ..sample_row()
        };
        let partial = BatchSchema::from_headers(&["TP", "SL"]);
        let record = TradeRecord::parse(&row, &partial).unwrap();
        assert!(!record.tp);
        assert_eq!(record.target_price, None);
        assert!(TradeRecord::parse(&row, &BatchSchema::extended()).is_err());
    }

    #[test]
    fn optional_prices() {
        let row = RawTradeRow {
            target_price: Some("110.5".into()),
            stop_price: Some(" ".into()),
            ..sample_row()
        };
        let record = TradeRecord::parse(&row, &BatchSchema::extended()).unwrap();
        assert_eq!(record.target_price, Some(110.5));
        assert_eq!(record.stop_price, None);
    }

    #[test]
    fn schema_from_headers() {
        let schema = BatchSchema::from_headers(&["entry_time", "TP", "SL"]);
        assert!(schema.has_tp && schema.has_sl);
        assert!(!schema.exit_checks_enabled());
        assert_eq!(schema.missing_exit_columns(), vec!["target_price", "stop_price"]);

        let full = BatchSchema::from_headers(&["TP", "SL", "target_price", " stop_price "]);
        assert!(full.exit_checks_enabled());
        assert_eq!(full, BatchSchema::extended());
        assert!(full.missing_exit_columns().is_empty());
    }

    #[test]
    fn detects_missing_required_column() {
        let mut headers: Vec<&str> = REQUIRED_COLUMNS.to_vec();
        assert_eq!(missing_required_column(&headers), None);
        headers.retain(|h| *h != "total_fees");
        assert_eq!(missing_required_column(&headers), Some("total_fees"));
    }
}
