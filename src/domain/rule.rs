//! The closed set of trade validation rules.
//!
//! Each [`RuleId`] is a pure check over one normalized trade. Evaluation order
//! is the declaration order, which is also the order findings are reported in.

use crate::domain::trade::{BatchSchema, TradeRecord};
use chrono::{DateTime, Datelike, Timelike, Weekday};
use chrono_tz::Tz;
use std::fmt;

/// Extended session opens at 04:00 ET.
pub const SESSION_OPEN_HOUR: u32 = 4;
/// Extended session closes at 20:00 ET.
pub const SESSION_CLOSE_HOUR: u32 = 20;
/// Absolute tolerance for recorded vs. recomputed P&L.
pub const PNL_TOLERANCE: f64 = 0.01;
/// Absolute tolerance for exit price vs. target/stop price.
pub const PRICE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleId {
    WeekendEntry,
    WeekendExit,
    EntryHours,
    ExitHours,
    PnlConsistency,
    TpSlExclusive,
    TpPrice,
    SlPrice,
}

impl RuleId {
    pub const ALL: [RuleId; 8] = [
        RuleId::WeekendEntry,
        RuleId::WeekendExit,
        RuleId::EntryHours,
        RuleId::ExitHours,
        RuleId::PnlConsistency,
        RuleId::TpSlExclusive,
        RuleId::TpPrice,
        RuleId::SlPrice,
    ];

    pub fn code(self) -> &'static str {
        match self {
            RuleId::WeekendEntry => "R1",
            RuleId::WeekendExit => "R2",
            RuleId::EntryHours => "R3",
            RuleId::ExitHours => "R4",
            RuleId::PnlConsistency => "R5",
            RuleId::TpSlExclusive => "R6",
            RuleId::TpPrice => "R7",
            RuleId::SlPrice => "R8",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleId::WeekendEntry => "weekend-entry",
            RuleId::WeekendExit => "weekend-exit",
            RuleId::EntryHours => "entry-hours",
            RuleId::ExitHours => "exit-hours",
            RuleId::PnlConsistency => "pnl-consistency",
            RuleId::TpSlExclusive => "tp-sl-exclusivity",
            RuleId::TpPrice => "tp-price-consistency",
            RuleId::SlPrice => "sl-price-consistency",
        }
    }

    /// Rules that read the optional exit-reason columns.
    pub fn requires_exit_schema(self) -> bool {
        matches!(
            self,
            RuleId::TpSlExclusive | RuleId::TpPrice | RuleId::SlPrice
        )
    }

    /// Run the check. `Some(message)` means the rule fired.
    pub fn check(self, trade: &NormalizedTrade<'_>) -> Option<String> {
        let record = trade.record;
        match self {
            RuleId::WeekendEntry => {
                is_weekend(&trade.entry).then(|| {
                    format!("Entry on weekend ({} ET)", trade.entry.format("%A"))
                })
            }
            RuleId::WeekendExit => is_weekend(&trade.exit)
                .then(|| format!("Exit on weekend ({} ET)", trade.exit.format("%A"))),
            RuleId::EntryHours => {
                let hour = trade.entry.hour();
                (!in_session(hour)).then(|| {
                    format!("Entry hour {hour} ET is outside 4 AM - 8 PM window")
                })
            }
            RuleId::ExitHours => {
                let hour = trade.exit.hour();
                let closing_bar = hour == SESSION_CLOSE_HOUR && trade.exit.minute() == 0;
                (!in_session(hour) && !closing_bar).then(|| {
                    format!("Exit hour {hour} ET is outside 4 AM - 8 PM window")
                })
            }
            RuleId::PnlConsistency => {
                let expected = record.expected_pnl();
                ((record.pnl - expected).abs() > PNL_TOLERANCE).then(|| {
                    format!(
                        "P&L mismatch. Expected ${:.2}, got ${:.2}",
                        expected, record.pnl
                    )
                })
            }
            RuleId::TpSlExclusive => (record.tp && record.sl)
                .then(|| "Both TP and SL marked as hit!".to_string()),
            RuleId::TpPrice => {
                if !record.tp {
                    return None;
                }
                match record.target_price {
                    None => Some("TP hit but target price is missing".to_string()),
                    Some(target) if (record.exit_price - target).abs() > PRICE_TOLERANCE => {
                        Some(format!(
                            "TP hit but exit price ${:.2} != target price ${:.2}",
                            record.exit_price, target
                        ))
                    }
                    Some(_) => None,
                }
            }
            RuleId::SlPrice => {
                if !record.sl {
                    return None;
                }
                match record.stop_price {
                    None => Some("SL hit but stop price is missing".to_string()),
                    Some(stop) if (record.exit_price - stop).abs() > PRICE_TOLERANCE => {
                        Some(format!(
                            "SL hit but exit price ${:.2} != stop price ${:.2}",
                            record.exit_price, stop
                        ))
                    }
                    Some(_) => None,
                }
            }
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.name())
    }
}

/// Rules that apply to a batch with the given schema, in evaluation order.
pub fn active_rules(schema: &BatchSchema) -> Vec<RuleId> {
    let exit_checks = schema.exit_checks_enabled();
    RuleId::ALL
        .into_iter()
        .filter(|rule| exit_checks || !rule.requires_exit_schema())
        .collect()
}

/// A trade record with both timestamps expressed in the exchange zone.
#[derive(Debug, Clone)]
pub struct NormalizedTrade<'a> {
    pub record: &'a TradeRecord,
    pub entry: DateTime<Tz>,
    pub exit: DateTime<Tz>,
}

fn is_weekend(dt: &DateTime<Tz>) -> bool {
    matches!(dt.weekday(), Weekday::Sat | Weekday::Sun)
}

fn in_session(hour: u32) -> bool {
    (SESSION_OPEN_HOUR..SESSION_CLOSE_HOUR).contains(&hour)
}
