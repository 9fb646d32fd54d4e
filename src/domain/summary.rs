//! Consistency checks over a backtest's headline metrics.

use chrono::NaiveDate;
use std::fmt;

const DAYS_PER_YEAR: f64 = 365.25;
const PERCENT_TOLERANCE: f64 = 0.1;
const ANNUALIZED_RELATIVE_TOLERANCE: f64 = 0.05;
const ANNUALIZED_FLOOR: f64 = 0.01;

/// Headline metrics as reported by a backtest run. Percentages are in
/// percent units (12.5 means 12.5%).
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMetrics {
    pub total_return: f64,
    pub total_pnl: f64,
    pub annualized_return: f64,
    pub win_rate: f64,
    pub total_trades: u64,
    pub winning_trades: u64,
    pub sharpe_ratio: f64,
    pub initial_capital: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryCheck {
    TotalReturn,
    AnnualizedReturn,
    WinRate,
    SharpeInvalid,
}

impl fmt::Display for SummaryCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SummaryCheck::TotalReturn => "summary_total_return",
            SummaryCheck::AnnualizedReturn => "summary_annualized_return",
            SummaryCheck::WinRate => "summary_win_rate",
            SummaryCheck::SharpeInvalid => "summary_sharpe_invalid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryAnomaly {
    pub check: SummaryCheck,
    pub expected: Option<f64>,
    pub actual: f64,
    pub message: String,
}

/// Cross-check the metrics against each other.
pub fn check_summary(m: &SummaryMetrics) -> Vec<SummaryAnomaly> {
    let mut anomalies = Vec::new();
    let days = (m.end_date - m.start_date).num_days();

    if m.initial_capital > 0.0 {
        let expected = m.total_pnl / m.initial_capital * 100.0;
        if (m.total_return - expected).abs() > PERCENT_TOLERANCE {
            anomalies.push(SummaryAnomaly {
                check: SummaryCheck::TotalReturn,
                expected: Some(expected),
                actual: m.total_return,
                message: format!(
                    "total_return {:.2}% != total_pnl/capital ({:.2}%)",
                    m.total_return, expected
                ),
            });
        }
    }

    if days > 0 {
        let expected = m.total_return * DAYS_PER_YEAR / days as f64;
        let material = m.annualized_return.abs() > ANNUALIZED_FLOOR || expected.abs() > ANNUALIZED_FLOOR;
        if material
            && (m.annualized_return - expected).abs() > ANNUALIZED_RELATIVE_TOLERANCE * expected.abs()
        {
            anomalies.push(SummaryAnomaly {
                check: SummaryCheck::AnnualizedReturn,
                expected: Some(expected),
                actual: m.annualized_return,
                message: format!(
                    "annualized_return {:.2}% != total_return*365.25/{} ({:.2}%)",
                    m.annualized_return, days, expected
                ),
            });
        }
    }

    if m.total_trades > 0 {
        let expected = m.winning_trades as f64 / m.total_trades as f64 * 100.0;
        if (m.win_rate - expected).abs() > PERCENT_TOLERANCE {
            anomalies.push(SummaryAnomaly {
                check: SummaryCheck::WinRate,
                expected: Some(expected),
                actual: m.win_rate,
                message: format!(
                    "win_rate {:.1}% != {}/{} ({:.1}%)",
                    m.win_rate, m.winning_trades, m.total_trades, expected
                ),
            });
        }
    }

    if !m.sharpe_ratio.is_finite() {
        anomalies.push(SummaryAnomaly {
            check: SummaryCheck::SharpeInvalid,
            expected: None,
            actual: m.sharpe_ratio,
            message: format!("Sharpe ratio is {} (NaN/Inf)", m.sharpe_ratio),
        });
    }

    anomalies
}
