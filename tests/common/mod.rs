#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tradeaudit::domain::trade::RawTradeRow;

pub const HEADER: &str = "entry_time,exit_time,entry_price,exit_price,shares,total_fees,pnl";
pub const EXTENDED_HEADER: &str =
    "entry_time,exit_time,entry_price,exit_price,shares,total_fees,pnl,TP,SL,target_price,stop_price";

/// A Monday trade inside session hours with consistent P&L:
/// (105 - 100) * 10 - 1 = 49.
pub fn clean_row() -> RawTradeRow {
    RawTradeRow {
        entry_time: "2024-01-08T15:00:00Z".into(),
        exit_time: "2024-01-08T19:30:00Z".into(),
        entry_price: "100".into(),
        exit_price: "105".into(),
        shares: "10".into(),
        total_fees: "1".into(),
        pnl: "49".into(),
        ..Default::default()
    }
}

pub fn row_at(entry: &str, exit: &str) -> RawTradeRow {
    RawTradeRow {
        entry_time: entry.into(),
        exit_time: exit.into(),
        ..clean_row()
    }
}

pub fn row_with_pnl(pnl: &str) -> RawTradeRow {
    RawTradeRow {
        pnl: pnl.into(),
        ..clean_row()
    }
}

pub fn row_with_exit_flags(tp: &str, sl: &str, target: &str, stop: &str) -> RawTradeRow {
    RawTradeRow {
        tp: Some(tp.into()),
        sl: Some(sl.into()),
        target_price: Some(target.into()),
        stop_price: Some(stop.into()),
        ..clean_row()
    }
}

/// One CSV line in `HEADER` column order.
pub fn csv_line(row: &RawTradeRow) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        row.entry_time,
        row.exit_time,
        row.entry_price,
        row.exit_price,
        row.shares,
        row.total_fees,
        row.pnl
    )
}

/// One CSV line in `EXTENDED_HEADER` column order.
pub fn extended_csv_line(row: &RawTradeRow) -> String {
    format!(
        "{},{},{},{},{}",
        csv_line(row),
        row.tp.as_deref().unwrap_or(""),
        row.sl.as_deref().unwrap_or(""),
        row.target_price.as_deref().unwrap_or(""),
        row.stop_price.as_deref().unwrap_or("")
    )
}

pub fn write_csv(dir: &Path, name: &str, header: &str, lines: &[String]) {
    let mut content = format!("{header}\n");
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(dir.join(name), content).unwrap();
}

pub fn write_basic_batch(dir: &Path, name: &str, rows: &[RawTradeRow]) {
    let lines: Vec<String> = rows.iter().map(csv_line).collect();
    write_csv(dir, name, HEADER, &lines);
}

pub fn write_extended_batch(dir: &Path, name: &str, rows: &[RawTradeRow]) {
    let lines: Vec<String> = rows.iter().map(extended_csv_line).collect();
    write_csv(dir, name, EXTENDED_HEADER, &lines);
}
