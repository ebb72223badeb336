use crate::value_objects::fetch_window::FetchWindow;
use crate::value_objects::table::{Cell, Table};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashSet;

/// What the transaction dataset tells us about the fetch phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionScan {
    /// `None` when no row carries a timestamp.
    pub window: Option<FetchWindow>,
    /// Distinct destination currencies in first-appearance order.
    pub currencies: Vec<String>,
    pub rows: usize,
}

pub fn scan_transactions(
    table: &Table,
    timestamp_column: &str,
    currency_column: &str,
) -> Result<TransactionScan, String> {
    let ts_idx = table
        .column_index(timestamp_column)
        .ok_or_else(|| format!("missing column {timestamp_column}"))?;
    let currency_idx = table
        .column_index(currency_column)
        .ok_or_else(|| format!("missing column {currency_column}"))?;

    let mut min_ms: Option<i64> = None;
    let mut max_ms: Option<i64> = None;
    let mut seen = HashSet::new();
    let mut currencies = Vec::new();

    for (line, row) in table.rows.iter().enumerate() {
        if let Some(raw) = non_blank(&row[ts_idx]) {
            let ts = parse_timestamp_ms(raw)
                .map_err(|err| format!("row {}: {timestamp_column}: {err}", line + 1))?;
            min_ms = Some(min_ms.map_or(ts, |current| current.min(ts)));
            max_ms = Some(max_ms.map_or(ts, |current| current.max(ts)));
        }
        if let Some(code) = non_blank(&row[currency_idx]) {
            if seen.insert(code.to_string()) {
                currencies.push(code.to_string());
            }
        }
    }

    let window = match (min_ms, max_ms) {
        (Some(start), Some(end)) => Some(FetchWindow::new(start, end)?),
        _ => None,
    };

    Ok(TransactionScan {
        window,
        currencies,
        rows: table.len(),
    })
}

fn non_blank(cell: &Cell) -> Option<&str> {
    cell.as_text().map(str::trim).filter(|value| !value.is_empty())
}

/// Epoch milliseconds for the timestamp layouts seen in transaction exports.
/// Values without an offset are taken as UTC.
pub fn parse_timestamp_ms(value: &str) -> Result<i64, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, layout) {
            return Ok(dt.timestamp_millis());
        }
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, layout) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }

    Err(format!("unsupported timestamp format: {value}"))
}
