use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field count of one exchange kline row.
pub const RAW_KLINE_ARITY: usize = 12;

/// Column names in exchange field order, followed by the attached symbol label.
pub const KLINE_COLUMNS: [&str; 13] = [
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "close_time",
    "quote_volume",
    "trades",
    "taker_buy_volume",
    "taker_buy_quote_volume",
    "ignore",
    "symbol",
];

/// One kline exactly as the exchange returned it: positional, numbers often
/// encoded as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawKline(pub Vec<Value>);

impl RawKline {
    /// Bucket open time, accepting either a JSON integer or an integer string.
    pub fn open_time(&self) -> Option<i64> {
        self.0.first().and_then(value_as_i64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Typed kline row labelled with its symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_volume: f64,
    pub trades: i64,
    pub taker_buy_volume: f64,
    pub taker_buy_quote_volume: f64,
    pub ignore: String,
    pub symbol: String,
}
