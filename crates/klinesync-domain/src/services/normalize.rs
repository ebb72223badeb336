use crate::errors::PipelineError;
use crate::value_objects::kline::{value_as_f64, value_as_i64, Kline, RawKline, RAW_KLINE_ARITY};
use crate::value_objects::symbol::Symbol;
use serde_json::Value;

/// Maps positional exchange rows onto typed klines labelled with `symbol`.
/// Output has exactly one row per input row.
pub fn normalize(raw_rows: &[RawKline], symbol: &Symbol) -> Result<Vec<Kline>, PipelineError> {
    raw_rows
        .iter()
        .enumerate()
        .map(|(index, row)| normalize_row(row, symbol, index))
        .collect()
}

fn normalize_row(row: &RawKline, symbol: &Symbol, index: usize) -> Result<Kline, PipelineError> {
    if row.len() != RAW_KLINE_ARITY {
        return Err(PipelineError::SchemaMismatch(format!(
            "{symbol} row {index}: expected {RAW_KLINE_ARITY} fields, got {}",
            row.len()
        )));
    }
    let fields = &row.0;
    let int = |pos: usize, name: &str| {
        value_as_i64(&fields[pos]).ok_or_else(|| mismatch(symbol, index, name, &fields[pos]))
    };
    let float = |pos: usize, name: &str| {
        value_as_f64(&fields[pos]).ok_or_else(|| mismatch(symbol, index, name, &fields[pos]))
    };

    Ok(Kline {
        open_time: int(0, "open_time")?,
        open: float(1, "open")?,
        high: float(2, "high")?,
        low: float(3, "low")?,
        close: float(4, "close")?,
        volume: float(5, "volume")?,
        close_time: int(6, "close_time")?,
        quote_volume: float(7, "quote_volume")?,
        trades: int(8, "trades")?,
        taker_buy_volume: float(9, "taker_buy_volume")?,
        taker_buy_quote_volume: float(10, "taker_buy_quote_volume")?,
        ignore: match &fields[11] {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        },
        symbol: symbol.to_string(),
    })
}

fn mismatch(symbol: &Symbol, index: usize, field: &str, value: &Value) -> PipelineError {
    PipelineError::SchemaMismatch(format!(
        "{symbol} row {index}: field {field} has unexpected value {value}"
    ))
}

#[cfg(test)]
mod tests {
    use super::normalize;
    use crate::errors::PipelineError;
    use crate::value_objects::kline::RawKline;
    use crate::value_objects::symbol::Symbol;
    use serde_json::json;

    fn exchange_row(open_time: i64) -> RawKline {
        RawKline(vec![
            json!(open_time),
            json!("42000.10"),
            json!("42100.00"),
            json!("41950.50"),
            json!("42050.25"),
            json!("12.5"),
            json!(open_time + 3_599_999),
            json!("525000.0"),
            json!(314),
            json!("6.25"),
            json!("262500.0"),
            json!("0"),
        ])
    }

    #[test]
    fn normalize_types_every_field_and_labels_symbol() {
        let rows = vec![exchange_row(0), exchange_row(3_600_000)];
        let klines = normalize(&rows, &Symbol::new("BTCUSDT")).expect("normalize");

        assert_eq!(klines.len(), 2);
        let first = &klines[0];
        assert_eq!(first.open_time, 0);
        assert!((first.open - 42000.10).abs() < 1e-9);
        assert!((first.close - 42050.25).abs() < 1e-9);
        assert_eq!(first.close_time, 3_599_999);
        assert_eq!(first.trades, 314);
        assert_eq!(first.ignore, "0");
        assert_eq!(first.symbol, "BTCUSDT");
        assert_eq!(klines[1].open_time, 3_600_000);
    }

    #[test]
    fn trade_count_may_arrive_as_text() {
        let mut row = exchange_row(0);
        row.0[8] = json!("17");
        let klines = normalize(&[row], &Symbol::new("ETHUSDT")).expect("normalize");
        assert_eq!(klines[0].trades, 17);
    }

    #[test]
    fn wrong_arity_is_schema_mismatch() {
        let mut row = exchange_row(0);
        row.0.pop();
        let err = normalize(&[row], &Symbol::new("BTCUSDT")).expect_err("short row");
        match err {
            PipelineError::SchemaMismatch(msg) => assert!(msg.contains("expected 12 fields")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_price_is_schema_mismatch() {
        let mut row = exchange_row(0);
        row.0[2] = json!("n/a");
        let err = normalize(&[row], &Symbol::new("BTCUSDT")).expect_err("bad price");
        assert!(err.to_string().contains("high"));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(normalize(&[], &Symbol::new("BTCUSDT")).unwrap().is_empty());
    }
}
