use crate::value_objects::kline::{Kline, KLINE_COLUMNS};
use crate::value_objects::table::{Cell, Column, ColumnKind, Table};

pub fn kline_columns() -> Vec<Column> {
    KLINE_COLUMNS
        .iter()
        .map(|name| {
            let kind = match *name {
                "open_time" | "close_time" | "trades" => ColumnKind::Int,
                "ignore" | "symbol" => ColumnKind::Text,
                _ => ColumnKind::Float,
            };
            Column::new(*name, kind)
        })
        .collect()
}

pub fn klines_to_table(klines: &[Kline]) -> Table {
    let mut table = Table::new(kline_columns());
    table.rows = klines
        .iter()
        .map(|k| {
            vec![
                Cell::Int(k.open_time),
                Cell::Float(k.open),
                Cell::Float(k.high),
                Cell::Float(k.low),
                Cell::Float(k.close),
                Cell::Float(k.volume),
                Cell::Int(k.close_time),
                Cell::Float(k.quote_volume),
                Cell::Int(k.trades),
                Cell::Float(k.taker_buy_volume),
                Cell::Float(k.taker_buy_quote_volume),
                Cell::Text(k.ignore.clone()),
                Cell::Text(k.symbol.clone()),
            ]
        })
        .collect();
    table
}
