pub mod kline_table;
pub mod normalize;
pub mod range_fetch;
pub mod symbols;
pub mod transactions;
