pub mod fetch_window;
pub mod interval;
pub mod kline;
pub mod symbol;
pub mod table;
