use crate::value_objects::interval::KlineInterval;
use crate::value_objects::kline::RawKline;
use crate::value_objects::symbol::Symbol;

#[derive(Debug, Clone, PartialEq)]
pub struct KlinePageRequest {
    pub symbol: Symbol,
    pub interval: KlineInterval,
    pub start_ms: i64,
    pub end_ms: i64,
    pub limit: u32,
}

/// Bulk listing of every symbol the exchange currently trades.
pub trait SymbolDirectory {
    fn list_symbols(&self) -> Result<Vec<String>, String>;
}

/// One page of klines starting at `request.start_ms`, oldest first.
pub trait KlineSource {
    fn fetch_page(&self, request: &KlinePageRequest) -> Result<Vec<RawKline>, String>;
}
