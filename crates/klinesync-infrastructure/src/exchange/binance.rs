use chrono::DateTime;
use klinesync_domain::repositories::exchange::{KlinePageRequest, KlineSource, SymbolDirectory};
use klinesync_domain::value_objects::kline::RawKline;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};

const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";
const KLINES_PATH: &str = "/api/v3/klines";

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

/// Blocking client for the public Binance spot REST API. Backs both the
/// symbol directory and the kline source.
pub struct BinanceClient {
    pub base_url: String,
    pub timeout_ms: u64,
    client: Client,
}

impl BinanceClient {
    pub fn new(base_url: String, timeout_ms: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            base_url,
            timeout_ms,
            client,
        })
    }

    fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, String> {
        let endpoint = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let start = Instant::now();
        let result = self
            .client
            .get(&endpoint)
            .query(query)
            .send()
            .map_err(|err| format!("request to {path} failed: {err}"))
            .and_then(|resp| {
                let status = resp.status();
                let body = resp
                    .text()
                    .map_err(|err| format!("failed to read {path} response: {err}"))?;
                if status.is_success() {
                    Ok(body)
                } else {
                    Err(describe_http_error(path, status.as_u16(), &body))
                }
            });

        let outcome = if result.is_ok() { "ok" } else { "err" };
        metrics::counter!(
            "klinesync.exchange.requests_total",
            "endpoint" => path.to_string(),
            "result" => outcome
        )
        .increment(1);
        metrics::histogram!("klinesync.exchange.request_ms", "endpoint" => path.to_string())
            .record(start.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

impl SymbolDirectory for BinanceClient {
    fn list_symbols(&self) -> Result<Vec<String>, String> {
        let _span = tracing::info_span!("infra.exchange.symbols").entered();
        let body = self.get_text(EXCHANGE_INFO_PATH, &[])?;
        let symbols = decode_exchange_info(&body)?;
        tracing::debug!(symbols = symbols.len(), "exchange directory loaded");
        Ok(symbols)
    }
}

impl KlineSource for BinanceClient {
    fn fetch_page(&self, request: &KlinePageRequest) -> Result<Vec<RawKline>, String> {
        let _span = tracing::debug_span!(
            "infra.exchange.klines",
            symbol = %request.symbol,
            interval = %request.interval.label,
            start = ?DateTime::from_timestamp_millis(request.start_ms),
        )
        .entered();
        let query = [
            ("symbol", request.symbol.to_string()),
            ("interval", request.interval.label.clone()),
            ("startTime", request.start_ms.to_string()),
            ("endTime", request.end_ms.to_string()),
            ("limit", request.limit.to_string()),
        ];
        let body = self.get_text(KLINES_PATH, &query)?;
        decode_kline_page(&body)
    }
}

pub fn decode_exchange_info(body: &str) -> Result<Vec<String>, String> {
    let info: ExchangeInfo = serde_json::from_str(body)
        .map_err(|err| format!("failed to parse exchangeInfo payload: {err}"))?;
    Ok(info.symbols.into_iter().map(|s| s.symbol).collect())
}

/// Accepts a JSON array of arrays. Field arity and types are checked later
/// during normalization.
pub fn decode_kline_page(body: &str) -> Result<Vec<RawKline>, String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| format!("failed to parse klines payload: {err}"))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => {
            return Err(match serde_json::from_value::<ApiError>(value) {
                Ok(api) => format!("exchange error {}: {}", api.code, api.msg),
                Err(_) => "unexpected klines payload: expected an array".to_string(),
            });
        }
        _ => return Err("unexpected klines payload: expected an array".to_string()),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Array(fields) => Ok(RawKline(fields)),
            other => Err(format!("kline row {idx} is not an array: {other}")),
        })
        .collect()
}

fn describe_http_error(path: &str, status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api) => format!(
            "{path} returned status {status}: exchange error {}: {}",
            api.code, api.msg
        ),
        Err(_) => format!("{path} returned status {status}"),
    }
}
