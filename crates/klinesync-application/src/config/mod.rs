use klinesync_domain::repositories::warehouse::WriteMode;
use klinesync_domain::services::range_fetch::{RangeFetchOptions, MAX_PAGE_SIZE};
use klinesync_domain::value_objects::interval::KlineInterval;
use klinesync_domain::value_objects::symbol::QuoteAsset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SymbolErrorPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseKind {
    #[default]
    Postgres,
    Csv,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub inputs: InputsConfig,
    pub output: OutputConfig,
    pub fetch: FetchConfig,
    pub warehouse: WarehouseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub quote_asset: QuoteAsset,
    pub interval: KlineInterval,
    pub page_size: u32,
    pub request_delay_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            quote_asset: QuoteAsset::default(),
            interval: KlineInterval::default(),
            page_size: MAX_PAGE_SIZE,
            request_delay_ms: 100,
            request_timeout_ms: 30_000,
        }
    }
}

impl ExchangeConfig {
    pub fn fetch_options(&self) -> RangeFetchOptions {
        RangeFetchOptions {
            interval: self.interval.clone(),
            page_size: self.page_size,
            request_delay: Duration::from_millis(self.request_delay_ms),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InputsConfig {
    pub transactions_csv: String,
    pub users_csv: String,
    pub timestamp_column: String,
    pub currency_column: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            transactions_csv: "../data/transactions.csv".to_string(),
            users_csv: "../data/users.csv".to_string(),
            timestamp_column: "created_at".to_string(),
            currency_column: "destination_currency".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub out_dir: String,
    pub klines_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: "output/raw_rates".to_string(),
            klines_file: "all_klines.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn klines_path(&self) -> PathBuf {
        Path::new(&self.out_dir).join(&self.klines_file)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub on_symbol_error: SymbolErrorPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WarehouseConfig {
    pub kind: WarehouseKind,
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub credentials: Option<String>,
    pub write_mode: WriteMode,
    pub transactions_table: String,
    pub users_table: String,
    pub klines_table: String,
    pub csv_dir: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            kind: WarehouseKind::default(),
            project_id: None,
            dataset: None,
            credentials: None,
            write_mode: WriteMode::default(),
            transactions_table: "transactions".to_string(),
            users_table: "users".to_string(),
            klines_table: "klines".to_string(),
            csv_dir: "output/warehouse".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}

/// Checks cross-field rules that serde alone cannot express.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let exchange = &config.exchange;
    if exchange.page_size == 0 || exchange.page_size > MAX_PAGE_SIZE {
        return Err(format!(
            "exchange.page_size must be within 1..={MAX_PAGE_SIZE} (got {})",
            exchange.page_size
        ));
    }
    if exchange.request_timeout_ms == 0 {
        return Err("exchange.request_timeout_ms must be > 0".to_string());
    }
    if !exchange.base_url.starts_with("http://") && !exchange.base_url.starts_with("https://") {
        return Err(format!(
            "exchange.base_url must be an http(s) url: {}",
            exchange.base_url
        ));
    }

    let warehouse = &config.warehouse;
    for (field, name) in [
        ("warehouse.transactions_table", &warehouse.transactions_table),
        ("warehouse.users_table", &warehouse.users_table),
        ("warehouse.klines_table", &warehouse.klines_table),
    ] {
        validate_identifier(name).map_err(|err| format!("{field}: {err}"))?;
    }

    let dataset = warehouse
        .dataset
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| "warehouse.dataset is required".to_string())?;
    validate_identifier(dataset).map_err(|err| format!("warehouse.dataset: {err}"))?;

    if warehouse.kind == WarehouseKind::Postgres
        && warehouse
            .project_id
            .as_deref()
            .map_or(true, |value| value.trim().is_empty())
    {
        return Err("warehouse.project_id is required for the postgres warehouse".to_string());
    }

    Ok(())
}

pub fn validate_identifier(value: &str) -> Result<(), String> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("invalid identifier: {value:?}"))
    }
}
