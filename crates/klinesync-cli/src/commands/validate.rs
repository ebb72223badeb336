use super::common::print_config_summary;
use crate::config::{resolve_config, Overrides};
use klinesync_application::config::{validate_config, WarehouseKind};
use klinesync_application::pipeline::load_inputs;
use klinesync_domain::services::symbols::candidate_symbols;
use klinesync_infrastructure::credentials::resolve_credentials;
use klinesync_infrastructure::tabular::CsvTableReader;
use std::path::Path;

pub(super) fn run_validate(overrides: &Overrides) -> Result<(), String> {
    let config = resolve_config(overrides)?;
    validate_config(&config)?;
    print_config_summary("validate", &config);

    if config.warehouse.kind == WarehouseKind::Postgres {
        let source = resolve_credentials(config.warehouse.credentials.as_deref().map(Path::new))?;
        println!("credentials: {}", source.describe());
    }

    let inputs = load_inputs(&config, &CsvTableReader).map_err(|err| err.to_string())?;
    println!("transactions: rows={}", inputs.scan.rows);
    println!("users: rows={}", inputs.users.len());
    match inputs.scan.window {
        Some(window) => println!("window: {window}"),
        None => println!("window: none (kline fetch would be skipped)"),
    }
    let candidates: Vec<String> =
        candidate_symbols(&inputs.scan.currencies, &config.exchange.quote_asset)
            .iter()
            .map(|s| s.to_string())
            .collect();
    println!(
        "currencies: {} -> candidate symbols: {}",
        inputs.scan.currencies.join(","),
        candidates.join(",")
    );
    println!("config ok");
    Ok(())
}
