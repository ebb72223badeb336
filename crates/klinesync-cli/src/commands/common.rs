use klinesync_application::config::Config;
use klinesync_application::pipeline::PipelineReport;
use serde_json::{json, Value};

pub(super) fn print_config_summary(command: &str, config: &Config) {
    let exchange = &config.exchange;
    let warehouse = &config.warehouse;
    println!(
        "klinesync: {} (quote_asset={}, interval={}, page_size={}, request_delay_ms={}, on_symbol_error={:?})",
        command,
        exchange.quote_asset,
        exchange.interval.label,
        exchange.page_size,
        exchange.request_delay_ms,
        config.fetch.on_symbol_error
    );
    println!(
        "inputs: transactions={}, users={}, timestamp_column={}, currency_column={}",
        config.inputs.transactions_csv,
        config.inputs.users_csv,
        config.inputs.timestamp_column,
        config.inputs.currency_column
    );
    println!(
        "warehouse: kind={:?}, project_id={}, dataset={}, write_mode={}, checkpoint={}",
        warehouse.kind,
        warehouse.project_id.as_deref().unwrap_or("none"),
        warehouse.dataset.as_deref().unwrap_or("none"),
        warehouse.write_mode.as_str(),
        config.output.klines_path().display()
    );
}

pub(super) fn print_report(report: &PipelineReport) {
    match &report.window {
        Some(window) => println!("window: {window}"),
        None => println!("window: none (no transaction timestamps)"),
    }
    println!(
        "symbols: candidates={}, available={}, missing={}",
        report.resolution.candidates(),
        report.resolution.available.len(),
        report.resolution.missing.len()
    );
    for fetched in &report.fetched {
        println!(
            "  {}: rows={} pages={} stop={:?}",
            fetched.symbol, fetched.rows, fetched.pages, fetched.stop
        );
    }
    for skipped in &report.skipped {
        println!("  {}: skipped ({})", skipped.symbol, skipped.reason);
    }
    match &report.checkpoint {
        Some(path) => println!("klines: rows={} checkpoint={}", report.kline_rows, path.display()),
        None => println!("klines: none"),
    }
    for load in &report.loaded {
        println!("loaded: {} rows={}", load.table, load.rows);
    }
}

pub(super) fn report_json(report: &PipelineReport) -> Value {
    let names = |symbols: &[klinesync_domain::value_objects::symbol::Symbol]| -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    };
    json!({
        "status": "ok",
        "window": report.window.map(|w| json!({"start_ms": w.start_ms, "end_ms": w.end_ms})),
        "currencies": report.currencies,
        "available": names(&report.resolution.available),
        "missing": names(&report.resolution.missing),
        "fetched": report.fetched.iter().map(|f| json!({
            "symbol": f.symbol.as_str(),
            "rows": f.rows,
            "pages": f.pages,
            "stop": format!("{:?}", f.stop).to_lowercase(),
        })).collect::<Vec<_>>(),
        "skipped": report.skipped.iter().map(|s| json!({
            "symbol": s.symbol.as_str(),
            "reason": s.reason,
        })).collect::<Vec<_>>(),
        "kline_rows": report.kline_rows,
        "checkpoint": report.checkpoint.as_ref().map(|p| p.display().to_string()),
        "loaded": report.loaded.iter().map(|l| json!({"table": l.table, "rows": l.rows})).collect::<Vec<_>>(),
    })
}
