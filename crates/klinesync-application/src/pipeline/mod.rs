use crate::config::{validate_config, Config, SymbolErrorPolicy};
use klinesync_domain::errors::PipelineError;
use klinesync_domain::repositories::exchange::{KlineSource, SymbolDirectory};
use klinesync_domain::repositories::tabular::{TableSource, TableWriter};
use klinesync_domain::repositories::warehouse::WarehouseSink;
use klinesync_domain::services::kline_table::klines_to_table;
use klinesync_domain::services::normalize::normalize;
use klinesync_domain::services::range_fetch::{fetch_range, RangeFetchOptions, StopReason};
use klinesync_domain::services::symbols::{resolve_symbols, SymbolResolution};
use klinesync_domain::services::transactions::{scan_transactions, TransactionScan};
use klinesync_domain::value_objects::fetch_window::FetchWindow;
use klinesync_domain::value_objects::symbol::Symbol;
use klinesync_domain::value_objects::table::Table;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info_span;

/// Ports the pipeline drives. One exchange adapter usually backs both
/// `directory` and `klines`.
pub struct PipelineDeps<'a> {
    pub tables: &'a dyn TableSource,
    pub directory: &'a dyn SymbolDirectory,
    pub klines: &'a dyn KlineSource,
    pub checkpoint: &'a dyn TableWriter,
    pub warehouse: &'a dyn WarehouseSink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFetchSummary {
    pub symbol: Symbol,
    pub rows: usize,
    pub pages: u32,
    pub stop: StopReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: Symbol,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub table: String,
    pub rows: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub window: Option<FetchWindow>,
    pub currencies: Vec<String>,
    pub resolution: SymbolResolution,
    pub fetched: Vec<SymbolFetchSummary>,
    pub skipped: Vec<SkippedSymbol>,
    pub kline_rows: usize,
    pub checkpoint: Option<PathBuf>,
    pub loaded: Vec<TableLoad>,
}

/// Inputs as they would be consumed by a run, without touching the network.
#[derive(Debug, Clone)]
pub struct InputPreview {
    pub transactions: Table,
    pub users: Table,
    pub scan: TransactionScan,
}

pub fn load_inputs(config: &Config, tables: &dyn TableSource) -> Result<InputPreview, PipelineError> {
    let transactions_path = Path::new(&config.inputs.transactions_csv);
    let transactions = load_table(tables, transactions_path)?;
    let scan = scan_transactions(
        &transactions,
        &config.inputs.timestamp_column,
        &config.inputs.currency_column,
    )
    .map_err(|err| PipelineError::input_load_failed(transactions_path, err))?;

    let users = load_table(tables, Path::new(&config.inputs.users_csv))?;

    Ok(InputPreview {
        transactions,
        users,
        scan,
    })
}

pub fn run_pipeline(config: &Config, deps: &PipelineDeps<'_>) -> Result<PipelineReport, PipelineError> {
    let _span = info_span!(
        "run_pipeline",
        quote_asset = %config.exchange.quote_asset,
        interval = %config.exchange.interval.label,
        warehouse = %deps.warehouse.describe()
    )
    .entered();
    let run_start = Instant::now();
    validate_config(config).map_err(PipelineError::InvalidConfig)?;

    let inputs = load_inputs(config, deps.tables)?;
    tracing::info!(
        transactions = inputs.transactions.len(),
        users = inputs.users.len(),
        "inputs loaded"
    );

    let mut report = PipelineReport {
        window: inputs.scan.window,
        currencies: inputs.scan.currencies.clone(),
        ..PipelineReport::default()
    };

    let combined = match inputs.scan.window {
        Some(window) => {
            tracing::info!(window = %window, currencies = ?report.currencies, "transaction date range");
            fetch_all(config, deps, window, &mut report)?
        }
        None => {
            tracing::warn!("transactions carry no timestamps, skipping kline fetch");
            Table::default()
        }
    };
    report.kline_rows = combined.len();

    if combined.is_empty() {
        tracing::info!("no klines fetched");
    } else {
        let path = config.output.klines_path();
        write_checkpoint(deps.checkpoint, &path, &combined)?;
        tracing::info!(path = %path.display(), rows = combined.len(), "kline checkpoint written");
        report.checkpoint = Some(path);
    }

    let warehouse = &config.warehouse;
    let mut uploads = vec![
        (warehouse.transactions_table.as_str(), &inputs.transactions),
        (warehouse.users_table.as_str(), &inputs.users),
    ];
    if !combined.is_empty() {
        uploads.push((warehouse.klines_table.as_str(), &combined));
    }
    for (table_name, table) in uploads {
        let rows = upload(deps.warehouse, table_name, table, config)?;
        report.loaded.push(TableLoad {
            table: table_name.to_string(),
            rows,
        });
    }

    metrics::histogram!("klinesync.pipeline.run_ms")
        .record(run_start.elapsed().as_secs_f64() * 1000.0);
    tracing::info!(
        symbols = report.fetched.len(),
        skipped = report.skipped.len(),
        kline_rows = report.kline_rows,
        elapsed_ms = run_start.elapsed().as_millis() as u64,
        "pipeline complete"
    );
    Ok(report)
}

fn fetch_all(
    config: &Config,
    deps: &PipelineDeps<'_>,
    window: FetchWindow,
    report: &mut PipelineReport,
) -> Result<Table, PipelineError> {
    let resolution = resolve_symbols(
        &report.currencies,
        &config.exchange.quote_asset,
        deps.directory,
    )?;
    let names = |symbols: &[Symbol]| -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    };
    tracing::info!(available = ?names(&resolution.available), "symbols available on exchange");
    if !resolution.missing.is_empty() {
        tracing::info!(missing = ?names(&resolution.missing), "symbols not listed on exchange");
    }
    report.resolution = resolution.clone();

    let options = config.exchange.fetch_options();
    let mut combined = Table::default();
    for symbol in &resolution.available {
        match fetch_symbol(deps.klines, symbol, window, &options) {
            Ok((table, summary)) => {
                combined
                    .append(table)
                    .map_err(PipelineError::SchemaMismatch)?;
                report.fetched.push(summary);
            }
            Err(err)
                if err.is_symbol_scoped()
                    && config.fetch.on_symbol_error == SymbolErrorPolicy::Skip =>
            {
                metrics::counter!("klinesync.fetch.skipped_total").increment(1);
                tracing::warn!(symbol = %symbol, error = %err, "skipping symbol");
                report.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => {
                tracing::error!(symbol = %symbol, error = %err, "symbol fetch failed");
                return Err(err);
            }
        }
    }

    tracing::info!(rows = combined.len(), "combined kline dataset");
    Ok(combined)
}

/// Fetches and normalizes one symbol over `window`.
pub fn fetch_symbol(
    source: &dyn KlineSource,
    symbol: &Symbol,
    window: FetchWindow,
    options: &RangeFetchOptions,
) -> Result<(Table, SymbolFetchSummary), PipelineError> {
    let _span = info_span!("fetch_symbol", symbol = %symbol).entered();
    let stage_start = Instant::now();
    tracing::info!(
        expected_buckets = options.interval.buckets_between(window.start_ms, window.end_ms),
        "fetching klines"
    );

    let outcome = fetch_range(source, symbol, window, options)?;
    let klines = normalize(&outcome.rows, symbol)?;

    metrics::counter!("klinesync.fetch.pages_total").increment(u64::from(outcome.pages));
    metrics::counter!("klinesync.fetch.rows_total").increment(klines.len() as u64);
    metrics::histogram!("klinesync.fetch.symbol_ms")
        .record(stage_start.elapsed().as_secs_f64() * 1000.0);
    tracing::info!(
        rows = klines.len(),
        pages = outcome.pages,
        trimmed = outcome.trimmed,
        duplicates = outcome.duplicates,
        stop = ?outcome.stop,
        "symbol fetched"
    );

    let summary = SymbolFetchSummary {
        symbol: symbol.clone(),
        rows: klines.len(),
        pages: outcome.pages,
        stop: outcome.stop,
    };
    Ok((klines_to_table(&klines), summary))
}

fn load_table(tables: &dyn TableSource, path: &Path) -> Result<Table, PipelineError> {
    tables
        .load_table(path)
        .map_err(|err| PipelineError::input_load_failed(path, err))
}

fn write_checkpoint(writer: &dyn TableWriter, path: &Path, table: &Table) -> Result<(), PipelineError> {
    let checkpoint_failed = |reason: String| PipelineError::CheckpointFailed {
        path: path.to_path_buf(),
        reason,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        writer.ensure_dir(dir).map_err(checkpoint_failed)?;
    }
    writer.write_table(path, table).map_err(checkpoint_failed)
}

fn upload(
    warehouse: &dyn WarehouseSink,
    table_name: &str,
    table: &Table,
    config: &Config,
) -> Result<u64, PipelineError> {
    let mode = config.warehouse.write_mode;
    let stage_start = Instant::now();
    let rows = warehouse
        .load_table(table_name, table, mode)
        .map_err(|err| {
            metrics::counter!("klinesync.warehouse.errors_total", "table" => table_name.to_string())
                .increment(1);
            PipelineError::upload_failed(table_name, err)
        })?;
    metrics::counter!("klinesync.warehouse.rows_total", "table" => table_name.to_string())
        .increment(rows);
    tracing::info!(
        table = table_name,
        rows,
        mode = mode.as_str(),
        destination = %warehouse.describe(),
        elapsed_ms = stage_start.elapsed().as_millis() as u64,
        "table loaded"
    );
    Ok(rows)
}
