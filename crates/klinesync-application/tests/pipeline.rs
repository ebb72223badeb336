use klinesync_application::config::{Config, SymbolErrorPolicy};
use klinesync_application::pipeline::{run_pipeline, PipelineDeps};
use klinesync_domain::errors::PipelineError;
use klinesync_domain::repositories::exchange::{KlinePageRequest, KlineSource, SymbolDirectory};
use klinesync_domain::repositories::tabular::{TableSource, TableWriter};
use klinesync_domain::repositories::warehouse::{WarehouseSink, WriteMode};
use klinesync_domain::services::range_fetch::StopReason;
use klinesync_domain::value_objects::kline::RawKline;
use klinesync_domain::value_objects::table::{Cell, Column, ColumnKind, Table};
use serde_json::json;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const HOUR: i64 = 3_600_000;
// 2024-01-01T00:00:00Z
const DAY_START: i64 = 1_704_067_200_000;

struct FakeTables(HashMap<PathBuf, Table>);

impl TableSource for FakeTables {
    fn load_table(&self, path: &Path) -> Result<Table, String> {
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| format!("no such file: {}", path.display()))
    }
}

/// Hourly history for every listed symbol; `failing` symbols error on fetch.
#[derive(Default)]
struct FakeExchange {
    listed: Vec<String>,
    failing: HashSet<String>,
    directory_down: bool,
    directory_calls: RefCell<u32>,
    requests: RefCell<Vec<KlinePageRequest>>,
}

impl SymbolDirectory for FakeExchange {
    fn list_symbols(&self) -> Result<Vec<String>, String> {
        *self.directory_calls.borrow_mut() += 1;
        if self.directory_down {
            return Err("exchangeInfo request failed with status 503".to_string());
        }
        Ok(self.listed.clone())
    }
}

impl KlineSource for FakeExchange {
    fn fetch_page(&self, request: &KlinePageRequest) -> Result<Vec<RawKline>, String> {
        self.requests.borrow_mut().push(request.clone());
        if self.failing.contains(request.symbol.as_str()) {
            return Err("klines request failed with status 500".to_string());
        }
        let first_bucket = (request.start_ms + HOUR - 1).div_euclid(HOUR) * HOUR;
        Ok((0..request.limit as i64)
            .map(|i| first_bucket + i * HOUR)
            .take_while(|ts| *ts <= request.end_ms)
            .map(kline_row)
            .collect())
    }
}

fn kline_row(open_time: i64) -> RawKline {
    RawKline(vec![
        json!(open_time),
        json!("100.0"),
        json!("101.0"),
        json!("99.0"),
        json!("100.5"),
        json!("5.0"),
        json!(open_time + HOUR - 1),
        json!("502.5"),
        json!(12),
        json!("2.5"),
        json!("251.25"),
        json!("0"),
    ])
}

#[derive(Default)]
struct RecordingWriter {
    dirs: RefCell<Vec<PathBuf>>,
    written: RefCell<Vec<(PathBuf, usize)>>,
}

impl TableWriter for RecordingWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        self.dirs.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn write_table(&self, path: &Path, table: &Table) -> Result<(), String> {
        self.written
            .borrow_mut()
            .push((path.to_path_buf(), table.len()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingWarehouse {
    loads: RefCell<Vec<(String, usize, WriteMode)>>,
    reject: Option<String>,
}

impl WarehouseSink for RecordingWarehouse {
    fn load_table(&self, table_name: &str, table: &Table, mode: WriteMode) -> Result<u64, String> {
        if self.reject.as_deref() == Some(table_name) {
            return Err("permission denied".to_string());
        }
        self.loads
            .borrow_mut()
            .push((table_name.to_string(), table.len(), mode));
        Ok(table.len() as u64)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

fn text_table(columns: &[&str], rows: &[&[&str]]) -> Table {
    let mut table = Table::new(
        columns
            .iter()
            .map(|name| Column::new(*name, ColumnKind::Text))
            .collect(),
    );
    for row in rows {
        table
            .push_row(row.iter().map(|v| Cell::Text(v.to_string())).collect())
            .unwrap();
    }
    table
}

fn config() -> Config {
    let mut config = Config::default();
    config.exchange.request_delay_ms = 0;
    config.exchange.page_size = 2;
    config.inputs.transactions_csv = "in/transactions.csv".to_string();
    config.inputs.users_csv = "in/users.csv".to_string();
    config.output.out_dir = "out".to_string();
    config.warehouse.project_id = Some("analytics".to_string());
    config.warehouse.dataset = Some("raw".to_string());
    config
}

fn inputs(currencies: &[&str]) -> FakeTables {
    let stamps = ["2024-01-01 00:00:00", "2024-01-01 03:00:00"];
    let rows: Vec<Vec<&str>> = currencies
        .iter()
        .enumerate()
        .map(|(idx, currency)| vec!["tx", stamps[idx % stamps.len()], *currency])
        .collect();
    let row_refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
    let transactions = text_table(&["id", "created_at", "destination_currency"], &row_refs);
    let users = text_table(&["user_id", "country"], &[&["u1", "BR"], &["u2", "PT"]]);

    let mut files = HashMap::new();
    files.insert(PathBuf::from("in/transactions.csv"), transactions);
    files.insert(PathBuf::from("in/users.csv"), users);
    FakeTables(files)
}

fn listed(symbols: &[&str]) -> FakeExchange {
    FakeExchange {
        listed: symbols.iter().map(|s| s.to_string()).collect(),
        ..FakeExchange::default()
    }
}

#[test]
fn run_fetches_available_symbols_and_uploads_three_tables() {
    let tables = inputs(&["BTC", "USDT", "XYZ", "BTC"]);
    let exchange = listed(&["BTCUSDT", "ETHUSDT"]);
    let writer = RecordingWriter::default();
    let warehouse = RecordingWarehouse::default();
    let deps = PipelineDeps {
        tables: &tables,
        directory: &exchange,
        klines: &exchange,
        checkpoint: &writer,
        warehouse: &warehouse,
    };

    let report = run_pipeline(&config(), &deps).expect("pipeline");

    let window = report.window.expect("window");
    assert_eq!(window.start_ms, DAY_START);
    assert_eq!(window.end_ms, DAY_START + 3 * HOUR);
    assert_eq!(report.currencies, vec!["BTC", "USDT", "XYZ"]);
    assert_eq!(report.resolution.available.len(), 1);
    assert_eq!(report.resolution.available[0].as_str(), "BTCUSDT");
    assert_eq!(report.resolution.missing[0].as_str(), "XYZUSDT");
    assert_eq!(*exchange.directory_calls.borrow(), 1);

    assert_eq!(report.fetched.len(), 1);
    assert_eq!(report.fetched[0].rows, 4);
    assert_eq!(report.fetched[0].pages, 2);
    assert_eq!(report.fetched[0].stop, StopReason::Covered);
    assert_eq!(report.kline_rows, 4);

    let requests = exchange.requests.borrow();
    assert!(requests.iter().all(|r| r.symbol.as_str() == "BTCUSDT"));
    assert_eq!(requests[0].start_ms, DAY_START);
    assert_eq!(requests[1].start_ms, DAY_START + HOUR + 1);

    let checkpoint = Path::new("out").join("all_klines.csv");
    assert_eq!(report.checkpoint.as_deref(), Some(checkpoint.as_path()));
    assert_eq!(*writer.dirs.borrow(), vec![PathBuf::from("out")]);
    assert_eq!(*writer.written.borrow(), vec![(checkpoint, 4)]);

    let loads = warehouse.loads.borrow();
    assert_eq!(
        *loads,
        vec![
            ("transactions".to_string(), 4, WriteMode::Replace),
            ("users".to_string(), 2, WriteMode::Replace),
            ("klines".to_string(), 4, WriteMode::Replace),
        ]
    );
    assert_eq!(report.loaded.len(), 3);
}

#[test]
fn fetch_failure_aborts_before_any_upload() {
    let tables = inputs(&["BTC", "ETH"]);
    let mut exchange = listed(&["BTCUSDT", "ETHUSDT"]);
    exchange.failing.insert("ETHUSDT".to_string());
    let writer = RecordingWriter::default();
    let warehouse = RecordingWarehouse::default();
    let deps = PipelineDeps {
        tables: &tables,
        directory: &exchange,
        klines: &exchange,
        checkpoint: &writer,
        warehouse: &warehouse,
    };

    let err = run_pipeline(&config(), &deps).expect_err("abort");
    assert!(matches!(err, PipelineError::FetchFailed { ref symbol, .. } if symbol == "ETHUSDT"));
    assert!(writer.written.borrow().is_empty());
    assert!(warehouse.loads.borrow().is_empty());
}

#[test]
fn skip_policy_drops_failed_symbol_and_completes() {
    let tables = inputs(&["ETH", "BTC"]);
    let mut exchange = listed(&["BTCUSDT", "ETHUSDT"]);
    exchange.failing.insert("ETHUSDT".to_string());
    let writer = RecordingWriter::default();
    let warehouse = RecordingWarehouse::default();
    let deps = PipelineDeps {
        tables: &tables,
        directory: &exchange,
        klines: &exchange,
        checkpoint: &writer,
        warehouse: &warehouse,
    };
    let mut config = config();
    config.fetch.on_symbol_error = SymbolErrorPolicy::Skip;

    let report = run_pipeline(&config, &deps).expect("pipeline");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].symbol.as_str(), "ETHUSDT");
    assert!(report.skipped[0].reason.contains("500"));
    assert_eq!(report.fetched.len(), 1);
    assert_eq!(report.fetched[0].symbol.as_str(), "BTCUSDT");
    assert_eq!(warehouse.loads.borrow().len(), 3);
}

#[test]
fn directory_outage_stops_before_fetching() {
    let tables = inputs(&["BTC"]);
    let mut exchange = listed(&["BTCUSDT"]);
    exchange.directory_down = true;
    let writer = RecordingWriter::default();
    let warehouse = RecordingWarehouse::default();
    let deps = PipelineDeps {
        tables: &tables,
        directory: &exchange,
        klines: &exchange,
        checkpoint: &writer,
        warehouse: &warehouse,
    };

    let err = run_pipeline(&config(), &deps).expect_err("directory down");
    assert!(matches!(err, PipelineError::DirectoryUnavailable(_)));
    assert!(exchange.requests.borrow().is_empty());
    assert!(warehouse.loads.borrow().is_empty());
}

#[test]
fn quote_only_currencies_skip_fetch_and_kline_upload() {
    let tables = inputs(&["USDT"]);
    let exchange = listed(&["BTCUSDT"]);
    let writer = RecordingWriter::default();
    let warehouse = RecordingWarehouse::default();
    let deps = PipelineDeps {
        tables: &tables,
        directory: &exchange,
        klines: &exchange,
        checkpoint: &writer,
        warehouse: &warehouse,
    };

    let report = run_pipeline(&config(), &deps).expect("pipeline");
    assert_eq!(report.resolution.candidates(), 0);
    assert_eq!(*exchange.directory_calls.borrow(), 1);
    assert!(exchange.requests.borrow().is_empty());
    assert!(report.checkpoint.is_none());
    assert!(writer.written.borrow().is_empty());
    let tables_loaded: Vec<String> = warehouse
        .loads
        .borrow()
        .iter()
        .map(|(name, _, _)| name.clone())
        .collect();
    assert_eq!(tables_loaded, vec!["transactions", "users"]);
}

#[test]
fn warehouse_rejection_is_upload_failed() {
    let tables = inputs(&["BTC"]);
    let exchange = listed(&["BTCUSDT"]);
    let writer = RecordingWriter::default();
    let warehouse = RecordingWarehouse {
        reject: Some("users".to_string()),
        ..RecordingWarehouse::default()
    };
    let deps = PipelineDeps {
        tables: &tables,
        directory: &exchange,
        klines: &exchange,
        checkpoint: &writer,
        warehouse: &warehouse,
    };
    let mut config = config();
    config.warehouse.write_mode = WriteMode::Append;

    let err = run_pipeline(&config, &deps).expect_err("upload rejected");
    assert!(matches!(err, PipelineError::UploadFailed { ref table, .. } if table == "users"));
    let loads = warehouse.loads.borrow();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].2, WriteMode::Append);
}

#[test]
fn missing_input_file_is_input_load_failed() {
    let tables = FakeTables(HashMap::new());
    let exchange = listed(&[]);
    let writer = RecordingWriter::default();
    let warehouse = RecordingWarehouse::default();
    let deps = PipelineDeps {
        tables: &tables,
        directory: &exchange,
        klines: &exchange,
        checkpoint: &writer,
        warehouse: &warehouse,
    };

    let err = run_pipeline(&config(), &deps).expect_err("no inputs");
    match err {
        PipelineError::InputLoadFailed { path, .. } => {
            assert_eq!(path, PathBuf::from("in/transactions.csv"))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(*exchange.directory_calls.borrow(), 0);
}

#[test]
fn invalid_config_is_rejected_before_any_io() {
    let tables = inputs(&["BTC"]);
    let exchange = listed(&["BTCUSDT"]);
    let writer = RecordingWriter::default();
    let warehouse = RecordingWarehouse::default();
    let deps = PipelineDeps {
        tables: &tables,
        directory: &exchange,
        klines: &exchange,
        checkpoint: &writer,
        warehouse: &warehouse,
    };
    let mut config = config();
    config.exchange.page_size = 0;

    let err = run_pipeline(&config, &deps).expect_err("invalid config");
    assert!(matches!(err, PipelineError::InvalidConfig(ref msg) if msg.contains("page_size")));
    assert_eq!(*exchange.directory_calls.borrow(), 0);
}
