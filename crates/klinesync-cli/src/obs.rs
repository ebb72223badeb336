use std::net::SocketAddr;

/// Every metric this binary records starts with this prefix.
#[cfg(feature = "prometheus")]
pub const METRICS_PREFIX: &str = "klinesync.";

/// Latency buckets (ms) for exchange requests, warehouse loads and whole runs.
#[cfg(feature = "prometheus")]
const LATENCY_BUCKETS_MS: &[f64] = &[
    5.0, 25.0, 100.0, 250.0, 1_000.0, 5_000.0, 30_000.0, 120_000.0, 600_000.0,
];

/// Logs go to stderr so that stdout only carries command output.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<(), String> {
    let filter = std::env::var("KLINESYNC_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let format = log_format.trim().to_lowercase();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match format.as_str() {
        "json" => builder
            .json()
            .try_init()
            .map_err(|err| format!("failed to init tracing: {err}")),
        "text" | "" => builder
            .try_init()
            .map_err(|err| format!("failed to init tracing: {err}")),
        other => Err(format!("unsupported log format: {other} (expected text|json)")),
    }
}

fn parse_metrics_addr(raw: &str) -> Result<SocketAddr, String> {
    raw.trim()
        .parse()
        .map_err(|err| format!("invalid --metrics-addr {raw:?} (expected host:port): {err}"))
}

/// Serves the `klinesync.*` metrics on `metrics_addr` for the lifetime of
/// the run. Returns the bound address when an exporter was installed.
#[cfg(feature = "prometheus")]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let Some(raw) = metrics_addr else {
        return Ok(None);
    };
    let addr = parse_metrics_addr(raw)?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", METRICS_PREFIX.trim_end_matches('.'))
        .set_buckets_for_metric(Matcher::Suffix("_ms".to_string()), LATENCY_BUCKETS_MS)
        .map_err(|err| format!("invalid latency buckets: {err}"))?
        .install()
        .map_err(|err| format!("failed to install prometheus exporter on {addr}: {err}"))?;
    describe_metrics();

    tracing::info!(metrics_addr = %addr, prefix = METRICS_PREFIX, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    match metrics_addr {
        Some(raw) => {
            parse_metrics_addr(raw)?;
            Err("--metrics-addr needs klinesync-cli built with feature `prometheus`".to_string())
        }
        None => Ok(None),
    }
}

#[cfg(feature = "prometheus")]
fn describe_metrics() {
    use metrics::{describe_counter, describe_histogram, Unit};

    describe_counter!("klinesync.cli.runs_total", "Completed runs by result.");
    describe_counter!(
        "klinesync.exchange.requests_total",
        "Exchange REST calls by endpoint and result."
    );
    describe_histogram!(
        "klinesync.exchange.request_ms",
        Unit::Milliseconds,
        "Exchange REST call latency."
    );
    describe_counter!("klinesync.fetch.pages_total", "Kline pages requested.");
    describe_counter!("klinesync.fetch.rows_total", "Kline rows kept after trimming.");
    describe_counter!(
        "klinesync.fetch.skipped_total",
        "Symbols skipped after a fetch error."
    );
    describe_histogram!(
        "klinesync.fetch.symbol_ms",
        Unit::Milliseconds,
        "Time spent fetching one symbol."
    );
    describe_counter!("klinesync.warehouse.rows_total", "Rows loaded per table.");
    describe_counter!("klinesync.warehouse.errors_total", "Failed table loads.");
    describe_histogram!(
        "klinesync.pipeline.run_ms",
        Unit::Milliseconds,
        "Wall time of a full pipeline run."
    );
}
