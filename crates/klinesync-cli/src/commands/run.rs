use super::common::{print_config_summary, print_report, report_json};
use crate::config::{resolve_config, Overrides};
use klinesync_application::config::validate_config;
use klinesync_application::pipeline::run_pipeline;

pub(super) fn run_pipeline_command(
    overrides: &Overrides,
    log_format: Option<String>,
    metrics_addr: Option<String>,
    json: bool,
) -> Result<(), String> {
    let config = resolve_config(overrides)?;
    let log_format = log_format.unwrap_or_else(|| config.log.format.clone());
    crate::obs::init_tracing(&config.log.level, &log_format)?;
    crate::obs::init_metrics(metrics_addr.as_deref())?;
    validate_config(&config)?;

    if !json {
        print_config_summary("run", &config);
    }

    let deps = crate::infra::build_run_deps(&config)?;
    let result = run_pipeline(&config, &deps.as_pipeline_deps());
    let outcome = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!("klinesync.cli.runs_total", "result" => outcome).increment(1);
    let report = result.map_err(|err| err.to_string())?;

    if json {
        println!("{}", report_json(&report));
    } else {
        print_report(&report);
    }
    Ok(())
}
