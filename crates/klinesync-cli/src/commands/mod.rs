mod common;
mod print_config;
mod run;
mod validate;

use crate::config::Overrides;

pub enum Command {
    Run {
        overrides: Overrides,
        log_format: Option<String>,
        metrics_addr: Option<String>,
        json: bool,
    },
    Validate {
        overrides: Overrides,
    },
    PrintConfig {
        overrides: Overrides,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Run {
            overrides,
            log_format,
            metrics_addr,
            json,
        } => run::run_pipeline_command(&overrides, log_format, metrics_addr, json),
        Command::Validate { overrides } => validate::run_validate(&overrides),
        Command::PrintConfig { overrides } => print_config::run_print_config(&overrides),
    }
}
