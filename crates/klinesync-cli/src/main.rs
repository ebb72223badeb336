mod commands;
mod config;
mod infra;
mod obs;

use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::Command;
use config::Overrides;
use klinesync_domain::repositories::warehouse::WriteMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "klinesync")]
#[command(
    about = "Fetch exchange klines for the transaction date range and load them into the warehouse.",
    version,
    arg_required_else_help = true
)]
#[command(
    after_help = "Examples:\n  klinesync run --config configs/sample.toml --project-id analytics --dataset raw\n  klinesync validate --config configs/sample.toml\n  klinesync print-config --config configs/sample.toml --write-mode append\n"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Config file path (TOML). If omitted, uses env KLINESYNC_CONFIG, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Warehouse project (Postgres database).
    #[arg(long)]
    project_id: Option<String>,
    /// Warehouse dataset (Postgres schema or CSV sub-directory).
    #[arg(long)]
    dataset: Option<String>,
    /// Warehouse credentials file (JSON).
    #[arg(long)]
    credentials: Option<String>,
    /// Log and skip symbols whose fetch fails instead of aborting the run.
    #[arg(long, default_value_t = false)]
    skip_failed_symbols: bool,
    #[arg(long, value_enum)]
    write_mode: Option<WriteModeArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum WriteModeArg {
    Replace,
    Append,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Fetch klines and load all tables.
    Run {
        #[command(flatten)]
        config: ConfigArgs,
        /// text | json (overrides [log].format)
        #[arg(long)]
        log_format: Option<String>,
        /// Expose Prometheus metrics on host:port.
        #[arg(long)]
        metrics_addr: Option<String>,
        /// Print the run summary as a single JSON line.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Check config and input files without touching the network.
    Validate {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the resolved config as TOML.
    PrintConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

impl From<ConfigArgs> for Overrides {
    fn from(args: ConfigArgs) -> Self {
        Overrides {
            config_path: args.config,
            project_id: args.project_id,
            dataset: args.dataset,
            credentials: args.credentials,
            skip_failed_symbols: args.skip_failed_symbols,
            write_mode: args.write_mode.map(|mode| match mode {
                WriteModeArg::Replace => WriteMode::Replace,
                WriteModeArg::Append => WriteMode::Append,
            }),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let command = match cli.command {
        CliCommand::Run {
            config,
            log_format,
            metrics_addr,
            json,
        } => Command::Run {
            overrides: config.into(),
            log_format,
            metrics_addr,
            json,
        },
        CliCommand::Validate { config } => Command::Validate {
            overrides: config.into(),
        },
        CliCommand::PrintConfig { config } => Command::PrintConfig {
            overrides: config.into(),
        },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
