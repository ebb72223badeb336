use klinesync_application::config::{Config, WarehouseKind};
use klinesync_application::pipeline::PipelineDeps;
use klinesync_domain::repositories::warehouse::WarehouseSink;
use klinesync_infrastructure::credentials::resolve_credentials;
use klinesync_infrastructure::exchange::BinanceClient;
use klinesync_infrastructure::tabular::{CsvTableReader, CsvTableWriter};
use klinesync_infrastructure::warehouse::{CsvDirectoryWarehouse, PostgresWarehouse};
use std::path::Path;

const WAREHOUSE_POOL_MAX_SIZE: u32 = 2;

/// Owned adapters for a run; borrow them as [`PipelineDeps`].
pub struct RunDeps {
    pub exchange: BinanceClient,
    pub tables: CsvTableReader,
    pub checkpoint: CsvTableWriter,
    pub warehouse: Box<dyn WarehouseSink>,
}

impl RunDeps {
    pub fn as_pipeline_deps(&self) -> PipelineDeps<'_> {
        PipelineDeps {
            tables: &self.tables,
            directory: &self.exchange,
            klines: &self.exchange,
            checkpoint: &self.checkpoint,
            warehouse: self.warehouse.as_ref(),
        }
    }
}

pub fn build_run_deps(config: &Config) -> Result<RunDeps, String> {
    let exchange = BinanceClient::new(
        config.exchange.base_url.clone(),
        config.exchange.request_timeout_ms,
    )?;
    Ok(RunDeps {
        exchange,
        tables: CsvTableReader,
        checkpoint: CsvTableWriter,
        warehouse: build_warehouse(config)?,
    })
}

fn build_warehouse(config: &Config) -> Result<Box<dyn WarehouseSink>, String> {
    let warehouse = &config.warehouse;
    let dataset = warehouse
        .dataset
        .clone()
        .ok_or_else(|| "missing warehouse.dataset (or --dataset)".to_string())?;

    match warehouse.kind {
        WarehouseKind::Csv => Ok(Box::new(CsvDirectoryWarehouse::new(
            &warehouse.csv_dir,
            dataset,
        ))),
        WarehouseKind::Postgres => {
            let project_id = warehouse
                .project_id
                .as_deref()
                .ok_or_else(|| "missing warehouse.project_id (or --project-id)".to_string())?;
            let source = resolve_credentials(warehouse.credentials.as_deref().map(Path::new))?;
            tracing::info!(
                credentials = %source.describe(),
                database = project_id,
                schema = %dataset,
                "connecting to postgres warehouse"
            );
            let pg_config = source.postgres_config(project_id)?;
            Ok(Box::new(PostgresWarehouse::new(
                pg_config,
                dataset,
                WAREHOUSE_POOL_MAX_SIZE,
            )?))
        }
    }
}
