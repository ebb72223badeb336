use klinesync_domain::repositories::warehouse::{WarehouseSink, WriteMode};
use klinesync_domain::value_objects::table::{Cell, Column, ColumnKind, Table};
use postgres::types::ToSql;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use std::time::Instant;

// Postgres caps bind parameters per statement at 65535.
const MAX_PARAMS_PER_STATEMENT: usize = 60_000;
const MAX_ROWS_PER_STATEMENT: usize = 1_000;

/// Warehouse backed by Postgres: the project maps to the database and the
/// dataset to a schema inside it.
#[derive(Debug, Clone)]
pub struct PostgresWarehouse {
    pool: Pool<PostgresConnectionManager<NoTls>>,
    pub database: String,
    pub schema: String,
}

impl PostgresWarehouse {
    pub fn new(config: postgres::Config, schema: String, pool_max_size: u32) -> Result<Self, String> {
        validate_table_name(&schema)
            .map_err(|err| format!("invalid dataset '{}': {}", schema, err))?;
        let database = config.get_dbname().unwrap_or_default().to_string();
        let manager = PostgresConnectionManager::new(config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_max_size)
            .build(manager)
            .map_err(|err| format!("failed to build postgres pool: {err}"))?;
        Ok(Self::with_pool(pool, database, schema))
    }

    pub fn with_pool(
        pool: Pool<PostgresConnectionManager<NoTls>>,
        database: String,
        schema: String,
    ) -> Self {
        Self {
            pool,
            database,
            schema,
        }
    }
}

impl WarehouseSink for PostgresWarehouse {
    fn load_table(&self, table_name: &str, table: &Table, mode: WriteMode) -> Result<u64, String> {
        load_postgres(&self.pool, &self.schema, table_name, table, mode)
    }

    fn describe(&self) -> String {
        format!("postgres://{}/{}", self.database, self.schema)
    }
}

pub fn load_postgres(
    pool: &Pool<PostgresConnectionManager<NoTls>>,
    schema: &str,
    table_name: &str,
    table: &Table,
    mode: WriteMode,
) -> Result<u64, String> {
    let overall_start = Instant::now();
    let span = tracing::info_span!(
        "infra.postgres.load_table",
        schema = %schema,
        table = %table_name,
        mode = mode.as_str(),
        rows = table.len()
    );
    let _enter = span.enter();

    let fail = |stage: &'static str, err: String| {
        metrics::counter!("klinesync.infra.postgres.load_table.calls_total", "result" => "err")
            .increment(1);
        metrics::counter!(
            "klinesync.infra.postgres.load_table.errors_total",
            "stage" => stage
        )
        .increment(1);
        tracing::error!(stage, error = %err, "postgres load failed");
        err
    };

    let qualified = format!("{schema}.{table_name}");
    validate_table_name(&qualified).map_err(|err| fail("validate_table", err))?;
    if table.columns.is_empty() {
        return Err(fail(
            "validate_table",
            format!("table {qualified} has no columns"),
        ));
    }

    let get_start = Instant::now();
    let mut client = pool.get().map_err(|err| {
        fail(
            "pool_get",
            format!("failed to checkout postgres connection: {err}"),
        )
    })?;
    metrics::histogram!("klinesync.infra.postgres.pool.get_ms")
        .record(get_start.elapsed().as_secs_f64() * 1000.0);

    let mut tx = client
        .transaction()
        .map_err(|err| fail("begin", format!("failed to begin transaction: {err}")))?;

    let mut ddl = format!("CREATE SCHEMA IF NOT EXISTS {schema};\n");
    if mode == WriteMode::Replace {
        ddl.push_str(&format!("DROP TABLE IF EXISTS {qualified};\n"));
    }
    ddl.push_str(&create_table_sql(&qualified, &table.columns));
    tx.batch_execute(&ddl)
        .map_err(|err| fail("ddl", format!("failed to prepare table {qualified}: {err}")))?;

    let insert_start = Instant::now();
    let mut written = 0u64;
    for chunk in table.rows.chunks(rows_per_statement(table.columns.len())) {
        let sql = insert_sql(&qualified, &table.columns, chunk.len());
        let mut params: Vec<Box<dyn ToSql + Sync>> =
            Vec::with_capacity(chunk.len() * table.columns.len());
        for (row_idx, row) in chunk.iter().enumerate() {
            for (cell, column) in row.iter().zip(&table.columns) {
                let param = cell_param(cell, column).map_err(|err| {
                    fail(
                        "bind",
                        format!("row {}: {}", written as usize + row_idx + 1, err),
                    )
                })?;
                params.push(param);
            }
        }
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();
        written += tx
            .execute(sql.as_str(), &refs)
            .map_err(|err| fail("insert", format!("failed to insert into {qualified}: {err}")))?;
    }
    metrics::histogram!("klinesync.infra.postgres.insert_ms")
        .record(insert_start.elapsed().as_secs_f64() * 1000.0);

    tx.commit()
        .map_err(|err| fail("commit", format!("failed to commit {qualified}: {err}")))?;

    metrics::counter!("klinesync.infra.postgres.load_table.calls_total", "result" => "ok")
        .increment(1);
    metrics::histogram!("klinesync.infra.postgres.load_table_ms")
        .record(overall_start.elapsed().as_secs_f64() * 1000.0);
    tracing::debug!(rows = written, "postgres table loaded");
    Ok(written)
}

fn rows_per_statement(columns: usize) -> usize {
    (MAX_PARAMS_PER_STATEMENT / columns.max(1)).clamp(1, MAX_ROWS_PER_STATEMENT)
}

fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Text => "TEXT",
        ColumnKind::Int => "BIGINT",
        ColumnKind::Float => "DOUBLE PRECISION",
    }
}

/// Column names come from input headers, so they are always quoted.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(qualified: &str, columns: &[Column]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(c.kind)))
        .collect();
    format!("CREATE TABLE IF NOT EXISTS {qualified} ({});", defs.join(", "))
}

fn insert_sql(qualified: &str, columns: &[Column], rows: usize) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let width = columns.len();
    let tuples: Vec<String> = (0..rows)
        .map(|row| {
            let slots: Vec<String> = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect();
            format!("({})", slots.join(", "))
        })
        .collect();
    format!(
        "INSERT INTO {qualified} ({}) VALUES {}",
        names.join(", "),
        tuples.join(", ")
    )
}

fn cell_param(cell: &Cell, column: &Column) -> Result<Box<dyn ToSql + Sync>, String> {
    let param: Box<dyn ToSql + Sync> = match (column.kind, cell) {
        (ColumnKind::Text, Cell::Null) => Box::new(None::<String>),
        (ColumnKind::Text, other) => Box::new(Some(other.render())),
        (ColumnKind::Int, Cell::Null) => Box::new(None::<i64>),
        (ColumnKind::Int, Cell::Int(value)) => Box::new(Some(*value)),
        (ColumnKind::Float, Cell::Null) => Box::new(None::<f64>),
        (ColumnKind::Float, Cell::Float(value)) => Box::new(Some(*value)),
        (ColumnKind::Float, Cell::Int(value)) => Box::new(Some(*value as f64)),
        (kind, other) => {
            return Err(format!(
                "column {} expects {:?} but got {:?}",
                column.name, kind, other
            ))
        }
    };
    Ok(param)
}

fn validate_table_name(table: &str) -> Result<(), String> {
    if table.is_empty() {
        return Err("table name is empty".to_string());
    }
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(format!("invalid table name: {table}"));
    }
    for part in parts {
        let mut chars = part.chars();
        let valid = match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            }
            _ => false,
        };
        if !valid {
            return Err(format!("invalid table name: {table}"));
        }
    }
    Ok(())
}
