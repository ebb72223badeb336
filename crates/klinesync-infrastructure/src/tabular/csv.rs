use klinesync_domain::repositories::tabular::{TableSource, TableWriter};
use klinesync_domain::value_objects::table::{Cell, Column, ColumnKind, Table};
use std::fs;
use std::path::Path;

/// Reads headed CSV files into all-text tables; empty fields become nulls.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableReader;

impl TableSource for CsvTableReader {
    fn load_table(&self, path: &Path) -> Result<Table, String> {
        read_csv_table(path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableWriter;

impl TableWriter for CsvTableWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        fs::create_dir_all(path)
            .map_err(|err| format!("failed to create directory {}: {}", path.display(), err))
    }

    fn write_table(&self, path: &Path, table: &Table) -> Result<(), String> {
        write_csv_table(path, table, false)
    }
}

pub fn read_csv_table(path: &Path) -> Result<Table, String> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open csv {}: {}", path.display(), err))?;
    let headers = reader
        .headers()
        .map_err(|err| format!("failed to read csv header {}: {}", path.display(), err))?
        .clone();

    let mut table = Table::new(
        headers
            .iter()
            .map(|name| Column::new(name.trim(), ColumnKind::Text))
            .collect(),
    );
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|err| {
            format!("failed to read csv row {} in {}: {}", idx + 1, path.display(), err)
        })?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Null
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        table
            .push_row(row)
            .map_err(|err| format!("csv row {} in {}: {}", idx + 1, path.display(), err))?;
    }

    tracing::debug!(path = %path.display(), rows = table.len(), "csv table loaded");
    Ok(table)
}

/// Writes `table` to `path`. With `append`, rows go to the end of an existing
/// file and the header is only written when the file is new or empty. An
/// existing header must name the same columns in the same order.
pub fn write_csv_table(path: &Path, table: &Table, append: bool) -> Result<(), String> {
    let existing_len = if append {
        fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
    } else {
        0
    };
    if existing_len > 0 {
        ensure_same_header(path, table)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|err| format!("failed to create csv {}: {}", path.display(), err))?;
    let mut wtr = csv::Writer::from_writer(file);

    if existing_len == 0 {
        wtr.write_record(table.columns.iter().map(|c| c.name.as_str()))
            .map_err(|err| format!("failed to write csv header {}: {}", path.display(), err))?;
    }
    for row in &table.rows {
        wtr.write_record(row.iter().map(Cell::render))
            .map_err(|err| format!("failed to write csv row {}: {}", path.display(), err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush csv {}: {}", path.display(), err))
}

fn ensure_same_header(path: &Path, table: &Table) -> Result<(), String> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open csv {}: {}", path.display(), err))?;
    let existing: Vec<String> = reader
        .headers()
        .map_err(|err| format!("failed to read csv header {}: {}", path.display(), err))?
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    let incoming: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    if existing != incoming {
        return Err(format!(
            "cannot append to {}: existing columns [{}] differ from [{}]",
            path.display(),
            existing.join(","),
            incoming.join(",")
        ));
    }
    Ok(())
}
