use crate::tabular::csv::write_csv_table;
use klinesync_domain::repositories::warehouse::{WarehouseSink, WriteMode};
use klinesync_domain::value_objects::table::Table;
use std::fs;
use std::path::PathBuf;

/// Offline warehouse: each table becomes `<root>/<dataset>/<table>.csv`.
#[derive(Debug, Clone)]
pub struct CsvDirectoryWarehouse {
    pub root: PathBuf,
    pub dataset: String,
}

impl CsvDirectoryWarehouse {
    pub fn new(root: impl Into<PathBuf>, dataset: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dataset: dataset.into(),
        }
    }

    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.root
            .join(&self.dataset)
            .join(format!("{table_name}.csv"))
    }
}

impl WarehouseSink for CsvDirectoryWarehouse {
    fn load_table(&self, table_name: &str, table: &Table, mode: WriteMode) -> Result<u64, String> {
        let dir = self.root.join(&self.dataset);
        fs::create_dir_all(&dir)
            .map_err(|err| format!("failed to create directory {}: {}", dir.display(), err))?;
        let path = self.table_path(table_name);
        write_csv_table(&path, table, mode == WriteMode::Append)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "csv table written");
        Ok(table.len() as u64)
    }

    fn describe(&self) -> String {
        format!("csv://{}", self.root.join(&self.dataset).display())
    }
}
