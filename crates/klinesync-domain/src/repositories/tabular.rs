use crate::value_objects::table::Table;
use std::path::Path;

pub trait TableSource {
    fn load_table(&self, path: &Path) -> Result<Table, String>;
}

pub trait TableWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    fn write_table(&self, path: &Path, table: &Table) -> Result<(), String>;
}
