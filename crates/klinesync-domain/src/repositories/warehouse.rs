use crate::value_objects::table::Table;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Replace,
    Append,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Replace => "replace",
            WriteMode::Append => "append",
        }
    }
}

/// Analytical store receiving the final tables.
pub trait WarehouseSink {
    /// Loads `table` into `table_name`, returning the number of rows written.
    fn load_table(&self, table_name: &str, table: &Table, mode: WriteMode) -> Result<u64, String>;

    /// Human-readable destination, used in logs.
    fn describe(&self) -> String;
}
