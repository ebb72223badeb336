pub mod csv;

pub use self::csv::{CsvTableReader, CsvTableWriter};
