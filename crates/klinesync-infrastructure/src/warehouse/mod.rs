pub mod csv_dir;
pub mod postgres;

pub use csv_dir::CsvDirectoryWarehouse;
pub use self::postgres::PostgresWarehouse;
