pub mod exchange;
pub mod tabular;
pub mod warehouse;
