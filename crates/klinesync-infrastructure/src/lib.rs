pub mod credentials;
pub mod exchange;
pub mod tabular;
pub mod warehouse;
