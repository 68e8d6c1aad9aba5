pub mod client;
pub mod common;
pub mod db;
pub mod repo;
pub mod report;
pub mod server;
pub mod service;
pub mod zoho;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::RmpError;
pub type Result<T> = std::result::Result<T, Error>;

pub const RMP_VERSION: &str = env!("CARGO_PKG_VERSION");

// Reexports
pub use staffing;
