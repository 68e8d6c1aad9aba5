pub mod employee;
pub mod permissions;
pub mod report;
pub mod server;
pub mod user;
pub mod zoho;
