//! Business rules of the portal.
//!
//! Every operation takes the connection (or an open transaction) and the
//! [`access::Access`] of the caller, checks the permission matrix and writes
//! an audit record for mutations. Operations do not open transactions
//! themselves; callers wrap mutations in [`crate::db::Database::transaction`].

use chrono::{Local, NaiveDate};

pub mod access;
pub mod allocation;
pub mod audit;
pub mod auth;
pub mod employee;
pub mod permission;
pub mod project;
pub mod quiz;
pub mod skill;
pub mod training;

/// Today in the server's local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
