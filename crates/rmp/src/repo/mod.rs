//! Row level access to the database.
//!
//! Repositories are free functions over a borrowed [`rusqlite::Connection`],
//! so the same function works on a plain connection and inside a
//! transaction. They do not check business rules, that is the job of
//! [`crate::service`].

use chrono::{DateTime, Utc};

use crate::common::error::RmpError;

pub mod allocation;
pub mod audit;
pub mod employee;
pub mod permission;
pub mod project;
pub mod quiz;
pub mod skill;
pub mod training;
pub mod user;

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Turns "no row was touched" into a `NotFound` error.
pub(crate) fn expect_changed<I: ToString>(
    changed: usize,
    entity: &'static str,
    id: I,
) -> crate::Result<()> {
    if changed == 0 {
        Err(RmpError::not_found(entity, id))
    } else {
        Ok(())
    }
}
