use chrono::NaiveDate;
use thiserror::Error;

use crate::fte::Fte;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StaffingError {
    #[error("Invalid FTE value: {0}")]
    InvalidFte(String),
    #[error("Invalid period: end {end} is before start {start}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
    #[error("Over-allocation on {date}: load {load} exceeds capacity {capacity}")]
    OverAllocated {
        date: NaiveDate,
        load: Fte,
        capacity: Fte,
    },
    #[error("Unknown {kind} `{value}`")]
    UnknownName { kind: &'static str, value: String },
    #[error("Permissions of role `admin` cannot be changed")]
    ImmutableRole,
}
