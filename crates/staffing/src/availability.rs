use chrono::NaiveDate;
use serde::Serialize;

use crate::fte::Fte;
use crate::ledger::Ledger;
use crate::named_enum;

named_enum!(AvailabilityStatus, "availability status", {
    Bench => "bench",
    PartiallyAllocated => "partially_allocated",
    FullyAllocated => "fully_allocated",
    OverAllocated => "over_allocated",
    Inactive => "inactive",
});

impl AvailabilityStatus {
    pub fn from_load(load: Fte, capacity: Fte) -> Self {
        if load.is_zero() {
            AvailabilityStatus::Bench
        } else if load < capacity {
            AvailabilityStatus::PartiallyAllocated
        } else if load == capacity {
            AvailabilityStatus::FullyAllocated
        } else {
            AvailabilityStatus::OverAllocated
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub date: NaiveDate,
    pub status: AvailabilityStatus,
    pub capacity: Fte,
    pub allocated: Fte,
    pub available: Fte,
    /// First day with free capacity, `None` when the employee is booked indefinitely.
    pub free_from: Option<NaiveDate>,
}

impl Availability {
    pub fn utilization(&self) -> f64 {
        self.allocated.percentage_of(self.capacity)
    }
}

pub fn derive_availability(
    ledger: &Ledger,
    capacity: Fte,
    date: NaiveDate,
    active: bool,
) -> Availability {
    if !active {
        return Availability {
            date,
            status: AvailabilityStatus::Inactive,
            capacity,
            allocated: Fte::ZERO,
            available: Fte::ZERO,
            free_from: None,
        };
    }
    let allocated = ledger.load_on(date);
    Availability {
        date,
        status: AvailabilityStatus::from_load(allocated, capacity),
        capacity,
        allocated,
        available: capacity.saturating_sub(allocated),
        free_from: ledger.free_from(date, capacity),
    }
}
