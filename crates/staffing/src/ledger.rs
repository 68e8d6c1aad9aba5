//! Capacity accounting for a single employee.
//!
//! A [`Ledger`] holds the allocations of one employee and answers questions
//! about how much of the employee's time is committed on a day or during a
//! window. Load only changes on the first day of an allocation and on the day
//! after its last day, so every query sweeps over these change points instead
//! of walking day by day.

use chrono::NaiveDate;
use serde::Serialize;

use crate::common::error::StaffingError;
use crate::common::ids::AllocationId;
use crate::fte::Fte;
use crate::period::Period;

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: AllocationId,
    pub period: Period,
    pub fte: Fte,
    /// Released or cancelled allocations stay in the ledger but carry no load.
    pub counted: bool,
}

/// A maximal run of days with the same load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSegment {
    pub period: Period,
    pub load: Fte,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new(entries: Vec<LedgerEntry>) -> Self {
        Ledger { entries }
    }

    pub fn push(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    fn counted(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(|e| e.counted)
    }

    pub fn load_on(&self, date: NaiveDate) -> Fte {
        self.counted()
            .filter(|e| e.period.contains(date))
            .map(|e| e.fte)
            .sum()
    }

    pub fn segments(&self, window: &Period) -> Vec<LoadSegment> {
        let mut points = vec![window.start()];
        for entry in self.counted() {
            let Some(clipped) = entry.period.intersect(window) else {
                continue;
            };
            points.push(clipped.start());
            if let Some(after) = clipped.day_after_end() {
                if window.contains(after) {
                    points.push(after);
                }
            }
        }
        points.sort_unstable();
        points.dedup();

        let mut segments: Vec<LoadSegment> = Vec::with_capacity(points.len());
        for (index, start) in points.iter().enumerate() {
            let end = match points.get(index + 1) {
                Some(next) => next.pred_opt(),
                None => window.end(),
            };
            let load = self.load_on(*start);
            match segments.last_mut() {
                Some(last) if last.load == load => {
                    last.period = Period::new(last.period.start(), end)
                        .unwrap_or(last.period);
                }
                _ => {
                    if let Ok(period) = Period::new(*start, end) {
                        segments.push(LoadSegment { period, load });
                    }
                }
            }
        }
        segments
    }

    pub fn peak_load(&self, window: &Period) -> Fte {
        self.segments(window)
            .into_iter()
            .map(|s| s.load)
            .max()
            .unwrap_or(Fte::ZERO)
    }

    pub fn overloaded_segments(&self, window: &Period, capacity: Fte) -> Vec<LoadSegment> {
        self.segments(window)
            .into_iter()
            .filter(|s| s.load > capacity)
            .collect()
    }

    /// Checks that adding `fte` during `period` keeps the load within `capacity`.
    ///
    /// `replacing` removes an existing entry from the check, which is how an
    /// update of an allocation is validated against the rest of the ledger.
    pub fn check_fits(
        &self,
        period: &Period,
        fte: Fte,
        capacity: Fte,
        replacing: Option<AllocationId>,
    ) -> Result<(), StaffingError> {
        let mut ledger = Ledger::new(
            self.entries
                .iter()
                .filter(|e| Some(e.id) != replacing)
                .cloned()
                .collect(),
        );
        ledger.push(LedgerEntry {
            id: AllocationId::default(),
            period: *period,
            fte,
            counted: true,
        });
        match ledger
            .segments(period)
            .into_iter()
            .find(|s| s.load > capacity)
        {
            Some(segment) => Err(StaffingError::OverAllocated {
                date: segment.period.start(),
                load: segment.load,
                capacity,
            }),
            None => Ok(()),
        }
    }

    /// First day on or after `date` with some capacity left.
    pub fn free_from(&self, date: NaiveDate, capacity: Fte) -> Option<NaiveDate> {
        self.segments(&Period::open(date))
            .into_iter()
            .find(|s| s.load < capacity)
            .map(|s| s.period.start())
    }
}
