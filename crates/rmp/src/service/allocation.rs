//! Staffing employees on projects.
//!
//! An allocation must fit into its project's period, the employee must be
//! employed for the whole period, and one employee cannot hold two
//! overlapping allocations on the same project. The employee's total load
//! must stay within their capacity unless the request is forced.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use staffing::ledger::LoadSegment;
use staffing::permission::{Actions, Module};
use staffing::{AllocationId, EmployeeId, Fte, FteInput, Period, ProjectId};

use crate::common::error::RmpError;
use crate::repo::allocation::{
    self, Allocation, AllocationDetail, AllocationFilter, AllocationRecord, AllocationStatus,
};
use crate::repo::employee;
use crate::repo::project::{self, Project};
use crate::service::access::Access;
use crate::service::audit;
use crate::service::employee::ledgers;

fn default_status() -> AllocationStatus {
    AllocationStatus::Confirmed
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllocationRequest {
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub start_date: NaiveDate,
    /// Defaults to the end of the project.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub amount: FteInput,
    /// Defaults to the billability of the project.
    #[serde(default)]
    pub billable: Option<bool>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_status")]
    pub status: AllocationStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Accept the allocation even when it over-allocates the employee.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverAllocation {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub capacity: Fte,
    pub segments: Vec<LoadSegment>,
}

/// Checks the request against the current state and returns the record to store.
fn prepare(
    conn: &Connection,
    request: &AllocationRequest,
    project: &Project,
    replacing: Option<AllocationId>,
) -> crate::Result<AllocationRecord> {
    let fte = request.amount.resolve()?;
    if fte.is_zero() {
        return Err(RmpError::validation("Allocation FTE must be greater than zero"));
    }
    if fte > Fte::ONE {
        return Err(RmpError::validation(format!(
            "Allocation FTE cannot exceed 1, got {fte}"
        )));
    }
    if project.status.is_closed() {
        return Err(RmpError::Conflict(format!(
            "Project {} is {}",
            project.code, project.status
        )));
    }
    let period = Period::new(request.start_date, request.end_date.or(project.end_date))?;
    let project_period = project.period()?;
    if !project_period.covers(&period) {
        return Err(RmpError::validation(format!(
            "Allocation {period} is outside of project {} ({project_period})",
            project.code
        )));
    }

    let employee = employee::get(conn, request.employee_id)?;
    if !employee.active {
        return Err(RmpError::Conflict(format!(
            "Employee {} is inactive",
            employee.code
        )));
    }
    if let Some(exit) = employee.exit_date {
        if period.end().is_none_or(|end| end > exit) {
            return Err(RmpError::Conflict(format!(
                "Employee {} leaves on {exit}",
                employee.code
            )));
        }
    }

    let existing = allocation::for_employee(conn, employee.id)?;
    for other in &existing {
        if Some(other.id) == replacing
            || other.project_id != project.id
            || !other.status.counts_towards_load()
        {
            continue;
        }
        if other.period()?.overlaps(&period) {
            return Err(RmpError::Conflict(format!(
                "Employee {} is already allocated to project {} by allocation {}",
                employee.code, project.code, other.id
            )));
        }
    }

    let record = AllocationRecord {
        employee_id: employee.id,
        project_id: project.id,
        period,
        fte,
        billable: request.billable.unwrap_or(project.billable),
        role: request.role.clone(),
        status: request.status,
        notes: request.notes.clone(),
    };

    if record.status.counts_towards_load() {
        let ledger = allocation::ledger(conn, employee.id)?;
        if let Err(error) = ledger.check_fits(&period, fte, employee.capacity, replacing) {
            if !request.force {
                return Err(error.into());
            }
            log::warn!(
                "Forced over-allocation of employee {} on project {}: {error}",
                employee.code,
                project.code
            );
        }
    }
    Ok(record)
}

fn over_allocation_note(request: &AllocationRequest) -> Option<&'static str> {
    request.force.then_some("forced")
}

pub fn create(
    conn: &Connection,
    access: &Access,
    request: &AllocationRequest,
) -> crate::Result<Allocation> {
    let project = project::get(conn, request.project_id)?;
    access.require_for_project(Module::Allocations, Actions::CREATE, &project)?;
    let record = prepare(conn, request, &project, None)?;
    let id = allocation::insert(conn, &record)?;
    audit::record(
        conn,
        access,
        Module::Allocations,
        "create",
        id,
        over_allocation_note(request),
    )?;
    log::debug!(
        "Allocated employee {} to project {} at {} ({})",
        record.employee_id,
        project.code,
        record.fte,
        record.period
    );
    allocation::get(conn, id)
}

pub fn update(
    conn: &Connection,
    access: &Access,
    id: AllocationId,
    request: &AllocationRequest,
) -> crate::Result<Allocation> {
    let existing = allocation::get(conn, id)?;
    let old_project = project::get(conn, existing.project_id)?;
    access.require_for_project(Module::Allocations, Actions::UPDATE, &old_project)?;
    let project = if request.project_id == existing.project_id {
        old_project
    } else {
        let project = project::get(conn, request.project_id)?;
        access.require_for_project(Module::Allocations, Actions::UPDATE, &project)?;
        project
    };
    let record = prepare(conn, request, &project, Some(id))?;
    allocation::update(conn, id, &record)?;
    audit::record(
        conn,
        access,
        Module::Allocations,
        "update",
        id,
        over_allocation_note(request),
    )?;
    allocation::get(conn, id)
}

/// Frees the capacity held by the allocation while keeping it on record.
pub fn release(conn: &Connection, access: &Access, id: AllocationId) -> crate::Result<Allocation> {
    let existing = allocation::get(conn, id)?;
    let project = project::get(conn, existing.project_id)?;
    access.require_for_project(Module::Allocations, Actions::UPDATE, &project)?;
    if existing.status == AllocationStatus::Released {
        return Err(RmpError::Conflict(format!("Allocation {id} is already released")));
    }
    let mut record = AllocationRecord::from_allocation(&existing)?;
    record.status = AllocationStatus::Released;
    allocation::update(conn, id, &record)?;
    audit::record(conn, access, Module::Allocations, "release", id, None)?;
    allocation::get(conn, id)
}

pub fn delete(conn: &Connection, access: &Access, id: AllocationId) -> crate::Result<()> {
    let existing = allocation::get(conn, id)?;
    let project = project::get(conn, existing.project_id)?;
    access.require_for_project(Module::Allocations, Actions::DELETE, &project)?;
    allocation::delete(conn, id)?;
    audit::record(conn, access, Module::Allocations, "delete", id, None)
}

pub fn get(conn: &Connection, access: &Access, id: AllocationId) -> crate::Result<Allocation> {
    access.require(Module::Allocations, Actions::VIEW)?;
    allocation::get(conn, id)
}

pub fn list(
    conn: &Connection,
    access: &Access,
    filter: &AllocationFilter,
) -> crate::Result<Vec<AllocationDetail>> {
    access.require(Module::Allocations, Actions::VIEW)?;
    allocation::list_detailed(conn, filter)
}

/// Employees whose load exceeds their capacity somewhere in the window.
pub fn over_allocations(
    conn: &Connection,
    access: &Access,
    window: &Period,
) -> crate::Result<Vec<OverAllocation>> {
    access.require(Module::Allocations, Actions::VIEW)?;
    let ledgers = ledgers(conn)?;
    let mut result = Vec::new();
    for employee in employee::list(conn, &Default::default())? {
        let Some(ledger) = ledgers.get(&employee.id) else {
            continue;
        };
        let segments = ledger.overloaded_segments(window, employee.capacity);
        if !segments.is_empty() {
            result.push(OverAllocation {
                employee_id: employee.id,
                employee_name: employee.name,
                capacity: employee.capacity,
                segments,
            });
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use staffing::permission::Role;
    use staffing::{Fte, FteInput};

    use super::{AllocationRequest, create, over_allocations, release, update};
    use crate::common::error::RmpError;
    use crate::repo::allocation::AllocationStatus;
    use crate::repo::project::ProjectStatus;
    use crate::repo::{audit, employee, project};
    use crate::tests::utils::{
        access_for, date, employee_data, period, project_data, seed_staff, system, test_db,
    };

    fn request(
        employee_id: staffing::EmployeeId,
        project_id: staffing::ProjectId,
        start: &str,
        end: Option<&str>,
        fte: f64,
    ) -> AllocationRequest {
        AllocationRequest {
            employee_id,
            project_id,
            start_date: date(start),
            end_date: end.map(date),
            amount: FteInput {
                fte: Some(fte),
                percentage: None,
            },
            billable: None,
            role: None,
            status: AllocationStatus::Confirmed,
            notes: None,
            force: false,
        }
    }

    #[test]
    fn test_over_allocation_is_rejected_with_date() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, p) = seed_staff(conn)?;
            create(conn, &system(), &request(e[0], p[0], "2024-01-01", Some("2024-06-30"), 0.6))?;
            let error = create(
                conn,
                &system(),
                &request(e[0], p[1], "2023-12-01", Some("2024-02-01"), 0.5),
            )
            .unwrap_err();
            match error {
                RmpError::StaffingError(staffing::Error::OverAllocated { date: d, load, capacity }) => {
                    assert_eq!(d, date("2024-01-01"));
                    assert_eq!(load, "1.1".parse::<Fte>().unwrap());
                    assert_eq!(capacity, Fte::ONE);
                }
                other => panic!("unexpected error {other:?}"),
            }
            // adjacent allocation fits
            create(conn, &system(), &request(e[0], p[1], "2024-07-01", None, 1.0))?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_forced_over_allocation_is_audited() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, p) = seed_staff(conn)?;
            create(conn, &system(), &request(e[0], p[0], "2024-01-01", None, 1.0))?;
            let mut forced = request(e[0], p[1], "2024-01-01", None, 0.5);
            forced.force = true;
            let allocation = create(conn, &system(), &forced)?;
            let entries = audit::list(conn, None, 1)?;
            assert_eq!(entries[0].entity_id, allocation.id.to_string());
            assert_eq!(entries[0].detail.as_deref(), Some("forced"));

            let report = over_allocations(conn, &system(), &period("2024-01-01", Some("2024-12-31")))?;
            assert_eq!(report.len(), 1);
            assert_eq!(report[0].segments[0].load, "1.5".parse::<Fte>().unwrap());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_part_time_capacity() {
        let db = test_db();
        db.with_conn(|conn| {
            let (_, p) = seed_staff(conn)?;
            let mut data = employee_data("E3", "Cyd");
            data.capacity = "0.5".parse().unwrap();
            let part_timer = employee::insert(conn, &data)?;
            assert!(create(conn, &system(), &request(part_timer, p[0], "2024-01-01", None, 0.75)).is_err());
            create(conn, &system(), &request(part_timer, p[0], "2024-01-01", None, 0.5))?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_validation_rules() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, p) = seed_staff(conn)?;
            assert!(matches!(
                create(conn, &system(), &request(e[0], p[0], "2024-01-01", None, 0.0)),
                Err(RmpError::ValidationError(_))
            ));
            assert!(matches!(
                create(conn, &system(), &request(e[0], p[0], "2024-01-01", None, 1.5)),
                Err(RmpError::ValidationError(_))
            ));
            // before the project starts
            assert!(matches!(
                create(conn, &system(), &request(e[0], p[0], "2022-01-01", None, 0.5)),
                Err(RmpError::ValidationError(_))
            ));

            create(conn, &system(), &request(e[0], p[0], "2024-01-01", Some("2024-03-31"), 0.2))?;
            assert!(matches!(
                create(conn, &system(), &request(e[0], p[0], "2024-03-01", None, 0.2)),
                Err(RmpError::Conflict(_))
            ));

            let mut closed = project_data("P3", "2023-01-01", None);
            closed.status = ProjectStatus::Completed;
            let closed = project::insert(conn, &closed, None)?;
            assert!(matches!(
                create(conn, &system(), &request(e[1], closed, "2024-01-01", None, 0.5)),
                Err(RmpError::Conflict(_))
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_open_end_defaults_to_project_end() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, _) = seed_staff(conn)?;
            let bounded = project::insert(conn, &project_data("P4", "2024-01-01", Some("2024-12-31")), None)?;
            let allocation = create(conn, &system(), &request(e[0], bounded, "2024-02-01", None, 0.5))?;
            assert_eq!(allocation.end_date, Some(date("2024-12-31")));
            assert!(allocation.billable);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_does_not_count_itself() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, p) = seed_staff(conn)?;
            let allocation = create(conn, &system(), &request(e[0], p[0], "2024-01-01", None, 1.0))?;
            let mut changed = request(e[0], p[0], "2024-02-01", None, 0.8);
            changed.amount = FteInput {
                fte: None,
                percentage: Some(80.0),
            };
            let updated = update(conn, &system(), allocation.id, &changed)?;
            assert_eq!(updated.fte, "0.8".parse::<Fte>().unwrap());
            assert_eq!(updated.percentage, 80.0);

            let released = release(conn, &system(), allocation.id)?;
            assert_eq!(released.status, AllocationStatus::Released);
            create(conn, &system(), &request(e[0], p[1], "2024-01-01", None, 1.0))?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_project_manager_allocates_on_managed_project() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, _) = seed_staff(conn)?;
            let mut data = project_data("P5", "2024-01-01", None);
            data.manager_id = Some(e[1]);
            let managed = project::insert(conn, &data, None)?;
            let other = project::insert(conn, &project_data("P6", "2024-01-01", None), None)?;

            let manager = access_for(Role::ProjectManager, Some(e[1]));
            create(conn, &manager, &request(e[0], managed, "2024-01-01", None, 0.5))?;
            assert!(matches!(
                create(conn, &manager, &request(e[0], other, "2024-01-01", None, 0.5)),
                Err(RmpError::Forbidden { .. })
            ));
            Ok(())
        })
        .unwrap();
    }
}
