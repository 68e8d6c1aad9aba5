use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use staffing::permission::{Actions, Module};
use staffing::{Fte, Period, ProjectId};

use crate::common::error::RmpError;
use crate::repo::allocation::{self, AllocationDetail, AllocationFilter};
use crate::repo::employee;
use crate::repo::project::{self, Project, ProjectData, ProjectStatus};
use crate::service::access::Access;
use crate::service::{audit, today};

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStaffing {
    pub project_id: ProjectId,
    pub date: NaiveDate,
    pub headcount: usize,
    pub total_fte: Fte,
    pub billable_fte: Fte,
    pub members: Vec<AllocationDetail>,
}

fn validate(data: &ProjectData) -> crate::Result<Period> {
    if data.code.trim().is_empty() {
        return Err(RmpError::validation("Project code cannot be empty"));
    }
    if data.name.trim().is_empty() {
        return Err(RmpError::validation("Project name cannot be empty"));
    }
    Ok(Period::new(data.start_date, data.end_date)?)
}

fn transition_allowed(from: ProjectStatus, to: ProjectStatus) -> bool {
    use ProjectStatus::*;
    from == to
        || matches!(
            (from, to),
            (Pipeline, Active | OnHold | Cancelled)
                | (Active, OnHold | Completed | Cancelled)
                | (OnHold, Active | Completed | Cancelled)
                | (Completed, Active)
        )
}

/// Allocations of the project counted in the load.
fn counted_periods(conn: &Connection, id: ProjectId) -> crate::Result<Vec<Period>> {
    allocation::list(
        conn,
        &AllocationFilter {
            project_id: Some(id),
            ..Default::default()
        },
    )?
    .into_iter()
    .filter(|a| a.status.counts_towards_load())
    .map(|a| a.period())
    .collect()
}

/// Number of counted allocations of the project that `period` would not cover.
pub(crate) fn allocations_outside(
    conn: &Connection,
    id: ProjectId,
    period: &Period,
) -> crate::Result<usize> {
    Ok(counted_periods(conn, id)?
        .iter()
        .filter(|p| !period.covers(p))
        .count())
}

fn check_transition(conn: &Connection, existing: &Project, to: ProjectStatus) -> crate::Result<()> {
    if !transition_allowed(existing.status, to) {
        return Err(RmpError::Conflict(format!(
            "Project {} cannot change status from {} to {to}",
            existing.code, existing.status
        )));
    }
    if to.is_closed() && !existing.status.is_closed() {
        let today = today();
        let running = counted_periods(conn, existing.id)?
            .iter()
            .filter(|p| !p.ends_before(today))
            .count();
        if running > 0 {
            return Err(RmpError::Conflict(format!(
                "Project {} still has {running} running allocation(s)",
                existing.code
            )));
        }
    }
    Ok(())
}

pub fn create(conn: &Connection, access: &Access, data: &ProjectData) -> crate::Result<Project> {
    access.require(Module::Projects, Actions::CREATE)?;
    validate(data)?;
    if let Some(manager_id) = data.manager_id {
        employee::get(conn, manager_id)?;
    }
    let id = project::insert(conn, data, None)?;
    audit::record(conn, access, Module::Projects, "create", id, Some(&data.code))?;
    project::get(conn, id)
}

pub fn update(
    conn: &Connection,
    access: &Access,
    id: ProjectId,
    data: &ProjectData,
) -> crate::Result<Project> {
    let existing = project::get(conn, id)?;
    access.require_for_project(Module::Projects, Actions::UPDATE, &existing)?;
    let period = validate(data)?;
    if let Some(manager_id) = data.manager_id {
        employee::get(conn, manager_id)?;
    }
    check_transition(conn, &existing, data.status)?;
    let outside = allocations_outside(conn, id, &period)?;
    if outside > 0 {
        return Err(RmpError::Conflict(format!(
            "{outside} allocation(s) of project {} would fall outside {period}",
            existing.code
        )));
    }
    project::update(conn, id, data)?;
    if existing.status != data.status {
        log::info!(
            "Project {} changed status {} -> {}",
            data.code,
            existing.status,
            data.status
        );
    }
    audit::record(conn, access, Module::Projects, "update", id, None)?;
    project::get(conn, id)
}

pub fn get(conn: &Connection, access: &Access, id: ProjectId) -> crate::Result<Project> {
    access.require(Module::Projects, Actions::VIEW)?;
    project::get(conn, id)
}

pub fn list(
    conn: &Connection,
    access: &Access,
    status: Option<ProjectStatus>,
) -> crate::Result<Vec<Project>> {
    access.require(Module::Projects, Actions::VIEW)?;
    project::list(conn, status)
}

/// Projects with staffing history cannot be deleted, only completed or cancelled.
pub fn delete(conn: &Connection, access: &Access, id: ProjectId) -> crate::Result<()> {
    access.require(Module::Projects, Actions::DELETE)?;
    let existing = project::get(conn, id)?;
    let count = allocation::count_for_project(conn, id)?;
    if count > 0 {
        return Err(RmpError::Conflict(format!(
            "Project {} has {count} allocation(s)",
            existing.code
        )));
    }
    project::delete(conn, id)?;
    audit::record(conn, access, Module::Projects, "delete", id, Some(&existing.code))
}

pub fn staffing(
    conn: &Connection,
    access: &Access,
    id: ProjectId,
    on: NaiveDate,
) -> crate::Result<ProjectStaffing> {
    access.require(Module::Projects, Actions::VIEW)?;
    access.require(Module::Allocations, Actions::VIEW)?;
    project::get(conn, id)?;
    let members = allocation::list_detailed(
        conn,
        &AllocationFilter {
            project_id: Some(id),
            active_on: Some(on),
            ..Default::default()
        },
    )?;
    let mut employees: Vec<_> = members.iter().map(|m| m.allocation.employee_id).collect();
    employees.sort_unstable();
    employees.dedup();
    Ok(ProjectStaffing {
        project_id: id,
        date: on,
        headcount: employees.len(),
        total_fte: members.iter().map(|m| m.allocation.fte).sum(),
        billable_fte: members
            .iter()
            .filter(|m| m.allocation.billable)
            .map(|m| m.allocation.fte)
            .sum(),
        members,
    })
}

#[cfg(test)]
mod tests {
    use staffing::Fte;
    use staffing::permission::Role;

    use super::transition_allowed;
    use crate::common::error::RmpError;
    use crate::repo::allocation;
    use crate::repo::project::ProjectStatus;
    use crate::service::project;
    use crate::tests::utils::{
        access_for, allocation_record, date, project_data, seed_staff, system, test_db,
    };

    #[test]
    fn test_reversed_dates_are_rejected() {
        let db = test_db();
        let result = db.with_conn(|conn| {
            project::create(
                conn,
                &system(),
                &project_data("P9", "2024-02-01", Some("2024-01-01")),
            )
        });
        assert!(matches!(result, Err(RmpError::StaffingError(_))));
    }

    #[test]
    fn test_delete_blocked_by_allocations() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", None, "0.5"),
            )?;
            assert!(matches!(
                project::delete(conn, &system(), projects[0]),
                Err(RmpError::Conflict(_))
            ));
            project::delete(conn, &system(), projects[1])?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_shrinking_period_cannot_orphan_allocations() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", Some("2024-12-31"), "0.5"),
            )?;
            let mut data = project_data("P1", "2023-01-01", Some("2024-06-30"));
            assert!(matches!(
                project::update(conn, &system(), projects[0], &data),
                Err(RmpError::Conflict(_))
            ));
            data.end_date = Some(date("2025-01-31"));
            data.status = ProjectStatus::OnHold;
            let updated = project::update(conn, &system(), projects[0], &data)?;
            assert_eq!(updated.status, ProjectStatus::OnHold);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_status_transitions() {
        use ProjectStatus::*;
        assert!(transition_allowed(Pipeline, Active));
        assert!(transition_allowed(Active, Completed));
        assert!(transition_allowed(OnHold, Active));
        assert!(transition_allowed(Completed, Active));
        assert!(transition_allowed(Cancelled, Cancelled));
        assert!(!transition_allowed(Active, Pipeline));
        assert!(!transition_allowed(Completed, Cancelled));
        assert!(!transition_allowed(Cancelled, Active));
    }

    #[test]
    fn test_closing_requires_finished_allocations() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", None, "0.5"),
            )?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[1], "2024-01-01", Some("2024-03-31"), "0.5"),
            )?;

            let mut data = project_data("P1", "2023-01-01", None);
            data.status = ProjectStatus::Completed;
            assert!(matches!(
                project::update(conn, &system(), projects[0], &data),
                Err(RmpError::Conflict(_))
            ));

            let mut data = project_data("P2", "2023-01-01", None);
            data.status = ProjectStatus::Cancelled;
            let cancelled = project::update(conn, &system(), projects[1], &data)?;
            assert_eq!(cancelled.status, ProjectStatus::Cancelled);

            data.status = ProjectStatus::Active;
            assert!(matches!(
                project::update(conn, &system(), projects[1], &data),
                Err(RmpError::Conflict(_))
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_project_manager_updates_only_managed_projects() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            let manager = access_for(Role::ProjectManager, Some(employees[0]));
            let data = project_data("P1", "2023-01-01", None);
            assert!(matches!(
                project::update(conn, &manager, projects[0], &data),
                Err(RmpError::Forbidden { .. })
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_staffing_summary() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", None, "0.5"),
            )?;
            let mut shadow = allocation_record(employees[1], projects[0], "2024-01-01", None, "0.25");
            shadow.billable = false;
            allocation::insert(conn, &shadow)?;

            let staffing = project::staffing(conn, &system(), projects[0], date("2024-03-01"))?;
            assert_eq!(staffing.headcount, 2);
            assert_eq!(staffing.total_fte, "0.75".parse::<Fte>().unwrap());
            assert_eq!(staffing.billable_fte, "0.5".parse::<Fte>().unwrap());
            Ok(())
        })
        .unwrap();
    }
}
