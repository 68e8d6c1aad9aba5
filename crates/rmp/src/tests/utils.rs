use chrono::NaiveDate;
use rusqlite::Connection;
use staffing::permission::{PermissionMatrix, Role};
use staffing::{EmployeeId, Fte, Period, ProjectId};

use crate::db::Database;
use crate::repo::allocation::{AllocationRecord, AllocationStatus};
use crate::repo::employee::{self, EmployeeData};
use crate::repo::project::{self, ProjectData, ProjectStatus};
use crate::service::access::{Access, Principal};

pub fn test_db() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn period(start: &str, end: Option<&str>) -> Period {
    Period::new(date(start), end.map(date)).unwrap()
}

pub fn employee_data(code: &str, name: &str) -> EmployeeData {
    EmployeeData {
        code: code.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        designation: None,
        department: None,
        location: None,
        manager_id: None,
        joined_on: None,
        capacity: Fte::ONE,
    }
}

pub fn project_data(code: &str, start: &str, end: Option<&str>) -> ProjectData {
    ProjectData {
        code: code.to_string(),
        name: format!("Project {code}"),
        client: None,
        status: ProjectStatus::Active,
        start_date: date(start),
        end_date: end.map(date),
        manager_id: None,
        billable: true,
        description: None,
    }
}

pub fn allocation_record(
    employee_id: EmployeeId,
    project_id: ProjectId,
    start: &str,
    end: Option<&str>,
    fte: &str,
) -> AllocationRecord {
    AllocationRecord {
        employee_id,
        project_id,
        period: period(start, end),
        fte: fte.parse().unwrap(),
        billable: true,
        role: None,
        status: AllocationStatus::Confirmed,
        notes: None,
    }
}

/// Two employees (Ada, Bob) and two open ended active projects starting in 2023.
pub fn seed_staff(conn: &Connection) -> crate::Result<(Vec<EmployeeId>, Vec<ProjectId>)> {
    let employees = vec![
        employee::insert(conn, &employee_data("E1", "Ada"))?,
        employee::insert(conn, &employee_data("E2", "Bob"))?,
    ];
    let projects = vec![
        project::insert(conn, &project_data("P1", "2023-01-01", None), None)?,
        project::insert(conn, &project_data("P2", "2023-01-01", None), None)?,
    ];
    Ok((employees, projects))
}

pub fn system() -> Access {
    Access::system()
}

pub fn access_for(role: Role, employee_id: Option<EmployeeId>) -> Access {
    Access::new(
        Principal {
            user_id: None,
            username: format!("{role}-user"),
            role,
            employee_id,
        },
        PermissionMatrix::default(),
    )
}
