use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use staffing::availability::{Availability, AvailabilityStatus, derive_availability};
use staffing::ledger::{Ledger, LoadSegment};
use staffing::permission::{Actions, Module};
use staffing::{AllocationId, EmployeeId, Fte, Period};

use crate::common::error::RmpError;
use crate::repo::allocation::{self, AllocationRecord, AllocationStatus};
use crate::repo::employee::{self, Employee, EmployeeData, EmployeeFilter};
use crate::service::access::Access;
use crate::service::{audit, today};

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeWithAvailability {
    #[serde(flatten)]
    pub employee: Employee,
    pub availability: Availability,
}

#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub employee_id: EmployeeId,
    pub capacity: Fte,
    pub segments: Vec<LoadSegment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deactivation {
    pub employee: Employee,
    /// Allocations cut to end on the exit date.
    pub truncated: Vec<AllocationId>,
    /// Allocations starting after the exit date.
    pub released: Vec<AllocationId>,
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn validate(data: &EmployeeData) -> crate::Result<()> {
    if data.code.trim().is_empty() {
        return Err(RmpError::validation("Employee code cannot be empty"));
    }
    if data.name.trim().is_empty() {
        return Err(RmpError::validation("Employee name cannot be empty"));
    }
    if !is_valid_email(&data.email) {
        return Err(RmpError::validation(format!(
            "Invalid e-mail address `{}`",
            data.email
        )));
    }
    if data.capacity.is_zero() || data.capacity > Fte::ONE {
        return Err(RmpError::validation(format!(
            "Capacity must be in (0, 1], got {}",
            data.capacity
        )));
    }
    Ok(())
}

pub fn create(conn: &Connection, access: &Access, data: &EmployeeData) -> crate::Result<Employee> {
    access.require(Module::Employees, Actions::CREATE)?;
    validate(data)?;
    if let Some(manager_id) = data.manager_id {
        employee::get(conn, manager_id)?;
    }
    let id = employee::insert(conn, data)?;
    audit::record(conn, access, Module::Employees, "create", id, Some(&data.code))?;
    log::debug!("Created employee {id} ({})", data.code);
    employee::get(conn, id)
}

pub fn update(
    conn: &Connection,
    access: &Access,
    id: EmployeeId,
    data: &EmployeeData,
) -> crate::Result<Employee> {
    access.require(Module::Employees, Actions::UPDATE)?;
    validate(data)?;
    if let Some(manager_id) = data.manager_id {
        if manager_id == id {
            return Err(RmpError::validation("An employee cannot manage themselves"));
        }
        employee::get(conn, manager_id)?;
    }
    employee::update(conn, id, data)?;

    // Lowering capacity never touches existing allocations, it only leaves a trace.
    let overloaded = allocation::ledger(conn, id)?
        .overloaded_segments(&Period::open(today()), data.capacity);
    let detail = overloaded.first().map(|segment| {
        log::warn!(
            "Capacity of employee {} set to {} below its load {} during {}",
            data.code,
            data.capacity,
            segment.load,
            segment.period
        );
        format!(
            "capacity {} below load {} during {}",
            data.capacity, segment.load, segment.period
        )
    });
    audit::record(conn, access, Module::Employees, "update", id, detail.as_deref())?;
    employee::get(conn, id)
}

pub fn get(conn: &Connection, access: &Access, id: EmployeeId) -> crate::Result<Employee> {
    access.require(Module::Employees, Actions::VIEW)?;
    employee::get(conn, id)
}

/// Soft delete. Allocations reaching past the exit date are cut, those
/// starting after it are released.
pub fn deactivate(
    conn: &Connection,
    access: &Access,
    id: EmployeeId,
    exit_date: Option<NaiveDate>,
) -> crate::Result<Deactivation> {
    access.require(Module::Employees, Actions::DELETE)?;
    let existing = employee::get(conn, id)?;
    if !existing.active {
        return Err(RmpError::Conflict(format!(
            "Employee {} is already inactive",
            existing.code
        )));
    }
    let exit_date = exit_date.unwrap_or_else(today);
    employee::deactivate(conn, id, exit_date)?;

    let mut truncated = Vec::new();
    let mut released = Vec::new();
    for allocation in allocation::for_employee(conn, id)? {
        if allocation.status == AllocationStatus::Released {
            continue;
        }
        let mut record = AllocationRecord::from_allocation(&allocation)?;
        if allocation.start_date > exit_date {
            record.status = AllocationStatus::Released;
            released.push(allocation.id);
        } else if record.period.end().is_none_or(|end| end > exit_date) {
            record.period = Period::new(allocation.start_date, Some(exit_date))?;
            truncated.push(allocation.id);
        } else {
            continue;
        }
        allocation::update(conn, allocation.id, &record)?;
    }
    audit::record(
        conn,
        access,
        Module::Employees,
        "deactivate",
        id,
        Some(&format!("exit {exit_date}")),
    )?;
    log::info!(
        "Deactivated employee {} (exit {exit_date}), {} allocation(s) truncated, {} released",
        existing.code,
        truncated.len(),
        released.len()
    );
    Ok(Deactivation {
        employee: employee::get(conn, id)?,
        truncated,
        released,
    })
}

/// Ledgers of every employee that has at least one allocation.
pub(crate) fn ledgers(conn: &Connection) -> crate::Result<HashMap<EmployeeId, Ledger>> {
    let mut ledgers: HashMap<EmployeeId, Ledger> = HashMap::new();
    for allocation in allocation::list(conn, &Default::default())? {
        ledgers
            .entry(allocation.employee_id)
            .or_default()
            .push(allocation.ledger_entry()?);
    }
    Ok(ledgers)
}

pub(crate) fn availability_of(ledger: &Ledger, employee: &Employee, on: NaiveDate) -> Availability {
    derive_availability(ledger, employee.capacity, on, employee.is_active_on(on))
}

pub fn availability(
    conn: &Connection,
    access: &Access,
    id: EmployeeId,
    on: NaiveDate,
) -> crate::Result<Availability> {
    access.require(Module::Employees, Actions::VIEW)?;
    let employee = employee::get(conn, id)?;
    let ledger = allocation::ledger(conn, id)?;
    Ok(availability_of(&ledger, &employee, on))
}

pub fn timeline(
    conn: &Connection,
    access: &Access,
    id: EmployeeId,
    window: &Period,
) -> crate::Result<Timeline> {
    access.require(Module::Employees, Actions::VIEW)?;
    let employee = employee::get(conn, id)?;
    let ledger = allocation::ledger(conn, id)?;
    Ok(Timeline {
        employee_id: id,
        capacity: employee.capacity,
        segments: ledger.segments(window),
    })
}

pub fn list_with_availability(
    conn: &Connection,
    access: &Access,
    filter: &EmployeeFilter,
    status: Option<AvailabilityStatus>,
    on: NaiveDate,
) -> crate::Result<Vec<EmployeeWithAvailability>> {
    access.require(Module::Employees, Actions::VIEW)?;
    let ledgers = ledgers(conn)?;
    let empty = Ledger::default();
    Ok(employee::list(conn, filter)?
        .into_iter()
        .map(|employee| {
            let ledger = ledgers.get(&employee.id).unwrap_or(&empty);
            let availability = availability_of(ledger, &employee, on);
            EmployeeWithAvailability {
                employee,
                availability,
            }
        })
        .filter(|e| status.is_none_or(|s| e.availability.status == s))
        .collect())
}

/// Active employees without any allocation on the day.
pub fn bench(
    conn: &Connection,
    access: &Access,
    on: NaiveDate,
) -> crate::Result<Vec<EmployeeWithAvailability>> {
    list_with_availability(
        conn,
        access,
        &EmployeeFilter {
            employed_on: Some(on),
            ..Default::default()
        },
        Some(AvailabilityStatus::Bench),
        on,
    )
}

#[cfg(test)]
mod tests {
    use staffing::availability::AvailabilityStatus;
    use staffing::permission::{Module, Role};

    use super::is_valid_email;
    use crate::common::error::RmpError;
    use crate::repo::allocation::{self, AllocationStatus};
    use crate::repo::audit;
    use crate::service::employee;
    use crate::tests::utils::{
        access_for, allocation_record, date, employee_data, period, seed_staff, system, test_db,
    };

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b@mail.example.org"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada lovelace@example.com"));
    }

    #[test]
    fn test_create_validates() {
        let db = test_db();
        db.with_conn(|conn| {
            let mut data = employee_data("E1", "Ada");
            data.capacity = "1.5".parse().unwrap();
            assert!(matches!(
                employee::create(conn, &system(), &data),
                Err(RmpError::ValidationError(_))
            ));
            data.capacity = "0.5".parse().unwrap();
            data.name = "  ".to_string();
            assert!(employee::create(conn, &system(), &data).is_err());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_employee_role_cannot_create() {
        let db = test_db();
        let result = db.with_conn(|conn| {
            employee::create(
                conn,
                &access_for(Role::Employee, None),
                &employee_data("E1", "Ada"),
            )
        });
        assert!(matches!(result, Err(RmpError::Forbidden { .. })));
    }

    #[test]
    fn test_availability_and_bench() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", Some("2024-03-31"), "0.5"),
            )?;
            let access = system();
            let availability = employee::availability(conn, &access, employees[0], date("2024-02-01"))?;
            assert_eq!(availability.status, AvailabilityStatus::PartiallyAllocated);

            let bench = employee::bench(conn, &access, date("2024-02-01"))?;
            assert_eq!(bench.len(), 1);
            assert_eq!(bench[0].employee.id, employees[1]);

            let bench = employee::bench(conn, &access, date("2024-04-01"))?;
            assert_eq!(bench.len(), 2);

            let timeline = employee::timeline(
                conn,
                &access,
                employees[0],
                &period("2024-03-01", Some("2024-04-30")),
            )?;
            assert_eq!(timeline.segments.len(), 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_deactivate_cuts_allocations() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            let open = allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", None, "0.5"),
            )?;
            let future = allocation::insert(
                conn,
                &allocation_record(employees[0], projects[1], "2024-07-01", None, "0.5"),
            )?;
            let past = allocation::insert(
                conn,
                &allocation_record(employees[0], projects[1], "2024-01-01", Some("2024-02-01"), "0.5"),
            )?;

            let result = employee::deactivate(conn, &system(), employees[0], Some(date("2024-05-31")))?;
            assert!(!result.employee.active);
            assert_eq!(result.truncated, vec![open]);
            assert_eq!(result.released, vec![future]);

            assert_eq!(allocation::get(conn, open)?.end_date, Some(date("2024-05-31")));
            assert_eq!(allocation::get(conn, future)?.status, AllocationStatus::Released);
            assert_eq!(allocation::get(conn, past)?.end_date, Some(date("2024-02-01")));

            let availability = employee::availability(conn, &system(), employees[0], date("2024-06-01"))?;
            assert_eq!(availability.status, AvailabilityStatus::Inactive);

            assert!(matches!(
                employee::deactivate(conn, &system(), employees[0], None),
                Err(RmpError::Conflict(_))
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_notice_period_keeps_employee_available() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", None, "0.5"),
            )?;
            let access = system();
            employee::deactivate(conn, &access, employees[0], Some(date("2024-05-31")))?;

            let availability = employee::availability(conn, &access, employees[0], date("2024-03-01"))?;
            assert_eq!(availability.status, AvailabilityStatus::PartiallyAllocated);
            let availability = employee::availability(conn, &access, employees[0], date("2024-05-31"))?;
            assert_eq!(availability.status, AvailabilityStatus::PartiallyAllocated);
            let availability = employee::availability(conn, &access, employees[0], date("2024-06-01"))?;
            assert_eq!(availability.status, AvailabilityStatus::Inactive);

            // Bob is on the bench on both days, Ada only after she has left.
            let bench = employee::bench(conn, &access, date("2024-03-01"))?;
            assert_eq!(bench.len(), 1);
            assert_eq!(bench[0].employee.id, employees[1]);
            let bench = employee::bench(conn, &access, date("2024-06-01"))?;
            assert_eq!(bench.len(), 1);
            assert_eq!(bench[0].employee.id, employees[1]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_capacity_below_load_is_audited() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", None, "0.8"),
            )?;
            let mut data = employee_data("E1", "Ada");
            data.capacity = "0.5".parse().unwrap();
            let updated = employee::update(conn, &system(), employees[0], &data)?;
            assert_eq!(updated.capacity, "0.5".parse().unwrap());

            let entries = audit::list(conn, Some(Module::Employees), 10)?;
            let entry = entries.iter().find(|e| e.action == "update").unwrap();
            assert_eq!(entry.entity_id, employees[0].to_string());
            assert!(
                entry
                    .detail
                    .as_deref()
                    .unwrap()
                    .starts_with("capacity 0.5 below load 0.8 during")
            );
            Ok(())
        })
        .unwrap();
    }
}
