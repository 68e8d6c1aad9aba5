use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, named_params};
use serde::{Deserialize, Serialize};
use staffing::ledger::{Ledger, LedgerEntry};
use staffing::{AllocationId, EmployeeId, Fte, Period, ProjectId};

use crate::common::error::RmpError;
use crate::db::parse_column;
use crate::repo::{expect_changed, now};

staffing::named_enum!(AllocationStatus, "allocation status", {
    Tentative => "tentative",
    Confirmed => "confirmed",
    Released => "released",
});

impl AllocationStatus {
    /// Tentative bookings reserve capacity as well, released ones do not.
    pub fn counts_towards_load(&self) -> bool {
        !matches!(self, AllocationStatus::Released)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub fte: Fte,
    pub percentage: f64,
    pub billable: bool,
    pub role: Option<String>,
    pub status: AllocationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Allocation {
    pub fn period(&self) -> crate::Result<Period> {
        Ok(Period::new(self.start_date, self.end_date)?)
    }

    pub fn ledger_entry(&self) -> crate::Result<LedgerEntry> {
        Ok(LedgerEntry {
            id: self.id,
            period: self.period()?,
            fte: self.fte,
            counted: self.status.counts_towards_load(),
        })
    }
}

/// Validated values of an allocation, written by [`insert`] and [`update`].
#[derive(Debug, Clone)]
pub struct AllocationRecord {
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub period: Period,
    pub fte: Fte,
    pub billable: bool,
    pub role: Option<String>,
    pub status: AllocationStatus,
    pub notes: Option<String>,
}

impl AllocationRecord {
    pub fn from_allocation(allocation: &Allocation) -> crate::Result<Self> {
        Ok(AllocationRecord {
            employee_id: allocation.employee_id,
            project_id: allocation.project_id,
            period: allocation.period()?,
            fte: allocation.fte,
            billable: allocation.billable,
            role: allocation.role.clone(),
            status: allocation.status,
            notes: allocation.notes.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllocationFilter {
    pub employee_id: Option<EmployeeId>,
    pub project_id: Option<ProjectId>,
    pub active_on: Option<NaiveDate>,
}

/// Allocation joined with the names of its employee and project.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationDetail {
    #[serde(flatten)]
    pub allocation: Allocation,
    pub employee_name: String,
    pub project_code: String,
    pub project_name: String,
}

const COLUMNS: &str = "a.id, a.employee_id, a.project_id, a.start_date, a.end_date, a.fte, \
                       a.billable, a.role, a.status, a.notes, a.created_at, a.updated_at";

fn from_row(row: &Row) -> rusqlite::Result<Allocation> {
    let fte = Fte::from_fractions(row.get(5)?);
    Ok(Allocation {
        id: AllocationId::new(row.get(0)?),
        employee_id: EmployeeId::new(row.get(1)?),
        project_id: ProjectId::new(row.get(2)?),
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        fte,
        percentage: fte.percentage(),
        billable: row.get(6)?,
        role: row.get(7)?,
        status: parse_column(row, 8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const FILTER: &str = "(:employee_id IS NULL OR a.employee_id = :employee_id) \
                      AND (:project_id IS NULL OR a.project_id = :project_id) \
                      AND (:active_on IS NULL OR (a.status != 'released' \
                           AND a.start_date <= :active_on \
                           AND (a.end_date IS NULL OR a.end_date >= :active_on)))";

pub fn insert(conn: &Connection, record: &AllocationRecord) -> crate::Result<AllocationId> {
    let now = now();
    conn.execute(
        "INSERT INTO allocations (employee_id, project_id, start_date, end_date, fte, billable, \
         role, status, notes, created_at, updated_at) \
         VALUES (:employee_id, :project_id, :start_date, :end_date, :fte, :billable, \
         :role, :status, :notes, :now, :now)",
        named_params! {
            ":employee_id": record.employee_id.as_num(),
            ":project_id": record.project_id.as_num(),
            ":start_date": record.period.start(),
            ":end_date": record.period.end(),
            ":fte": record.fte.fractions(),
            ":billable": record.billable,
            ":role": record.role,
            ":status": record.status.as_str(),
            ":notes": record.notes,
            ":now": now,
        },
    )?;
    Ok(AllocationId::new(conn.last_insert_rowid() as u32))
}

pub fn find(conn: &Connection, id: AllocationId) -> crate::Result<Option<Allocation>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM allocations a WHERE a.id = ?1"),
            [id.as_num()],
            from_row,
        )
        .optional()?)
}

pub fn get(conn: &Connection, id: AllocationId) -> crate::Result<Allocation> {
    find(conn, id)?.ok_or_else(|| RmpError::not_found("Allocation", id))
}

pub fn list(conn: &Connection, filter: &AllocationFilter) -> crate::Result<Vec<Allocation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM allocations a WHERE {FILTER} ORDER BY a.start_date, a.id"
    ))?;
    let rows = stmt.query_map(
        named_params! {
            ":employee_id": filter.employee_id.map(|id| id.as_num()),
            ":project_id": filter.project_id.map(|id| id.as_num()),
            ":active_on": filter.active_on,
        },
        from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn list_detailed(
    conn: &Connection,
    filter: &AllocationFilter,
) -> crate::Result<Vec<AllocationDetail>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS}, e.name, p.code, p.name FROM allocations a \
         JOIN employees e ON e.id = a.employee_id \
         JOIN projects p ON p.id = a.project_id \
         WHERE {FILTER} ORDER BY e.name, a.start_date, a.id"
    ))?;
    let rows = stmt.query_map(
        named_params! {
            ":employee_id": filter.employee_id.map(|id| id.as_num()),
            ":project_id": filter.project_id.map(|id| id.as_num()),
            ":active_on": filter.active_on,
        },
        |row| {
            Ok(AllocationDetail {
                allocation: from_row(row)?,
                employee_name: row.get(12)?,
                project_code: row.get(13)?,
                project_name: row.get(14)?,
            })
        },
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn for_employee(conn: &Connection, employee_id: EmployeeId) -> crate::Result<Vec<Allocation>> {
    list(
        conn,
        &AllocationFilter {
            employee_id: Some(employee_id),
            ..Default::default()
        },
    )
}

/// Capacity ledger of one employee built from all their allocations.
pub fn ledger(conn: &Connection, employee_id: EmployeeId) -> crate::Result<Ledger> {
    let entries = for_employee(conn, employee_id)?
        .iter()
        .map(Allocation::ledger_entry)
        .collect::<crate::Result<Vec<_>>>()?;
    Ok(Ledger::new(entries))
}

pub fn count_for_project(conn: &Connection, project_id: ProjectId) -> crate::Result<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM allocations WHERE project_id = ?1",
        [project_id.as_num()],
        |row| row.get(0),
    )?)
}

pub fn update(conn: &Connection, id: AllocationId, record: &AllocationRecord) -> crate::Result<()> {
    let changed = conn.execute(
        "UPDATE allocations SET employee_id = :employee_id, project_id = :project_id, \
         start_date = :start_date, end_date = :end_date, fte = :fte, billable = :billable, \
         role = :role, status = :status, notes = :notes, updated_at = :now WHERE id = :id",
        named_params! {
            ":id": id.as_num(),
            ":employee_id": record.employee_id.as_num(),
            ":project_id": record.project_id.as_num(),
            ":start_date": record.period.start(),
            ":end_date": record.period.end(),
            ":fte": record.fte.fractions(),
            ":billable": record.billable,
            ":role": record.role,
            ":status": record.status.as_str(),
            ":notes": record.notes,
            ":now": now(),
        },
    )?;
    expect_changed(changed, "Allocation", id)
}

pub fn delete(conn: &Connection, id: AllocationId) -> crate::Result<()> {
    let changed = conn.execute("DELETE FROM allocations WHERE id = ?1", [id.as_num()])?;
    expect_changed(changed, "Allocation", id)
}

#[cfg(test)]
mod tests {
    use super::{AllocationFilter, AllocationStatus};
    use crate::repo::allocation;
    use crate::tests::utils::{allocation_record, date, seed_staff, test_db};
    use staffing::Fte;

    #[test]
    fn test_filter_active_on() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", Some("2024-01-31"), "0.5"),
            )?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[1], "2024-02-01", None, "0.5"),
            )?;
            let mut released =
                allocation_record(employees[1], projects[1], "2024-01-01", None, "1");
            released.status = AllocationStatus::Released;
            allocation::insert(conn, &released)?;

            let active = allocation::list(
                conn,
                &AllocationFilter {
                    active_on: Some(date("2024-01-15")),
                    ..Default::default()
                },
            )?;
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].project_id, projects[0]);

            let detailed = allocation::list_detailed(
                conn,
                &AllocationFilter {
                    project_id: Some(projects[1]),
                    ..Default::default()
                },
            )?;
            assert_eq!(detailed.len(), 2);
            assert_eq!(detailed[0].project_code, "P2");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_ledger_skips_released() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, projects) = seed_staff(conn)?;
            allocation::insert(
                conn,
                &allocation_record(employees[0], projects[0], "2024-01-01", None, "0.5"),
            )?;
            let mut released =
                allocation_record(employees[0], projects[1], "2024-01-01", None, "0.5");
            released.status = AllocationStatus::Released;
            allocation::insert(conn, &released)?;
            let ledger = allocation::ledger(conn, employees[0])?;
            assert_eq!(ledger.entries().len(), 2);
            assert_eq!(ledger.load_on(date("2024-03-01")), "0.5".parse::<Fte>().unwrap());
            assert_eq!(allocation::count_for_project(conn, projects[1])?, 1);
            Ok(())
        })
        .unwrap();
    }
}
