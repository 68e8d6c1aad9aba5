use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, named_params};
use serde::{Deserialize, Serialize};
use staffing::{EmployeeId, Fte};

use crate::common::error::RmpError;
use crate::repo::{expect_changed, now};

#[derive(Debug, Clone, Serialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub code: String,
    pub name: String,
    pub email: String,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub manager_id: Option<EmployeeId>,
    pub joined_on: Option<NaiveDate>,
    pub exit_date: Option<NaiveDate>,
    /// Share of a full-time position the employee works.
    pub capacity: Fte,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Is the employee on the payroll on the given day?
    ///
    /// A deactivated employee stays employed until the exit date, so a
    /// deactivation with a future exit date does not hide the notice period.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        match self.exit_date {
            Some(exit) => date <= exit,
            None => self.active,
        }
    }
}

fn default_capacity() -> Fte {
    Fte::ONE
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeData {
    pub code: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub manager_id: Option<EmployeeId>,
    #[serde(default)]
    pub joined_on: Option<NaiveDate>,
    #[serde(default = "default_capacity")]
    pub capacity: Fte,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    /// Matches the `active` flag, which is cleared as soon as a deactivation is recorded.
    pub active: Option<bool>,
    /// Only employees still on the payroll on this day.
    pub employed_on: Option<NaiveDate>,
}

/// SQL condition over the `employees` table matching [`Employee::is_active_on`]
/// for the date bound to `param`.
pub(crate) fn employed_on_condition(table: &str, param: &str) -> String {
    format!(
        "(({table}.exit_date IS NULL AND {table}.active = 1) OR {table}.exit_date >= {param})"
    )
}

const COLUMNS: &str = "id, code, name, email, designation, department, location, manager_id, \
                       joined_on, exit_date, capacity, active, created_at, updated_at";

fn from_row(row: &Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: EmployeeId::new(row.get(0)?),
        code: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        designation: row.get(4)?,
        department: row.get(5)?,
        location: row.get(6)?,
        manager_id: row.get::<_, Option<u32>>(7)?.map(EmployeeId::new),
        joined_on: row.get(8)?,
        exit_date: row.get(9)?,
        capacity: Fte::from_fractions(row.get(10)?),
        active: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

pub fn insert(conn: &Connection, data: &EmployeeData) -> crate::Result<EmployeeId> {
    let now = now();
    conn.execute(
        "INSERT INTO employees (code, name, email, designation, department, location, \
         manager_id, joined_on, capacity, active, created_at, updated_at) \
         VALUES (:code, :name, :email, :designation, :department, :location, \
         :manager_id, :joined_on, :capacity, 1, :now, :now)",
        named_params! {
            ":code": data.code,
            ":name": data.name,
            ":email": data.email,
            ":designation": data.designation,
            ":department": data.department,
            ":location": data.location,
            ":manager_id": data.manager_id.map(|id| id.as_num()),
            ":joined_on": data.joined_on,
            ":capacity": data.capacity.fractions(),
            ":now": now,
        },
    )?;
    Ok(EmployeeId::new(conn.last_insert_rowid() as u32))
}

pub fn find(conn: &Connection, id: EmployeeId) -> crate::Result<Option<Employee>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM employees WHERE id = ?1"),
            [id.as_num()],
            from_row,
        )
        .optional()?)
}

pub fn get(conn: &Connection, id: EmployeeId) -> crate::Result<Employee> {
    find(conn, id)?.ok_or_else(|| RmpError::not_found("Employee", id))
}

pub fn find_by_email(conn: &Connection, email: &str) -> crate::Result<Option<Employee>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM employees WHERE email = ?1"),
            [email],
            from_row,
        )
        .optional()?)
}

pub fn list(conn: &Connection, filter: &EmployeeFilter) -> crate::Result<Vec<Employee>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM employees \
         WHERE (:department IS NULL OR department = :department) \
         AND (:active IS NULL OR active = :active) \
         AND (:employed_on IS NULL OR {}) \
         ORDER BY name, id",
        employed_on_condition("employees", ":employed_on")
    ))?;
    let rows = stmt.query_map(
        named_params! {
            ":department": filter.department,
            ":active": filter.active,
            ":employed_on": filter.employed_on,
        },
        from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update(conn: &Connection, id: EmployeeId, data: &EmployeeData) -> crate::Result<()> {
    let changed = conn.execute(
        "UPDATE employees SET code = :code, name = :name, email = :email, \
         designation = :designation, department = :department, location = :location, \
         manager_id = :manager_id, joined_on = :joined_on, capacity = :capacity, \
         updated_at = :now WHERE id = :id",
        named_params! {
            ":id": id.as_num(),
            ":code": data.code,
            ":name": data.name,
            ":email": data.email,
            ":designation": data.designation,
            ":department": data.department,
            ":location": data.location,
            ":manager_id": data.manager_id.map(|id| id.as_num()),
            ":joined_on": data.joined_on,
            ":capacity": data.capacity.fractions(),
            ":now": now(),
        },
    )?;
    expect_changed(changed, "Employee", id)
}

pub fn deactivate(conn: &Connection, id: EmployeeId, exit_date: NaiveDate) -> crate::Result<()> {
    let changed = conn.execute(
        "UPDATE employees SET active = 0, exit_date = ?2, updated_at = ?3 WHERE id = ?1",
        rusqlite::params![id.as_num(), exit_date, now()],
    )?;
    expect_changed(changed, "Employee", id)
}
