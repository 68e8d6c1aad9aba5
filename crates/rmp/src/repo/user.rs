use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use staffing::permission::Role;
use staffing::{EmployeeId, UserId};

use crate::db::parse_column;
use crate::repo::now;

/// Account allowed to call the API. The token itself is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, username, role, employee_id, active, created_at";

fn from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get(0)?),
        username: row.get(1)?,
        role: parse_column(row, 2)?,
        employee_id: row.get::<_, Option<u32>>(3)?.map(EmployeeId::new),
        active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert(
    conn: &Connection,
    username: &str,
    role: Role,
    employee_id: Option<EmployeeId>,
    token_hash: &str,
) -> crate::Result<UserId> {
    conn.execute(
        "INSERT INTO users (username, role, employee_id, token_hash, active, created_at) \
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        rusqlite::params![
            username,
            role.as_str(),
            employee_id.map(|id| id.as_num()),
            token_hash,
            now()
        ],
    )?;
    Ok(UserId::new(conn.last_insert_rowid() as u32))
}

pub fn find_by_token_hash(conn: &Connection, token_hash: &str) -> crate::Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM users WHERE token_hash = ?1 AND active = 1"),
            [token_hash],
            from_row,
        )
        .optional()?)
}

pub fn list(conn: &Connection) -> crate::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM users ORDER BY username"))?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
