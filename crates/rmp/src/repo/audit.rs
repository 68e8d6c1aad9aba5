use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use serde::Serialize;
use staffing::UserId;
use staffing::permission::Module;

use crate::db::parse_column;
use crate::repo::now;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: u32,
    pub at: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub module: Module,
    pub action: String,
    pub entity_id: String,
    pub detail: Option<String>,
}

fn from_row(row: &Row) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        at: row.get(1)?,
        user_id: row.get::<_, Option<u32>>(2)?.map(UserId::new),
        module: parse_column(row, 3)?,
        action: row.get(4)?,
        entity_id: row.get(5)?,
        detail: row.get(6)?,
    })
}

pub fn record(
    conn: &Connection,
    user_id: Option<UserId>,
    module: Module,
    action: &str,
    entity_id: &str,
    detail: Option<&str>,
) -> crate::Result<()> {
    conn.execute(
        "INSERT INTO audit_log (at, user_id, module, action, entity_id, detail) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            now(),
            user_id.map(|id| id.as_num()),
            module.as_str(),
            action,
            entity_id,
            detail
        ],
    )?;
    Ok(())
}

/// Newest entries first.
pub fn list(conn: &Connection, module: Option<Module>, limit: u32) -> crate::Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, at, user_id, module, action, entity_id, detail FROM audit_log \
         WHERE (?1 IS NULL OR module = ?1) ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![module.map(|m| m.as_str()), limit],
        from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
