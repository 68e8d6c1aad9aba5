use rusqlite::Connection;
use staffing::permission::{Actions, Module, Role};

use crate::db::parse_column;

pub fn load_overrides(conn: &Connection) -> crate::Result<Vec<(Role, Module, Actions)>> {
    let mut stmt = conn.prepare("SELECT role, module, actions FROM role_permissions")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            parse_column(row, 0)?,
            parse_column(row, 1)?,
            Actions::from_bits_truncate(row.get(2)?),
        ))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn save_override(
    conn: &Connection,
    role: Role,
    module: Module,
    actions: Actions,
) -> crate::Result<()> {
    conn.execute(
        "INSERT INTO role_permissions (role, module, actions) VALUES (?1, ?2, ?3) \
         ON CONFLICT (role, module) DO UPDATE SET actions = excluded.actions",
        rusqlite::params![role.as_str(), module.as_str(), actions.bits()],
    )?;
    Ok(())
}

pub fn delete_override(conn: &Connection, role: Role, module: Module) -> crate::Result<bool> {
    let changed = conn.execute(
        "DELETE FROM role_permissions WHERE role = ?1 AND module = ?2",
        [role.as_str(), module.as_str()],
    )?;
    Ok(changed > 0)
}
