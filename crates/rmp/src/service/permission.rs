use rusqlite::Connection;
use staffing::permission::{Actions, Module, PermissionCell, PermissionMatrix, Role};

use crate::repo::permission;
use crate::service::access::Access;
use crate::service::audit;

/// Built-in grants combined with the overrides stored in the database.
pub fn load_matrix(conn: &Connection) -> crate::Result<PermissionMatrix> {
    Ok(PermissionMatrix::with_overrides(permission::load_overrides(
        conn,
    )?)?)
}

pub fn cells(access: &Access) -> crate::Result<Vec<PermissionCell>> {
    access.require(Module::Permissions, Actions::VIEW)?;
    Ok(access.matrix.cells())
}

/// Stores the override and returns the updated matrix.
pub fn set(
    conn: &Connection,
    access: &Access,
    role: Role,
    module: Module,
    actions: Actions,
) -> crate::Result<PermissionMatrix> {
    access.require(Module::Permissions, Actions::UPDATE)?;
    // The caller's matrix was loaded with the request and may miss concurrent changes.
    let mut matrix = load_matrix(conn)?;
    matrix.set_override(role, module, actions)?;
    permission::save_override(conn, role, module, actions)?;
    audit::record(
        conn,
        access,
        Module::Permissions,
        "update",
        format!("{role}/{module}"),
        Some(&actions.names().join(",")),
    )?;
    log::info!(
        "Permissions of {role} on {module} set to [{}]",
        actions.names().join(", ")
    );
    Ok(matrix)
}

/// Restores the built-in grant and returns the updated matrix.
pub fn clear(
    conn: &Connection,
    access: &Access,
    role: Role,
    module: Module,
) -> crate::Result<PermissionMatrix> {
    access.require(Module::Permissions, Actions::UPDATE)?;
    let mut matrix = load_matrix(conn)?;
    matrix.clear_override(role, module);
    if permission::delete_override(conn, role, module)? {
        audit::record(
            conn,
            access,
            Module::Permissions,
            "reset",
            format!("{role}/{module}"),
            None,
        )?;
    }
    Ok(matrix)
}
