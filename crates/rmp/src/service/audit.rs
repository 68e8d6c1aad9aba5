use rusqlite::Connection;
use staffing::permission::{Actions, Module};

use crate::repo::audit::{self, AuditEntry};
use crate::service::access::Access;

pub const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

pub fn record<I: ToString>(
    conn: &Connection,
    access: &Access,
    module: Module,
    action: &str,
    entity_id: I,
    detail: Option<&str>,
) -> crate::Result<()> {
    audit::record(
        conn,
        access.user_id(),
        module,
        action,
        &entity_id.to_string(),
        detail,
    )
}

pub fn list(
    conn: &Connection,
    access: &Access,
    module: Option<Module>,
    limit: Option<u32>,
) -> crate::Result<Vec<AuditEntry>> {
    access.require(Module::Audit, Actions::VIEW)?;
    audit::list(
        conn,
        module,
        limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    )
}
