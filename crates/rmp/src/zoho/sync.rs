use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;
use staffing::Period;
use staffing::permission::{Actions, Module};

use crate::common::error::RmpError;
use crate::db::Database;
use crate::repo::employee;
use crate::repo::project::{self, ProjectData, ProjectStatus};
use crate::service::access::Access;
use crate::service::{self, audit};
use crate::zoho::{ZohoApi, ZohoProject};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub skipped: u32,
}

pub fn map_status(status: &str) -> ProjectStatus {
    match status.trim().to_lowercase().as_str() {
        "active" => ProjectStatus::Active,
        "archived" | "completed" => ProjectStatus::Completed,
        "on hold" | "on_hold" | "onhold" => ProjectStatus::OnHold,
        _ => ProjectStatus::Pipeline,
    }
}

pub fn project_code(zoho_id: &str) -> String {
    format!("ZOHO-{zoho_id}")
}

enum Outcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

fn apply_one(conn: &Connection, remote: &ZohoProject) -> crate::Result<Outcome> {
    let Some(start_date) = remote.start_date else {
        log::debug!("Zoho project {} has no start date, skipping", remote.id);
        return Ok(Outcome::Skipped);
    };
    if remote.end_date.is_some_and(|end| end < start_date) {
        log::warn!("Zoho project {} ends before it starts, skipping", remote.id);
        return Ok(Outcome::Skipped);
    }
    let manager_id = match &remote.owner_email {
        Some(email) => employee::find_by_email(conn, email)?.map(|e| e.id),
        None => None,
    };
    let status = map_status(&remote.status);

    match project::find_by_zoho_id(conn, &remote.id)? {
        Some(existing) => {
            let current = ProjectData::from(&existing);
            let data = ProjectData {
                name: remote.name.clone(),
                status,
                start_date,
                end_date: remote.end_date,
                manager_id: manager_id.or(existing.manager_id),
                ..current.clone()
            };
            if data == current {
                return Ok(Outcome::Unchanged);
            }
            let period = Period::new(start_date, remote.end_date)?;
            let outside = service::project::allocations_outside(conn, existing.id, &period)?;
            if outside > 0 {
                log::warn!(
                    "Zoho project {} moved to {period}, which leaves {outside} allocation(s) of {} outside, skipping",
                    remote.id,
                    existing.code
                );
                return Ok(Outcome::Skipped);
            }
            project::update(conn, existing.id, &data)?;
            Ok(Outcome::Updated)
        }
        None => {
            let data = ProjectData {
                code: project_code(&remote.id),
                name: remote.name.clone(),
                client: None,
                status,
                start_date,
                end_date: remote.end_date,
                manager_id,
                billable: true,
                description: None,
            };
            match project::insert(conn, &data, Some(&remote.id)) {
                Ok(_) => Ok(Outcome::Created),
                Err(RmpError::Conflict(message)) => {
                    log::warn!("Zoho project {} clashes with a local project: {message}", remote.id);
                    Ok(Outcome::Skipped)
                }
                Err(error) => Err(error),
            }
        }
    }
}

/// Upserts the remote projects into the local database.
pub fn apply(
    conn: &Connection,
    access: &Access,
    projects: &[ZohoProject],
) -> crate::Result<SyncSummary> {
    access.require(Module::Integrations, Actions::UPDATE)?;
    let mut summary = SyncSummary::default();
    for remote in projects {
        match apply_one(conn, remote)? {
            Outcome::Created => summary.created += 1,
            Outcome::Updated => summary.updated += 1,
            Outcome::Unchanged => summary.unchanged += 1,
            Outcome::Skipped => summary.skipped += 1,
        }
    }
    let detail = serde_json::to_string(&summary)?;
    audit::record(conn, access, Module::Integrations, "sync", "zoho", Some(&detail))?;
    Ok(summary)
}

pub async fn sync_projects(
    db: &Database,
    access: Access,
    api: &dyn ZohoApi,
) -> crate::Result<SyncSummary> {
    access.require(Module::Integrations, Actions::UPDATE)?;
    let projects = api.fetch_projects().await?;
    let summary = db
        .transaction(move |tx| apply(tx, &access, &projects))
        .await?;
    log::info!(
        "Zoho sync finished: {} created, {} updated, {} unchanged, {} skipped",
        summary.created,
        summary.updated,
        summary.unchanged,
        summary.skipped
    );
    Ok(summary)
}

pub async fn run_sync_loop(db: Database, api: Arc<dyn ZohoApi>, interval: Duration) {
    log::info!("Zoho sync runs every {}", humantime::format_duration(interval));
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Err(error) = sync_projects(&db, Access::system(), api.as_ref()).await {
            log::error!("Zoho sync failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use staffing::permission::Role;

    use super::{SyncSummary, apply, map_status, sync_projects};
    use crate::common::error::RmpError;
    use crate::repo::project::{self, ProjectStatus};
    use crate::repo::{allocation, employee};
    use crate::tests::utils::{
        access_for, allocation_record, date, employee_data, system, test_db,
    };
    use crate::zoho::{ZohoApi, ZohoFuture, ZohoProject};

    fn remote(id: &str, status: &str, owner: Option<&str>) -> ZohoProject {
        ZohoProject {
            id: id.to_string(),
            name: format!("Project {id}"),
            status: status.to_string(),
            start_date: Some(date("2024-01-01")),
            end_date: Some(date("2024-12-31")),
            owner_email: owner.map(|o| o.to_string()),
        }
    }

    struct FakeZoho(Vec<ZohoProject>);

    impl ZohoApi for FakeZoho {
        fn fetch_projects(&self) -> ZohoFuture<'_, Vec<ZohoProject>> {
            let projects = self.0.clone();
            Box::pin(async move { Ok(projects) })
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status("active"), ProjectStatus::Active);
        assert_eq!(map_status("Archived"), ProjectStatus::Completed);
        assert_eq!(map_status("completed"), ProjectStatus::Completed);
        assert_eq!(map_status("On Hold"), ProjectStatus::OnHold);
        assert_eq!(map_status("template"), ProjectStatus::Pipeline);
    }

    #[test]
    fn test_create_then_update() {
        let db = test_db();
        db.with_conn(|conn| {
            let ada = employee::insert(conn, &employee_data("E1", "Ada"))?;
            let summary = apply(conn, &system(), &[remote("17", "active", Some("ADA@example.com"))])?;
            assert_eq!(summary.created, 1);
            let created = project::find_by_zoho_id(conn, "17")?.unwrap();
            assert_eq!(created.code, "ZOHO-17");
            assert_eq!(created.manager_id, Some(ada));
            assert_eq!(created.status, ProjectStatus::Active);

            let summary = apply(conn, &system(), &[remote("17", "active", None)])?;
            assert_eq!(
                summary,
                SyncSummary {
                    unchanged: 1,
                    ..Default::default()
                }
            );

            let summary = apply(conn, &system(), &[remote("17", "archived", None)])?;
            assert_eq!(summary.updated, 1);
            let updated = project::find_by_zoho_id(conn, "17")?.unwrap();
            assert_eq!(updated.status, ProjectStatus::Completed);
            assert_eq!(updated.manager_id, Some(ada));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_keeps_allocations_inside_period() {
        let db = test_db();
        db.with_conn(|conn| {
            let ada = employee::insert(conn, &employee_data("E1", "Ada"))?;
            apply(conn, &system(), &[remote("77", "active", None)])?;
            let created = project::find_by_zoho_id(conn, "77")?.unwrap();
            allocation::insert(
                conn,
                &allocation_record(ada, created.id, "2024-01-01", Some("2024-12-31"), "0.5"),
            )?;

            let mut shortened = remote("77", "active", None);
            shortened.end_date = Some(date("2024-02-01"));
            let summary = apply(conn, &system(), &[shortened])?;
            assert_eq!(
                summary,
                SyncSummary {
                    skipped: 1,
                    ..Default::default()
                }
            );
            let kept = project::find_by_zoho_id(conn, "77")?.unwrap();
            assert_eq!(kept.end_date, Some(date("2024-12-31")));

            let mut extended = remote("77", "active", None);
            extended.end_date = Some(date("2025-06-30"));
            assert_eq!(apply(conn, &system(), &[extended])?.updated, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_skips_invalid_projects() {
        let db = test_db();
        db.with_conn(|conn| {
            let mut no_start = remote("1", "active", None);
            no_start.start_date = None;
            let mut reversed = remote("2", "active", None);
            reversed.end_date = Some(date("2023-01-01"));
            let summary = apply(conn, &system(), &[no_start, reversed, remote("3", "", None)])?;
            assert_eq!(summary.skipped, 2);
            assert_eq!(summary.created, 1);
            Ok(())
        })
        .unwrap();
    }

    #[tokio::test]
    async fn test_sync_through_api() {
        let db = test_db();
        let api = FakeZoho(vec![remote("5", "active", None), remote("6", "on hold", None)]);
        let summary = sync_projects(&db, system(), &api).await.unwrap();
        assert_eq!(summary.created, 2);
        let projects = db
            .call(|conn| project::list(conn, Some(ProjectStatus::OnHold)))
            .await
            .unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].code, "ZOHO-6");
    }

    #[tokio::test]
    async fn test_sync_requires_integration_rights() {
        let db = test_db();
        let api = FakeZoho(vec![remote("5", "active", None)]);
        let result = sync_projects(&db, access_for(Role::ProjectManager, None), &api).await;
        assert!(matches!(result, Err(RmpError::Forbidden { .. })));
    }
}
