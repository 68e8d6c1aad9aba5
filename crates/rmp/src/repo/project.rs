use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, named_params};
use serde::{Deserialize, Serialize};
use staffing::{EmployeeId, Period, ProjectId};

use crate::common::error::RmpError;
use crate::db::parse_column;
use crate::repo::{expect_changed, now};

staffing::named_enum!(ProjectStatus, "project status", {
    Pipeline => "pipeline",
    Active => "active",
    OnHold => "on_hold",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl ProjectStatus {
    /// Closed projects accept no new staffing.
    pub fn is_closed(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub code: String,
    pub name: String,
    pub client: Option<String>,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub manager_id: Option<EmployeeId>,
    pub billable: bool,
    pub description: Option<String>,
    pub zoho_project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn period(&self) -> crate::Result<Period> {
        Ok(Period::new(self.start_date, self.end_date)?)
    }
}

fn default_status() -> ProjectStatus {
    ProjectStatus::Pipeline
}

fn default_billable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectData {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default = "default_status")]
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub manager_id: Option<EmployeeId>,
    #[serde(default = "default_billable")]
    pub billable: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<&Project> for ProjectData {
    fn from(project: &Project) -> Self {
        ProjectData {
            code: project.code.clone(),
            name: project.name.clone(),
            client: project.client.clone(),
            status: project.status,
            start_date: project.start_date,
            end_date: project.end_date,
            manager_id: project.manager_id,
            billable: project.billable,
            description: project.description.clone(),
        }
    }
}

const COLUMNS: &str = "id, code, name, client, status, start_date, end_date, manager_id, \
                       billable, description, zoho_project_id, created_at, updated_at";

fn from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId::new(row.get(0)?),
        code: row.get(1)?,
        name: row.get(2)?,
        client: row.get(3)?,
        status: parse_column(row, 4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        manager_id: row.get::<_, Option<u32>>(7)?.map(EmployeeId::new),
        billable: row.get(8)?,
        description: row.get(9)?,
        zoho_project_id: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub fn insert(
    conn: &Connection,
    data: &ProjectData,
    zoho_project_id: Option<&str>,
) -> crate::Result<ProjectId> {
    let now = now();
    conn.execute(
        "INSERT INTO projects (code, name, client, status, start_date, end_date, manager_id, \
         billable, description, zoho_project_id, created_at, updated_at) \
         VALUES (:code, :name, :client, :status, :start_date, :end_date, :manager_id, \
         :billable, :description, :zoho_project_id, :now, :now)",
        named_params! {
            ":code": data.code,
            ":name": data.name,
            ":client": data.client,
            ":status": data.status.as_str(),
            ":start_date": data.start_date,
            ":end_date": data.end_date,
            ":manager_id": data.manager_id.map(|id| id.as_num()),
            ":billable": data.billable,
            ":description": data.description,
            ":zoho_project_id": zoho_project_id,
            ":now": now,
        },
    )?;
    Ok(ProjectId::new(conn.last_insert_rowid() as u32))
}

pub fn find(conn: &Connection, id: ProjectId) -> crate::Result<Option<Project>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM projects WHERE id = ?1"),
            [id.as_num()],
            from_row,
        )
        .optional()?)
}

pub fn get(conn: &Connection, id: ProjectId) -> crate::Result<Project> {
    find(conn, id)?.ok_or_else(|| RmpError::not_found("Project", id))
}

pub fn find_by_zoho_id(conn: &Connection, zoho_id: &str) -> crate::Result<Option<Project>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM projects WHERE zoho_project_id = ?1"),
            [zoho_id],
            from_row,
        )
        .optional()?)
}

pub fn list(conn: &Connection, status: Option<ProjectStatus>) -> crate::Result<Vec<Project>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM projects WHERE (?1 IS NULL OR status = ?1) ORDER BY code"
    ))?;
    let rows = stmt.query_map([status.map(|s| s.as_str())], from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update(conn: &Connection, id: ProjectId, data: &ProjectData) -> crate::Result<()> {
    let changed = conn.execute(
        "UPDATE projects SET code = :code, name = :name, client = :client, status = :status, \
         start_date = :start_date, end_date = :end_date, manager_id = :manager_id, \
         billable = :billable, description = :description, updated_at = :now \
         WHERE id = :id",
        named_params! {
            ":id": id.as_num(),
            ":code": data.code,
            ":name": data.name,
            ":client": data.client,
            ":status": data.status.as_str(),
            ":start_date": data.start_date,
            ":end_date": data.end_date,
            ":manager_id": data.manager_id.map(|id| id.as_num()),
            ":billable": data.billable,
            ":description": data.description,
            ":now": now(),
        },
    )?;
    expect_changed(changed, "Project", id)
}

pub fn delete(conn: &Connection, id: ProjectId) -> crate::Result<()> {
    let changed = conn.execute("DELETE FROM projects WHERE id = ?1", [id.as_num()])?;
    expect_changed(changed, "Project", id)
}

#[cfg(test)]
mod tests {
    use super::ProjectStatus;
    use crate::repo::project;
    use crate::tests::utils::{project_data, test_db};

    #[test]
    fn test_list_by_status() {
        let db = test_db();
        db.with_conn(|conn| {
            project::insert(conn, &project_data("P1", "2024-01-01", None), None)?;
            let mut data = project_data("P2", "2024-01-01", Some("2024-06-30"));
            data.status = ProjectStatus::Completed;
            project::insert(conn, &data, Some("z-1"))?;

            let active = project::list(conn, Some(ProjectStatus::Active))?;
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].code, "P1");
            assert_eq!(project::list(conn, None)?.len(), 2);

            let synced = project::find_by_zoho_id(conn, "z-1")?.unwrap();
            assert_eq!(synced.code, "P2");
            assert!(synced.status.is_closed());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_missing_project() {
        let db = test_db();
        let result = db.with_conn(|conn| {
            project::update(conn, 7.into(), &project_data("P7", "2024-01-01", None))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_status_names() {
        assert_eq!("on_hold".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
        assert!("paused".parse::<ProjectStatus>().is_err());
    }
}
