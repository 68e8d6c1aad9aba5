use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use staffing::availability::Availability;
use staffing::ledger::Ledger;
use staffing::permission::{Actions, Module, Scope};
use staffing::{EmployeeId, Fte, SkillId};

use crate::common::error::RmpError;
use crate::repo::employee;
use crate::repo::skill::{self, EmployeeSkill, Proficiency, Skill, SkillData};
use crate::service::access::Access;
use crate::service::audit;
use crate::service::employee::{availability_of, ledgers};

#[derive(Debug, Clone, Deserialize)]
pub struct SkillLevel {
    pub proficiency: Proficiency,
    #[serde(default)]
    pub years_experience: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub skill_id: SkillId,
    #[serde(default)]
    pub min_proficiency: Option<Proficiency>,
    /// Only employees with at least this much free capacity.
    #[serde(default)]
    pub fte: Option<Fte>,
    #[serde(default)]
    pub on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub employee_id: EmployeeId,
    pub name: String,
    pub proficiency: Proficiency,
    pub availability: Availability,
}

/// Catalog changes are not tied to any employee, so they need unrestricted rights.
fn require_catalog(access: &Access, action: Actions) -> crate::Result<()> {
    match access.require(Module::Skills, action)? {
        Scope::Any => Ok(()),
        Scope::Own => Err(RmpError::Forbidden {
            role: access.role(),
            module: Module::Skills,
            action: action.single_name(),
        }),
    }
}

pub fn list(conn: &Connection, access: &Access) -> crate::Result<Vec<Skill>> {
    access.require(Module::Skills, Actions::VIEW)?;
    skill::list(conn)
}

pub fn create(conn: &Connection, access: &Access, data: &SkillData) -> crate::Result<Skill> {
    require_catalog(access, Actions::CREATE)?;
    let name = data.name.trim();
    if name.is_empty() {
        return Err(RmpError::validation("Skill name cannot be empty"));
    }
    let id = skill::insert(
        conn,
        &SkillData {
            name: name.to_string(),
            category: data.category.clone(),
        },
    )?;
    audit::record(conn, access, Module::Skills, "create", id, Some(name))?;
    skill::get(conn, id)
}

pub fn delete(conn: &Connection, access: &Access, id: SkillId) -> crate::Result<()> {
    require_catalog(access, Actions::DELETE)?;
    skill::delete(conn, id)?;
    audit::record(conn, access, Module::Skills, "delete", id, None)
}

pub fn employee_skills(
    conn: &Connection,
    access: &Access,
    employee_id: EmployeeId,
) -> crate::Result<Vec<EmployeeSkill>> {
    access.require(Module::Skills, Actions::VIEW)?;
    employee::get(conn, employee_id)?;
    skill::employee_skills(conn, employee_id)
}

pub fn set_employee_skill(
    conn: &Connection,
    access: &Access,
    employee_id: EmployeeId,
    skill_id: SkillId,
    level: &SkillLevel,
) -> crate::Result<Vec<EmployeeSkill>> {
    access.require_for_employee(Module::Skills, Actions::UPDATE, employee_id)?;
    if level
        .years_experience
        .is_some_and(|years| !years.is_finite() || years < 0.0)
    {
        return Err(RmpError::validation("Years of experience cannot be negative"));
    }
    employee::get(conn, employee_id)?;
    skill::get(conn, skill_id)?;
    skill::upsert_employee_skill(
        conn,
        employee_id,
        skill_id,
        level.proficiency,
        level.years_experience,
    )?;
    audit::record(
        conn,
        access,
        Module::Skills,
        "assign",
        employee_id,
        Some(&format!("skill {skill_id} = {}", level.proficiency)),
    )?;
    skill::employee_skills(conn, employee_id)
}

pub fn remove_employee_skill(
    conn: &Connection,
    access: &Access,
    employee_id: EmployeeId,
    skill_id: SkillId,
) -> crate::Result<()> {
    access.require_for_employee(Module::Skills, Actions::DELETE, employee_id)?;
    skill::remove_employee_skill(conn, employee_id, skill_id)?;
    audit::record(
        conn,
        access,
        Module::Skills,
        "unassign",
        employee_id,
        Some(&format!("skill {skill_id}")),
    )
}

/// Who can be staffed with the skill: strongest first, then the most free capacity.
pub fn search(
    conn: &Connection,
    access: &Access,
    query: &SearchQuery,
    today: NaiveDate,
) -> crate::Result<Vec<Candidate>> {
    access.require(Module::Skills, Actions::VIEW)?;
    access.require(Module::Employees, Actions::VIEW)?;
    skill::get(conn, query.skill_id)?;
    let on = query.on.unwrap_or(today);
    let holders = skill::employees_with_skill(
        conn,
        query.skill_id,
        query.min_proficiency.unwrap_or(Proficiency::Beginner),
        on,
    )?;
    let ledgers = ledgers(conn)?;
    let empty = Ledger::default();

    let mut candidates = Vec::with_capacity(holders.len());
    for (employee_id, proficiency) in holders {
        let employee = employee::get(conn, employee_id)?;
        let ledger = ledgers.get(&employee_id).unwrap_or(&empty);
        let availability = availability_of(ledger, &employee, on);
        if query.fte.is_some_and(|fte| availability.available < fte) {
            continue;
        }
        candidates.push(Candidate {
            employee_id,
            name: employee.name,
            proficiency,
            availability,
        });
    }
    candidates.sort_by(|a, b| {
        b.proficiency
            .level()
            .cmp(&a.proficiency.level())
            .then(b.availability.available.cmp(&a.availability.available))
    });
    Ok(candidates)
}
