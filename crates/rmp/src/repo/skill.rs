use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, named_params};
use serde::{Deserialize, Serialize};
use staffing::{EmployeeId, SkillId};

use crate::common::error::RmpError;
use crate::repo::employee::employed_on_condition;
use crate::repo::{expect_changed, now};

staffing::named_enum!(Proficiency, "proficiency", {
    Beginner => "beginner",
    Elementary => "elementary",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Expert => "expert",
});

impl Proficiency {
    /// Stored level, 1 (beginner) to 5 (expert).
    pub fn level(&self) -> u8 {
        match self {
            Proficiency::Beginner => 1,
            Proficiency::Elementary => 2,
            Proficiency::Intermediate => 3,
            Proficiency::Advanced => 4,
            Proficiency::Expert => 5,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Proficiency::ALL.get(usize::from(level).checked_sub(1)?).copied()
    }
}

fn proficiency_column(row: &Row, index: usize) -> rusqlite::Result<Proficiency> {
    let level: u8 = row.get(index)?;
    Proficiency::from_level(level).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        index,
        level.into(),
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillData {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeSkill {
    pub skill_id: SkillId,
    pub name: String,
    pub category: Option<String>,
    pub proficiency: Proficiency,
    pub years_experience: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

fn skill_from_row(row: &Row) -> rusqlite::Result<Skill> {
    Ok(Skill {
        id: SkillId::new(row.get(0)?),
        name: row.get(1)?,
        category: row.get(2)?,
    })
}

pub fn insert(conn: &Connection, data: &SkillData) -> crate::Result<SkillId> {
    conn.execute(
        "INSERT INTO skills (name, category) VALUES (?1, ?2)",
        rusqlite::params![data.name, data.category],
    )?;
    Ok(SkillId::new(conn.last_insert_rowid() as u32))
}

pub fn get(conn: &Connection, id: SkillId) -> crate::Result<Skill> {
    conn.query_row(
        "SELECT id, name, category FROM skills WHERE id = ?1",
        [id.as_num()],
        skill_from_row,
    )
    .optional()?
    .ok_or_else(|| RmpError::not_found("Skill", id))
}

pub fn list(conn: &Connection) -> crate::Result<Vec<Skill>> {
    let mut stmt = conn.prepare("SELECT id, name, category FROM skills ORDER BY name")?;
    let rows = stmt.query_map([], skill_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn delete(conn: &Connection, id: SkillId) -> crate::Result<()> {
    let changed = conn.execute("DELETE FROM skills WHERE id = ?1", [id.as_num()])?;
    expect_changed(changed, "Skill", id)
}

pub fn upsert_employee_skill(
    conn: &Connection,
    employee_id: EmployeeId,
    skill_id: SkillId,
    proficiency: Proficiency,
    years_experience: Option<f64>,
) -> crate::Result<()> {
    conn.execute(
        "INSERT INTO employee_skills (employee_id, skill_id, proficiency, years_experience, updated_at) \
         VALUES (:employee_id, :skill_id, :proficiency, :years, :now) \
         ON CONFLICT (employee_id, skill_id) DO UPDATE SET \
         proficiency = excluded.proficiency, years_experience = excluded.years_experience, \
         updated_at = excluded.updated_at",
        named_params! {
            ":employee_id": employee_id.as_num(),
            ":skill_id": skill_id.as_num(),
            ":proficiency": proficiency.level(),
            ":years": years_experience,
            ":now": now(),
        },
    )?;
    Ok(())
}

/// Sets the proficiency to at least `minimum`, never lowering it.
pub fn raise_proficiency(
    conn: &Connection,
    employee_id: EmployeeId,
    skill_id: SkillId,
    minimum: Proficiency,
) -> crate::Result<()> {
    conn.execute(
        "INSERT INTO employee_skills (employee_id, skill_id, proficiency, updated_at) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (employee_id, skill_id) DO UPDATE SET \
         proficiency = MAX(proficiency, excluded.proficiency), updated_at = excluded.updated_at",
        rusqlite::params![employee_id.as_num(), skill_id.as_num(), minimum.level(), now()],
    )?;
    Ok(())
}

pub fn remove_employee_skill(
    conn: &Connection,
    employee_id: EmployeeId,
    skill_id: SkillId,
) -> crate::Result<()> {
    let changed = conn.execute(
        "DELETE FROM employee_skills WHERE employee_id = ?1 AND skill_id = ?2",
        [employee_id.as_num(), skill_id.as_num()],
    )?;
    expect_changed(changed, "Employee skill", skill_id)
}

/// Skills of an employee, strongest first.
pub fn employee_skills(
    conn: &Connection,
    employee_id: EmployeeId,
) -> crate::Result<Vec<EmployeeSkill>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.category, es.proficiency, es.years_experience, es.updated_at \
         FROM employee_skills es JOIN skills s ON s.id = es.skill_id \
         WHERE es.employee_id = ?1 ORDER BY es.proficiency DESC, s.name",
    )?;
    let rows = stmt.query_map([employee_id.as_num()], |row| {
        Ok(EmployeeSkill {
            skill_id: SkillId::new(row.get(0)?),
            name: row.get(1)?,
            category: row.get(2)?,
            proficiency: proficiency_column(row, 3)?,
            years_experience: row.get(4)?,
            updated_at: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Employees on the payroll on `on` holding the skill at `minimum` or better.
pub fn employees_with_skill(
    conn: &Connection,
    skill_id: SkillId,
    minimum: Proficiency,
    on: NaiveDate,
) -> crate::Result<Vec<(EmployeeId, Proficiency)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT es.employee_id, es.proficiency FROM employee_skills es \
         JOIN employees e ON e.id = es.employee_id \
         WHERE es.skill_id = ?1 AND es.proficiency >= ?2 AND {} \
         ORDER BY es.proficiency DESC, e.name",
        employed_on_condition("e", "?3")
    ))?;
    let rows = stmt.query_map(rusqlite::params![skill_id.as_num(), minimum.level(), on], |row| {
        Ok((EmployeeId::new(row.get(0)?), proficiency_column(row, 1)?))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
