use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, named_params};
use serde::{Deserialize, Serialize};
use staffing::{CertificationId, CourseId, EmployeeId, EnrollmentId, QuizId, SkillId};

use crate::common::error::RmpError;
use crate::db::parse_column;
use crate::repo::employee::employed_on_condition;
use crate::repo::{expect_changed, now};

staffing::named_enum!(EnrollmentStatus, "enrollment status", {
    Enrolled => "enrolled",
    InProgress => "in_progress",
    Completed => "completed",
    Dropped => "dropped",
});

impl EnrollmentStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, EnrollmentStatus::Completed | EnrollmentStatus::Dropped)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub provider: Option<String>,
    pub duration_hours: Option<f64>,
    pub skill_id: Option<SkillId>,
    pub quiz_id: Option<QuizId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseData {
    pub title: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub skill_id: Option<SkillId>,
    #[serde(default)]
    pub quiz_id: Option<QuizId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub employee_id: EmployeeId,
    pub course_id: CourseId,
    pub course_title: String,
    pub status: EnrollmentStatus,
    pub progress: u8,
    pub enrolled_on: NaiveDate,
    pub completed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Certification {
    pub id: CertificationId,
    pub employee_id: EmployeeId,
    pub name: String,
    pub issuer: Option<String>,
    pub issued_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub credential_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificationData {
    pub name: String,
    #[serde(default)]
    pub issuer: Option<String>,
    pub issued_on: NaiveDate,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    #[serde(default)]
    pub credential_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpiringCertification {
    #[serde(flatten)]
    pub certification: Certification,
    pub employee_name: String,
}

const COURSE_COLUMNS: &str =
    "id, title, provider, duration_hours, skill_id, quiz_id, created_at";

fn course_from_row(row: &Row) -> rusqlite::Result<Course> {
    Ok(Course {
        id: CourseId::new(row.get(0)?),
        title: row.get(1)?,
        provider: row.get(2)?,
        duration_hours: row.get(3)?,
        skill_id: row.get::<_, Option<u32>>(4)?.map(SkillId::new),
        quiz_id: row.get::<_, Option<u32>>(5)?.map(QuizId::new),
        created_at: row.get(6)?,
    })
}

pub fn insert_course(conn: &Connection, data: &CourseData) -> crate::Result<CourseId> {
    conn.execute(
        "INSERT INTO courses (title, provider, duration_hours, skill_id, quiz_id, created_at) \
         VALUES (:title, :provider, :duration_hours, :skill_id, :quiz_id, :now)",
        named_params! {
            ":title": data.title,
            ":provider": data.provider,
            ":duration_hours": data.duration_hours,
            ":skill_id": data.skill_id.map(|id| id.as_num()),
            ":quiz_id": data.quiz_id.map(|id| id.as_num()),
            ":now": now(),
        },
    )?;
    Ok(CourseId::new(conn.last_insert_rowid() as u32))
}

pub fn get_course(conn: &Connection, id: CourseId) -> crate::Result<Course> {
    conn.query_row(
        &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
        [id.as_num()],
        course_from_row,
    )
    .optional()?
    .ok_or_else(|| RmpError::not_found("Course", id))
}

pub fn list_courses(conn: &Connection) -> crate::Result<Vec<Course>> {
    let mut stmt = conn.prepare(&format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY title"))?;
    let rows = stmt.query_map([], course_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn courses_with_quiz(conn: &Connection, quiz_id: QuizId) -> crate::Result<Vec<Course>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE quiz_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([quiz_id.as_num()], course_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

const ENROLLMENT_COLUMNS: &str = "en.id, en.employee_id, en.course_id, c.title, en.status, \
                                  en.progress, en.enrolled_on, en.completed_on";

fn enrollment_from_row(row: &Row) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: EnrollmentId::new(row.get(0)?),
        employee_id: EmployeeId::new(row.get(1)?),
        course_id: CourseId::new(row.get(2)?),
        course_title: row.get(3)?,
        status: parse_column(row, 4)?,
        progress: row.get(5)?,
        enrolled_on: row.get(6)?,
        completed_on: row.get(7)?,
    })
}

pub fn insert_enrollment(
    conn: &Connection,
    employee_id: EmployeeId,
    course_id: CourseId,
    enrolled_on: NaiveDate,
) -> crate::Result<EnrollmentId> {
    conn.execute(
        "INSERT INTO enrollments (employee_id, course_id, status, progress, enrolled_on) \
         VALUES (?1, ?2, ?3, 0, ?4)",
        rusqlite::params![
            employee_id.as_num(),
            course_id.as_num(),
            EnrollmentStatus::Enrolled.as_str(),
            enrolled_on
        ],
    )?;
    Ok(EnrollmentId::new(conn.last_insert_rowid() as u32))
}

pub fn get_enrollment(conn: &Connection, id: EnrollmentId) -> crate::Result<Enrollment> {
    conn.query_row(
        &format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments en \
             JOIN courses c ON c.id = en.course_id WHERE en.id = ?1"
        ),
        [id.as_num()],
        enrollment_from_row,
    )
    .optional()?
    .ok_or_else(|| RmpError::not_found("Enrollment", id))
}

pub fn find_enrollment(
    conn: &Connection,
    employee_id: EmployeeId,
    course_id: CourseId,
) -> crate::Result<Option<Enrollment>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments en \
                 JOIN courses c ON c.id = en.course_id \
                 WHERE en.employee_id = ?1 AND en.course_id = ?2"
            ),
            [employee_id.as_num(), course_id.as_num()],
            enrollment_from_row,
        )
        .optional()?)
}

pub fn enrollments_for_employee(
    conn: &Connection,
    employee_id: EmployeeId,
) -> crate::Result<Vec<Enrollment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments en \
         JOIN courses c ON c.id = en.course_id \
         WHERE en.employee_id = ?1 ORDER BY en.enrolled_on DESC, en.id"
    ))?;
    let rows = stmt.query_map([employee_id.as_num()], enrollment_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update_enrollment(
    conn: &Connection,
    id: EnrollmentId,
    status: EnrollmentStatus,
    progress: u8,
    completed_on: Option<NaiveDate>,
) -> crate::Result<()> {
    let changed = conn.execute(
        "UPDATE enrollments SET status = ?2, progress = ?3, completed_on = ?4 WHERE id = ?1",
        rusqlite::params![id.as_num(), status.as_str(), progress, completed_on],
    )?;
    expect_changed(changed, "Enrollment", id)
}

const CERTIFICATION_COLUMNS: &str =
    "c.id, c.employee_id, c.name, c.issuer, c.issued_on, c.expires_on, c.credential_id";

fn certification_from_row(row: &Row) -> rusqlite::Result<Certification> {
    Ok(Certification {
        id: CertificationId::new(row.get(0)?),
        employee_id: EmployeeId::new(row.get(1)?),
        name: row.get(2)?,
        issuer: row.get(3)?,
        issued_on: row.get(4)?,
        expires_on: row.get(5)?,
        credential_id: row.get(6)?,
    })
}

pub fn insert_certification(
    conn: &Connection,
    employee_id: EmployeeId,
    data: &CertificationData,
) -> crate::Result<CertificationId> {
    conn.execute(
        "INSERT INTO certifications (employee_id, name, issuer, issued_on, expires_on, credential_id) \
         VALUES (:employee_id, :name, :issuer, :issued_on, :expires_on, :credential_id)",
        named_params! {
            ":employee_id": employee_id.as_num(),
            ":name": data.name,
            ":issuer": data.issuer,
            ":issued_on": data.issued_on,
            ":expires_on": data.expires_on,
            ":credential_id": data.credential_id,
        },
    )?;
    Ok(CertificationId::new(conn.last_insert_rowid() as u32))
}

pub fn get_certification(conn: &Connection, id: CertificationId) -> crate::Result<Certification> {
    conn.query_row(
        &format!("SELECT {CERTIFICATION_COLUMNS} FROM certifications c WHERE c.id = ?1"),
        [id.as_num()],
        certification_from_row,
    )
    .optional()?
    .ok_or_else(|| RmpError::not_found("Certification", id))
}

pub fn certifications_for_employee(
    conn: &Connection,
    employee_id: EmployeeId,
) -> crate::Result<Vec<Certification>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CERTIFICATION_COLUMNS} FROM certifications c \
         WHERE c.employee_id = ?1 ORDER BY c.issued_on DESC, c.id"
    ))?;
    let rows = stmt.query_map([employee_id.as_num()], certification_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn delete_certification(conn: &Connection, id: CertificationId) -> crate::Result<()> {
    let changed = conn.execute("DELETE FROM certifications WHERE id = ?1", [id.as_num()])?;
    expect_changed(changed, "Certification", id)
}

/// Certifications of employees still employed on `from`, expiring in `from..=until`.
pub fn expiring_between(
    conn: &Connection,
    from: NaiveDate,
    until: NaiveDate,
) -> crate::Result<Vec<ExpiringCertification>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CERTIFICATION_COLUMNS}, e.name FROM certifications c \
         JOIN employees e ON e.id = c.employee_id \
         WHERE {} AND c.expires_on IS NOT NULL \
         AND c.expires_on >= ?1 AND c.expires_on <= ?2 \
         ORDER BY c.expires_on, e.name",
        employed_on_condition("e", "?1")
    ))?;
    let rows = stmt.query_map(rusqlite::params![from, until], |row| {
        Ok(ExpiringCertification {
            certification: certification_from_row(row)?,
            employee_name: row.get(7)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::{CertificationData, CourseData, EnrollmentStatus};
    use crate::repo::training;
    use crate::tests::utils::{date, seed_staff, test_db};

    #[test]
    fn test_enrollment_is_unique_per_course() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, _) = seed_staff(conn)?;
            let course = training::insert_course(
                conn,
                &CourseData {
                    title: "Async Rust".to_string(),
                    provider: None,
                    duration_hours: Some(12.0),
                    skill_id: None,
                    quiz_id: None,
                },
            )?;
            let id = training::insert_enrollment(conn, employees[0], course, date("2024-01-01"))?;
            assert!(
                training::insert_enrollment(conn, employees[0], course, date("2024-01-02"))
                    .is_err()
            );
            training::update_enrollment(
                conn,
                id,
                EnrollmentStatus::Completed,
                100,
                Some(date("2024-02-01")),
            )?;
            let enrollment = training::find_enrollment(conn, employees[0], course)?.unwrap();
            assert_eq!(enrollment.status, EnrollmentStatus::Completed);
            assert_eq!(enrollment.course_title, "Async Rust");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_expiring_certifications() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, _) = seed_staff(conn)?;
            let cert = |name: &str, expires: Option<&str>| CertificationData {
                name: name.to_string(),
                issuer: None,
                issued_on: date("2023-01-01"),
                expires_on: expires.map(date),
                credential_id: None,
            };
            training::insert_certification(conn, employees[0], &cert("CKA", Some("2024-01-20")))?;
            training::insert_certification(conn, employees[0], &cert("AWS", Some("2024-06-01")))?;
            training::insert_certification(conn, employees[1], &cert("PMP", None))?;

            let expiring =
                training::expiring_between(conn, date("2024-01-01"), date("2024-01-31"))?;
            assert_eq!(expiring.len(), 1);
            assert_eq!(expiring[0].certification.name, "CKA");
            assert_eq!(expiring[0].employee_name, "Ada");
            Ok(())
        })
        .unwrap();
    }
}
