use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use serde::Deserialize;
use staffing::permission::{Actions, Module, Scope};
use staffing::{CertificationId, CourseId, EmployeeId, EnrollmentId};

use crate::common::error::RmpError;
use crate::repo::skill::{self, Proficiency};
use crate::repo::training::{
    self, Certification, CertificationData, Course, CourseData, Enrollment, EnrollmentStatus,
    ExpiringCertification,
};
use crate::repo::{employee, quiz};
use crate::service::access::Access;
use crate::service::audit;

/// Proficiency an employee reaches in a skill by completing a course teaching it.
pub const COURSE_PROFICIENCY: Proficiency = Proficiency::Intermediate;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentUpdate {
    #[serde(default)]
    pub status: Option<EnrollmentStatus>,
    #[serde(default)]
    pub progress: Option<u8>,
}

fn transition_allowed(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
    use EnrollmentStatus::*;
    from == to
        || matches!(
            (from, to),
            (Enrolled, InProgress | Completed | Dropped) | (InProgress, Completed | Dropped)
        )
}

pub fn list_courses(conn: &Connection, access: &Access) -> crate::Result<Vec<Course>> {
    access.require(Module::Training, Actions::VIEW)?;
    training::list_courses(conn)
}

pub fn get_course(conn: &Connection, access: &Access, id: CourseId) -> crate::Result<Course> {
    access.require(Module::Training, Actions::VIEW)?;
    training::get_course(conn, id)
}

pub fn create_course(conn: &Connection, access: &Access, data: &CourseData) -> crate::Result<Course> {
    if access.require(Module::Training, Actions::CREATE)? == Scope::Own {
        return Err(RmpError::Forbidden {
            role: access.role(),
            module: Module::Training,
            action: "create",
        });
    }
    if data.title.trim().is_empty() {
        return Err(RmpError::validation("Course title cannot be empty"));
    }
    if data.duration_hours.is_some_and(|h| !h.is_finite() || h <= 0.0) {
        return Err(RmpError::validation("Course duration must be positive"));
    }
    if let Some(skill_id) = data.skill_id {
        skill::get(conn, skill_id)?;
    }
    if let Some(quiz_id) = data.quiz_id {
        quiz::get(conn, quiz_id)?;
    }
    let id = training::insert_course(conn, data)?;
    audit::record(conn, access, Module::Training, "create", id, Some(&data.title))?;
    training::get_course(conn, id)
}

/// Enrolling changes the employee's training record, so it needs `update`.
pub fn enroll(
    conn: &Connection,
    access: &Access,
    course_id: CourseId,
    employee_id: Option<EmployeeId>,
    today: NaiveDate,
) -> crate::Result<Enrollment> {
    let employee_id = match employee_id {
        Some(id) => id,
        None => access.own_employee()?,
    };
    access.require_for_employee(Module::Training, Actions::UPDATE, employee_id)?;
    let employee = employee::get(conn, employee_id)?;
    if !employee.active {
        return Err(RmpError::Conflict(format!(
            "Employee {} is inactive",
            employee.code
        )));
    }
    training::get_course(conn, course_id)?;
    if training::find_enrollment(conn, employee_id, course_id)?.is_some() {
        return Err(RmpError::Conflict(format!(
            "Employee {} is already enrolled in course {course_id}",
            employee.code
        )));
    }
    let id = training::insert_enrollment(conn, employee_id, course_id, today)?;
    audit::record(
        conn,
        access,
        Module::Training,
        "enroll",
        id,
        Some(&format!("employee {employee_id}, course {course_id}")),
    )?;
    training::get_enrollment(conn, id)
}

/// Marks the enrollment completed and credits the course's skill.
pub(crate) fn complete(
    conn: &Connection,
    enrollment: &Enrollment,
    on: NaiveDate,
) -> crate::Result<()> {
    training::update_enrollment(conn, enrollment.id, EnrollmentStatus::Completed, 100, Some(on))?;
    let course = training::get_course(conn, enrollment.course_id)?;
    if let Some(skill_id) = course.skill_id {
        skill::raise_proficiency(conn, enrollment.employee_id, skill_id, COURSE_PROFICIENCY)?;
    }
    log::debug!(
        "Employee {} completed course {}",
        enrollment.employee_id,
        course.title
    );
    Ok(())
}

pub fn update_enrollment(
    conn: &Connection,
    access: &Access,
    id: EnrollmentId,
    change: &EnrollmentUpdate,
    today: NaiveDate,
) -> crate::Result<Enrollment> {
    let enrollment = training::get_enrollment(conn, id)?;
    access.require_for_employee(Module::Training, Actions::UPDATE, enrollment.employee_id)?;
    if enrollment.status.is_final() {
        return Err(RmpError::Conflict(format!(
            "Enrollment {id} is already {}",
            enrollment.status
        )));
    }
    let progress = change.progress.unwrap_or(enrollment.progress);
    if progress > 100 {
        return Err(RmpError::validation(format!(
            "Progress must be between 0 and 100, got {progress}"
        )));
    }
    let status = match change.status {
        Some(status) => status,
        None if progress == 100 => EnrollmentStatus::Completed,
        None if progress > 0 => EnrollmentStatus::InProgress,
        None => enrollment.status,
    };
    if !transition_allowed(enrollment.status, status) {
        return Err(RmpError::Conflict(format!(
            "Enrollment cannot change from {} to {status}",
            enrollment.status
        )));
    }

    if status == EnrollmentStatus::Completed {
        complete(conn, &enrollment, today)?;
    } else {
        training::update_enrollment(conn, id, status, progress, None)?;
    }
    audit::record(
        conn,
        access,
        Module::Training,
        "update",
        id,
        Some(&format!("{status} {progress}%")),
    )?;
    training::get_enrollment(conn, id)
}

pub fn enrollments(
    conn: &Connection,
    access: &Access,
    employee_id: EmployeeId,
) -> crate::Result<Vec<Enrollment>> {
    access.require(Module::Training, Actions::VIEW)?;
    employee::get(conn, employee_id)?;
    training::enrollments_for_employee(conn, employee_id)
}

pub fn certifications(
    conn: &Connection,
    access: &Access,
    employee_id: EmployeeId,
) -> crate::Result<Vec<Certification>> {
    access.require(Module::Training, Actions::VIEW)?;
    employee::get(conn, employee_id)?;
    training::certifications_for_employee(conn, employee_id)
}

pub fn add_certification(
    conn: &Connection,
    access: &Access,
    employee_id: EmployeeId,
    data: &CertificationData,
) -> crate::Result<Certification> {
    access.require_for_employee(Module::Training, Actions::UPDATE, employee_id)?;
    if data.name.trim().is_empty() {
        return Err(RmpError::validation("Certification name cannot be empty"));
    }
    if data.expires_on.is_some_and(|expiry| expiry < data.issued_on) {
        return Err(RmpError::validation(
            "Certification cannot expire before it was issued",
        ));
    }
    employee::get(conn, employee_id)?;
    let id = training::insert_certification(conn, employee_id, data)?;
    audit::record(conn, access, Module::Training, "certify", id, Some(&data.name))?;
    training::get_certification(conn, id)
}

pub fn delete_certification(
    conn: &Connection,
    access: &Access,
    id: CertificationId,
) -> crate::Result<()> {
    let certification = training::get_certification(conn, id)?;
    access.require_for_employee(Module::Training, Actions::DELETE, certification.employee_id)?;
    training::delete_certification(conn, id)?;
    audit::record(conn, access, Module::Training, "delete", id, Some(&certification.name))
}

pub fn expiring(
    conn: &Connection,
    access: &Access,
    within_days: u32,
    today: NaiveDate,
) -> crate::Result<Vec<ExpiringCertification>> {
    access.require(Module::Training, Actions::VIEW)?;
    let until = today
        .checked_add_days(Days::new(within_days.into()))
        .ok_or_else(|| RmpError::validation(format!("Invalid window of {within_days} days")))?;
    training::expiring_between(conn, today, until)
}
