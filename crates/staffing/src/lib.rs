//! Domain rules of resource management that do not depend on storage:
//! full-time equivalents, date periods, per-employee capacity accounting,
//! availability derivation and the role permission matrix.

#[macro_use]
pub mod common;

pub mod availability;
pub mod fte;
pub mod ledger;
pub mod period;
pub mod permission;

pub use crate::common::ids::{
    AllocationId, AttemptId, CertificationId, CourseId, EmployeeId, EnrollmentId, ProjectId,
    QuizId, SkillId, UserId,
};
pub use crate::fte::{Fte, FteInput};
pub use crate::period::Period;

pub type Error = common::error::StaffingError;
pub type Result<T> = std::result::Result<T, Error>;
