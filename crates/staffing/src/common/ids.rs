use crate::define_id_type;

define_id_type!(EmployeeId, u32);
define_id_type!(ProjectId, u32);
define_id_type!(AllocationId, u32);
define_id_type!(SkillId, u32);
define_id_type!(CourseId, u32);
define_id_type!(EnrollmentId, u32);
define_id_type!(CertificationId, u32);
define_id_type!(QuizId, u32);
define_id_type!(AttemptId, u32);
define_id_type!(UserId, u32);

#[cfg(test)]
mod tests {
    use super::EmployeeId;

    #[test]
    fn test_id_parse_and_display() {
        let id: EmployeeId = "42".parse().unwrap();
        assert_eq!(id, EmployeeId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("x".parse::<EmployeeId>().is_err());
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = EmployeeId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: EmployeeId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }
}
