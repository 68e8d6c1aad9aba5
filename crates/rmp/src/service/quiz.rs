use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use staffing::permission::{Actions, Module, Scope};
use staffing::{CourseId, EmployeeId, QuizId};

use crate::common::error::RmpError;
use crate::repo::employee;
use crate::repo::quiz::{self, Attempt, Grade, Question, Quiz, QuizData};
use crate::repo::training;
use crate::service::access::Access;
use crate::service::audit;
use crate::service::training::complete;

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub position: u32,
    pub text: String,
    pub options: Vec<String>,
    pub multiple: bool,
    /// Present only for callers allowed to edit quizzes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttemptRequest {
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    pub answers: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub completed_courses: Vec<CourseId>,
}

fn validate(data: &QuizData) -> crate::Result<()> {
    if data.title.trim().is_empty() {
        return Err(RmpError::validation("Quiz title cannot be empty"));
    }
    if !(1..=100).contains(&data.pass_percentage) {
        return Err(RmpError::validation(
            "Pass percentage must be between 1 and 100",
        ));
    }
    if data.max_attempts == Some(0) {
        return Err(RmpError::validation("Attempt limit must be at least 1"));
    }
    if data.questions.is_empty() {
        return Err(RmpError::validation("Quiz needs at least one question"));
    }
    for (index, question) in data.questions.iter().enumerate() {
        let number = index + 1;
        if question.text.trim().is_empty() {
            return Err(RmpError::validation(format!("Question {number} has no text")));
        }
        if question.options.len() < 2 {
            return Err(RmpError::validation(format!(
                "Question {number} needs at least two options"
            )));
        }
        if question.correct.is_empty() {
            return Err(RmpError::validation(format!(
                "Question {number} has no correct option"
            )));
        }
        if let Some(invalid) = question
            .correct
            .iter()
            .find(|&&i| i >= question.options.len())
        {
            return Err(RmpError::validation(format!(
                "Question {number} marks unknown option {invalid} as correct"
            )));
        }
        let mut correct = question.correct.clone();
        correct.sort_unstable();
        correct.dedup();
        if !question.multiple && correct.len() != 1 {
            return Err(RmpError::validation(format!(
                "Single choice question {number} must have exactly one correct option"
            )));
        }
    }
    Ok(())
}

/// Scores the answers. A question counts only when the chosen options are
/// exactly the correct ones.
pub fn grade(
    questions: &[Question],
    answers: &[Vec<usize>],
    pass_percentage: u8,
) -> crate::Result<Grade> {
    if answers.len() != questions.len() {
        return Err(RmpError::validation(format!(
            "Expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }
    let mut correct = 0;
    for (question, answer) in questions.iter().zip(answers) {
        let mut chosen = answer.clone();
        chosen.sort_unstable();
        chosen.dedup();
        if let Some(invalid) = chosen.iter().find(|&&i| i >= question.options.len()) {
            return Err(RmpError::validation(format!(
                "Question {} has no option {invalid}",
                question.position + 1
            )));
        }
        if !question.multiple && chosen.len() > 1 {
            return Err(RmpError::validation(format!(
                "Question {} accepts a single option",
                question.position + 1
            )));
        }
        if chosen == question.correct {
            correct += 1;
        }
    }
    let total = questions.len() as u32;
    let percentage = if total == 0 {
        0.0
    } else {
        f64::from(correct) * 100.0 / f64::from(total)
    };
    Ok(Grade {
        correct,
        total,
        percentage,
        passed: percentage >= f64::from(pass_percentage),
    })
}

pub fn create(conn: &Connection, access: &Access, data: &QuizData) -> crate::Result<QuizView> {
    if access.require(Module::Quizzes, Actions::CREATE)? == Scope::Own
        || !access.can(Module::Quizzes, Actions::UPDATE)
    {
        return Err(RmpError::Forbidden {
            role: access.role(),
            module: Module::Quizzes,
            action: "create",
        });
    }
    validate(data)?;
    let id = quiz::insert(conn, data)?;
    audit::record(conn, access, Module::Quizzes, "create", id, Some(&data.title))?;
    get(conn, access, id)
}

pub fn list(conn: &Connection, access: &Access) -> crate::Result<Vec<Quiz>> {
    access.require(Module::Quizzes, Actions::VIEW)?;
    quiz::list(conn)
}

pub fn get(conn: &Connection, access: &Access, id: QuizId) -> crate::Result<QuizView> {
    access.require(Module::Quizzes, Actions::VIEW)?;
    let reveal = access.can(Module::Quizzes, Actions::UPDATE);
    let quiz = quiz::get(conn, id)?;
    let questions = quiz::questions(conn, id)?
        .into_iter()
        .map(|q| QuestionView {
            position: q.position,
            text: q.text,
            options: q.options,
            multiple: q.multiple,
            correct: reveal.then_some(q.correct),
        })
        .collect();
    Ok(QuizView { quiz, questions })
}

pub fn submit_attempt(
    conn: &Connection,
    access: &Access,
    quiz_id: QuizId,
    request: &AttemptRequest,
    today: NaiveDate,
) -> crate::Result<AttemptResult> {
    let employee_id = match request.employee_id {
        Some(id) => id,
        None => access.own_employee()?,
    };
    access.require_for_employee(Module::Quizzes, Actions::CREATE, employee_id)?;
    let employee = employee::get(conn, employee_id)?;
    if !employee.active {
        return Err(RmpError::Conflict(format!(
            "Employee {} is inactive",
            employee.code
        )));
    }
    let quiz = quiz::get(conn, quiz_id)?;
    if let Some(limit) = quiz.max_attempts {
        if quiz::count_attempts(conn, quiz_id, employee_id)? >= limit {
            return Err(RmpError::Conflict(format!(
                "Employee {} used all {limit} attempt(s) of quiz `{}`",
                employee.code, quiz.title
            )));
        }
    }
    let questions = quiz::questions(conn, quiz_id)?;
    let grade = grade(&questions, &request.answers, quiz.pass_percentage)?;
    let attempt_id = quiz::insert_attempt(conn, quiz_id, employee_id, &request.answers, &grade)?;

    let mut completed_courses = Vec::new();
    if grade.passed {
        for course in training::courses_with_quiz(conn, quiz_id)? {
            if let Some(enrollment) = training::find_enrollment(conn, employee_id, course.id)? {
                if !enrollment.status.is_final() {
                    complete(conn, &enrollment, today)?;
                    completed_courses.push(course.id);
                }
            }
        }
    }
    audit::record(
        conn,
        access,
        Module::Quizzes,
        "attempt",
        attempt_id,
        Some(&format!(
            "quiz {quiz_id}, {}/{} {}",
            grade.correct,
            grade.total,
            if grade.passed { "passed" } else { "failed" }
        )),
    )?;

    let attempt = quiz::attempts(conn, quiz_id, Some(employee_id))?
        .into_iter()
        .find(|a| a.id == attempt_id)
        .ok_or_else(|| RmpError::not_found("Attempt", attempt_id))?;
    Ok(AttemptResult {
        attempt,
        completed_courses,
    })
}

/// Callers who cannot edit quizzes only see their own attempts.
pub fn attempts(
    conn: &Connection,
    access: &Access,
    quiz_id: QuizId,
    employee_id: Option<EmployeeId>,
) -> crate::Result<Vec<Attempt>> {
    access.require(Module::Quizzes, Actions::VIEW)?;
    quiz::get(conn, quiz_id)?;
    let employee_id = if access.can(Module::Quizzes, Actions::UPDATE) {
        employee_id
    } else {
        let own = access.own_employee()?;
        if employee_id.is_some_and(|id| id != own) {
            return Err(RmpError::Forbidden {
                role: access.role(),
                module: Module::Quizzes,
                action: "view",
            });
        }
        Some(own)
    };
    quiz::attempts(conn, quiz_id, employee_id)
}

#[cfg(test)]
mod tests {
    use staffing::permission::Role;

    use super::{AttemptRequest, create, get, grade, submit_attempt};
    use crate::common::error::RmpError;
    use crate::repo::quiz::{Question, QuestionData, QuizData};
    use crate::repo::training::{self, CourseData, EnrollmentStatus};
    use crate::tests::utils::{access_for, date, seed_staff, system, test_db};

    fn question(options: usize, correct: &[usize], multiple: bool) -> Question {
        Question {
            position: 0,
            text: "?".to_string(),
            options: (0..options).map(|i| i.to_string()).collect(),
            correct: correct.to_vec(),
            multiple,
        }
    }

    fn quiz_data(max_attempts: Option<u32>) -> QuizData {
        QuizData {
            title: "Borrowing".to_string(),
            description: None,
            pass_percentage: 50,
            max_attempts,
            questions: vec![
                QuestionData {
                    text: "Pick the mutable borrow".to_string(),
                    options: vec!["&T".into(), "&mut T".into()],
                    correct: vec![1],
                    multiple: false,
                },
                QuestionData {
                    text: "Pick the smart pointers".to_string(),
                    options: vec!["Box".into(), "Rc".into(), "u8".into()],
                    correct: vec![0, 1],
                    multiple: true,
                },
            ],
        }
    }

    #[test]
    fn test_grade_requires_exact_option_set() {
        let questions = vec![question(3, &[0, 2], true), question(2, &[1], false)];
        let result = grade(&questions, &[vec![2, 0], vec![1]], 100).unwrap();
        assert_eq!(result.correct, 2);
        assert!(result.passed);

        let result = grade(&questions, &[vec![0], vec![1]], 60).unwrap();
        assert_eq!(result.correct, 1);
        assert_eq!(result.percentage, 50.0);
        assert!(!result.passed);

        assert!(grade(&questions, &[vec![0]], 50).is_err());
        assert!(grade(&questions, &[vec![0], vec![0, 1]], 50).is_err());
        assert!(grade(&questions, &[vec![5], vec![1]], 50).is_err());
    }

    #[test]
    fn test_invalid_quiz_definitions() {
        let db = test_db();
        db.with_conn(|conn| {
            let mut data = quiz_data(None);
            data.questions[0].correct = vec![0, 1];
            assert!(matches!(create(conn, &system(), &data), Err(RmpError::ValidationError(_))));
            let mut data = quiz_data(None);
            data.questions[1].correct = vec![3];
            assert!(create(conn, &system(), &data).is_err());
            let mut data = quiz_data(None);
            data.pass_percentage = 0;
            assert!(create(conn, &system(), &data).is_err());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_answers_hidden_from_employees() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, _) = seed_staff(conn)?;
            let created = create(conn, &system(), &quiz_data(None))?;
            assert!(created.questions[0].correct.is_some());
            let view = get(conn, &access_for(Role::Employee, Some(e[0])), created.quiz.id)?;
            assert!(view.questions.iter().all(|q| q.correct.is_none()));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_passing_completes_course_and_limits_attempts() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, _) = seed_staff(conn)?;
            let created = create(conn, &system(), &quiz_data(Some(2)))?;
            let quiz_id = created.quiz.id;
            let course = training::insert_course(
                conn,
                &CourseData {
                    title: "Ownership".to_string(),
                    provider: None,
                    duration_hours: None,
                    skill_id: None,
                    quiz_id: Some(quiz_id),
                },
            )?;
            training::insert_enrollment(conn, e[0], course, date("2024-01-01"))?;

            let me = access_for(Role::Employee, Some(e[0]));
            let failed = submit_attempt(
                conn,
                &me,
                quiz_id,
                &AttemptRequest {
                    employee_id: None,
                    answers: vec![vec![0], vec![2]],
                },
                date("2024-01-05"),
            )?;
            assert!(!failed.attempt.passed);
            assert!(failed.completed_courses.is_empty());

            let passed = submit_attempt(
                conn,
                &me,
                quiz_id,
                &AttemptRequest {
                    employee_id: None,
                    answers: vec![vec![1], vec![1, 0]],
                },
                date("2024-01-06"),
            )?;
            assert!(passed.attempt.passed);
            assert_eq!(passed.completed_courses, vec![course]);
            let enrollment = training::find_enrollment(conn, e[0], course)?.unwrap();
            assert_eq!(enrollment.status, EnrollmentStatus::Completed);

            assert!(matches!(
                submit_attempt(
                    conn,
                    &me,
                    quiz_id,
                    &AttemptRequest {
                        employee_id: None,
                        answers: vec![vec![1], vec![0, 1]],
                    },
                    date("2024-01-07"),
                ),
                Err(RmpError::Conflict(_))
            ));
            Ok(())
        })
        .unwrap();
    }
}
