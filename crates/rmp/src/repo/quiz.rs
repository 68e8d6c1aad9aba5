use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, named_params};
use serde::{Deserialize, Serialize};
use staffing::{AttemptId, EmployeeId, QuizId};

use crate::common::error::RmpError;
use crate::db::json_column;
use crate::repo::now;

#[derive(Debug, Clone, Serialize)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    pub description: Option<String>,
    pub pass_percentage: u8,
    pub max_attempts: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub position: u32,
    pub text: String,
    pub options: Vec<String>,
    /// Indices into `options`, sorted.
    pub correct: Vec<usize>,
    pub multiple: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionData {
    pub text: String,
    pub options: Vec<String>,
    pub correct: Vec<usize>,
    #[serde(default)]
    pub multiple: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizData {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub pass_percentage: u8,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    pub questions: Vec<QuestionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub quiz_id: QuizId,
    pub employee_id: EmployeeId,
    pub answers: Vec<Vec<usize>>,
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
    pub passed: bool,
    pub attempted_at: DateTime<Utc>,
}

/// Result of grading, stored by [`insert_attempt`].
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
    pub passed: bool,
}

fn quiz_from_row(row: &Row) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: QuizId::new(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        pass_percentage: row.get(3)?,
        max_attempts: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Inserts the quiz with its questions. Callers should run this in a transaction.
pub fn insert(conn: &Connection, data: &QuizData) -> crate::Result<QuizId> {
    conn.execute(
        "INSERT INTO quizzes (title, description, pass_percentage, max_attempts, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            data.title,
            data.description,
            data.pass_percentage,
            data.max_attempts,
            now()
        ],
    )?;
    let quiz_id = QuizId::new(conn.last_insert_rowid() as u32);
    let mut stmt = conn.prepare(
        "INSERT INTO quiz_questions (quiz_id, position, text, options, correct, multiple) \
         VALUES (:quiz_id, :position, :text, :options, :correct, :multiple)",
    )?;
    for (position, question) in data.questions.iter().enumerate() {
        let mut correct = question.correct.clone();
        correct.sort_unstable();
        correct.dedup();
        stmt.execute(named_params! {
            ":quiz_id": quiz_id.as_num(),
            ":position": position as u32,
            ":text": question.text,
            ":options": serde_json::to_string(&question.options)?,
            ":correct": serde_json::to_string(&correct)?,
            ":multiple": question.multiple,
        })?;
    }
    Ok(quiz_id)
}

pub fn get(conn: &Connection, id: QuizId) -> crate::Result<Quiz> {
    conn.query_row(
        "SELECT id, title, description, pass_percentage, max_attempts, created_at \
         FROM quizzes WHERE id = ?1",
        [id.as_num()],
        quiz_from_row,
    )
    .optional()?
    .ok_or_else(|| RmpError::not_found("Quiz", id))
}

pub fn list(conn: &Connection) -> crate::Result<Vec<Quiz>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, pass_percentage, max_attempts, created_at \
         FROM quizzes ORDER BY title",
    )?;
    let rows = stmt.query_map([], quiz_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn questions(conn: &Connection, quiz_id: QuizId) -> crate::Result<Vec<Question>> {
    let mut stmt = conn.prepare(
        "SELECT position, text, options, correct, multiple FROM quiz_questions \
         WHERE quiz_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map([quiz_id.as_num()], |row| {
        Ok(Question {
            position: row.get(0)?,
            text: row.get(1)?,
            options: json_column(row, 2)?,
            correct: json_column(row, 3)?,
            multiple: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn insert_attempt(
    conn: &Connection,
    quiz_id: QuizId,
    employee_id: EmployeeId,
    answers: &[Vec<usize>],
    grade: &Grade,
) -> crate::Result<AttemptId> {
    conn.execute(
        "INSERT INTO quiz_attempts (quiz_id, employee_id, answers, correct, total, percentage, \
         passed, attempted_at) \
         VALUES (:quiz_id, :employee_id, :answers, :correct, :total, :percentage, :passed, :now)",
        named_params! {
            ":quiz_id": quiz_id.as_num(),
            ":employee_id": employee_id.as_num(),
            ":answers": serde_json::to_string(answers)?,
            ":correct": grade.correct,
            ":total": grade.total,
            ":percentage": grade.percentage,
            ":passed": grade.passed,
            ":now": now(),
        },
    )?;
    Ok(AttemptId::new(conn.last_insert_rowid() as u32))
}

pub fn attempts(
    conn: &Connection,
    quiz_id: QuizId,
    employee_id: Option<EmployeeId>,
) -> crate::Result<Vec<Attempt>> {
    let mut stmt = conn.prepare(
        "SELECT id, quiz_id, employee_id, answers, correct, total, percentage, passed, \
         attempted_at FROM quiz_attempts \
         WHERE quiz_id = ?1 AND (?2 IS NULL OR employee_id = ?2) \
         ORDER BY attempted_at, id",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![quiz_id.as_num(), employee_id.map(|id| id.as_num())],
        |row| {
            Ok(Attempt {
                id: AttemptId::new(row.get(0)?),
                quiz_id: QuizId::new(row.get(1)?),
                employee_id: EmployeeId::new(row.get(2)?),
                answers: json_column(row, 3)?,
                correct: row.get(4)?,
                total: row.get(5)?,
                percentage: row.get(6)?,
                passed: row.get(7)?,
                attempted_at: row.get(8)?,
            })
        },
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn count_attempts(
    conn: &Connection,
    quiz_id: QuizId,
    employee_id: EmployeeId,
) -> crate::Result<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = ?1 AND employee_id = ?2",
        [quiz_id.as_num(), employee_id.as_num()],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::{Grade, QuestionData, QuizData};
    use crate::repo::quiz;
    use crate::tests::utils::{seed_staff, test_db};

    #[test]
    fn test_questions_keep_order_and_sorted_answers() {
        let db = test_db();
        db.with_conn(|conn| {
            let (employees, _) = seed_staff(conn)?;
            let id = quiz::insert(
                conn,
                &QuizData {
                    title: "Ownership".to_string(),
                    description: None,
                    pass_percentage: 50,
                    max_attempts: Some(2),
                    questions: vec![
                        QuestionData {
                            text: "Which types are Copy?".to_string(),
                            options: vec!["u32".into(), "String".into(), "bool".into()],
                            correct: vec![2, 0, 2],
                            multiple: true,
                        },
                        QuestionData {
                            text: "Is Vec<T> Send for T: Send?".to_string(),
                            options: vec!["yes".into(), "no".into()],
                            correct: vec![0],
                            multiple: false,
                        },
                    ],
                },
            )?;
            let questions = quiz::questions(conn, id)?;
            assert_eq!(questions.len(), 2);
            assert_eq!(questions[0].correct, vec![0, 2]);
            assert!(questions[0].multiple);

            let grade = Grade {
                correct: 1,
                total: 2,
                percentage: 50.0,
                passed: true,
            };
            quiz::insert_attempt(conn, id, employees[0], &[vec![0, 2], vec![1]], &grade)?;
            assert_eq!(quiz::count_attempts(conn, id, employees[0])?, 1);
            assert_eq!(quiz::count_attempts(conn, id, employees[1])?, 0);
            let attempts = quiz::attempts(conn, id, None)?;
            assert_eq!(attempts[0].answers, vec![vec![0, 2], vec![1]]);
            Ok(())
        })
        .unwrap();
    }
}
