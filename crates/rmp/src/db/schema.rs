//! Schema migrations.
//!
//! The `schema_version` table stores how many entries of [`MIGRATIONS`] were
//! applied. New schema changes are appended as a new entry, existing entries
//! are never edited.

use rusqlite::{Connection, OptionalExtension};

use crate::common::error::RmpError;

const MIGRATIONS: &[&str] = &[
    // 1: people, projects and staffing
    r#"
    CREATE TABLE employees (
        id INTEGER PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        designation TEXT,
        department TEXT,
        location TEXT,
        manager_id INTEGER REFERENCES employees(id) ON DELETE SET NULL,
        joined_on TEXT,
        exit_date TEXT,
        capacity INTEGER NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE projects (
        id INTEGER PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        client TEXT,
        status TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT,
        manager_id INTEGER REFERENCES employees(id) ON DELETE SET NULL,
        billable INTEGER NOT NULL DEFAULT 1,
        description TEXT,
        zoho_project_id TEXT UNIQUE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE allocations (
        id INTEGER PRIMARY KEY,
        employee_id INTEGER NOT NULL REFERENCES employees(id),
        project_id INTEGER NOT NULL REFERENCES projects(id),
        start_date TEXT NOT NULL,
        end_date TEXT,
        fte INTEGER NOT NULL,
        billable INTEGER NOT NULL,
        role TEXT,
        status TEXT NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX allocations_employee ON allocations(employee_id);
    CREATE INDEX allocations_project ON allocations(project_id);

    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL,
        employee_id INTEGER REFERENCES employees(id) ON DELETE SET NULL,
        token_hash TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    );

    CREATE TABLE role_permissions (
        role TEXT NOT NULL,
        module TEXT NOT NULL,
        actions INTEGER NOT NULL,
        PRIMARY KEY (role, module)
    );

    CREATE TABLE audit_log (
        id INTEGER PRIMARY KEY,
        at TEXT NOT NULL,
        user_id INTEGER,
        module TEXT NOT NULL,
        action TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        detail TEXT
    );
    "#,
    // 2: skills, training and quizzes
    r#"
    CREATE TABLE skills (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        category TEXT
    );

    CREATE TABLE employee_skills (
        employee_id INTEGER NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
        skill_id INTEGER NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
        proficiency INTEGER NOT NULL CHECK (proficiency BETWEEN 1 AND 5),
        years_experience REAL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (employee_id, skill_id)
    );

    CREATE TABLE quizzes (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        pass_percentage INTEGER NOT NULL,
        max_attempts INTEGER,
        created_at TEXT NOT NULL
    );

    CREATE TABLE quiz_questions (
        id INTEGER PRIMARY KEY,
        quiz_id INTEGER NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        options TEXT NOT NULL,
        correct TEXT NOT NULL,
        multiple INTEGER NOT NULL
    );

    CREATE TABLE quiz_attempts (
        id INTEGER PRIMARY KEY,
        quiz_id INTEGER NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
        employee_id INTEGER NOT NULL REFERENCES employees(id),
        answers TEXT NOT NULL,
        correct INTEGER NOT NULL,
        total INTEGER NOT NULL,
        percentage REAL NOT NULL,
        passed INTEGER NOT NULL,
        attempted_at TEXT NOT NULL
    );

    CREATE TABLE courses (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        provider TEXT,
        duration_hours REAL,
        skill_id INTEGER REFERENCES skills(id) ON DELETE SET NULL,
        quiz_id INTEGER REFERENCES quizzes(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE enrollments (
        id INTEGER PRIMARY KEY,
        employee_id INTEGER NOT NULL REFERENCES employees(id),
        course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        progress INTEGER NOT NULL DEFAULT 0,
        enrolled_on TEXT NOT NULL,
        completed_on TEXT,
        UNIQUE (employee_id, course_id)
    );

    CREATE TABLE certifications (
        id INTEGER PRIMARY KEY,
        employee_id INTEGER NOT NULL REFERENCES employees(id),
        name TEXT NOT NULL,
        issuer TEXT,
        issued_on TEXT NOT NULL,
        expires_on TEXT,
        credential_id TEXT
    );
    CREATE INDEX certifications_expiry ON certifications(expires_on);
    "#,
];

pub fn current_version() -> u32 {
    MIGRATIONS.len() as u32
}

pub fn migrate(conn: &mut Connection) -> crate::Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")?;
    let version: u32 = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()?
        .unwrap_or(0);

    if version > current_version() {
        return Err(RmpError::GenericError(format!(
            "Database schema version {version} is newer than supported version {}",
            current_version()
        )));
    }

    for (index, migration) in MIGRATIONS.iter().enumerate().skip(version as usize) {
        let target = index as u32 + 1;
        log::debug!("Migrating database schema to version {target}");
        let tx = conn.transaction()?;
        tx.execute_batch(migration)?;
        tx.execute("DELETE FROM schema_version", [])?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [target])?;
        tx.commit()?;
    }
    Ok(())
}
