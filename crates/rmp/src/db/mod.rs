//! SQLite storage.
//!
//! The whole application shares one connection guarded by a mutex. Async
//! code hands closures to [`Database::call`], which runs them on the
//! blocking thread pool so that rusqlite never blocks the runtime.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction};

use crate::common::error::RmpError;

pub mod schema;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> crate::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        if !journal_mode.eq_ignore_ascii_case("wal") {
            log::warn!("Database {} runs in `{journal_mode}` journal mode", path.display());
        }
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        log::info!("Opened database {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> crate::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> crate::Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::migrate(&mut conn)?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with exclusive access to the connection on the current thread.
    pub fn with_conn<T, F>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&mut Connection) -> crate::Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| RmpError::GenericError("Database connection was poisoned".to_string()))?;
        f(&mut conn)
    }

    pub async fn call<T, F>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&mut Connection) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f)).await?
    }

    /// Runs `f` inside a transaction that is committed only when `f` succeeds.
    pub async fn transaction<T, F>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&Transaction) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.call(move |conn| in_transaction(conn, f)).await
    }
}

pub fn in_transaction<T, F>(conn: &mut Connection, f: F) -> crate::Result<T>
where
    F: FnOnce(&Transaction) -> crate::Result<T>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Reads a text column and parses it with `FromStr`.
pub(crate) fn parse_column<T>(row: &Row, index: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(index)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// Reads a JSON encoded text column.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &Row,
    index: usize,
) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}
