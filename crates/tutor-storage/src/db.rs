//! SQLite handle for the local history store.
//!
//! A file database runs in WAL mode and waits on a busy timeout, so two tutor
//! processes sharing one history file queue up instead of failing. Schema
//! migrations run every time a handle is opened.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

use tutor_core::error::TutorError;

use crate::migrations;

/// How long a writer waits on another process's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;";

const MEMORY_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

fn storage_err(context: &'static str) -> impl Fn(rusqlite::Error) -> TutorError {
    move |e| TutorError::Storage(format!("{}: {}", context, e))
}

/// One shared connection. Callers borrow it through closures so the lock
/// never outlives a single statement batch.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the history file at `path`, creating parent directories.
    pub fn new(path: &Path) -> Result<Self, TutorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(storage_err("cannot open history database"))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(storage_err("cannot set busy timeout"))?;
        let db = Self::prepare(conn, FILE_PRAGMAS)?;
        info!(path = %path.display(), "History database ready");
        Ok(db)
    }

    /// Private database that disappears with the handle.
    pub fn in_memory() -> Result<Self, TutorError> {
        let conn =
            Connection::open_in_memory().map_err(storage_err("cannot open in-memory database"))?;
        Self::prepare(conn, MEMORY_PRAGMAS)
    }

    fn prepare(conn: Connection, pragmas: &str) -> Result<Self, TutorError> {
        conn.execute_batch(pragmas)
            .map_err(storage_err("cannot configure connection"))?;
        migrations::run_migrations(&conn)?;
        debug!("History schema up to date");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TutorError> {
        self.conn
            .lock()
            .map_err(|_| TutorError::Storage("history database lock poisoned".to_string()))
    }

    /// Run `f` against the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, TutorError>
    where
        F: FnOnce(&Connection) -> Result<T, TutorError>,
    {
        f(&*self.lock()?)
    }

    /// Run `f` in a transaction. An `Err` from `f` rolls everything back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, TutorError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, TutorError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(storage_err("cannot begin transaction"))?;
        let value = f(&tx)?;
        tx.commit().map_err(storage_err("cannot commit transaction"))?;
        Ok(value)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
