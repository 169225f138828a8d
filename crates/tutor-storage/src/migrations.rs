//! Database schema migrations.
//!
//! Applies the history schema: generation snapshots, their chapters, and the
//! analyzed-documents list.

use rusqlite::Connection;
use tracing::info;

use tutor_core::error::TutorError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), TutorError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| TutorError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| TutorError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: history_schema");
    }

    Ok(())
}

/// Version 1: history snapshots and documents.
fn apply_v1(conn: &Connection) -> Result<(), TutorError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS history_records (
            id              TEXT PRIMARY KEY NOT NULL,
            topic           TEXT NOT NULL,
            level           TEXT NOT NULL,
            chapter_count   INTEGER NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_created_at
            ON history_records (created_at DESC);

        -- Resources are stored as JSON arrays; snapshots are never edited.
        CREATE TABLE IF NOT EXISTS history_chapters (
            record_id   TEXT NOT NULL
                        REFERENCES history_records (id) ON DELETE CASCADE,
            position    INTEGER NOT NULL,
            name        TEXT NOT NULL,
            videos      TEXT NOT NULL DEFAULT '[]',
            websites    TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (record_id, position)
        );

        CREATE TABLE IF NOT EXISTS documents (
            id          TEXT PRIMARY KEY NOT NULL,
            title       TEXT NOT NULL,
            kind        TEXT NOT NULL CHECK (kind IN ('pdf', 'youtube')),
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_created_at
            ON documents (created_at DESC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'history_schema');
        ",
    )
    .map_err(|e| TutorError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}
