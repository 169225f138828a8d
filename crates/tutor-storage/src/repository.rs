//! Repository implementations for SQLite-backed persistence.
//!
//! Provides HistoryRepository for chapter-generation snapshots and
//! DocumentRepository for the analyzed-documents list.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};

use tutor_core::error::TutorError;
use tutor_core::types::{ChapterResource, ContentKind, DocumentRecord, HistoryRecord};

use crate::db::Database;

/// Repository for chapter-generation snapshots.
pub struct HistoryRepository {
    db: Arc<Database>,
}

impl HistoryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a snapshot with all of its chapters.
    ///
    /// Snapshots are immutable: saving an id that already exists fails.
    pub fn save(&self, record: &HistoryRecord) -> Result<(), TutorError> {
        self.db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO history_records (id, topic, level, chapter_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record.id,
                    record.topic,
                    record.level,
                    record.chapter_count as i64,
                    record.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| TutorError::Storage(format!("Failed to save history record: {}", e)))?;

            for (position, chapter) in record.chapters.iter().enumerate() {
                let videos = serde_json::to_string(&chapter.videos)?;
                let websites = serde_json::to_string(&chapter.websites)?;
                tx.execute(
                    "INSERT INTO history_chapters (record_id, position, name, videos, websites)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![record.id, position as i64, chapter.name, videos, websites],
                )
                .map_err(|e| TutorError::Storage(format!("Failed to save chapter: {}", e)))?;
            }
            Ok(())
        })
    }

    /// All snapshots, newest first. Ties break on id so the order is stable.
    pub fn list(&self) -> Result<Vec<HistoryRecord>, TutorError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, topic, level, chapter_count, created_at
                     FROM history_records
                     ORDER BY created_at DESC, id ASC",
                )
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let mut records = Vec::new();
            for row in rows {
                let (id, topic, level, chapter_count, created_at) =
                    row.map_err(|e| TutorError::Storage(e.to_string()))?;
                let chapters = load_chapters(conn, &id)?;
                records.push(HistoryRecord {
                    id,
                    topic,
                    level,
                    chapter_count: chapter_count as usize,
                    created_at: from_millis(created_at)?,
                    chapters,
                });
            }
            Ok(records)
        })
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<HistoryRecord>, TutorError> {
        self.db.with_conn(|conn| {
            let header = conn
                .query_row(
                    "SELECT topic, level, chapter_count, created_at
                     FROM history_records WHERE id = ?1",
                    rusqlite::params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            match header {
                Some((topic, level, chapter_count, created_at)) => Ok(Some(HistoryRecord {
                    id: id.to_string(),
                    topic,
                    level,
                    chapter_count: chapter_count as usize,
                    created_at: from_millis(created_at)?,
                    chapters: load_chapters(conn, id)?,
                })),
                None => Ok(None),
            }
        })
    }

    /// Delete one snapshot. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool, TutorError> {
        self.db.with_conn(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM history_records WHERE id = ?1",
                    rusqlite::params![id],
                )
                .map_err(|e| TutorError::Storage(format!("Failed to delete history: {}", e)))?;
            Ok(removed > 0)
        })
    }

    pub fn count(&self) -> Result<u64, TutorError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM history_records", [], |row| row.get(0))
                .map_err(|e| TutorError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for previously analyzed documents.
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or refresh a document entry.
    pub fn save(&self, document: &DocumentRecord) -> Result<(), TutorError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, title, kind, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (id) DO UPDATE SET title = excluded.title",
                rusqlite::params![
                    document.id,
                    document.title,
                    document.kind.to_string(),
                    document.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| TutorError::Storage(format!("Failed to save document: {}", e)))?;
            Ok(())
        })
    }

    /// All documents, newest first.
    pub fn list(&self) -> Result<Vec<DocumentRecord>, TutorError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, kind, created_at FROM documents
                     ORDER BY created_at DESC, id ASC",
                )
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let mut documents = Vec::new();
            for row in rows {
                let (id, title, kind, created_at) =
                    row.map_err(|e| TutorError::Storage(e.to_string()))?;
                documents.push(DocumentRecord {
                    id,
                    title,
                    kind: parse_kind(&kind)?,
                    created_at: from_millis(created_at)?,
                });
            }
            Ok(documents)
        })
    }

    pub fn delete(&self, id: &str) -> Result<bool, TutorError> {
        self.db.with_conn(|conn| {
            let removed = conn
                .execute("DELETE FROM documents WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| TutorError::Storage(format!("Failed to delete document: {}", e)))?;
            Ok(removed > 0)
        })
    }
}

// =============================================================================
// Row helpers
// =============================================================================

fn load_chapters(conn: &Connection, record_id: &str) -> Result<Vec<ChapterResource>, TutorError> {
    let mut stmt = conn
        .prepare(
            "SELECT name, videos, websites FROM history_chapters
             WHERE record_id = ?1 ORDER BY position ASC",
        )
        .map_err(|e| TutorError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(rusqlite::params![record_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| TutorError::Storage(e.to_string()))?;

    let mut chapters = Vec::new();
    for row in rows {
        let (name, videos, websites) = row.map_err(|e| TutorError::Storage(e.to_string()))?;
        chapters.push(ChapterResource {
            name,
            videos: serde_json::from_str(&videos)?,
            websites: serde_json::from_str(&websites)?,
        });
    }
    Ok(chapters)
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, TutorError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| TutorError::Storage(format!("Invalid timestamp: {}", millis)))
}

fn parse_kind(kind: &str) -> Result<ContentKind, TutorError> {
    match kind {
        "pdf" => Ok(ContentKind::Pdf),
        "youtube" => Ok(ContentKind::Youtube),
        other => Err(TutorError::Storage(format!("Unknown document kind: {}", other))),
    }
}
