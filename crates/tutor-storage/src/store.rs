//! Local history store.
//!
//! Serves the generation history and document list from SQLite so the client
//! can run without the backend's history endpoints. Credentials are ignored:
//! the local database belongs to one user.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use tutor_core::backend::{BackendError, HistoryStore};
use tutor_core::error::TutorError;
use tutor_core::types::{Credentials, DocumentRecord, HistoryRecord};

use crate::db::Database;
use crate::repository::{DocumentRepository, HistoryRepository};

/// [`HistoryStore`] backed by the local SQLite database.
pub struct SqliteHistoryStore {
    history: HistoryRepository,
    documents: DocumentRepository,
}

impl SqliteHistoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            history: HistoryRepository::new(Arc::clone(&db)),
            documents: DocumentRepository::new(db),
        }
    }
}

fn storage_error(err: TutorError) -> BackendError {
    BackendError::Storage(err.to_string())
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn list_history(&self, _creds: &Credentials) -> Result<Vec<HistoryRecord>, BackendError> {
        let records = self.history.list().map_err(storage_error)?;
        debug!(count = records.len(), "Loaded local history");
        Ok(records)
    }

    async fn delete_history(&self, _creds: &Credentials, id: &str) -> Result<(), BackendError> {
        if self.history.delete(id).map_err(storage_error)? {
            info!(id = %id, "Deleted history record");
            Ok(())
        } else {
            Err(BackendError::Storage(format!(
                "History record not found: {}",
                id
            )))
        }
    }

    async fn record_history(
        &self,
        _creds: &Credentials,
        record: &HistoryRecord,
    ) -> Result<(), BackendError> {
        self.history.save(record).map_err(storage_error)?;
        info!(
            id = %record.id,
            topic = %record.topic,
            chapters = record.chapter_count,
            "Recorded history snapshot"
        );
        Ok(())
    }

    async fn list_documents(
        &self,
        _creds: &Credentials,
    ) -> Result<Vec<DocumentRecord>, BackendError> {
        self.documents.list().map_err(storage_error)
    }

    async fn record_document(
        &self,
        _creds: &Credentials,
        document: &DocumentRecord,
    ) -> Result<(), BackendError> {
        self.documents.save(document).map_err(storage_error)?;
        debug!(id = %document.id, kind = %document.kind, "Recorded document");
        Ok(())
    }
}
