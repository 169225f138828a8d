//! Collaborator contracts consumed by the session orchestrator.
//!
//! The analysis backend, the history store, the content viewer and the
//! credential source are all external to the session core. Each is modeled
//! as a trait so the orchestrator can be driven by the HTTP client, the local
//! SQLite store, or test doubles interchangeably.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    Answer, ContentItem, Credentials, DocumentRecord, HistoryRecord, JumpTarget, QuizQuestion,
    VideoLink, WebLink,
};

/// Message shown when neither the server nor the transport explains a failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Failure of a collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Structured failure payload carrying a server-supplied `error` message.
    #[error("{0}")]
    Server(String),
    /// Network or server failure without a usable structured payload.
    #[error("{0}")]
    Transport(String),
    /// Local persistence failure (offline history store).
    #[error("{0}")]
    Storage(String),
}

impl BackendError {
    /// Pick the most specific available message.
    ///
    /// Server `error` field first, then the transport message, then
    /// [`GENERIC_ERROR_MESSAGE`]. Blank strings count as absent.
    pub fn from_parts(server: Option<String>, transport: Option<String>) -> Self {
        if let Some(msg) = server.filter(|m| !m.trim().is_empty()) {
            return BackendError::Server(msg);
        }
        match transport.filter(|m| !m.trim().is_empty()) {
            Some(msg) => BackendError::Transport(msg),
            None => BackendError::Transport(GENERIC_ERROR_MESSAGE.to_string()),
        }
    }

    /// Text suitable for a banner or alert.
    pub fn user_message(&self) -> &str {
        let msg = match self {
            BackendError::Server(m) | BackendError::Transport(m) | BackendError::Storage(m) => m,
        };
        if msg.trim().is_empty() {
            GENERIC_ERROR_MESSAGE
        } else {
            msg
        }
    }
}

/// Ingestion, generation and Q&A endpoints of the analysis backend.
#[async_trait]
pub trait StudyBackend: Send + Sync {
    /// Upload a PDF for analysis.
    async fn submit_pdf(&self, creds: &Credentials, file: &Path)
        -> Result<ContentItem, BackendError>;

    /// Submit a YouTube URL for analysis.
    async fn submit_youtube(&self, creds: &Credentials, url: &str)
        -> Result<ContentItem, BackendError>;

    async fn generate_chapters(
        &self,
        creds: &Credentials,
        topic: &str,
        level: &str,
    ) -> Result<Vec<String>, BackendError>;

    async fn fetch_videos(
        &self,
        creds: &Credentials,
        topic: &str,
        level: &str,
        chapter: &str,
    ) -> Result<Vec<VideoLink>, BackendError>;

    async fn fetch_websites(
        &self,
        creds: &Credentials,
        topic: &str,
        level: &str,
        chapter: &str,
    ) -> Result<Vec<WebLink>, BackendError>;

    /// Ask a question grounded in an analyzed content item.
    async fn ask(
        &self,
        creds: &Credentials,
        content_id: &str,
        question: &str,
    ) -> Result<Answer, BackendError>;

    /// Generate multiple-choice questions for a set of videos.
    async fn generate_quiz(
        &self,
        creds: &Credentials,
        videos: &[VideoLink],
    ) -> Result<Vec<QuizQuestion>, BackendError>;
}

/// Keyed storage of past generation runs and analyzed documents.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn list_history(&self, creds: &Credentials) -> Result<Vec<HistoryRecord>, BackendError>;

    async fn delete_history(&self, creds: &Credentials, id: &str) -> Result<(), BackendError>;

    /// Persist a snapshot. Stores that write snapshots server-side keep the default.
    async fn record_history(
        &self,
        _creds: &Credentials,
        _record: &HistoryRecord,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    async fn list_documents(&self, creds: &Credentials)
        -> Result<Vec<DocumentRecord>, BackendError>;

    /// Remember an analyzed document. Server-side stores keep the default.
    async fn record_document(
        &self,
        _creds: &Credentials,
        _document: &DocumentRecord,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

/// External viewer (PDF renderer or video player). Fire-and-forget.
pub trait ContentViewer: Send + Sync {
    fn jump_to(&self, target: JumpTarget);
}

/// Source of the identity and CSRF tokens attached to every backend call.
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Credentials;
}

/// Credentials fixed at startup (CLI flags or environment).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Credentials);

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Credentials {
        self.0.clone()
    }
}
