//! Scripted collaborators for orchestrator scenario tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use tutor_core::backend::{
    BackendError, ContentViewer, HistoryStore, StaticCredentials, StudyBackend,
};
use tutor_core::config::SessionConfig;
use tutor_core::types::{
    Answer, ContentItem, ContentKind, Credentials, DocumentRecord, HistoryRecord, JumpTarget,
    QuizQuestion, SourceRef, VideoLink, WebLink,
};
use tutor_session::SessionOrchestrator;

/// Holds a scripted call until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Fake backend and history store. Every call is logged by name.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    pub submit_result: Mutex<Option<Result<String, BackendError>>>,
    pub chapters: Mutex<Option<Result<Vec<String>, BackendError>>>,
    pub videos: Mutex<HashMap<String, Result<Vec<VideoLink>, BackendError>>>,
    pub websites: Mutex<HashMap<String, Result<Vec<WebLink>, BackendError>>>,
    pub answers: Mutex<HashMap<String, Result<Answer, BackendError>>>,
    pub quiz: Mutex<Option<Result<Vec<QuizQuestion>, BackendError>>>,
    pub history: Mutex<Vec<HistoryRecord>>,
    pub delete_error: Mutex<Option<BackendError>>,
    pub documents: Mutex<Vec<DocumentRecord>>,
    pub seen_credentials: Mutex<Vec<Credentials>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn network_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("record_"))
            .collect()
    }

    /// Hold the call named `key` until `release` is notified.
    pub fn gate(&self, key: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::clone(&gate));
        gate
    }

    async fn enter(&self, key: String, creds: &Credentials) {
        self.calls.lock().unwrap().push(key.clone());
        self.seen_credentials.lock().unwrap().push(creds.clone());
        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    pub fn set_submit(&self, result: Result<&str, BackendError>) {
        *self.submit_result.lock().unwrap() = Some(result.map(str::to_string));
    }

    pub fn set_chapters(&self, chapters: &[&str]) {
        *self.chapters.lock().unwrap() =
            Some(Ok(chapters.iter().map(|c| c.to_string()).collect()));
    }

    pub fn set_videos(&self, chapter: &str, result: Result<Vec<VideoLink>, BackendError>) {
        self.videos.lock().unwrap().insert(chapter.to_string(), result);
    }

    pub fn set_websites(&self, chapter: &str, result: Result<Vec<WebLink>, BackendError>) {
        self.websites
            .lock()
            .unwrap()
            .insert(chapter.to_string(), result);
    }

    pub fn set_answer(&self, question: &str, result: Result<Answer, BackendError>) {
        self.answers
            .lock()
            .unwrap()
            .insert(question.to_string(), result);
    }

    fn submit_outcome(&self, kind: ContentKind, source: SourceRef) -> Result<ContentItem, BackendError> {
        let result = self
            .submit_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok("content-1".to_string()));
        result.map(|id| ContentItem::new(id, kind, source))
    }
}

#[async_trait]
impl StudyBackend for FakeBackend {
    async fn submit_pdf(&self, creds: &Credentials, file: &Path) -> Result<ContentItem, BackendError> {
        self.enter("submit_pdf".to_string(), creds).await;
        self.submit_outcome(ContentKind::Pdf, SourceRef::File(file.to_path_buf()))
    }

    async fn submit_youtube(&self, creds: &Credentials, url: &str) -> Result<ContentItem, BackendError> {
        self.enter("submit_youtube".to_string(), creds).await;
        self.submit_outcome(ContentKind::Youtube, SourceRef::Url(url.to_string()))
    }

    async fn generate_chapters(
        &self,
        creds: &Credentials,
        topic: &str,
        _level: &str,
    ) -> Result<Vec<String>, BackendError> {
        self.enter(format!("chapters:{}", topic), creds).await;
        self.chapters
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_videos(
        &self,
        creds: &Credentials,
        _topic: &str,
        _level: &str,
        chapter: &str,
    ) -> Result<Vec<VideoLink>, BackendError> {
        self.enter(format!("videos:{}", chapter), creds).await;
        self.videos
            .lock()
            .unwrap()
            .get(chapter)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_websites(
        &self,
        creds: &Credentials,
        _topic: &str,
        _level: &str,
        chapter: &str,
    ) -> Result<Vec<WebLink>, BackendError> {
        self.enter(format!("websites:{}", chapter), creds).await;
        self.websites
            .lock()
            .unwrap()
            .get(chapter)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn ask(
        &self,
        creds: &Credentials,
        _content_id: &str,
        question: &str,
    ) -> Result<Answer, BackendError> {
        self.enter(format!("ask:{}", question), creds).await;
        self.answers
            .lock()
            .unwrap()
            .get(question)
            .cloned()
            .unwrap_or_else(|| {
                Ok(Answer {
                    answer: format!("answer to {}", question),
                    references: Vec::new(),
                })
            })
    }

    async fn generate_quiz(
        &self,
        creds: &Credentials,
        videos: &[VideoLink],
    ) -> Result<Vec<QuizQuestion>, BackendError> {
        self.enter(format!("quiz:{}", videos.len()), creds).await;
        self.quiz
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl HistoryStore for FakeBackend {
    async fn list_history(&self, creds: &Credentials) -> Result<Vec<HistoryRecord>, BackendError> {
        self.enter("list_history".to_string(), creds).await;
        Ok(self.history.lock().unwrap().clone())
    }

    async fn delete_history(&self, creds: &Credentials, id: &str) -> Result<(), BackendError> {
        self.enter(format!("delete_history:{}", id), creds).await;
        if let Some(err) = self.delete_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.history.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn record_history(
        &self,
        creds: &Credentials,
        record: &HistoryRecord,
    ) -> Result<(), BackendError> {
        self.enter("record_history".to_string(), creds).await;
        self.history.lock().unwrap().insert(0, record.clone());
        Ok(())
    }

    async fn list_documents(&self, creds: &Credentials) -> Result<Vec<DocumentRecord>, BackendError> {
        self.enter("list_documents".to_string(), creds).await;
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn record_document(
        &self,
        creds: &Credentials,
        document: &DocumentRecord,
    ) -> Result<(), BackendError> {
        self.enter("record_document".to_string(), creds).await;
        self.documents.lock().unwrap().insert(0, document.clone());
        Ok(())
    }
}

/// Viewer that remembers every jump.
#[derive(Default)]
pub struct RecordingViewer {
    pub jumps: Mutex<Vec<JumpTarget>>,
}

impl ContentViewer for RecordingViewer {
    fn jump_to(&self, target: JumpTarget) {
        self.jumps.lock().unwrap().push(target);
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub viewer: Arc<RecordingViewer>,
    pub session: SessionOrchestrator,
}

pub fn test_credentials() -> Credentials {
    Credentials {
        bearer_token: Some("uid-test".to_string()),
        csrf_token: Some("csrf-test".to_string()),
    }
}

pub fn harness() -> Harness {
    let backend = FakeBackend::new();
    let viewer = Arc::new(RecordingViewer::default());
    let session = SessionOrchestrator::new(
        backend.clone(),
        backend.clone(),
        viewer.clone(),
        Arc::new(StaticCredentials(test_credentials())),
        SessionConfig::default(),
    );
    Harness {
        backend,
        viewer,
        session,
    }
}

/// Analyze a YouTube video so questions can be asked.
pub async fn ready_session(h: &Harness) -> ContentItem {
    h.session.select_kind(ContentKind::Youtube).unwrap();
    h.session
        .stage_url("https://www.youtube.com/watch?v=abc123")
        .unwrap();
    h.session.submit().await.unwrap()
}

pub fn video(title: &str) -> VideoLink {
    VideoLink::new(title, format!("https://youtu.be/{}", title))
}

pub fn website(title: &str) -> WebLink {
    WebLink::new(title, format!("https://{}.example", title))
}
