//! Session orchestrator: drives one scan from submission to Q&A, and the
//! chapter/resource views alongside it.
//!
//! All state lives behind one mutex that is never held across an await.
//! Results of network calls are published only if they are still current:
//! asks and submits check the scan epoch, chapter requests check the
//! expander ticket. Anything else is dropped as stale.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use tutor_core::backend::{ContentViewer, CredentialProvider, HistoryStore, StudyBackend};
use tutor_core::config::SessionConfig;
use tutor_core::types::{
    Answer, ChapterOutline, ChapterResource, Citation, CitationLocation, ContentItem, ContentKind,
    ConversationMessage, DocumentRecord, HistoryRecord, JumpTarget, QuizQuestion,
    ResourceBundle, SourceRef,
};

use crate::citation;
use crate::conversation::Conversation;
use crate::error::SessionError;
use crate::expander::{Expander, ExpanderView, Stage};
use crate::history::HistoryList;
use crate::input::{ScanInput, StagedInput};
use crate::state_machine::{validate_transition, ScanState};

pub const BLANK_QUESTION_MESSAGE: &str = "Question cannot be blank";
pub const NO_CONTENT_MESSAGE: &str = "Analyze a PDF or YouTube video before asking questions.";
pub const TOPIC_LEVEL_MESSAGE: &str = "Please fill in both the topic and level.";
pub const BLANK_CHAPTER_MESSAGE: &str = "Chapter cannot be blank";
pub const BLANK_TOPIC_MESSAGE: &str = "Topic cannot be blank";
pub const BLANK_LEVEL_MESSAGE: &str = "Level cannot be blank";
pub const HISTORY_NOT_FOUND_MESSAGE: &str = "History record not found.";
const FORM_CLOSED_MESSAGE: &str = "Start a new scan to change the input.";
const REPLAY_ACTIVE_MESSAGE: &str = "Leave the history view before fetching new resources.";
const NO_OUTLINE_MESSAGE: &str = "Generate chapters before saving them.";
const EMPTY_OUTLINE_MESSAGE: &str = "There are no chapters to save.";
const NO_VIDEOS_MESSAGE: &str = "Open a chapter with videos before generating a quiz.";

/// Mutable session state. Guarded by the orchestrator's mutex.
struct SessionState {
    scan: ScanState,
    input: StagedInput,
    content: Option<ContentItem>,
    conversation: Conversation,
    /// Session-level message for failed submissions.
    banner: Option<String>,
    /// Inline message next to the scan form.
    form_error: Option<String>,
    /// Bumped whenever the active content item changes or is cleared.
    epoch: u64,
    expander: Expander,
    history: HistoryList,
}

impl SessionState {
    fn new() -> Self {
        let input = StagedInput::default();
        Self {
            scan: ScanState::Idle,
            conversation: Conversation::new(input.kind),
            input,
            content: None,
            banner: None,
            form_error: None,
            epoch: 0,
            expander: Expander::new(),
            history: HistoryList::new(),
        }
    }
}

/// Cloneable view of the whole session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: ScanState,
    pub input: StagedInput,
    pub content: Option<ContentItem>,
    pub messages: Vec<ConversationMessage>,
    pub banner: Option<String>,
    pub form_error: Option<String>,
    pub expander: ExpanderView,
    pub history: Vec<HistoryRecord>,
}

/// Coordinates ingestion, conversation, chapter expansion and history replay.
pub struct SessionOrchestrator {
    backend: Arc<dyn StudyBackend>,
    store: Arc<dyn HistoryStore>,
    viewer: Arc<dyn ContentViewer>,
    credentials: Arc<dyn CredentialProvider>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

fn show_inline(expander: &mut Expander, err: &SessionError) {
    if let Some(message) = err.user_message() {
        expander.set_error(message);
    }
}

impl SessionOrchestrator {
    pub fn new(
        backend: Arc<dyn StudyBackend>,
        store: Arc<dyn HistoryStore>,
        viewer: Arc<dyn ContentViewer>,
        credentials: Arc<dyn CredentialProvider>,
        config: SessionConfig,
    ) -> Self {
        Self {
            backend,
            store,
            viewer,
            credentials,
            config,
            state: Mutex::new(SessionState::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, SessionError> {
        self.state
            .lock()
            .map_err(|e| SessionError::Internal(format!("session lock poisoned: {}", e)))
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let s = self.lock()?;
        Ok(SessionSnapshot {
            state: s.scan,
            input: s.input.clone(),
            content: s.content.clone(),
            messages: s.conversation.messages().to_vec(),
            banner: s.banner.clone(),
            form_error: s.form_error.clone(),
            expander: s.expander.view(),
            history: s.history.records().to_vec(),
        })
    }

    // =========================================================================
    // Scan form
    // =========================================================================

    /// Choose PDF or YouTube. Discards whatever was entered for the other kind.
    pub fn select_kind(&self, kind: ContentKind) -> Result<(), SessionError> {
        let mut s = self.lock()?;
        if !s.scan.form_open() {
            return Err(SessionError::Validation(FORM_CLOSED_MESSAGE.to_string()));
        }
        s.input.select_kind(kind);
        s.form_error = None;
        Ok(())
    }

    pub fn stage_file(&self, file: impl Into<PathBuf>) -> Result<(), SessionError> {
        let mut s = self.lock()?;
        if !s.scan.form_open() {
            return Err(SessionError::Validation(FORM_CLOSED_MESSAGE.to_string()));
        }
        s.input.set_file(file.into());
        s.form_error = None;
        Ok(())
    }

    pub fn stage_url(&self, url: &str) -> Result<(), SessionError> {
        let mut s = self.lock()?;
        if !s.scan.form_open() {
            return Err(SessionError::Validation(FORM_CLOSED_MESSAGE.to_string()));
        }
        s.input.set_url(url);
        s.form_error = None;
        Ok(())
    }

    /// Submit the staged input for analysis.
    ///
    /// Blank input fails before any network call. On success the new item
    /// becomes active and the conversation restarts with a greeting.
    pub async fn submit(&self) -> Result<ContentItem, SessionError> {
        let (input, epoch) = {
            let mut s = self.lock()?;
            validate_transition(s.scan, ScanState::Submitting)?;
            let input = match s.input.to_input() {
                Ok(input) => input,
                Err(err) => {
                    s.form_error = err.user_message();
                    return Err(err);
                }
            };
            s.scan = ScanState::Submitting;
            s.form_error = None;
            s.banner = None;
            (input, s.epoch)
        };

        info!(kind = %input.kind(), "Submitting content for analysis");
        let creds = self.credentials.credentials();
        let result = match &input {
            ScanInput::Pdf(path) => self.backend.submit_pdf(&creds, path).await,
            ScanInput::Youtube(url) => self.backend.submit_youtube(&creds, url).await,
        };

        let item = {
            let mut s = self.lock()?;
            if s.epoch != epoch {
                warn!("Discarding ingestion result for a replaced scan");
                return Err(SessionError::StaleResultDiscarded);
            }
            match result {
                Ok(item) => {
                    validate_transition(s.scan, ScanState::Ready)?;
                    s.scan = ScanState::Ready;
                    s.epoch += 1;
                    s.conversation.reset(item.kind);
                    s.expander.clear_bundle();
                    s.content = Some(item.clone());
                    item
                }
                Err(err) => {
                    let err = SessionError::from(err);
                    validate_transition(s.scan, ScanState::Error)?;
                    s.scan = ScanState::Error;
                    s.banner = err.user_message();
                    warn!(error = %err, "Ingestion failed");
                    return Err(err);
                }
            }
        };

        info!(content_id = %item.id, kind = %item.kind, "Content ready");

        let document = DocumentRecord {
            id: item.id.clone(),
            title: item.display_name(),
            kind: item.kind,
            created_at: item.created_at,
        };
        if let Err(e) = self.store.record_document(&creds, &document).await {
            warn!(error = %e, "Failed to record analyzed document");
        }

        Ok(item)
    }

    /// Dismiss a failed submission and reopen the form.
    pub fn acknowledge_error(&self) -> Result<(), SessionError> {
        let mut s = self.lock()?;
        if s.scan != ScanState::Error {
            return Err(SessionError::InvalidTransition(s.scan, ScanState::Idle));
        }
        s.scan = ScanState::Idle;
        s.banner = None;
        Ok(())
    }

    /// Full reset: drops the active item, conversation, outline and bundle.
    ///
    /// In-flight submits, asks and expansions are discarded when they land.
    pub fn new_scan(&self) -> Result<(), SessionError> {
        let mut s = self.lock()?;
        if s.scan != ScanState::Idle {
            validate_transition(s.scan, ScanState::Idle)?;
        }
        s.scan = ScanState::Idle;
        s.epoch += 1;
        s.content = None;
        s.input.clear();
        let kind = s.input.kind;
        s.conversation.reset(kind);
        s.expander.clear();
        s.banner = None;
        s.form_error = None;
        info!("Session reset for a new scan");
        Ok(())
    }

    // =========================================================================
    // Conversation
    // =========================================================================

    /// Ask a question about the active item.
    ///
    /// The question is appended before the request goes out. The answer and
    /// its references are appended when the request completes, in completion
    /// order if several are in flight.
    pub async fn ask(&self, question: &str) -> Result<Answer, SessionError> {
        let text = question.trim();
        if text.is_empty() {
            return Err(SessionError::Validation(BLANK_QUESTION_MESSAGE.to_string()));
        }
        if text.chars().count() > self.config.max_question_length {
            return Err(SessionError::Validation(format!(
                "Question exceeds maximum length of {} characters.",
                self.config.max_question_length
            )));
        }

        let (question_id, content_id, epoch) = {
            let mut s = self.lock()?;
            let content_id = s
                .content
                .as_ref()
                .map(|c| c.id.clone())
                .ok_or_else(|| SessionError::Validation(NO_CONTENT_MESSAGE.to_string()))?;
            let question_id = s.conversation.push_user(text);
            (question_id, content_id, s.epoch)
        };

        debug!(question = %question_id, content_id = %content_id, "Asking question");
        let creds = self.credentials.credentials();
        let result = self.backend.ask(&creds, &content_id, text).await;

        let mut s = self.lock()?;
        if s.epoch != epoch {
            warn!(question = %question_id, "Discarding answer for a replaced content item");
            return Err(SessionError::StaleResultDiscarded);
        }
        match result {
            Ok(answer) => {
                debug!(
                    question = %question_id,
                    references = answer.references.len(),
                    "Answer received"
                );
                s.conversation.push_answer(question_id, answer.clone());
                Ok(answer)
            }
            Err(err) => {
                warn!(question = %question_id, error = %err, "Question failed");
                s.conversation.push_error(question_id);
                Err(err.into())
            }
        }
    }

    /// Move the external viewer to the citation's location.
    pub fn jump_to_citation(&self, citation: &Citation) -> Result<JumpTarget, SessionError> {
        let target = citation::resolve(citation)?;
        debug!(chunk_id = %citation.chunk_id, ?target, "Jumping to citation");
        self.viewer.jump_to(target);
        Ok(target)
    }

    /// Shareable timestamp link for a citation into the active YouTube video.
    pub fn citation_link(&self, citation: &Citation) -> Result<String, SessionError> {
        let source = {
            let s = self.lock()?;
            match s.content.as_ref().map(|c| &c.source) {
                Some(SourceRef::Url(url)) => url.clone(),
                _ => {
                    return Err(SessionError::Validation(
                        "Links are only available for YouTube videos.".to_string(),
                    ))
                }
            }
        };
        if !matches!(citation.location, CitationLocation::Timestamp { .. }) {
            return Err(SessionError::Validation(
                "Citation does not point to a timestamp.".to_string(),
            ));
        }
        let seconds = match citation::resolve(citation)? {
            JumpTarget::Seek { seconds } => seconds,
            JumpTarget::PageIndex(_) => 0,
        };
        citation::timestamp_url(&source, seconds).ok_or_else(|| {
            SessionError::Validation(format!("Could not find a video id in {}", source))
        })
    }

    // =========================================================================
    // Chapters and resources
    // =========================================================================

    /// Generate the chapter outline for a topic and level.
    pub async fn generate_chapters(
        &self,
        topic: &str,
        level: &str,
    ) -> Result<ChapterOutline, SessionError> {
        let (topic, level) = (topic.trim(), level.trim());
        let ticket = {
            let mut s = self.lock()?;
            if topic.is_empty() || level.is_empty() {
                let err = SessionError::Validation(TOPIC_LEVEL_MESSAGE.to_string());
                show_inline(&mut s.expander, &err);
                return Err(err);
            }
            s.expander.begin(Stage::Outline)
        };

        debug!(topic = %topic, level = %level, "Generating chapters");
        let creds = self.credentials.credentials();
        let result = self.backend.generate_chapters(&creds, topic, level).await;

        let mut s = self.lock()?;
        if !s.expander.is_current(ticket) {
            warn!(topic = %topic, "Discarding superseded chapter outline");
            return Err(SessionError::StaleResultDiscarded);
        }
        s.expander.finish(ticket);
        match result {
            Ok(chapters) => {
                let outline = ChapterOutline {
                    topic: topic.to_string(),
                    level: level.to_string(),
                    chapters,
                };
                info!(topic = %topic, chapters = outline.chapters.len(), "Chapters generated");
                s.expander.set_outline(outline.clone());
                Ok(outline)
            }
            Err(err) => {
                let err = SessionError::from(err);
                warn!(error = %err, "Chapter generation failed");
                show_inline(&mut s.expander, &err);
                Err(err)
            }
        }
    }

    /// Fetch videos then websites for one chapter and display them.
    ///
    /// A failed video fetch leaves the videos empty and still fetches
    /// websites. A failed website fetch clears the bundle. Both failures
    /// land in the shared error slot.
    pub async fn expand_chapter(
        &self,
        topic: &str,
        level: &str,
        chapter: &str,
    ) -> Result<ResourceBundle, SessionError> {
        let (topic, level, chapter) = (topic.trim(), level.trim(), chapter.trim());
        let ticket = {
            let mut s = self.lock()?;
            let invalid = if chapter.is_empty() {
                Some(BLANK_CHAPTER_MESSAGE)
            } else if topic.is_empty() {
                Some(BLANK_TOPIC_MESSAGE)
            } else if level.is_empty() {
                Some(BLANK_LEVEL_MESSAGE)
            } else if s.expander.from_history() {
                Some(REPLAY_ACTIVE_MESSAGE)
            } else {
                None
            };
            if let Some(message) = invalid {
                let err = SessionError::Validation(message.to_string());
                show_inline(&mut s.expander, &err);
                return Err(err);
            }
            s.expander.begin(Stage::Expansion)
        };

        debug!(topic = %topic, chapter = %chapter, "Fetching chapter resources");
        let creds = self.credentials.credentials();
        let videos_result = self.backend.fetch_videos(&creds, topic, level, chapter).await;

        let videos = {
            let mut s = self.lock()?;
            if !s.expander.is_current(ticket) {
                warn!(chapter = %chapter, "Discarding superseded video results");
                return Err(SessionError::StaleResultDiscarded);
            }
            match videos_result {
                Ok(videos) => videos,
                Err(err) => {
                    let err = SessionError::from(err);
                    warn!(chapter = %chapter, error = %err, "Video fetch failed");
                    show_inline(&mut s.expander, &err);
                    Vec::new()
                }
            }
        };

        let websites_result = self.backend.fetch_websites(&creds, topic, level, chapter).await;

        let mut s = self.lock()?;
        if !s.expander.is_current(ticket) {
            warn!(chapter = %chapter, "Discarding superseded website results");
            return Err(SessionError::StaleResultDiscarded);
        }
        s.expander.finish(ticket);
        match websites_result {
            Ok(websites) => {
                let bundle = ResourceBundle {
                    chapter_name: chapter.to_string(),
                    videos,
                    websites,
                };
                info!(
                    chapter = %chapter,
                    videos = bundle.videos.len(),
                    websites = bundle.websites.len(),
                    "Chapter resources loaded"
                );
                s.expander.set_bundle(Some(bundle.clone()));
                Ok(bundle)
            }
            Err(err) => {
                let err = SessionError::from(err);
                warn!(chapter = %chapter, error = %err, "Website fetch failed");
                s.expander.set_bundle(None);
                show_inline(&mut s.expander, &err);
                Err(err)
            }
        }
    }

    /// Open a chapter of the displayed outline, from history when replaying
    /// and from the backend otherwise.
    pub async fn click_chapter(&self, chapter: &str) -> Result<ResourceBundle, SessionError> {
        let (topic, level) = {
            let mut s = self.lock()?;
            if chapter.trim().is_empty() {
                let err = SessionError::Validation(BLANK_CHAPTER_MESSAGE.to_string());
                show_inline(&mut s.expander, &err);
                return Err(err);
            }
            if s.expander.from_history() {
                debug!(chapter = %chapter, "Replaying chapter from history");
                return s.expander.replay_chapter(chapter);
            }
            s.expander
                .outline()
                .map(|o| (o.topic.clone(), o.level.clone()))
                .unwrap_or_default()
        };
        self.expand_chapter(&topic, &level, chapter).await
    }

    /// Expand every chapter of the live outline and store the result as one
    /// history record. Failures land in the shared error slot.
    pub async fn snapshot_outline(&self) -> Result<HistoryRecord, SessionError> {
        let (outline, ticket) = {
            let mut s = self.lock()?;
            let outline = if s.expander.from_history() {
                Err(SessionError::Validation(
                    "Replayed chapters are already in history.".to_string(),
                ))
            } else {
                match s.expander.outline() {
                    None => Err(SessionError::Validation(NO_OUTLINE_MESSAGE.to_string())),
                    Some(o) if o.chapters.is_empty() => {
                        Err(SessionError::Validation(EMPTY_OUTLINE_MESSAGE.to_string()))
                    }
                    Some(o) => Ok(o.clone()),
                }
            };
            match outline {
                Ok(outline) => (outline, s.expander.begin(Stage::Snapshot)),
                Err(err) => {
                    show_inline(&mut s.expander, &err);
                    return Err(err);
                }
            }
        };

        let result = self.record_snapshot(outline).await;

        let mut s = self.lock()?;
        s.expander.finish(ticket);
        match result {
            Ok(record) => {
                s.history.add(record.clone());
                info!(
                    id = %record.id,
                    topic = %record.topic,
                    chapters = record.chapter_count,
                    "Saved chapter snapshot"
                );
                Ok(record)
            }
            Err(err) => {
                warn!(error = %err, "Chapter snapshot failed");
                show_inline(&mut s.expander, &err);
                Err(err)
            }
        }
    }

    async fn record_snapshot(&self, outline: ChapterOutline) -> Result<HistoryRecord, SessionError> {
        let creds = self.credentials.credentials();
        let mut chapters = Vec::with_capacity(outline.chapters.len());
        for name in &outline.chapters {
            let videos = self
                .backend
                .fetch_videos(&creds, &outline.topic, &outline.level, name)
                .await?;
            let websites = self
                .backend
                .fetch_websites(&creds, &outline.topic, &outline.level, name)
                .await?;
            chapters.push(ChapterResource {
                name: name.clone(),
                videos,
                websites,
            });
        }

        let record = HistoryRecord::snapshot(outline.topic, outline.level, chapters);
        self.store.record_history(&creds, &record).await?;
        Ok(record)
    }

    /// Quiz on the videos of the displayed bundle.
    pub async fn generate_quiz(&self) -> Result<Vec<QuizQuestion>, SessionError> {
        let videos = {
            let s = self.lock()?;
            s.expander
                .bundle()
                .map(|b| b.videos.clone())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SessionError::Validation(NO_VIDEOS_MESSAGE.to_string()))?
        };

        let creds = self.credentials.credentials();
        match self.backend.generate_quiz(&creds, &videos).await {
            Ok(questions) => {
                info!(questions = questions.len(), "Quiz generated");
                Ok(questions)
            }
            Err(err) => {
                let err = SessionError::from(err);
                warn!(error = %err, "Quiz generation failed");
                show_inline(&mut self.lock()?.expander, &err);
                Err(err)
            }
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Load the history list from the store, replacing the in-memory copy.
    pub async fn load_history(&self) -> Result<Vec<HistoryRecord>, SessionError> {
        let creds = self.credentials.credentials();
        let records = self.store.list_history(&creds).await?;
        debug!(count = records.len(), "History loaded");
        self.lock()?.history.replace_all(records.clone());
        Ok(records)
    }

    /// Show a stored record's chapters. Makes no network call.
    pub fn select_from_history(&self, id: &str) -> Result<ChapterOutline, SessionError> {
        let mut s = self.lock()?;
        let record = s
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(HISTORY_NOT_FOUND_MESSAGE.to_string()))?;
        let outline = record.outline();
        s.expander.load_replay(record);
        info!(id = %id, chapters = outline.chapters.len(), "Replaying history record");
        Ok(outline)
    }

    /// Delete one history record. Does nothing unless `confirmed`.
    ///
    /// The in-memory list loses the record only after the store succeeds. A
    /// replay view of the deleted record stays on screen.
    pub async fn delete_history(&self, id: &str, confirmed: bool) -> Result<bool, SessionError> {
        if !confirmed {
            debug!(id = %id, "History deletion not confirmed");
            return Ok(false);
        }
        let creds = self.credentials.credentials();
        if let Err(err) = self.store.delete_history(&creds, id).await {
            warn!(id = %id, error = %err, "History deletion failed");
            return Err(err.into());
        }
        self.lock()?.history.remove(id);
        info!(id = %id, "History record deleted");
        Ok(true)
    }

    /// Previously analyzed documents and videos.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, SessionError> {
        let creds = self.credentials.credentials();
        Ok(self.store.list_documents(&creds).await?)
    }
}
