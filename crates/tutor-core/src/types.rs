use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// The kind of content submitted for analysis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// An uploaded PDF document.
    #[default]
    Pdf,
    /// A YouTube video referenced by URL.
    Youtube,
}

impl ContentKind {
    /// Human-readable noun used in greetings and listings.
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Pdf => "PDF document",
            ContentKind::Youtube => "YouTube video",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Pdf => write!(f, "pdf"),
            ContentKind::Youtube => write!(f, "youtube"),
        }
    }
}

/// Where a content item came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRef {
    /// Local file handed to the ingestion endpoint.
    File(PathBuf),
    /// Remote URL (YouTube).
    Url(String),
}

// =============================================================================
// Content
// =============================================================================

/// Server-recognized handle for one ingested document or video.
///
/// Immutable once created; later requests reference it by `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Opaque, server-assigned identifier.
    pub id: String,
    pub kind: ContentKind,
    pub source: SourceRef,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// Build an item stamped with the current time.
    pub fn new(id: impl Into<String>, kind: ContentKind, source: SourceRef) -> Self {
        Self {
            id: id.into(),
            kind,
            source,
            created_at: Utc::now(),
        }
    }

    /// File name for PDFs, the URL for videos.
    pub fn display_name(&self) -> String {
        match &self.source {
            SourceRef::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            SourceRef::Url(url) => url.clone(),
        }
    }
}

/// A previously analyzed PDF or video, as listed in the analysis history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    /// File name for PDFs, video title or URL for YouTube.
    pub title: String,
    pub kind: ContentKind,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Chapters and resources
// =============================================================================

/// Ordered chapter names generated for a topic/level pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOutline {
    pub topic: String,
    pub level: String,
    pub chapters: Vec<String>,
}

impl ChapterOutline {
    pub fn contains(&self, chapter: &str) -> bool {
        self.chapters.iter().any(|c| c == chapter)
    }
}

/// A recommended video for a chapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLink {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl VideoLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            channel: None,
            duration: None,
        }
    }
}

/// A recommended website for a chapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebLink {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl WebLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: None,
        }
    }
}

/// Videos and websites for one chapter.
///
/// Only ever replaced as a whole; a new fetch never merges into an old bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBundle {
    pub chapter_name: String,
    pub videos: Vec<VideoLink>,
    pub websites: Vec<WebLink>,
}

impl ResourceBundle {
    pub fn empty(chapter_name: impl Into<String>) -> Self {
        Self {
            chapter_name: chapter_name.into(),
            videos: Vec::new(),
            websites: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.websites.is_empty()
    }
}

/// A chapter name with its stored resources, as embedded in a history record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterResource {
    pub name: String,
    #[serde(default)]
    pub videos: Vec<VideoLink>,
    #[serde(default)]
    pub websites: Vec<WebLink>,
}

impl ChapterResource {
    pub fn to_bundle(&self) -> ResourceBundle {
        ResourceBundle {
            chapter_name: self.name.clone(),
            videos: self.videos.clone(),
            websites: self.websites.clone(),
        }
    }
}

impl From<ResourceBundle> for ChapterResource {
    fn from(bundle: ResourceBundle) -> Self {
        Self {
            name: bundle.chapter_name,
            videos: bundle.videos,
            websites: bundle.websites,
        }
    }
}

/// Immutable snapshot of a past chapter-generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub topic: String,
    pub level: String,
    pub chapter_count: usize,
    pub created_at: DateTime<Utc>,
    pub chapters: Vec<ChapterResource>,
}

impl HistoryRecord {
    /// Create a new snapshot with a locally generated id.
    pub fn snapshot(
        topic: impl Into<String>,
        level: impl Into<String>,
        chapters: Vec<ChapterResource>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            level: level.into(),
            chapter_count: chapters.len(),
            created_at: Utc::now(),
            chapters,
        }
    }

    /// The chapter names of this record, in stored order.
    pub fn outline(&self) -> ChapterOutline {
        ChapterOutline {
            topic: self.topic.clone(),
            level: self.level.clone(),
            chapters: self.chapters.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Look up a stored chapter by exact name.
    pub fn find_chapter(&self, name: &str) -> Option<&ChapterResource> {
        self.chapters.iter().find(|c| c.name == name)
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Identifies one question within a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(pub u64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Where in the source a citation points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationLocation {
    /// Page number as reported by the analysis backend.
    Page(u32),
    /// Span of a video transcript, in seconds.
    Timestamp { start_secs: f64, length_secs: f64 },
}

/// Structured pointer from an answer back to the source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub chunk_id: String,
    pub location: CitationLocation,
    pub preview: String,
}

impl Citation {
    /// First `max_chars` characters of the preview, with an ellipsis when cut.
    pub fn preview_snippet(&self, max_chars: usize) -> String {
        if self.preview.chars().count() <= max_chars {
            return self.preview.clone();
        }
        let cut: String = self.preview.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// One entry of the conversation transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ConversationMessage {
    User {
        question: QuestionId,
        text: String,
    },
    /// `in_reply_to` is `None` only for the seed greeting.
    Assistant {
        in_reply_to: Option<QuestionId>,
        text: String,
    },
    References {
        in_reply_to: QuestionId,
        references: Vec<Citation>,
    },
}

impl ConversationMessage {
    /// The question this message belongs to, if any.
    pub fn question_id(&self) -> Option<QuestionId> {
        match self {
            ConversationMessage::User { question, .. } => Some(*question),
            ConversationMessage::Assistant { in_reply_to, .. } => *in_reply_to,
            ConversationMessage::References { in_reply_to, .. } => Some(*in_reply_to),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ConversationMessage::User { text, .. } | ConversationMessage::Assistant { text, .. } => {
                Some(text.as_str())
            }
            ConversationMessage::References { .. } => None,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, ConversationMessage::User { .. })
    }
}

/// Answer returned by the Q&A collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub references: Vec<Citation>,
}

/// One multiple-choice question produced for a set of videos.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

// =============================================================================
// Viewer and identity
// =============================================================================

/// Location handed to the external content viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpTarget {
    /// Zero-based page index in the PDF viewer.
    PageIndex(u32),
    /// Whole seconds from the start of the video.
    Seek { seconds: u64 },
}

/// Opaque identity and CSRF credentials, passed through to every backend call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub bearer_token: Option<String>,
    pub csrf_token: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intro_record() -> HistoryRecord {
        HistoryRecord::snapshot(
            "Rust",
            "college",
            vec![
                ChapterResource {
                    name: "Intro".to_string(),
                    videos: vec![VideoLink::new("A", "https://youtu.be/a")],
                    websites: vec![WebLink::new("B", "https://b.example")],
                },
                ChapterResource {
                    name: "Ownership".to_string(),
                    videos: vec![],
                    websites: vec![],
                },
            ],
        )
    }

    #[test]
    fn test_snapshot_counts_chapters() {
        let record = intro_record();
        assert_eq!(record.chapter_count, 2);
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_outline_preserves_order() {
        let outline = intro_record().outline();
        assert_eq!(outline.chapters, vec!["Intro", "Ownership"]);
        assert_eq!(outline.topic, "Rust");
        assert_eq!(outline.level, "college");
        assert!(outline.contains("Intro"));
        assert!(!outline.contains("intro"));
    }

    #[test]
    fn test_find_chapter_is_exact_match() {
        let record = intro_record();
        assert!(record.find_chapter("Intro").is_some());
        assert!(record.find_chapter("Intro ").is_none());
        assert!(record.find_chapter("INTRO").is_none());
    }

    #[test]
    fn test_chapter_resource_bundle_conversion() {
        let record = intro_record();
        let bundle = record.find_chapter("Intro").unwrap().to_bundle();
        assert_eq!(bundle.chapter_name, "Intro");
        assert_eq!(bundle.videos, vec![VideoLink::new("A", "https://youtu.be/a")]);
        assert_eq!(bundle.websites, vec![WebLink::new("B", "https://b.example")]);

        let back: ChapterResource = bundle.into();
        assert_eq!(&back, record.find_chapter("Intro").unwrap());
    }

    #[test]
    fn test_display_name() {
        let pdf = ContentItem::new(
            "1",
            ContentKind::Pdf,
            SourceRef::File(PathBuf::from("/tmp/notes/biology.pdf")),
        );
        assert_eq!(pdf.display_name(), "biology.pdf");

        let yt = ContentItem::new(
            "2",
            ContentKind::Youtube,
            SourceRef::Url("https://www.youtube.com/watch?v=abc".to_string()),
        );
        assert_eq!(yt.display_name(), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn test_preview_snippet() {
        let citation = Citation {
            chunk_id: "c1".to_string(),
            location: CitationLocation::Page(4),
            preview: "x".repeat(100),
        };
        assert_eq!(citation.preview_snippet(80), format!("{}...", "x".repeat(80)));

        let short = Citation {
            preview: "short".to_string(),
            ..citation
        };
        assert_eq!(short.preview_snippet(80), "short");
    }

    #[test]
    fn test_message_question_ids() {
        let greeting = ConversationMessage::Assistant {
            in_reply_to: None,
            text: "hi".to_string(),
        };
        assert_eq!(greeting.question_id(), None);

        let user = ConversationMessage::User {
            question: QuestionId(3),
            text: "why?".to_string(),
        };
        assert_eq!(user.question_id(), Some(QuestionId(3)));
        assert_eq!(user.text(), Some("why?"));
        assert!(user.is_user());

        let refs = ConversationMessage::References {
            in_reply_to: QuestionId(3),
            references: vec![],
        };
        assert_eq!(refs.text(), None);
    }

    #[test]
    fn test_message_serializes_with_role_tag() {
        let msg = ConversationMessage::User {
            question: QuestionId(1),
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn test_credentials_debug_redacts_tokens() {
        let creds = Credentials {
            bearer_token: Some("secret-token".to_string()),
            csrf_token: None,
        };
        let dbg = format!("{:?}", creds);
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_content_kind_labels() {
        assert_eq!(ContentKind::Pdf.label(), "PDF document");
        assert_eq!(ContentKind::Youtube.label(), "YouTube video");
        assert_eq!(ContentKind::Youtube.to_string(), "youtube");
        assert_eq!(ContentKind::default(), ContentKind::Pdf);
    }
}
