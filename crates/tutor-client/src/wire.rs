//! Response schemas of the analysis backend.
//!
//! Every endpoint answers with `{ "data": ..., "error": ... }`. The payload
//! structs here accept whatever subset of fields the server sends; the
//! `into_*` conversions are the only place absent fields become empty values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use tutor_core::types::{
    Answer, ChapterResource, Citation, CitationLocation, ContentKind, DocumentRecord,
    HistoryRecord, QuizQuestion, VideoLink, WebLink,
};

/// Answer text used when the server replies without one.
pub const NO_RESPONSE_TEXT: &str = "No response from server.";

/// Top-level response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Error-only view of a response body, used for non-2xx replies whose data
/// shape is unknown.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub struct YoutubeRequest<'a> {
    pub url: &'a str,
}

/// The backend calls the level "grade".
#[derive(Debug, Serialize)]
pub struct ChaptersRequest<'a> {
    pub topic: &'a str,
    pub grade: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResourcesRequest<'a> {
    pub topic: &'a str,
    pub grade: &'a str,
    pub chapter: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub pdf_id: &'a str,
    pub question: &'a str,
}

#[derive(Debug, Serialize)]
pub struct QuizRequest<'a> {
    pub videos: &'a [VideoLink],
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ScanData {
    #[serde(default)]
    pub id: Option<Value>,
}

impl ScanData {
    pub fn content_id(&self) -> Option<String> {
        self.id.as_ref().and_then(id_string)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChaptersData {
    #[serde(default)]
    pub chapters: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideosData {
    #[serde(default)]
    pub videos: Vec<WireVideo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebsitesData {
    #[serde(default)]
    pub websites: Vec<WireWebsite>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireVideo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireWebsite {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AskData {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub references: Vec<WireReference>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireReference {
    #[serde(default)]
    pub chunk_id: Option<Value>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
    #[serde(default)]
    pub preview: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireTimestamp {
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub length: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireHistory {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub chapter_count: Option<usize>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub chapters: Vec<WireChapter>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireChapter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub videos: Vec<WireVideo>,
    #[serde(default)]
    pub websites: Vec<WireWebsite>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireDocument {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub kind: Option<ContentKind>,
    #[serde(default)]
    pub upload_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuizData {
    #[serde(default)]
    pub questions: Vec<WireQuestion>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireQuestion {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

// =============================================================================
// Normalization
// =============================================================================

/// Ids arrive as strings or integers depending on the endpoint.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_time(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Entries without a URL cannot be opened and are dropped. A missing title
/// falls back to the URL.
pub fn into_videos(videos: Vec<WireVideo>) -> Vec<VideoLink> {
    videos
        .into_iter()
        .filter_map(|v| {
            let url = v.url.filter(|u| !u.trim().is_empty())?;
            Some(VideoLink {
                title: v.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| url.clone()),
                url,
                channel: v.channel,
                duration: v.duration,
            })
        })
        .collect()
}

pub fn into_websites(websites: Vec<WireWebsite>) -> Vec<WebLink> {
    websites
        .into_iter()
        .filter_map(|w| {
            let url = w.url.filter(|u| !u.trim().is_empty())?;
            Some(WebLink {
                title: w.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| url.clone()),
                url,
                source: w.source,
            })
        })
        .collect()
}

pub fn into_answer(data: Option<AskData>) -> Answer {
    let data = data.unwrap_or_default();
    let answer = data
        .answer
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| NO_RESPONSE_TEXT.to_string());

    let references = data
        .references
        .into_iter()
        .enumerate()
        .filter_map(|(i, r)| {
            let location = match (r.page, r.timestamp) {
                (_, Some(ts)) => CitationLocation::Timestamp {
                    start_secs: ts.start,
                    length_secs: ts.length,
                },
                (Some(page), None) => CitationLocation::Page(page),
                (None, None) => {
                    debug!(index = i, "Dropping reference without a location");
                    return None;
                }
            };
            Some(Citation {
                chunk_id: r
                    .chunk_id
                    .as_ref()
                    .and_then(id_string)
                    .unwrap_or_else(|| i.to_string()),
                location,
                preview: r.preview.unwrap_or_default(),
            })
        })
        .collect();

    Answer { answer, references }
}

pub fn into_history(records: Vec<WireHistory>) -> Vec<HistoryRecord> {
    records
        .into_iter()
        .filter_map(|r| {
            let id = r.id.as_ref().and_then(id_string)?;
            let chapters: Vec<ChapterResource> = r
                .chapters
                .into_iter()
                .filter_map(|c| {
                    Some(ChapterResource {
                        name: c.name?,
                        videos: into_videos(c.videos),
                        websites: into_websites(c.websites),
                    })
                })
                .collect();
            Some(HistoryRecord {
                id,
                topic: r.topic.unwrap_or_default(),
                level: r.grade.unwrap_or_default(),
                chapter_count: r.chapter_count.unwrap_or(chapters.len()),
                created_at: parse_time(r.created_at.as_deref()),
                chapters,
            })
        })
        .collect()
}

pub fn into_documents(documents: Vec<WireDocument>) -> Vec<DocumentRecord> {
    documents
        .into_iter()
        .filter_map(|d| {
            let id = d.id.as_ref().and_then(id_string)?;
            Some(DocumentRecord {
                title: d.file_name.unwrap_or_else(|| id.clone()),
                id,
                kind: d.kind.unwrap_or_default(),
                created_at: parse_time(d.upload_time.as_deref()),
            })
        })
        .collect()
}

pub fn into_quiz(data: Option<QuizData>) -> Vec<QuizQuestion> {
    data.unwrap_or_default()
        .questions
        .into_iter()
        .filter_map(|q| {
            Some(QuizQuestion {
                question: q.question.filter(|t| !t.trim().is_empty())?,
                options: q.options,
                answer: q.answer.unwrap_or_default(),
            })
        })
        .collect()
}
