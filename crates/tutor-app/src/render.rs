//! Plain-text rendering of session state for the terminal.

use tutor_core::types::{
    ChapterOutline, Citation, CitationLocation, ConversationMessage, DocumentRecord,
    HistoryRecord, QuizQuestion, ResourceBundle,
};

/// `m:ss`, or `h:mm:ss` past the hour.
pub fn format_clock(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

pub fn render_location(location: &CitationLocation) -> String {
    match location {
        CitationLocation::Page(page) => format!("page {}", page),
        CitationLocation::Timestamp { start_secs, .. } => {
            format_clock(start_secs.max(0.0).trunc() as u64)
        }
    }
}

/// Numbered reference list; the numbers are what `:jump N` takes.
pub fn render_references(references: &[Citation], preview_chars: usize) -> String {
    references
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "  [{}] {}  {}",
                i + 1,
                render_location(&c.location),
                c.preview_snippet(preview_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One transcript entry. Empty reference lists render as nothing.
pub fn render_message(message: &ConversationMessage, preview_chars: usize) -> Option<String> {
    match message {
        ConversationMessage::User { text, .. } => Some(format!("you> {}", text)),
        ConversationMessage::Assistant { text, .. } => Some(format!("tutor> {}", text)),
        ConversationMessage::References { references, .. } if references.is_empty() => None,
        ConversationMessage::References { references, .. } => Some(format!(
            "References:\n{}",
            render_references(references, preview_chars)
        )),
    }
}

pub fn render_outline(outline: &ChapterOutline) -> String {
    let mut out = format!("{} ({})", outline.topic, outline.level);
    if outline.chapters.is_empty() {
        out.push_str("\n  (no chapters)");
    }
    for (i, chapter) in outline.chapters.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, chapter));
    }
    out
}

pub fn render_bundle(bundle: &ResourceBundle) -> String {
    let mut out = format!("{}\nVideos:", bundle.chapter_name);
    if bundle.videos.is_empty() {
        out.push_str("\n  (none)");
    }
    for v in &bundle.videos {
        out.push_str(&format!("\n  - {} <{}>", v.title, v.url));
        let extra: Vec<&str> = [v.channel.as_deref(), v.duration.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !extra.is_empty() {
            out.push_str(&format!(" [{}]", extra.join(", ")));
        }
    }
    out.push_str("\nWebsites:");
    if bundle.websites.is_empty() {
        out.push_str("\n  (none)");
    }
    for w in &bundle.websites {
        out.push_str(&format!("\n  - {} <{}>", w.title, w.url));
        if let Some(ref source) = w.source {
            out.push_str(&format!(" [{}]", source));
        }
    }
    out
}

pub fn render_history(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No saved chapter runs.".to_string();
    }
    records
        .iter()
        .map(|r| {
            format!(
                "{}  {}  {} ({}), {} chapters",
                r.id,
                r.created_at.format("%Y-%m-%d %H:%M"),
                r.topic,
                r.level,
                r.chapter_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_documents(documents: &[DocumentRecord]) -> String {
    if documents.is_empty() {
        return "Nothing analyzed yet.".to_string();
    }
    documents
        .iter()
        .map(|d| {
            format!(
                "{}  {}  [{}] {}",
                d.id,
                d.created_at.format("%Y-%m-%d %H:%M"),
                d.kind,
                d.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_quiz(questions: &[QuizQuestion]) -> String {
    if questions.is_empty() {
        return "No questions were generated.".to_string();
    }
    let mut blocks = Vec::with_capacity(questions.len());
    for (i, q) in questions.iter().enumerate() {
        let mut block = format!("{}. {}", i + 1, q.question);
        for (letter, option) in ('a'..='z').zip(&q.options) {
            block.push_str(&format!("\n   {}) {}", letter, option));
        }
        block.push_str(&format!("\n   Answer: {}", q.answer));
        blocks.push(block);
    }
    blocks.join("\n\n")
}
