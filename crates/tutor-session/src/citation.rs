//! Citation resolution.
//!
//! Turns the location carried by an answer reference into a target for the
//! external viewer, and formats shareable YouTube timestamp links.

use std::sync::LazyLock;

use regex::Regex;

use tutor_core::types::{Citation, CitationLocation, JumpTarget};

use crate::error::SessionError;

/// Subtracted from a reported page number to get the PDF viewer's page index.
///
/// This is the viewer's contract as observed: page 2 opens index 0. It is not
/// a general 1-based to 0-based conversion.
pub const PDF_PAGE_INDEX_OFFSET: u32 = 2;

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/embed/|/shorts/)([A-Za-z0-9_-]+)")
        .expect("Invalid video id regex")
});

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid bare id regex"));

/// Map a citation to a viewer position.
pub fn resolve(citation: &Citation) -> Result<JumpTarget, SessionError> {
    match citation.location {
        CitationLocation::Page(page) => page
            .checked_sub(PDF_PAGE_INDEX_OFFSET)
            .map(JumpTarget::PageIndex)
            .ok_or_else(|| {
                SessionError::Validation(format!("Page {} has no position in the viewer.", page))
            }),
        CitationLocation::Timestamp { start_secs, .. } => {
            if !start_secs.is_finite() || start_secs < 0.0 {
                return Err(SessionError::Validation(format!(
                    "Invalid timestamp: {}",
                    start_secs
                )));
            }
            Ok(JumpTarget::Seek {
                seconds: start_secs.trunc() as u64,
            })
        }
    }
}

/// Extract the video id from a watch, short-link, embed or shorts URL.
///
/// A string that is already a bare id is returned as is.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    if let Some(caps) = VIDEO_ID.captures(url) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    if BARE_ID.is_match(url) {
        return Some(url.to_string());
    }
    None
}

/// `https://www.youtube.com/watch?v=<id>&t=<n>s` for the given source URL.
pub fn timestamp_url(source_url: &str, seconds: u64) -> Option<String> {
    extract_video_id(source_url)
        .map(|id| format!("https://www.youtube.com/watch?v={}&t={}s", id, seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32) -> Citation {
        Citation {
            chunk_id: "c".to_string(),
            location: CitationLocation::Page(n),
            preview: String::new(),
        }
    }

    fn at(start: f64) -> Citation {
        Citation {
            chunk_id: "c".to_string(),
            location: CitationLocation::Timestamp {
                start_secs: start,
                length_secs: 5.0,
            },
            preview: String::new(),
        }
    }

    // =====================================================================
    // Page resolution
    // =====================================================================

    #[test]
    fn test_page_offset() {
        assert_eq!(resolve(&page(5)).unwrap(), JumpTarget::PageIndex(3));
        assert_eq!(resolve(&page(2)).unwrap(), JumpTarget::PageIndex(0));
    }

    #[test]
    fn test_page_below_offset_rejected() {
        assert!(matches!(resolve(&page(1)), Err(SessionError::Validation(_))));
        assert!(matches!(resolve(&page(0)), Err(SessionError::Validation(_))));
    }

    // =====================================================================
    // Timestamp resolution
    // =====================================================================

    #[test]
    fn test_timestamp_truncates() {
        assert_eq!(resolve(&at(83.9)).unwrap(), JumpTarget::Seek { seconds: 83 });
        assert_eq!(resolve(&at(0.0)).unwrap(), JumpTarget::Seek { seconds: 0 });
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        assert!(resolve(&at(-1.0)).is_err());
        assert!(resolve(&at(f64::NAN)).is_err());
    }

    // =====================================================================
    // Video ids
    // =====================================================================

    #[test]
    fn test_extract_video_id_variants() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/watch?feature=share&v=abc_-123", "abc_-123"),
            ("https://youtu.be/dQw4w9WgXcQ?t=10", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/embed/xyz", "xyz"),
            ("https://www.youtube.com/shorts/short1", "short1"),
            ("dQw4w9WgXcQ", "dQw4w9WgXcQ"),
        ];
        for (url, expected) in cases {
            assert_eq!(extract_video_id(url).as_deref(), Some(expected), "{}", url);
        }
    }

    #[test]
    fn test_extract_video_id_rejects_other_urls() {
        assert_eq!(extract_video_id("https://example.com/video"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_timestamp_url() {
        assert_eq!(
            timestamp_url("https://youtu.be/abc", 83).as_deref(),
            Some("https://www.youtube.com/watch?v=abc&t=83s")
        );
        assert_eq!(timestamp_url("not a url", 1), None);
    }
}
