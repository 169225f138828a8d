//! Scan form input.
//!
//! Holds what the user has entered for the selected content kind. Switching
//! kinds discards the other kind's input so a stale file or URL is never sent.

use std::path::PathBuf;

use serde::Serialize;

use tutor_core::types::ContentKind;

use crate::error::SessionError;

pub const MISSING_FILE_MESSAGE: &str = "Please choose a PDF file to analyze.";
pub const MISSING_URL_MESSAGE: &str = "Please paste a YouTube link to analyze.";

/// Partially entered scan form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StagedInput {
    pub kind: ContentKind,
    pub file: Option<PathBuf>,
    pub url: String,
}

/// Validated input ready for ingestion. Exactly one source is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanInput {
    Pdf(PathBuf),
    Youtube(String),
}

impl ScanInput {
    pub fn kind(&self) -> ContentKind {
        match self {
            ScanInput::Pdf(_) => ContentKind::Pdf,
            ScanInput::Youtube(_) => ContentKind::Youtube,
        }
    }
}

impl StagedInput {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Switch kinds, clearing both inputs.
    pub fn select_kind(&mut self, kind: ContentKind) {
        *self = Self::new(kind);
    }

    pub fn set_file(&mut self, file: PathBuf) {
        self.file = Some(file);
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.kind);
    }

    /// Validate the field required by the selected kind.
    pub fn to_input(&self) -> Result<ScanInput, SessionError> {
        match self.kind {
            ContentKind::Pdf => match &self.file {
                Some(path) if !path.as_os_str().is_empty() => Ok(ScanInput::Pdf(path.clone())),
                _ => Err(SessionError::Validation(MISSING_FILE_MESSAGE.to_string())),
            },
            ContentKind::Youtube => {
                let url = self.url.trim();
                if url.is_empty() {
                    Err(SessionError::Validation(MISSING_URL_MESSAGE.to_string()))
                } else {
                    Ok(ScanInput::Youtube(url.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_pdf_rejected() {
        let input = StagedInput::new(ContentKind::Pdf);
        assert_eq!(
            input.to_input(),
            Err(SessionError::Validation(MISSING_FILE_MESSAGE.to_string()))
        );

        let mut empty_path = StagedInput::new(ContentKind::Pdf);
        empty_path.set_file(PathBuf::new());
        assert!(empty_path.to_input().is_err());
    }

    #[test]
    fn test_blank_url_rejected() {
        let mut input = StagedInput::new(ContentKind::Youtube);
        input.set_url("   ");
        assert_eq!(
            input.to_input(),
            Err(SessionError::Validation(MISSING_URL_MESSAGE.to_string()))
        );
    }

    #[test]
    fn test_url_is_trimmed() {
        let mut input = StagedInput::new(ContentKind::Youtube);
        input.set_url("  https://youtu.be/abc ");
        assert_eq!(
            input.to_input().unwrap(),
            ScanInput::Youtube("https://youtu.be/abc".to_string())
        );
    }

    #[test]
    fn test_select_kind_discards_other_input() {
        let mut input = StagedInput::new(ContentKind::Pdf);
        input.set_file(PathBuf::from("/tmp/notes.pdf"));
        input.select_kind(ContentKind::Youtube);
        assert!(input.file.is_none());
        assert_eq!(input.kind, ContentKind::Youtube);

        input.set_url("https://youtu.be/abc");
        input.select_kind(ContentKind::Pdf);
        assert!(input.url.is_empty());
    }

    #[test]
    fn test_pdf_ignores_staged_url() {
        let mut input = StagedInput::new(ContentKind::Pdf);
        input.set_url("https://youtu.be/abc");
        assert!(input.to_input().is_err());
        input.set_file(PathBuf::from("/tmp/a.pdf"));
        assert_eq!(input.to_input().unwrap().kind(), ContentKind::Pdf);
    }
}
