//! HTTP implementation of the backend contracts.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use tutor_core::backend::{BackendError, HistoryStore, StudyBackend};
use tutor_core::config::BackendConfig;
use tutor_core::error::TutorError;
use tutor_core::types::{
    Answer, ContentItem, ContentKind, Credentials, DocumentRecord, HistoryRecord, QuizQuestion,
    SourceRef, VideoLink, WebLink,
};

use crate::wire::{
    self, AskData, AskRequest, ChaptersData, ChaptersRequest, Envelope, ErrorBody, QuizData,
    QuizRequest, ResourcesRequest, ScanData, VideosData, WebsitesData, WireDocument, WireHistory,
    YoutubeRequest,
};

/// Client for the analysis backend's REST endpoints.
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, TutorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TutorError::Backend(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send_json<T, B>(
        &self,
        creds: &Credentials,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, BackendError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        debug!(path = path, "POST");
        let request = with_credentials(self.http_client.post(self.url(path)), creds).json(body);
        let response = request.send().await.map_err(transport_error)?;
        read_envelope(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        creds: &Credentials,
        path: &str,
    ) -> Result<Option<T>, BackendError> {
        debug!(path = path, "GET");
        let request = with_credentials(self.http_client.get(self.url(path)), creds);
        let response = request.send().await.map_err(transport_error)?;
        read_envelope(response).await
    }
}

/// Attach the identity and CSRF headers when present.
fn with_credentials(builder: RequestBuilder, creds: &Credentials) -> RequestBuilder {
    let builder = match creds.bearer_token.as_deref() {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    };
    match creds.csrf_token.as_deref() {
        Some(csrf) => builder.header("X-CSRFToken", csrf),
        None => builder,
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::from_parts(None, Some(err.to_string()))
}

/// Unwrap the `{data, error}` envelope, classifying failures.
///
/// A non-blank `error` field always wins. Otherwise a non-2xx status or an
/// unparseable body becomes a transport error.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<Option<T>, BackendError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let server = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        let err = BackendError::from_parts(server, Some(format!("Server returned {}", status)));
        warn!(status = status.as_u16(), error = %err, "Backend request failed");
        return Err(err);
    }

    if body.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) => match envelope.error.filter(|e| !e.trim().is_empty()) {
            Some(message) => {
                warn!(error = %message, "Backend reported an error");
                Err(BackendError::Server(message))
            }
            None => Ok(envelope.data),
        },
        Err(e) => {
            let server = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error);
            Err(BackendError::from_parts(
                server,
                Some(format!("Invalid response from server: {}", e)),
            ))
        }
    }
}

fn content_item(
    data: Option<ScanData>,
    kind: ContentKind,
    source: SourceRef,
) -> Result<ContentItem, BackendError> {
    let id = data
        .and_then(|d| d.content_id())
        .ok_or_else(|| BackendError::Transport("Response did not include a content id".to_string()))?;
    Ok(ContentItem::new(id, kind, source))
}

#[async_trait]
impl StudyBackend for HttpBackend {
    async fn submit_pdf(&self, creds: &Credentials, file: &Path) -> Result<ContentItem, BackendError> {
        let bytes = tokio::fs::read(file).await.map_err(|e| {
            BackendError::Transport(format!("Failed to read {}: {}", file.display(), e))
        })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(transport_error)?;
        let form = Form::new().part("pdf", part);

        debug!(path = "process-pdf/", file = %file.display(), "POST multipart");
        let request =
            with_credentials(self.http_client.post(self.url("process-pdf/")), creds).multipart(form);
        let response = request.send().await.map_err(transport_error)?;
        let data: Option<ScanData> = read_envelope(response).await?;

        let item = content_item(data, ContentKind::Pdf, SourceRef::File(file.to_path_buf()))?;
        info!(content_id = %item.id, "PDF analyzed");
        Ok(item)
    }

    async fn submit_youtube(&self, creds: &Credentials, url: &str) -> Result<ContentItem, BackendError> {
        let data: Option<ScanData> = self
            .send_json(creds, "analyze/yt", &YoutubeRequest { url })
            .await?;
        let item = content_item(data, ContentKind::Youtube, SourceRef::Url(url.to_string()))?;
        info!(content_id = %item.id, "YouTube video analyzed");
        Ok(item)
    }

    async fn generate_chapters(
        &self,
        creds: &Credentials,
        topic: &str,
        level: &str,
    ) -> Result<Vec<String>, BackendError> {
        let data: Option<ChaptersData> = self
            .send_json(creds, "chapters/", &ChaptersRequest { topic, grade: level })
            .await?;
        Ok(data.unwrap_or_default().chapters)
    }

    async fn fetch_videos(
        &self,
        creds: &Credentials,
        topic: &str,
        level: &str,
        chapter: &str,
    ) -> Result<Vec<VideoLink>, BackendError> {
        let request = ResourcesRequest {
            topic,
            grade: level,
            chapter,
        };
        let data: Option<VideosData> = self.send_json(creds, "videos/", &request).await?;
        Ok(wire::into_videos(data.unwrap_or_default().videos))
    }

    async fn fetch_websites(
        &self,
        creds: &Credentials,
        topic: &str,
        level: &str,
        chapter: &str,
    ) -> Result<Vec<WebLink>, BackendError> {
        let request = ResourcesRequest {
            topic,
            grade: level,
            chapter,
        };
        let data: Option<WebsitesData> = self.send_json(creds, "websites/", &request).await?;
        Ok(wire::into_websites(data.unwrap_or_default().websites))
    }

    async fn ask(
        &self,
        creds: &Credentials,
        content_id: &str,
        question: &str,
    ) -> Result<Answer, BackendError> {
        let request = AskRequest {
            pdf_id: content_id,
            question,
        };
        let data: Option<AskData> = self.send_json(creds, "ask/", &request).await?;
        Ok(wire::into_answer(data))
    }

    async fn generate_quiz(
        &self,
        creds: &Credentials,
        videos: &[VideoLink],
    ) -> Result<Vec<QuizQuestion>, BackendError> {
        let data: Option<QuizData> = self
            .send_json(creds, "mcq/", &QuizRequest { videos })
            .await?;
        Ok(wire::into_quiz(data))
    }
}

/// History lives server-side: snapshots and documents are recorded by the
/// backend itself, so the `record_*` defaults apply.
#[async_trait]
impl HistoryStore for HttpBackend {
    async fn list_history(&self, creds: &Credentials) -> Result<Vec<HistoryRecord>, BackendError> {
        let data: Option<Vec<WireHistory>> = self.get_json(creds, "chapter-history/").await?;
        Ok(wire::into_history(data.unwrap_or_default()))
    }

    async fn delete_history(&self, creds: &Credentials, id: &str) -> Result<(), BackendError> {
        let path = format!("chapter-history/{}/", id);
        debug!(path = %path, "DELETE");
        let request = with_credentials(self.http_client.delete(self.url(&path)), creds);
        let response = request.send().await.map_err(transport_error)?;
        let _: Option<serde_json::Value> = read_envelope(response).await?;
        info!(id = %id, "Deleted history record");
        Ok(())
    }

    async fn list_documents(&self, creds: &Credentials) -> Result<Vec<DocumentRecord>, BackendError> {
        let data: Option<Vec<WireDocument>> = self.get_json(creds, "pdf-list/").await?;
        Ok(wire::into_documents(data.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let backend = HttpBackend::new(&BackendConfig::default());
        assert!(backend.is_ok());
    }

    #[test]
    fn test_url_joining() {
        let config = BackendConfig {
            base_url: "http://localhost:8000/api/".to_string(),
            ..Default::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000/api");
        assert_eq!(backend.url("chapters/"), "http://localhost:8000/api/chapters/");
        assert_eq!(backend.url("/ask/"), "http://localhost:8000/api/ask/");
    }

    #[test]
    fn test_content_item_requires_id() {
        let err = content_item(
            Some(ScanData::default()),
            ContentKind::Pdf,
            SourceRef::Url("x".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));

        let item = content_item(
            Some(ScanData {
                id: Some(serde_json::json!(12)),
            }),
            ContentKind::Youtube,
            SourceRef::Url("https://youtu.be/x".to_string()),
        )
        .unwrap();
        assert_eq!(item.id, "12");
    }
}
