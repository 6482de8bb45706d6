// src/summary.rs
//! Video URL → summary → chat session
use crate::chat::ChatSession;
use crate::credentials::CredentialStore;
use crate::summarizer_client::{ClientError, SummarizationService};
use crate::types::{VideoContext, VideoSummary};
use crate::utils::{extract_video_id, VideoUrlError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error(transparent)]
    Url(#[from] VideoUrlError),
    #[error(transparent)]
    Backend(#[from] ClientError),
}

pub struct SummarizedVideo {
    pub summary: VideoSummary,
    /// Only present when the backend returned transcript records to chat about
    pub chat: Option<ChatSession>,
}

/// Ask the backend to summarize `video_url` and open a chat session for it.
///
/// The URL is checked locally first so obviously malformed input never
/// reaches the backend.
pub async fn summarize_video(
    service: Arc<dyn SummarizationService>,
    credentials: Arc<dyn CredentialStore>,
    video_url: &str,
) -> Result<SummarizedVideo, SummarizeError> {
    let video_url = video_url.trim();
    let video_id = extract_video_id(video_url)?;
    tracing::debug!("Extracted video id {} from {}", video_id, video_url);

    let summary = service.process_video(video_url).await?;

    let chat = if summary.transcript_data.is_empty() {
        tracing::info!("No transcript records for {}, chat disabled", summary.video_id);
        None
    } else {
        Some(ChatSession::new(VideoContext::from(summary.clone()), service, credentials))
    };

    Ok(SummarizedVideo { summary, chat })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::summarizer_client::fake::FakeService;
    use serde_json::json;

    fn summary(transcript_data: Vec<serde_json::Value>) -> VideoSummary {
        VideoSummary {
            summary: "[00:00] Intro".to_string(),
            total_duration: "03:32".to_string(),
            snippet_count: transcript_data.len() as u32,
            video_id: "dQw4w9WgXcQ".to_string(),
            transcript_data,
        }
    }

    #[tokio::test]
    async fn test_opens_chat_with_backend_context() {
        let service = Arc::new(FakeService::new().with_summary(summary(vec![json!({"text": "hi"})])));
        let credentials = Arc::new(MemoryCredentialStore::new());

        let result = summarize_video(service, credentials, " https://youtu.be/dQw4w9WgXcQ ")
            .await
            .unwrap();

        let chat = result.chat.expect("chat session");
        assert_eq!(chat.context().video_id, "dQw4w9WgXcQ");
        assert_eq!(chat.context().summary, "[00:00] Intro");
        assert_eq!(chat.context().transcript_data, vec![json!({"text": "hi"})]);
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn test_no_chat_without_transcript() {
        let service = Arc::new(FakeService::new().with_summary(summary(Vec::new())));
        let credentials = Arc::new(MemoryCredentialStore::new());

        let result = summarize_video(service, credentials, "https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert!(result.chat.is_none());
        assert_eq!(result.summary.total_duration, "03:32");
    }

    #[tokio::test]
    async fn test_bad_url_never_reaches_backend() {
        let service = Arc::new(FakeService::new());
        let credentials = Arc::new(MemoryCredentialStore::new());

        let err = summarize_video(service.clone(), credentials.clone(), "").await.err().unwrap();
        assert_eq!(err.to_string(), "Please enter a YouTube URL");

        let err = summarize_video(service, credentials, "https://vimeo.com/1").await.err().unwrap();
        assert!(matches!(err, SummarizeError::Url(VideoUrlError::Unrecognized)));
    }

    #[tokio::test]
    async fn test_backend_detail_is_reported() {
        let service = Arc::new(FakeService::new());
        let credentials = Arc::new(MemoryCredentialStore::new());

        let err = summarize_video(service, credentials, "https://youtu.be/dQw4w9WgXcQ")
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Invalid YouTube URL format");
    }
}
