// src/summarizer_client.rs
use crate::config::AppConfig;
use crate::types::{
    ChatRequest, ChatResponse, ErrorDetail, HealthResponse, ProcessVideoRequest, ValidateKeyRequest,
    ValidateKeyResponse, VideoSummary,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Summarizer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{detail}")]
    Status { status: u16, detail: String },
    #[error("Malformed summarizer response: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::MalformedBody(_) => None,
        }
    }
}

/// The remote service that answers questions about a video.
///
/// The chat session talks to it only through this trait.
#[async_trait]
pub trait SummarizationService: Send + Sync {
    /// POST `/chat`
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ClientError>;

    /// POST `/process_video`
    async fn process_video(&self, video_url: &str) -> Result<VideoSummary, ClientError>;

    /// POST `/validate_api_key`
    async fn validate_api_key(&self, api_key: &str) -> Result<bool, ClientError>;
}

#[derive(Debug, Clone)]
pub struct SummarizerClient {
    client: Client,
    base_url: String,
}

impl SummarizerClient {
    pub fn new(config: &AppConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `/health`, true when the backend reports itself healthy
    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        let health: HealthResponse = Self::read_json(response, "Health check failed").await?;
        Ok(health.status == "healthy")
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, fallback_detail: &str) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        Self::read_json(response, fallback_detail).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response, fallback_detail: &str) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorDetail>(&body)
                .ok()
                .and_then(|e| e.detail)
                .unwrap_or_else(|| fallback_detail.to_string());
            error!("Summarizer API error ({}): {}", status, detail);
            return Err(ClientError::Status { status: status.as_u16(), detail });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SummarizationService for SummarizerClient {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ClientError> {
        info!("💬 Asking summarizer about video {}", request.video_id);
        self.post_json("/chat", request, "Failed to get response").await
    }

    async fn process_video(&self, video_url: &str) -> Result<VideoSummary, ClientError> {
        info!("🎬 Processing video: {}", video_url);
        let summary: VideoSummary = self
            .post_json("/process_video", &ProcessVideoRequest { video_url }, "Failed to process video")
            .await?;
        info!(
            "✅ Summary ready for {} ({} segments, {})",
            summary.video_id, summary.snippet_count, summary.total_duration
        );
        Ok(summary)
    }

    async fn validate_api_key(&self, api_key: &str) -> Result<bool, ClientError> {
        let response: ValidateKeyResponse = self
            .post_json("/validate_api_key", &ValidateKeyRequest { api_key }, "Failed to validate API key")
            .await?;
        Ok(response.valid)
    }
}

/// In-process stand-in for the backend, used by unit tests across the crate
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    pub enum FakeReply {
        Answer(String),
        Status(u16),
        Malformed,
    }

    #[derive(Default)]
    pub struct FakeService {
        replies: Mutex<VecDeque<FakeReply>>,
        chat_requests: Mutex<Vec<serde_json::Value>>,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        valid_keys: Vec<String>,
        validation_fails: bool,
        validate_calls: Mutex<usize>,
        summary: Option<VideoSummary>,
    }

    impl FakeService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_valid_keys(mut self, keys: &[&str]) -> Self {
            self.valid_keys = keys.iter().map(|k| k.to_string()).collect();
            self
        }

        pub fn failing_validation(mut self) -> Self {
            self.validation_fails = true;
            self
        }

        pub fn with_summary(mut self, summary: VideoSummary) -> Self {
            self.summary = Some(summary);
            self
        }

        pub fn push_reply(&self, reply: FakeReply) {
            self.replies.lock().unwrap().push_back(reply);
        }

        /// The next `chat` call waits until the returned sender fires (or is dropped)
        pub fn hold_next_reply(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            *self.gate.lock().unwrap() = Some(rx);
            tx
        }

        pub fn chat_requests(&self) -> Vec<serde_json::Value> {
            self.chat_requests.lock().unwrap().clone()
        }

        pub fn validate_calls(&self) -> usize {
            *self.validate_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl SummarizationService for FakeService {
        async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ClientError> {
            self.chat_requests
                .lock()
                .unwrap()
                .push(serde_json::to_value(request).unwrap());

            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }

            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(FakeReply::Answer(answer)) => Ok(ChatResponse { answer }),
                Some(FakeReply::Status(status)) => Err(ClientError::Status {
                    status,
                    detail: "Failed to get response".to_string(),
                }),
                Some(FakeReply::Malformed) | None => {
                    Err(serde_json::from_str::<ChatResponse>("{}").unwrap_err().into())
                }
            }
        }

        async fn process_video(&self, _video_url: &str) -> Result<VideoSummary, ClientError> {
            self.summary.clone().ok_or_else(|| ClientError::Status {
                status: 400,
                detail: "Invalid YouTube URL format".to_string(),
            })
        }

        async fn validate_api_key(&self, api_key: &str) -> Result<bool, ClientError> {
            *self.validate_calls.lock().unwrap() += 1;
            if self.validation_fails {
                return Err(ClientError::Status { status: 503, detail: "unavailable".to_string() });
            }
            Ok(self.valid_keys.iter().any(|k| k == api_key))
        }
    }
}
