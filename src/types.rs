// types.rs - Data structures shared by the chat session and the summarizer client
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message in the conversation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message identifier: creation time, per-session sequence number and role tag.
///
/// The sequence number keeps ids distinct even when two messages are created
/// within the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(created_at: DateTime<Utc>, seq: u64, role: MessageRole) -> Self {
        Self(format!("{}-{}-{}", created_at.timestamp_millis(), seq, role))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One turn in the conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Fixed context a chat session is opened for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoContext {
    pub video_id: String,
    /// Transcript records from the backend, forwarded untouched
    pub transcript_data: Vec<serde_json::Value>,
    pub summary: String,
}

impl VideoContext {
    pub fn new(video_id: impl Into<String>, transcript_data: Vec<serde_json::Value>, summary: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            transcript_data,
            summary: summary.into(),
        }
    }
}

impl From<VideoSummary> for VideoContext {
    fn from(summary: VideoSummary) -> Self {
        Self {
            video_id: summary.video_id,
            transcript_data: summary.transcript_data,
            summary: summary.summary,
        }
    }
}

// Wire types for the summarizer backend

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub question: &'a str,
    pub video_id: &'a str,
    pub transcript_data: &'a [serde_json::Value],
    pub summary: &'a str,
    pub api_key: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessVideoRequest<'a> {
    pub video_url: &'a str,
}

/// Response of `/process_video`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSummary {
    pub summary: String,
    pub total_duration: String,
    pub snippet_count: u32,
    pub video_id: String,
    #[serde(default)]
    pub transcript_data: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateKeyRequest<'a> {
    pub api_key: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateKeyResponse {
    #[serde(default)]
    pub valid: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body FastAPI-style backends return on non-2xx
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: Option<String>,
}
