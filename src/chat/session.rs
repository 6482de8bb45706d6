// src/chat/session.rs
use super::scroll::Viewport;
use crate::credentials::{CredentialStore, API_KEY_SLOT};
use crate::summarizer_client::SummarizationService;
use crate::types::{ChatRequest, Message, MessageId, MessageRole, VideoContext};
use crate::utils::lock;
use chrono::Utc;
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Assistant text shown whenever the backend could not produce an answer
pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't process your question. Please try again.";

/// Why a question was not sent. Nothing in the session changes when this is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Please enter a question")]
    EmptyQuestion,
    #[error("Please save your OpenAI API key first")]
    MissingCredential,
    #[error("Please wait for the current answer")]
    RequestPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<Message>,
    pending: Option<String>,
    scroll_target: Option<MessageId>,
    next_seq: u64,
}

impl SessionState {
    fn append(&mut self, role: MessageRole, content: String) -> Message {
        let created_at = Utc::now();
        let id = MessageId::new(created_at, self.next_seq, role);
        self.next_seq += 1;

        let message = Message { id: id.clone(), role, content, created_at };
        self.messages.push(message.clone());
        self.scroll_target = Some(id);
        message
    }
}

struct Shared {
    session_id: Uuid,
    state: Mutex<SessionState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Append the answer to the outstanding question and go back to idle
    fn settle(&self, content: String) -> Message {
        let message = {
            let mut state = lock(&self.state);
            let message = state.append(MessageRole::Assistant, content);
            state.pending = None;
            message
        };
        self.bump();
        info!(session_id = %self.session_id, message_id = %message.id, "Session idle");
        message
    }
}

/// One in-flight question.
///
/// Settles its session exactly once. If it is dropped before the answer
/// arrives (aborted task, dropped future) the fallback answer is appended so
/// the log never ends on an unanswered question and the pending marker is
/// always released. A session that is already gone is left alone.
struct Exchange {
    session_id: Uuid,
    shared: Weak<Shared>,
    question: String,
    api_key: String,
    context: Arc<VideoContext>,
    service: Arc<dyn SummarizationService>,
    settled: bool,
}

impl Exchange {
    async fn ask(&self) -> String {
        let request = ChatRequest {
            question: &self.question,
            video_id: &self.context.video_id,
            transcript_data: &self.context.transcript_data,
            summary: &self.context.summary,
            api_key: &self.api_key,
        };

        match self.service.chat(&request).await {
            Ok(response) => {
                debug!(session_id = %self.session_id, "Received answer ({} chars)", response.answer.len());
                response.answer
            }
            Err(e) => {
                warn!(session_id = %self.session_id, "Chat request failed: {}", e);
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    fn settle_on(&mut self, shared: &Shared, content: String) -> Message {
        self.settled = true;
        shared.settle(content)
    }

    fn settle_detached(&mut self, content: String) {
        self.settled = true;
        match self.shared.upgrade() {
            Some(shared) => {
                shared.settle(content);
            }
            None => debug!(session_id = %self.session_id, "Session closed before the answer arrived, discarding it"),
        }
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        if !self.settled {
            warn!(session_id = %self.session_id, "Question abandoned before an answer arrived");
            self.settle_detached(FALLBACK_ANSWER.to_string());
        }
    }
}

/// Message log and request state for one video conversation.
///
/// At most one question is outstanding at a time; further submissions are
/// dropped (not queued) until it settles. Every user message is followed by
/// exactly one assistant message, either the backend's answer verbatim or
/// [`FALLBACK_ANSWER`].
pub struct ChatSession {
    shared: Arc<Shared>,
    context: Arc<VideoContext>,
    service: Arc<dyn SummarizationService>,
    credentials: Arc<dyn CredentialStore>,
}

impl ChatSession {
    pub fn new(
        context: VideoContext,
        service: Arc<dyn SummarizationService>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let session_id = Uuid::new_v4();
        let (revision, _) = watch::channel(0);

        info!(
            session_id = %session_id,
            video_id = %context.video_id,
            transcript_records = context.transcript_data.len(),
            "Opened chat session"
        );

        Self {
            shared: Arc::new(Shared {
                session_id,
                state: Mutex::new(SessionState::default()),
                revision,
            }),
            context: Arc::new(context),
            service,
            credentials,
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.session_id
    }

    pub fn context(&self) -> &VideoContext {
        &self.context
    }

    /// Snapshot of the log in conversation order
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.shared.state).messages.clone()
    }

    pub fn status(&self) -> SessionStatus {
        if lock(&self.shared.state).pending.is_some() {
            SessionStatus::AwaitingResponse
        } else {
            SessionStatus::Idle
        }
    }

    /// The question currently waiting for an answer, if any
    pub fn pending_question(&self) -> Option<String> {
        lock(&self.shared.state).pending.clone()
    }

    pub fn scroll_target(&self) -> Option<MessageId> {
        lock(&self.shared.state).scroll_target.clone()
    }

    /// Revision counter, bumped after every change a view needs to redraw for
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    fn begin(&self, text: &str) -> Result<Exchange, Rejection> {
        let question = text.trim();
        if question.is_empty() {
            debug!(session_id = %self.id(), "Rejected empty question");
            return Err(Rejection::EmptyQuestion);
        }

        let api_key = {
            let mut state = lock(&self.shared.state);
            if state.pending.is_some() {
                debug!(session_id = %self.id(), "Rejected question while another is pending");
                return Err(Rejection::RequestPending);
            }

            let api_key = self
                .credentials
                .get(API_KEY_SLOT)
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    debug!(session_id = %self.shared.session_id, "Rejected question, no API key stored");
                    Rejection::MissingCredential
                })?;

            let message = state.append(MessageRole::User, question.to_string());
            state.pending = Some(question.to_string());
            info!(session_id = %self.id(), message_id = %message.id, "Awaiting response");
            api_key
        };
        self.shared.bump();

        Ok(Exchange {
            session_id: self.id(),
            shared: Arc::downgrade(&self.shared),
            question: question.to_string(),
            api_key,
            context: Arc::clone(&self.context),
            service: Arc::clone(&self.service),
            settled: false,
        })
    }

    /// Send `text` and wait for the reply.
    ///
    /// Returns the assistant message that was appended. Backend failures are
    /// not errors here; they produce the fallback message.
    pub async fn submit_question(&self, text: &str) -> Result<Message, Rejection> {
        let mut exchange = self.begin(text)?;
        let content = exchange.ask().await;
        Ok(exchange.settle_on(&self.shared, content))
    }

    /// Send `text` without waiting. Must be called from within a Tokio runtime.
    ///
    /// Preconditions are checked before this returns, so a second call made
    /// before the first answer lands is rejected. The task only holds a weak
    /// reference: if the session is dropped first, the answer is discarded.
    pub fn spawn_question(&self, text: &str) -> Result<JoinHandle<()>, Rejection> {
        let mut exchange = self.begin(text)?;
        Ok(tokio::spawn(async move {
            let content = exchange.ask().await;
            exchange.settle_detached(content);
        }))
    }

    /// Scroll handshake, called by the view after every render pass.
    ///
    /// If the scroll target is rendered, the viewport is aligned to it and the
    /// target is cleared. Otherwise the target stays armed for the next pass.
    pub fn after_render(&self, viewport: &mut dyn Viewport) -> Option<MessageId> {
        let target = lock(&self.shared.state).scroll_target.clone()?;
        if !viewport.is_rendered(&target) {
            debug!(session_id = %self.id(), message_id = %target, "Scroll target not rendered yet");
            return None;
        }

        viewport.align_to_bottom(&target);

        let mut state = lock(&self.shared.state);
        if state.scroll_target.as_ref() == Some(&target) {
            state.scroll_target = None;
        }
        Some(target)
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        info!(session_id = %self.shared.session_id, "Closed chat session");
    }
}
