// src/chat/mod.rs
//! Conversation state behind the "ask questions about this video" chat

pub mod scroll;
pub mod session;

pub use scroll::Viewport;
pub use session::{ChatSession, Rejection, SessionStatus, FALLBACK_ANSWER};
