// src/chat/scroll.rs
use crate::types::MessageId;

/// The presentation side of the scroll handshake.
///
/// After each render pass the view hands itself to
/// [`ChatSession::after_render`](super::ChatSession::after_render). The session
/// only asks for a scroll once the target message is actually on screen, so a
/// message appended between two renders stays armed until the next pass.
pub trait Viewport {
    /// Whether `id` is part of the rendered output yet
    fn is_rendered(&self, id: &MessageId) -> bool;

    /// Align the trailing edge of `id` with the trailing edge of the visible log
    fn align_to_bottom(&mut self, id: &MessageId);
}
