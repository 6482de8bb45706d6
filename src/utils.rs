// utils.rs - Small helpers shared across modules
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

lazy_static! {
    static ref VIDEO_ID_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|m\.youtube\.com/watch\?v=)([a-zA-Z0-9_-]{11})")
            .expect("static video id pattern"),
        Regex::new(r"youtube\.com/watch\?.*v=([a-zA-Z0-9_-]{11})").expect("static video id pattern"),
    ];
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VideoUrlError {
    #[error("Please enter a YouTube URL")]
    Empty,
    #[error("Invalid YouTube URL format")]
    Unrecognized,
}

/// Pull the 11-character video id out of the common YouTube URL shapes
pub fn extract_video_id(url: &str) -> Result<String, VideoUrlError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(VideoUrlError::Empty);
    }

    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(VideoUrlError::Unrecognized)
}

/// Seconds to `MM:SS`. Minutes are not wrapped into hours.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `[MM:SS] text` lines for transcript records carrying `start` and `text`.
/// Records without text are skipped; a missing start counts as zero.
pub fn format_transcript(records: &[serde_json::Value]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| {
            let text = record.get("text")?.as_str()?;
            let start = record.get("start").and_then(|s| s.as_f64()).unwrap_or(0.0);
            Some(format!("[{}] {}", format_timestamp(start), text))
        })
        .collect()
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
