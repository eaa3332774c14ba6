//! Sentence chunking for incremental synthesis
//!
//! A final utterance is split at sentence terminators followed by whitespace.
//! Segments are released one at a time with a fixed pacing delay, standing in
//! for real token streaming from the model.

use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Split text into sentence segments
///
/// Each segment is trimmed and ends in exactly one terminator; a segment that
/// had none gets a `.` appended. Blank input yields no segments.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !TERMINATORS.contains(&c) {
            continue;
        }
        let boundary = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
        if boundary {
            let end = idx + c.len_utf8();
            push_segment(&mut segments, &text[start..end]);
            start = end;
        }
    }
    push_segment(&mut segments, &text[start..]);

    segments
}

fn push_segment(segments: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| TERMINATORS.contains(&c)) {
        return;
    }
    if trimmed.ends_with(TERMINATORS) {
        segments.push(trimmed.to_string());
    } else {
        segments.push(format!("{trimmed}."));
    }
}

/// Lazily release segments of `text`, waiting `delay` between them
///
/// The stream is finite and cannot be restarted.
#[must_use]
pub fn paced_segments(text: &str, delay: Duration) -> BoxStream<'static, String> {
    let segments = split_sentences(text).into_iter();

    stream::unfold((segments, true), move |(mut segments, first)| async move {
        let segment = segments.next()?;
        if !first && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Some((segment, (segments, false)))
    })
    .boxed()
}
