//! Token-budgeted sliding windows.
//!
//! Long inputs are cut into overlapping windows that each fit the embedding
//! model's token budget. Window boundaries are estimated locally at
//! [`CHARS_PER_TOKEN`] characters per token and only verified by the
//! [`TokenCounter`]; an over-budget chunk is trimmed from the tail in
//! proportion to its overage until it fits.
//!
//! All offsets are counted in characters, never bytes, so slicing is always on
//! a UTF-8 boundary.

use tracing::debug;

use crate::document::Window;
use crate::error::Result;
use crate::tokens::TokenCounter;

/// Characters assumed per token when estimating chunk boundaries.
pub const CHARS_PER_TOKEN: usize = 4;

/// Fraction of the estimated overage removed per shrink step.
///
/// Under-correcting keeps the chunk from overshooting far below the budget.
pub const SHRINK_FACTOR: f64 = 0.8;

/// Default token budget per window.
pub const DEFAULT_WINDOW_SIZE: usize = 256;

/// Default token advance between windows.
pub const DEFAULT_STRIDE: usize = 200;

/// Split `text` into overlapping windows of at most `window_size` tokens.
///
/// If the whole text fits the budget a single window holding the full text is
/// returned after exactly one oracle call. Otherwise a cursor walks the text in
/// steps of `stride * CHARS_PER_TOKEN` characters; at each step a chunk of
/// `window_size * CHARS_PER_TOKEN` characters is verified and, if needed,
/// shrunk with [`shrink_to_budget`]. A chunk that shrinks to nothing ends the
/// walk.
///
/// No relation between `window_size` and `stride` is enforced here. A zero
/// stride still advances one character per step.
///
/// # Errors
///
/// Any [`TokenCounter`] failure aborts the split immediately.
pub async fn split_into_windows(
    text: &str,
    window_size: usize,
    stride: usize,
    counter: &dyn TokenCounter,
) -> Result<Vec<Window>> {
    if counter.count_tokens(text).await? <= window_size {
        debug!(oracle_calls = 1, windows = 1, "text fits in a single window");
        return Ok(vec![Window { start: 0, text: text.to_string() }]);
    }

    let bounds = char_boundaries(text);
    let char_len = bounds.len() - 1;
    let span = window_size.saturating_mul(CHARS_PER_TOKEN);
    let step = stride.saturating_mul(CHARS_PER_TOKEN).max(1);

    let mut windows = Vec::new();
    let mut oracle_calls = 1;
    let mut cursor = 0;

    while cursor < char_len {
        let end = cursor.saturating_add(span).min(char_len);
        let candidate = &text[bounds[cursor]..bounds[end]];

        let (chunk, calls) = shrink_to_budget(candidate, window_size, counter).await?;
        oracle_calls += calls;
        if chunk.is_empty() {
            debug!(start = cursor, "chunk shrank to nothing, stopping");
            break;
        }

        windows.push(Window { start: cursor, text: chunk.to_string() });
        cursor = cursor.saturating_add(step);
    }

    debug!(oracle_calls, windows = windows.len(), "split text into windows");
    Ok(windows)
}

/// Trim `chunk` from the tail until the oracle reports at most `budget` tokens.
///
/// Each step removes `ceil(overage * CHARS_PER_TOKEN * SHRINK_FACTOR)`
/// characters, which is at least one, so the chunk strictly shrinks every
/// iteration. When a step would remove the whole chunk the result is empty.
///
/// Returns the fitting prefix of `chunk` (possibly empty) and the number of
/// oracle calls made, always at least one.
///
/// # Errors
///
/// Returns the first [`TokenCounter`] error unchanged.
pub async fn shrink_to_budget<'a>(
    chunk: &'a str,
    budget: usize,
    counter: &dyn TokenCounter,
) -> Result<(&'a str, usize)> {
    let mut chunk = chunk;
    let mut tokens = counter.count_tokens(chunk).await?;
    let mut calls = 1;

    while tokens > budget {
        let overage = tokens - budget;
        let remove = chars_to_remove(overage);
        let len = chunk.chars().count();
        if remove >= len {
            return Ok(("", calls));
        }
        chunk = take_chars(chunk, len - remove);
        tokens = counter.count_tokens(chunk).await?;
        calls += 1;
    }

    Ok((chunk, calls))
}

fn chars_to_remove(overage: usize) -> usize {
    let estimate = (overage as f64 * CHARS_PER_TOKEN as f64 * SHRINK_FACTOR).ceil();
    if estimate >= usize::MAX as f64 { usize::MAX } else { (estimate as usize).max(1) }
}

/// Byte offset of every character start, plus the text length.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

/// The first `n` characters of `s`.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
