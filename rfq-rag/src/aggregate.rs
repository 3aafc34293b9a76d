//! Cross-window score aggregation and ranking.
//!
//! Every window contributes its top matches to a [`ScoreBoard`]. Scores for
//! the same document identifier are summed in window order, and the content
//! kept for an identifier is the one from the last window that matched it.
//! The board is then ranked by accumulated score, highest first.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::document::{Match, RankedDocument};
use crate::error::{RagError, Result};

#[derive(Debug, Clone, PartialEq)]
struct Tally {
    score: f64,
    content: String,
}

/// Accumulated scores for one retrieval call, keyed by document identifier.
///
/// Identifiers keep the order in which they were first seen; ranking is a
/// stable sort, so equal totals stay in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBoard {
    tallies: IndexMap<String, Tally>,
}

impl ScoreBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a board with one window's matches folded in.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::MalformedMatch`] if a match has an empty identifier
    /// or a non-finite score.
    pub fn absorb(mut self, matches: Vec<Match>) -> Result<Self> {
        for m in matches {
            validate(&m)?;
            let tally = self
                .tallies
                .entry(m.document_id)
                .or_insert_with(|| Tally { score: 0.0, content: String::new() });
            tally.score += m.score;
            tally.content = m.content;
        }
        Ok(self)
    }

    /// Number of distinct identifiers seen so far.
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    /// Whether no identifier has been seen.
    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// Accumulated score for `document_id`, if it was seen.
    pub fn score(&self, document_id: &str) -> Option<f64> {
        self.tallies.get(document_id).map(|t| t.score)
    }

    /// Rank identifiers by accumulated score, highest first, keeping `top_n`.
    pub fn into_ranked(self, top_n: usize) -> Vec<RankedDocument> {
        let mut ranked: Vec<RankedDocument> = self
            .tallies
            .into_iter()
            .map(|(document_id, tally)| RankedDocument {
                document_id,
                content: tally.content,
                score: tally.score,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(top_n);
        ranked
    }
}

fn validate(m: &Match) -> Result<()> {
    if m.document_id.trim().is_empty() {
        return Err(RagError::MalformedMatch("match has an empty document identifier".to_string()));
    }
    if !m.score.is_finite() {
        return Err(RagError::MalformedMatch(format!(
            "match for '{}' has a non-finite score ({})",
            m.document_id, m.score
        )));
    }
    Ok(())
}

/// Fold per-window matches (in window order) into the final ranking.
///
/// # Errors
///
/// Returns [`RagError::MalformedMatch`] on the first invalid match.
pub fn aggregate<I>(per_window: I, top_n: usize) -> Result<Vec<RankedDocument>>
where
    I: IntoIterator<Item = Vec<Match>>,
{
    let board = per_window.into_iter().try_fold(ScoreBoard::new(), ScoreBoard::absorb)?;
    Ok(board.into_ranked(top_n))
}

/// Merge several retrieval results into one list, keeping the first
/// occurrence of each identifier.
pub fn merge_unique<T, I, F>(lists: I, key: F) -> Vec<T>
where
    I: IntoIterator<Item = Vec<T>>,
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for item in lists.into_iter().flatten() {
        if seen.insert(key(&item).to_string()) {
            merged.push(item);
        }
    }
    merged
}
