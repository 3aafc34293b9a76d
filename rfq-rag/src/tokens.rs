//! Token-counting oracle used to keep windows inside the embedding model's budget.

use async_trait::async_trait;

use crate::error::Result;

/// Counts tokens the way the embedding model does.
///
/// Calls are assumed to be remote and costed, so the windowing code only asks
/// for a count to verify a locally estimated chunk. Implementations must be
/// consistent across repeated calls on the same text.
///
/// # Example
///
/// ```rust,ignore
/// use rfq_rag::TokenCounter;
///
/// let tokens = counter.count_tokens("M8 x 30 hex bolt, A2-70").await?;
/// ```
#[async_trait]
pub trait TokenCounter: Send + Sync {
    /// Return the number of tokens in `text`.
    async fn count_tokens(&self, text: &str) -> Result<usize>;
}
