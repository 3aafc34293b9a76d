//! Context collection for one chat turn.
//!
//! A chat turn carries the user's free-text query plus zero or more line-item
//! descriptions extracted from attachments. Each of them is retrieved on its
//! own and the results are merged into a single list of reference contexts,
//! keeping the first occurrence of every identifier.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::merge_unique;
use crate::document::RetrievedContext;
use crate::error::Result;
use crate::retriever::SimilarityRetriever;

/// Reference contexts gathered for one chat turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectedContext {
    /// Merged `(content, identifier)` pairs, first-seen order.
    pub contexts: Vec<RetrievedContext>,
}

impl CollectedContext {
    /// Identifiers of every collected reference, in order.
    pub fn resources(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.document_id.as_str()).collect()
    }

    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Retrieve references for every description and then for `query`, merging
/// the results first-seen-wins by identifier.
///
/// Blank inputs are skipped.
///
/// # Errors
///
/// The first retrieval failure aborts collection.
pub async fn collect_context(
    retriever: &SimilarityRetriever,
    descriptions: &[String],
    query: &str,
    top_n: usize,
) -> Result<CollectedContext> {
    let inputs = descriptions.iter().map(String::as_str).chain(std::iter::once(query));

    let mut per_input = Vec::new();
    for input in inputs {
        if input.trim().is_empty() {
            continue;
        }
        let found = retriever.get_context_and_ifi(input, top_n).await?;
        debug!(result_count = found.len(), "retrieved contexts for input");
        per_input.push(found);
    }

    let contexts = merge_unique(per_input, |c| c.document_id.as_str());
    debug!(context_count = contexts.len(), "collected contexts");
    Ok(CollectedContext { contexts })
}
