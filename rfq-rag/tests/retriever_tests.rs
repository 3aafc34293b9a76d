//! End-to-end retrieval over scripted collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rfq_rag::{
    EmbeddingProvider, Match, RagError, ReferenceChunk, Result, RetrievalConfig,
    RetrievedContext, SimilarityRetriever, TokenCounter, VectorStore, collect_context,
};

/// One token per four characters, rounded up.
#[derive(Default)]
struct QuarterCounter {
    calls: AtomicUsize,
}

#[async_trait]
impl TokenCounter for QuarterCounter {
    async fn count_tokens(&self, text: &str) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.chars().count().div_ceil(4))
    }
}

/// Embeds a window as its first character, so the store can tell windows apart.
#[derive(Default)]
struct FirstCharEmbedder {
    fail_on: Option<char>,
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for FirstCharEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let first = text.chars().next().unwrap_or('\0');
        if Some(first) == self.fail_on {
            return Err(RagError::EmbeddingError {
                provider: "scripted".into(),
                message: "rate limited".into(),
            });
        }
        Ok(vec![first as u32 as f32])
    }

    fn dimensions(&self) -> usize {
        1
    }
}

/// Returns canned matches keyed by the embedded first character.
#[derive(Default)]
struct ScriptedStore {
    responses: HashMap<char, Vec<Match>>,
    fail_on: Option<char>,
    calls: AtomicUsize,
    limits: std::sync::Mutex<Vec<usize>>,
}

impl ScriptedStore {
    fn with(mut self, key: char, matches: Vec<Match>) -> Self {
        self.responses.insert(key, matches);
        self
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    async fn create_collection(&self, _name: &str, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn collection_exists(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }

    async fn delete_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, _collection: &str, _chunks: &[ReferenceChunk]) -> Result<()> {
        Ok(())
    }

    async fn search(
        &self,
        _collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Match>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.limits.lock().unwrap().push(limit);
        let key = char::from_u32(embedding[0] as u32).unwrap();
        if Some(key) == self.fail_on {
            return Err(RagError::VectorStoreError {
                backend: "scripted".into(),
                message: "connection reset".into(),
            });
        }
        let mut matches = self.responses.get(&key).cloned().unwrap_or_default();
        matches.truncate(limit);
        Ok(matches)
    }
}

fn m(content: &str, id: &str, score: f64) -> Match {
    Match::new(content, id, score)
}

fn ctx(content: &str, id: &str) -> RetrievedContext {
    RetrievedContext { content: content.into(), document_id: id.into() }
}

fn retriever(
    embedder: Arc<FirstCharEmbedder>,
    counter: Arc<QuarterCounter>,
    store: Arc<ScriptedStore>,
    max_concurrency: usize,
) -> SimilarityRetriever {
    let config = RetrievalConfig::builder().max_concurrency(max_concurrency).build().unwrap();
    SimilarityRetriever::builder()
        .config(config)
        .embedding_provider(embedder)
        .token_counter(counter)
        .vector_store(store)
        .build()
        .unwrap()
}

/// 2000 characters: windows start at 0 ('a'), 800 ('b') and 1600 ('c').
fn three_window_text() -> String {
    format!("{}{}{}", "a".repeat(800), "b".repeat(800), "c".repeat(400))
}

fn three_window_store() -> ScriptedStore {
    ScriptedStore::default()
        .with('a', vec![m("c2-a", "D2", 0.95), m("c1", "D1", 0.85)])
        .with('b', vec![m("c2-b", "D2", 0.92), m("c3", "D3", 0.70)])
        .with('c', vec![m("c2-c", "D2", 0.88), m("c4", "D4", 0.60)])
}

#[tokio::test]
async fn single_window_returns_store_order() {
    let store = Arc::new(
        ScriptedStore::default().with('M', vec![m("c1", "D1", 0.9), m("c2", "D2", 0.8)]),
    );
    let counter = Arc::new(QuarterCounter::default());
    let retriever = retriever(Arc::default(), counter.clone(), store.clone(), 1);

    let result = retriever.get_context_and_ifi("M10 hex nut DIN 934 zinc", 3).await.unwrap();

    assert_eq!(result, vec![ctx("c1", "D1"), ctx("c2", "D2")]);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*store.limits.lock().unwrap(), vec![3]);
}

#[tokio::test]
async fn scores_accumulate_across_windows() {
    let store = Arc::new(three_window_store());
    let retriever = retriever(Arc::default(), Arc::default(), store.clone(), 1);

    let ranked = retriever.rank(&three_window_text(), 3).await.unwrap();

    let ids: Vec<&str> = ranked.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, vec!["D2", "D1", "D3"]);
    assert!((ranked[0].score - 2.75).abs() < 1e-9);
    assert_eq!(ranked[0].content, "c2-c");
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn concurrent_windows_rank_identically() {
    let sequential = retriever(Arc::default(), Arc::default(), Arc::new(three_window_store()), 1);
    let concurrent = retriever(Arc::default(), Arc::default(), Arc::new(three_window_store()), 3);

    let text = three_window_text();
    let a = sequential.rank(&text, 3).await.unwrap();
    let b = concurrent.rank(&text, 3).await.unwrap();

    assert_eq!(a, b);
}

#[tokio::test]
async fn result_length_is_bounded_by_distinct_identifiers() {
    let retriever = retriever(Arc::default(), Arc::default(), Arc::new(three_window_store()), 1);

    let all = retriever.get_context_and_ifi(&three_window_text(), 10).await.unwrap();
    assert_eq!(all.len(), 4);

    let one = retriever.get_context_and_ifi(&three_window_text(), 1).await.unwrap();
    assert_eq!(one, vec![ctx("c2-c", "D2")]);
}

#[tokio::test]
async fn embedding_failure_aborts_with_window_index() {
    let embedder = Arc::new(FirstCharEmbedder { fail_on: Some('b'), ..Default::default() });
    let store = Arc::new(three_window_store());
    let retriever = retriever(embedder.clone(), Arc::default(), store.clone(), 1);

    let err = retriever.get_context_and_ifi(&three_window_text(), 3).await.unwrap_err();

    match err {
        RagError::WindowFailed { index, source } => {
            assert_eq!(index, 1);
            assert!(matches!(*source, RagError::EmbeddingError { .. }));
        }
        other => panic!("expected WindowFailed, got {other:?}"),
    }
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn store_failure_aborts_with_window_index() {
    let store = Arc::new(ScriptedStore { fail_on: Some('c'), ..three_window_store() });
    let retriever = retriever(Arc::default(), Arc::default(), store, 1);

    let err = retriever.get_context_and_ifi(&three_window_text(), 3).await.unwrap_err();

    assert!(matches!(err, RagError::WindowFailed { index: 2, .. }));
    assert!(err.to_string().contains("window 2"));
}

#[tokio::test]
async fn malformed_store_rows_fail_loudly() {
    let store = Arc::new(ScriptedStore::default().with('x', vec![m("c", "", 0.5)]));
    let retriever = retriever(Arc::default(), Arc::default(), store, 1);

    let err = retriever.get_context_and_ifi("x", 3).await.unwrap_err();

    assert!(matches!(err, RagError::MalformedMatch(_)));
}

#[tokio::test]
async fn blank_input_touches_no_collaborator() {
    let embedder = Arc::new(FirstCharEmbedder::default());
    let counter = Arc::new(QuarterCounter::default());
    let store = Arc::new(ScriptedStore::default());
    let retriever = retriever(embedder.clone(), counter.clone(), store.clone(), 1);

    for text in ["", "   ", "\n\t "] {
        assert!(retriever.get_context_and_ifi(text, 3).await.unwrap().is_empty());
    }

    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_top_n_touches_no_collaborator() {
    let embedder = Arc::new(FirstCharEmbedder::default());
    let counter = Arc::new(QuarterCounter::default());
    let store = Arc::new(three_window_store());
    let retriever = retriever(embedder.clone(), counter.clone(), store.clone(), 1);

    assert!(retriever.rank(&three_window_text(), 0).await.unwrap().is_empty());
    assert!(retriever.get_context_and_ifi("a: M8 nut", 0).await.unwrap().is_empty());

    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retrieve_uses_configured_top_n() {
    let store = Arc::new(three_window_store());
    let embedder = Arc::new(FirstCharEmbedder::default());
    let config = RetrievalConfig::builder().top_n(1).build().unwrap();
    let retriever = SimilarityRetriever::builder()
        .config(config)
        .embedding_provider(embedder)
        .token_counter(Arc::new(QuarterCounter::default()))
        .vector_store(store.clone())
        .build()
        .unwrap();

    let contexts = retriever.retrieve(&three_window_text()).await.unwrap();

    assert_eq!(contexts, vec![ctx("c2-c", "D2")]);
    assert!(store.limits.lock().unwrap().iter().all(|&limit| limit == 1));
}

#[tokio::test]
async fn collect_context_merges_first_seen_wins() {
    let store = Arc::new(
        ScriptedStore::default()
            .with('d', vec![m("bolt table", "IFI_1", 0.9), m("nut table", "IFI_2", 0.8)])
            .with('q', vec![m("nut table v2", "IFI_2", 0.95), m("washer table", "IFI_3", 0.7)]),
    );
    let embedder = Arc::new(FirstCharEmbedder::default());
    let retriever = retriever(embedder.clone(), Arc::default(), store, 1);

    let descriptions = vec!["  ".to_string(), "d: M8 hex bolt".to_string()];
    let collected =
        collect_context(&retriever, &descriptions, "q: matching nuts and washers", 3)
            .await
            .unwrap();

    assert_eq!(
        collected.contexts,
        vec![ctx("bolt table", "IFI_1"), ctx("nut table", "IFI_2"), ctx("washer table", "IFI_3")]
    );
    assert_eq!(collected.resources(), vec!["IFI_1", "IFI_2", "IFI_3"]);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
}
